#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// One plain path component (no `.`/`..`, no separators).
pub fn arb_segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,6}"
}

/// An absolute `/`-separated directory with 0..=4 components.
pub fn arb_abs_dir() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_segment(), 0..=4).prop_map(|parts| format!("/{}", parts.join("/")))
}

/// A relative `/`-separated directory with 1..=4 components.
pub fn arb_rel_dir() -> impl Strategy<Value = String> {
    prop::collection::vec(arb_segment(), 1..=4).prop_map(|parts| parts.join("/"))
}

/// Either a rooted or a relative directory.
pub fn arb_any_dir() -> impl Strategy<Value = String> {
    prop_oneof![arb_abs_dir(), arb_rel_dir()]
}

/// A single-line free-text value as found in titles and creator names.
pub fn arb_field_text() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ',:.&()-]{0,40}"
}
