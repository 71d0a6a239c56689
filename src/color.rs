//! Highlight color classification.
//!
//! Maps Zotero annotation color codes to canonical names and defines the
//! fixed section order used when rendering color groups.

use std::cmp::Ordering;

/// Name used for annotations without any color code.
pub const UNKNOWN_COLOR: &str = "Unknown";

/// Known Zotero highlight palette entries (normalized hex → canonical name).
const KNOWN_COLORS: [(&str, &str); 8] = [
    ("#ffd400", "Yellow"),
    ("#5fb236", "Green"),
    ("#2ea8e5", "Blue"),
    ("#ff6666", "Pink"),
    ("#e56eee", "Pink"),
    ("#f19837", "Orange"),
    ("#a28ae5", "Purple"),
    ("#aaaaaa", "Gray"),
];

/// Section order for color groups. Names outside this list sort after `Unknown`.
pub const COLOR_PRIORITY: [&str; 8] = [
    "Yellow", "Green", "Blue", "Pink", "Orange", "Purple", "Gray", UNKNOWN_COLOR,
];

/// Normalizes a raw color code: trimmed and lowercased.
#[must_use]
pub fn normalize_color_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Returns the canonical color name for a color code.
///
/// Unrecognized codes become `"Unknown (<code>)"` with the normalized code
/// embedded; an empty code is plain `"Unknown"`.
#[must_use]
pub fn color_name(code: &str) -> String {
    let normalized = normalize_color_code(code);
    if normalized.is_empty() {
        return UNKNOWN_COLOR.to_string();
    }

    KNOWN_COLORS
        .iter()
        .find(|(hex, _)| *hex == normalized)
        .map_or_else(
            || format!("{UNKNOWN_COLOR} ({normalized})"),
            |(_, name)| (*name).to_string(),
        )
}

fn color_rank(name: &str) -> usize {
    COLOR_PRIORITY
        .iter()
        .position(|candidate| *candidate == name)
        .unwrap_or(COLOR_PRIORITY.len())
}

/// Total order over color names: priority list first, then lexicographic.
#[must_use]
pub fn compare_color_names(a: &str, b: &str) -> Ordering {
    color_rank(a)
        .cmp(&color_rank(b))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_color_name_known_palette() {
        assert_eq!(color_name("#ffd400"), "Yellow");
        assert_eq!(color_name("#5fb236"), "Green");
        assert_eq!(color_name("#2ea8e5"), "Blue");
        assert_eq!(color_name("#ff6666"), "Pink");
        assert_eq!(color_name("#e56eee"), "Pink");
        assert_eq!(color_name("#f19837"), "Orange");
        assert_eq!(color_name("#a28ae5"), "Purple");
        assert_eq!(color_name("#aaaaaa"), "Gray");
    }

    #[test]
    fn test_color_name_normalizes_case_and_whitespace() {
        assert_eq!(color_name("  #FFD400 \n"), "Yellow");
        assert_eq!(color_name("#2EA8E5"), "Blue");
    }

    #[test]
    fn test_color_name_empty_is_plain_unknown() {
        assert_eq!(color_name(""), "Unknown");
        assert_eq!(color_name("   "), "Unknown");
    }

    #[test]
    fn test_color_name_unrecognized_embeds_normalized_code() {
        assert_eq!(color_name(" #ABCDEF "), "Unknown (#abcdef)");
        assert_eq!(color_name("teal"), "Unknown (teal)");
    }

    #[test]
    fn test_compare_follows_priority_list() {
        for pair in COLOR_PRIORITY.windows(2) {
            assert_eq!(compare_color_names(pair[0], pair[1]), Ordering::Less);
            assert_eq!(compare_color_names(pair[1], pair[0]), Ordering::Greater);
        }
    }

    #[test]
    fn test_compare_unknown_variants_after_plain_unknown() {
        assert_eq!(
            compare_color_names("Unknown", "Unknown (#123456)"),
            Ordering::Less
        );
        assert_eq!(
            compare_color_names("Unknown (#000000)", "Unknown (#ffffff)"),
            Ordering::Less
        );
        assert_eq!(compare_color_names("Gray", "Unknown (#000000)"), Ordering::Less);
    }

    #[test]
    fn test_compare_identical_names_equal() {
        assert_eq!(compare_color_names("Blue", "Blue"), Ordering::Equal);
        assert_eq!(
            compare_color_names("Unknown (x)", "Unknown (x)"),
            Ordering::Equal
        );
    }

    #[test]
    fn test_sorting_is_idempotent() {
        let mut names = vec![
            "Unknown (#111111)".to_string(),
            "Blue".to_string(),
            "Unknown".to_string(),
            "Yellow".to_string(),
            "Unknown (#000000)".to_string(),
            "Gray".to_string(),
            "Pink".to_string(),
        ];
        names.sort_by(|a, b| compare_color_names(a, b));
        let once = names.clone();
        names.sort_by(|a, b| compare_color_names(a, b));
        assert_eq!(names, once);
        assert_eq!(
            once,
            vec![
                "Yellow",
                "Blue",
                "Pink",
                "Gray",
                "Unknown",
                "Unknown (#000000)",
                "Unknown (#111111)",
            ]
        );
    }
}
