//! Progress UI (spinner) for multi-item export runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Creates a steady-ticking spinner when requested.
pub(crate) fn create_spinner(use_spinner: bool) -> Option<ProgressBar> {
    if !use_spinner {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    Some(spinner)
}

/// Spinner message for the item about to be exported.
pub(crate) fn progress_message(index: usize, total: usize, item_key: &str) -> String {
    format!("[{}/{}] Exporting {item_key}...", (index + 1).min(total), total)
}
