//! Terminal capability checks and tracing initialization.

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(no_color_env: bool, dumb_terminal: bool) -> bool {
    no_color_env || dumb_terminal
}

pub(crate) fn should_use_spinner(
    stderr_is_terminal: bool,
    quiet: bool,
    dumb_terminal: bool,
    item_count: usize,
) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal && item_count > 1
}

/// Installs the global subscriber; logs go to stderr.
///
/// `RUST_LOG` wins unless `force_cli_level` is set.
pub(crate) fn init_tracing(default_level: &str, force_cli_level: bool, no_color: bool) {
    let filter = if force_cli_level {
        tracing_subscriber::EnvFilter::new(default_level)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_disable_color() {
        assert!(should_disable_color(true, false));
        assert!(should_disable_color(false, true));
        assert!(!should_disable_color(false, false));
    }

    #[test]
    fn test_spinner_only_for_interactive_multi_item_runs() {
        assert!(should_use_spinner(true, false, false, 2));
        assert!(!should_use_spinner(true, false, false, 1));
        assert!(!should_use_spinner(false, false, false, 5));
        assert!(!should_use_spinner(true, true, false, 5));
        assert!(!should_use_spinner(true, false, true, 5));
    }
}
