//! Maps an export run to the process exit code.

use zotero_export_core::ExportSummary;

use crate::ProcessExit;

/// Exit code for an export run: 0 when no item failed, 2 when some notes were
/// written next to failures, 1 when nothing could be exported.
///
/// Items without annotations or with missing images still count as exported;
/// they are reported in the summary lines instead.
pub(crate) fn determine_exit_outcome(summary: &ExportSummary) -> ProcessExit {
    match (summary.completed(), summary.failed()) {
        (_, 0) => ProcessExit::Success,
        (0, _) => ProcessExit::Failure,
        _ => ProcessExit::Partial,
    }
}

#[cfg(test)]
mod tests {
    use zotero_export_core::{ExportSummary, ItemFailure, ItemOutcome};

    use super::determine_exit_outcome;
    use crate::ProcessExit;

    fn exported(key: &str, annotation_count: usize, missing_images: usize) -> ItemOutcome {
        ItemOutcome {
            item_key: key.to_string(),
            cite_key: format!("cite{key}"),
            markdown_path: format!("/notes/@cite{key}.md"),
            annotation_count,
            image_paths: Vec::new(),
            missing_images,
            preview: None,
        }
    }

    fn failed(key: &str) -> ItemFailure {
        ItemFailure {
            item_key: key.to_string(),
            message: format!("item '{key}' not found"),
        }
    }

    #[test]
    fn test_incomplete_notes_still_exit_zero() {
        let summary = ExportSummary {
            outcomes: vec![exported("A", 0, 0), exported("B", 3, 1)],
            failures: Vec::new(),
        };
        assert_eq!(determine_exit_outcome(&summary), ProcessExit::Success);
        assert_eq!(ProcessExit::Success.code(), 0);
    }

    #[test]
    fn test_written_notes_beside_failures_exit_two() {
        let summary = ExportSummary {
            outcomes: vec![exported("A", 2, 0)],
            failures: vec![failed("MISSING1")],
        };
        assert_eq!(determine_exit_outcome(&summary), ProcessExit::Partial);
        assert_eq!(ProcessExit::Partial.code(), 2);
    }

    #[test]
    fn test_no_note_written_exits_one() {
        let summary = ExportSummary {
            outcomes: Vec::new(),
            failures: vec![failed("MISSING1"), failed("MISSING2")],
        };
        assert_eq!(determine_exit_outcome(&summary), ProcessExit::Failure);
        assert_eq!(ProcessExit::Failure.code(), 1);
    }
}
