//! CLI output formatting and display helpers.

use zotero_export_core::{ExportSummary, ItemSummary};

/// Returns terminal width from COLUMNS, or 80 if unset/invalid.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|width| *width >= 20)
        .unwrap_or(80)
}

/// Truncates text to at most `width` chars, appending an ellipsis if truncated.
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    match width {
        0 => String::new(),
        1 => "…".to_string(),
        _ => {
            let mut output: String = text.chars().take(width - 1).collect();
            output.push('…');
            output
        }
    }
}

pub(crate) fn render_search_row(summary: &ItemSummary, width: usize) -> String {
    let year = if summary.year.is_empty() {
        "n.d."
    } else {
        summary.year.as_str()
    };
    let creators = if summary.creators.is_empty() {
        "unknown"
    } else {
        summary.creators.as_str()
    };
    truncate_to_width(
        &format!("{} | {year} | {} | {creators}", summary.key, summary.title),
        width,
    )
}

/// Lines describing an export run, suitable for stdout.
pub(crate) fn render_export_summary_lines(
    summary: &ExportSummary,
    dry_run: bool,
    width: usize,
) -> Vec<String> {
    let verb = if dry_run { "Previewed" } else { "Exported" };
    let mut lines = Vec::new();

    for outcome in &summary.outcomes {
        let line = format!(
            "{verb} {} -> {} ({} annotations, {} images)",
            outcome.item_key,
            outcome.markdown_path,
            outcome.annotation_count,
            outcome.image_paths.len()
        );
        lines.push(truncate_to_width(&line, width));
    }

    lines.push(format!(
        "Summary: {} of {} items fully succeeded",
        summary.fully_succeeded(),
        summary.completed() + summary.failed()
    ));
    if summary.without_annotations() > 0 {
        lines.push(format!(
            "- {} item(s) had no annotations",
            summary.without_annotations()
        ));
    }
    if summary.with_missing_images() > 0 {
        lines.push(format!(
            "- {} item(s) have missing images ({} TODO(s) in notes)",
            summary.with_missing_images(),
            summary.missing_image_todos()
        ));
    }
    if summary.failed() > 0 {
        lines.push(format!("- {} item(s) failed:", summary.failed()));
        for failure in &summary.failures {
            let first_line = failure.message.lines().next().unwrap_or_default();
            lines.push(truncate_to_width(
                &format!("  {}: {first_line}", failure.item_key),
                width,
            ));
            for detail in failure.message.lines().skip(1) {
                lines.push(truncate_to_width(&format!("  {}", detail.trim()), width));
            }
        }
    }
    lines
}
