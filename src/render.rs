//! Markdown rendering of an [`ExportPlan`].
//!
//! Output is deterministic: frontmatter in the configured property order,
//! an optional abstract callout, then one section per color group in the
//! fixed color order.

use crate::color::compare_color_names;
use crate::plan::{ColorGroup, ExportPlan, PlannedAnnotation};
use crate::template::{TemplateSettings, escape_single_quoted, property_label};

/// Tag line written into every note's frontmatter.
pub const NOTE_TAGS: &str = "type/source/paper";

/// Placeholder for annotations with neither text nor comment.
pub const NO_TEXT_PLACEHOLDER: &str = "_(no text extracted)_";

/// Zotero URI opening the PDF reader at an annotation.
const OPEN_PDF_URI: &str = "zotero://open-pdf/library/items/";

/// Renders the Markdown note for a plan.
///
/// `settings` are sanitized before use; `None` means defaults.
#[must_use]
pub fn render_markdown(plan: &ExportPlan, settings: Option<&TemplateSettings>) -> String {
    let settings = settings.map_or_else(TemplateSettings::default, TemplateSettings::sanitized);
    let mut lines: Vec<String> = Vec::new();

    lines.push("---".to_string());
    lines.push(format!("tags: {NOTE_TAGS}"));
    for property in &settings.property_order {
        lines.push(format!(
            "{}: '{}'",
            property_label(property),
            escape_single_quoted(property_value(plan, property))
        ));
    }
    lines.push("---".to_string());
    lines.push("Project:".to_string());
    lines.push(String::new());

    push_abstract(&mut lines, &plan.abstract_note);

    lines.push("## Annotations".to_string());
    lines.push(String::new());

    let mut groups: Vec<&ColorGroup> = plan.groups.iter().collect();
    groups.sort_by(|a, b| compare_color_names(&a.color_name, &b.color_name));

    for group in groups {
        lines.push(format!("### {}", settings.heading_for(&group.color_name)));
        lines.push(String::new());
        for annotation in &group.annotations {
            push_annotation(&mut lines, annotation);
            lines.push(String::new());
        }
    }

    let mut document = lines.join("\n").trim_end().to_string();
    document.push('\n');
    document
}

fn property_value<'a>(plan: &'a ExportPlan, property: &str) -> &'a str {
    match property {
        "title" => &plan.title,
        "author" => &plan.author,
        "year" => &plan.year,
        "company" => &plan.company,
        _ => "",
    }
}

fn push_abstract(lines: &mut Vec<String>, abstract_note: &str) {
    let body: Vec<&str> = abstract_note
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if body.is_empty() {
        return;
    }

    lines.push("> [!abstract]".to_string());
    lines.push(">".to_string());
    lines.push("> Abstract".to_string());
    lines.push(">".to_string());
    lines.extend(body.into_iter().map(|line| format!("> {line}")));
    lines.push(">".to_string());
    lines.push(String::new());
}

fn push_annotation(lines: &mut Vec<String>, annotation: &PlannedAnnotation) {
    let has_text = !annotation.text.is_empty();
    let has_comment = !annotation.comment.is_empty();

    let body = if has_text {
        single_line(&annotation.text)
    } else if has_comment {
        single_line(&annotation.comment)
    } else {
        NO_TEXT_PLACEHOLDER.to_string()
    };
    match page_reference(annotation) {
        Some(reference) => lines.push(format!("> {body} {reference}")),
        None => lines.push(format!("> {body}")),
    }

    if has_text && has_comment {
        lines.push(format!("> Comment: {}", single_line(&annotation.comment)));
    }
    if let Some(path) = &annotation.image_path {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        lines.push(format!("> ![{file_name}]({path})"));
    }
    if let Some(message) = &annotation.missing_image {
        lines.push(format!("> TODO: {}", single_line(message)));
    }
}

fn page_reference(annotation: &PlannedAnnotation) -> Option<String> {
    if annotation.page_label.is_empty() {
        return None;
    }
    Some(format!(
        "([p. {}]({OPEN_PDF_URI}{}))",
        annotation.page_label, annotation.key
    ))
}

/// Keeps multi-line text inside one quoted Markdown line.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::item::{Annotation, Creator, Item};
    use crate::plan::{PlanInput, prepare_export_plan};
    use crate::template::parse_frontmatter;

    fn attention_item() -> Item {
        Item::new("ITEM1", "conferencePaper")
            .with_field("title", "Attention Is All You Need")
            .with_field("date", "2017")
            .with_field("publisher", "Google")
            .with_field(
                "abstractNote",
                "This paper introduces the Transformer architecture.",
            )
            .with_creator(Creator::Structured {
                last: "Vaswani".into(),
                first: "Ashish".into(),
            })
            .with_creator(Creator::Structured {
                last: "Shazeer".into(),
                first: "Noam".into(),
            })
    }

    fn attention_plan() -> ExportPlan {
        let item = attention_item();
        let annotations = vec![
            Annotation::new("BLUEIMG", "ATT1", "#2ea8e5", 0)
                .with_page_label("4")
                .as_image(),
            Annotation::new("YELLOW1", "ATT1", "#ffd400", 1)
                .with_text("We propose a new simple network architecture")
                .with_comment("Key contribution")
                .with_page_label("3"),
        ];
        prepare_export_plan(PlanInput {
            markdown_dir: "/vault/papers",
            attachment_base_dir: "/vault",
            cite_key: "vaswani2017attention",
            item: &item,
            annotations: &annotations,
        })
    }

    #[test]
    fn test_render_attention_end_to_end() {
        let markdown = render_markdown(&attention_plan(), None);
        let expected = "\
---
tags: type/source/paper
Title: 'Attention Is All You Need'
Author: 'Vaswani, Ashish; Shazeer, Noam'
Year: '2017'
Company: 'Google'
---
Project:

> [!abstract]
>
> Abstract
>
> This paper introduces the Transformer architecture.
>

## Annotations

### Yellow

> We propose a new simple network architecture ([p. 3](zotero://open-pdf/library/items/YELLOW1))
> Comment: Key contribution

### Blue

> _(no text extracted)_ ([p. 4](zotero://open-pdf/library/items/BLUEIMG))
> ![image_1.png](../attachment/vaswani2017attention/image_1.png)
";
        assert_eq!(markdown, expected);
    }

    #[test]
    fn test_render_missing_image_writes_todo() {
        let plan = attention_plan().with_missing_image("BLUEIMG", "image could not be retrieved");
        let markdown = render_markdown(&plan, None);
        assert!(markdown.contains("> TODO: image could not be retrieved"));
        assert!(!markdown.contains("![image_1.png]"));
        assert!(markdown.contains("> Comment: Key contribution"));
    }

    #[test]
    fn test_render_frontmatter_round_trips_quotes() {
        let mut plan = attention_plan();
        plan.title = "Bob's 'quoted' title: part 2".to_string();
        let markdown = render_markdown(&plan, None);
        let entries = parse_frontmatter(&markdown).unwrap();
        assert_eq!(entries[1], ("Title".to_string(), plan.title.clone()));
    }

    #[test]
    fn test_render_honours_property_order_and_headings() {
        let mut settings = TemplateSettings {
            property_order: vec!["year".into(), "TITLE".into()],
            ..TemplateSettings::default()
        };
        settings
            .color_heading_overrides
            .insert("Yellow".into(), "Main ideas".into());

        let markdown = render_markdown(&attention_plan(), Some(&settings));
        let keys: Vec<String> = parse_frontmatter(&markdown)
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["tags", "Year", "Title", "Author", "Company"]);
        assert!(markdown.contains("### Main ideas"));
        assert!(!markdown.contains("### Yellow"));
    }

    #[test]
    fn test_render_without_abstract_or_annotations() {
        let mut plan = attention_plan();
        plan.abstract_note = "  \n ".to_string();
        plan.groups.clear();
        let markdown = render_markdown(&plan, None);
        assert!(!markdown.contains("[!abstract]"));
        assert!(markdown.ends_with("## Annotations\n"));
    }

    #[test]
    fn test_render_comment_only_annotation() {
        let mut plan = attention_plan();
        let annotation = &mut plan.groups[1].annotations[0];
        assert_eq!(annotation.key, "YELLOW1");
        annotation.text.clear();
        let markdown = render_markdown(&plan, None);
        assert!(markdown.contains("> Key contribution ([p. 3]"));
        assert!(!markdown.contains("Comment:"));
    }

    #[test]
    fn test_render_without_page_label_omits_reference() {
        let mut plan = attention_plan();
        plan.groups[1].annotations[0].page_label.clear();
        let markdown = render_markdown(&plan, None);
        assert!(markdown.contains("> We propose a new simple network architecture\n"));
        assert!(!markdown.contains("items/YELLOW1"));
    }

    #[test]
    fn test_render_ends_with_single_newline() {
        let markdown = render_markdown(&attention_plan(), None);
        assert!(markdown.ends_with('\n'));
        assert!(!markdown.ends_with("\n\n"));
    }
}
