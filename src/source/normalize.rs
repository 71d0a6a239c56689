//! Normalization of Zotero local API JSON into crate records.

use serde_json::{Map, Value};

use crate::item::{Annotation, Creator, Item, ItemSummary, extract_year, join_creators};

use super::SourceError;

const BACKEND: &str = "local api";

/// Data keys that are structured and never copied into [`Item::fields`].
const STRUCTURED_DATA_KEYS: [&str; 4] = ["creators", "tags", "collections", "relations"];

/// An annotation discovered through the local API before merge ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiscoveredAnnotation {
    pub(crate) annotation: Annotation,
    /// Zotero `annotationSortIndex` (page|offset|top), compared as a string.
    pub(crate) position: String,
}

fn data_object(value: &Value) -> Result<&Map<String, Value>, SourceError> {
    value
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| SourceError::malformed(BACKEND, "item record has no 'data' object"))
}

fn record_key(value: &Value, data: &Map<String, Value>) -> Option<String> {
    value
        .get("key")
        .and_then(Value::as_str)
        .or_else(|| data.get("key").and_then(Value::as_str))
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
}

fn str_field<'a>(data: &'a Map<String, Value>, name: &str) -> &'a str {
    data.get(name).and_then(Value::as_str).unwrap_or_default()
}

fn creators_from_json(data: &Map<String, Value>) -> Vec<Creator> {
    let Some(entries) = data.get("creators").and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .map(|creator| {
            if let Some(name) = creator.get("name").and_then(Value::as_str) {
                Creator::Single {
                    name: name.to_string(),
                }
            } else {
                Creator::Structured {
                    last: str_field(creator, "lastName").to_string(),
                    first: str_field(creator, "firstName").to_string(),
                }
            }
        })
        .collect()
}

/// Converts an item record (`{ key, data, meta }`) into an [`Item`].
///
/// # Errors
///
/// Returns [`SourceError::MalformedResponse`] when `data` or the key is missing.
pub(crate) fn item_from_json(value: &Value) -> Result<Item, SourceError> {
    let data = data_object(value)?;
    let key = record_key(value, data)
        .ok_or_else(|| SourceError::malformed(BACKEND, "item record has no key"))?;

    let mut item = Item::new(key, str_field(data, "itemType"));
    for (name, field) in data {
        if STRUCTURED_DATA_KEYS.contains(&name.as_str()) || name == "key" {
            continue;
        }
        if let Some(text) = field.as_str() {
            item.fields.insert(name.clone(), text.to_string());
        }
    }
    if let Some(meta_key) = value
        .get("meta")
        .and_then(|meta| meta.get("citationKey"))
        .and_then(Value::as_str)
    {
        item.fields
            .insert("meta.citationKey".to_string(), meta_key.to_string());
    }
    item.creators = creators_from_json(data);
    Ok(item)
}

/// Returns the elements of a JSON array response.
///
/// # Errors
///
/// Returns [`SourceError::MalformedResponse`] when the payload is not an array.
pub(crate) fn records(value: Value, endpoint: &str) -> Result<Vec<Value>, SourceError> {
    match value {
        Value::Array(entries) => Ok(entries),
        other => Err(SourceError::malformed(
            BACKEND,
            format!("{endpoint} returned {} instead of an array", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Returns the item type of a child record, if readable.
pub(crate) fn item_type(value: &Value) -> Option<&str> {
    value.get("data")?.get("itemType")?.as_str()
}

/// Returns the keys of attachment records among `children`.
pub(crate) fn attachment_keys(children: &[Value]) -> Vec<String> {
    children
        .iter()
        .filter(|child| item_type(child) == Some("attachment"))
        .filter_map(|child| {
            let data = child.get("data")?.as_object()?;
            record_key(child, data)
        })
        .collect()
}

/// Converts an annotation record; returns `None` for any other record type.
///
/// `fallback_attachment` is used when the record has no `parentItem`.
pub(crate) fn annotation_from_json(
    value: &Value,
    fallback_attachment: &str,
) -> Option<DiscoveredAnnotation> {
    if item_type(value) != Some("annotation") {
        return None;
    }
    let data = value.get("data")?.as_object()?;
    let key = record_key(value, data)?;

    let parent = str_field(data, "parentItem").trim();
    let attachment_key = if parent.is_empty() {
        fallback_attachment
    } else {
        parent
    };

    let mut annotation = Annotation::new(
        key,
        attachment_key,
        str_field(data, "annotationColor"),
        0,
    )
    .with_text(str_field(data, "annotationText").trim())
    .with_comment(str_field(data, "annotationComment").trim())
    .with_page_label(str_field(data, "annotationPageLabel").trim());
    if str_field(data, "annotationType") == "image" {
        annotation = annotation.as_image();
    }

    Some(DiscoveredAnnotation {
        annotation,
        position: str_field(data, "annotationSortIndex").to_string(),
    })
}

/// Converts annotation records, ordered by Zotero's position index (stable).
pub(crate) fn annotations_in_position_order(
    children: &[Value],
    fallback_attachment: &str,
) -> Vec<DiscoveredAnnotation> {
    let mut annotations: Vec<DiscoveredAnnotation> = children
        .iter()
        .filter_map(|child| annotation_from_json(child, fallback_attachment))
        .collect();
    annotations.sort_by(|a, b| a.position.cmp(&b.position));
    annotations
}

/// Converts a search result record into an [`ItemSummary`].
pub(crate) fn summary_from_json(value: &Value) -> Option<ItemSummary> {
    let item = item_from_json(value).ok()?;
    Some(ItemSummary {
        title: item.field("title").unwrap_or_default().to_string(),
        creators: join_creators(&item.creators),
        year: extract_year(item.field("date").unwrap_or_default()),
        item_type: item.item_type,
        key: item.key,
    })
}
