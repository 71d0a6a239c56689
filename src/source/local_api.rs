//! Client for the Zotero local HTTP API (`http://127.0.0.1:23119` by default).
//!
//! Every request goes through [`first_success`] over the configured
//! transports, so a call that fails on the direct client is retried on the
//! no-proxy client before the operation is reported as failed.

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::join_all;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::item::{Annotation, Item, ItemSummary, filter_search_results};

use super::SourceError;
use super::fallback::{Strategy, first_success};
use super::http_client::{HttpTimeouts, ReqwestTransport, Transport};
use super::merge_annotations;
use super::normalize::{
    annotations_in_position_order, attachment_keys, item_from_json, records, summary_from_json,
};

/// Default base URL of the Zotero local API.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:23119";

/// Library path of the current user's library.
const LIBRARY_PATH: &str = "api/users/0/";

const SEARCH_LIMIT: &str = "75";

/// Zotero local API client.
#[derive(Clone)]
pub struct LocalApi {
    base_url: Url,
    api_key: Option<String>,
    transports: Vec<Arc<dyn Transport>>,
}

impl std::fmt::Debug for LocalApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let transports: Vec<&str> = self.transports.iter().map(|t| t.name()).collect();
        f.debug_struct("LocalApi")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("transports", &transports)
            .finish()
    }
}

impl LocalApi {
    /// Builds a client with the direct and no-proxy transports.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the base URL is invalid or no HTTP client
    /// can be built.
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        timeouts: HttpTimeouts,
    ) -> Result<Self, SourceError> {
        let transports: Vec<Arc<dyn Transport>> = vec![
            Arc::new(ReqwestTransport::direct(timeouts)?),
            Arc::new(ReqwestTransport::no_proxy(timeouts)?),
        ];
        Self::with_transports(base_url, api_key, transports)
    }

    /// Builds a client over explicit transports, tried in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MalformedResponse`] when the base URL is invalid.
    pub fn with_transports(
        base_url: &str,
        api_key: Option<String>,
        transports: Vec<Arc<dyn Transport>>,
    ) -> Result<Self, SourceError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
            transports,
        })
    }

    /// Base URL (always ending with `/`).
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(path)
            .map_err(|error| SourceError::transport(path, format!("invalid endpoint: {error}")))
    }

    fn library_endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, SourceError> {
        let mut url = self.endpoint(&format!("{LIBRARY_PATH}{path}"))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    async fn get_bytes(&self, operation: &str, url: &Url) -> Result<Vec<u8>, SourceError> {
        let api_key = self.api_key.as_deref();
        let strategies = self
            .transports
            .iter()
            .map(|transport| Strategy::new(transport.name(), transport.get(url, api_key)))
            .collect();
        first_success(operation, strategies).await
    }

    async fn get_json(&self, operation: &str, url: &Url) -> Result<Value, SourceError> {
        let api_key = self.api_key.as_deref();
        let strategies = self
            .transports
            .iter()
            .map(|transport| {
                let attempt = async move {
                    let body = transport.get(url, api_key).await?;
                    parse_json(url, &body)
                }
                .boxed();
                Strategy::new(transport.name(), attempt)
            })
            .collect();
        first_success(operation, strategies).await
    }

    async fn post_json(
        &self,
        operation: &str,
        url: &Url,
        body: &Value,
    ) -> Result<Value, SourceError> {
        let api_key = self.api_key.as_deref();
        let strategies = self
            .transports
            .iter()
            .map(|transport| {
                let attempt = async move {
                    let response = transport.post_json(url, body, api_key).await?;
                    parse_json(url, &response)
                }
                .boxed();
                Strategy::new(transport.name(), attempt)
            })
            .collect();
        first_success(operation, strategies).await
    }

    /// Calls `connector/ping`; any non-blank body means Zotero is running.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when every transport fails or the body is blank.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<(), SourceError> {
        let url = self.endpoint("connector/ping")?;
        let body = self.get_bytes("connector ping", &url).await?;
        if is_alive_response(&body) {
            Ok(())
        } else {
            Err(SourceError::malformed("connector ping", "empty response body"))
        }
    }

    /// Lists a single item to prove the library endpoint answers.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when every transport fails or the payload is
    /// not an array.
    #[instrument(skip(self))]
    pub async fn probe_listing(&self) -> Result<(), SourceError> {
        let url = self.library_endpoint("items", &[("limit", "1")])?;
        let value = self.get_json("item listing", &url).await?;
        records(value, "items?limit=1").map(|_| ())
    }

    /// Quick search over the user library.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when every transport fails or the payload is
    /// not an array.
    #[instrument(skip(self))]
    pub async fn search_items(&self, query: &str) -> Result<Vec<ItemSummary>, SourceError> {
        let url = self.library_endpoint("items", &[("q", query.trim()), ("limit", SEARCH_LIMIT)])?;
        let value = self.get_json("search items", &url).await?;
        let summaries = records(value, "items?q=")?
            .iter()
            .filter_map(summary_from_json)
            .collect();
        Ok(filter_search_results(summaries))
    }

    /// Fetches one item record.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when every transport fails or the record cannot
    /// be normalized.
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_key: &str) -> Result<Item, SourceError> {
        let item_key = checked_key("item", item_key)?;
        let url = self.library_endpoint(&format!("items/{item_key}"), &[])?;
        let value = self.get_json("get item", &url).await?;
        item_from_json(&value)
    }

    /// Fetches the child records of an item, falling back to the
    /// `items?parentItem=` query when the `children` endpoint fails.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::BackendUnavailable`] when both endpoints fail.
    pub async fn children(&self, parent_key: &str) -> Result<Vec<Value>, SourceError> {
        let parent_key = checked_key("parent item", parent_key)?;
        let children_url = self.library_endpoint(&format!("items/{parent_key}/children"), &[])?;
        let query_url = self.library_endpoint("items", &[("parentItem", parent_key)])?;

        let strategies = vec![
            Strategy::new(
                "children endpoint",
                async {
                    let value = self.get_json("children", &children_url).await?;
                    records(value, "children")
                }
                .boxed(),
            ),
            Strategy::new(
                "parentItem query",
                async {
                    let value = self.get_json("parentItem query", &query_url).await?;
                    records(value, "items?parentItem=")
                }
                .boxed(),
            ),
        ];
        first_success(&format!("children of {parent_key}"), strategies).await
    }

    /// Collects the item's annotations from its direct children and from each
    /// attachment's children.
    ///
    /// Attachment children are fetched concurrently; a failing attachment
    /// contributes no annotations. Duplicates keep their first position.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the item's own children cannot be listed.
    #[instrument(skip(self))]
    pub async fn get_annotations(&self, item_key: &str) -> Result<Vec<Annotation>, SourceError> {
        let children = self.children(item_key).await?;
        let direct = annotations_in_position_order(&children, item_key);
        let attachments = attachment_keys(&children);
        debug!(
            direct = direct.len(),
            attachments = attachments.len(),
            "Listed item children"
        );

        let per_attachment = join_all(attachments.iter().map(|attachment_key| async move {
            match self.children(attachment_key).await {
                Ok(children) => annotations_in_position_order(&children, attachment_key),
                Err(error) => {
                    warn!(
                        attachment = %attachment_key,
                        error = %error,
                        "Skipping attachment whose children could not be listed"
                    );
                    Vec::new()
                }
            }
        }))
        .await;

        let discovered = direct
            .into_iter()
            .chain(per_attachment.into_iter().flatten())
            .map(|found| found.annotation);
        Ok(merge_annotations(discovered))
    }

    /// Downloads the rendered image of a selected-area annotation.
    ///
    /// Returns the first non-empty body among the file endpoints, or `None`.
    #[instrument(skip(self))]
    pub async fn annotation_image(
        &self,
        annotation_key: &str,
        attachment_key: Option<&str>,
    ) -> Option<Vec<u8>> {
        for url in self.image_candidates(annotation_key, attachment_key) {
            match self.get_bytes("annotation image", &url).await {
                Ok(bytes) if !bytes.is_empty() => {
                    debug!(url = %url, bytes = bytes.len(), "Fetched annotation image");
                    return Some(bytes);
                }
                Ok(_) => debug!(url = %url, "Annotation image endpoint returned no data"),
                Err(error) => debug!(url = %url, error = %error, "Annotation image endpoint failed"),
            }
        }
        None
    }

    fn image_candidates(&self, annotation_key: &str, attachment_key: Option<&str>) -> Vec<Url> {
        let Ok(annotation_key) = checked_key("annotation", annotation_key) else {
            debug!(annotation = annotation_key, "Skipping image lookup for invalid key");
            return Vec::new();
        };
        let mut candidates = vec![
            self.library_endpoint(&format!("items/{annotation_key}/file"), &[]),
            self.library_endpoint(&format!("items/{annotation_key}/file/view"), &[]),
        ];
        let attachment_key = attachment_key.and_then(|key| checked_key("attachment", key).ok());
        if let Some(attachment_key) = attachment_key {
            let query = [("annotation", annotation_key)];
            candidates.push(
                self.library_endpoint(&format!("items/{attachment_key}/file"), &query),
            );
            candidates.push(
                self.library_endpoint(&format!("items/{attachment_key}/file/view"), &query),
            );
        }
        candidates.into_iter().filter_map(Result::ok).collect()
    }

    /// Asks Better BibTeX for the item's citation key over JSON-RPC.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when every transport fails or the reply carries
    /// a JSON-RPC error.
    #[instrument(skip(self))]
    pub async fn citation_key(&self, item_key: &str) -> Result<Option<String>, SourceError> {
        let url = self.endpoint("better-bibtex/json-rpc")?;
        let request = json!({
            "jsonrpc": "2.0",
            "method": "item.citationkey",
            "params": [[item_key]],
        });
        let response = self.post_json("better bibtex json-rpc", &url, &request).await?;
        if let Some(error) = response.get("error").filter(|error| !error.is_null()) {
            return Err(SourceError::malformed("better bibtex json-rpc", error.to_string()));
        }
        Ok(citation_key_from_rpc(&response, item_key))
    }
}

/// Trims a Zotero object key and rejects anything but ASCII letters and
/// digits, so a key can never change the endpoint it is spliced into.
fn checked_key<'a>(what: &'static str, key: &'a str) -> Result<&'a str, SourceError> {
    let trimmed = key.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
        Ok(trimmed)
    } else {
        Err(SourceError::invalid_key(what, key))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, SourceError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let trimmed = if trimmed.is_empty() {
        DEFAULT_BASE_URL
    } else {
        trimmed
    };
    Url::parse(&format!("{trimmed}/")).map_err(|error| {
        SourceError::malformed("local api", format!("invalid base URL '{raw}': {error}"))
    })
}

fn parse_json(url: &Url, body: &[u8]) -> Result<Value, SourceError> {
    serde_json::from_slice(body).map_err(|error| {
        SourceError::malformed(url.path(), format!("response is not JSON: {error}"))
    })
}

fn is_alive_response(body: &[u8]) -> bool {
    !String::from_utf8_lossy(body).trim().is_empty()
}

/// Extracts a citation key from an `item.citationkey` reply.
///
/// `result` is either a map from item key to citation key or a bare string.
fn citation_key_from_rpc(response: &Value, item_key: &str) -> Option<String> {
    let result = response.get("result")?;
    let key = match result {
        Value::String(key) => Some(key.as_str()),
        Value::Object(map) => map
            .get(item_key)
            .or_else(|| {
                map.iter()
                    .find(|(name, _)| name.ends_with(&format!(":{item_key}")))
                    .map(|(_, value)| value)
            })
            .and_then(Value::as_str),
        _ => None,
    }?;
    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}
