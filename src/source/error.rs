//! Error types for Zotero backend access.
//!
//! Messages follow the What/Why/Fix pattern used across the project.

use thiserror::Error;

/// Errors raised while reading from the Zotero database or local API.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The local Zotero database could not be located or opened.
    #[error("Zotero database unavailable: {reason}\n  Suggestion: {suggestion}")]
    DatabaseUnavailable {
        /// Why the database is unavailable
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// A database query failed.
    #[error("Zotero database query '{query}' failed: {reason}")]
    Database {
        /// Short name of the query
        query: String,
        /// Underlying driver message
        reason: String,
    },

    /// A record was not found.
    #[error("{what} '{key}' not found")]
    NotFound {
        /// Kind of record
        what: &'static str,
        /// Record key
        key: String,
    },

    /// The HTTP request could not be sent or its body read.
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// Request URL
        url: String,
        /// Underlying client message
        reason: String,
    },

    /// The local API answered with a non-success status.
    #[error("Zotero HTTP {status} for {url}: {body}")]
    Http {
        /// Request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body (truncated)
        body: String,
    },

    /// A backend returned a shape that cannot be interpreted.
    #[error("malformed response from {backend}: {detail}")]
    MalformedResponse {
        /// Backend or endpoint name
        backend: String,
        /// What was wrong with the response
        detail: String,
    },

    /// A key that cannot be a Zotero object key.
    #[error("invalid {what} key '{key}'\n  Suggestion: Zotero keys contain only letters and digits (e.g. ABCD2345)")]
    InvalidKey {
        /// Kind of record
        what: &'static str,
        /// The rejected key
        key: String,
    },

    /// Every strategy of a fallback chain failed.
    #[error("{operation} failed on every backend: {failures}\n  Suggestion: Make sure Zotero is running, or point --zotero-db at zotero.sqlite")]
    BackendUnavailable {
        /// The logical operation attempted
        operation: String,
        /// `strategy: message` entries joined with `" | "`
        failures: String,
    },
}

/// Maximum number of body characters kept in [`SourceError::Http`].
const MAX_BODY_CHARS: usize = 300;

impl SourceError {
    /// Creates a `DatabaseUnavailable` error.
    #[must_use]
    pub fn database_unavailable(reason: impl Into<String>) -> Self {
        Self::DatabaseUnavailable {
            reason: reason.into(),
            suggestion: "Set ZOTERO_SQLITE_PATH (or --zotero-db) to the zotero.sqlite file"
                .to_string(),
        }
    }

    /// Creates a `Database` error from a driver error.
    #[must_use]
    pub fn database(query: &str, error: &sqlx::Error) -> Self {
        Self::Database {
            query: query.to_string(),
            reason: error.to_string(),
        }
    }

    /// Creates a `Transport` error.
    #[must_use]
    pub fn transport(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Creates an `Http` error; the body is truncated for display.
    #[must_use]
    pub fn http(url: &str, status: u16, body: &[u8]) -> Self {
        let body: String = String::from_utf8_lossy(body)
            .chars()
            .take(MAX_BODY_CHARS)
            .collect();
        Self::Http {
            url: url.to_string(),
            status,
            body,
        }
    }

    /// Creates a `MalformedResponse` error.
    #[must_use]
    pub fn malformed(backend: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            backend: backend.into(),
            detail: detail.into(),
        }
    }

    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(what: &'static str, key: &str) -> Self {
        Self::NotFound {
            what,
            key: key.to_string(),
        }
    }

    /// Creates an `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(what: &'static str, key: &str) -> Self {
        Self::InvalidKey {
            what,
            key: key.to_string(),
        }
    }

    /// Creates a `BackendUnavailable` error from `(strategy, message)` pairs.
    #[must_use]
    pub fn backend_unavailable(operation: &str, failures: &[(String, String)]) -> Self {
        let failures = if failures.is_empty() {
            "no strategies configured".to_string()
        } else {
            failures
                .iter()
                .map(|(strategy, message)| format!("{strategy}: {}", single_line(message)))
                .collect::<Vec<_>>()
                .join(" | ")
        };
        Self::BackendUnavailable {
            operation: operation.to_string(),
            failures,
        }
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_unavailable_embeds_every_failure() {
        let err = SourceError::backend_unavailable(
            "get item",
            &[
                ("database".to_string(), "no such table: items".to_string()),
                (
                    "local api".to_string(),
                    "connection refused\n  retry later".to_string(),
                ),
            ],
        );
        let msg = err.to_string();
        assert!(msg.contains("get item"));
        assert!(msg.contains("database: no such table: items"));
        assert!(msg.contains("local api: connection refused retry later"));
        assert!(msg.contains("Suggestion"));
    }

    #[test]
    fn test_http_error_truncates_body() {
        let body = vec![b'x'; 1000];
        let err = SourceError::http("http://127.0.0.1/api", 500, &body);
        if let SourceError::Http { body, status, .. } = err {
            assert_eq!(status, 500);
            assert_eq!(body.len(), MAX_BODY_CHARS);
        } else {
            panic!("Expected SourceError::Http");
        }
    }

    #[test]
    fn test_database_unavailable_has_suggestion() {
        let msg = SourceError::database_unavailable("file missing").to_string();
        assert!(msg.contains("file missing"));
        assert!(msg.contains("ZOTERO_SQLITE_PATH"));
    }
}
