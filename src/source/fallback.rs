//! Ordered fallback across backend strategies.
//!
//! A strategy is a named, not-yet-polled future. Futures are lazy, so building
//! the whole list up front performs no I/O; [`first_success`] polls them one at
//! a time and stops at the first success.

use futures_util::future::BoxFuture;
use tracing::{debug, warn};

use super::SourceError;

/// A named backend attempt.
pub struct Strategy<'a, T> {
    name: String,
    attempt: BoxFuture<'a, Result<T, SourceError>>,
}

impl<'a, T> Strategy<'a, T> {
    /// Wraps a boxed future under a strategy name used in logs and errors.
    #[must_use]
    pub fn new(name: impl Into<String>, attempt: BoxFuture<'a, Result<T, SourceError>>) -> Self {
        Self {
            name: name.into(),
            attempt,
        }
    }

    /// Returns the strategy name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> std::fmt::Debug for Strategy<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strategy").field("name", &self.name).finish()
    }
}

/// Tries strategies in order and returns the first success.
///
/// An `Ok` result is accepted as-is, including empty collections.
///
/// # Errors
///
/// Returns [`SourceError::BackendUnavailable`] carrying every strategy's
/// message when all strategies fail.
pub async fn first_success<T>(
    operation: &str,
    strategies: Vec<Strategy<'_, T>>,
) -> Result<T, SourceError> {
    let mut failures: Vec<(String, String)> = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        debug!(operation, strategy = %strategy.name, "Trying strategy");
        match strategy.attempt.await {
            Ok(value) => {
                if !failures.is_empty() {
                    debug!(
                        operation,
                        strategy = %strategy.name,
                        failed_before = failures.len(),
                        "Fallback strategy succeeded"
                    );
                }
                return Ok(value);
            }
            Err(error) => {
                warn!(
                    operation,
                    strategy = %strategy.name,
                    error = %error,
                    "Strategy failed, trying next"
                );
                failures.push((strategy.name, error.to_string()));
            }
        }
    }

    Err(SourceError::backend_unavailable(operation, &failures))
}
