use tokio_util::sync::CancellationToken;

use super::error::DownloadError;
use super::source::ContentSource;
use super::{DownloadResult, FetchOutcome};
use crate::retry::{self, RetryAction, RetryConfig, RetryStop};
use crate::types::{Category, ItemId};

/// Fetch one item's bytes, retrying transient failures.
///
/// The identifier is validated first; a malformed one is reported without
/// touching the network. Each attempt races the cancellation token, and the
/// fixed wait between attempts ends early on cancellation.
pub async fn fetch_with_retry(
    source: &dyn ContentSource,
    raw_id: &str,
    category: Category,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
) -> DownloadResult {
    let id = match ItemId::parse(raw_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(category = %category, "Rejected before fetch: {}", e);
            return DownloadResult {
                id: raw_id.to_string(),
                category,
                outcome: FetchOutcome::Failed(e.into()),
            };
        }
    };

    let item = &id;
    let result = retry::retry_fixed(
        retry_config,
        cancel,
        |e: &DownloadError| {
            if e.is_retryable() {
                RetryAction::Retry
            } else {
                RetryAction::Abort
            }
        },
        move |attempt| async move {
            tracing::debug!(item = %item, attempt, "fetching");
            tokio::select! {
                res = source.fetch(item) => res,
                _ = cancel.cancelled() => Err(DownloadError::Cancelled(item.to_string())),
            }
        },
    )
    .await;

    let outcome = match result {
        Ok(payload) => {
            tracing::debug!(item = %id, size = payload.len(), "fetched");
            FetchOutcome::Fetched {
                item: id.clone(),
                payload,
            }
        }
        Err(RetryStop::Failed(e)) => FetchOutcome::Failed(e),
        Err(RetryStop::Cancelled(last)) => {
            tracing::debug!(item = %id, "cancelled while waiting to retry: {}", last);
            FetchOutcome::Failed(DownloadError::Cancelled(id.to_string()))
        }
    };

    DownloadResult {
        id: raw_id.to_string(),
        category,
        outcome,
    }
}
