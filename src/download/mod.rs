//! Download engine: one task per missing item, gated by a fixed number of
//! admission slots, all results funnelled through one completion channel and
//! persisted as they are drained.

pub mod error;
pub mod file;
pub mod paths;
pub mod persist;
pub mod source;
#[cfg(test)]
mod testing;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::retry::RetryConfig;
use crate::types::{Category, ItemId};

pub use error::DownloadError;
pub use source::{ContentSource, HttpContentSource};

/// Subset of application config consumed by the download engine.
/// Decoupled from CLI parsing so the engine can be tested independently.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub(crate) directory: PathBuf,
    pub(crate) concurrency: usize,
    pub(crate) retry: RetryConfig,
    pub(crate) no_progress_bar: bool,
}

/// What happened to one item's fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched { item: ItemId, payload: Vec<u8> },
    Failed(DownloadError),
    NotAttempted,
}

/// Outcome of one item, handed from a fetch task to the persister.
#[derive(Debug)]
pub struct DownloadResult {
    pub id: String,
    pub category: Category,
    pub outcome: FetchOutcome,
}

/// Create a progress bar with a consistent template.
///
/// Returns `ProgressBar::hidden()` when the user passed `--no-progress-bar` or
/// stdout is not a TTY (e.g. piped output, cron jobs).
fn create_progress_bar(no_progress_bar: bool, total: u64) -> ProgressBar {
    if no_progress_bar || !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .map(|s| s.progress_chars("=> "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Fetch and persist every identifier in `ids` for one category.
///
/// At most `config.concurrency` fetches are in flight at any instant. Each
/// task takes a semaphore permit before fetching and gives it back as soon
/// as the fetch (with its retries) finishes. The completion channel holds at
/// most `concurrency` results; the drain loop below runs concurrently with the
/// tasks, so a small buffer never blocks progress.
///
/// Returns the final paths of the artifacts that were actually written.
pub async fn download_items(
    source: Arc<dyn ContentSource>,
    category: Category,
    ids: Vec<String>,
    config: &DownloadConfig,
    shutdown_token: CancellationToken,
) -> Vec<PathBuf> {
    let total = ids.len();
    if total == 0 {
        return Vec::new();
    }

    let concurrency = config.concurrency.max(1);
    let slots = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::channel::<DownloadResult>(concurrency);

    tracing::info!(
        category = %category,
        items = total,
        concurrency,
        "starting downloads"
    );

    for id in ids {
        let source = Arc::clone(&source);
        let slots = Arc::clone(&slots);
        let tx = tx.clone();
        let cancel = shutdown_token.clone();
        let retry_config = config.retry;

        tokio::spawn(async move {
            let result =
                run_item(source.as_ref(), &slots, id, category, &retry_config, &cancel).await;
            // The receiver only goes away if the drain loop itself is gone.
            let _ = tx.send(result).await;
        });
    }
    // Only task-held senders remain, so `recv` yields `None` if a task dies.
    drop(tx);

    let pb = create_progress_bar(config.no_progress_bar, total as u64);
    let mut persisted = Vec::new();

    for received in 0..total {
        let Some(result) = rx.recv().await else {
            pb.suspend(|| {
                tracing::error!(
                    category = %category,
                    "Completion channel closed early; {} results missing",
                    total - received
                )
            });
            break;
        };
        pb.set_message(result.id.clone());
        if let Some(path) = persist::persist_result(&config.directory, result).await {
            persisted.push(path);
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    persisted
}

/// One unit of work: wait for a slot, fetch with retries, release the slot.
async fn run_item(
    source: &dyn ContentSource,
    slots: &Semaphore,
    id: String,
    category: Category,
    retry_config: &RetryConfig,
    cancel: &CancellationToken,
) -> DownloadResult {
    let permit = tokio::select! {
        permit = slots.acquire() => permit.ok(),
        _ = cancel.cancelled() => None,
    };
    let Some(permit) = permit else {
        return DownloadResult {
            id,
            category,
            outcome: FetchOutcome::NotAttempted,
        };
    };

    let result = file::fetch_with_retry(source, &id, category, retry_config, cancel).await;
    drop(permit);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves `id` as the payload after a short pause, tracking how many
    /// fetches overlap.
    #[derive(Default)]
    struct GaugedSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ContentSource for GaugedSource {
        async fn fetch(&self, id: &ItemId) -> Result<Vec<u8>, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                Err(DownloadError::HttpStatus {
                    status: 500,
                    id: id.to_string(),
                })
            } else {
                Ok(id.as_str().as_bytes().to_vec())
            }
        }
    }

    fn test_config(dir: &Path, concurrency: usize) -> DownloadConfig {
        DownloadConfig {
            directory: dir.to_path_buf(),
            concurrency,
            retry: RetryConfig {
                max_attempts: 3,
                delay: Duration::from_millis(1),
            },
            no_progress_bar: true,
        }
    }

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{}.jpg", 150_000_000 + i)).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_never_exceeds_limit() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(GaugedSource::default());
        let paths = download_items(
            source.clone(),
            Category::General,
            ids(24),
            &test_config(dir.path(), 3),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(paths.len(), 24);
        assert!(source.peak.load(Ordering::SeqCst) <= 3);
        assert!(source.peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 24);
    }

    #[tokio::test]
    async fn test_all_results_drained_with_small_channel() {
        // 50 items through a one-slot channel: the drain loop must keep up.
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(GaugedSource::default());
        let paths = download_items(
            source,
            Category::Restricted,
            ids(50),
            &test_config(dir.path(), 1),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(paths.len(), 50);
        for path in &paths {
            let name = path.file_name().unwrap().to_str().unwrap();
            assert_eq!(std::fs::read(path).unwrap(), name.as_bytes());
        }
    }

    #[tokio::test]
    async fn test_failures_are_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(GaugedSource {
            fail: true,
            ..Default::default()
        });
        let paths = download_items(
            source.clone(),
            Category::General,
            ids(4),
            &test_config(dir.path(), 2),
            CancellationToken::new(),
        )
        .await;
        assert!(paths.is_empty());
        // 3 attempts per item.
        assert_eq!(source.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test]
    async fn test_malformed_ids_do_not_block_batch() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(GaugedSource::default());
        let paths = download_items(
            source.clone(),
            Category::General,
            vec!["abcdef.jpg".into(), "1234567.jpg".into()],
            &test_config(dir.path(), 2),
            CancellationToken::new(),
        )
        .await;
        assert_eq!(paths.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch_attempts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(GaugedSource::default());
        let token = CancellationToken::new();
        token.cancel();
        let paths = download_items(
            source.clone(),
            Category::General,
            ids(10),
            &test_config(dir.path(), 2),
            token,
        )
        .await;
        // A task may still win a free slot before seeing the token, but its
        // fetch then loses the race against the cancelled token.
        assert!(paths.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(GaugedSource::default());
        let paths = download_items(
            source,
            Category::General,
            Vec::new(),
            &test_config(dir.path(), 4),
            CancellationToken::new(),
        )
        .await;
        assert!(paths.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_body_is_retried_and_never_persisted() {
        let (base, accepted) =
            testing::serve_raw(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc").await;
        let dir = tempfile::tempdir().unwrap();
        let source: Arc<dyn ContentSource> =
            Arc::new(HttpContentSource::new(reqwest::Client::new(), base));
        let persisted = download_items(
            source,
            Category::General,
            vec!["1234567.jpg".into()],
            &test_config(dir.path(), 1),
            CancellationToken::new(),
        )
        .await;

        assert!(persisted.is_empty());
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
        let id = ItemId::parse("1234567.jpg").unwrap();
        let final_path = paths::artifact_path(dir.path(), Category::General, &id);
        assert!(!final_path.exists());
        assert!(!paths::part_path(&final_path).exists());
    }
}
