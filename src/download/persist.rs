//! Atomic publication of fetched payloads.
//!
//! Bytes go to `<id>.part` next to the final path, are flushed and synced,
//! then renamed into place. The final path therefore either does not exist or
//! holds the complete payload. A failed attempt may leave the `.part` file
//! behind; it is truncated and rewritten by the next run.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::error::PersistError;
use super::paths;
use super::{DownloadResult, FetchOutcome};
use crate::types::{Category, ItemId};

/// Writable temp file that can be forced to stable storage.
#[async_trait::async_trait]
pub(crate) trait PartFile: AsyncWrite + Unpin + Send {
    async fn sync(&mut self) -> io::Result<()>;
}

#[async_trait::async_trait]
impl PartFile for fs::File {
    async fn sync(&mut self) -> io::Result<()> {
        self.sync_all().await
    }
}

/// Persist a download result, returning the final path on success.
///
/// Failed and not-attempted results are logged and skipped. Persistence
/// errors are logged and reported as `None`; they never abort the batch.
pub async fn persist_result(root: &Path, result: DownloadResult) -> Option<PathBuf> {
    let DownloadResult {
        id,
        category,
        outcome,
    } = result;

    let (item, payload) = match outcome {
        FetchOutcome::Fetched { item, payload } => (item, payload),
        FetchOutcome::Failed(e) => {
            tracing::error!(category = %category, "Item not downloaded: {}: {}", id, e);
            return None;
        }
        FetchOutcome::NotAttempted => {
            tracing::warn!(category = %category, "Item not attempted: {}", id);
            return None;
        }
    };

    match persist_bytes(root, category, &item, &payload).await {
        Ok(path) => {
            tracing::info!("{} downloaded, size: {}", path.display(), payload.len());
            Some(path)
        }
        Err(e) => {
            tracing::error!(category = %category, item = %item, "{}", e);
            None
        }
    }
}

/// Write `payload` to the item's sharded path through a `.part` sibling.
pub async fn persist_bytes(
    root: &Path,
    category: Category,
    item: &ItemId,
    payload: &[u8],
) -> Result<PathBuf, PersistError> {
    let final_path = paths::artifact_path(root, category, item);
    let part_path = paths::part_path(&final_path);

    if let Some(parent) = final_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| PersistError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&part_path)
        .await
        .map_err(|source| PersistError::CreateFile {
            path: part_path.clone(),
            source,
        })?;

    write_and_publish(file, payload, &part_path, &final_path).await?;
    Ok(final_path)
}

/// Fill `file` (already open at `part_path`), sync it, close it, and rename
/// it over `final_path`. Nothing touches `final_path` unless every write
/// succeeded.
async fn write_and_publish<F: PartFile>(
    mut file: F,
    payload: &[u8],
    part_path: &Path,
    final_path: &Path,
) -> Result<(), PersistError> {
    let written = async {
        file.write_all(payload).await?;
        file.flush().await?;
        file.sync().await
    };
    written.await.map_err(|source| PersistError::Write {
        path: part_path.to_path_buf(),
        source,
    })?;
    drop(file);

    fs::rename(part_path, final_path)
        .await
        .map_err(|source| PersistError::Rename {
            from: part_path.to_path_buf(),
            to: final_path.to_path_buf(),
            source,
        })
}
