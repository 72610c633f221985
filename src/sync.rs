//! One synchronization pass: scan disk, fetch the catalog, diff, and
//! (when enabled) download what is missing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::catalog::{self, CatalogError, CatalogProvider};
use crate::download::{self, ContentSource, DownloadConfig};
use crate::inventory;
use crate::reconcile::difference;
use crate::types::Category;

/// Counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryReport {
    pub local: usize,
    pub remote: usize,
    pub pending: usize,
    pub downloaded: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub restricted: CategoryReport,
    pub general: CategoryReport,
    pub download_enabled: bool,
}

impl SyncReport {
    pub fn get(&self, category: Category) -> &CategoryReport {
        match category {
            Category::Restricted => &self.restricted,
            Category::General => &self.general,
        }
    }

    fn get_mut(&mut self, category: Category) -> &mut CategoryReport {
        match category {
            Category::Restricted => &mut self.restricted,
            Category::General => &mut self.general,
        }
    }

    pub fn total_downloaded(&self) -> usize {
        self.restricted.downloaded + self.general.downloaded
    }

    fn log_summary(&self, elapsed: Duration) {
        tracing::info!("── Summary ──");
        for category in Category::ALL {
            let r = self.get(category);
            if self.download_enabled {
                tracing::info!(
                    "  {}: {} local, {} remote, {} to download, {} downloaded",
                    category,
                    r.local,
                    r.remote,
                    r.pending,
                    r.downloaded
                );
            } else {
                tracing::info!(
                    "  {}: {} local, {} remote, {} to download",
                    category,
                    r.local,
                    r.remote,
                    r.pending
                );
            }
        }
        tracing::info!("  elapsed: {}", format_duration(elapsed));
    }
}

/// Run one pass. Only a catalog failure is an error; per-item failures are
/// logged and show up as a lower downloaded count.
pub async fn run_sync(
    catalog: &dyn CatalogProvider,
    source: Arc<dyn ContentSource>,
    config: &DownloadConfig,
    download: bool,
    shutdown_token: CancellationToken,
) -> Result<SyncReport, CatalogError> {
    let started = Instant::now();
    let mut report = SyncReport {
        download_enabled: download,
        ..Default::default()
    };

    tracing::info!("Getting local images from {}...", config.directory.display());
    let local = match inventory::scan_all_blocking(config.directory.clone()).await {
        Ok(local) => local,
        Err(e) => match e.try_into_panic() {
            Ok(panic) => std::panic::resume_unwind(panic),
            Err(_) => return Err(CatalogError::Cancelled),
        },
    };
    for category in Category::ALL {
        tracing::info!("Local {} images count = {}", category, local.get(category).len());
    }

    tracing::info!("Getting all image ids from the catalog...");
    let remote = catalog::fetch_remote_inventory(catalog, &shutdown_token).await?;
    for category in Category::ALL {
        tracing::info!("Total {} images count = {}", category, remote.get(category).len());
    }

    let mut pending = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        let missing = difference(remote.get(category), local.get(category));
        tracing::info!("Total {} images to download = {}", category, missing.len());
        *report.get_mut(category) = CategoryReport {
            local: local.get(category).len(),
            remote: remote.get(category).len(),
            pending: missing.len(),
            downloaded: 0,
        };
        pending.push((category, missing));
    }

    if !download {
        tracing::warn!("--download not set, will not do actual work");
        report.log_summary(started.elapsed());
        return Ok(report);
    }

    for (category, missing) in pending {
        if shutdown_token.is_cancelled() {
            tracing::info!("Shutdown requested, skipping {} downloads", category);
            continue;
        }
        let persisted = download::download_items(
            Arc::clone(&source),
            category,
            missing.into_iter().collect(),
            config,
            shutdown_token.clone(),
        )
        .await;
        tracing::info!("Total {} images downloaded = {}", category, persisted.len());
        report.get_mut(category).downloaded = persisted.len();
    }

    report.log_summary(started.elapsed());
    Ok(report)
}

fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {:02}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}
