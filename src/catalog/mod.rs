//! Remote catalog: the authoritative list of what can be downloaded.
//!
//! The catalog only offers two views, "everything" and "general only", so
//! the restricted set is derived as the difference of the two. Both views are
//! separate requests; if the remote side changes between them the derived
//! restricted set can be off. A catalog that tagged each item with its
//! category would remove that gap.

pub mod error;
mod http;

use tokio_util::sync::CancellationToken;

pub use error::CatalogError;
pub use http::HttpCatalog;

use crate::inventory::{Inventories, Inventory};
use crate::reconcile::difference;

/// Which catalog view to request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFilter {
    All,
    General,
}

/// Source of the remote item list.
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// One request for one view. Errors are not retried by callers.
    async fn fetch(
        &self,
        filter: CatalogFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError>;
}

/// Fetch both views and split them into per-category inventories.
pub async fn fetch_remote_inventory(
    provider: &dyn CatalogProvider,
    cancel: &CancellationToken,
) -> Result<Inventories, CatalogError> {
    let (all, general) = tokio::try_join!(
        provider.fetch(CatalogFilter::All, cancel),
        provider.fetch(CatalogFilter::General, cancel),
    )?;

    let all: Inventory = all.into_iter().collect();
    let general: Inventory = general.into_iter().collect();
    let restricted = difference(&all, &general);

    tracing::debug!(
        all = all.len(),
        general = general.len(),
        restricted = restricted.len(),
        "catalog views fetched"
    );

    Ok(Inventories {
        restricted,
        general,
    })
}
