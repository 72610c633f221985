use thiserror::Error;

/// Catalog failures. Every variant is fatal for the run: without the catalog
/// there is nothing to diff against.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Catalog response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog request cancelled")]
    Cancelled,
}
