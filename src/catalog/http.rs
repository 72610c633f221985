use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::error::CatalogError;
use super::{CatalogFilter, CatalogProvider};

/// User agent the catalog endpoint expects from its mobile client.
const CATALOG_USER_AGENT: &str = "ACGArt/5.0.0.0 CFNetwork/711.1.16 Darwin/14.0.0";

/// Query parameter that switches the catalog between its two views.
const FILTER_PARAM: &str = "sexyfilter";

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    data: Vec<ImageGroup>,
}

#[derive(Debug, Deserialize)]
struct ImageGroup {
    #[serde(default)]
    imgs: Vec<String>,
}

/// Parse a catalog body into the flat, in-order list of identifiers.
pub(crate) fn parse_catalog(body: &[u8]) -> Result<Vec<String>, CatalogError> {
    let response: CatalogResponse = serde_json::from_slice(body)?;
    Ok(response
        .data
        .into_iter()
        .flat_map(|group| group.imgs)
        .collect())
}

/// JSON-over-HTTP catalog.
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: Client,
    url: String,
}

impl HttpCatalog {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    async fn request(&self, filter: CatalogFilter) -> Result<Vec<String>, CatalogError> {
        let value = match filter {
            CatalogFilter::All => "no",
            CatalogFilter::General => "yes",
        };
        let response = self
            .client
            .get(&self.url)
            .query(&[(FILTER_PARAM, value)])
            .header(USER_AGENT, CATALOG_USER_AGENT)
            .header(ACCEPT, "*/*")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status().as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.bytes().await?;
        parse_catalog(&body)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for HttpCatalog {
    async fn fetch(
        &self,
        filter: CatalogFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, CatalogError> {
        tracing::debug!(?filter, url = %self.url, "querying catalog");
        tokio::select! {
            res = self.request(filter) => res,
            _ = cancel.cancelled() => Err(CatalogError::Cancelled),
        }
    }
}
