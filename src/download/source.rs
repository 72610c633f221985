use futures_util::StreamExt;
use reqwest::Client;

use super::error::DownloadError;
use crate::types::ItemId;

/// Upper bound on the buffer reserved from an advertised `Content-Length`.
/// Larger bodies still arrive; they just grow the buffer as they stream.
const MAX_PREALLOC: u64 = 8 << 20;

/// Where item payloads come from. One call is one attempt; retries are the
/// caller's business.
#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, id: &ItemId) -> Result<Vec<u8>, DownloadError>;
}

/// Content endpoint reached by appending the identifier to a base URL.
#[derive(Debug, Clone)]
pub struct HttpContentSource {
    client: Client,
    base_url: String,
}

impl HttpContentSource {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { client, base_url }
    }

    pub fn url_for(&self, id: &ItemId) -> String {
        format!("{}{}", self.base_url, id)
    }
}

#[async_trait::async_trait]
impl ContentSource for HttpContentSource {
    async fn fetch(&self, id: &ItemId) -> Result<Vec<u8>, DownloadError> {
        let id_str = id.to_string();
        let response = self
            .client
            .get(self.url_for(id))
            .send()
            .await
            .map_err(|e| DownloadError::Http {
                id: id_str.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                status: response.status().as_u16(),
                id: id_str,
            });
        }

        let content_length = response.content_length();
        let mut body = Vec::with_capacity(content_length.unwrap_or(0).min(MAX_PREALLOC) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                tracing::debug!(
                    "Body read error for {} (content_length={:?}, bytes_so_far={}): {}",
                    id_str,
                    content_length,
                    body.len(),
                    e
                );
                DownloadError::Http {
                    id: id_str.clone(),
                    source: e,
                }
            })?;
            body.extend_from_slice(&chunk);
        }

        check_complete(&id_str, content_length, body.len() as u64)?;
        Ok(body)
    }
}

/// A payload only counts as fetched when every advertised byte arrived.
fn check_complete(id: &str, expected: Option<u64>, received: u64) -> Result<(), DownloadError> {
    match expected {
        Some(expected) if expected != received => Err(DownloadError::Truncated {
            id: id.to_string(),
            expected,
            received,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::testing::serve_raw;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn id(s: &str) -> ItemId {
        ItemId::parse(s).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let source = HttpContentSource::new(Client::new(), "http://host/640");
        assert_eq!(source.url_for(&id("100001.jpg")), "http://host/640/100001.jpg");
    }

    #[test]
    fn test_check_complete() {
        assert!(check_complete("x", Some(4), 4).is_ok());
        assert!(check_complete("x", None, 4).is_ok());
        assert!(matches!(
            check_complete("x", Some(10), 4),
            Err(DownloadError::Truncated {
                expected: 10,
                received: 4,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img/1234567.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .mount(&server)
            .await;

        let source = HttpContentSource::new(Client::new(), format!("{}/img/", server.uri()));
        let body = source.fetch(&id("1234567.jpg")).await.unwrap();
        assert_eq!(body, b"jpegdata");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let source = HttpContentSource::new(Client::new(), server.uri());
        let err = source.fetch(&id("1234567.jpg")).await.unwrap_err();
        assert!(matches!(err, DownloadError::HttpStatus { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let source = HttpContentSource::new(Client::new(), "http://127.0.0.1:1/");
        let err = source.fetch(&id("1234567.jpg")).await.unwrap_err();
        assert!(matches!(err, DownloadError::Http { .. }));
    }

    #[tokio::test]
    async fn test_oversized_content_length_is_not_preallocated() {
        let (base, _) =
            serve_raw(b"HTTP/1.1 200 OK\r\nContent-Length: 1000000000000000000\r\n\r\nabc").await;
        let source = HttpContentSource::new(Client::new(), base);
        let err = source.fetch(&id("1234567.jpg")).await.unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Http { .. } | DownloadError::Truncated { .. }
        ));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_body_cut_short_is_an_error() {
        let (base, accepted) =
            serve_raw(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc").await;
        let source = HttpContentSource::new(Client::new(), base);
        let err = source.fetch(&id("1234567.jpg")).await.unwrap_err();
        assert!(matches!(
            err,
            DownloadError::Http { .. } | DownloadError::Truncated { .. }
        ));
        assert_eq!(accepted.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
