//! Main CatalogClient

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::ApiError;

/// Base URL of the public product service.
pub const DEFAULT_BASE_URL: &str = "https://fakestoreapi.com";

/// HTTP client for the remote product service.
///
/// Holds no state besides connection settings; every call is a single
/// request/response round trip. This client is cheap to clone (uses `Arc`
/// internally) and can be shared across tasks.
///
/// # Example
///
/// ```ignore
/// use catalog_lib::CatalogClient;
///
/// let client = CatalogClient::builder()
///     .url("https://fakestoreapi.com")
///     .timeout(Duration::from_secs(10))
///     .build()?;
///
/// let products = client.list_products().await?;
/// ```
#[derive(Clone)]
pub struct CatalogClient {
    pub(crate) inner: Arc<CatalogClientInner>,
}

pub(crate) struct CatalogClientInner {
    pub(crate) base_url: String,
    pub(crate) http_client: Client,
    pub(crate) timeout: Option<Duration>,
}

impl CatalogClient {
    /// Creates a new builder for constructing a client.
    pub fn builder() -> CatalogClientBuilder<Missing> {
        CatalogClientBuilder::new()
    }

    /// Returns the base URL of the product service.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Builds the absolute URL for a service path such as `products/3`.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Starts a request with the configured timeout applied.
    pub(crate) fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .inner
            .http_client
            .request(method, self.endpoint(path))
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        request
    }

    /// Sends a request, mapping transport failures.
    pub(crate) async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        request.send().await.map_err(|err| match self.inner.timeout {
            Some(timeout) if err.is_timeout() => ApiError::Timeout(timeout),
            _ => ApiError::from(err),
        })
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.inner.base_url)
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}

// =============================================================================
// Typestate Builder
// =============================================================================

/// Marker type for missing required builder fields.
pub struct Missing;

/// Marker type for set builder fields.
pub struct Set<T>(T);

/// Builder for constructing a [`CatalogClient`].
///
/// Uses the typestate pattern to ensure the base URL is set at compile time.
///
/// # Example
///
/// ```ignore
/// let client = CatalogClient::builder()
///     .url(DEFAULT_BASE_URL)
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
pub struct CatalogClientBuilder<U> {
    url: U,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    http_client: Option<Client>,
}

impl CatalogClientBuilder<Missing> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            url: Missing,
            timeout: None,
            connect_timeout: None,
            http_client: None,
        }
    }

    /// Sets the product service base URL.
    ///
    /// # Example
    ///
    /// ```ignore
    /// .url("https://fakestoreapi.com")
    /// ```
    pub fn url(self, url: impl Into<String>) -> CatalogClientBuilder<Set<String>> {
        CatalogClientBuilder {
            url: Set(url.into()),
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            http_client: self.http_client,
        }
    }
}

impl Default for CatalogClientBuilder<Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> CatalogClientBuilder<U> {
    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// This is applied when building the HTTP client.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets a custom HTTP client.
    ///
    /// If not set, a default client will be created.
    pub fn http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }
}

impl CatalogClientBuilder<Set<String>> {
    /// Builds the [`CatalogClient`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the base URL is not an absolute
    /// http(s) URL, or [`ApiError::Network`] if the HTTP client cannot be
    /// constructed.
    pub fn build(self) -> Result<CatalogClient, ApiError> {
        let base_url = self.url.0;
        let parsed =
            Url::parse(&base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                base_url,
                parsed.scheme()
            )));
        }

        let http_client = match self.http_client {
            Some(client) => client,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.connect_timeout {
                    builder = builder.connect_timeout(timeout);
                }
                builder.build()?
            }
        };

        Ok(CatalogClient {
            inner: Arc::new(CatalogClientInner {
                base_url,
                http_client,
                timeout: self.timeout,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        let client = CatalogClient::builder()
            .url("https://fakestoreapi.com/")
            .build()
            .unwrap();
        assert_eq!(client.endpoint("products"), "https://fakestoreapi.com/products");
        assert_eq!(client.endpoint("/products/3"), "https://fakestoreapi.com/products/3");
    }

    #[test]
    fn test_build_rejects_invalid_url() {
        let err = CatalogClient::builder().url("not a url").build().unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));

        let err = CatalogClient::builder()
            .url("ftp://fakestoreapi.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }
}
