use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use log::{debug, warn};
use reqwest::header::{HeaderMap, SET_COOKIE};
use tokio::sync::RwLock;
use url::Url;

use crate::api::models::{StreamConfig, StreamConfigInput};
use crate::{Error, Result};

/// Header echoing the CSRF cookie on mutating calls
const CSRF_HEADER: &str = "X-CSRFToken";

/// Cookie holding the CSRF token
const CSRF_COOKIE: &str = "csrftoken";

/// CRUD client for stream configuration records.
///
/// Mutating calls echo the `csrftoken` cookie obtained from an initial
/// priming request; backends without CSRF protection simply never hand out
/// the cookie and the header is omitted.
pub struct ApiClient {
    /// HTTP client with a cookie store
    http: reqwest::Client,

    /// Base URL, always with a trailing slash
    base_url: Url,

    /// Token captured from the priming request
    csrf_token: Arc<RwLock<Option<String>>>,

    /// Set once the priming request has run
    primed: Arc<AtomicBool>,
}

impl ApiClient {
    /// Create a client for the given API base URL
    pub fn new(base_url: &str) -> Result<Self> {
        ApiClient::with_timeout(base_url, Duration::from_secs(10))
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid API base URL: {}", e)))?;

        // Joining relative paths silently drops the last segment otherwise
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(ApiClient {
            http,
            base_url: base,
            csrf_token: Arc::new(RwLock::new(None)),
            primed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// List stream configurations.
    ///
    /// Falls back to the seed list when the primary listing fails, so a
    /// fresh deployment still has something to show.
    pub async fn list_streams(&self) -> Result<Vec<StreamConfig>> {
        match self.fetch_list("streams/").await {
            Ok(streams) => Ok(streams),
            Err(e) => {
                warn!("Stream list failed ({}), falling back to defaults", e);
                self.fetch_list("streams/default/").await
            }
        }
    }

    /// Fetch one stream configuration
    pub async fn get_stream(&self, id: i64) -> Result<StreamConfig> {
        let url = self.url(&format!("streams/{}/", id))?;
        let response = self.check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Create a stream configuration
    pub async fn create_stream(&self, input: &StreamConfigInput) -> Result<StreamConfig> {
        let url = self.url("streams/")?;
        let request = self.with_csrf(self.http.post(url)).await?.json(input);
        let response = self.check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Replace a stream configuration
    pub async fn update_stream(&self, id: i64, input: &StreamConfigInput) -> Result<StreamConfig> {
        let url = self.url(&format!("streams/{}/", id))?;
        let request = self.with_csrf(self.http.put(url)).await?.json(input);
        let response = self.check(request.send().await?).await?;
        Ok(response.json().await?)
    }

    /// Delete a stream configuration
    pub async fn delete_stream(&self, id: i64) -> Result<()> {
        let url = self.url(&format!("streams/{}/", id))?;
        let request = self.with_csrf(self.http.delete(url)).await?;
        self.check(request.send().await?).await?;
        Ok(())
    }

    async fn fetch_list(&self, path: &str) -> Result<Vec<StreamConfig>> {
        let url = self.url(path)?;
        let response = self.check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::api(format!("Invalid path {}: {}", path, e)))
    }

    /// Attach the CSRF header when the backend handed out a token
    async fn with_csrf(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        let token = self.ensure_csrf().await?;
        Ok(match token {
            Some(token) => request.header(CSRF_HEADER, token),
            None => request,
        })
    }

    /// Run the priming request once and capture the CSRF cookie
    async fn ensure_csrf(&self) -> Result<Option<String>> {
        if self.primed.load(Ordering::SeqCst) {
            return Ok(self.csrf_token.read().await.clone());
        }

        let response = self.http.get(self.base_url.clone()).send().await?;
        let token = extract_csrf_token(response.headers());

        match &token {
            Some(_) => debug!("CSRF token captured from priming request"),
            None => debug!("No CSRF cookie offered; proceeding without one"),
        }

        {
            let mut slot = self.csrf_token.write().await;
            *slot = token.clone();
        }
        self.primed.store(true, Ordering::SeqCst);

        Ok(token)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(Error::api(format!("Unexpected status {}: {}", status, body)))
    }
}

/// Pull the CSRF token out of Set-Cookie headers
fn extract_csrf_token(headers: &HeaderMap) -> Option<String> {
    for value in headers.get_all(SET_COOKIE) {
        let Ok(text) = value.to_str() else { continue };
        let Some(pair) = text.split(';').next() else { continue };
        let Some((name, token)) = pair.split_once('=') else { continue };
        if name.trim() == CSRF_COOKIE && !token.trim().is_empty() {
            return Some(token.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_base_url_gains_trailing_slash() {
        let client = ApiClient::new("http://127.0.0.1:8000/api").unwrap();
        assert_eq!(client.base_url.as_str(), "http://127.0.0.1:8000/api/");

        let url = client.url("streams/").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/streams/");
    }

    #[test]
    fn test_record_url_includes_id() {
        let client = ApiClient::new("http://127.0.0.1:8000/api/").unwrap();
        let url = client.url(&format!("streams/{}/", 7)).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/streams/7/");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(ApiClient::new("not a url").is_err());
    }

    #[test]
    fn test_extract_csrf_token() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("sessionid=xyz; Path=/; HttpOnly"),
        );
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("csrftoken=abc123; Path=/; SameSite=Lax"),
        );

        assert_eq!(extract_csrf_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_extract_csrf_token_absent() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("sessionid=xyz; Path=/"));

        assert!(extract_csrf_token(&headers).is_none());
    }
}
