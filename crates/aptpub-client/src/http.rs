//! HTTP client for the aptly REST API
//!
//! Stateless request/response primitives. Every call returns the decoded JSON
//! body; non-2xx responses become [`ClientError::Remote`]. Retries are left
//! to the caller.

use reqwest::{Method, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::config::{ClientConfig, ResolvedCredentials};
use crate::error::{ClientError, Result};

/// Low-level aptly API client
#[derive(Clone)]
pub struct AptlyClient {
    /// `<base>/api`
    base: Url,
    client: reqwest::Client,
    credentials: Option<ResolvedCredentials>,
    timeout_secs: u64,
    dry_run: bool,
}

impl AptlyClient {
    /// Create a client without contacting the service
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut base = Url::parse(&config.url).map_err(|e| ClientError::InvalidUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        base.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl {
                url: config.url.clone(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .push("api");

        let client = reqwest::Client::builder()
            // Credentials must not follow a redirect to another host
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::NetworkError {
                message: e.to_string(),
            })?;

        let credentials = config
            .credentials
            .as_ref()
            .map(|c| c.resolve())
            .transpose()?;

        Ok(Self {
            base,
            client,
            credentials,
            timeout_secs: config.timeout_secs,
            dry_run: config.dry_run,
        })
    }

    /// Create a client and check that the service answers
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        let version = client.get("/version", &[]).await?;
        tracing::debug!(
            "Connected to {} (aptly {})",
            config.url,
            version
                .get("Version")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown")
        );
        Ok(client)
    }

    /// Whether mutating requests are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Full URL of an API path such as `/snapshots/main-1/packages`
    ///
    /// Each path segment is percent-encoded separately.
    pub fn url_for(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(path.trim_start_matches('/').split('/'));
        }
        url
    }

    /// `GET path?query`
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = self.url_for(path);
        tracing::debug!("GET {} args={:?}", url, query);
        let request = self.authorize(self.client.get(url)).query(query);
        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        self.process(Method::GET, path, response).await
    }

    /// `POST path` with a JSON body
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        self.send_json(Method::POST, path, &[], Some(body)).await
    }

    /// `PUT path` with a JSON body
    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value> {
        self.send_json(Method::PUT, path, &[], Some(body)).await
    }

    /// `DELETE path?query`, optionally with a JSON body
    pub async fn delete<B: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Value> {
        self.send_json(Method::DELETE, path, query, body).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Value> {
        let url = self.url_for(path);
        let payload = body.map(serde_json::to_string).transpose()?;
        tracing::debug!("{} {}, data={}", method, url, payload.as_deref().unwrap_or(""));

        if self.dry_run {
            return Ok(Value::Null);
        }

        let mut request = self
            .authorize(self.client.request(method.clone(), url))
            .query(query);
        if let Some(payload) = payload {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        self.process(method, path, response).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/json");
        match &self.credentials {
            Some(creds) => request.header(reqwest::header::AUTHORIZATION, creds.auth_header()),
            None => request,
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout {
                seconds: self.timeout_secs,
            }
        } else {
            e.into()
        }
    }

    async fn process(&self, method: Method, path: &str, response: Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let reason = error_reason(&text)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ClientError::remote(
                status.as_u16(),
                reason,
                method.as_str(),
                path,
            ));
        }

        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

/// Extract the service's error message from an error body
///
/// The service answers either `{"error": "..."}` or `[{"error": "..."}]`.
fn error_reason(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = match &value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    object
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AptlyClient {
        AptlyClient::new(&ClientConfig::new("http://localhost:8080/").unwrap()).unwrap()
    }

    #[test]
    fn test_url_for() {
        let c = client();
        assert_eq!(
            c.url_for("/snapshots/main-1/packages").as_str(),
            "http://localhost:8080/api/snapshots/main-1/packages"
        );
        assert_eq!(
            c.url_for("/publish/s3:mirror:xenial/nightly").as_str(),
            "http://localhost:8080/api/publish/s3:mirror:xenial/nightly"
        );
    }

    #[test]
    fn test_url_for_encodes_segments() {
        let c = client();
        assert_eq!(
            c.url_for("/snapshots/odd name").as_str(),
            "http://localhost:8080/api/snapshots/odd%20name"
        );
    }

    #[test]
    fn test_url_for_base_with_path() {
        let c = AptlyClient::new(&ClientConfig::new("http://example.com/aptly").unwrap()).unwrap();
        assert_eq!(
            c.url_for("/publish").as_str(),
            "http://example.com/aptly/api/publish"
        );
    }

    #[test]
    fn test_error_reason() {
        assert_eq!(
            error_reason(r#"{"error": "snapshot not found"}"#).as_deref(),
            Some("snapshot not found")
        );
        assert_eq!(
            error_reason(r#"[{"error": "in use", "meta": "x"}]"#).as_deref(),
            Some("in use")
        );
        assert_eq!(error_reason("plain text"), None);
    }
}
