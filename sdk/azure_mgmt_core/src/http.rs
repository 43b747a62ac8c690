//! Raw request and response types exchanged with the pipeline.
//!
//! Higher-level crates build an [`ArmRequest`], hand it to
//! [`ArmClient::send`](crate::client::ArmClient::send), and inspect the
//! returned [`RawResponse`]. Both types are plain data: they can be cloned,
//! stored on an operation handle, and rebuilt in tests without a server.

use crate::error::ArmResult;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

pub use reqwest::Method;

/// Header naming the status monitor of an Azure asynchronous operation.
pub const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// Header naming the status monitor of a long-running operation.
pub const OPERATION_LOCATION: &str = "operation-location";

/// Standard `Location` header.
pub const LOCATION: &str = "location";

/// Standard `Retry-After` header, in seconds.
pub const RETRY_AFTER: &str = "retry-after";

/// Millisecond retry hints, checked before `Retry-After`.
const RETRY_AFTER_MS_HEADERS: [&str; 2] = ["retry-after-ms", "x-ms-retry-after-ms"];

/// One HTTP request to be sent through the pipeline.
#[derive(Debug, Clone)]
pub struct ArmRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ArmRequest {
    /// Create a request with no headers and no body.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a `GET` request for an absolute URL.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Serialize `body` as the JSON request body.
    pub fn with_json<T: serde::Serialize + ?Sized>(mut self, body: &T) -> ArmResult<Self> {
        let bytes = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }

    /// Set a query parameter, replacing any existing parameter of that name.
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        set_query_param(&mut self.url, key, value);
        self
    }
}

/// Set `key=value` on `url`, dropping earlier occurrences of `key`.
fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(retained);
        pairs.append_pair(key, value);
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl RawResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Read the whole body of a `reqwest` response.
    pub async fn from_reqwest(response: reqwest::Response) -> ArmResult<Self> {
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        Ok(Self::new(status, headers, body))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Look up a header as a string. Names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the body is empty or only whitespace.
    pub fn is_body_empty(&self) -> bool {
        self.body.iter().all(u8::is_ascii_whitespace)
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> ArmResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parse the body as a JSON value, or `None` when the body is empty.
    pub fn json_value(&self) -> ArmResult<Option<serde_json::Value>> {
        if self.is_body_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&self.body)?))
    }

    /// The server's suggested delay before the next request.
    ///
    /// `retry-after-ms` and `x-ms-retry-after-ms` take precedence over
    /// `Retry-After`, which is read as whole seconds.
    pub fn retry_after(&self) -> Option<Duration> {
        for name in RETRY_AFTER_MS_HEADERS {
            if let Some(ms) = self.header(name).and_then(|v| v.trim().parse::<u64>().ok()) {
                return Some(Duration::from_millis(ms));
            }
        }
        self.header(RETRY_AFTER)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with_headers(pairs: &[(&'static str, &'static str)]) -> RawResponse {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(value));
        }
        RawResponse::new(200, headers, Bytes::new())
    }

    #[test]
    fn retry_after_seconds() {
        let response = response_with_headers(&[("retry-after", "2")]);
        assert_eq!(response.retry_after(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn retry_after_ms_takes_precedence() {
        let response = response_with_headers(&[("retry-after", "10"), ("retry-after-ms", "250")]);
        assert_eq!(response.retry_after(), Some(Duration::from_millis(250)));

        let response = response_with_headers(&[("x-ms-retry-after-ms", "40")]);
        assert_eq!(response.retry_after(), Some(Duration::from_millis(40)));
    }

    #[test]
    fn retry_after_ignores_garbage() {
        let response = response_with_headers(&[("retry-after", "soon")]);
        assert_eq!(response.retry_after(), None);
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = response_with_headers(&[("location", "https://example.com/ops/1")]);
        assert_eq!(response.header("Location"), Some("https://example.com/ops/1"));
    }

    #[test]
    fn empty_body_has_no_json_value() {
        let response = RawResponse::new(200, HeaderMap::new(), "  \n");
        assert!(response.is_body_empty());
        assert!(response.json_value().unwrap().is_none());

        let response = RawResponse::new(200, HeaderMap::new(), "null");
        assert_eq!(response.json_value().unwrap(), Some(serde_json::Value::Null));
    }

    #[test]
    fn with_query_replaces_existing_value() {
        let url = Url::parse("https://example.com/items?api-version=old&$top=5").unwrap();
        let request = ArmRequest::get(url).with_query("api-version", "2024-01-01");
        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("$top".to_string(), "5".to_string()),
                ("api-version".to_string(), "2024-01-01".to_string()),
            ]
        );
    }

    #[test]
    fn with_json_sets_content_type() {
        let url = Url::parse("https://example.com/items/a").unwrap();
        let request = ArmRequest::new(Method::PUT, url)
            .with_json(&serde_json::json!({"location": "westus"}))
            .unwrap();
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            request.body().unwrap().as_ref(),
            br#"{"location":"westus"}"#
        );
    }
}
