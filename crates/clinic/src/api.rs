//! Request client for the clinic backend
//!
//! Every endpoint replies with an [`Envelope`]. [`ApiClient::send`] turns a
//! failed call into a danger toast plus an [`ApiError`]; [`ApiClient::request`]
//! does the same call without notifying, for callers with their own failure
//! policy (chat, board, charts).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::Envelope;
use thiserror::Error;
use url::Url;

use crate::notify::Notifier;

/// Shown when the server gave no usable error text
pub const GENERIC_ERROR: &str = "שגיאה בשרת";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("server returned {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Server { status: u16, message: Option<String> },

    #[error("request rejected: {}", .message.as_deref().unwrap_or("no details"))]
    Rejected { message: Option<String> },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to encode request body: {0}")]
    Encode(String),
}

impl ApiError {
    /// Localized text for the toast
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server { message: Some(m), .. } | ApiError::Rejected { message: Some(m) } => {
                m.clone()
            }
            _ => GENERIC_ERROR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Structured value, serialized to JSON on the wire
    Json(serde_json::Value),
    /// Already-encoded body, sent unchanged
    Raw(String),
}

impl Body {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Body::from)
            .map_err(|e| ApiError::Encode(e.to_string()))
    }

    /// Encoded text for the request; a JSON null sends no body at all
    fn into_wire(self) -> Result<Option<String>, ApiError> {
        match self {
            Body::Json(serde_json::Value::Null) => Ok(None),
            Body::Json(value) => serde_json::to_string(&value)
                .map(Some)
                .map_err(|e| ApiError::Encode(e.to_string())),
            Body::Raw(raw) => Ok(Some(raw)),
        }
    }
}

impl From<serde_json::Value> for Body {
    /// Objects, arrays and null are structured; other primitives pass through as text
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(_) | serde_json::Value::Array(_) | serde_json::Value::Null => {
                Body::Json(value)
            }
            serde_json::Value::String(s) => Body::Raw(s),
            other => Body::Raw(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Body>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            body: None,
        }
    }

    pub fn delete() -> Self {
        Self {
            method: Method::Delete,
            body: None,
        }
    }

    pub fn post(body: impl Into<Body>) -> Self {
        Self {
            method: Method::Post,
            body: Some(body.into()),
        }
    }

    pub fn put(body: impl Into<Body>) -> Self {
        Self {
            method: Method::Put,
            body: Some(body.into()),
        }
    }
}

/// What actually goes over the wire
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// HTTP transport backed by reqwest
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Decoded reply plus the HTTP status it arrived with
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub envelope: Envelope,
}

impl ApiResponse {
    /// Apply the envelope contract: 2xx and `success: true`
    pub fn into_result(self) -> Result<Envelope, ApiError> {
        if !(200..300).contains(&self.status) {
            return Err(ApiError::Server {
                status: self.status,
                message: self.envelope.error_message().map(String::from),
            });
        }
        if !self.envelope.success {
            return Err(ApiError::Rejected {
                message: self.envelope.error_message().map(String::from),
            });
        }
        Ok(self.envelope)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    transport: Arc<dyn Transport>,
    notifier: Notifier,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        transport: Arc<dyn Transport>,
        notifier: Notifier,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            transport,
            notifier,
            session_cookie: None,
        })
    }

    /// Attach the backend's session cookie to every request
    pub fn with_session_cookie(mut self, cookie: Option<String>) -> Self {
        self.session_cookie = cookie.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Resolve a root-relative path (query string allowed) against the base URL
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    /// Perform a call and decode the envelope. Never notifies.
    ///
    /// Only transport and decode failures are errors here; status and
    /// `success` are left to [`ApiResponse::into_result`].
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        let url = self.url(path)?;
        let mut headers = vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ];
        if let Some(cookie) = &self.session_cookie {
            headers.push(("Cookie".to_string(), cookie.clone()));
        }
        let body = match options.body {
            Some(body) => body.into_wire()?,
            None => None,
        };

        tracing::debug!("{} {}", options.method.as_str(), url);
        let resp = self
            .transport
            .execute(HttpRequest {
                method: options.method,
                url,
                headers,
                body,
            })
            .await?;

        let envelope: Envelope = serde_json::from_str(&resp.body)
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        Ok(ApiResponse {
            status: resp.status,
            envelope,
        })
    }

    /// Perform a call; on any failure raise a danger toast and return the error.
    ///
    /// The envelope is returned verbatim, `data` is left to the caller.
    pub async fn send(&self, path: &str, options: RequestOptions) -> Result<Envelope, ApiError> {
        let method = options.method;
        let result = match self.request(path, options).await {
            Ok(resp) => resp.into_result(),
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            tracing::warn!("{} {} failed: {}", method.as_str(), path, e);
            self.notifier.danger(e.user_message());
        }
        result
    }

    /// GET a payload and decode its `data`
    pub async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let envelope = self.send(path, RequestOptions::get()).await?;
        let decoded = envelope
            .decode_data::<T>()
            .map_err(|e| ApiError::Decode(e.to_string()))
            .and_then(|data| data.ok_or_else(|| ApiError::Decode("response has no data".to_string())));
        if let Err(e) = &decoded {
            tracing::warn!("GET {} returned an unusable payload: {}", path, e);
            self.notifier.danger(e.user_message());
        }
        decoded
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::notify::Severity;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_returns_envelope_verbatim() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true, "data": {"id": "p1"}}));
        let client = client(&transport);

        let env = client.send("/api/patients/p1", RequestOptions::get()).await.unwrap();
        assert_eq!(env.data, Some(json!({"id": "p1"})));
        assert!(client.notifier().active().is_empty());

        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::Get);
        assert_eq!(sent[0].url.as_str(), "http://clinic.test/api/patients/p1");
        assert_eq!(sent[0].body, None);
    }

    #[tokio::test]
    async fn test_structured_body_is_serialized() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true}));
        let client = client(&transport);

        client
            .send("/api/patients", RequestOptions::post(json!({"full_name": "Dana Cohen"})))
            .await
            .unwrap();

        let sent = transport.requests();
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"full_name":"Dana Cohen"}"#));
        assert!(sent[0]
            .headers
            .contains(&("Content-Type".to_string(), "application/json".to_string())));
    }

    #[tokio::test]
    async fn test_primitive_body_passes_through() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true}));
        let client = client(&transport);

        client
            .send("/api/raw", RequestOptions::post(json!("already=encoded")))
            .await
            .unwrap();
        assert_eq!(transport.requests()[0].body.as_deref(), Some("already=encoded"));
    }

    #[tokio::test]
    async fn test_null_body_sends_nothing() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true}));
        let client = client(&transport);

        client
            .send("/api/x", RequestOptions::post(serde_json::Value::Null))
            .await
            .unwrap();
        let sent = transport.requests();
        assert_eq!(sent[0].method, Method::Post);
        assert_eq!(sent[0].body, None);
    }

    #[tokio::test]
    async fn test_error_envelope_raises_one_danger_toast() {
        let transport = FakeTransport::new();
        transport.push_json(400, json!({"success": false, "error": "ת.ז כפולה"}));
        let client = client(&transport);

        let err = client
            .send("/api/patients", RequestOptions::post(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 400, .. }));

        let toasts = client.notifier().active();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].severity, Severity::Danger);
        assert_eq!(toasts[0].message, "ת.ז כפולה");
    }

    #[tokio::test]
    async fn test_success_false_with_ok_status_is_a_failure() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": false}));
        let client = client(&transport);

        let err = client.send("/api/x", RequestOptions::delete()).await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected { message: None }));
        assert_eq!(client.notifier().active()[0].message, GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_non_json_body_falls_back_to_generic_message() {
        let transport = FakeTransport::new();
        transport.push_raw(502, "<html>Bad Gateway</html>");
        let client = client(&transport);

        let err = client.send("/api/x", RequestOptions::get()).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(client.notifier().active()[0].message, GENERIC_ERROR);
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let transport = FakeTransport::new();
        transport.push_error(ApiError::Transport("connection refused".to_string()));
        let client = client(&transport);

        assert!(client.send("/api/x", RequestOptions::get()).await.is_err());
        assert_eq!(client.notifier().active().len(), 1);
    }

    #[tokio::test]
    async fn test_request_is_quiet() {
        let transport = FakeTransport::new();
        transport.push_json(500, json!({"success": false, "error": "boom"}));
        let client = client(&transport);

        let resp = client.request("/api/x", RequestOptions::get()).await.unwrap();
        assert_eq!(resp.status, 500);
        assert!(client.notifier().active().is_empty());
        assert!(resp.into_result().is_err());
    }

    #[tokio::test]
    async fn test_session_cookie_header() {
        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true}));
        let client = client(&transport).with_session_cookie(Some("session=abc".to_string()));

        client.send("/api/x", RequestOptions::get()).await.unwrap();
        assert!(transport.requests()[0]
            .headers
            .contains(&("Cookie".to_string(), "session=abc".to_string())));
    }

    #[tokio::test]
    async fn test_fetch_missing_data_is_decode_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Payload {
            #[allow(dead_code)]
            id: String,
        }

        let transport = FakeTransport::new();
        transport.push_json(200, json!({"success": true}));
        let client = client(&transport);

        let err = client.fetch::<Payload>("/api/x").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(client.notifier().active().len(), 1);
    }

    #[test]
    fn test_url_join_keeps_query() {
        let transport = FakeTransport::new();
        let client = client(&transport);
        let url = client.url("/api/patients?search=%D7%93&page=2").unwrap();
        assert_eq!(url.path(), "/api/patients");
        assert_eq!(url.query(), Some("search=%D7%93&page=2"));
    }
}
