//! Single-attempt request/response transport.
//!
//! [`Transport`] is the seam between the migration pipeline and the remote
//! workspace API. [`HttpTransport`] is the production implementation backed
//! by [`reqwest`]; tests substitute scripted fakes. A transport performs
//! exactly one attempt per call: any HTTP status is returned as an
//! [`ApiResponse`], only network-level failures are errors. Retry and
//! status classification live in [`crate::retry`].

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;

/// HTTP request timeout for a single attempt.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request relative to the workspace host.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path beginning with `/`, e.g. `/api/2.0/lakeview/dashboards`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        let body = if self.body.trim().is_empty() {
            "null"
        } else {
            self.body.as_str()
        };
        serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Terminal failure of a remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("network error after {attempts} attempt(s): {message}")]
    Network { message: String, attempts: u32 },

    /// The server answered with a non-success status.
    #[error("HTTP {status} after {attempts} attempt(s): {}", extract_error_details(.body))]
    Status {
        status: u16,
        body: String,
        attempts: u32,
    },

    /// A success response carried a body of an unexpected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// HTTP status of the last attempt, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            Self::Network { attempts, .. } | Self::Status { attempts, .. } => *attempts,
            Self::Decode(_) => 1,
        }
    }

    pub(crate) fn with_attempts(self, attempts: u32) -> Self {
        match self {
            Self::Network { message, .. } => Self::Network { message, attempts },
            Self::Status { status, body, .. } => Self::Status {
                status,
                body,
                attempts,
            },
            other => other,
        }
    }
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `error.message`, `message`, then a string `error`, falling back
/// to the raw body text.
pub fn extract_error_details(body: &str) -> String {
    let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    map.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .or_else(|| map.get("message").and_then(|m| m.as_str()))
        .or_else(|| map.get("error").and_then(|m| m.as_str()))
        .map(str::to_string)
        .unwrap_or_else(|| serde_json::Value::Object(map.clone()).to_string())
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// One request, one attempt.
pub trait Transport: Send + Sync {
    /// Send `request`. Returns `Err` only for network-level failures.
    fn send(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

/// Bearer-authenticated HTTP transport for one workspace.
pub struct HttpTransport {
    client: reqwest::Client,
    host: String,
    token: String,
}

impl HttpTransport {
    /// Create a transport for `host` (already normalized, no trailing `/`).
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, host, token))
    }

    /// Create a transport reusing an existing [`reqwest::Client`]
    /// (connection pooling across workspaces).
    pub fn with_client(
        client: reqwest::Client,
        host: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            host: host.into(),
            token: token.into(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.host, request.path);
        let builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Delete => self.client.delete(&url),
        };
        let mut builder = builder.bearer_auth(&self.token).query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| TransportError::Network {
            message: e.to_string(),
            attempts: 1,
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        tracing::trace!(method = %request.method, path = %request.path, status, "API call");
        Ok(ApiResponse { status, body })
    }
}

/// Builds the transport for each tenant of a batch.
pub trait Connector {
    type Transport: Transport;

    fn connect(&self, tenant: &str, host: &str, credential: &str) -> Self::Transport;
}

/// Hands out [`HttpTransport`]s sharing one connection pool.
#[derive(Clone)]
pub struct HttpConnector {
    client: reqwest::Client,
}

impl HttpConnector {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self, _tenant: &str, host: &str, credential: &str) -> HttpTransport {
        HttpTransport::with_client(self.client.clone(), host, credential)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
