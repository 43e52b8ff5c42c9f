//! Network exchange
//!
//! The [`Transport`] trait is the only place bytes leave the process. It
//! yields either the raw status and body of a response or a classified
//! [`TransportFailure`]; interpreting statuses is left to the gateway.

use crate::config::ClientConfig;
use crate::request::{CallBody, OutboundCall};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::fmt;
use tracing::debug;

/// Raw response received from the backend
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Category of a failed exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailureKind {
    /// The per-call deadline elapsed
    Timeout,
    /// The backend could not be reached at all
    Connect,
    Other,
}

/// A request that produced no HTTP response
#[derive(Debug, Clone)]
pub struct TransportFailure {
    pub kind: TransportFailureKind,
    pub detail: String,
}

impl TransportFailure {
    pub fn new(kind: TransportFailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.detail)
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportFailureKind::Timeout
        } else if err.is_connect() {
            TransportFailureKind::Connect
        } else {
            TransportFailureKind::Other
        };
        TransportFailure::new(kind, err.to_string())
    }
}

pub type TransportOutcome = Result<TransportResponse, TransportFailure>;

/// Performs one network exchange for an outbound call
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, call: &OutboundCall) -> TransportOutcome;
}

/// reqwest-backed transport with per-call timeouts
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> Result<Self, TransportFailure> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, call: &OutboundCall) -> reqwest::RequestBuilder {
        let url = self.config.url_for(call.audience, &call.path);
        let mut request = self
            .http_client
            .request(call.method.clone(), &url)
            .timeout(self.config.timeouts.duration(call.timeout_class));

        for (name, value) in &call.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request = match &call.body {
            CallBody::Empty => request,
            CallBody::Json(value) => request.json(value),
            CallBody::Multipart(body) => {
                let part = reqwest::multipart::Part::bytes(body.content.to_vec())
                    .file_name(body.file_name.clone());
                let mut form = reqwest::multipart::Form::new().part("file", part);
                for (name, value) in &body.fields {
                    form = form.text(name.clone(), value.clone());
                }
                request.multipart(form)
            }
        };

        request
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, call: &OutboundCall) -> TransportOutcome {
        let response = self.request(call).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = %status, bytes = body.len(), "Received response");
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, TimeoutClass};
    use crate::config::TimeoutConfig;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport_for(server: &MockServer) -> HttpTransport {
        HttpTransport::new(ClientConfig {
            base_url: server.uri(),
            timeouts: TimeoutConfig {
                short_secs: 1,
                generation_secs: 5,
                upload_secs: 5,
                health_secs: 1,
            },
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_uses_audience_prefix_and_class_timeout() {
        let transport = HttpTransport::new(ClientConfig {
            base_url: "https://clil.example.org".to_string(),
            timeouts: TimeoutConfig {
                health_secs: 2,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

        let call = OutboundCall::api(Method::GET, "/materials")
            .with_timeout_class(TimeoutClass::Health);
        let request = transport.request(&call).build().unwrap();
        assert_eq!(request.url().as_str(), "https://clil.example.org/api/v1/clil/materials");
        assert_eq!(request.timeout(), Some(&Duration::from_secs(2)));

        let call = OutboundCall::auth(Method::POST, "/auth/refresh");
        let request = transport.request(&call).build().unwrap();
        assert_eq!(request.url().as_str(), "https://clil.example.org/api/v1/auth/refresh");
        assert_eq!(request.timeout(), Some(&Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_sends_json_and_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/api/v1/clil/subjects"))
            .and(header("X-Trace", "abc"))
            .and(body_json(serde_json::json!({"name": "Biology"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":1}"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let call = OutboundCall::api(Method::POST, "/subjects")
            .with_header("X-Trace", "abc")
            .with_json(&serde_json::json!({"name": "Biology"}))
            .unwrap();

        let response = transport_for(&mock_server).send(&call).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], b"{\"id\":1}");
    }

    #[tokio::test]
    async fn test_non_success_is_still_a_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/clil/materials"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        let call = OutboundCall::api(Method::GET, "/materials");
        let response = transport_for(&mock_server).send(&call).await.unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_short_timeout_is_classified() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v1/clil/materials"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let call = OutboundCall::api(Method::GET, "/materials").with_timeout_class(TimeoutClass::Short);
        let failure = transport_for(&mock_server).send(&call).await.unwrap_err();
        assert_eq!(failure.kind, TransportFailureKind::Timeout);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_classified() {
        let transport = HttpTransport::new(ClientConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        })
        .unwrap();

        let call = OutboundCall::api(Method::GET, "/materials");
        let failure = transport.send(&call).await.unwrap_err();
        assert_eq!(failure.kind, TransportFailureKind::Connect);
    }
}
