//! CLI-side session handling around the SDK client
//!
//! Every command runs through a [`Session`]: it builds the [`ClilClient`] from
//! the loaded configuration and listens for session events, so an
//! authentication failure that followed a teardown is reported as an expired
//! session instead of a bare backend message.

use crate::config::CliConfig;
use crate::error::{CliError, Result};
use clil_sdk::{ClientBuilder, ClilClient, ErrorKind, Outcome, SessionEvent};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

/// A client plus the session-event subscription of one CLI invocation
pub struct Session {
    client: ClilClient,
    events: broadcast::Receiver<SessionEvent>,
}

impl Session {
    /// Build a client from configuration, rehydrating any stored session
    pub async fn open(config: &CliConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .config(config.client.clone())
            .build()
            .await?;
        debug!(
            base_url = %config.client.base_url,
            authenticated = client.is_authenticated(),
            "Client ready"
        );
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: ClilClient) -> Self {
        let events = client.subscribe();
        Self { client, events }
    }

    pub fn client(&self) -> &ClilClient {
        &self.client
    }

    /// Fail early for commands that only make sense with a stored session
    pub fn require_login(&self) -> Result<()> {
        if self.client.is_authenticated() {
            Ok(())
        } else {
            Err(CliError::NotLoggedIn)
        }
    }

    /// Turn an operation envelope into a CLI result
    pub fn settle<T>(&mut self, outcome: Outcome<T>) -> Result<T> {
        match outcome.into_result() {
            Ok(value) => Ok(value),
            Err(err) if err.kind() == ErrorKind::Unauthenticated && self.session_expired() => {
                warn!("Session was torn down: {}", err.message());
                Err(CliError::SessionExpired)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Drain pending events and report whether a teardown was among them
    fn session_expired(&mut self) -> bool {
        let mut expired = false;
        loop {
            match self.events.try_recv() {
                Ok(SessionEvent::Expired) => expired = true,
                Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return expired,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clil_sdk::ApiError;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn session(server: &MockServer, refresh: Option<&str>) -> Session {
        let client = ClientBuilder::new()
            .base_url(server.uri())
            .with_memory_storage()
            .with_tokens("a1", refresh.map(str::to_string))
            .build()
            .await
            .unwrap();
        Session::from_client(client)
    }

    #[tokio::test]
    async fn test_failed_refresh_reports_expired_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/clil/materials"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/refresh"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = session(&server, Some("r1")).await;
        let outcome = session.client().get_all_materials().await;

        assert!(matches!(session.settle(outcome), Err(CliError::SessionExpired)));
        assert!(matches!(session.require_login(), Err(CliError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_rejected_login_is_not_an_expired_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let mut session = session(&server, None).await;
        let outcome = session.client().login("anna", "wrong").await;

        match session.settle(outcome) {
            Err(CliError::Api(err)) => assert_eq!(err.message(), "Bad credentials"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_passes_data_through() {
        let server = MockServer::start().await;
        let mut session = session(&server, None).await;

        let value = session.settle(Outcome::ok(7)).unwrap();
        assert_eq!(value, 7);
        assert!(session.require_login().is_ok());

        let err = session
            .settle::<()>(Outcome::failure(ApiError::unknown("odd")))
            .unwrap_err();
        assert_eq!(err.to_string(), "odd");
    }
}
