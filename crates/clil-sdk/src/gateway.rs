//! Dispatch pipeline for outbound calls
//!
//! Every call goes through [`ApiGateway::execute`]: the current credential is
//! attached, the call is sent, and an authentication failure on a first
//! attempt is handed to the [`RefreshCoordinator`] before a single replay.

use crate::auth::{
    attach_credentials, with_bearer, AuthResponse, CredentialPair, RefreshCoordinator,
    RefreshExchange, RefreshRequest, TokenStore,
};
use crate::error::{normalize_decode, normalize_status, normalize_transport, ApiError, Result};
use crate::request::{Operation, OutboundCall};
use crate::transport::{Transport, TransportResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which try of a call is being made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    /// Replay after a refresh; never refreshes again
    Replay,
}

/// Sends outbound calls with credential handling and error normalization
pub struct ApiGateway {
    transport: Arc<dyn Transport>,
    token_store: Arc<TokenStore>,
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiGateway {
    pub fn new(
        transport: Arc<dyn Transport>,
        token_store: Arc<TokenStore>,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            transport,
            token_store,
            coordinator,
        }
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        &self.token_store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// Send a call and return the raw success response
    pub async fn execute(&self, call: &OutboundCall) -> Result<TransportResponse> {
        let attached = attach_credentials(call, self.token_store.get().as_ref());
        let response = self.dispatch(&attached, Attempt::Initial).await?;

        if response.status.is_success() {
            return Ok(response);
        }

        if response.status == StatusCode::UNAUTHORIZED && call.is_credentialed() {
            debug!(path = %call.path, "Credential rejected, refreshing");
            let access_token = self.coordinator.refresh().await?;

            let replay = with_bearer(call, &access_token);
            let response = self.dispatch(&replay, Attempt::Replay).await?;
            if response.status.is_success() {
                return Ok(response);
            }
            if response.status == StatusCode::UNAUTHORIZED {
                warn!(path = %call.path, "Credential rejected again after refresh, giving up");
                return Err(ApiError::unauthenticated(
                    "Authentication failed after refreshing credentials",
                ));
            }
            return Err(normalize_status(
                response.status,
                &response.body,
                call.timeout_class,
            ));
        }

        Err(normalize_status(
            response.status,
            &response.body,
            call.timeout_class,
        ))
    }

    /// Send a call and decode the JSON body
    pub async fn execute_json<T: DeserializeOwned>(&self, call: &OutboundCall) -> Result<T> {
        let response = self.execute(call).await?;
        serde_json::from_slice(&response.body).map_err(normalize_decode)
    }

    /// Send a call whose success body is ignored
    pub async fn execute_empty(&self, call: &OutboundCall) -> Result<()> {
        self.execute(call).await.map(|_| ())
    }

    async fn dispatch(&self, call: &OutboundCall, attempt: Attempt) -> Result<TransportResponse> {
        debug!(
            method = %call.method,
            path = %call.path,
            timeout_class = ?call.timeout_class,
            ?attempt,
            "Sending request"
        );
        self.transport
            .send(call)
            .await
            .map_err(|failure| {
                debug!(path = %call.path, %failure, "Request failed before a response");
                normalize_transport(&failure, call.timeout_class)
            })
    }
}

impl std::fmt::Debug for ApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiGateway")
            .field("token_store", &self.token_store)
            .field("coordinator", &self.coordinator)
            .finish_non_exhaustive()
    }
}

/// Refresh exchange performed against `POST /auth/refresh`
pub struct BackendRefreshExchange {
    transport: Arc<dyn Transport>,
}

impl BackendRefreshExchange {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl RefreshExchange for BackendRefreshExchange {
    async fn exchange(&self, refresh_token: &str) -> Result<CredentialPair> {
        let body = RefreshRequest::new(refresh_token);
        let call = Operation::Refresh(&body).build()?;

        let response = self
            .transport
            .send(&call)
            .await
            .map_err(|failure| normalize_transport(&failure, call.timeout_class))?;
        if !response.status.is_success() {
            return Err(normalize_status(
                response.status,
                &response.body,
                call.timeout_class,
            ));
        }

        let auth: AuthResponse = serde_json::from_slice(&response.body).map_err(normalize_decode)?;
        Ok(auth.into_credentials(Some(refresh_token), None))
    }
}
