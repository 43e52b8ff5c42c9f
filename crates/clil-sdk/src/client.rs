//! HTTP client for the CLIL API
//!
//! [`ClilClient`] exposes every backend operation as an async method that
//! returns an [`Outcome`]. No error escapes as a panic or a bare `Result`;
//! callers inspect `success` and the error kind.
//!
//! # Authentication
//!
//! - Login and register store the returned credential pair
//! - Every other call carries `Authorization: Bearer {token}`
//! - A rejected credential is renewed once through the refresh endpoint,
//!   shared by all calls that were rejected at the same time
//! - When renewal is impossible the session is cleared and
//!   [`SessionEvent::Expired`] is published
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use clil_sdk::ClientBuilder;
//!
//! # async fn example() -> clil_sdk::Result<()> {
//! let client = ClientBuilder::default()
//!     .base_url("http://localhost:8080")
//!     .build()
//!     .await?;
//!
//! let login = client.login("anna", "secret").await;
//! if login.success {
//!     let materials = client.get_all_materials().await;
//!     println!("{} materials", materials.data.map(|m| m.len()).unwrap_or(0));
//! }
//! # Ok(())
//! # }
//! ```

use crate::{
    auth::{
        default_storage_dir, AuthResponse, CredentialPair, FileSessionStorage, Identity,
        LoginRequest, MemorySessionStorage, RefreshCoordinator, RegisterRequest, SessionEvent,
        SessionEvents, SessionStorage, TokenStore,
    },
    config::{ClientConfig, TimeoutConfig},
    envelope::Outcome,
    error::{ApiError, Result},
    gateway::{ApiGateway, BackendRefreshExchange},
    request::Operation,
    transport::{HttpTransport, Transport},
    types::{
        AdminStats, ConnectionStatus, CreateSubjectRequest, DeleteDocumentsRequest,
        DeleteDocumentsResult, DocumentInfo, DocumentUpload, GenerateMaterialRequest,
        GeneratedMaterial, Material, MaterialCreateRequest, MaterialUpdateRequest, QueryRequest,
        QueryResult, Subject, UpdateRolesRequest, UploadReceipt, UserSummary,
    },
};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Client for the CLIL backend
#[derive(Debug)]
pub struct ClilClient {
    gateway: ApiGateway,
    session: SessionEvents,
    config: ClientConfig,
}

impl ClilClient {
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ===== Session =====

    /// Exchange username and password for a session
    pub async fn login(&self, username: &str, password: &str) -> Outcome<Identity> {
        let body = LoginRequest::new(username, password);
        let result = self.authenticate(Operation::Login(&body), username).await;
        self.finish("login", result)
    }

    /// Create an account and start a session for it
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Outcome<Identity> {
        let body = RegisterRequest::new(username, email, password);
        let result = self.authenticate(Operation::Register(&body), username).await;
        self.finish("register", result)
    }

    /// End the session locally; the backend keeps no session state to revoke
    pub async fn logout(&self) -> Outcome<()> {
        let result = self.gateway.token_store().clear().await.map_err(ApiError::from);
        self.session.publish(SessionEvent::LoggedOut);
        info!("Logged out");
        self.finish("logout", result)
    }

    pub fn is_authenticated(&self) -> bool {
        self.gateway.token_store().is_authenticated()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.gateway.token_store().identity()
    }

    pub fn is_admin(&self) -> bool {
        self.gateway.token_store().is_admin()
    }

    pub fn user_initials(&self) -> Option<String> {
        self.gateway.token_store().user_initials()
    }

    /// Receive session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.session.subscribe()
    }

    pub fn session_events(&self) -> &SessionEvents {
        &self.session
    }

    pub fn token_store(&self) -> &Arc<TokenStore> {
        self.gateway.token_store()
    }

    pub fn refresh_coordinator(&self) -> &Arc<RefreshCoordinator> {
        self.gateway.coordinator()
    }

    // ===== Materials =====

    pub async fn get_all_materials(&self) -> Outcome<Vec<Material>> {
        self.run(Operation::ListMaterials).await
    }

    pub async fn get_material(&self, id: u64) -> Outcome<Material> {
        self.run(Operation::GetMaterial(id)).await
    }

    pub async fn create_material(&self, request: &MaterialCreateRequest) -> Outcome<Material> {
        if let Err(e) = request.validate() {
            return self.finish("create_material", Err(e));
        }
        self.run(Operation::CreateMaterial(request)).await
    }

    pub async fn update_material(&self, id: u64, request: &MaterialUpdateRequest) -> Outcome<Material> {
        if let Err(e) = request.validate() {
            return self.finish("update_material", Err(e));
        }
        self.run(Operation::UpdateMaterial(id, request)).await
    }

    pub async fn delete_material(&self, id: u64) -> Outcome<()> {
        if id == 0 {
            return self.finish(
                "delete_material",
                Err(ApiError::validation("Material id is required")),
            );
        }
        self.run_empty(Operation::DeleteMaterial(id)).await
    }

    /// Generate lesson content with the backend's language model
    pub async fn generate_material(&self, request: &GenerateMaterialRequest) -> Outcome<GeneratedMaterial> {
        if let Err(e) = request.validate() {
            return self.finish("generate_material", Err(e));
        }
        info!(
            material_type = %request.material_type,
            topic = %request.topic,
            model = %request.model_name,
            "Generating material"
        );
        self.run(Operation::GenerateMaterial(request)).await
    }

    // ===== Documents =====

    pub async fn upload_document(&self, upload: &DocumentUpload) -> Outcome<UploadReceipt> {
        if let Err(e) = upload.validate() {
            return self.finish("upload_document", Err(e));
        }
        self.run(Operation::UploadDocument(upload)).await
    }

    pub async fn list_documents(&self) -> Outcome<Vec<DocumentInfo>> {
        self.run(Operation::ListDocuments).await
    }

    pub async fn delete_documents(&self, request: &DeleteDocumentsRequest) -> Outcome<DeleteDocumentsResult> {
        self.run(Operation::DeleteDocuments(request)).await
    }

    pub async fn query_documents(&self, request: &QueryRequest) -> Outcome<QueryResult> {
        if request.query.trim().is_empty() {
            return self.finish("query_documents", Err(ApiError::validation("Query is required")));
        }
        self.run(Operation::QueryDocuments(request)).await
    }

    // ===== Subjects =====

    pub async fn get_subjects(&self) -> Outcome<Vec<Subject>> {
        self.run(Operation::ListSubjects).await
    }

    pub async fn create_subject(&self, name: &str) -> Outcome<Subject> {
        match CreateSubjectRequest::new(name) {
            Ok(request) => self.run(Operation::CreateSubject(&request)).await,
            Err(e) => self.finish("create_subject", Err(e)),
        }
    }

    pub async fn delete_subject(&self, id: u64) -> Outcome<()> {
        self.run_empty(Operation::DeleteSubject(id)).await
    }

    // ===== Admin =====

    pub async fn admin_list_users(&self) -> Outcome<Vec<UserSummary>> {
        self.run(Operation::AdminListUsers).await
    }

    pub async fn admin_get_user(&self, id: u64) -> Outcome<UserSummary> {
        self.run(Operation::AdminGetUser(id)).await
    }

    pub async fn admin_update_user_roles(&self, id: u64, request: &UpdateRolesRequest) -> Outcome<UserSummary> {
        if request.roles.is_empty() {
            return self.finish(
                "admin_update_roles",
                Err(ApiError::validation("At least one role is required")),
            );
        }
        self.run(Operation::AdminUpdateRoles(id, request)).await
    }

    pub async fn admin_delete_user(&self, id: u64) -> Outcome<()> {
        self.run_empty(Operation::AdminDeleteUser(id)).await
    }

    pub async fn admin_stats(&self) -> Outcome<AdminStats> {
        self.run(Operation::AdminStats).await
    }

    // ===== Misc =====

    /// Names of the generation models the backend can use
    pub async fn get_available_models(&self) -> Outcome<Vec<String>> {
        self.run(Operation::ListModels).await
    }

    /// Check the backend with a cheap authenticated read
    pub async fn health_check(&self) -> Outcome<ConnectionStatus> {
        let result = self.send_empty(Operation::HealthCheck).await;
        self.finish(
            "health_check",
            result.map(|()| ConnectionStatus {
                reachable: true,
                message: "Backend connection successful".to_string(),
            }),
        )
    }

    // ===== Private Helper Methods =====

    async fn authenticate(&self, operation: Operation<'_>, username: &str) -> Result<Identity> {
        let call = operation.build()?;
        let response: AuthResponse = self.gateway.execute_json(&call).await?;

        let fallback = Identity::new(username, "");
        let pair = response.into_credentials(None, Some(&fallback));
        let identity = pair.identity.clone().unwrap_or(fallback);

        if let Err(e) = self.gateway.token_store().set(pair).await {
            warn!("Failed to persist session: {}", e);
        }
        self.session.publish(SessionEvent::LoggedIn);
        info!(username = %identity.username, "Logged in");
        Ok(identity)
    }

    async fn run<T: DeserializeOwned>(&self, operation: Operation<'_>) -> Outcome<T> {
        let result = self.send(operation).await;
        self.finish(operation.name(), result)
    }

    async fn send<T: DeserializeOwned>(&self, operation: Operation<'_>) -> Result<T> {
        let call = operation.build()?;
        self.gateway.execute_json(&call).await
    }

    async fn run_empty(&self, operation: Operation<'_>) -> Outcome<()> {
        let result = self.send_empty(operation).await;
        self.finish(operation.name(), result)
    }

    async fn send_empty(&self, operation: Operation<'_>) -> Result<()> {
        let call = operation.build()?;
        self.gateway.execute_empty(&call).await
    }

    fn finish<T>(&self, operation: &str, result: Result<T>) -> Outcome<T> {
        if let Err(e) = &result {
            debug!(operation, kind = %e.kind(), error = %e, "Operation failed");
        }
        Outcome::from(result)
    }
}

#[derive(Default)]
enum StorageChoice {
    /// `session.json` under the configured or platform data directory
    #[default]
    File,
    Memory,
    Custom(Arc<dyn SessionStorage>),
}

/// Builder for constructing a ClilClient with custom configuration
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    storage: StorageChoice,
    tokens: Option<CredentialPair>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a full configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the backend origin
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    /// Persist the session under `dir`
    pub fn storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.storage_dir = Some(dir.into());
        self.storage = StorageChoice::File;
        self
    }

    /// Keep the session in memory only
    pub fn with_memory_storage(mut self) -> Self {
        self.storage = StorageChoice::Memory;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = StorageChoice::Custom(storage);
        self
    }

    /// Start with the given credentials instead of the stored session
    pub fn with_tokens(mut self, access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        self.tokens = Some(CredentialPair::new(access_token, refresh_token));
        self
    }

    /// Replace the HTTP transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client, rehydrating the stored session
    pub async fn build(self) -> Result<ClilClient> {
        let storage: Arc<dyn SessionStorage> = match self.storage {
            StorageChoice::File => {
                let dir = match &self.config.storage_dir {
                    Some(dir) => dir.clone(),
                    None => default_storage_dir()?,
                };
                Arc::new(FileSessionStorage::new(dir)?)
            }
            StorageChoice::Memory => Arc::new(MemorySessionStorage::new()),
            StorageChoice::Custom(storage) => storage,
        };

        let token_store = Arc::new(TokenStore::load(storage).await?);
        if let Some(pair) = self.tokens {
            token_store.set(pair).await?;
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(self.config.clone()).map_err(|e| {
                ApiError::unknown(format!("Failed to create HTTP client: {e}"))
            })?),
        };

        let session = SessionEvents::new();
        let coordinator = Arc::new(RefreshCoordinator::new(
            token_store.clone(),
            Arc::new(BackendRefreshExchange::new(transport.clone())),
            session.clone(),
        ));

        Ok(ClilClient {
            gateway: ApiGateway::new(transport, token_store, coordinator),
            session,
            config: self.config,
        })
    }
}
