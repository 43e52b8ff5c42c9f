//! Outbound call construction
//!
//! An [`OutboundCall`] is built fresh for every invocation from a logical
//! [`Operation`] and is never mutated once handed to the gateway; replays
//! derive a new call instead.

use crate::auth::types::{LoginRequest, RefreshRequest, RegisterRequest};
use crate::error::{ApiError, Result};
use crate::types::{
    CreateSubjectRequest, DeleteDocumentsRequest, DocumentUpload, GenerateMaterialRequest,
    MaterialCreateRequest, MaterialUpdateRequest, QueryRequest, UpdateRolesRequest,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use reqwest::Method;

/// Header carrying the bearer credential
pub const AUTHORIZATION: &str = "Authorization";

/// Upper bound class for a call's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutClass {
    /// CRUD and auth exchanges
    Short,
    /// AI material generation
    Generation,
    /// Multipart document uploads
    Upload,
    /// Backend reachability checks
    Health,
}

/// Which part of the backend a call is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Protected application API; carries the bearer credential
    Api,
    /// Credential exchanges (login, register, refresh); never carries one
    Auth,
}

/// Body of an outbound call
#[derive(Debug, Clone, Default)]
pub enum CallBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartBody),
}

/// Multipart payload for document uploads
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub file_name: String,
    pub content: Bytes,
    pub fields: Vec<(String, String)>,
}

/// A single outbound request
#[derive(Debug, Clone)]
pub struct OutboundCall {
    pub method: Method,
    pub audience: Audience,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub body: CallBody,
    pub timeout_class: TimeoutClass,
}

impl OutboundCall {
    pub fn new(method: Method, audience: Audience, path: impl Into<String>) -> Self {
        Self {
            method,
            audience,
            path: path.into(),
            headers: BTreeMap::new(),
            body: CallBody::Empty,
            timeout_class: TimeoutClass::Short,
        }
    }

    /// Call against the protected API
    pub fn api(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, Audience::Api, path)
    }

    /// Call against the credential exchange endpoints
    pub fn auth(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, Audience::Auth, path)
    }

    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::unknown(format!("Failed to encode request body: {e}")))?;
        self.body = CallBody::Json(value);
        Ok(self)
    }

    pub fn with_multipart(mut self, body: MultipartBody) -> Self {
        self.body = CallBody::Multipart(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout_class(mut self, class: TimeoutClass) -> Self {
        self.timeout_class = class;
        self
    }

    /// Whether the call carries the bearer credential and is eligible for refresh
    pub fn is_credentialed(&self) -> bool {
        self.audience == Audience::Api
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Logical operations understood by the backend
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    Login(&'a LoginRequest),
    Register(&'a RegisterRequest),
    Refresh(&'a RefreshRequest),

    ListMaterials,
    GetMaterial(u64),
    CreateMaterial(&'a MaterialCreateRequest),
    UpdateMaterial(u64, &'a MaterialUpdateRequest),
    DeleteMaterial(u64),
    GenerateMaterial(&'a GenerateMaterialRequest),

    UploadDocument(&'a DocumentUpload),
    ListDocuments,
    DeleteDocuments(&'a DeleteDocumentsRequest),
    QueryDocuments(&'a QueryRequest),

    ListSubjects,
    CreateSubject(&'a CreateSubjectRequest),
    DeleteSubject(u64),

    AdminListUsers,
    AdminGetUser(u64),
    AdminUpdateRoles(u64, &'a UpdateRolesRequest),
    AdminDeleteUser(u64),
    AdminStats,

    ListModels,
    HealthCheck,
}

impl Operation<'_> {
    /// Stable operation name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Login(_) => "login",
            Operation::Register(_) => "register",
            Operation::Refresh(_) => "refresh",
            Operation::ListMaterials => "list_materials",
            Operation::GetMaterial(_) => "get_material",
            Operation::CreateMaterial(_) => "create_material",
            Operation::UpdateMaterial(..) => "update_material",
            Operation::DeleteMaterial(_) => "delete_material",
            Operation::GenerateMaterial(_) => "generate_material",
            Operation::UploadDocument(_) => "upload_document",
            Operation::ListDocuments => "list_documents",
            Operation::DeleteDocuments(_) => "delete_documents",
            Operation::QueryDocuments(_) => "query_documents",
            Operation::ListSubjects => "list_subjects",
            Operation::CreateSubject(_) => "create_subject",
            Operation::DeleteSubject(_) => "delete_subject",
            Operation::AdminListUsers => "admin_list_users",
            Operation::AdminGetUser(_) => "admin_get_user",
            Operation::AdminUpdateRoles(..) => "admin_update_roles",
            Operation::AdminDeleteUser(_) => "admin_delete_user",
            Operation::AdminStats => "admin_stats",
            Operation::ListModels => "list_models",
            Operation::HealthCheck => "health_check",
        }
    }

    /// Assemble the outbound call for this operation
    pub fn build(&self) -> Result<OutboundCall> {
        let call = match *self {
            Operation::Login(body) => OutboundCall::auth(Method::POST, "/auth/login").with_json(body)?,
            Operation::Register(body) => {
                OutboundCall::auth(Method::POST, "/auth/register").with_json(body)?
            }
            Operation::Refresh(body) => {
                OutboundCall::auth(Method::POST, "/auth/refresh").with_json(body)?
            }

            Operation::ListMaterials => OutboundCall::api(Method::GET, "/materials"),
            Operation::GetMaterial(id) => OutboundCall::api(Method::GET, format!("/materials/{id}")),
            Operation::CreateMaterial(body) => {
                OutboundCall::api(Method::POST, "/materials").with_json(body)?
            }
            Operation::UpdateMaterial(id, body) => {
                OutboundCall::api(Method::PUT, format!("/materials/{id}")).with_json(body)?
            }
            Operation::DeleteMaterial(id) => {
                OutboundCall::api(Method::DELETE, format!("/materials/{id}"))
            }
            Operation::GenerateMaterial(body) => OutboundCall::api(Method::POST, "/generate")
                .with_json(body)?
                .with_timeout_class(TimeoutClass::Generation),

            Operation::UploadDocument(upload) => {
                let mut fields = Vec::new();
                if let Some(subject) = upload.subject.as_deref().filter(|s| !s.is_empty()) {
                    fields.push(("subject".to_string(), subject.to_string()));
                }
                OutboundCall::api(Method::POST, "/documents/upload")
                    .with_multipart(MultipartBody {
                        file_name: upload.file_name.clone(),
                        content: upload.content.clone(),
                        fields,
                    })
                    .with_timeout_class(TimeoutClass::Upload)
            }
            Operation::ListDocuments => OutboundCall::api(Method::GET, "/documents"),
            Operation::DeleteDocuments(body) => {
                OutboundCall::api(Method::DELETE, "/documents").with_json(body)?
            }
            Operation::QueryDocuments(body) => {
                OutboundCall::api(Method::POST, "/query").with_json(body)?
            }

            Operation::ListSubjects => OutboundCall::api(Method::GET, "/subjects"),
            Operation::CreateSubject(body) => {
                OutboundCall::api(Method::POST, "/subjects").with_json(body)?
            }
            Operation::DeleteSubject(id) => {
                OutboundCall::api(Method::DELETE, format!("/subjects/{id}"))
            }

            Operation::AdminListUsers => OutboundCall::api(Method::GET, "/admin/users"),
            Operation::AdminGetUser(id) => {
                OutboundCall::api(Method::GET, format!("/admin/users/{id}"))
            }
            Operation::AdminUpdateRoles(id, body) => {
                OutboundCall::api(Method::PUT, format!("/admin/users/{id}/roles")).with_json(body)?
            }
            Operation::AdminDeleteUser(id) => {
                OutboundCall::api(Method::DELETE, format!("/admin/users/{id}"))
            }
            Operation::AdminStats => OutboundCall::api(Method::GET, "/admin/stats"),

            Operation::ListModels => OutboundCall::api(Method::GET, "/models"),
            // The backend has no health endpoint; listing materials is the cheapest protected read
            Operation::HealthCheck => OutboundCall::api(Method::GET, "/materials")
                .with_timeout_class(TimeoutClass::Health),
        };
        Ok(call)
    }
}
