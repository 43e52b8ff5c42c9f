//! Type definitions for the CLIL API

use crate::error::{ApiError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Loosely typed JSON object returned by some endpoints
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Maximum length of a material title
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum length of a material type
pub const MAX_TYPE_LEN: usize = 50;

/// Document extensions accepted for ingestion
pub const ALLOWED_DOCUMENT_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

// ===== Materials =====

/// Known kinds of lesson material
///
/// The backend stores the German display name; the client addresses kinds by
/// their English key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    Worksheet,
    Quiz,
    Glossary,
    Presentation,
    Graphic,
    Video,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 6] = [
        MaterialKind::Worksheet,
        MaterialKind::Quiz,
        MaterialKind::Glossary,
        MaterialKind::Presentation,
        MaterialKind::Graphic,
        MaterialKind::Video,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            MaterialKind::Worksheet => "worksheet",
            MaterialKind::Quiz => "quiz",
            MaterialKind::Glossary => "glossary",
            MaterialKind::Presentation => "presentation",
            MaterialKind::Graphic => "graphic",
            MaterialKind::Video => "video",
        }
    }

    /// Name stored by the backend
    pub fn display_name(&self) -> &'static str {
        match self {
            MaterialKind::Worksheet => "Arbeitsblatt",
            MaterialKind::Quiz => "Quiz",
            MaterialKind::Glossary => "Glossar",
            MaterialKind::Presentation => "Präsentation",
            MaterialKind::Graphic => "Grafik",
            MaterialKind::Video => "Video-Skript",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.display_name() == name)
    }

    /// Backend name for a caller-supplied kind; unknown kinds pass through
    pub fn backend_name(kind: &str) -> String {
        kind.parse::<MaterialKind>()
            .map(|k| k.display_name().to_string())
            .unwrap_or_else(|_| kind.to_string())
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MaterialKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| ApiError::validation(format!("Unknown material kind '{s}'")))
    }
}

/// A stored lesson material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: u64,
    pub material_type: String,
    pub topic: String,
    #[serde(default)]
    pub formatted_html: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub language_level: Option<String>,
    #[serde(default)]
    pub vocab_percentage: Option<u32>,
    #[serde(default)]
    pub content_focus: Option<String>,
    #[serde(default)]
    pub include_vocab_list: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl Material {
    /// Kind of this material, when it is one of the known kinds
    pub fn kind(&self) -> Option<MaterialKind> {
        MaterialKind::from_display_name(&self.material_type)
            .or_else(|| self.material_type.parse().ok())
    }
}

/// Body of `POST /materials`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialCreateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocab_percentage: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl MaterialCreateRequest {
    pub fn new(kind: &str, topic: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            material_type: Some(MaterialKind::backend_name(kind)),
            topic: Some(topic.into()),
            formatted_html: Some(content.clone()),
            content: Some(content),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_material_fields(
            self.material_type.as_deref(),
            self.topic.as_deref(),
            self.content.as_deref(),
        )
    }
}

/// Body of `PUT /materials/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocab_percentage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl MaterialUpdateRequest {
    /// Check present fields before sending
    pub fn validate(&self) -> Result<()> {
        validate_material_fields(
            self.material_type.as_deref(),
            self.topic.as_deref(),
            self.content.as_deref(),
        )
    }
}

fn validate_material_fields(
    material_type: Option<&str>,
    title: Option<&str>,
    content: Option<&str>,
) -> Result<()> {
    if material_type.is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::validation("Material type is required"));
    }
    if title.is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::validation("Title is required"));
    }
    if content.is_some_and(|c| c.trim().is_empty()) {
        return Err(ApiError::validation("Content is required"));
    }
    if title.is_some_and(|t| t.chars().count() > MAX_TITLE_LEN) {
        return Err(ApiError::validation(format!(
            "Title is too long (max. {MAX_TITLE_LEN} characters)"
        )));
    }
    if material_type.is_some_and(|t| t.chars().count() > MAX_TYPE_LEN) {
        return Err(ApiError::validation(format!(
            "Material type is too long (max. {MAX_TYPE_LEN} characters)"
        )));
    }
    Ok(())
}

/// Body of `POST /generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateMaterialRequest {
    pub material_type: String,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    pub subject: String,
    pub language_level: String,
    pub vocab_percentage: u32,
    pub content_focus: String,
    pub include_vocab_list: bool,
    pub description: String,
    pub model_name: String,
    pub use_document_context: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_subject: Option<String>,
}

impl GenerateMaterialRequest {
    pub const DEFAULT_LANGUAGE_LEVEL: &'static str = "B1";
    pub const DEFAULT_VOCAB_PERCENTAGE: u32 = 30;
    pub const DEFAULT_CONTENT_FOCUS: &'static str = "balanced";
    pub const DEFAULT_MODEL: &'static str = "llama3.2";

    /// Request with defaults; known kinds are sent under their backend name
    pub fn new(kind: &str, topic: impl Into<String>) -> Self {
        Self {
            material_type: MaterialKind::backend_name(kind),
            topic: topic.into(),
            prompt: None,
            subject: String::new(),
            language_level: Self::DEFAULT_LANGUAGE_LEVEL.to_string(),
            vocab_percentage: Self::DEFAULT_VOCAB_PERCENTAGE,
            content_focus: Self::DEFAULT_CONTENT_FOCUS.to_string(),
            include_vocab_list: true,
            description: String::new(),
            model_name: Self::DEFAULT_MODEL.to_string(),
            use_document_context: false,
            context_subject: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_language_level(mut self, level: impl Into<String>) -> Self {
        self.language_level = level.into();
        self
    }

    pub fn with_vocab_percentage(mut self, percentage: u32) -> Self {
        self.vocab_percentage = percentage;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = model.into();
        self
    }

    /// Ground generation in the caller's uploaded documents
    pub fn with_document_context(mut self, subject: Option<String>) -> Self {
        self.use_document_context = true;
        self.context_subject = subject;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(ApiError::validation("Topic is required"));
        }
        if self.vocab_percentage > 100 {
            return Err(ApiError::validation(
                "Vocabulary percentage must be between 0 and 100",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedMaterial {
    pub formatted_response: String,
}

// ===== Subjects =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubjectRequest {
    pub name: String,
}

impl CreateSubjectRequest {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ApiError::validation("Name is required"));
        }
        Ok(Self { name })
    }
}

// ===== Documents =====

/// A file to ingest for retrieval
#[derive(Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content: Bytes,
    pub subject: Option<String>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Reject files the ingestion service would refuse
    pub fn validate(&self) -> Result<()> {
        let extension = Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match extension {
            Some(ext) if ALLOWED_DOCUMENT_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => {
                return Err(ApiError::validation(format!(
                    "Unsupported file type for '{}'. Allowed: .pdf, .docx, .txt",
                    self.file_name
                )))
            }
        }

        if self.content.is_empty() {
            return Err(ApiError::validation("Document is empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("bytes", &self.content.len())
            .field("subject", &self.subject)
            .finish()
    }
}

/// Result of ingesting one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub doc_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub chunk_count: u64,
}

/// An ingested document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub doc_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub uploaded_at: String,
    #[serde(default)]
    pub chunk_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDocumentsRequest {
    pub doc_ids: Vec<String>,
}

impl DeleteDocumentsRequest {
    pub fn new<I, S>(doc_ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let doc_ids: Vec<String> = doc_ids.into_iter().map(Into::into).collect();
        if doc_ids.is_empty() {
            return Err(ApiError::validation("At least one document id is required"));
        }
        Ok(Self { doc_ids })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteDocumentsResult {
    pub deleted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl QueryRequest {
    pub const DEFAULT_TOP_K: u32 = 5;

    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: Self::DEFAULT_TOP_K,
            subject: None,
        }
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = top_k;
        self
    }

    /// Restrict retrieval to one subject; blank subjects are ignored
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        self.subject = (!subject.trim().is_empty()).then_some(subject);
        self
    }
}

/// Retrieval answer with the metadata of the chunks it was built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<JsonObject>,
}

// ===== Admin =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub material_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRolesRequest {
    pub roles: BTreeSet<String>,
}

impl UpdateRolesRequest {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles
                .into_iter()
                .map(|r| r.into().trim().to_ascii_uppercase())
                .filter(|r| !r.is_empty())
                .collect(),
        }
    }
}

/// System-wide counters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_materials: u64,
    /// Counters added by newer backends
    #[serde(flatten)]
    pub extra: JsonObject,
}

// ===== Misc =====

/// Result of probing the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub reachable: bool,
    pub message: String,
}
