//! Document library command handlers

use super::confirm;
use crate::client::Session;
use crate::error::{CliError, Result};
use crate::output::{json_output, print_field, print_success, table_output};
use crate::progress::{complete_spinner_and_clear, complete_spinner_error, create_spinner};
use clil_sdk::{DeleteDocumentsRequest, DocumentUpload, QueryRequest};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle `docs upload`
pub async fn handle_upload(
    session: &mut Session,
    path: PathBuf,
    subject: Option<String>,
    json: bool,
) -> Result<()> {
    session.require_login()?;

    let upload = read_upload(&path, subject).await?;
    upload.validate()?;
    debug!(file = %upload.file_name, bytes = upload.content.len(), "Uploading document");

    let spinner = create_spinner(&format!("Uploading {}...", upload.file_name));
    let outcome = session.client().upload_document(&upload).await;
    let receipt = match session.settle(outcome) {
        Ok(receipt) => {
            complete_spinner_and_clear(spinner);
            receipt
        }
        Err(err) => {
            complete_spinner_error(spinner, "Upload failed");
            return Err(err);
        }
    };

    if json {
        return json_output(&receipt);
    }
    print_success(&format!(
        "Uploaded {} as {} ({} chunks)",
        upload.file_name, receipt.doc_id, receipt.chunk_count
    ));
    Ok(())
}

/// Handle `docs ls`
pub async fn handle_ls(session: &mut Session, json: bool) -> Result<()> {
    session.require_login()?;

    let outcome = session.client().list_documents().await;
    let documents = session.settle(outcome)?;

    if json {
        return json_output(&documents);
    }
    if documents.is_empty() {
        println!("No documents uploaded.");
        return Ok(());
    }
    println!("{}", table_output::documents_table(&documents));
    Ok(())
}

/// Handle `docs rm`
pub async fn handle_rm(
    session: &mut Session,
    ids: Vec<String>,
    yes: bool,
    json: bool,
) -> Result<()> {
    session.require_login()?;

    let request = DeleteDocumentsRequest::new(ids)?;
    let prompt = format!("Delete {} document(s)?", request.doc_ids.len());
    if !confirm(&prompt, yes)? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    let outcome = session.client().delete_documents(&request).await;
    let result = session.settle(outcome)?;

    if json {
        return json_output(&result);
    }
    print_success(&format!("Deleted {} document(s)", result.deleted));
    Ok(())
}

/// Handle `docs query`
pub async fn handle_query(
    session: &mut Session,
    query: String,
    top_k: Option<u32>,
    subject: Option<String>,
    json: bool,
) -> Result<()> {
    session.require_login()?;

    let mut request = QueryRequest::new(query);
    if let Some(top_k) = top_k {
        request = request.with_top_k(top_k);
    }
    if let Some(subject) = subject {
        request = request.with_subject(subject);
    }

    let outcome = session.client().query_documents(&request).await;
    let result = session.settle(outcome)?;

    if json {
        return json_output(&result);
    }
    println!("{}", result.answer);
    if !result.sources.is_empty() {
        println!();
        println!("{}", console::style("Sources").bold());
        for source in &result.sources {
            let name = source
                .get("filename")
                .or_else(|| source.get("source"))
                .and_then(|value| value.as_str())
                .unwrap_or("unknown");
            print_field("-", name);
        }
    }
    Ok(())
}

async fn read_upload(path: &Path, subject: Option<String>) -> Result<DocumentUpload> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::invalid_argument(format!("Not a file: {}", path.display())))?
        .to_string();
    let content = tokio::fs::read(path).await?;

    let upload = DocumentUpload::new(file_name, content);
    Ok(match subject {
        Some(subject) => upload.with_subject(subject),
        None => upload,
    })
}
