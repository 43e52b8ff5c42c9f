//! Lesson material command handlers

use super::confirm;
use crate::cli::commands::GenerateOptions;
use crate::client::Session;
use crate::error::{CliError, Result};
use crate::output::{json_output, print_field, print_info, print_success, table_output};
use crate::progress::{complete_spinner_and_clear, complete_spinner_error, create_spinner};
use clil_sdk::{GenerateMaterialRequest, Material, MaterialKind};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle `materials ls`
pub async fn handle_ls(
    session: &mut Session,
    kind: Option<String>,
    kinds: bool,
    json: bool,
) -> Result<()> {
    if kinds {
        return list_kinds(json);
    }
    session.require_login()?;

    let outcome = session.client().get_all_materials().await;
    let mut materials = session.settle(outcome)?;
    if let Some(kind) = kind {
        materials.retain(|material| matches_kind(material, &kind));
    }

    if json {
        return json_output(&materials);
    }
    if materials.is_empty() {
        println!("No materials found.");
        return Ok(());
    }
    println!("{}", table_output::materials_table(&materials));
    Ok(())
}

/// Handle `materials show`
pub async fn handle_show(
    session: &mut Session,
    id: u64,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    session.require_login()?;

    let outcome = session.client().get_material(id).await;
    let material = session.settle(outcome)?;

    if let Some(path) = &output {
        write_html(path, material.formatted_html.as_deref()).await?;
    }

    if json {
        return json_output(&material);
    }

    println!(
        "{} {}",
        console::style(format!("#{}", material.id)).dim(),
        console::style(&material.topic).bold()
    );
    print_field("Type", &material.material_type);
    if let Some(subject) = &material.subject {
        print_field("Subject", subject);
    }
    if let Some(level) = &material.language_level {
        print_field("Level", level);
    }
    if let Some(vocab) = material.vocab_percentage {
        print_field("Vocabulary", &format!("{vocab}%"));
    }
    if !material.tags.is_empty() {
        print_field("Tags", &material.tags.join(", "));
    }
    if let Some(created) = &material.created_at {
        print_field("Created", created);
    }
    if let Some(description) = &material.description {
        println!();
        println!("{description}");
    }

    match (&output, &material.formatted_html) {
        (Some(path), _) => print_success(&format!("Saved HTML to {}", path.display())),
        (None, Some(_)) => print_info("Use --output <file> to save the formatted HTML"),
        (None, None) => {}
    }
    Ok(())
}

/// Handle `materials rm`
pub async fn handle_rm(session: &mut Session, id: u64, yes: bool) -> Result<()> {
    session.require_login()?;

    if !confirm(&format!("Delete material #{id}?"), yes)? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    let outcome = session.client().delete_material(id).await;
    session.settle(outcome)?;
    print_success(&format!("Deleted material #{id}"));
    Ok(())
}

/// Handle `materials generate`
pub async fn handle_generate(
    session: &mut Session,
    options: GenerateOptions,
    json: bool,
) -> Result<()> {
    session.require_login()?;

    let output = options.output.clone();
    let request = build_generate_request(options);
    debug!(
        material_type = %request.material_type,
        model = %request.model_name,
        "Generating material"
    );

    let spinner = create_spinner(&format!("Generating {}...", request.material_type));
    let outcome = session.client().generate_material(&request).await;
    let generated = match session.settle(outcome) {
        Ok(generated) => {
            complete_spinner_and_clear(spinner);
            generated
        }
        Err(err) => {
            complete_spinner_error(spinner, "Generation failed");
            return Err(err);
        }
    };

    if let Some(path) = &output {
        write_html(path, Some(&generated.formatted_response)).await?;
    }

    if json {
        return json_output(&generated);
    }
    match &output {
        Some(path) => print_success(&format!("Saved generated material to {}", path.display())),
        None => println!("{}", generated.formatted_response),
    }
    Ok(())
}

fn build_generate_request(options: GenerateOptions) -> GenerateMaterialRequest {
    let mut request = GenerateMaterialRequest::new(&options.kind, options.topic)
        .with_language_level(options.level)
        .with_vocab_percentage(options.vocab);
    if let Some(prompt) = options.prompt {
        request = request.with_prompt(prompt);
    }
    if let Some(subject) = options.subject {
        request = request.with_subject(subject);
    }
    if let Some(model) = options.model {
        request = request.with_model(model);
    }
    if options.use_docs {
        request = request.with_document_context(options.docs_subject);
    }
    if let Some(description) = options.description {
        request.description = description;
    }
    request.content_focus = options.focus;
    request.include_vocab_list = !options.no_vocab_list;
    request
}

fn matches_kind(material: &Material, wanted: &str) -> bool {
    match wanted.parse::<MaterialKind>() {
        Ok(kind) => material.kind() == Some(kind),
        Err(_) => material.material_type.eq_ignore_ascii_case(wanted),
    }
}

fn list_kinds(json: bool) -> Result<()> {
    if json {
        let kinds: Vec<_> = MaterialKind::ALL
            .iter()
            .map(|kind| json!({ "kind": kind.key(), "storedAs": kind.display_name() }))
            .collect();
        return json_output(&kinds);
    }
    println!("{}", table_output::kinds_table());
    Ok(())
}

async fn write_html(path: &Path, html: Option<&str>) -> Result<()> {
    let html = html.ok_or_else(|| {
        CliError::invalid_argument("The material has no formatted HTML to save")
    })?;
    tokio::fs::write(path, html).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use crate::cli::commands::{Commands, MaterialsAction};
    use clap::Parser;

    fn parse_generate(extra: &[&str]) -> GenerateOptions {
        let mut argv = vec!["clil", "materials", "generate"];
        argv.extend_from_slice(extra);
        match Args::try_parse_from(argv).unwrap().command {
            Commands::Materials {
                action: MaterialsAction::Generate { options },
            } => options,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_generate_request_defaults() {
        let request = build_generate_request(parse_generate(&["worksheet", "Volcanoes"]));

        assert_eq!(request.material_type, "Arbeitsblatt");
        assert_eq!(request.topic, "Volcanoes");
        assert_eq!(request.language_level, "B1");
        assert_eq!(request.vocab_percentage, 30);
        assert_eq!(request.content_focus, "balanced");
        assert_eq!(request.model_name, "llama3.2");
        assert!(request.include_vocab_list);
        assert!(!request.use_document_context);
    }

    #[test]
    fn test_generate_request_options() {
        let request = build_generate_request(parse_generate(&[
            "quiz",
            "Volcanoes",
            "--level",
            "C1",
            "--vocab",
            "50",
            "--no-vocab-list",
            "--model",
            "mistral",
            "--use-docs",
            "--docs-subject",
            "Geography",
        ]));

        assert_eq!(request.material_type, "Quiz");
        assert_eq!(request.language_level, "C1");
        assert_eq!(request.vocab_percentage, 50);
        assert!(!request.include_vocab_list);
        assert_eq!(request.model_name, "mistral");
        assert!(request.use_document_context);
        assert_eq!(request.context_subject.as_deref(), Some("Geography"));
    }

    #[test]
    fn test_kind_filter_accepts_keys_and_stored_names() {
        let material: Material = serde_json::from_value(json!({
            "id": 1,
            "materialType": "Glossar",
            "topic": "Cells"
        }))
        .unwrap();

        assert!(matches_kind(&material, "glossary"));
        assert!(matches_kind(&material, "Glossar"));
        assert!(!matches_kind(&material, "quiz"));
    }
}
