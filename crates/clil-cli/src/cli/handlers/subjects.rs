//! Subject command handlers

use super::confirm;
use crate::client::Session;
use crate::error::Result;
use crate::output::{json_output, print_success, table_output};

/// Handle `subjects ls`
pub async fn handle_ls(session: &mut Session, json: bool) -> Result<()> {
    session.require_login()?;

    let outcome = session.client().get_subjects().await;
    let subjects = session.settle(outcome)?;

    if json {
        return json_output(&subjects);
    }
    if subjects.is_empty() {
        println!("No subjects defined.");
        return Ok(());
    }
    println!("{}", table_output::subjects_table(&subjects));
    Ok(())
}

/// Handle `subjects add`
pub async fn handle_add(session: &mut Session, name: &str, json: bool) -> Result<()> {
    session.require_login()?;

    let outcome = session.client().create_subject(name).await;
    let subject = session.settle(outcome)?;

    if json {
        return json_output(&subject);
    }
    print_success(&format!("Created subject '{}' (#{})", subject.name, subject.id));
    Ok(())
}

/// Handle `subjects rm`
pub async fn handle_rm(session: &mut Session, id: u64, yes: bool) -> Result<()> {
    session.require_login()?;

    if !confirm(&format!("Delete subject #{id}?"), yes)? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    let outcome = session.client().delete_subject(id).await;
    session.settle(outcome)?;
    print_success(&format!("Deleted subject #{id}"));
    Ok(())
}
