//! Backend probing and model listing

use crate::client::Session;
use crate::error::Result;
use crate::output::{json_output, print_field, print_success};

/// Handle `models`
pub async fn handle_models(session: &mut Session, json: bool) -> Result<()> {
    session.require_login()?;

    let outcome = session.client().get_available_models().await;
    let models = session.settle(outcome)?;

    if json {
        return json_output(&models);
    }
    if models.is_empty() {
        println!("The backend offers no models.");
        return Ok(());
    }
    for model in &models {
        println!("{model}");
    }
    Ok(())
}

/// Handle `health`
pub async fn handle_health(session: &mut Session, json: bool) -> Result<()> {
    session.require_login()?;

    let base_url = session.client().config().base_url.clone();
    let outcome = session.client().health_check().await;
    let status = session.settle(outcome)?;

    if json {
        return json_output(&status);
    }
    print_success(&status.message);
    print_field("Backend", &base_url);
    Ok(())
}
