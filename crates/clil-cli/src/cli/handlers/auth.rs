//! Authentication command handlers

use super::{prompt_password, prompt_text};
use crate::client::Session;
use crate::error::Result;
use crate::output::{json_output, print_field, print_info, print_success};
use clil_sdk::Identity;
use serde_json::json;
use tracing::debug;

/// Handle `login`
pub async fn handle_login(
    session: &mut Session,
    username: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt_text("Username")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt_password(false)?,
    };

    debug!("Logging in as {}", username);
    let outcome = session.client().login(&username, &password).await;
    let identity = session.settle(outcome)?;

    report_identity("Logged in", &identity, json)
}

/// Handle `register`
pub async fn handle_register(
    session: &mut Session,
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    json: bool,
) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt_text("Username")?,
    };
    let email = match email {
        Some(email) => email,
        None => prompt_text("Email")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt_password(true)?,
    };

    let outcome = session.client().register(&username, &email, &password).await;
    let identity = session.settle(outcome)?;

    report_identity("Account created, logged in", &identity, json)
}

/// Handle `logout`
pub async fn handle_logout(session: &mut Session) -> Result<()> {
    if !session.client().is_authenticated() {
        print_info("No stored session");
        return Ok(());
    }

    let outcome = session.client().logout().await;
    session.settle(outcome)?;
    print_success("Logged out");
    Ok(())
}

/// Handle `whoami`
pub fn handle_whoami(session: &Session, json: bool) -> Result<()> {
    session.require_login()?;
    let client = session.client();
    let identity = client.current_identity();

    if json {
        return json_output(&json!({
            "authenticated": true,
            "user": identity,
            "initials": client.user_initials(),
            "admin": client.is_admin(),
        }));
    }

    match identity {
        Some(identity) => {
            println!(
                "{} {}",
                console::style(identity.initials()).cyan().bold(),
                identity.username
            );
            if !identity.email.is_empty() {
                print_field("Email", &identity.email);
            }
            print_field("Roles", &roles_line(&identity));
        }
        None => print_info("Logged in, but no account details are stored"),
    }
    Ok(())
}

fn report_identity(headline: &str, identity: &Identity, json: bool) -> Result<()> {
    if json {
        return json_output(identity);
    }
    print_success(&format!("{headline} as {}", identity.username));
    if identity.is_admin() {
        print_info("Administrator access enabled");
    }
    Ok(())
}

fn roles_line(identity: &Identity) -> String {
    identity.roles.iter().cloned().collect::<Vec<_>>().join(", ")
}
