//! Administrative command handlers

use super::confirm;
use crate::client::Session;
use crate::error::Result;
use crate::output::{json_output, print_field, print_info, print_success, table_output};
use clil_sdk::{UpdateRolesRequest, UserSummary};

/// Handle `admin users`
pub async fn handle_users(session: &mut Session, json: bool) -> Result<()> {
    require_admin(session)?;

    let outcome = session.client().admin_list_users().await;
    let users = session.settle(outcome)?;

    if json {
        return json_output(&users);
    }
    if users.is_empty() {
        println!("No users found.");
        return Ok(());
    }
    println!("{}", table_output::users_table(&users));
    Ok(())
}

/// Handle `admin user`
pub async fn handle_user(session: &mut Session, id: u64, json: bool) -> Result<()> {
    require_admin(session)?;

    let outcome = session.client().admin_get_user(id).await;
    let user = session.settle(outcome)?;

    if json {
        return json_output(&user);
    }
    print_user(&user);
    Ok(())
}

/// Handle `admin roles`
pub async fn handle_roles(
    session: &mut Session,
    id: u64,
    roles: Vec<String>,
    json: bool,
) -> Result<()> {
    require_admin(session)?;

    let request = UpdateRolesRequest::new(roles);
    let outcome = session.client().admin_update_user_roles(id, &request).await;
    let user = session.settle(outcome)?;

    if json {
        return json_output(&user);
    }
    print_success(&format!("Updated roles of {}", user.username));
    print_user(&user);
    Ok(())
}

/// Handle `admin rm`
pub async fn handle_rm(session: &mut Session, id: u64, yes: bool) -> Result<()> {
    require_admin(session)?;

    if !confirm(&format!("Delete user #{id} and all of their materials?"), yes)? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    let outcome = session.client().admin_delete_user(id).await;
    session.settle(outcome)?;
    print_success(&format!("Deleted user #{id}"));
    Ok(())
}

/// Handle `admin stats`
pub async fn handle_stats(session: &mut Session, json: bool) -> Result<()> {
    require_admin(session)?;

    let outcome = session.client().admin_stats().await;
    let stats = session.settle(outcome)?;

    if json {
        return json_output(&stats);
    }
    print_field("Users", &stats.total_users.to_string());
    print_field("Materials", &stats.total_materials.to_string());
    for (key, value) in &stats.extra {
        print_field(key, &value.to_string());
    }
    Ok(())
}

/// The backend enforces the role; this only spares a pointless round trip
fn require_admin(session: &Session) -> Result<()> {
    session.require_login()?;
    if !session.client().is_admin() {
        print_info("The stored account has no ADMIN role; the backend may refuse this request");
    }
    Ok(())
}

fn print_user(user: &UserSummary) {
    println!(
        "{} {}",
        console::style(format!("#{}", user.id)).dim(),
        console::style(&user.username).bold()
    );
    if !user.email.is_empty() {
        print_field("Email", &user.email);
    }
    print_field(
        "Roles",
        &user.roles.iter().cloned().collect::<Vec<_>>().join(", "),
    );
    print_field("Materials", &user.material_count.to_string());
    if let Some(created) = &user.created_at {
        print_field("Created", created);
    }
}
