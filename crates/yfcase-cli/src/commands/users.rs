//! User account commands

use anyhow::{Context, Result};
use yfcase_core::{
    db::Database,
    hash_password,
    models::{NewCredential, Role, UserFields},
    ImportPolicy,
};

use super::import::CLI_IDENTITY;

/// Create a verified user. Without `--password` the import default applies
/// and the user must reset it on first login.
pub fn cmd_create_user(
    db: &Database,
    name: &str,
    email: &str,
    role: &str,
    password: Option<&str>,
) -> Result<i64> {
    let role: Role = role.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let email = email.trim().to_lowercase();
    if name.trim().is_empty() || email.is_empty() {
        anyhow::bail!("Name and email are required");
    }
    if db.find_user_by_email(&email)?.is_some() {
        anyhow::bail!("A user with email {} already exists", email);
    }

    let policy = ImportPolicy::from_env();
    let (password, must_reset_password) = match password {
        Some(p) => (p.to_string(), false),
        None => (policy.default_password.clone(), true),
    };
    let password_hash = hash_password(&password).context("Failed to hash password")?;

    let id = db.create_user(
        &UserFields {
            name: Some(name.trim().to_string()),
            email: Some(email.clone()),
            role: Some(role),
            is_verified: Some(true),
            ..Default::default()
        },
        &NewCredential {
            password_hash,
            must_reset_password,
            force_unverified: false,
        },
    )?;

    db.log_audit(CLI_IDENTITY, "create", Some("user"), Some(id), Some(&email))?;

    println!("✅ Created {} {} <{}> (id {})", role.label(), name.trim(), email, id);
    if must_reset_password {
        println!("   Password must be changed on first login");
    }

    Ok(id)
}
