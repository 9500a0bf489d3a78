//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use yfcase_core::ImportPolicy;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting yfcase web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }

    // Parse API keys from environment (comma-separated)
    let api_keys =
        yfcase_server::parse_api_keys(&std::env::var("YFCASE_API_KEYS").unwrap_or_default());

    // Extra CORS origins beyond the localhost defaults
    let allowed_origins: Vec<String> = std::env::var("YFCASE_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let import_policy = ImportPolicy::from_env();

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else {
        println!("   🔒 Authentication: X-Authenticated-User-Email header");
        if !api_keys.is_empty() {
            println!(
                "   🔑 API keys: {} configured (YFCASE_API_KEYS)",
                api_keys.len()
            );
        }
    }
    if !allowed_origins.is_empty() {
        println!("   🌐 Allowed origins: {}", allowed_origins.join(", "));
    }
    if import_policy.uses_builtin_password() {
        println!(
            "   ⚠️  Imported users get the built-in password (set {})",
            ImportPolicy::PASSWORD_ENV
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = yfcase_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        api_keys,
        import_policy,
    };

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    yfcase_server::serve_with_config(db, host, port, static_dir_str, config).await?;

    Ok(())
}
