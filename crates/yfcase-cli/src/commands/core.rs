//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `parse_kind` - Entity kind argument parsing
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use yfcase_core::{db::Database, EntityKind};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Parse a `--kind` argument (singular or plural)
pub fn parse_kind(kind: &str) -> Result<EntityKind> {
    kind.parse().map_err(|e: String| {
        anyhow::anyhow!("{}. Use one of: users, cities, townships, cases", e)
    })
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let counts = db.counts().context("Failed to read table counts")?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }
    if counts.users == 0 {
        println!("   No users yet");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create an administrator: yfcase create-user --name Admin --email admin@example.com --role admin");
    println!("  2. Import reference data: yfcase import --kind cities --file cities.xlsx");
    println!("  3. Start web UI: yfcase serve");

    Ok(())
}
