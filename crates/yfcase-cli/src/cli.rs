//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// yfcase - Case management with bulk spreadsheet import/export
#[derive(Parser)]
#[command(name = "yfcase")]
#[command(about = "Case management service with spreadsheet import and export", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "yfcase.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set YFCASE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import users, cities, townships or cases from a spreadsheet
    Import {
        /// Entity kind: users, cities, townships, cases
        #[arg(short, long)]
        kind: String,

        /// Spreadsheet to import (.xlsx, .xls or .csv)
        #[arg(short, long)]
        file: PathBuf,

        /// Email of the user the import runs as
        ///
        /// Cases without a responsible person are assigned to this user.
        #[arg(long = "as", value_name = "EMAIL")]
        as_email: Option<String>,
    },

    /// Export every entity of a kind to a spreadsheet
    Export {
        /// Entity kind: users, cities, townships, cases
        #[arg(short, long)]
        kind: String,

        /// Output file (defaults to the dated file name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: xlsx or csv
        #[arg(long, default_value = "xlsx")]
        format: String,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires an identity header or an API key.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Show database status (encryption, size, row counts)
    Status,

    /// Create a user account
    CreateUser {
        /// Display name
        #[arg(long)]
        name: String,

        /// Login email (unique)
        #[arg(long)]
        email: String,

        /// Role: guest, user or admin
        #[arg(long, default_value = "user")]
        role: String,

        /// Initial password (defaults to the import default password)
        #[arg(long)]
        password: Option<String>,
    },
}
