//! Command line and environment configuration.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::api::ServerConfig;
use crate::db::{default_db_path, StoreConfig};
use crate::logging::LogFormat;

/// File name of the TUI log, written next to the database.
const TUI_LOG_FILE: &str = "records.log";

#[derive(Debug, Parser)]
#[command(name = "school-records", version, about = "Students, courses and enrollments")]
pub struct Cli {
    /// SQLite database file (default: ~/.school-records/records.sqlite)
    #[arg(long, env = "SCHOOL_RECORDS_DB", global = true)]
    pub db: Option<PathBuf>,

    #[arg(
        long,
        value_enum,
        env = "SCHOOL_RECORDS_LOG_FORMAT",
        default_value_t = LogFormat::Auto,
        global = true
    )]
    pub log_format: LogFormat,

    /// Number of pooled SQLite connections
    #[arg(long, default_value_t = 4, global = true)]
    pub pool_size: usize,

    /// How many times to try opening the database before giving up
    #[arg(long, default_value_t = 5, global = true)]
    pub connect_attempts: u32,

    #[arg(long, default_value_t = 500, global = true)]
    pub retry_delay_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the REST API
    Serve(ServeArgs),
    /// Open the terminal UI
    Tui,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, env = "SCHOOL_RECORDS_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "SCHOOL_RECORDS_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Allowed CORS origin; repeat for several. None means any origin.
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,
}

impl Cli {
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.db {
            Some(path) => Ok(path.clone()),
            None => default_db_path(),
        }
    }

    pub fn store_config(&self) -> Result<StoreConfig> {
        Ok(StoreConfig {
            path: Some(self.db_path()?),
            pool_size: self.pool_size,
            connect_attempts: self.connect_attempts,
            retry_delay_ms: self.retry_delay_ms,
        })
    }

    pub fn tui_log_path(&self) -> Result<PathBuf> {
        Ok(self.db_path()?.with_file_name(TUI_LOG_FILE))
    }
}

impl ServeArgs {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
        }
    }
}
