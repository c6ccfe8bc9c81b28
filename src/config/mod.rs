/// Configuration management for slotkit
///
/// Handles database location, slot table naming and installer parameters.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Slot relation configuration
    pub slots: SlotConfig,
}

/// SQLite database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Directory holding the database file (default: "data")
    pub data_dir: String,
    /// Database file name inside `data_dir` (default: "slots.db")
    pub file_name: String,
    /// Full connection URL, takes precedence over `data_dir`/`file_name`
    /// (e.g. "sqlite::memory:")
    pub url: Option<String>,
}

/// Slot table and relation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotConfig {
    /// Table holding slot rows (default: "slot")
    pub table: String,
    /// Type tag given to slots created without one (default: "Text")
    pub default_type: String,
    /// Host tables the installer binary wires up (primary key "id")
    pub hosts: Vec<String>,
}

impl DatabaseConfig {
    /// Path of the database file when no URL override is set
    pub fn file_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.file_name)
    }
}

impl Config {
    /// In-memory configuration used by tests and throwaway tooling
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig {
                data_dir: String::new(),
                file_name: String::new(),
                url: Some("sqlite::memory:".to_string()),
            },
            slots: SlotConfig::default(),
        }
    }
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            table: "slot".to_string(),
            default_type: "Text".to_string(),
            hosts: Vec::new(),
        }
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        let slot_defaults = SlotConfig::default();
        Self {
            database: DatabaseConfig {
                data_dir: std::env::var("SLOTKIT_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
                file_name: std::env::var("SLOTKIT_DB_FILE").unwrap_or_else(|_| "slots.db".to_string()),
                url: std::env::var("SLOTKIT_DATABASE_URL").ok(),
            },
            slots: SlotConfig {
                table: std::env::var("SLOTKIT_SLOT_TABLE").unwrap_or(slot_defaults.table),
                default_type: std::env::var("SLOTKIT_DEFAULT_TYPE")
                    .unwrap_or(slot_defaults.default_type),
                hosts: std::env::var("SLOTKIT_HOSTS")
                    .map(|hosts| parse_host_list(&hosts))
                    .unwrap_or_default(),
            },
        }
    }
}

/// Split a comma separated host table list, dropping blanks
fn parse_host_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .collect()
}
