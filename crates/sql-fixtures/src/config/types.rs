//! Configuration type definitions.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::TransactionMode;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target database connection.
    pub database: DatabaseConfig,

    /// Fixture loading behavior.
    #[serde(default)]
    pub load: LoadConfig,
}

/// Target database configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database type: "postgres", "mysql" or "sqlite".
    #[serde(default = "default_postgres")]
    pub r#type: String,

    /// Database host (network databases).
    #[serde(default)]
    pub host: String,

    /// Database port (default depends on type: 5432 / 3306).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database name (network databases).
    #[serde(default)]
    pub database: String,

    /// Username (network databases).
    #[serde(default)]
    pub user: String,

    /// Password. Never serialized.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,

    /// Database file for SQLite (`:memory:` for an in-memory database).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Maximum pooled connections (default: 4).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl DatabaseConfig {
    /// Port to connect to, falling back to the type's default.
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(match self.r#type.to_lowercase().as_str() {
            "mysql" | "mariadb" => 3306,
            _ => 5432,
        })
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .field("path", &self.path)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Fixture loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoadConfig {
    /// Transaction granularity (default: single-transaction).
    #[serde(default)]
    pub transaction_mode: TransactionMode,

    /// Fixture files loaded when none are given on the command line.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
}

fn default_postgres() -> String {
    "postgres".to_string()
}

fn default_disable() -> String {
    "disable".to_string()
}

fn default_max_connections() -> usize {
    4
}
