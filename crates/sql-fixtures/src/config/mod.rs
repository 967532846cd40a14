//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::drivers::DialectImpl;
use crate::error::{FixtureError, Result};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| FixtureError::Config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl DatabaseConfig {
    /// Dialect selected by the `type` field.
    pub fn dialect(&self) -> Result<DialectImpl> {
        DialectImpl::from_name(&self.r#type)
    }

    /// Human-readable connection target for log lines (never includes the password).
    pub fn display_target(&self) -> String {
        match &self.path {
            Some(path) if self.r#type.to_lowercase().starts_with("sqlite") => {
                format!("sqlite:{}", path.display())
            }
            _ => format!(
                "{}://{}@{}:{}/{}",
                self.r#type,
                self.user,
                self.host,
                self.port_or_default(),
                self.database
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Dialect;
    use crate::engine::TransactionMode;

    #[test]
    fn test_from_yaml_postgres() {
        let config = Config::from_yaml(
            r#"
database:
  type: postgres
  host: localhost
  database: app_test
  user: app
  password: secret
load:
  transaction_mode: per-row-transaction
  files:
    - fixtures/users.yml
"#,
        )
        .unwrap();

        assert_eq!(config.database.port_or_default(), 5432);
        assert_eq!(config.database.ssl_mode, "disable");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.load.transaction_mode, TransactionMode::PerRowTransaction);
        assert_eq!(config.load.files.len(), 1);
        assert_eq!(
            config.database.display_target(),
            "postgres://app@localhost:5432/app_test"
        );
    }

    #[test]
    fn test_from_yaml_sqlite_defaults() {
        let config = Config::from_yaml(
            r#"
database:
  type: sqlite
  path: ":memory:"
"#,
        )
        .unwrap();

        assert_eq!(config.load.transaction_mode, TransactionMode::SingleTransaction);
        assert_eq!(config.database.display_target(), "sqlite::memory:");
        assert_eq!(config.database.dialect().unwrap().name(), "sqlite");
    }

    #[test]
    fn test_mysql_default_port() {
        let config = Config::from_yaml(
            r#"
database:
  type: mysql
  host: db
  database: app
  user: root
"#,
        )
        .unwrap();
        assert_eq!(config.database.port_or_default(), 3306);
    }

    #[test]
    fn test_password_not_serialized() {
        let config = Config::from_yaml(
            r#"
database:
  host: localhost
  database: app
  user: app
  password: super_secret
"#,
        )
        .unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("super_secret"), "Password was serialized: {}", yaml);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/fixtures.yaml").unwrap_err();
        assert!(matches!(err, FixtureError::Io(_)));
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = Config::from_yaml("database: [").unwrap_err();
        assert!(matches!(err, FixtureError::Config(_)));
        assert!(Config::from_yaml("").is_err());
    }
}
