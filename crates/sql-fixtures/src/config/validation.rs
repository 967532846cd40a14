//! Configuration validation.

use super::Config;
use crate::core::Dialect;
use crate::drivers::common::SslMode;
use crate::drivers::DialectImpl;
use crate::error::{FixtureError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let db = &config.database;
    let dialect = DialectImpl::from_name(&db.r#type)
        .map_err(|e| FixtureError::Config(format!("database.type: {}", e)))?;

    match dialect {
        DialectImpl::Sqlite(_) => {
            if db.path.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
                return Err(FixtureError::Config(
                    "database.path is required for sqlite".into(),
                ));
            }
        }
        DialectImpl::Postgres(_) | DialectImpl::Mysql(_) => {
            if db.host.is_empty() {
                return Err(FixtureError::Config(format!(
                    "database.host is required for {}",
                    dialect.name()
                )));
            }
            if db.database.is_empty() {
                return Err(FixtureError::Config("database.database is required".into()));
            }
            if db.user.is_empty() {
                return Err(FixtureError::Config("database.user is required".into()));
            }
            SslMode::parse(&db.ssl_mode)?;
        }
    }

    if db.max_connections == 0 {
        return Err(FixtureError::Config(
            "database.max_connections must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, LoadConfig};
    use std::path::PathBuf;

    fn valid_config() -> Config {
        Config {
            database: DatabaseConfig {
                r#type: "postgres".to_string(),
                host: "localhost".to_string(),
                port: Some(5432),
                database: "app_test".to_string(),
                user: "postgres".to_string(),
                password: "password".to_string(),
                ssl_mode: "disable".to_string(),
                path: None,
                max_connections: 4,
            },
            load: LoadConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_config();
        config.database.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_type() {
        let mut config = valid_config();
        config.database.r#type = "oracle".to_string();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("database.type"));
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.database.ssl_mode = "sometimes".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_sqlite_requires_path() {
        let mut config = valid_config();
        config.database.r#type = "sqlite".to_string();
        assert!(validate(&config).is_err());

        config.database.path = Some(PathBuf::from(":memory:"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_connections() {
        let mut config = valid_config();
        config.database.max_connections = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = valid_config();
        config.database.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.database);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }
}
