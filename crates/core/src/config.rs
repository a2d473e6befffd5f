//! Runtime configuration for a single drift invocation.
//!
//! The CLI layer resolves flags, `.env` entries, and environment variables
//! into an [`AppConfig`]; the engine only ever sees the validated record.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::DriftError;

/// Supported database flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseDriver {
    Postgres,
    MySql,
}

impl DatabaseDriver {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseDriver::Postgres => "POSTGRES",
            DatabaseDriver::MySql => "MYSQL",
        }
    }
}

impl fmt::Display for DatabaseDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseDriver {
    type Err = DriftError;

    /// Driver names are matched case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "POSTGRES" => Ok(DatabaseDriver::Postgres),
            "MYSQL" => Ok(DatabaseDriver::MySql),
            other => Err(DriftError::Config(format!(
                "config - {:?} is not a valid db driver name, value must be one of (POSTGRES, MYSQL)",
                other
            ))),
        }
    }
}

/// SSL negotiation requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Prefer,
    Require,
}

impl SslMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
        }
    }
}

impl fmt::Display for SslMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SslMode {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            other => Err(DriftError::Config(format!(
                "config - {:?} is not a valid ssl mode, value must be one of (disable, prefer, require)",
                other
            ))),
        }
    }
}

/// Everything needed to reach one database
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub ssl_mode: SslMode,
}

/// Validated configuration record for one command invocation
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub driver: DatabaseDriver,
    pub connection: ConnectionConfig,
    /// Flat directory holding the `.up.sql` / `.down.sql` pairs
    pub migrations_dir: PathBuf,
    /// Gates the `fix` command
    pub allow_fix: bool,
    /// Skips confirmation prompts and treats them as answered
    pub silent_mode: bool,
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_parsing_is_case_insensitive() {
        assert_eq!(
            "postgres".parse::<DatabaseDriver>().unwrap(),
            DatabaseDriver::Postgres
        );
        assert_eq!(
            "MySQL".parse::<DatabaseDriver>().unwrap(),
            DatabaseDriver::MySql
        );
        assert_eq!(
            "POSTGRES".parse::<DatabaseDriver>().unwrap(),
            DatabaseDriver::Postgres
        );
    }

    #[test]
    fn unknown_driver_is_a_config_error() {
        let err = "sqlite".parse::<DatabaseDriver>().unwrap_err();
        assert!(matches!(err, DriftError::Config(_)));
        assert!(err.to_string().contains("POSTGRES, MYSQL"));
    }

    #[test]
    fn ssl_mode_parses_the_three_documented_values() {
        assert_eq!("disable".parse::<SslMode>().unwrap(), SslMode::Disable);
        assert_eq!("Prefer".parse::<SslMode>().unwrap(), SslMode::Prefer);
        assert_eq!("REQUIRE".parse::<SslMode>().unwrap(), SslMode::Require);
        assert!("verify-full".parse::<SslMode>().is_err());
    }
}
