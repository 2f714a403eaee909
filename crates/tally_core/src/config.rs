//! Configuration loading.
//!
//! Settings resolve in three layers: built-in defaults, then an optional TOML
//! file, then environment variables prefixed with `TALLY__` using `__` as the
//! nesting separator (e.g. `TALLY__POSTGRES__HOST` overrides
//! `postgres.host`).

use std::fmt;
use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::debug;

use crate::backend::BackendKind;
use crate::errors::Result;

const ENV_PREFIX: &str = "TALLY";
const ENV_SEPARATOR: &str = "__";

/// Connection parameters for the demo database.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for PgConfig {
    fn default() -> Self {
        PgConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "demo".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
        }
    }
}

impl PgConfig {
    /// Keyword/value connection string as consumed by tokio-postgres.
    pub fn conn_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.database, self.user, self.password
        )
    }
}

// Keep the password out of logs.
impl fmt::Debug for PgConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Tuning for table scans and partitioned execution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Rows fetched per round trip when scanning in chunks.
    pub chunk_size: usize,
    /// Number of parallel partitions for the distributed engine.
    pub partitions: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            chunk_size: 1024,
            partitions: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    pub backend: BackendKind,
    pub postgres: PgConfig,
    pub scan: ScanConfig,
}

impl TallyConfig {
    /// Load configuration from defaults, an optional file and the
    /// environment.
    pub fn load(file: Option<&Path>) -> Result<TallyConfig> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::new(&path.to_string_lossy(), FileFormat::Toml));
        }
        let loaded = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .ignore_empty(true),
            )
            .build()?;
        let config: TallyConfig = loaded.try_deserialize()?;
        debug!(
            backend = %config.backend,
            host = %config.postgres.host,
            database = %config.postgres.database,
            "loaded configuration"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::io::Write;

    use super::*;

    #[test]
    fn env_overrides_and_defaults() {
        // defaults first, then flip two keys through the environment
        let config = TallyConfig::load(None).unwrap();
        assert!(config.postgres.conn_string().contains("port=5432"));
        assert_eq!(config.scan.chunk_size, 1024);

        env::set_var("TALLY__POSTGRES__HOST", "db.internal");
        env::set_var("TALLY__BACKEND", "memory");
        let config = TallyConfig::load(None).unwrap();
        env::remove_var("TALLY__POSTGRES__HOST");
        env::remove_var("TALLY__BACKEND");

        assert_eq!(config.postgres.host, "db.internal");
        assert_eq!(config.backend, BackendKind::Memory);
    }

    #[test]
    fn toml_file_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[postgres]\nport = 6543\ndatabase = \"analytics\"\n\n[scan]\npartitions = 2"
        )
        .unwrap();

        let config = TallyConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.postgres.port, 6543);
        assert_eq!(config.postgres.database, "analytics");
        assert_eq!(config.scan.partitions, 2);
        assert_eq!(config.scan.chunk_size, 1024);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = TallyConfig::load(Some(Path::new("/nonexistent/tally.toml"))).unwrap_err();
        assert!(err.to_string().contains("tally.toml"));
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", PgConfig::default());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("password: \"postgres\""));
    }
}
