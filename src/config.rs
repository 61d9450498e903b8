use log::LevelFilter;
use serde::Deserialize;
use std::{env, fs::read_to_string, path::Path};

/// The server version extracted from the Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable key to load the config from
const CONFIG_ENV_KEY: &str = "LEXICROSS_CONFIG_JSON";

/// Environment variable selecting the storage backend
/// ("ndb"/"docstore" or "postgresql"/"sql")
const DATABASE_BACKEND_KEY: &str = "DATABASE_BACKEND";

/// Environment variable carrying the relational connection URL
const DATABASE_URL_KEY: &str = "DATABASE_URL";

pub fn load_config() -> Option<Config> {
    // Attempt to load the config from the env
    let mut config: Option<Config> = None;

    if let Ok(env) = env::var(CONFIG_ENV_KEY) {
        match serde_json::from_str(&env) {
            Ok(value) => config = Some(value),
            Err(err) => {
                eprintln!("Failed to load env config (Using default): {:?}", err);
            }
        }
    }

    if config.is_none() {
        // Attempt to load the config from disk
        let file = Path::new("config.json");
        if file.exists() {
            match read_to_string(file) {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(value) => config = Some(value),
                    Err(err) => {
                        eprintln!("Failed to load config file (Using default): {:?}", err);
                    }
                },
                Err(err) => {
                    eprintln!("Failed to load config file (Using defaults): {:?}", err);
                }
            }
        }
    }

    let mut config = config.unwrap_or_default();

    // Environment variables override the file contents
    if let Ok(backend) = env::var(DATABASE_BACKEND_KEY) {
        if let Some(backend) = DatabaseBackend::parse(&backend) {
            config.database.backend = backend;
        }
    }
    if let Ok(url) = env::var(DATABASE_URL_KEY) {
        config.database.url = Some(url);
    }

    Some(config)
}

#[derive(Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: Default::default(),
            logging: LevelFilter::Info,
        }
    }
}

/// The storage substrate behind the persistence protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// Embedded schemaless document store with optimistic concurrency
    #[serde(alias = "ndb")]
    DocStore,
    /// Relational store with explicit sessions and transactions
    #[serde(alias = "postgresql", alias = "postgres")]
    Sql,
}

impl DatabaseBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ndb" | "docstore" => Some(Self::DocStore),
            "postgresql" | "postgres" | "sql" => Some(Self::Sql),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    /// Connection URL; required for the relational backend
    pub url: Option<String>,
    /// Optional directory the document store mirrors its documents into
    pub data_dir: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::DocStore,
            url: None,
            data_dir: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_backend_aliases() {
        assert_eq!(
            DatabaseBackend::parse("ndb"),
            Some(DatabaseBackend::DocStore)
        );
        assert_eq!(
            DatabaseBackend::parse("postgresql"),
            Some(DatabaseBackend::Sql)
        );
        assert_eq!(DatabaseBackend::parse("sql"), Some(DatabaseBackend::Sql));
        assert_eq!(DatabaseBackend::parse("bogus"), None);
    }

    #[test]
    fn config_from_json() {
        let config: Config = serde_json::from_str(
            r#"{"database": {"backend": "postgresql", "url": "postgres://localhost/lexi"}}"#,
        )
        .expect("config should parse");
        assert_eq!(config.database.backend, DatabaseBackend::Sql);
        assert_eq!(
            config.database.url.as_deref(),
            Some("postgres://localhost/lexi")
        );
    }
}
