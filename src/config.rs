//! Configuration management for movie-ingest
//!
//! Everything comes from the process environment, optionally seeded from a
//! `.env` file. Required settings are checked up front so that a missing value
//! stops the run before any connection is opened.

use crate::error::ConfigError;
use std::fmt;
use std::path::Path;

/// Embedding model used when `EMBEDDING_MODEL` is unset or blank.
pub const DEFAULT_EMBEDDING_MODEL: &str = "models/text-embedding-004";

pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
pub const DB_CONN_STR: &str = "DB_CONN_STR";
pub const DB_USERNAME: &str = "DB_USERNAME";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_BUCKET: &str = "DB_BUCKET";
pub const DB_SCOPE: &str = "DB_SCOPE";
pub const DB_COLLECTION: &str = "DB_COLLECTION";
pub const EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";

/// Required variables, in the order they are checked.
pub const REQUIRED_VARS: [&str; 7] = [
    GOOGLE_API_KEY,
    DB_CONN_STR,
    DB_USERNAME,
    DB_PASSWORD,
    DB_BUCKET,
    DB_SCOPE,
    DB_COLLECTION,
];

/// Cluster connection and target keyspace
#[derive(Clone)]
pub struct DbConfig {
    pub conn_str: String,
    pub username: String,
    pub password: String,
    pub bucket: String,
    pub scope: String,
    pub collection: String,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("conn_str", &self.conn_str)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("scope", &self.scope)
            .field("collection", &self.collection)
            .finish()
    }
}

/// Full run configuration
#[derive(Clone)]
pub struct Config {
    pub google_api_key: String,
    pub embedding_model: String,
    pub db: DbConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("google_api_key", &"<redacted>")
            .field("embedding_model", &self.embedding_model)
            .field("db", &self.db)
            .finish()
    }
}

impl Config {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    ///
    /// Blank values count as missing. The first missing required variable (in
    /// [`REQUIRED_VARS`] order) is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for name in REQUIRED_VARS {
            if get(name).is_none() {
                return Err(ConfigError::MissingVar(name));
            }
        }

        let must = |name: &'static str| get(name).ok_or(ConfigError::MissingVar(name));

        Ok(Self {
            google_api_key: must(GOOGLE_API_KEY)?,
            embedding_model: get(EMBEDDING_MODEL)
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            db: DbConfig {
                conn_str: must(DB_CONN_STR)?,
                username: must(DB_USERNAME)?,
                password: must(DB_PASSWORD)?,
                bucket: must(DB_BUCKET)?,
                scope: must(DB_SCOPE)?,
                collection: must(DB_COLLECTION)?,
            },
        })
    }
}

/// Load variables from an env file into the process environment.
///
/// Values in the file override variables that are already set. With no
/// explicit path, a `.env` in the working directory is used if there is one.
/// An explicit path that cannot be loaded is an error.
pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => dotenvy::from_path_override(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
        None => match dotenvy::dotenv_override() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "loaded env file");
                Ok(())
            }
            Err(err) if err.not_found() => Ok(()),
            Err(source) => Err(ConfigError::EnvFile {
                path: ".env".into(),
                source,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, String> {
        let mut env = HashMap::new();
        env.insert(GOOGLE_API_KEY, "g-key".to_string());
        env.insert(DB_CONN_STR, "couchbases://cb.example.cloud".to_string());
        env.insert(DB_USERNAME, "ingest".to_string());
        env.insert(DB_PASSWORD, "hunter2".to_string());
        env.insert(DB_BUCKET, "sample".to_string());
        env.insert(DB_SCOPE, "movies".to_string());
        env.insert(DB_COLLECTION, "imdb".to_string());
        env
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_full_env_loads() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.google_api_key, "g-key");
        assert_eq!(config.db.conn_str, "couchbases://cb.example.cloud");
        assert_eq!(config.db.bucket, "sample");
        assert_eq!(config.db.scope, "movies");
        assert_eq!(config.db.collection, "imdb");
    }

    #[test]
    fn test_default_embedding_model() {
        let config = load(&full_env()).unwrap();
        assert_eq!(config.embedding_model, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_blank_embedding_model_uses_default() {
        let mut env = full_env();
        env.insert(EMBEDDING_MODEL, "  ".to_string());
        assert_eq!(load(&env).unwrap().embedding_model, DEFAULT_EMBEDDING_MODEL);
    }

    #[test]
    fn test_explicit_embedding_model() {
        let mut env = full_env();
        env.insert(EMBEDDING_MODEL, "models/gemini-embedding-001".to_string());
        assert_eq!(load(&env).unwrap().embedding_model, "models/gemini-embedding-001");
    }

    #[test]
    fn test_each_required_var_is_enforced() {
        for name in REQUIRED_VARS {
            let mut env = full_env();
            env.remove(name);
            match load(&env) {
                Err(ConfigError::MissingVar(missing)) => assert_eq!(missing, name),
                other => panic!("expected MissingVar({name}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_blank_required_var_counts_as_missing() {
        let mut env = full_env();
        env.insert(DB_SCOPE, String::new());
        assert!(matches!(load(&env), Err(ConfigError::MissingVar(DB_SCOPE))));
    }

    #[test]
    fn test_first_missing_var_is_reported() {
        let mut env = full_env();
        env.remove(DB_PASSWORD);
        env.remove(GOOGLE_API_KEY);
        assert!(matches!(load(&env), Err(ConfigError::MissingVar(GOOGLE_API_KEY))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&full_env()).unwrap();
        let shown = format!("{config:?}");
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("g-key"));
        assert!(shown.contains("sample"));
    }

    #[test]
    fn test_env_file_overrides_process_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.env");
        std::fs::write(&path, "MOVIE_INGEST_TEST_LOG=debug\n").unwrap();
        std::env::set_var("MOVIE_INGEST_TEST_LOG", "warn");

        load_env_file(Some(&path)).unwrap();
        assert_eq!(std::env::var("MOVIE_INGEST_TEST_LOG").unwrap(), "debug");
    }

    #[test]
    fn test_missing_explicit_env_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.env");
        assert!(matches!(
            load_env_file(Some(&path)),
            Err(ConfigError::EnvFile { .. })
        ));
    }
}
