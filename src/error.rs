//! Error types for movie-ingest
//!
//! Each stage of the pipeline has its own error enum. [`EmbeddingError`] is the
//! only one handled per row; everything else is folded into [`IngestError`]
//! and ends the run.

use reqwest::StatusCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Maximum number of characters of a response body kept in error messages.
const SNIPPET_LEN: usize = 200;

/// Trim a response body down to something that fits on one log line.
pub(crate) fn snippet(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_LEN {
        flat
    } else {
        let cut: String = flat.chars().take(SNIPPET_LEN).collect();
        format!("{cut}…")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run-level error
// ─────────────────────────────────────────────────────────────────────────────

/// Any failure that ends the whole run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Only raised while building the embedding client. Per-call failures are
    /// handled row by row and never reach this level.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or blank.
    #[error("{0} environment variable is not set. Please add it to the environment")]
    MissingVar(&'static str),

    /// An explicitly requested env file could not be loaded.
    #[error("failed to load env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Database
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid connection string '{input}': {reason}")]
    InvalidConnectionString { input: String, reason: &'static str },

    #[error("authentication failed for user '{username}' at {url}")]
    Authentication { username: String, url: String },

    #[error("cluster not ready after {timeout:?}: {last_error}")]
    NotReady { timeout: Duration, last_error: String },

    #[error("HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("bucket '{0}' not found")]
    BucketNotFound(String),

    #[error("scope '{scope}' not found in bucket '{bucket}'")]
    ScopeNotFound { bucket: String, scope: String },

    #[error("collection '{collection}' not found in {bucket}.{scope}")]
    CollectionNotFound {
        bucket: String,
        scope: String,
        collection: String,
    },
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("upsert of '{key}' failed: {source}")]
    Transport {
        key: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("upsert of '{key}' failed with HTTP {status}: {snippet}")]
    HttpStatus {
        key: String,
        status: StatusCode,
        snippet: String,
    },

    #[error("upsert of '{key}' rejected ({code}): {message}")]
    Rejected {
        key: String,
        code: i64,
        message: String,
    },

    #[error("upsert of '{key}' returned an unreadable response: {reason}")]
    Decode { key: String, reason: String },
}

// ─────────────────────────────────────────────────────────────────────────────
// Embeddings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("API key is not a valid HTTP header value")]
    InvalidApiKey,

    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("embedding API returned HTTP {status}: {snippet}")]
    HttpStatus { status: StatusCode, snippet: String },

    #[error("failed to decode embedding response: {0}")]
    Decode(String),

    #[error("embedding API returned an empty vector")]
    EmptyVector,
}

// ─────────────────────────────────────────────────────────────────────────────
// Dataset
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("column '{0}' not found in dataset")]
    MissingColumn(&'static str),

    #[error("row {row} has {found} fields but the header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// `row` is 1-based and counts data rows only.
    #[error("row {row}: '{value}' in column '{column}' is not a number")]
    MalformedNumber {
        column: &'static str,
        row: usize,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_collapses_whitespace() {
        assert_eq!(snippet("  quota\n  exceeded \t"), "quota exceeded");
    }

    #[test]
    fn test_snippet_truncates_long_bodies() {
        let body = "x".repeat(500);
        let s = snippet(&body);
        assert_eq!(s.chars().count(), SNIPPET_LEN + 1);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn test_missing_var_message_names_variable() {
        let err = ConfigError::MissingVar("DB_BUCKET");
        assert!(err.to_string().starts_with("DB_BUCKET environment variable is not set"));
    }

    #[test]
    fn test_ingest_error_is_transparent() {
        let err: IngestError = DatasetError::MissingColumn("Gross").into();
        assert_eq!(err.to_string(), "column 'Gross' not found in dataset");
    }
}
