//! movie-ingest - embed movie overviews and load them into Couchbase
//!
//! One-shot pipeline:
//! - dataset: CSV → typed, cleaned in-memory table
//! - embed: Google Generative Language `embedContent`, one call per row
//! - db: Couchbase cluster → bucket → scope → collection, upsert per row
//! - ingest: the sequential loop tying them together

pub mod config;
pub mod dataset;
pub mod db;
pub mod embed;
pub mod error;
pub mod ingest;
pub mod progress;
pub mod telemetry;
pub mod types;

pub use config::{load_env_file, Config, DbConfig, DEFAULT_EMBEDDING_MODEL};
pub use dataset::{Table, MOVIES_DATASET};
pub use db::{Bucket, Cluster, Collection, ConnectionString, DocumentStore, Scope};
pub use embed::{GeminiEmbedder, TextEmbedder};
pub use error::{ConfigError, ConnectionError, DatasetError, EmbeddingError, IngestError, WriteError};
pub use ingest::{new_document_id, Ingester};
pub use progress::ProgressTracker;
pub use types::{IngestReport, MovieRecord, SkippedRow, Value};
