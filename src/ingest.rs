//! Movie ingestion loop
//!
//! Rows are processed one at a time, in file order:
//! 1. Embed the overview (a failure skips just this row)
//! 2. Attach the vector to the record
//! 3. Upsert under a fresh random key (a failure ends the run)

use tracing::{debug, warn};

use crate::db::DocumentStore;
use crate::embed::TextEmbedder;
use crate::error::WriteError;
use crate::progress::ProgressTracker;
use crate::types::{IngestReport, MovieRecord, SkippedRow};

/// Fresh random document key: a v4 UUID as 32 lowercase hex characters
pub fn new_document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub struct Ingester<'a, E, S> {
    embedder: &'a E,
    store: &'a S,
}

impl<'a, E, S> Ingester<'a, E, S>
where
    E: TextEmbedder,
    S: DocumentStore,
{
    pub fn new(embedder: &'a E, store: &'a S) -> Self {
        Self { embedder, store }
    }

    /// Embed and write every record.
    ///
    /// Embedding failures are logged and recorded in the report. The first
    /// write failure is returned as is; documents written before it stay
    /// written.
    pub async fn ingest(
        &self,
        records: Vec<MovieRecord>,
        progress: &ProgressTracker,
    ) -> Result<IngestReport, WriteError> {
        let mut report = IngestReport {
            total_rows: records.len(),
            ..Default::default()
        };

        for (idx, mut record) in records.into_iter().enumerate() {
            let row = idx + 1;

            match self.embedder.embed(&record.overview()).await {
                Ok(embedding) => record.set_overview_embedding(embedding),
                Err(e) => {
                    let title = record.title();
                    progress.suspend(|| {
                        warn!(row, title = %title, error = %e, "Error while generating embeddings");
                    });
                    report.skipped.push(SkippedRow {
                        row,
                        title,
                        reason: e.to_string(),
                    });
                    progress.inc();
                    continue;
                }
            }

            let doc_id = new_document_id();
            self.store.upsert(&doc_id, &record).await?;
            debug!(row, key = %doc_id, "row written");

            report.documents_written += 1;
            report.document_ids.push(doc_id);
            progress.inc();
        }

        progress.finish();
        Ok(report)
    }
}
