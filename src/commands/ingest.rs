//! Ingest command handler

use colored::Colorize;
use std::path::Path;
use tracing::info;

use movie_ingest::{
    Cluster, Config, GeminiEmbedder, IngestError, Ingester, ProgressTracker, Table,
};

pub async fn run_ingest(config: &Config, dataset: &Path) -> Result<(), IngestError> {
    let embedder = GeminiEmbedder::new(&config.google_api_key, &config.embedding_model)?;
    info!(model = embedder.model(), "embedding client ready");

    println!("Connecting to couchbase...");
    let cluster = Cluster::connect(&config.db.conn_str, &config.db.username, &config.db.password)
        .await?;
    let bucket = cluster.bucket(&config.db.bucket).await?;
    let scope = bucket.scope(&config.db.scope)?;
    let collection = scope.collection(&config.db.collection)?;

    let mut table = Table::load(dataset)?;
    table.clean()?;
    let records = table.into_records();

    println!("Ingesting Data...");
    let progress = ProgressTracker::new(records.len());
    let report = Ingester::new(&embedder, &collection)
        .ingest(records, &progress)
        .await?;

    println!("\n{} Ingestion complete!", "✓".green());
    println!("  Collection: {}", collection.keyspace());
    println!("  Rows: {}", report.total_rows);
    println!("  Documents written: {}", report.documents_written);
    if report.skipped.is_empty() {
        println!("  Rows skipped: 0");
    } else {
        println!(
            "  Rows skipped (embedding failed): {}",
            report.skipped.len().to_string().yellow()
        );
        for skipped in &report.skipped {
            println!("    {} {}: {}", format!("#{}", skipped.row).dimmed(), skipped.title, skipped.reason);
        }
    }

    Ok(())
}
