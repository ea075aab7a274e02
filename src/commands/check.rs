//! Check command handler
//!
//! Connects, resolves the target collection and loads the dataset without
//! calling the embedding API or writing anything.

use colored::Colorize;
use std::path::Path;

use movie_ingest::types::{CERTIFICATE, GROSS, META_SCORE, OVERVIEW};
use movie_ingest::{Cluster, Config, IngestError, Table};

pub async fn run_check(config: &Config, dataset: &Path) -> Result<(), IngestError> {
    println!("Embedding model: {}", config.embedding_model);

    println!("Connecting to couchbase...");
    let cluster = Cluster::connect(&config.db.conn_str, &config.db.username, &config.db.password)
        .await?;
    let bucket = cluster.bucket(&config.db.bucket).await?;
    println!("{} Bucket {} opened", "✓".green(), bucket.name());
    let scope = bucket.scope(&config.db.scope)?;
    let collection = scope.collection(&config.db.collection)?;
    println!("{} Collection {} is reachable", "✓".green(), collection.keyspace());

    let mut table = Table::load(dataset)?;
    let missing_overviews = table.missing_count(OVERVIEW);
    let filled: Vec<(&str, usize)> = [GROSS, CERTIFICATE, META_SCORE]
        .into_iter()
        .map(|column| (column, table.missing_count(column)))
        .collect();
    table.clean()?;

    println!(
        "{} Dataset {} loaded: {} rows, {} columns",
        "✓".green(),
        dataset.display(),
        table.len(),
        table.columns().len()
    );
    for (column, count) in filled {
        println!("  {}: {} missing values filled", column, count);
    }
    if missing_overviews > 0 {
        println!(
            "  {} {} rows have no {} and will be skipped",
            "!".yellow(),
            missing_overviews,
            OVERVIEW
        );
    }

    Ok(())
}
