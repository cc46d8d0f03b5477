use anyhow::{anyhow, Result};

use newsbot_core::{storage::Database, AppConfig};

use super::build_fetcher;

pub async fn run(db: &Database, config: &AppConfig) -> Result<()> {
    println!("Fetching all sources...\n");

    let fetcher = build_fetcher(db, config)?;
    let report = fetcher.fetch_once().await?;

    println!("Sources:   {}", report.sources);
    println!("Items:     {}", report.fetched);
    println!("New:       {}", report.stored);
    println!("Filtered:  {}", report.skipped);
    if report.failed_sources > 0 {
        println!("Failed:    {} (see log)", report.failed_sources);
    }

    match report.store_error {
        Some(e) => Err(anyhow!(e).context("Failed to store articles")),
        None => Ok(()),
    }
}
