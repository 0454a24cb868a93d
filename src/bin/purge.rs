//! Deletes the records named in a prune list from the configured record store.
//!
//! ```bash
//! ❯ dingle-purge config.json            # uses prune_list_path from the config
//! ❯ dingle-purge config.json to_remove.json
//! ```
use anyhow::{anyhow, Context, Result};
use dingle::crawl::PruneEntry;
use dingle::{persist, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dingle::tracing_init();

    let mut args = std::env::args();
    let program_name = args.next().unwrap_or("dingle-purge".to_string());
    let (config_file, prune_file) = (args.next(), args.next());

    let config_file = config_file.ok_or_else(|| {
        anyhow!("usage: {program_name} /path/to/config.json [/path/to/prune.json]")
    })?;
    let config = Config::try_from_file(&config_file)
        .with_context(|| format!("loading config from {config_file}"))?;

    let prune_file = prune_file
        .or_else(|| config.prune_list_path.clone())
        .ok_or_else(|| anyhow!("no prune list given and prune_list_path is not configured"))?;
    let entries: Vec<PruneEntry> = persist::load_json(&prune_file)
        .await?
        .ok_or_else(|| anyhow!("prune list {prune_file} does not exist"))?;

    let ids: Vec<String> = entries.iter().filter_map(|e| e.id.clone()).collect();
    let unidentified = entries.len() - ids.len();
    if unidentified > 0 {
        tracing::warn!("{unidentified} prune entries have no record id and will be kept");
    }

    let record_store = config.record_store().await?;
    let removed = record_store.write().await.remove_records(&ids).await?;
    tracing::info!("deleted {removed} of {} listed records", ids.len());
    Ok(())
}
