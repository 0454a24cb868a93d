use anyhow::{anyhow, Result};
use dingle::{ActiveIndex, Config, Refresher, SharedConfig};
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dingle::tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("dingle".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let record_store = config.record_store().await?;
    let index = ActiveIndex::new();

    let refresher = Arc::new(Refresher::from_config(
        &config,
        record_store,
        index.clone(),
    )?);
    if !refresher.warm_start().await {
        tracing::info!("no snapshot loaded, queries wait for the first crawl");
    }
    let refresh_handle = tokio::spawn({
        let refresher = refresher.clone();
        async move { refresher.run().await }
    });

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = dingle::api::new(&config, index);
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
        refresh_res = refresh_handle => {
            if let Err(err) = refresh_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}
