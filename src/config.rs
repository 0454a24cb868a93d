use crate::crawl::fetch::DEFAULT_MAX_BODY_BYTES;
use crate::crawl::{Blocklist, SiteFetcher};
use crate::error::Error;
use crate::record_store::{
    DynRecordStore, FileRecordStore, HttpRecordStore, InMemoryRecordStore, Record,
};
use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub type SharedConfig = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_api_timeout")]
    pub api_timeout: Duration,
    /// Where the registered records are listed from.
    pub records: RecordStoreConfig,
    /// Document snapshot used to warm-start the index. Not persisted when unset.
    pub snapshot_path: Option<String>,
    /// Where each pass writes its prune list for `dingle-purge`. Not written when unset.
    pub prune_list_path: Option<String>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: Duration,
    /// Maximum number of fetches in flight during a pass. `1` crawls strictly sequentially.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// Larger response bodies are treated as unusable and the record is pruned.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_retry_initial_delay")]
    pub retry_initial_delay: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay: Duration,
    #[serde(default)]
    pub raw_host: RawHostRewrite,
    /// Names containing any of these words are never crawled.
    #[serde(default)]
    pub blocklist: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RecordStoreConfig {
    File { path: String },
    Http { url: String },
    Memory { records: Vec<Record> },
}

/// Rewrites repository page addresses on a code host to the raw URL of a single file.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RawHostRewrite {
    pub host: String,
    pub raw_base: String,
    pub branch: String,
    pub file: String,
}

impl Default for RawHostRewrite {
    fn default() -> Self {
        RawHostRewrite {
            host: "github.com".to_string(),
            raw_base: "https://raw.githubusercontent.com".to_string(),
            branch: "main".to_string(),
            file: "index.html".to_string(),
        }
    }
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(12 * 60 * 60)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_millis(2000)
}

fn default_fetch_concurrency() -> usize {
    8
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

fn default_retry_initial_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_retry_max_delay() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_user_agent() -> String {
    format!("dingle/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.validate()?;
        Ok(conf)
    }

    /// Open the configured record store.
    ///
    /// # Errors
    ///
    /// Returns an error if a file-backed store can't be loaded, or the HTTP client can't be built.
    pub async fn record_store(&self) -> Result<DynRecordStore, Error> {
        let store: DynRecordStore = match &self.records {
            RecordStoreConfig::File { path } => {
                Arc::new(RwLock::new(FileRecordStore::try_from_file(path).await?))
            }
            RecordStoreConfig::Http { url } => {
                let client = reqwest::Client::builder()
                    .user_agent(self.user_agent.as_str())
                    .build()?;
                Arc::new(RwLock::new(HttpRecordStore::new(client, url.as_str())))
            }
            RecordStoreConfig::Memory { records } => {
                Arc::new(RwLock::new(InMemoryRecordStore::new(records.clone())))
            }
        };
        Ok(store)
    }

    /// Build the site fetcher for crawl passes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the HTTP client can't be built.
    pub fn site_fetcher(&self) -> Result<SiteFetcher, Error> {
        Ok(SiteFetcher::new(
            self.fetch_timeout,
            &self.user_agent,
            self.raw_host.clone(),
        )?
        .with_max_body_bytes(self.max_body_bytes))
    }

    pub fn name_policy(&self) -> Blocklist {
        Blocklist::new(&self.blocklist)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.fetch_concurrency == 0 {
            return Err(Error::InvalidConfig(
                "fetch_concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::InvalidConfig(
                "max_body_bytes must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() || self.refresh_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "fetch_timeout and refresh_interval must be non-zero".to_string(),
            ));
        }
        if self.retry_initial_delay.is_zero() || self.retry_initial_delay > self.retry_max_delay {
            return Err(Error::InvalidConfig(
                "retry_initial_delay must be non-zero and at most retry_max_delay".to_string(),
            ));
        }
        Ok(())
    }
}
