//! The refresh scheduler.
//!
//! A [`Refresher`] owns the lifecycle of crawl passes. On startup it
//! [warm-starts](Refresher::warm_start) the [`ActiveIndex`] from the persisted snapshot, then
//! [`Refresher::run`] performs a live pass immediately and another every
//! [`Config::refresh_interval`][crate::config::Config::refresh_interval].
//!
//! Only one pass runs at a time: [`Refresher::refresh`] returns [`PassOutcome::Skipped`] if a
//! pass is already in progress. A failed pass leaves the active index untouched and is retried
//! with exponential backoff, capped at
//! [`Config::retry_max_delay`][crate::config::Config::retry_max_delay].
use crate::config::Config;
use crate::crawl::{CrawlContext, CrawlOutcome, CrawlPipeline, Document};
use crate::error::Error;
use crate::index::{snapshot, ActiveIndex, SearchIndex};
use crate::persist;
use crate::record_store::DynRecordStore;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub interval: Duration,
    pub retry_initial_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule {
            interval: Duration::from_secs(12 * 60 * 60),
            retry_initial_delay: Duration::from_secs(30),
            retry_max_delay: Duration::from_secs(30 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed { documents: usize, pruned: usize },
    /// Another pass was already running.
    Skipped,
}

pub struct Refresher {
    store: DynRecordStore,
    pipeline: CrawlPipeline,
    active: ActiveIndex,
    snapshot_path: Option<PathBuf>,
    prune_list_path: Option<PathBuf>,
    schedule: Schedule,
    busy: AtomicBool,
}

/// Clears the busy flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Refresher {
    pub fn new(store: DynRecordStore, pipeline: CrawlPipeline, active: ActiveIndex) -> Self {
        Refresher {
            store,
            pipeline,
            active,
            snapshot_path: None,
            prune_list_path: None,
            schedule: Schedule::default(),
            busy: AtomicBool::new(false),
        }
    }

    /// Build a refresher crawling `store` with the fetcher, name policy, schedule and state
    /// paths described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the site fetcher's HTTP client can't be built.
    pub fn from_config(
        config: &Config,
        store: DynRecordStore,
        active: ActiveIndex,
    ) -> Result<Self, Error> {
        let pipeline = CrawlPipeline::new(
            Arc::new(config.site_fetcher()?),
            Arc::new(config.name_policy()),
            config.fetch_concurrency,
        );
        let mut refresher = Self::new(store, pipeline, active).with_schedule(Schedule {
            interval: config.refresh_interval,
            retry_initial_delay: config.retry_initial_delay,
            retry_max_delay: config.retry_max_delay,
        });
        if let Some(path) = &config.snapshot_path {
            refresher = refresher.with_snapshot(path);
        }
        if let Some(path) = &config.prune_list_path {
            refresher = refresher.with_prune_list(path);
        }
        Ok(refresher)
    }

    #[must_use]
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_prune_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.prune_list_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn active_index(&self) -> &ActiveIndex {
        &self.active
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Activate an index built from the persisted snapshot, if there is one. Returns whether an
    /// index was activated. An unreadable snapshot is logged and skipped.
    pub async fn warm_start(&self) -> bool {
        let Some(path) = &self.snapshot_path else {
            return false;
        };
        match snapshot::load(path).await {
            Ok(Some(documents)) => {
                tracing::info!(
                    "warm start with {} documents from {}",
                    documents.len(),
                    path.display()
                );
                match build_index(documents).await {
                    Ok((index, _)) => {
                        self.active.replace(index).await;
                        true
                    }
                    Err(err) => {
                        tracing::warn!("ignoring snapshot at {}: {err:?}", path.display());
                        false
                    }
                }
            }
            Ok(None) => {
                tracing::debug!("no snapshot at {}", path.display());
                false
            }
            Err(err) => {
                tracing::warn!("ignoring snapshot at {}: {err:?}", path.display());
                false
            }
        }
    }

    /// Run one full pass: list records, crawl, build and activate a new index, then persist the
    /// snapshot and prune list.
    ///
    /// # Errors
    ///
    /// Returns an error if the record store can't be listed, or if sites were fetched and every
    /// one of them timed out or failed in transport. The active index and prune list are left
    /// untouched in both cases. A pass that simply yields no documents, e.g. because every
    /// record was screened out, completes and activates an empty index.
    pub async fn refresh(&self) -> Result<PassOutcome, Error> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::warn!("refresh already in progress, skipping");
            return Ok(PassOutcome::Skipped);
        }
        let _guard = PassGuard(&self.busy);

        let started = Instant::now();
        let records = self.store.read().await.all_records().await?;
        tracing::info!("found {} records in {:?}", records.len(), started.elapsed());

        let mut ctx = CrawlContext::new();
        let outcome = self.pipeline.run(&records, &mut ctx).await;
        if outcome.lost_connectivity() {
            return Err(Error::Unreachable(outcome.attempted));
        }

        let CrawlOutcome {
            documents, pruned, ..
        } = outcome;
        let (index, documents) = build_index(documents).await?;
        self.active.replace(index).await;

        if let Some(path) = &self.snapshot_path {
            if let Err(err) = snapshot::save(path, &documents).await {
                tracing::error!("failed to save snapshot to {}: {err:?}", path.display());
            }
        }
        if let Some(path) = &self.prune_list_path {
            if let Err(err) = persist::save_json(path, &pruned).await {
                tracing::error!("failed to save prune list to {}: {err:?}", path.display());
            }
        }

        let (documents, pruned) = (documents.len(), pruned.len());
        tracing::info!(
            "refresh finished at {} after {:?} with a total of {documents} docs ({pruned} pruned)",
            OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
            started.elapsed(),
        );
        Ok(PassOutcome::Completed { documents, pruned })
    }

    /// Refresh immediately, then on every schedule interval for the life of the process.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.schedule.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let mut delay = self.schedule.retry_initial_delay;
            while let Err(err) = self.refresh().await {
                tracing::error!("refresh failed, retrying in {delay:?}: {err:?}");
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(self.schedule.retry_max_delay);
            }
            interval.reset();
        }
    }
}

/// Build an index on the blocking pool, handing the documents back for persisting.
async fn build_index(documents: Vec<Document>) -> Result<(SearchIndex, Vec<Document>), Error> {
    Ok(tokio::task::spawn_blocking(move || (SearchIndex::build(&documents), documents)).await?)
}
