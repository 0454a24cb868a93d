//! Dingle
//!
//! A search index for an alternative DNS registrar. Dingle periodically crawls the address of
//! every registered domain, extracts plain text from the returned page, and serves full-text
//! [search][crate::api#search-get] and [random discovery][crate::api#random-get] over HTTP.
//!
//! Records that can't be crawled (unsupported address scheme, duplicate address, blocked name,
//! unreachable site, or a page without text) are written to a prune list. The `dingle-purge`
//! binary deletes them from the [record store][crate::record_store].
//!
//! The crawled document list is persisted as a snapshot after every pass so a restarted
//! service can answer queries before its first live crawl completes.
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod crawl;
pub mod error;
pub mod index;
pub mod persist;
pub mod record_store;
pub mod refresh;

pub use api::new as new_http;
pub use config::{Config, SharedConfig};
pub use index::ActiveIndex;
pub use refresh::Refresher;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global `tracing` subscriber, filtered by `RUST_LOG` (default `dingle=info`).
pub fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dingle=info".into()),
        )
        .init();
}
