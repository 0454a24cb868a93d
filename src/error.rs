//! Error types.

/// Error enumerates the possible Dingle error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when a [`RecordStore`][crate::record_store::RecordStore] backend can't perform
    /// the requested operation, e.g. removing records through the read-only registrar API.
    #[error("not implemented")]
    NotImplemented,

    /// Returned by queries made before the first index (warm-start or live) is active.
    #[error("index not ready, wait for documents to load")]
    NotReady,

    /// Returned when the [`/search` API endpoint][crate::api#search-get] is called without a
    /// query, or with a query that contains no searchable terms.
    #[error("query parameter \"q\" is required")]
    EmptyQuery,

    /// Returned when a random document is requested from an index with no documents.
    #[error("index contains no documents")]
    EmptyIndex,

    /// Returned when every site a crawl pass fetched timed out or failed in transport. The
    /// pass is treated as failed so a network outage can't empty the index or prune every
    /// record.
    #[error("none of the {0} fetched sites could be reached")]
    Unreachable(usize),

    /// Returned when a blocking task, such as an index build, panicked or was cancelled.
    #[error("background task failed")]
    Task(#[from] tokio::task::JoinError),

    /// Returned when a loaded [`Config`][crate::config::Config] is not usable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Returned when an HTTP client can't be built, or the registrar's record listing couldn't
    /// be requested or decoded.
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Returned when the registrar's record listing responds with a non-success status.
    #[error("record store responded with HTTP {0}")]
    RecordStoreStatus(u16),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when processing JSON from disk (e.g.
    /// [trying to load a `Config`][crate::config::Config::try_from_file], a
    /// [`FileRecordStore`][crate::record_store::FileRecordStore] or a
    /// [snapshot][crate::index::snapshot]) fails due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),
}
