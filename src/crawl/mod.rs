//! The crawl pipeline.
//!
//! One pass turns the registrar's full [`Record`] list into a dense, ordered list of
//! [`Document`]s ready for [indexing][crate::index], plus a prune list naming every record that
//! could not be crawled.
//!
//! Per record, in store order:
//!
//! 1. Records whose address isn't `http://` or `https://`, whose address was already seen in
//!    this pass, or whose name the [`NamePolicy`] rejects are pruned without being fetched.
//! 2. Remaining addresses are fetched by a [`SiteFetch`] implementation, up to
//!    [`Config::fetch_concurrency`][crate::config::Config::fetch_concurrency] at a time. Results
//!    are collected in input order.
//! 3. Failed fetches, and pages whose [extracted](extract::extract) body text is empty, are
//!    pruned. Everything else becomes a [`Document`] with the next dense id. Extraction runs on
//!    the blocking pool so large pages don't hold up a runtime worker.
use crate::record_store::Record;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

pub mod extract;
pub mod fetch;
pub mod policy;

pub use extract::{extract, sanitize, Extracted};
pub use fetch::{FetchError, SiteFetch, SiteFetcher};
pub use policy::{AllowAll, Blocklist, NamePolicy};

const HTTP_SCHEMES: [&str; 2] = ["https://", "http://"];

/// The unit that is indexed and persisted in the snapshot.
///
/// `id` is assigned per pass and has no relationship to the originating record's identifier.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub id: usize,
    pub title: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

/// Why a record was excluded from a pass.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PruneReason {
    UnsupportedScheme,
    DuplicateAddress,
    BlockedName,
    Unreachable { detail: String },
    EmptyContent,
    ExtractionFailed,
}

/// A record flagged for removal from the record store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PruneEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub tld: String,
    pub address: String,
    pub reason: PruneReason,
}

impl PruneEntry {
    fn new(record: &Record, reason: PruneReason) -> Self {
        PruneEntry {
            id: record.id.clone(),
            name: record.name.clone(),
            tld: record.tld.clone(),
            address: record.address.clone(),
            reason,
        }
    }
}

/// The state one pass owns. The scheduler creates a fresh context for every pass.
#[derive(Debug, Default)]
pub struct CrawlContext {
    seen_addresses: HashSet<String>,
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, address: &str) -> bool {
        self.seen_addresses.contains(address)
    }
}

/// The result of one pass.
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    pub documents: Vec<Document>,
    pub pruned: Vec<PruneEntry>,
    /// Records that passed screening and were fetched.
    pub attempted: usize,
    /// Fetches that timed out or failed in transport.
    pub connection_failures: usize,
}

impl CrawlOutcome {
    /// Whether fetches were made and not one site could be reached. This points at the
    /// crawler's own network rather than at the sites.
    pub fn lost_connectivity(&self) -> bool {
        self.attempted > 0 && self.connection_failures == self.attempted
    }

    /// Identifiers of the pruned records that have one.
    pub fn prune_ids(&self) -> Vec<String> {
        self.pruned.iter().filter_map(|p| p.id.clone()).collect()
    }
}

pub struct CrawlPipeline {
    fetcher: Arc<dyn SiteFetch + Send + Sync>,
    policy: Arc<dyn NamePolicy + Send + Sync>,
    concurrency: usize,
}

impl CrawlPipeline {
    pub fn new(
        fetcher: Arc<dyn SiteFetch + Send + Sync>,
        policy: Arc<dyn NamePolicy + Send + Sync>,
        concurrency: usize,
    ) -> Self {
        CrawlPipeline {
            fetcher,
            policy,
            concurrency: concurrency.max(1),
        }
    }

    /// Crawl `records` and build the pass's documents and prune list.
    ///
    /// Per-record failures never escape: they are logged and recorded in
    /// [`CrawlOutcome::pruned`].
    pub async fn run(&self, records: &[Record], ctx: &mut CrawlContext) -> CrawlOutcome {
        let mut pruned = Vec::new();
        let mut candidates = Vec::with_capacity(records.len());

        for record in records {
            let reason = if !HTTP_SCHEMES.iter().any(|s| record.address.starts_with(s)) {
                PruneReason::UnsupportedScheme
            } else if ctx.seen(&record.address) {
                PruneReason::DuplicateAddress
            } else if !self.policy.permits(record) {
                PruneReason::BlockedName
            } else {
                ctx.seen_addresses.insert(record.address.clone());
                candidates.push(record);
                continue;
            };
            tracing::debug!("skipping {}: {reason:?}", record.domain());
            pruned.push(PruneEntry::new(record, reason));
        }

        let total = candidates.len();
        let fetched: Vec<_> = stream::iter(candidates)
            .enumerate()
            .map(|(i, record)| async move {
                tracing::debug!("{}/{total} fetching {}", i + 1, record.address);
                let page = match self.fetcher.fetch(&record.address).await {
                    Ok(markup) => {
                        Ok(tokio::task::spawn_blocking(move || extract(&markup)).await)
                    }
                    Err(err) => Err(err),
                };
                (record, page)
            })
            .buffered(self.concurrency)
            .boxed()
            .collect()
            .await;

        let mut documents = Vec::with_capacity(fetched.len());
        let mut connection_failures = 0;
        for (record, page) in fetched {
            let extracted = match page {
                Ok(Ok(extracted)) => extracted,
                Ok(Err(err)) => {
                    tracing::error!("extracting {} failed: {err}", record.domain());
                    pruned.push(PruneEntry::new(record, PruneReason::ExtractionFailed));
                    continue;
                }
                Err(err) => {
                    if err.is_connection_failure() {
                        connection_failures += 1;
                    }
                    tracing::debug!("no content for {}: {err}", record.domain());
                    pruned.push(PruneEntry::new(
                        record,
                        PruneReason::Unreachable {
                            detail: err.to_string(),
                        },
                    ));
                    continue;
                }
            };

            let Extracted {
                title,
                text,
                description,
            } = extracted;
            if text.is_empty() {
                tracing::debug!("no text extracted for {}", record.domain());
                pruned.push(PruneEntry::new(record, PruneReason::EmptyContent));
                continue;
            }

            documents.push(Document {
                id: documents.len(),
                title,
                text,
                description,
                url: record.domain(),
            });
        }

        tracing::info!(
            "crawled {} records: {} documents, {} pruned",
            records.len(),
            documents.len(),
            pruned.len()
        );
        CrawlOutcome {
            documents,
            pruned,
            attempted: total,
            connection_failures,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves canned markup by address; unknown addresses answer 404, `slow` ones time out.
    #[derive(Default)]
    pub(crate) struct FakeFetcher {
        pages: HashMap<String, String>,
        slow: HashSet<String>,
        pub calls: AtomicUsize,
    }

    impl FakeFetcher {
        pub(crate) fn page(mut self, address: &str, markup: &str) -> Self {
            self.pages.insert(address.to_string(), markup.to_string());
            self
        }

        pub(crate) fn slow(mut self, address: &str) -> Self {
            self.slow.insert(address.to_string());
            self
        }
    }

    #[async_trait::async_trait]
    impl SiteFetch for FakeFetcher {
        async fn fetch(&self, address: &str) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.slow.contains(address) {
                tokio::time::sleep(Duration::from_millis(50)).await;
                return Err(FetchError::Timeout(address.to_string()));
            }
            self.pages
                .get(address)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    status: 404,
                    url: address.to_string(),
                })
        }
    }

    fn pipeline(fetcher: FakeFetcher, concurrency: usize) -> CrawlPipeline {
        CrawlPipeline::new(Arc::new(fetcher), Arc::new(AllowAll), concurrency)
    }

    #[tokio::test]
    async fn duplicate_and_unsupported_records_are_excluded() {
        let records = vec![
            Record::new("a", "dev", "https://x.test/ok"),
            Record::new("b", "dev", "https://x.test/ok"),
            Record::new("c", "dev", "ftp://bad"),
        ];
        let fetcher = FakeFetcher::default().page("https://x.test/ok", "<title>T</title><p>Hello World</p>");

        let outcome = pipeline(fetcher, 1)
            .run(&records, &mut CrawlContext::new())
            .await;

        assert_eq!(
            outcome.documents,
            vec![Document {
                id: 0,
                title: "T".to_string(),
                text: "Hello World".to_string(),
                description: None,
                url: "a.dev".to_string(),
            }]
        );
        let reasons: Vec<_> = outcome
            .pruned
            .iter()
            .map(|p| (p.name.as_str(), p.reason.clone()))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("b", PruneReason::DuplicateAddress),
                ("c", PruneReason::UnsupportedScheme),
            ]
        );
    }

    #[tokio::test]
    async fn survivors_keep_record_order_with_dense_ids() {
        let mut fetcher = FakeFetcher::default().slow("https://slow.test");
        let mut records = vec![];
        for i in 0..20 {
            let address = format!("https://site{i}.test");
            if i % 3 != 0 {
                fetcher = fetcher.page(&address, &format!("<p>page {i}</p>"));
            }
            records.push(Record::new(format!("n{i}"), "dev", address));
        }
        records.insert(5, Record::new("slow", "dev", "https://slow.test"));

        let outcome = pipeline(fetcher, 4)
            .run(&records, &mut CrawlContext::new())
            .await;

        assert!(outcome.documents.len() <= records.len());
        let ids: Vec<_> = outcome.documents.iter().map(|d| d.id).collect();
        assert_eq!(ids, (0..outcome.documents.len()).collect::<Vec<_>>());
        let urls: Vec<_> = outcome.documents.iter().map(|d| d.url.clone()).collect();
        let expected: Vec<_> = (0..20)
            .filter(|i| i % 3 != 0)
            .map(|i| format!("n{i}.dev"))
            .collect();
        assert_eq!(urls, expected);
        assert!(outcome
            .pruned
            .iter()
            .any(|p| p.name == "slow" && matches!(p.reason, PruneReason::Unreachable { .. })));
    }

    #[tokio::test]
    async fn empty_text_and_blocked_names_are_pruned() {
        let records = vec![
            Record::new("empty", "dev", "https://empty.test").with_id("1"),
            Record::new("badword", "dev", "https://bad.test").with_id("2"),
            Record::new("fine", "dev", "https://bad.test").with_id("3"),
            Record::new("gone", "dev", "http://gone.test"),
        ];
        let fetcher = FakeFetcher::default()
            .page("https://empty.test", "<title>Only a title</title><div>no text</div>")
            .page("https://bad.test", "<h1>Fine</h1>");
        let pipeline = CrawlPipeline::new(
            Arc::new(fetcher),
            Arc::new(Blocklist::new(["bad"])),
            2,
        );

        let outcome = pipeline.run(&records, &mut CrawlContext::new()).await;

        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.documents[0].url, "fine.dev");
        assert_eq!(outcome.documents[0].text, "Fine");
        // Screening prunes are recorded before fetch failures.
        assert_eq!(outcome.prune_ids(), vec!["2".to_string(), "1".to_string()]);
        assert!(outcome.pruned.iter().any(|p| p.name == "gone"
            && matches!(&p.reason, PruneReason::Unreachable { detail } if detail.contains("404"))));
    }

    #[tokio::test]
    async fn seen_addresses_are_scoped_to_the_context() {
        let records = vec![Record::new("a", "dev", "https://x.test")];
        let fetcher = Arc::new(FakeFetcher::default().page("https://x.test", "<p>x</p>"));
        let pipeline = CrawlPipeline::new(fetcher.clone(), Arc::new(AllowAll), 1);

        let mut ctx = CrawlContext::new();
        assert_eq!(pipeline.run(&records, &mut ctx).await.documents.len(), 1);
        assert!(ctx.seen("https://x.test"));
        assert_eq!(pipeline.run(&records, &mut ctx).await.documents.len(), 0);
        assert_eq!(
            pipeline
                .run(&records, &mut CrawlContext::new())
                .await
                .documents
                .len(),
            1
        );
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn connection_failures_are_counted() {
        let records = vec![
            Record::new("a", "dev", "https://down.test"),
            Record::new("b", "dev", "https://missing.test"),
            Record::new("c", "dev", "ftp://bad"),
        ];
        let fetcher = FakeFetcher::default().slow("https://down.test");
        let outcome = pipeline(fetcher, 2)
            .run(&records, &mut CrawlContext::new())
            .await;
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.connection_failures, 1);
        assert!(!outcome.lost_connectivity());

        let fetcher = FakeFetcher::default().slow("https://down.test");
        let outcome = pipeline(fetcher, 2)
            .run(&records[..1], &mut CrawlContext::new())
            .await;
        assert!(outcome.lost_connectivity());

        // Nothing fetched means nothing to judge connectivity by.
        let outcome = pipeline(FakeFetcher::default(), 2)
            .run(&records[2..], &mut CrawlContext::new())
            .await;
        assert_eq!(outcome.attempted, 0);
        assert!(!outcome.lost_connectivity());
    }

    fn address_for(choice: usize) -> String {
        match choice {
            0..=2 => format!("https://site{choice}.test"),
            3 => "https://blank.test".to_string(),
            4 => "https://missing.test".to_string(),
            _ => "ftp://site.test".to_string(),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn documents_follow_record_order(
            choices in prop::collection::vec(0usize..6, 0..24),
            concurrency in 1usize..6,
        ) {
            let records: Vec<Record> = choices
                .iter()
                .enumerate()
                .map(|(i, &choice)| Record::new(format!("n{i}"), "dev", address_for(choice)))
                .collect();
            let fetcher = (0..3)
                .fold(FakeFetcher::default(), |f, k| {
                    f.page(&address_for(k), &format!("<p>page {k}</p>"))
                })
                .page(&address_for(3), "<div>nothing indexable</div>");

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let outcome = rt.block_on(
                pipeline(fetcher, concurrency).run(&records, &mut CrawlContext::new()),
            );

            prop_assert!(outcome.documents.len() <= records.len());
            prop_assert_eq!(outcome.documents.len() + outcome.pruned.len(), records.len());
            for (i, doc) in outcome.documents.iter().enumerate() {
                prop_assert_eq!(doc.id, i);
            }
            let positions: Vec<usize> = outcome
                .documents
                .iter()
                .map(|d| {
                    d.url
                        .trim_start_matches('n')
                        .trim_end_matches(".dev")
                        .parse()
                        .unwrap()
                })
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn document_snapshot_format() {
        let doc = Document {
            id: 3,
            title: "T".to_string(),
            text: "x".to_string(),
            description: None,
            url: "a.dev".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            serde_json::json!({"id":3,"title":"T","text":"x","url":"a.dev"})
        );
        let reason = serde_json::to_value(PruneReason::Unreachable {
            detail: "HTTP 404".to_string(),
        })
        .unwrap();
        assert_eq!(
            reason,
            serde_json::json!({"kind":"unreachable","detail":"HTTP 404"})
        );
    }
}
