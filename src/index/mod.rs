//! Full-text search over crawled documents.
//!
//! A [`SearchIndex`] is built once from a complete [`Document`] list and never mutated. The
//! [`ActiveIndex`] holds the index that queries currently run against; the
//! [refresh scheduler][crate::refresh] replaces it wholesale after each pass, so a reader either
//! sees the previous index or the new one, never a partially populated one.
//!
//! Documents are indexed on `title`, `text` and `description`. Only `id`, `title`,
//! `description` and `url` are stored for retrieval, so results never carry page text.
use crate::crawl::Document;
use crate::error::Error;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

mod inverted;
pub mod snapshot;

use inverted::InvertedIndex;
pub use inverted::tokenize;

/// The stored fields of an indexed document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: usize,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        DocumentSummary {
            id: doc.id,
            title: doc.title.clone(),
            description: doc.description.clone(),
            url: doc.url.clone(),
        }
    }
}

/// A ranked search result.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchHit {
    #[serde(flatten)]
    pub document: DocumentSummary,
    pub score: f64,
}

#[derive(Debug, Default)]
pub struct SearchIndex {
    stored: Vec<DocumentSummary>,
    title: InvertedIndex,
    text: InvertedIndex,
    description: InvertedIndex,
}

impl SearchIndex {
    pub fn build(documents: &[Document]) -> Self {
        SearchIndex {
            stored: documents.iter().map(DocumentSummary::from).collect(),
            title: InvertedIndex::build(documents.iter().map(|d| d.title.as_str())),
            text: InvertedIndex::build(documents.iter().map(|d| d.text.as_str())),
            description: InvertedIndex::build(
                documents
                    .iter()
                    .map(|d| d.description.as_deref().unwrap_or_default()),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Documents matching any term of `query`, best first. Equal scores are ordered by id.
    ///
    /// A query without any searchable term matches nothing.
    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        let terms: HashSet<String> = tokenize(query).collect();
        let mut scores: HashMap<usize, f64> = HashMap::new();
        for term in &terms {
            for field in [&self.title, &self.text, &self.description] {
                field.score_term(term, &mut scores);
            }
        }

        let mut hits: Vec<SearchHit> = scores
            .into_iter()
            .map(|(slot, score)| SearchHit {
                document: self.stored[slot].clone(),
                score,
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.document.id.cmp(&b.document.id))
        });
        hits
    }

    /// One document drawn uniformly at random.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyIndex`] if the index holds no documents.
    pub fn random_pick(&self) -> Result<DocumentSummary, Error> {
        self.stored
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(Error::EmptyIndex)
    }
}

/// The index queries currently run against, shared between the API and the scheduler.
///
/// Readers take a cheap clone of the current [`Arc<SearchIndex>`] and release the lock before
/// querying, so queries never wait on a rebuild.
#[derive(Clone, Default)]
pub struct ActiveIndex {
    current: Arc<RwLock<Option<Arc<SearchIndex>>>>,
}

impl ActiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The active index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotReady`] until the first index has been activated.
    pub async fn current(&self) -> Result<Arc<SearchIndex>, Error> {
        self.current.read().await.clone().ok_or(Error::NotReady)
    }

    /// Activate `index`, returning the index it replaces.
    pub async fn replace(&self, index: SearchIndex) -> Option<Arc<SearchIndex>> {
        self.current.write().await.replace(Arc::new(index))
    }

    pub async fn is_ready(&self) -> bool {
        self.current.read().await.is_some()
    }
}
