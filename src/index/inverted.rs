use std::collections::HashMap;

// BM25+ parameters.
const K1: f64 = 1.2;
const B: f64 = 0.7;
const DELTA: f64 = 0.5;

/// Split `text` into lowercase terms on every non-alphanumeric character.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: usize,
    tf: u32,
}

/// Term postings for one field across every document of an index.
#[derive(Debug, Default)]
pub(super) struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>,
    lengths: Vec<u32>,
    avg_len: f64,
}

impl InvertedIndex {
    /// Index one field value per document; the `n`th value belongs to document slot `n`.
    pub(super) fn build<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut lengths = Vec::new();

        for (doc, value) in values.into_iter().enumerate() {
            let mut counts: HashMap<String, u32> = HashMap::new();
            let mut len = 0u32;
            for term in tokenize(value) {
                *counts.entry(term).or_default() += 1;
                len += 1;
            }
            for (term, tf) in counts {
                postings.entry(term).or_default().push(Posting { doc, tf });
            }
            lengths.push(len);
        }

        #[allow(clippy::cast_precision_loss)]
        let avg_len = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().map(|&l| f64::from(l)).sum::<f64>() / lengths.len() as f64
        };

        InvertedIndex {
            postings,
            lengths,
            avg_len,
        }
    }

    /// Add this field's BM25+ contribution for `term` to each matching document's score.
    #[allow(clippy::cast_precision_loss)]
    pub(super) fn score_term(&self, term: &str, scores: &mut HashMap<usize, f64>) {
        let Some(postings) = self.postings.get(term) else {
            return;
        };
        let n_docs = self.lengths.len() as f64;
        let df = postings.len() as f64;
        let idf = (1.0 + (n_docs - df + 0.5) / (df + 0.5)).ln();

        for posting in postings {
            let tf = f64::from(posting.tf);
            let len = f64::from(self.lengths[posting.doc]);
            let norm = if self.avg_len > 0.0 {
                1.0 - B + B * len / self.avg_len
            } else {
                1.0
            };
            let score = idf * ((tf * (K1 + 1.0)) / (tf + K1 * norm) + DELTA);
            *scores.entry(posting.doc).or_default() += score;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_splits() {
        let terms: Vec<_> = tokenize("Hello, World! rust-lang 2024").collect();
        assert_eq!(terms, vec!["hello", "world", "rust", "lang", "2024"]);
        assert_eq!(tokenize("  !! ").count(), 0);
    }

    #[test]
    fn rarer_and_more_frequent_terms_score_higher() {
        let index = InvertedIndex::build(["apple apple banana", "apple cherry", "banana"]);

        let mut scores = HashMap::new();
        index.score_term("apple", &mut scores);
        assert_eq!(scores.len(), 2);
        assert!(scores[&0] > scores[&1]);

        let mut cherry = HashMap::new();
        index.score_term("cherry", &mut cherry);
        assert!(cherry[&1] > scores[&1]);

        let mut none = HashMap::new();
        index.score_term("durian", &mut none);
        assert!(none.is_empty());
    }
}
