use crate::record_store::Record;

/// Decides whether a registered name may be listed in the index at all.
pub trait NamePolicy {
    fn permits(&self, record: &Record) -> bool;
}

/// Permits every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl NamePolicy for AllowAll {
    fn permits(&self, _record: &Record) -> bool {
        true
    }
}

/// Rejects records whose name contains any blocklisted word, ignoring ASCII case.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    words: Vec<String>,
}

impl Blocklist {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_ascii_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Blocklist { words }
    }
}

impl NamePolicy for Blocklist {
    fn permits(&self, record: &Record) -> bool {
        let name = record.name.to_ascii_lowercase();
        !self.words.iter().any(|w| name.contains(w.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocklist_matches_substrings_case_insensitively() {
        let policy = Blocklist::new(["spam", " ", "Scam"]);
        let record = |name: &str| Record::new(name, "dev", "https://x.test");

        assert!(policy.permits(&record("garden")));
        assert!(!policy.permits(&record("SPAMMER")));
        assert!(!policy.permits(&record("notascam")));
    }

    #[test]
    fn empty_blocklist_permits_everything() {
        assert!(Blocklist::new(Vec::<String>::new()).permits(&Record::new("x", "y", "z")));
        assert!(AllowAll.permits(&Record::default()));
    }
}
