use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct SearchParams {
    pub q: Option<String>,
}

impl SearchParams {
    /// The trimmed query, if it isn't blank.
    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}
