use crate::error::Error;
use crate::record_store::{Record, RecordStore};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryRecordStore {
    records: Vec<Record>,
}

impl InMemoryRecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        InMemoryRecordStore { records }
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn all_records(&self) -> Result<Vec<Record>, Error> {
        Ok(self.records.clone())
    }

    async fn remove_records(&mut self, ids: &[String]) -> Result<usize, Error> {
        let before = self.records.len();
        self.records
            .retain(|r| r.id.as_ref().map_or(true, |id| !ids.contains(id)));
        Ok(before - self.records.len())
    }
}
