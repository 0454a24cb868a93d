use crate::error::Error;
use crate::record_store::{Record, RecordStore};

/// Lists records from the registrar's HTTP API. The endpoint must answer `GET` with a JSON array
/// of records, e.g. `[{"name":"dingle","tld":"it","ip":"https://example.com"}]`.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct HttpRecordStore {
    client: reqwest::Client,
    url: String,
}

impl HttpRecordStore {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        HttpRecordStore {
            client,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for HttpRecordStore {
    async fn all_records(&self) -> Result<Vec<Record>, Error> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::RecordStoreStatus(status.as_u16()));
        }
        Ok(response.json().await?)
    }

    async fn remove_records(&mut self, _ids: &[String]) -> Result<usize, Error> {
        Err(Error::NotImplemented)
    }
}
