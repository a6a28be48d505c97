use async_trait::async_trait;

use crate::error::Result;
use crate::table::MergedTable;

// Fetch-side port: the provider adapters only need authenticated GETs
#[async_trait]
pub trait HttpClientPort: Send + Sync {
    async fn get(&self, url: &str, bearer_token: &str) -> std::result::Result<HttpGetResult, String>;
}

#[derive(Clone, Debug)]
pub struct HttpGetResult {
    pub status: u16,
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl HttpGetResult {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Receives the merged, coerced table once a run completes
#[async_trait]
pub trait TableSinkPort: Send + Sync {
    async fn write_table(&self, table: &MergedTable) -> Result<()>;
}
