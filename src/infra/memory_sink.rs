use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::app::ports::TableSinkPort;
use crate::error::Result;
use crate::table::MergedTable;

/// Keeps every table it receives; used by tests and dry runs
#[derive(Clone, Default)]
pub struct MemorySink {
    tables: Arc<Mutex<Vec<MergedTable>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn tables(&self) -> Vec<MergedTable> {
        self.tables.lock().await.clone()
    }
}

#[async_trait]
impl TableSinkPort for MemorySink {
    async fn write_table(&self, table: &MergedTable) -> Result<()> {
        self.tables.lock().await.push(table.clone());
        Ok(())
    }
}
