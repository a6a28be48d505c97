use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use crate::app::ports::TableSinkPort;
use crate::error::{IngestError, Result};
use crate::pipeline::processing::indicators::{derive_indicators, IndicatorRule};
use crate::table::MergedTable;

/// Writes the merged table as a JSON array of row records, with any derived
/// indicator columns appended to each row.
pub struct JsonFileSink {
    path: PathBuf,
    indicators: Vec<IndicatorRule>,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            indicators: Vec::new(),
        }
    }

    pub fn with_indicators(mut self, indicators: Vec<IndicatorRule>) -> Self {
        self.indicators = indicators;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render(&self, table: &MergedTable) -> Result<Vec<u8>> {
        let derived = derive_indicators(table, &self.indicators);
        let mut records = table.records();
        for (name, column) in &derived {
            if table.column(name).is_some() {
                return Err(IngestError::Sink(format!(
                    "indicator '{}' collides with a table column",
                    name
                )));
            }
            for (record, flag) in records.iter_mut().zip(column) {
                record.insert(name.clone(), Value::Bool(*flag));
            }
        }
        Ok(serde_json::to_vec_pretty(&records)?)
    }
}

#[async_trait]
impl TableSinkPort for JsonFileSink {
    async fn write_table(&self, table: &MergedTable) -> Result<()> {
        let body = self.render(table)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, body).await?;
        info!(path = %self.path.display(), rows = table.rows(), "Wrote merged table");
        Ok(())
    }
}
