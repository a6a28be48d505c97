use crate::constants::SOURCE_FIELD;
use crate::types::CellValue;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Per-provider table of canonical field -> one value per respondent.
///
/// Every column always has exactly `respondents` entries; rows are only
/// added through [`AnswerTable::push_row`], which pads unanswered fields
/// with [`CellValue::Null`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerTable {
    columns: BTreeMap<String, Vec<CellValue>>,
    respondents: usize,
}

impl AnswerTable {
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: fields.into_iter().map(|f| (f.into(), Vec::new())).collect(),
            respondents: 0,
        }
    }

    /// Append one respondent. Fields missing from `row` receive the null marker.
    pub fn push_row(&mut self, mut row: BTreeMap<String, CellValue>) {
        for (field, column) in self.columns.iter_mut() {
            column.push(row.remove(field).unwrap_or(CellValue::Null));
        }
        debug_assert!(row.is_empty(), "row carried fields outside the table schema: {:?}", row.keys());
        self.respondents += 1;
    }

    pub fn respondents(&self) -> usize {
        self.respondents
    }

    pub fn field_names(&self) -> BTreeSet<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn column(&self, field: &str) -> Option<&[CellValue]> {
        self.columns.get(field).map(|c| c.as_slice())
    }

    pub(crate) fn into_columns(self) -> BTreeMap<String, Vec<CellValue>> {
        self.columns
    }
}

/// Row-concatenation of several answer tables plus the `source` column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedTable {
    columns: BTreeMap<String, Vec<CellValue>>,
    rows: usize,
}

impl MergedTable {
    pub(crate) fn from_columns(columns: BTreeMap<String, Vec<CellValue>>, rows: usize) -> Self {
        debug_assert!(columns.values().all(|c| c.len() == rows));
        Self { columns, rows }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn column(&self, field: &str) -> Option<&[CellValue]> {
        self.columns.get(field).map(|c| c.as_slice())
    }

    pub(crate) fn column_mut(&mut self, field: &str) -> Option<&mut Vec<CellValue>> {
        self.columns.get_mut(field)
    }

    /// Provenance label of every row
    pub fn sources(&self) -> Vec<&str> {
        self.column(SOURCE_FIELD)
            .map(|c| {
                c.iter()
                    .map(|v| match v {
                        CellValue::Text(s) => s.as_str(),
                        _ => "",
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Row-oriented view: one JSON object per respondent
    pub fn records(&self) -> Vec<Map<String, Value>> {
        (0..self.rows)
            .map(|i| {
                self.columns
                    .iter()
                    .map(|(field, column)| {
                        let value = serde_json::to_value(&column[i]).unwrap_or(Value::Null);
                        (field.clone(), value)
                    })
                    .collect()
            })
            .collect()
    }
}
