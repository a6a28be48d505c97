use std::collections::BTreeMap;

use tracing::{info, instrument};

use crate::constants::SOURCE_FIELD;
use crate::error::{IngestError, Result};
use crate::table::{AnswerTable, MergedTable};
use crate::types::CellValue;

/// Concatenate labelled answer tables row-wise, in the order given, and add
/// the `source` column.
///
/// All tables must share exactly the same field set; the first table is the
/// reference and the first table that differs is reported with its missing
/// and extra fields.
#[instrument(skip(tables), fields(tables = tables.len()))]
pub fn merge(tables: Vec<(String, AnswerTable)>) -> Result<MergedTable> {
    let reference = match tables.first() {
        Some((_, table)) => table.field_names(),
        None => return Err(IngestError::EmptyMerge),
    };

    for (label, table) in tables.iter().skip(1) {
        let fields = table.field_names();
        if fields != reference {
            return Err(IngestError::SchemaMismatch {
                label: label.clone(),
                missing: reference.difference(&fields).cloned().collect(),
                extra: fields.difference(&reference).cloned().collect(),
            });
        }
    }

    let mut columns: BTreeMap<String, Vec<CellValue>> =
        reference.iter().map(|f| (f.clone(), Vec::new())).collect();
    let mut sources = Vec::new();
    let mut rows = 0;

    for (label, table) in tables {
        let respondents = table.respondents();
        for (field, values) in table.into_columns() {
            if let Some(column) = columns.get_mut(&field) {
                column.extend(values);
            }
        }
        sources.extend(std::iter::repeat(CellValue::Text(label.clone())).take(respondents));
        rows += respondents;
        info!(source = %label, respondents, "Merged answer table");
    }

    columns.insert(SOURCE_FIELD.to_string(), sources);
    Ok(MergedTable::from_columns(columns, rows))
}
