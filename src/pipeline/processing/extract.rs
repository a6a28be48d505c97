use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, instrument};

use crate::error::{IngestError, Result};
use crate::pipeline::processing::format::AnswerFormatter;
use crate::registry::field_mapping::FieldMapping;
use crate::table::AnswerTable;
use crate::types::RawResponseBundle;

/// Build a canonical answer table from a fetched bundle.
///
/// Each respondent adds exactly one entry to every canonical field: its
/// formatted answer, or the null marker when the field went unanswered. Any
/// unmapped question, malformed answer, or repeated answer to the same field
/// aborts extraction and no table is returned.
#[instrument(skip(bundle, mapping, formatter), fields(respondents = bundle.len()))]
pub fn extract_answers(
    provider: &str,
    bundle: &RawResponseBundle,
    mapping: &FieldMapping,
    formatter: &AnswerFormatter,
) -> Result<AnswerTable> {
    let fields = mapping.canonical_fields();
    let mut table = AnswerTable::with_fields(fields.iter().cloned());

    for (index, respondent) in bundle.respondents.iter().enumerate() {
        let mut unseen: BTreeSet<&str> = fields.iter().map(|f| f.as_str()).collect();
        let mut row = BTreeMap::new();

        for answered in &respondent.answers {
            let field = mapping.resolve(&answered.question_id).ok_or_else(|| IngestError::UnmappedField {
                provider: provider.to_string(),
                respondent: index,
                question_id: answered.question_id.clone(),
            })?;

            if !unseen.remove(field) {
                return Err(IngestError::Format {
                    provider: provider.to_string(),
                    field: field.to_string(),
                    respondent: index,
                    reason: format!("answered more than once (question '{}')", answered.question_id),
                });
            }

            let value = formatter
                .format(field, &answered.answer)
                .map_err(|failure| IngestError::Format {
                    provider: provider.to_string(),
                    field: field.to_string(),
                    respondent: index,
                    reason: failure.to_string(),
                })?;
            row.insert(field.to_string(), value);
        }

        if !unseen.is_empty() {
            debug!(respondent = index, unanswered = unseen.len(), "Padding unanswered fields");
        }
        table.push_row(row);
    }

    Ok(table)
}
