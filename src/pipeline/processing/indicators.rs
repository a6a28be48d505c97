use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::table::MergedTable;
use crate::types::CellValue;

/// A derived yes/no column: does `field` mention any of `markers`?
///
/// Providers word the same option differently (Typeform sends the full label,
/// SurveyMonkey a short choice name), so one indicator usually lists one
/// marker per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRule {
    pub name: String,
    pub field: String,
    pub markers: Vec<String>,
}

impl IndicatorRule {
    pub fn matches(&self, value: &CellValue) -> bool {
        match value {
            CellValue::Text(text) => self.markers.iter().any(|m| text.contains(m.as_str())),
            CellValue::Labels(labels) => labels
                .iter()
                .any(|label| self.markers.iter().any(|m| label.contains(m.as_str()))),
            _ => false,
        }
    }
}

/// Evaluate each rule row by row. The merged table itself is not touched.
///
/// A rule whose field is not in the table yields an all-false column.
pub fn derive_indicators(table: &MergedTable, rules: &[IndicatorRule]) -> BTreeMap<String, Vec<bool>> {
    rules
        .iter()
        .map(|rule| {
            let column = match table.column(&rule.field) {
                Some(values) => values.iter().map(|v| rule.matches(v)).collect(),
                None => vec![false; table.rows()],
            };
            (rule.name.clone(), column)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SOURCE_FIELD;

    fn drive_less() -> IndicatorRule {
        IndicatorRule {
            name: "drive_less".to_string(),
            field: "actions_taken_self".to_string(),
            markers: vec![
                "Reduced your carbon footprint by driving and/or flying less".to_string(),
                "driving_flying".to_string(),
            ],
        }
    }

    #[test]
    fn test_indicator_matches_either_providers_wording() {
        let mut columns = BTreeMap::new();
        columns.insert(
            "actions_taken_self".to_string(),
            vec![
                CellValue::Labels(vec![
                    "Reduced your carbon footprint by driving and/or flying less".to_string(),
                ]),
                CellValue::Labels(vec!["home_energy".to_string(), "driving_flying".to_string()]),
                CellValue::Null,
                CellValue::Labels(vec!["meat_dairy".to_string()]),
            ],
        );
        columns.insert(SOURCE_FIELD.to_string(), vec![CellValue::text("x"); 4]);
        let table = MergedTable::from_columns(columns, 4);

        let derived = derive_indicators(&table, &[drive_less()]);
        assert_eq!(derived["drive_less"], vec![true, true, false, false]);
    }

    #[test]
    fn test_unknown_field_yields_false_column() {
        let mut columns = BTreeMap::new();
        columns.insert(SOURCE_FIELD.to_string(), vec![CellValue::text("x"); 2]);
        let table = MergedTable::from_columns(columns, 2);

        let derived = derive_indicators(&table, &[drive_less()]);
        assert_eq!(derived["drive_less"], vec![false, false]);
    }
}
