use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::processing::coerce::float_to_integer;
use crate::registry::field_mapping::ChoiceTable;
use crate::types::{CellValue, RawAnswer, Selection};

/// Conversion rule applied to a canonical field's raw answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldFormat {
    /// Keep whatever shape the provider declared
    Native,
    Text,
    Boolean,
    Number,
    Integer,
    Choice,
    MultiChoice,
}

impl FieldFormat {
    /// Formats that fail on free text instead of passing it through
    pub fn parses_scalar(self) -> bool {
        matches!(self, FieldFormat::Boolean | FieldFormat::Number | FieldFormat::Integer)
    }
}

/// Why a raw answer could not be converted; the caller adds field and respondent
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatFailure {
    #[error("expected a {expected} answer, got {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },
    #[error("choice id '{0}' is not in the choice table")]
    UnknownChoice(String),
    #[error("'{value}' is not a valid {expected}")]
    Unparseable {
        value: String,
        expected: &'static str,
    },
    #[error("answer carries no value")]
    Empty,
    #[error("answer type '{0}' is not supported")]
    Unsupported(String),
}

/// Per-provider registry of canonical field -> conversion rule
#[derive(Debug, Clone)]
pub struct AnswerFormatter {
    default_format: FieldFormat,
    overrides: BTreeMap<String, FieldFormat>,
    choices: ChoiceTable,
}

impl AnswerFormatter {
    pub fn new(default_format: FieldFormat) -> Self {
        Self {
            default_format,
            overrides: BTreeMap::new(),
            choices: ChoiceTable::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: BTreeMap<String, FieldFormat>) -> Self {
        self.overrides.extend(overrides);
        self
    }

    pub fn with_override(mut self, field: impl Into<String>, format: FieldFormat) -> Self {
        self.overrides.insert(field.into(), format);
        self
    }

    pub fn with_choices(mut self, choices: ChoiceTable) -> Self {
        self.choices = choices;
        self
    }

    pub fn format_for(&self, field: &str) -> FieldFormat {
        self.overrides.get(field).copied().unwrap_or(self.default_format)
    }

    pub fn overridden_fields(&self) -> impl Iterator<Item = &str> {
        self.overrides.keys().map(|k| k.as_str())
    }

    /// Convert one raw answer for `field` into its canonical value
    pub fn format(&self, field: &str, raw: &RawAnswer) -> Result<CellValue, FormatFailure> {
        if let RawAnswer::Unsupported(kind) = raw {
            return Err(FormatFailure::Unsupported(kind.clone()));
        }
        match self.format_for(field) {
            FieldFormat::Native => self.native(raw),
            FieldFormat::Text => as_text(raw).map(CellValue::Text),
            FieldFormat::Boolean => as_boolean(raw),
            FieldFormat::Number => as_number(raw),
            FieldFormat::Integer => as_integer(raw),
            FieldFormat::Choice => self.as_choice(raw),
            FieldFormat::MultiChoice => self.as_labels(raw).map(CellValue::Labels),
        }
    }

    fn native(&self, raw: &RawAnswer) -> Result<CellValue, FormatFailure> {
        match raw {
            RawAnswer::Text(s) => Ok(CellValue::Text(s.clone())),
            RawAnswer::Boolean(b) => Ok(CellValue::Boolean(*b)),
            RawAnswer::Number(n) => Ok(CellValue::Number(*n)),
            RawAnswer::Choice(label) => Ok(CellValue::Text(label.clone())),
            RawAnswer::Choices(labels) => Ok(CellValue::Labels(labels.clone())),
            RawAnswer::Selections(selections) => match selections.as_slice() {
                [Selection { choice_id: None, text: Some(text) }] => Ok(CellValue::Text(text.clone())),
                [] => Err(FormatFailure::Empty),
                _ => self.as_labels(raw).map(CellValue::Labels),
            },
            RawAnswer::Unsupported(kind) => Err(FormatFailure::Unsupported(kind.clone())),
        }
    }

    fn resolve_selection(&self, selection: &Selection) -> Result<String, FormatFailure> {
        match (&selection.choice_id, &selection.text) {
            (Some(id), _) => self
                .choices
                .label(id)
                .map(|label| label.to_string())
                .ok_or_else(|| FormatFailure::UnknownChoice(id.clone())),
            // "Other" write-ins carry only text
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(FormatFailure::Empty),
        }
    }

    fn as_choice(&self, raw: &RawAnswer) -> Result<CellValue, FormatFailure> {
        match raw {
            RawAnswer::Choice(label) | RawAnswer::Text(label) => Ok(CellValue::Text(label.clone())),
            RawAnswer::Selections(selections) => match selections.as_slice() {
                [single] => self.resolve_selection(single).map(CellValue::Text),
                [] => Err(FormatFailure::Empty),
                _ => Err(FormatFailure::Shape {
                    expected: "single choice",
                    found: "multiple selections",
                }),
            },
            other => Err(FormatFailure::Shape {
                expected: "choice",
                found: other.shape(),
            }),
        }
    }

    fn as_labels(&self, raw: &RawAnswer) -> Result<Vec<String>, FormatFailure> {
        match raw {
            RawAnswer::Choices(labels) => Ok(labels.clone()),
            RawAnswer::Choice(label) => Ok(vec![label.clone()]),
            RawAnswer::Selections(selections) => selections
                .iter()
                .map(|s| self.resolve_selection(s))
                .collect(),
            other => Err(FormatFailure::Shape {
                expected: "multiple choice",
                found: other.shape(),
            }),
        }
    }
}

fn first_text(selections: &[Selection]) -> Result<&str, FormatFailure> {
    selections
        .iter()
        .find_map(|s| s.text.as_deref())
        .ok_or(FormatFailure::Empty)
}

fn as_text(raw: &RawAnswer) -> Result<String, FormatFailure> {
    match raw {
        RawAnswer::Text(s) | RawAnswer::Choice(s) => Ok(s.clone()),
        RawAnswer::Boolean(b) => Ok(b.to_string()),
        RawAnswer::Number(n) => Ok(n.to_string()),
        RawAnswer::Choices(labels) => Ok(labels.join("; ")),
        RawAnswer::Selections(selections) => first_text(selections).map(|s| s.to_string()),
        RawAnswer::Unsupported(kind) => Err(FormatFailure::Unsupported(kind.clone())),
    }
}

fn as_boolean(raw: &RawAnswer) -> Result<CellValue, FormatFailure> {
    match raw {
        RawAnswer::Boolean(b) => Ok(CellValue::Boolean(*b)),
        other => Err(FormatFailure::Shape {
            expected: "boolean",
            found: other.shape(),
        }),
    }
}

fn parse_number(text: &str) -> Result<f64, FormatFailure> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| FormatFailure::Unparseable {
            value: text.to_string(),
            expected: "number",
        })
}

fn as_number(raw: &RawAnswer) -> Result<CellValue, FormatFailure> {
    match raw {
        RawAnswer::Number(n) => Ok(CellValue::Number(*n)),
        RawAnswer::Text(s) => parse_number(s).map(CellValue::Number),
        RawAnswer::Selections(selections) => parse_number(first_text(selections)?).map(CellValue::Number),
        other => Err(FormatFailure::Shape {
            expected: "number",
            found: other.shape(),
        }),
    }
}

fn parse_integer(text: &str) -> Result<i64, FormatFailure> {
    text.trim().parse::<i64>().map_err(|_| FormatFailure::Unparseable {
        value: text.to_string(),
        expected: "integer",
    })
}

fn as_integer(raw: &RawAnswer) -> Result<CellValue, FormatFailure> {
    match raw {
        RawAnswer::Number(n) => float_to_integer(*n)
            .map(CellValue::Integer)
            .ok_or_else(|| FormatFailure::Unparseable {
                value: n.to_string(),
                expected: "integer",
            }),
        RawAnswer::Text(s) => parse_integer(s).map(CellValue::Integer),
        RawAnswer::Selections(selections) => parse_integer(first_text(selections)?).map(CellValue::Integer),
        other => Err(FormatFailure::Shape {
            expected: "integer",
            found: other.shape(),
        }),
    }
}
