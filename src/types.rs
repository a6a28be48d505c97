use crate::error::Result;
use crate::pipeline::processing::extract::extract_answers;
use crate::pipeline::processing::format::AnswerFormatter;
use crate::registry::field_mapping::FieldMapping;
use crate::table::AnswerTable;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single canonical value in an answer table.
///
/// `Null` is the "no answer provided" marker. Coercion also writes `Null` for
/// values it cannot parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Labels(Vec<String>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn text(value: impl Into<String>) -> Self {
        CellValue::Text(value.into())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("null"),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Labels(labels) => f.write_str(&labels.join("; ")),
        }
    }
}

/// One entry of a multi-select style answer as delivered by SurveyMonkey
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub choice_id: Option<String>,
    pub text: Option<String>,
}

/// Provider answer decoded from the wire, before formatting
#[derive(Debug, Clone, PartialEq)]
pub enum RawAnswer {
    Text(String),
    Boolean(bool),
    Number(f64),
    /// Single choice, already resolved to its label
    Choice(String),
    /// Multiple choice, already resolved to labels
    Choices(Vec<String>),
    /// Opaque selections which may still need a choice table lookup
    Selections(Vec<Selection>),
    /// An answer type this crate does not decode
    Unsupported(String),
}

impl RawAnswer {
    /// Shape name used in error messages
    pub fn shape(&self) -> &'static str {
        match self {
            RawAnswer::Text(_) => "text",
            RawAnswer::Boolean(_) => "boolean",
            RawAnswer::Number(_) => "number",
            RawAnswer::Choice(_) => "choice",
            RawAnswer::Choices(_) => "choices",
            RawAnswer::Selections(_) => "selections",
            RawAnswer::Unsupported(_) => "unsupported",
        }
    }
}

/// An answered question keyed by the provider's own question id
#[derive(Debug, Clone, PartialEq)]
pub struct RawQuestionAnswer {
    pub question_id: String,
    pub answer: RawAnswer,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRespondent {
    pub answers: Vec<RawQuestionAnswer>,
}

/// Every respondent of one form, in fetch order, with all pages exhausted
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawResponseBundle {
    pub respondents: Vec<RawRespondent>,
    pub pages_fetched: usize,
}

impl RawResponseBundle {
    pub fn len(&self) -> usize {
        self.respondents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.respondents.is_empty()
    }
}

/// Core trait that every survey provider adapter implements
#[async_trait::async_trait]
pub trait SurveyProvider: Send + Sync {
    /// Provenance label written into the `source` column
    fn label(&self) -> &str;

    fn field_mapping(&self) -> &FieldMapping;

    fn formatter(&self) -> &AnswerFormatter;

    /// Fetch every response of the configured form, following pagination to the end
    async fn fetch(&self) -> Result<RawResponseBundle>;

    /// Turn a fetched bundle into a canonical answer table
    fn extract(&self, bundle: &RawResponseBundle) -> Result<AnswerTable> {
        extract_answers(self.label(), bundle, self.field_mapping(), self.formatter())
    }
}
