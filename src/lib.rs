//! Survey ingestion: fetch responses from Typeform and SurveyMonkey, extract
//! them into canonical answer tables, merge them with a `source` column and
//! coerce selected fields, then hand the result to a table sink.

pub mod apis;
pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod infra;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod table;
pub mod types;

pub use error::{IngestError, Result};
pub use pipeline::{Pipeline, PipelineResult, SourceSummary};
pub use table::{AnswerTable, MergedTable};
pub use types::{CellValue, RawAnswer, RawResponseBundle, SurveyProvider};
