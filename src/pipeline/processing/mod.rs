pub mod coerce;
pub mod extract;
pub mod format;
pub mod indicators;
pub mod merge;

pub use coerce::{coerce, CoercionReport, CoercionRule, TargetType};
pub use extract::extract_answers;
pub use format::{AnswerFormatter, FieldFormat, FormatFailure};
pub use indicators::{derive_indicators, IndicatorRule};
pub use merge::merge;
