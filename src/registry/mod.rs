pub mod field_mapping;

pub use field_mapping::{ChoiceTable, FieldMapping, FormConfig};
