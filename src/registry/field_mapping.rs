use crate::constants::SOURCE_FIELD;
use crate::error::{IngestError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Provider-specific translation from external question id to canonical field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    entries: BTreeMap<String, String>,
}

impl FieldMapping {
    pub fn new(entries: BTreeMap<String, String>) -> Result<Self> {
        if entries.is_empty() {
            return Err(IngestError::Config("field mapping is empty".to_string()));
        }
        for (external_id, canonical) in &entries {
            if canonical.trim().is_empty() {
                return Err(IngestError::Config(format!(
                    "question '{}' maps to an empty field name",
                    external_id
                )));
            }
            if canonical == SOURCE_FIELD {
                return Err(IngestError::Config(format!(
                    "question '{}' maps to reserved field '{}'",
                    external_id, SOURCE_FIELD
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Mapping where each question id is already the canonical field name
    pub fn identity<I, S>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = fields
            .into_iter()
            .map(|f| {
                let f = f.into();
                (f.clone(), f)
            })
            .collect();
        Self::new(entries)
    }

    pub fn resolve(&self, external_id: &str) -> Option<&str> {
        self.entries.get(external_id).map(|s| s.as_str())
    }

    /// The canonical schema this mapping produces
    pub fn canonical_fields(&self) -> BTreeSet<String> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Choice id to label lookup for providers that send opaque choice ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChoiceTable {
    labels: BTreeMap<String, String>,
}

impl ChoiceTable {
    pub fn new(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }

    pub fn label(&self, choice_id: &str) -> Option<&str> {
        self.labels.get(choice_id).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Everything a form config file provides for one provider
#[derive(Debug, Clone)]
pub struct FormConfig {
    pub mapping: FieldMapping,
    pub choices: ChoiceTable,
}

#[derive(Debug, Deserialize)]
struct FormConfigFile {
    id_to_field: BTreeMap<String, String>,
    #[serde(default)]
    id_to_choice: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FormConfigShape {
    Full(FormConfigFile),
    Identity(Vec<String>),
    Explicit(BTreeMap<String, String>),
}

impl FormConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        let shape: FormConfigShape = serde_json::from_str(content)
            .map_err(|e| IngestError::Config(format!("malformed form config: {}", e)))?;
        match shape {
            FormConfigShape::Full(file) => Ok(Self {
                mapping: FieldMapping::new(file.id_to_field)?,
                choices: ChoiceTable::new(file.id_to_choice),
            }),
            FormConfigShape::Identity(fields) => {
                let mut seen = BTreeSet::new();
                for field in &fields {
                    if !seen.insert(field.as_str()) {
                        return Err(IngestError::Config(format!("field '{}' listed twice", field)));
                    }
                }
                Ok(Self {
                    mapping: FieldMapping::identity(fields)?,
                    choices: ChoiceTable::default(),
                })
            }
            FormConfigShape::Explicit(entries) => Ok(Self {
                mapping: FieldMapping::new(entries)?,
                choices: ChoiceTable::default(),
            }),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!("Failed to read form config {}: {}", path.display(), e))
        })?;
        Self::from_json(&content).map_err(|e| match e {
            IngestError::Config(msg) => IngestError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }
}
