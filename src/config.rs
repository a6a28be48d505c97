use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::constants::{
    DEFAULT_OUTPUT_PATH, SURVEY_MONKEY_BASE_URL, SURVEY_MONKEY_LABEL, SURVEY_MONKEY_MAX_PER_PAGE,
    SURVEY_MONKEY_TOKEN_ENV, TYPEFORM_BASE_URL, TYPEFORM_LABEL, TYPEFORM_MAX_PAGE_SIZE, TYPEFORM_TOKEN_ENV,
};
use crate::error::{IngestError, Result};
use crate::pipeline::processing::coerce::CoercionRule;
use crate::pipeline::processing::format::FieldFormat;
use crate::pipeline::processing::indicators::IndicatorRule;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineSettings,
    pub typeform: Option<TypeformConfig>,
    pub surveymonkey: Option<SurveyMonkeyConfig>,
    #[serde(default)]
    pub indicators: Vec<IndicatorRule>,
    /// Directory relative form config paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_output")]
    pub output: PathBuf,
    #[serde(default)]
    pub coerce: Vec<CoercionRule>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output: default_output(),
            coerce: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TypeformConfig {
    pub token: Option<String>,
    pub form_id: String,
    #[serde(default = "default_typeform_page_size")]
    pub page_size: usize,
    /// Form config file: list of field refs, or an id -> field object
    pub fields: PathBuf,
    #[serde(default = "default_typeform_label")]
    pub label: String,
    #[serde(default = "default_typeform_format")]
    pub default_format: FieldFormat,
    #[serde(default)]
    pub formats: BTreeMap<String, FieldFormat>,
    #[serde(default = "default_typeform_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SurveyMonkeyConfig {
    pub access_token: Option<String>,
    pub form_id: String,
    #[serde(default = "default_monkey_per_page")]
    pub per_page: usize,
    /// Form config file with `id_to_field` and `id_to_choice`
    pub mapping: PathBuf,
    #[serde(default = "default_monkey_label")]
    pub label: String,
    #[serde(default = "default_monkey_format")]
    pub default_format: FieldFormat,
    #[serde(default)]
    pub formats: BTreeMap<String, FieldFormat>,
    #[serde(default = "default_monkey_base_url")]
    pub base_url: String,
}

fn default_output() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}

fn default_typeform_page_size() -> usize {
    TYPEFORM_MAX_PAGE_SIZE
}

fn default_typeform_label() -> String {
    TYPEFORM_LABEL.to_string()
}

fn default_typeform_format() -> FieldFormat {
    FieldFormat::Native
}

fn default_typeform_base_url() -> String {
    TYPEFORM_BASE_URL.to_string()
}

fn default_monkey_per_page() -> usize {
    SURVEY_MONKEY_MAX_PER_PAGE
}

fn default_monkey_label() -> String {
    SURVEY_MONKEY_LABEL.to_string()
}

fn default_monkey_format() -> FieldFormat {
    FieldFormat::Integer
}

fn default_monkey_base_url() -> String {
    SURVEY_MONKEY_BASE_URL.to_string()
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| IngestError::Config(format!("Failed to read config file '{}': {}", path.display(), e)))?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::from_toml_str(&content, base_dir)
    }

    pub fn from_toml_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.base_dir = base_dir.into();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.typeform.is_none() && self.surveymonkey.is_none() {
            return Err(IngestError::Config("no survey provider configured".to_string()));
        }
        if let Some(tf) = &self.typeform {
            require_non_empty("typeform.form_id", &tf.form_id)?;
            require_non_empty("typeform.label", &tf.label)?;
            require_range("typeform.page_size", tf.page_size, TYPEFORM_MAX_PAGE_SIZE)?;
        }
        if let Some(sm) = &self.surveymonkey {
            require_non_empty("surveymonkey.form_id", &sm.form_id)?;
            require_non_empty("surveymonkey.label", &sm.label)?;
            require_range("surveymonkey.per_page", sm.per_page, SURVEY_MONKEY_MAX_PER_PAGE)?;
        }
        let mut names = BTreeSet::new();
        for indicator in &self.indicators {
            require_non_empty("indicators.name", &indicator.name)?;
            if !names.insert(indicator.name.as_str()) {
                return Err(IngestError::Config(format!("indicator '{}' defined twice", indicator.name)));
            }
        }
        Ok(())
    }

    /// Resolve a path from the config file against the config's directory
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Credential from the config file, falling back to an environment variable
pub fn resolve_credential(section: &str, value: Option<&str>, env_var: &str) -> Result<String> {
    let usable = |v: &String| !v.trim().is_empty();
    value
        .map(str::to_string)
        .filter(usable)
        .or_else(|| std::env::var(env_var).ok().filter(usable))
        .ok_or_else(|| {
            IngestError::Config(format!("{}: missing credentials (set it in the config or {})", section, env_var))
        })
}

impl TypeformConfig {
    pub fn token(&self) -> Result<String> {
        resolve_credential("typeform.token", self.token.as_deref(), TYPEFORM_TOKEN_ENV)
    }
}

impl SurveyMonkeyConfig {
    pub fn access_token(&self) -> Result<String> {
        resolve_credential("surveymonkey.access_token", self.access_token.as_deref(), SURVEY_MONKEY_TOKEN_ENV)
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(IngestError::Config(format!("{} must not be empty", key)));
    }
    Ok(())
}

fn require_range(key: &str, value: usize, max: usize) -> Result<()> {
    if value == 0 || value > max {
        return Err(IngestError::Config(format!("{} must be between 1 and {}, got {}", key, max, value)));
    }
    Ok(())
}
