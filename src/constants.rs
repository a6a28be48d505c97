/// Provider names and fixed column names shared across the crate

// Default provenance labels written into the `source` column
pub const TYPEFORM_LABEL: &str = "typeform";
pub const SURVEY_MONKEY_LABEL: &str = "monkey";

/// Column added by the merger holding each row's provider label
pub const SOURCE_FIELD: &str = "source";

pub const TYPEFORM_BASE_URL: &str = "https://api.typeform.com";
pub const SURVEY_MONKEY_BASE_URL: &str = "https://api.surveymonkey.com";

// Upper bounds the provider APIs accept for a single page
pub const TYPEFORM_MAX_PAGE_SIZE: usize = 1000;
pub const SURVEY_MONKEY_MAX_PER_PAGE: usize = 100;

// Environment fallbacks for credentials left out of the config file
pub const TYPEFORM_TOKEN_ENV: &str = "TYPEFORM_TOKEN";
pub const SURVEY_MONKEY_TOKEN_ENV: &str = "SURVEYMONKEY_ACCESS_TOKEN";

pub const DEFAULT_CONFIG_PATH: &str = "survey.toml";
pub const DEFAULT_OUTPUT_PATH: &str = "output/survey.json";
