use std::sync::Arc;

use tracing::info;

use crate::apis::base::ProviderSettings;
use crate::apis::survey_monkey::SurveyMonkeyAdapter;
use crate::apis::typeform::TypeformAdapter;
use crate::app::ports::HttpClientPort;
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::processing::format::AnswerFormatter;
use crate::registry::field_mapping::FormConfig;
use crate::types::SurveyProvider;

/// Build every configured provider adapter, in fixed order: Typeform first,
/// then SurveyMonkey.
///
/// Credentials and form config files are read here, so configuration
/// problems surface before anything is fetched.
pub fn create_providers(config: &Config, http: Arc<dyn HttpClientPort>) -> Result<Vec<Box<dyn SurveyProvider>>> {
    let mut providers: Vec<Box<dyn SurveyProvider>> = Vec::new();

    if let Some(tf) = &config.typeform {
        let form = FormConfig::load(config.resolve_path(&tf.fields))?;
        info!(provider = %tf.label, fields = form.mapping.len(), "Loaded Typeform field mapping");
        let settings = ProviderSettings {
            label: tf.label.clone(),
            token: tf.token()?,
            form_id: tf.form_id.clone(),
            base_url: tf.base_url.clone(),
            formatter: AnswerFormatter::new(tf.default_format)
                .with_overrides(tf.formats.clone())
                .with_choices(form.choices),
            mapping: form.mapping,
        };
        providers.push(Box::new(TypeformAdapter::new(settings, tf.page_size, http.clone())));
    }

    if let Some(sm) = &config.surveymonkey {
        let form = FormConfig::load(config.resolve_path(&sm.mapping))?;
        info!(
            provider = %sm.label,
            fields = form.mapping.len(),
            choices = form.choices.len(),
            "Loaded SurveyMonkey field mapping"
        );
        let settings = ProviderSettings {
            label: sm.label.clone(),
            token: sm.access_token()?,
            form_id: sm.form_id.clone(),
            base_url: sm.base_url.clone(),
            formatter: AnswerFormatter::new(sm.default_format)
                .with_overrides(sm.formats.clone())
                .with_choices(form.choices),
            mapping: form.mapping,
        };
        providers.push(Box::new(SurveyMonkeyAdapter::new(settings, sm.per_page, http)));
    }

    Ok(providers)
}
