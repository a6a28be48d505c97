use std::sync::Arc;
use std::time::Instant;

use reqwest::Url;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::apis::base::{fetch_json, ProviderSettings};
use crate::app::ports::HttpClientPort;
use crate::constants::TYPEFORM_MAX_PAGE_SIZE;
use crate::error::{IngestError, Result};
use crate::metrics::IngestMetrics;
use crate::pipeline::processing::format::AnswerFormatter;
use crate::registry::field_mapping::FieldMapping;
use crate::types::{RawAnswer, RawQuestionAnswer, RawRespondent, RawResponseBundle, SurveyProvider};

#[derive(Debug, Deserialize)]
struct ResponsesPage {
    #[serde(default)]
    items: Vec<ResponseItem>,
}

#[derive(Debug, Deserialize)]
struct ResponseItem {
    #[serde(default)]
    token: Option<String>,
    // Typeform sends `null` for responses without answers
    #[serde(default)]
    answers: Option<Vec<Answer>>,
}

#[derive(Debug, Deserialize)]
struct Answer {
    field: AnswerField,
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
    email: Option<String>,
    url: Option<String>,
    file_url: Option<String>,
    date: Option<String>,
    phone_number: Option<String>,
    boolean: Option<bool>,
    number: Option<f64>,
    choice: Option<ChoiceAnswer>,
    choices: Option<ChoicesAnswer>,
}

#[derive(Debug, Deserialize)]
struct AnswerField {
    id: String,
    #[serde(rename = "ref")]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceAnswer {
    label: Option<String>,
    other: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoicesAnswer {
    #[serde(default)]
    labels: Vec<String>,
    other: Option<String>,
}

impl Answer {
    fn question_id(&self) -> String {
        self.field.reference.clone().unwrap_or_else(|| self.field.id.clone())
    }

    fn decode(self) -> RawAnswer {
        let missing = |kind: &str| RawAnswer::Unsupported(format!("{} without a value", kind));
        let text = match self.kind.as_str() {
            "text" => self.text,
            "email" => self.email,
            "url" => self.url,
            "file_url" => self.file_url,
            "date" => self.date,
            "phone_number" => self.phone_number,
            "boolean" => return self.boolean.map(RawAnswer::Boolean).unwrap_or_else(|| missing("boolean")),
            "number" => return self.number.map(RawAnswer::Number).unwrap_or_else(|| missing("number")),
            "choice" => {
                return self
                    .choice
                    .and_then(|c| c.label.or(c.other))
                    .map(RawAnswer::Choice)
                    .unwrap_or_else(|| missing("choice"))
            }
            "choices" => {
                return match self.choices {
                    Some(ChoicesAnswer { mut labels, other }) => {
                        labels.extend(other);
                        RawAnswer::Choices(labels)
                    }
                    None => missing("choices"),
                }
            }
            other => return RawAnswer::Unsupported(other.to_string()),
        };
        text.map(RawAnswer::Text).unwrap_or_else(|| missing(&self.kind))
    }
}

impl ResponseItem {
    fn into_respondent(self) -> RawRespondent {
        let answers = self
            .answers
            .unwrap_or_default()
            .into_iter()
            .map(|answer| RawQuestionAnswer {
                question_id: answer.question_id(),
                answer: answer.decode(),
            })
            .collect();
        RawRespondent { answers }
    }
}

/// Adapter for the Typeform responses API
pub struct TypeformAdapter {
    settings: ProviderSettings,
    page_size: usize,
    http: Arc<dyn HttpClientPort>,
}

impl TypeformAdapter {
    pub fn new(settings: ProviderSettings, page_size: usize, http: Arc<dyn HttpClientPort>) -> Self {
        Self {
            settings,
            page_size: page_size.clamp(1, TYPEFORM_MAX_PAGE_SIZE),
            http,
        }
    }

    fn page_url(&self, before: Option<&str>) -> Result<String> {
        let base = format!(
            "{}/forms/{}/responses",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.form_id
        );
        let mut params = vec![("page_size", self.page_size.to_string())];
        if let Some(token) = before {
            params.push(("before", token.to_string()));
        }
        Url::parse_with_params(&base, &params)
            .map(|url| url.to_string())
            .map_err(|e| IngestError::Config(format!("invalid Typeform URL '{}': {}", base, e)))
    }
}

#[async_trait::async_trait]
impl SurveyProvider for TypeformAdapter {
    fn label(&self) -> &str {
        &self.settings.label
    }

    fn field_mapping(&self) -> &FieldMapping {
        &self.settings.mapping
    }

    fn formatter(&self) -> &AnswerFormatter {
        &self.settings.formatter
    }

    #[instrument(skip(self), fields(provider = %self.settings.label, form_id = %self.settings.form_id))]
    async fn fetch(&self) -> Result<RawResponseBundle> {
        let started = Instant::now();
        let mut bundle = RawResponseBundle::default();
        let mut before: Option<String> = None;

        loop {
            let url = self.page_url(before.as_deref())?;
            let page: ResponsesPage =
                fetch_json(&self.http, &self.settings.label, &url, &self.settings.token).await?;
            bundle.pages_fetched += 1;

            let count = page.items.len();
            let last_token = page.items.last().and_then(|item| item.token.clone());
            bundle
                .respondents
                .extend(page.items.into_iter().map(ResponseItem::into_respondent));

            if count < self.page_size {
                break;
            }
            match last_token {
                Some(token) if before.as_deref() != Some(token.as_str()) => before = Some(token),
                _ => {
                    return Err(IngestError::Fetch {
                        provider: self.settings.label.clone(),
                        message: "full page without a usable pagination token".to_string(),
                    })
                }
            }
        }

        info!(respondents = bundle.len(), pages = bundle.pages_fetched, "Fetched Typeform responses");
        IngestMetrics::record_fetch(
            &self.settings.label,
            bundle.len(),
            bundle.pages_fetched,
            started.elapsed().as_secs_f64(),
        );
        Ok(bundle)
    }
}
