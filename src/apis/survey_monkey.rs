use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use reqwest::Url;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::apis::base::{fetch_json, ProviderSettings};
use crate::app::ports::HttpClientPort;
use crate::constants::SURVEY_MONKEY_MAX_PER_PAGE;
use crate::error::{IngestError, Result};
use crate::metrics::IngestMetrics;
use crate::pipeline::processing::format::AnswerFormatter;
use crate::registry::field_mapping::FieldMapping;
use crate::types::{RawAnswer, RawQuestionAnswer, RawRespondent, RawResponseBundle, Selection, SurveyProvider};

#[derive(Debug, Deserialize)]
struct BulkPage {
    #[serde(default)]
    data: Vec<SurveyResponse>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SurveyResponse {
    #[serde(default)]
    pages: Vec<ResponsePage>,
}

#[derive(Debug, Deserialize)]
struct ResponsePage {
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    id: String,
    #[serde(default)]
    answers: Vec<QuestionAnswer>,
}

/// One answer row: a picked choice, typed text, or an "other" write-in
#[derive(Debug, Deserialize)]
struct QuestionAnswer {
    choice_id: Option<String>,
    text: Option<String>,
}

impl SurveyResponse {
    fn into_respondent(self) -> RawRespondent {
        let answers = self
            .pages
            .into_iter()
            .flat_map(|page| page.questions)
            .map(|question| RawQuestionAnswer {
                question_id: question.id,
                answer: RawAnswer::Selections(
                    question
                        .answers
                        .into_iter()
                        .map(|a| Selection {
                            choice_id: a.choice_id,
                            text: a.text,
                        })
                        .collect(),
                ),
            })
            .collect();
        RawRespondent { answers }
    }
}

/// Adapter for the SurveyMonkey v3 bulk responses API
pub struct SurveyMonkeyAdapter {
    settings: ProviderSettings,
    per_page: usize,
    http: Arc<dyn HttpClientPort>,
}

impl SurveyMonkeyAdapter {
    pub fn new(settings: ProviderSettings, per_page: usize, http: Arc<dyn HttpClientPort>) -> Self {
        Self {
            settings,
            per_page: per_page.clamp(1, SURVEY_MONKEY_MAX_PER_PAGE),
            http,
        }
    }

    fn first_page_url(&self) -> Result<String> {
        let base = format!(
            "{}/v3/surveys/{}/responses/bulk",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.form_id
        );
        Url::parse_with_params(&base, &[("per_page", self.per_page.to_string()), ("page", "1".to_string())])
            .map(|url| url.to_string())
            .map_err(|e| IngestError::Config(format!("invalid SurveyMonkey URL '{}': {}", base, e)))
    }
}

#[async_trait::async_trait]
impl SurveyProvider for SurveyMonkeyAdapter {
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
        let mut url = self.first_page_url()?;
        let mut visited = BTreeSet::new();

        loop {
            visited.insert(url.clone());
            let page: BulkPage = fetch_json(&self.http, &self.settings.label, &url, &self.settings.token).await?;
            bundle.pages_fetched += 1;

            let empty = page.data.is_empty();
            bundle
                .respondents
                .extend(page.data.into_iter().map(SurveyResponse::into_respondent));

            match page.links.next {
                Some(next) if visited.contains(&next) => {
                    return Err(IngestError::Fetch {
                        provider: self.settings.label.clone(),
                        message: format!("pagination loops back to {}", next),
                    })
                }
                Some(next) if !empty => url = next,
                _ => break,
            }
        }

        info!(respondents = bundle.len(), pages = bundle.pages_fetched, "Fetched SurveyMonkey responses");
        IngestMetrics::record_fetch(
            &self.settings.label,
            bundle.len(),
            bundle.pages_fetched,
            started.elapsed().as_secs_f64(),
        );
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::test_support::ScriptedHttp;
    use crate::pipeline::processing::format::FieldFormat;
    use crate::registry::field_mapping::ChoiceTable;
    use crate::types::CellValue;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn adapter(http: Arc<ScriptedHttp>) -> SurveyMonkeyAdapter {
        let mapping: BTreeMap<String, String> = [("101", "birth_year"), ("102", "actions_taken_self")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let choices: BTreeMap<String, String> = [("9001", "home_energy"), ("9002", "wallet_vote")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let settings = ProviderSettings {
            label: "monkey".to_string(),
            token: "sm-token".to_string(),
            form_id: "555".to_string(),
            base_url: "https://api.surveymonkey.test".to_string(),
            mapping: FieldMapping::new(mapping).unwrap(),
            formatter: AnswerFormatter::new(FieldFormat::Integer)
                .with_override("actions_taken_self", FieldFormat::MultiChoice)
                .with_choices(ChoiceTable::new(choices)),
        };
        SurveyMonkeyAdapter::new(settings, 100, http)
    }

    fn response(questions: serde_json::Value) -> serde_json::Value {
        json!({"id": "r", "pages": [{"id": "p1", "questions": questions}]})
    }

    #[tokio::test]
    async fn test_fetch_follows_next_links() {
        let http = Arc::new(ScriptedHttp::new(vec![
            (
                200,
                json!({
                    "data": [response(json!([]))],
                    "links": {"next": "https://api.surveymonkey.test/v3/surveys/555/responses/bulk?page=2&per_page=100"}
                }),
            ),
            (200, json!({"data": [response(json!([])), response(json!([]))], "links": {}})),
        ]));
        let bundle = adapter(http.clone()).fetch().await.unwrap();

        assert_eq!(bundle.len(), 3);
        assert_eq!(bundle.pages_fetched, 2);
        assert_eq!(
            http.requested_urls()[0],
            "https://api.surveymonkey.test/v3/surveys/555/responses/bulk?per_page=100&page=1"
        );
    }

    #[tokio::test]
    async fn test_extracts_integer_and_multi_choice_fields_across_pages() {
        let http = Arc::new(ScriptedHttp::new(vec![(
            200,
            json!({"data": [
                {"pages": [
                    {"questions": [{"id": "101", "answers": [{"text": "1972"}]}]},
                    {"questions": [{"id": "102", "answers": [{"choice_id": "9002"}, {"choice_id": "9001"}]}]}
                ]},
                {"pages": [{"questions": []}]}
            ]}),
        )]));
        let adapter = adapter(http);
        let table = adapter.extract(&adapter.fetch().await.unwrap()).unwrap();

        assert_eq!(table.column("birth_year").unwrap(), &[CellValue::Integer(1972), CellValue::Null]);
        assert_eq!(
            table.column("actions_taken_self").unwrap(),
            &[
                CellValue::Labels(vec!["wallet_vote".to_string(), "home_energy".to_string()]),
                CellValue::Null
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_choice_id_is_format_error() {
        let http = Arc::new(ScriptedHttp::new(vec![(
            200,
            json!({"data": [response(json!([{"id": "102", "answers": [{"choice_id": "nope"}]}]))]}),
        )]));
        let adapter = adapter(http);
        let err = adapter.extract(&adapter.fetch().await.unwrap()).unwrap_err();
        match err {
            IngestError::Format { provider, field, respondent, reason } => {
                assert_eq!(provider, "monkey");
                assert_eq!(field, "actions_taken_self");
                assert_eq!(respondent, 0);
                assert!(reason.contains("nope"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_next_link_back_to_earlier_page_is_fetch_error() {
        let page_two = "https://api.surveymonkey.test/v3/surveys/555/responses/bulk?page=2&per_page=100";
        let page_three = "https://api.surveymonkey.test/v3/surveys/555/responses/bulk?page=3&per_page=100";
        let http = Arc::new(ScriptedHttp::new(vec![
            (200, json!({"data": [response(json!([]))], "links": {"next": page_two}})),
            (200, json!({"data": [response(json!([]))], "links": {"next": page_three}})),
            (200, json!({"data": [response(json!([]))], "links": {"next": page_two}})),
        ]));

        let err = adapter(http.clone()).fetch().await.unwrap_err();

        match err {
            IngestError::Fetch { provider, message } => {
                assert_eq!(provider, "monkey");
                assert!(message.contains("page=2"), "{}", message);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(http.requested_urls().len(), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_is_fetch_error() {
        let http = Arc::new(ScriptedHttp::new(vec![(401, json!({"error": {"message": "bad token"}}))]));
        assert!(matches!(adapter(http).fetch().await, Err(IngestError::Fetch { .. })));
    }
}
