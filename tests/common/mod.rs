#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use survey_ingest::apis::{ProviderSettings, SurveyMonkeyAdapter, TypeformAdapter};
use survey_ingest::app::ports::{HttpClientPort, HttpGetResult};
use survey_ingest::pipeline::processing::format::{AnswerFormatter, FieldFormat};
use survey_ingest::registry::field_mapping::FieldMapping;

pub const TYPEFORM_BASE: &str = "https://typeform.test";
pub const MONKEY_BASE: &str = "https://monkey.test";

/// Serves scripted pages per base URL and counts requests
#[derive(Default)]
pub struct RoutedHttp {
    routes: Mutex<BTreeMap<String, VecDeque<(u16, Value)>>>,
    requests: Mutex<Vec<String>>,
}

impl RoutedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(self, base: &str, pages: Vec<(u16, Value)>) -> Self {
        self.routes.lock().unwrap().insert(base.to_string(), pages.into());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpClientPort for RoutedHttp {
    async fn get(&self, url: &str, _bearer_token: &str) -> Result<HttpGetResult, String> {
        self.requests.lock().unwrap().push(url.to_string());
        let mut routes = self.routes.lock().unwrap();
        let (status, body) = routes
            .iter_mut()
            .find(|(base, _)| url.starts_with(base.as_str()))
            .and_then(|(_, pages)| pages.pop_front())
            .ok_or_else(|| format!("connection refused: {}", url))?;
        Ok(HttpGetResult {
            status,
            bytes: serde_json::to_vec(&body).map_err(|e| e.to_string())?,
            content_type: "application/json".to_string(),
        })
    }
}

pub fn typeform(http: Arc<RoutedHttp>, fields: &[&str]) -> TypeformAdapter {
    let settings = ProviderSettings {
        label: "providerA".to_string(),
        token: "tf".to_string(),
        form_id: "FORM".to_string(),
        base_url: TYPEFORM_BASE.to_string(),
        mapping: FieldMapping::identity(fields.iter().copied()).unwrap(),
        formatter: AnswerFormatter::new(FieldFormat::Native),
    };
    TypeformAdapter::new(settings, 1000, http)
}

/// SurveyMonkey adapter whose question ids are `q_<field>`
pub fn monkey(http: Arc<RoutedHttp>, fields: &[&str], formatter: AnswerFormatter) -> SurveyMonkeyAdapter {
    let mapping = fields
        .iter()
        .map(|f| (format!("q_{}", f), f.to_string()))
        .collect();
    let settings = ProviderSettings {
        label: "providerB".to_string(),
        token: "sm".to_string(),
        form_id: "555".to_string(),
        base_url: MONKEY_BASE.to_string(),
        mapping: FieldMapping::new(mapping).unwrap(),
        formatter,
    };
    SurveyMonkeyAdapter::new(settings, 100, http)
}

pub fn typeform_text(field: &str, text: &str) -> Value {
    serde_json::json!({"field": {"id": format!("id_{}", field), "ref": field}, "type": "text", "text": text})
}

pub fn monkey_text(field: &str, text: &str) -> Value {
    serde_json::json!({"id": format!("q_{}", field), "answers": [{"text": text}]})
}
