//! Ingestion metrics
//!
//! Counters and histograms for fetch, merge and coercion. Recording is a
//! no-op until the embedding application installs a `metrics` recorder.

use metrics::{counter, histogram};

pub struct IngestMetrics;

impl IngestMetrics {
    /// Record a completed provider fetch
    pub fn record_fetch(provider: &str, respondents: usize, pages: usize, duration_secs: f64) {
        counter!("survey_respondents_fetched_total", "provider" => provider.to_string())
            .increment(respondents as u64);
        counter!("survey_pages_fetched_total", "provider" => provider.to_string()).increment(pages as u64);
        histogram!("survey_fetch_duration_seconds", "provider" => provider.to_string()).record(duration_secs);
    }

    pub fn record_merge(rows: usize) {
        counter!("survey_rows_merged_total").increment(rows as u64);
    }

    /// Values replaced by null during coercion
    pub fn record_coercion_nulls(field: &str, nulled: usize) {
        counter!("survey_coercion_nulls_total", "field" => field.to_string()).increment(nulled as u64);
    }

    pub fn record_run_failure(stage: &'static str) {
        counter!("survey_pipeline_failures_total", "stage" => stage).increment(1);
    }

    pub fn record_run_success(duration_secs: f64) {
        counter!("survey_pipeline_runs_total").increment(1);
        histogram!("survey_pipeline_duration_seconds").record(duration_secs);
    }
}
