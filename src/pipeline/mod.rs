pub mod processing;

use std::collections::BTreeSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::app::ports::TableSinkPort;
use crate::error::{IngestError, Result};
use crate::metrics::IngestMetrics;
use crate::pipeline::processing::coerce::{coerce, CoercionReport, CoercionRule};
use crate::pipeline::processing::indicators::IndicatorRule;
use crate::pipeline::processing::merge::merge;
use crate::table::MergedTable;
use crate::types::SurveyProvider;

/// Per-provider counts for one run
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub label: String,
    pub respondents: usize,
    pub pages: usize,
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<SourceSummary>,
    pub total_rows: usize,
    pub coercions: Vec<CoercionReport>,
}

/// fetch -> extract (per provider) -> merge -> coerce -> sink
pub struct Pipeline {
    providers: Vec<Box<dyn SurveyProvider>>,
    coercions: Vec<CoercionRule>,
}

impl Pipeline {
    pub fn new(providers: Vec<Box<dyn SurveyProvider>>, coercions: Vec<CoercionRule>) -> Self {
        Self { providers, coercions }
    }

    pub fn providers(&self) -> impl Iterator<Item = &dyn SurveyProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    /// Checks that need no network: unique labels, one shared canonical
    /// schema across all mappings, and coercion targets inside that schema.
    pub fn validate(&self) -> Result<()> {
        let Some(first) = self.providers.first() else {
            return Err(IngestError::Config("no survey provider configured".to_string()));
        };

        let mut labels = BTreeSet::new();
        for provider in &self.providers {
            if !labels.insert(provider.label()) {
                return Err(IngestError::Config(format!(
                    "provider label '{}' is used twice",
                    provider.label()
                )));
            }
        }

        let schema = first.field_mapping().canonical_fields();
        for provider in self.providers.iter().skip(1) {
            let fields = provider.field_mapping().canonical_fields();
            if fields != schema {
                return Err(IngestError::SchemaMismatch {
                    label: provider.label().to_string(),
                    missing: schema.difference(&fields).cloned().collect(),
                    extra: fields.difference(&schema).cloned().collect(),
                });
            }
        }

        for rule in &self.coercions {
            if !schema.contains(&rule.field) {
                return Err(IngestError::Config(format!(
                    "coercion field '{}' is not a canonical field",
                    rule.field
                )));
            }
            // coercion nulls junk, but a strict format would abort extraction first
            for provider in &self.providers {
                let format = provider.formatter().format_for(&rule.field);
                if format.parses_scalar() {
                    return Err(IngestError::Config(format!(
                        "{}: coerced field '{}' is formatted as {:?}; use text or native",
                        provider.label(),
                        rule.field,
                        format
                    )));
                }
            }
        }

        for provider in &self.providers {
            if let Some(field) = provider
                .formatter()
                .overridden_fields()
                .find(|field| !schema.contains(*field))
            {
                return Err(IngestError::Config(format!(
                    "{}: format override for unknown field '{}'",
                    provider.label(),
                    field
                )));
            }
        }
        Ok(())
    }

    /// Indicator rules must read a canonical field
    pub fn validate_indicators(&self, rules: &[IndicatorRule]) -> Result<()> {
        let schema = self
            .providers
            .first()
            .map(|p| p.field_mapping().canonical_fields())
            .unwrap_or_default();
        match rules.iter().find(|rule| !schema.contains(&rule.field)) {
            Some(rule) => Err(IngestError::Config(format!(
                "indicator '{}' reads unknown field '{}'",
                rule.name, rule.field
            ))),
            None => Ok(()),
        }
    }

    /// Fetch, extract, merge and coerce. Nothing is kept from a failed run.
    pub async fn build_table(&self) -> Result<(MergedTable, Vec<SourceSummary>, Vec<CoercionReport>)> {
        self.validate()?;

        let mut tables = Vec::with_capacity(self.providers.len());
        let mut sources = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            let label = provider.label().to_string();
            let span = info_span!("provider", provider = %label);

            let bundle = provider.fetch().instrument(span.clone()).await?;
            let table = span.in_scope(|| provider.extract(&bundle))?;
            info!(provider = %label, respondents = table.respondents(), "Extracted answer table");

            sources.push(SourceSummary {
                label: label.clone(),
                respondents: table.respondents(),
                pages: bundle.pages_fetched,
            });
            tables.push((label, table));
        }

        let mut merged = merge(tables)?;
        IngestMetrics::record_merge(merged.rows());

        let reports: Vec<CoercionReport> = self
            .coercions
            .iter()
            .map(|rule| {
                let report = coerce(&mut merged, &rule.field, rule.target);
                IngestMetrics::record_coercion_nulls(&report.field, report.nulled);
                report
            })
            .collect();

        Ok((merged, sources, reports))
    }

    /// Run end to end and hand the finished table to `sink`. The sink is
    /// never called if any earlier stage fails.
    pub async fn run(&self, sink: &dyn TableSinkPort) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();
        info!(%run_id, providers = self.providers.len(), "🚀 Starting survey pipeline");

        let outcome = async {
            let (table, sources, coercions) = self.build_table().await?;
            sink.write_table(&table).await?;
            Ok::<_, IngestError>((table.rows(), sources, coercions))
        }
        .instrument(info_span!("pipeline", %run_id))
        .await;

        match outcome {
            Ok((total_rows, sources, coercions)) => {
                IngestMetrics::record_run_success(timer.elapsed().as_secs_f64());
                info!(%run_id, total_rows, "✅ Survey pipeline finished");
                Ok(PipelineResult {
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                    sources,
                    total_rows,
                    coercions,
                })
            }
            Err(e) => {
                IngestMetrics::record_run_failure(e.stage());
                error!(%run_id, stage = e.stage(), "Survey pipeline failed: {}", e);
                Err(e)
            }
        }
    }
}
