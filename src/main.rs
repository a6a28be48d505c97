use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use survey_ingest::apis::create_providers;
use survey_ingest::app::ports::HttpClientPort;
use survey_ingest::config::Config;
use survey_ingest::constants::DEFAULT_CONFIG_PATH;
use survey_ingest::infra::{JsonFileSink, ReqwestHttp};
use survey_ingest::logging;
use survey_ingest::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "survey_ingest")]
#[command(about = "Merge Typeform and SurveyMonkey responses into one table")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, merge and coerce all configured surveys, then write the table
    Run {
        /// Path to the TOML config file
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Override the output file from the config
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate the config and field mappings without fetching anything
    Check {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
}

fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new());
    let providers = create_providers(config, http)?;
    let pipeline = Pipeline::new(providers, config.pipeline.coerce.clone());
    pipeline.validate()?;
    pipeline.validate_indicators(&config.indicators)?;
    Ok(pipeline)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _guard = logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            let config = Config::load(&config)
                .with_context(|| format!("loading config from {}", config.display()))?;
            let pipeline = build_pipeline(&config)?;
            let output = output.unwrap_or_else(|| config.resolve_path(&config.pipeline.output));
            let sink = JsonFileSink::new(output).with_indicators(config.indicators.clone());

            println!("🚀 Running survey pipeline...");
            match pipeline.run(&sink).await {
                Ok(result) => {
                    println!("\n📊 Pipeline Results (run {}):", result.run_id);
                    for source in &result.sources {
                        println!(
                            "   {}: {} respondents ({} pages)",
                            source.label, source.respondents, source.pages
                        );
                    }
                    println!("   Total rows: {}", result.total_rows);
                    for report in &result.coercions {
                        println!(
                            "   Coerced {}: {} converted, {} replaced with null",
                            report.field, report.converted, report.nulled
                        );
                    }
                    println!("   Output file: {}", sink.path().display());
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        Commands::Check { config } => {
            let config = Config::load(&config)
                .with_context(|| format!("loading config from {}", config.display()))?;
            let pipeline = build_pipeline(&config)?;
            for provider in pipeline.providers() {
                info!(provider = provider.label(), "Configuration valid");
                println!(
                    "✅ {}: {} mapped questions",
                    provider.label(),
                    provider.field_mapping().len()
                );
            }
        }
    }
    Ok(())
}
