mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use serde_json::{json, Value};
use tempfile::tempdir;

use common::{RoutedHttp, MONKEY_BASE, TYPEFORM_BASE};
use survey_ingest::apis::create_providers;
use survey_ingest::config::Config;
use survey_ingest::infra::JsonFileSink;
use survey_ingest::{IngestError, Pipeline};

fn write_config(dir: &Path, monkey_mapping: &Value) -> Result<Config> {
    fs::write(
        dir.join("typeform_fields.json"),
        serde_json::to_string(&json!(["birth_year", "actions_taken_self"]))?,
    )?;
    fs::write(dir.join("monkey.json"), serde_json::to_string(monkey_mapping)?)?;
    let config = format!(
        r#"
        [pipeline]
        output = "out/survey.json"

        [[pipeline.coerce]]
        field = "birth_year"
        target = "number"

        [typeform]
        token = "tf"
        form_id = "FORM"
        fields = "typeform_fields.json"
        base_url = "{typeform}"

        [surveymonkey]
        access_token = "sm"
        form_id = "555"
        mapping = "monkey.json"
        base_url = "{monkey}"

        [surveymonkey.formats]
        birth_year = "text"
        actions_taken_self = "multi_choice"

        [[indicators]]
        name = "reduced_energy_home"
        field = "actions_taken_self"
        markers = ["Reduced your energy use at home", "home_energy"]
        "#,
        typeform = TYPEFORM_BASE,
        monkey = MONKEY_BASE
    );
    let path = dir.join("survey.toml");
    fs::write(&path, config)?;
    Ok(Config::load(&path)?)
}

fn monkey_mapping() -> Value {
    json!({
        "id_to_field": {"101": "birth_year", "102": "actions_taken_self"},
        "id_to_choice": {"9001": "home_energy", "9002": "wallet_vote"}
    })
}

#[tokio::test]
async fn test_config_driven_run_writes_merged_records() -> Result<()> {
    let dir = tempdir()?;
    let config = write_config(dir.path(), &monkey_mapping())?;

    let http = Arc::new(
        RoutedHttp::new()
            .with_pages(
                TYPEFORM_BASE,
                vec![(
                    200,
                    json!({"items": [{"token": "t1", "answers": [
                        {"field": {"id": "x1", "ref": "birth_year"}, "type": "number", "number": 1985},
                        {"field": {"id": "x2", "ref": "actions_taken_self"}, "type": "choices",
                         "choices": {"labels": ["Reduced your energy use at home"]}}
                    ]}]}),
                )],
            )
            .with_pages(
                MONKEY_BASE,
                vec![(
                    200,
                    json!({"data": [{"pages": [{"questions": [
                        {"id": "101", "answers": [{"text": "1990"}]},
                        {"id": "102", "answers": [{"choice_id": "9002"}]}
                    ]}]}]}),
                )],
            ),
    );

    let providers = create_providers(&config, http)?;
    let pipeline = Pipeline::new(providers, config.pipeline.coerce.clone());
    let sink = JsonFileSink::new(config.resolve_path(&config.pipeline.output))
        .with_indicators(config.indicators.clone());

    let result = pipeline.run(&sink).await?;
    assert_eq!(result.total_rows, 2);

    let written: Value = serde_json::from_slice(&fs::read(dir.path().join("out/survey.json"))?)?;
    assert_eq!(
        written,
        json!([
            {
                "birth_year": 1985.0,
                "actions_taken_self": ["Reduced your energy use at home"],
                "source": "typeform",
                "reduced_energy_home": true
            },
            {
                "birth_year": 1990.0,
                "actions_taken_self": ["wallet_vote"],
                "source": "monkey",
                "reduced_energy_home": false
            }
        ])
    );
    Ok(())
}

#[tokio::test]
async fn test_mismatched_mappings_fail_validation() -> Result<()> {
    let dir = tempdir()?;
    let config = write_config(
        dir.path(),
        &json!({"id_to_field": {"101": "birth_year", "103": "country"}, "id_to_choice": {}}),
    )?;

    let providers = create_providers(&config, Arc::new(RoutedHttp::new()))?;
    let pipeline = Pipeline::new(providers, config.pipeline.coerce.clone());

    match pipeline.validate() {
        Err(IngestError::SchemaMismatch { label, missing, extra }) => {
            assert_eq!(label, "monkey");
            assert_eq!(missing, vec!["actions_taken_self".to_string()]);
            assert_eq!(extra, vec!["country".to_string()]);
        }
        other => panic!("unexpected validation result: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_missing_mapping_file_is_config_error() -> Result<()> {
    let dir = tempdir()?;
    let config = write_config(dir.path(), &monkey_mapping())?;
    fs::remove_file(dir.path().join("monkey.json"))?;

    let result = create_providers(&config, Arc::new(RoutedHttp::new()));
    assert!(matches!(result, Err(IngestError::Config(_))));
    Ok(())
}

#[tokio::test]
async fn test_example_config_nulls_free_text_birth_year() -> Result<()> {
    let dir = tempdir()?;
    let mut config = Config::load(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("survey.example.toml"))?;
    if let Some(tf) = config.typeform.as_mut() {
        tf.token = Some("tf".to_string());
        tf.base_url = TYPEFORM_BASE.to_string();
    }
    if let Some(sm) = config.surveymonkey.as_mut() {
        sm.access_token = Some("sm".to_string());
        sm.base_url = MONKEY_BASE.to_string();
    }

    let http = Arc::new(
        RoutedHttp::new()
            .with_pages(
                TYPEFORM_BASE,
                vec![(
                    200,
                    json!({"items": [{"token": "t1", "answers": [
                        {"field": {"id": "x1", "ref": "birth_year"}, "type": "text", "text": "1985"}
                    ]}]}),
                )],
            )
            .with_pages(
                MONKEY_BASE,
                vec![(
                    200,
                    json!({"data": [{"pages": [{"questions": [
                        {"id": "500000001", "answers": [{"text": "not a year"}]}
                    ]}]}]}),
                )],
            ),
    );

    let pipeline = Pipeline::new(create_providers(&config, http)?, config.pipeline.coerce.clone());
    pipeline.validate()?;
    pipeline.validate_indicators(&config.indicators)?;
    let output = dir.path().join("survey.json");
    let sink = JsonFileSink::new(output.clone()).with_indicators(config.indicators.clone());

    let result = pipeline.run(&sink).await?;
    assert_eq!(result.total_rows, 2);
    assert_eq!(result.coercions[0].nulled, 1);

    let written: Value = serde_json::from_slice(&fs::read(output)?)?;
    assert_eq!(written[0]["birth_year"], json!(1985.0));
    assert_eq!(written[1]["birth_year"], Value::Null);
    assert_eq!(written[1]["source"], json!("monkey"));
    assert_eq!(written[1]["drive_less"], json!(false));
    Ok(())
}

#[test]
fn test_integer_format_on_coerced_field_fails_validation() -> Result<()> {
    let dir = tempdir()?;
    let mut config = write_config(dir.path(), &monkey_mapping())?;
    if let Some(sm) = config.surveymonkey.as_mut() {
        sm.formats.remove("birth_year");
    }

    let providers = create_providers(&config, Arc::new(RoutedHttp::new()))?;
    let pipeline = Pipeline::new(providers, config.pipeline.coerce.clone());

    match pipeline.validate() {
        Err(IngestError::Config(message)) => assert!(message.contains("birth_year"), "{}", message),
        other => panic!("unexpected validation result: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_indicator_on_unknown_field_fails_validation() -> Result<()> {
    let dir = tempdir()?;
    let mut config = write_config(dir.path(), &monkey_mapping())?;
    config.indicators[0].field = "actions_taken_others".to_string();

    let providers = create_providers(&config, Arc::new(RoutedHttp::new()))?;
    let pipeline = Pipeline::new(providers, config.pipeline.coerce.clone());

    pipeline.validate()?;
    assert!(matches!(
        pipeline.validate_indicators(&config.indicators),
        Err(IngestError::Config(_))
    ));
    Ok(())
}
