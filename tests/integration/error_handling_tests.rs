// Error handling and edge case tests

use std::fs;

use franchise_metrics::error::AppError;
use franchise_metrics::models::settings::ReportingConfig;
use franchise_metrics::services::reporting_service::ReportingService;
use franchise_metrics::services::row_source::{JsonFileRowSource, StaticRowSource};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn test_missing_source_without_store_propagates() {
    let dir = tempdir().expect("temp dir");
    let service = ReportingService::new(
        &ReportingConfig::default(),
        Box::new(JsonFileRowSource::new(
            dir.path().join("kpi.json"),
            dir.path().join("okr.json"),
        )),
    )
    .expect("service");

    let error = service.snapshot().unwrap_err();
    assert!(error.is_source_unavailable());
    assert!(error.to_string().contains("json-file"));
}

#[test]
fn test_malformed_source_file_is_serialization_error() {
    let dir = tempdir().expect("temp dir");
    let kpi_path = dir.path().join("kpi.json");
    let kr_path = dir.path().join("okr.json");
    fs::write(&kpi_path, "{ not json").unwrap();
    fs::write(&kr_path, "[]").unwrap();

    let service = ReportingService::new(
        &ReportingConfig::default(),
        Box::new(JsonFileRowSource::new(&kpi_path, &kr_path)),
    )
    .expect("service");

    assert!(matches!(service.refresh(), Err(AppError::Serialization(_))));
}

#[test]
fn test_invalid_period_labels() {
    let service = ReportingService::new(
        &ReportingConfig::default(),
        Box::new(StaticRowSource::default()),
    )
    .expect("service");

    for label in ["", "13/2024", "2024", "maio/2024"] {
        match service.team_performance(label) {
            Err(AppError::Validation { details, .. }) => {
                assert_eq!(details.expect("details")["period"], json!(label));
            }
            other => panic!("expected validation error for {label:?}, got {other:?}"),
        }
    }
    assert!(service.team_indicators("Vendas", "00/2024").is_err());
}

#[test]
fn test_empty_source_yields_empty_results() {
    let service = ReportingService::new(
        &ReportingConfig::default(),
        Box::new(StaticRowSource::default()),
    )
    .expect("service");

    assert!(service.snapshot().expect("snapshot").is_empty());
    assert!(service.available_periods().expect("periods").is_empty());
    assert!(service.team_performance("01/2024").expect("performance").is_empty());
    assert!(service.team_indicators("Vendas", "01/2024").expect("indicators").is_empty());
    assert!(service.annual_aggregate("Receita").expect("aggregate").is_empty());
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let blank_header = ReportingConfig::from_yaml_str(
        r#"
kpi_columns:
  team: "  "
"#,
    );
    match blank_header {
        Err(AppError::Validation { details, .. }) => {
            assert_eq!(details.expect("details")["fields"], json!(["team"]));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    assert!(matches!(
        ReportingConfig::from_yaml_str("snapshot_ttl_seconds: 0"),
        Err(AppError::Config { .. })
    ));
    assert!(matches!(
        ReportingConfig::from_yaml_str("allowed_organizations: []"),
        Err(AppError::Config { .. })
    ));
    assert!(matches!(
        ReportingConfig::from_yaml_str("team_mapping: [1, 2]"),
        Err(AppError::Yaml(_))
    ));

    let dir = tempdir().expect("temp dir");
    assert!(matches!(
        ReportingConfig::load(&dir.path().join("missing.yaml")),
        Err(AppError::Io(_))
    ));
}

#[test]
fn test_out_of_range_retention_never_reaches_refresh() {
    let dir = tempdir().expect("temp dir");
    let config_path = dir.path().join("reporting.yaml");
    fs::write(&config_path, "snapshot_retention_days: 100000000\n").unwrap();
    assert!(matches!(
        ReportingConfig::load(&config_path),
        Err(AppError::Config { .. })
    ));

    let config = ReportingConfig {
        snapshot_retention_days: 100_000_000,
        ..ReportingConfig::default()
    };
    let pool = franchise_metrics::db::DbPool::new(dir.path().join("store.sqlite")).expect("db pool");
    let built = ReportingService::new(&config, Box::new(StaticRowSource::default()))
        .map(|service| service.with_store(pool));
    assert!(matches!(built, Err(AppError::Config { .. })));
}
