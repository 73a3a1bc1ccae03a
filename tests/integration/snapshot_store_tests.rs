// Snapshot persistence, migrations and store fallback

use std::fs;

use chrono::{Duration, Utc};
use franchise_metrics::db::repositories::snapshot_repository::SnapshotRepository;
use franchise_metrics::db::{migrations, DbPool};
use franchise_metrics::models::settings::ReportingConfig;
use franchise_metrics::models::snapshot::{RawTable, SnapshotKind};
use franchise_metrics::services::reporting_service::ReportingService;
use franchise_metrics::services::row_source::{JsonFileRowSource, StaticRowSource};
use serde_json::json;
use tempfile::tempdir;

fn kpi_rows() -> RawTable {
    vec![
        vec![
            json!("Período"),
            json!("Organização"),
            json!("Equipe"),
            json!("Indicador"),
            json!("Atingimento"),
            json!("Status"),
            json!("Data"),
        ],
        vec![
            json!("06/2024"),
            json!("Franquias"),
            json!("Expansão"),
            json!("Aberturas"),
            json!("75%"),
            json!("Finalizado"),
            json!("2024"),
        ],
    ]
}

fn key_result_rows() -> RawTable {
    vec![
        vec![json!("Data"), json!("Equipe"), json!("Chave"), json!("Atingimento")],
        vec![json!("2024-06-03"), json!("Expansão"), json!("KR-1"), json!("65%")],
    ]
}

#[test]
fn test_schema_migrated_with_columns_and_indexes() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("store.sqlite")).expect("db pool");

    pool.with_connection(|conn| {
        let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        assert_eq!(version, migrations::latest_version());

        let history = migrations::get_migration_history(conn)?;
        let versions: Vec<i32> = history.iter().map(|info| info.version).collect();
        assert_eq!(versions, vec![1]);

        let mut stmt = conn.prepare("PRAGMA table_info(raw_snapshots)")?;
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        assert!(columns.contains(&"source_name".to_string()));
        assert!(columns.contains(&"rows_json".to_string()));

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'raw_snapshots'")?
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        assert!(indexes.contains(&"idx_raw_snapshots_kind_fingerprint".to_string()));
        Ok(())
    })
    .expect("schema verification");

    // Reopening must not re-run or duplicate migrations.
    let reopened = DbPool::new(pool.path().to_path_buf()).expect("reopen");
    let history = reopened
        .with_connection(|conn| migrations::get_migration_history(conn))
        .expect("history");
    assert_eq!(history.len(), 1);
}

#[test]
fn test_fresh_fetches_are_persisted_once_per_content() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("store.sqlite")).expect("db pool");
    let service = ReportingService::new(
        &ReportingConfig::default(),
        Box::new(StaticRowSource::new(kpi_rows(), key_result_rows())),
    )
    .expect("service")
    .with_store(pool.clone());

    service.refresh().expect("first refresh");
    service.refresh().expect("second refresh");

    pool.with_connection(|conn| {
        assert_eq!(SnapshotRepository::count(conn, SnapshotKind::Kpi)?, 1);
        assert_eq!(SnapshotRepository::count(conn, SnapshotKind::KeyResult)?, 1);
        let stored = SnapshotRepository::latest(conn, SnapshotKind::Kpi)?.expect("stored kpi");
        assert_eq!(stored.rows, kpi_rows());
        assert_eq!(stored.source_name.as_deref(), Some("static"));
        Ok(())
    })
    .expect("stored snapshots");
}

#[test]
fn test_falls_back_to_stored_snapshot_when_source_fails() {
    let dir = tempdir().expect("temp dir");
    let kpi_path = dir.path().join("kpi.json");
    let kr_path = dir.path().join("okr.json");
    fs::write(&kpi_path, serde_json::to_string(&kpi_rows()).unwrap()).unwrap();
    fs::write(&kr_path, serde_json::to_string(&key_result_rows()).unwrap()).unwrap();

    let pool = DbPool::new(dir.path().join("store.sqlite")).expect("db pool");
    let service = ReportingService::new(
        &ReportingConfig::default(),
        Box::new(JsonFileRowSource::new(&kpi_path, &kr_path)),
    )
    .expect("service")
    .with_store(pool);

    let online = service.team_performance("06/2024").expect("online");
    assert!((online[0].mean_overall_attainment - 0.7).abs() < 1e-9);

    fs::remove_file(&kpi_path).unwrap();
    service.invalidate();

    let offline = service.team_performance("06/2024").expect("served from store");
    assert_eq!(online, offline);
}

#[test]
fn test_old_snapshots_are_pruned_on_refresh() {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("store.sqlite")).expect("db pool");
    let stale = Utc::now() - Duration::days(90);
    pool.with_connection(|conn| {
        SnapshotRepository::insert(conn, SnapshotKind::Kpi, "legacy", "old", &Vec::new(), stale)?;
        Ok(())
    })
    .expect("seed");

    let service = ReportingService::new(
        &ReportingConfig::default(),
        Box::new(StaticRowSource::new(kpi_rows(), key_result_rows())),
    )
    .expect("service")
    .with_store(pool.clone());
    service.refresh().expect("refresh");

    pool.with_connection(|conn| {
        assert_eq!(SnapshotRepository::count(conn, SnapshotKind::Kpi)?, 1);
        let latest = SnapshotRepository::latest(conn, SnapshotKind::Kpi)?.expect("latest");
        assert_ne!(latest.fingerprint, "old");
        Ok(())
    })
    .expect("pruned");
}
