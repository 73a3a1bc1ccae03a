use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::db::repositories::snapshot_repository::SnapshotRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::performance::{AnnualAggregate, IndicatorResolution, TeamPerformanceSummary};
use crate::models::period::Period;
use crate::models::settings::ReportingConfig;
use crate::models::snapshot::{NormalizedSnapshot, RawTable, SnapshotKind};
use crate::services::performance_service::{compute_annual_aggregate, PerformanceService};
use crate::services::record_normalizer::RecordNormalizer;
use crate::services::row_source::RowSource;
use crate::services::snapshot_cache::{fingerprint_tables, CachedSnapshot, ResultCache, SnapshotCache};

/// Fetches, normalizes and caches sheet snapshots and answers reporting queries.
pub struct ReportingService {
    normalizer: RecordNormalizer,
    performance: PerformanceService,
    source: Box<dyn RowSource>,
    store: Option<DbPool>,
    snapshots: SnapshotCache,
    results: ResultCache,
    retention: Duration,
}

impl ReportingService {
    pub fn new(config: &ReportingConfig, source: Box<dyn RowSource>) -> AppResult<Self> {
        config.validate()?;
        let ttl = Duration::try_seconds(config.snapshot_ttl_seconds)
            .ok_or_else(|| AppError::config("snapshot_ttl_seconds is out of range"))?;
        let retention = Duration::try_days(config.snapshot_retention_days)
            .ok_or_else(|| AppError::config("snapshot_retention_days is out of range"))?;
        Ok(Self {
            normalizer: RecordNormalizer::new(config),
            performance: PerformanceService::from_config(config),
            source,
            store: None,
            snapshots: SnapshotCache::new(ttl),
            results: ResultCache::new(config.result_cache_capacity),
            retention,
        })
    }

    /// Persists every fresh fetch and serves the last stored one when the source fails.
    pub fn with_store(mut self, pool: DbPool) -> Self {
        self.store = Some(pool);
        self
    }

    /// Cached snapshot while it is fresh, otherwise a new fetch.
    pub fn snapshot(&self) -> AppResult<Arc<NormalizedSnapshot>> {
        Ok(self.current()?.snapshot)
    }

    /// Fetches both tables from the source, bypassing the snapshot TTL.
    pub fn refresh(&self) -> AppResult<Arc<NormalizedSnapshot>> {
        Ok(self.reload()?.snapshot)
    }

    pub fn invalidate(&self) {
        self.snapshots.clear();
        self.results.clear();
        info!(target: "app::reporting", "reporting caches invalidated");
    }

    pub fn available_periods(&self) -> AppResult<Vec<Period>> {
        Ok(self.current()?.snapshot.available_periods.clone())
    }

    pub fn team_performance(&self, period_label: &str) -> AppResult<Vec<TeamPerformanceSummary>> {
        let period = parse_period(period_label)?;
        let current = self.current()?;

        if let Some(cached) = self.results.get(&current.fingerprint, period) {
            debug!(target: "app::reporting", period = %period, "team performance served from cache");
            return Ok(cached);
        }

        let summaries = self.performance.compute_team_performance(
            &current.snapshot.kpi_records,
            &current.snapshot.key_result_records,
            period,
        );
        self.results
            .insert(&current.fingerprint, period, summaries.clone());
        Ok(summaries)
    }

    pub fn team_indicators(
        &self,
        team: &str,
        period_label: &str,
    ) -> AppResult<Vec<IndicatorResolution>> {
        let period = parse_period(period_label)?;
        let current = self.current()?;
        Ok(self
            .performance
            .team_indicators(&current.snapshot.kpi_records, team, period))
    }

    pub fn annual_aggregate(&self, indicator_name: &str) -> AppResult<BTreeMap<i32, AnnualAggregate>> {
        let current = self.current()?;
        Ok(compute_annual_aggregate(
            &current.snapshot.kpi_records,
            indicator_name,
        ))
    }

    fn current(&self) -> AppResult<CachedSnapshot> {
        match self.snapshots.get() {
            Some(entry) => Ok(entry),
            None => self.reload(),
        }
    }

    fn reload(&self) -> AppResult<CachedSnapshot> {
        let (kpi_rows, key_result_rows) = match self.fetch() {
            Ok(tables) => {
                self.persist(&tables.0, &tables.1);
                tables
            }
            Err(error) => self.stored_tables().ok_or(error)?,
        };

        let fingerprint = fingerprint_tables(&[&kpi_rows, &key_result_rows]);
        let snapshot = self.normalizer.normalize(&kpi_rows, &key_result_rows);
        info!(
            target: "app::reporting",
            source = self.source.name(),
            fingerprint = %fingerprint,
            kpi_records = snapshot.kpi_records.len(),
            key_result_records = snapshot.key_result_records.len(),
            "snapshot refreshed"
        );
        Ok(self.snapshots.insert(fingerprint, snapshot))
    }

    fn fetch(&self) -> AppResult<(RawTable, RawTable)> {
        let kpi_rows = self.source.fetch_kpi_rows()?;
        let key_result_rows = self.source.fetch_key_result_rows()?;
        Ok((kpi_rows, key_result_rows))
    }

    /// Store failures are logged and never fail the refresh.
    fn persist(&self, kpi_rows: &RawTable, key_result_rows: &RawTable) {
        let Some(pool) = &self.store else {
            return;
        };
        let now = Utc::now();
        let result = pool.with_connection(|conn| {
            for (kind, rows) in [
                (SnapshotKind::Kpi, kpi_rows),
                (SnapshotKind::KeyResult, key_result_rows),
            ] {
                let fingerprint = fingerprint_tables(&[rows]);
                if SnapshotRepository::latest_fingerprint(conn, kind)?.as_deref()
                    == Some(fingerprint.as_str())
                {
                    continue;
                }
                SnapshotRepository::insert(conn, kind, self.source.name(), &fingerprint, rows, now)?;
            }
            match retention_cutoff(now, self.retention) {
                Some(cutoff) => SnapshotRepository::prune_before(conn, cutoff),
                None => {
                    warn!(target: "app::reporting", "retention window exceeds the calendar; pruning skipped");
                    Ok(0)
                }
            }
        });

        if let Err(error) = result {
            warn!(target: "app::reporting", error = %error, "failed to persist raw snapshot");
        }
    }

    fn stored_tables(&self) -> Option<(RawTable, RawTable)> {
        let pool = self.store.as_ref()?;
        let loaded = pool.with_connection(|conn| {
            let kpi = SnapshotRepository::latest(conn, SnapshotKind::Kpi)?;
            let key_results = SnapshotRepository::latest(conn, SnapshotKind::KeyResult)?;
            Ok((kpi, key_results))
        });

        match loaded {
            Ok((None, None)) => None,
            Ok((kpi, key_results)) => {
                warn!(
                    target: "app::reporting",
                    source = self.source.name(),
                    kpi_fetched_at = ?kpi.as_ref().map(|stored| stored.fetched_at),
                    key_result_fetched_at = ?key_results.as_ref().map(|stored| stored.fetched_at),
                    "row source failed; serving stored snapshot"
                );
                Some((
                    kpi.map(|stored| stored.rows).unwrap_or_default(),
                    key_results.map(|stored| stored.rows).unwrap_or_default(),
                ))
            }
            Err(error) => {
                warn!(target: "app::reporting", error = %error, "failed to load stored snapshot");
                None
            }
        }
    }
}

fn parse_period(label: &str) -> AppResult<Period> {
    Period::parse(label).ok_or_else(|| {
        AppError::validation_with_details(
            format!("invalid reporting period: {label}"),
            serde_json::json!({ "period": label, "expected": ["MM/YYYY", "YYYY-MM"] }),
        )
    })
}

fn retention_cutoff(now: DateTime<Utc>, retention: Duration) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(retention)
}
