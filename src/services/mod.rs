pub mod key_result_dedup;
pub mod performance_service;
pub mod record_normalizer;
pub mod reporting_service;
pub mod row_source;
pub mod snapshot_cache;
pub mod team_taxonomy;
pub mod temporal_resolver;
pub mod value_interpreter;
