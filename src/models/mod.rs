pub mod key_result;
pub mod kpi;
pub mod performance;
pub mod period;
pub mod settings;
pub mod snapshot;
