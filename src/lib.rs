pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use error::{AppError, AppResult};
pub use models::performance::{AnnualAggregate, IndicatorResolution, TeamPerformanceSummary};
pub use models::period::Period;
pub use models::settings::ReportingConfig;
pub use models::snapshot::NormalizedSnapshot;
pub use services::reporting_service::ReportingService;
pub use services::row_source::{JsonFileRowSource, RowSource, StaticRowSource};
