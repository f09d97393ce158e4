//! Emergency report and help-request orchestration core.
//!
//! Two pipelines live here: the report pipeline (parallel data collection,
//! validation gate, parallel AI analysis, final aggregation) and the
//! task-generation pipeline (disaster lookup, resource proximity, AI task
//! drafting with a retry/heuristic fallback chain).

pub mod audit_log;
pub mod config;
pub mod error;
pub mod geo;
pub mod object_store;
pub mod proximity;
pub mod report;
pub mod repository;
pub mod review;
pub mod services;
pub mod tasking;
pub mod types;

pub use audit_log::{AuditLog, LogEntry, LogLevel};
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use geo::Coordinates;
pub use report::{ReportPipeline, ReportRequest, ReportServices, ReportSummary};
pub use review::DisasterReview;
pub use tasking::{HelpRequest, HelpRequestOutcome, TaskPipeline, TaskStores};
