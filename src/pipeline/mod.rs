//! Request orchestration: one linear pass from source to stored result.

mod service;
pub mod types;

pub use service::{AnalysisApi, AnalysisService};
pub use types::{AnalysisInput, AnalysisReport, PipelineError, StartupError};
