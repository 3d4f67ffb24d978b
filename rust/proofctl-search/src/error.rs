use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SearchError {
    #[error("every pass failed to produce a compiling proof")]
    Exhausted,

    #[error("scheduler call failed: {0}")]
    Scheduler(String),

    #[error("proof analysis failed: {0}")]
    Analysis(String),
}

impl From<proofctl_core::TaskError> for SearchError {
    fn from(e: proofctl_core::TaskError) -> Self {
        SearchError::Scheduler(e.to_string())
    }
}

impl From<proofctl_analysis::AnalysisError> for SearchError {
    fn from(e: proofctl_analysis::AnalysisError) -> Self {
        SearchError::Analysis(e.to_string())
    }
}
