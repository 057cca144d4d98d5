use thiserror::Error;

use crate::analysis::schema::Role;

// ---------------------------------------------------------------------------
// Analysis errors
// ---------------------------------------------------------------------------

/// Failures of the analysis core. All of them stem from the shape of the
/// data or the configuration, so none is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// A required role could not be matched to any column.
    #[error("no column found for {role}: tried {candidates:?}, present {present:?}")]
    SchemaMismatch {
        role: Role,
        candidates: Vec<String>,
        present: Vec<String>,
    },

    #[error("dataset is empty: {0}")]
    EmptyDataset(String),

    /// Every row failed period coercion.
    #[error("no valid period values found in column '{column}'")]
    NoValidPeriods { column: String },

    #[error("no rows found for category '{0}'")]
    NoMatchingCategory(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
