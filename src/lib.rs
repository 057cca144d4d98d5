//! Picks the most informative chart for population statistics tables
//! (year, district, nationality, age, count) and lays out its data.

pub mod analysis;
pub mod chart;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod plot;

pub use analysis::{analyze, Analysis, AnalysisRequest, Mode};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult};
