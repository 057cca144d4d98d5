use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analysis::age::AgeBinner;
use crate::analysis::schema::{ColumnCandidates, Role};
use crate::error::{AnalysisError, AnalysisResult};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_MIN_SHARE: f64 = 0.01;
pub const DEFAULT_MAX_CATEGORIES: usize = 15;
pub const DEFAULT_MAX_BANDS: usize = 10;
pub const DEFAULT_PINNED_CATEGORY: &str = "Schweiz";

/// Finite upper edges of the default age bands; the last band is open.
pub const DEFAULT_AGE_THRESHOLDS: [f64; 10] =
    [6.0, 12.0, 18.0, 25.0, 35.0, 45.0, 65.0, 80.0, 90.0, 100.0];

pub const DEFAULT_AGE_LABELS: [&str; 11] = [
    "0–5", "6–11", "12–17", "18–24", "25–34", "35–44", "45–64", "65–79", "80–89", "90–99",
    "100+",
];

/// Header spellings seen in the Basel-Stadt open data exports.
pub fn default_column_candidates() -> ColumnCandidates {
    let table: [(Role, &[&str]); 7] = [
        (Role::Period, &["Jahr", "jahr"]),
        (Role::Count, &["Anzahl", "anzahl"]),
        (
            Role::Nationality,
            &[
                "Staatsangehörigkeit",
                "Staatsangehoerigkeit",
                "staatsangehoerigkeit",
            ],
        ),
        (
            Role::District,
            &[
                "Wohnviertel-Name",
                "wohnviertel_name",
                "Wohnviertel",
                "wohnviertel",
            ],
        ),
        (Role::Age, &["Alter", "alter"]),
        (
            Role::SinglePersonHouseholds,
            &["hh_1_person", "1-Personen-Haushalte", "Einpersonenhaushalte"],
        ),
        (Role::Households, &["hh_total", "Haushalte total", "Haushalte"]),
    ];
    table
        .into_iter()
        .map(|(role, names)| (role, names.iter().map(|n| n.to_string()).collect()))
        .collect()
}

// ---------------------------------------------------------------------------
// Analysis configuration
// ---------------------------------------------------------------------------

/// Every tunable of the analysis core. Passed in per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum share of the grand total a category needs to be listed on
    /// its own in single-period charts.
    pub min_share_for_own_category: f64,
    /// Hard cap on individually listed categories in single-period charts.
    pub max_categories: usize,
    /// Number of explicit bands in multi-period stacked charts, pinned
    /// category included.
    pub max_bands_without_rest: usize,
    /// Category that is always shown individually when present.
    pub pinned_category: Option<String>,
    /// Which role supplies the grouping category.
    pub category_role: Role,
    pub age_bin_thresholds: Vec<f64>,
    pub age_bin_labels: Vec<String>,
    pub column_candidates: ColumnCandidates,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_share_for_own_category: DEFAULT_MIN_SHARE,
            max_categories: DEFAULT_MAX_CATEGORIES,
            max_bands_without_rest: DEFAULT_MAX_BANDS,
            pinned_category: Some(DEFAULT_PINNED_CATEGORY.to_string()),
            category_role: Role::Nationality,
            age_bin_thresholds: DEFAULT_AGE_THRESHOLDS.to_vec(),
            age_bin_labels: DEFAULT_AGE_LABELS.iter().map(|l| l.to_string()).collect(),
            column_candidates: default_column_candidates(),
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: AnalysisConfig =
            serde_json::from_str(&text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the analysis core cannot work with.
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(0.0..=1.0).contains(&self.min_share_for_own_category) {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_share_for_own_category must lie in [0, 1], got {}",
                self.min_share_for_own_category
            )));
        }
        if self.max_categories == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_categories must be at least 1".into(),
            ));
        }
        if self.max_bands_without_rest == 0 {
            return Err(AnalysisError::InvalidConfig(
                "max_bands_without_rest must be at least 1".into(),
            ));
        }
        if !matches!(self.category_role, Role::Nationality | Role::District) {
            return Err(AnalysisError::InvalidConfig(format!(
                "category_role must be nationality or district, got {}",
                self.category_role
            )));
        }
        self.age_binner().map(|_| ())
    }

    /// Build the age binner described by the threshold/label fields.
    pub fn age_binner(&self) -> AnalysisResult<AgeBinner> {
        AgeBinner::new(&self.age_bin_thresholds, &self.age_bin_labels)
    }
}
