use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::series::{
    AggregatedSeries, PeriodRow, SeriesEntry, SeriesKey, TimeSeriesMatrix,
};
use crate::data::model::Record;
use crate::error::{AnalysisError, AnalysisResult};

// ---------------------------------------------------------------------------
// Age binner
// ---------------------------------------------------------------------------

/// Fixed, ordered age bands. Each band includes its lower edge and
/// excludes its upper edge; the last band is open-ended.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeBinner {
    /// Finite upper edges, strictly ascending. One fewer than `labels`.
    upper_bounds: Vec<f64>,
    labels: Vec<String>,
}

impl AgeBinner {
    /// Build a binner from upper edges and labels.
    ///
    /// A trailing `f64::INFINITY` edge is accepted and treated as the
    /// open last band, so both `[6, 12, ∞]` with three labels and `[6, 12]`
    /// with three labels describe the same bands.
    pub fn new(thresholds: &[f64], labels: &[String]) -> AnalysisResult<Self> {
        let mut upper_bounds = thresholds.to_vec();
        if upper_bounds.last() == Some(&f64::INFINITY) {
            upper_bounds.pop();
        }

        if labels.len() != upper_bounds.len() + 1 {
            return Err(AnalysisError::InvalidConfig(format!(
                "{} age labels do not match {} thresholds",
                labels.len(),
                thresholds.len()
            )));
        }
        if let Some(bad) = upper_bounds.iter().find(|b| !b.is_finite() || **b <= 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "age threshold {bad} must be finite and positive"
            )));
        }
        if upper_bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(AnalysisError::InvalidConfig(
                "age thresholds must be strictly ascending".into(),
            ));
        }

        Ok(AgeBinner {
            upper_bounds,
            labels: labels.to_vec(),
        })
    }

    /// All labels in canonical order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Index of the band holding `age`. Negative ages and NaN have none.
    pub fn bin_index(&self, age: f64) -> Option<usize> {
        if age.is_nan() || age < 0.0 {
            return None;
        }
        Some(self.upper_bounds.partition_point(|&upper| upper <= age))
    }

    pub fn label_for(&self, age: f64) -> Option<&str> {
        self.bin_index(age).map(|i| self.labels[i].as_str())
    }

    /// Assign every record with a usable age to its band.
    pub fn bin_records(&self, records: &[Record]) -> BinnedAges {
        let mut entries = Vec::with_capacity(records.len());
        let mut dropped = 0;
        for rec in records {
            match rec.age.and_then(|age| self.bin_index(age)) {
                Some(band) => entries.push(BinnedAge {
                    period: rec.period,
                    band,
                    count: rec.count,
                }),
                None => {
                    log::debug!("Table row {}: no usable age ({:?})", rec.source_row, rec.age);
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            log::warn!("Dropped {dropped} row(s) without a usable age");
        }
        BinnedAges { entries, dropped }
    }

    /// Per-band totals over all binned rows, present bands only.
    pub fn distribution(&self, binned: &BinnedAges) -> AggregatedSeries {
        let mut totals = vec![0u64; self.labels.len()];
        for entry in &binned.entries {
            totals[entry.band] += entry.count;
        }
        let entries = binned
            .present_bands()
            .into_iter()
            .map(|band| SeriesEntry {
                key: SeriesKey::category(self.labels[band].clone()),
                count: totals[band],
            })
            .collect();
        AggregatedSeries { entries }
    }

    /// Period × band matrix over the present bands. No residual column:
    /// the bands already cover every age.
    pub fn matrix(&self, binned: &BinnedAges) -> TimeSeriesMatrix {
        let present = binned.present_bands();
        let column_of: BTreeMap<usize, usize> = present
            .iter()
            .enumerate()
            .map(|(col, band)| (*band, col))
            .collect();

        let mut rows: BTreeMap<i32, Vec<u64>> = BTreeMap::new();
        for entry in &binned.entries {
            let values = rows
                .entry(entry.period)
                .or_insert_with(|| vec![0; present.len()]);
            values[column_of[&entry.band]] += entry.count;
        }

        TimeSeriesMatrix {
            columns: present
                .iter()
                .map(|band| SeriesKey::category(self.labels[*band].clone()))
                .collect(),
            rows: rows
                .into_iter()
                .map(|(period, values)| PeriodRow { period, values })
                .collect(),
        }
    }
}

impl Default for AgeBinner {
    fn default() -> Self {
        AgeBinner {
            upper_bounds: crate::config::DEFAULT_AGE_THRESHOLDS.to_vec(),
            labels: crate::config::DEFAULT_AGE_LABELS
                .iter()
                .map(|l| l.to_string())
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Binned rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinnedAge {
    pub period: i32,
    pub band: usize,
    pub count: u64,
}

/// Records that received a band, plus how many did not.
#[derive(Debug, Clone, Default)]
pub struct BinnedAges {
    pub entries: Vec<BinnedAge>,
    pub dropped: usize,
}

impl BinnedAges {
    /// Bands that occur at least once, in canonical order.
    pub fn present_bands(&self) -> Vec<usize> {
        self.entries
            .iter()
            .map(|e| e.band)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct periods of the binned rows, ascending.
    pub fn periods(&self) -> Vec<i32> {
        self.entries
            .iter()
            .map(|e| e.period)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(period: i32, age: Option<f64>, count: u64) -> Record {
        Record {
            period,
            category: None,
            count,
            age,
            source_row: 0,
        }
    }

    #[test]
    fn edges_are_lower_inclusive() {
        let binner = AgeBinner::default();
        assert_eq!(binner.label_for(0.0), Some("0–5"));
        assert_eq!(binner.label_for(5.9), Some("0–5"));
        assert_eq!(binner.label_for(6.0), Some("6–11"));
        assert_eq!(binner.label_for(64.0), Some("45–64"));
        assert_eq!(binner.label_for(65.0), Some("65–79"));
        assert_eq!(binner.label_for(99.5), Some("90–99"));
        assert_eq!(binner.label_for(100.0), Some("100+"));
        assert_eq!(binner.label_for(f64::INFINITY), Some("100+"));
    }

    #[test]
    fn invalid_ages_get_no_band() {
        let binner = AgeBinner::default();
        assert_eq!(binner.bin_index(-1.0), None);
        assert_eq!(binner.bin_index(f64::NAN), None);
    }

    #[test]
    fn mapping_is_monotonic() {
        let binner = AgeBinner::default();
        let mut previous = 0;
        for tenth in 0..1300 {
            let band = binner.bin_index(tenth as f64 / 10.0).unwrap();
            assert!(band >= previous);
            previous = band;
        }
        assert_eq!(previous, binner.labels().len() - 1);
    }

    #[test]
    fn trailing_infinity_is_optional() {
        let labels: Vec<String> = ["young", "mid", "old"].iter().map(|s| s.to_string()).collect();
        let with_inf = AgeBinner::new(&[18.0, 65.0, f64::INFINITY], &labels).unwrap();
        let without = AgeBinner::new(&[18.0, 65.0], &labels).unwrap();
        assert_eq!(with_inf, without);
        assert!(AgeBinner::new(&[65.0, 18.0], &labels).is_err());
        assert!(AgeBinner::new(&[18.0], &labels).is_err());
    }

    #[test]
    fn distribution_keeps_canonical_order_of_present_bands() {
        let binner = AgeBinner::default();
        let records = vec![
            record(2023, Some(70.0), 5),
            record(2023, Some(3.0), 100),
            record(2023, Some(72.0), 7),
            record(2023, None, 50),
        ];
        let binned = binner.bin_records(&records);
        assert_eq!(binned.dropped, 1);

        let series = binner.distribution(&binned);
        let labels: Vec<&str> = series.categories().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["0–5", "65–79"]);
        assert_eq!(series.get("65–79"), Some(12));
        assert_eq!(series.residual(), None);
    }

    #[test]
    fn matrix_zero_fills_missing_bands() {
        let binner = AgeBinner::default();
        let records = vec![
            record(2022, Some(30.0), 10),
            record(2023, Some(30.0), 12),
            record(2023, Some(90.0), 4),
        ];
        let matrix = binner.matrix(&binner.bin_records(&records));
        assert_eq!(matrix.periods(), vec![2022, 2023]);
        assert_eq!(
            matrix.column(&SeriesKey::category("80–89")),
            None
        );
        assert_eq!(
            matrix.column(&SeriesKey::category("90–99")),
            Some(vec![0, 4])
        );
        assert!(matrix.columns.iter().all(|c| !c.is_residual()));
    }
}
