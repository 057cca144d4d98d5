use std::collections::BTreeMap;

use crate::analysis::series::{AggregatedSeries, SeriesEntry, SeriesKey};
use crate::config::AnalysisConfig;
use crate::data::model::Record;

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Sum counts per category. Records without a category are left out, the
/// same way a group-by ignores missing keys.
pub fn category_totals<'a, I>(records: I) -> BTreeMap<String, u64>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for rec in records {
        if let Some(category) = &rec.category {
            *totals.entry(category.clone()).or_default() += rec.count;
        }
    }
    totals
}

/// Order categories by total descending, ties alphabetical.
pub fn rank_by_total(totals: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut ranked: Vec<(&str, u64)> = totals.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
}

// ---------------------------------------------------------------------------
// Category aggregator
// ---------------------------------------------------------------------------

/// Folds the long tail of small categories into one residual bucket.
///
/// A category is listed on its own when its share of the grand total is
/// at least `min_share`; of those, only the `max_categories` largest are
/// kept. The share filter always runs before the cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryAggregator {
    pub min_share: f64,
    pub max_categories: usize,
}

impl CategoryAggregator {
    pub fn new(min_share: f64, max_categories: usize) -> Self {
        Self {
            min_share,
            max_categories,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.min_share_for_own_category, config.max_categories)
    }

    /// Consolidate per-category totals into a bounded series.
    pub fn aggregate(&self, totals: &BTreeMap<String, u64>) -> AggregatedSeries {
        let grand_total: u64 = totals.values().sum();

        let mut entries: Vec<SeriesEntry> = rank_by_total(totals)
            .into_iter()
            .filter(|(_, count)| share(*count, grand_total) >= self.min_share)
            .take(self.max_categories)
            .map(|(label, count)| SeriesEntry {
                key: SeriesKey::category(label),
                count,
            })
            .collect();

        let kept: u64 = entries.iter().map(|e| e.count).sum();
        let residual = grand_total - kept;

        log::info!(
            "Threshold for an own category: {:.1}% of the total",
            self.min_share * 100.0
        );
        if residual > 0 {
            log::info!(
                "'Other' covers {:.1}% ({residual} persons)",
                share(residual, grand_total) * 100.0
            );
            entries.push(SeriesEntry {
                key: SeriesKey::Residual,
                count: residual,
            });
        } else {
            log::info!("'Other' would be empty, every category is listed on its own");
        }

        AggregatedSeries { entries }
    }
}

fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn small_categories_fold_into_other() {
        let input = totals(&[("A", 970), ("B", 20), ("C", 10)]);
        let series = CategoryAggregator::new(0.03, 15).aggregate(&input);
        assert_eq!(
            series.entries,
            vec![
                SeriesEntry {
                    key: SeriesKey::category("A"),
                    count: 970
                },
                SeriesEntry {
                    key: SeriesKey::Residual,
                    count: 30
                },
            ]
        );
    }

    #[test]
    fn no_residual_when_everything_is_listed() {
        let input = totals(&[("A", 50), ("B", 30), ("C", 20)]);
        let series = CategoryAggregator::new(0.01, 15).aggregate(&input);
        assert_eq!(series.len(), 3);
        assert_eq!(series.residual(), None);

        let single = CategoryAggregator::new(0.01, 15).aggregate(&totals(&[("Schweiz", 42)]));
        assert_eq!(single.len(), 1);
        assert_eq!(single.get("Schweiz"), Some(42));
    }

    #[test]
    fn cap_applies_after_threshold() {
        let input = totals(&[("A", 400), ("B", 300), ("C", 299), ("D", 1)]);
        let series = CategoryAggregator::new(0.01, 2).aggregate(&input);
        let labels: Vec<&str> = series.categories().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["A", "B"]);
        assert_eq!(series.residual(), Some(300));

        // B sits below 1%, so it must not fill the second slot.
        let input = totals(&[("A", 990), ("B", 5), ("C", 5)]);
        let series = CategoryAggregator::new(0.01, 2).aggregate(&input);
        let labels: Vec<&str> = series.categories().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["A"]);
        assert_eq!(series.residual(), Some(10));
    }

    #[test]
    fn equal_totals_break_alphabetically() {
        let input = totals(&[("Zypern", 10), ("Albanien", 10), ("Malta", 10)]);
        let series = CategoryAggregator::new(0.0, 2).aggregate(&input);
        let labels: Vec<&str> = series.categories().map(|(l, _)| l).collect();
        assert_eq!(labels, vec!["Albanien", "Malta"]);
    }

    #[test]
    fn category_exactly_at_threshold_is_kept() {
        let input = totals(&[("A", 99), ("B", 1)]);
        let series = CategoryAggregator::new(0.01, 15).aggregate(&input);
        assert_eq!(series.get("B"), Some(1));
    }

    #[test]
    fn conservation_and_cap_hold() {
        let input: BTreeMap<String, u64> = (0..40u64)
            .map(|i| (format!("cat{i:02}"), (i * 37 + 5) % 211))
            .collect();
        let grand: u64 = input.values().sum();
        for max in [1, 3, 15, 100] {
            for min_share in [0.0, 0.005, 0.02, 0.1, 1.0] {
                let series = CategoryAggregator::new(min_share, max).aggregate(&input);
                assert_eq!(series.total(), grand);
                assert!(series.categories().count() <= max);
            }
        }
    }

    #[test]
    fn raising_threshold_never_adds_categories() {
        let input: BTreeMap<String, u64> = (1..30u64)
            .map(|i| (format!("c{i}"), i * i))
            .collect();
        let mut previous = usize::MAX;
        for step in 0..=100 {
            let series = CategoryAggregator::new(step as f64 / 100.0, 15).aggregate(&input);
            let listed = series.categories().count();
            assert!(listed <= previous);
            previous = listed;
        }
    }

    #[test]
    fn zero_total_yields_empty_series() {
        let input = totals(&[("A", 0), ("B", 0)]);
        let series = CategoryAggregator::new(0.01, 15).aggregate(&input);
        assert!(series.is_empty());
    }

    #[test]
    fn grouping_skips_records_without_category() {
        let records = vec![
            Record {
                period: 2023,
                category: Some("Italien".into()),
                count: 3,
                age: None,
                source_row: 0,
            },
            Record {
                period: 2023,
                category: None,
                count: 9,
                age: None,
                source_row: 1,
            },
            Record {
                period: 2023,
                category: Some("Italien".into()),
                count: 4,
                age: None,
                source_row: 2,
            },
        ];
        assert_eq!(category_totals(&records), totals(&[("Italien", 7)]));
    }
}
