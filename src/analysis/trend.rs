use std::collections::BTreeMap;

use crate::analysis::series::{TrendPoint, TrendSeries};
use crate::data::model::Record;
use crate::error::{AnalysisError, AnalysisResult};

/// Totals of one category per period and their year-over-year change.
///
/// Periods without rows for the category are simply absent; the change is
/// always taken against the previous point that exists.
pub fn compute_trend(records: &[Record], category: &str) -> AnalysisResult<TrendSeries> {
    let mut per_period: BTreeMap<i32, u64> = BTreeMap::new();
    for rec in records {
        if rec.category.as_deref() == Some(category) {
            *per_period.entry(rec.period).or_default() += rec.count;
        }
    }

    if per_period.is_empty() {
        return Err(AnalysisError::NoMatchingCategory(category.to_string()));
    }

    let mut previous: Option<u64> = None;
    let points = per_period
        .into_iter()
        .map(|(period, total)| {
            let delta = previous.map_or(0, |prev| total as i64 - prev as i64);
            previous = Some(total);
            TrendPoint {
                period,
                total,
                delta,
            }
        })
        .collect();

    Ok(TrendSeries {
        category: category.to_string(),
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(period: i32, category: &str, count: u64) -> Record {
        Record {
            period,
            category: Some(category.to_string()),
            count,
            age: None,
            source_row: 0,
        }
    }

    #[test]
    fn first_difference_starts_at_zero() {
        let records = vec![
            rec(2023, "Ukraine", 130),
            rec(2021, "Ukraine", 60),
            rec(2021, "Ukraine", 40),
            rec(2022, "Ukraine", 150),
            rec(2022, "Italien", 999),
        ];
        let trend = compute_trend(&records, "Ukraine").unwrap();
        let totals: Vec<u64> = trend.points.iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![100, 150, 130]);
        assert_eq!(trend.deltas(), vec![0, 50, -20]);
    }

    #[test]
    fn skipped_periods_compare_against_previous_point() {
        let records = vec![rec(2015, "Malta", 10), rec(2019, "Malta", 4)];
        let trend = compute_trend(&records, "Malta").unwrap();
        let periods: Vec<i32> = trend.points.iter().map(|p| p.period).collect();
        assert_eq!(periods, vec![2015, 2019]);
        assert_eq!(trend.deltas(), vec![0, -6]);
    }

    #[test]
    fn unknown_category_names_the_request() {
        let records = vec![rec(2021, "Schweiz", 1)];
        let err = compute_trend(&records, "Mars").unwrap_err();
        assert_eq!(err, AnalysisError::NoMatchingCategory("Mars".into()));
        assert_eq!(err.to_string(), "no rows found for category 'Mars'");
    }
}
