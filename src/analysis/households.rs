use crate::analysis::schema::{ColumnCandidates, ColumnResolver, Role};
use crate::data::model::Table;
use crate::error::{AnalysisError, AnalysisResult};

// ---------------------------------------------------------------------------
// One-person household share per district
// ---------------------------------------------------------------------------

/// Household counts of one district and the one-person share in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct HouseholdShare {
    pub district: String,
    pub single_person: u64,
    pub total: u64,
    /// `single_person / total * 100`.
    pub share_percent: f64,
}

/// Compute the one-person household share for every district row.
///
/// The district, one-person and total columns are resolved through the
/// candidate table. Rows missing any of the three values are skipped, as
/// are rows with zero households. Rows keep their table order.
pub fn household_shares(
    table: &Table,
    candidates: &ColumnCandidates,
) -> AnalysisResult<Vec<HouseholdShare>> {
    let resolver = ColumnResolver::new(candidates, &table.columns);
    let district_col = resolver.require(Role::District)?;
    let single_col = resolver.require(Role::SinglePersonHouseholds)?;
    let total_col = resolver.require(Role::Households)?;

    // Resolved names always come from the header.
    let index = |name: &str| table.column_index(name).unwrap_or_default();
    let (district_idx, single_idx, total_idx) =
        (index(&district_col), index(&single_col), index(&total_col));

    let mut shares = Vec::new();
    let mut incomplete = 0;
    for row in &table.rows {
        let (Some(district), Some(single_person), Some(total)) = (
            row[district_idx].as_text(),
            row[single_idx].as_count(),
            row[total_idx].as_count(),
        ) else {
            incomplete += 1;
            continue;
        };
        if total == 0 {
            log::warn!("District '{district}' has no households, skipping");
            continue;
        }
        shares.push(HouseholdShare {
            district,
            single_person,
            total,
            share_percent: single_person as f64 / total as f64 * 100.0,
        });
    }

    if incomplete > 0 {
        log::debug!("Skipped {incomplete} row(s) without district or household counts");
    }
    if shares.is_empty() {
        return Err(AnalysisError::EmptyDataset(
            "no district rows with household counts".into(),
        ));
    }
    log::info!("Computed one-person household shares for {} district(s)", shares.len());
    Ok(shares)
}
