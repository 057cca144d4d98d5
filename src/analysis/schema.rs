use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

// ---------------------------------------------------------------------------
// Semantic roles
// ---------------------------------------------------------------------------

/// The meaning a column can play in a population table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Period,
    Count,
    Nationality,
    District,
    Age,
    /// One-person households (household tables only).
    SinglePersonHouseholds,
    /// All households (household tables only).
    Households,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Period => "period",
            Role::Count => "count",
            Role::Nationality => "nationality",
            Role::District => "district",
            Role::Age => "age",
            Role::SinglePersonHouseholds => "single-person households",
            Role::Households => "households",
        };
        f.write_str(name)
    }
}

/// Role → ordered list of acceptable column names.
pub type ColumnCandidates = BTreeMap<Role, Vec<String>>;

// ---------------------------------------------------------------------------
// Resolved schema
// ---------------------------------------------------------------------------

/// Actual column names for the roles the analysis core consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub period: String,
    pub count: String,
    /// Column holding the grouping category (nationality or district).
    pub category: Option<String>,
    pub age: Option<String>,
}

// ---------------------------------------------------------------------------
// Column resolver
// ---------------------------------------------------------------------------

/// Case-insensitive lookup of role columns in a table header.
///
/// Built once per run from the candidate table and the header; all lookups
/// are pure.
pub struct ColumnResolver<'a> {
    candidates: &'a ColumnCandidates,
    columns: &'a [String],
    /// lower-cased column name → first actual column with that spelling
    folded: HashMap<String, &'a str>,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(candidates: &'a ColumnCandidates, columns: &'a [String]) -> Self {
        let mut folded = HashMap::with_capacity(columns.len());
        for col in columns {
            folded.entry(col.to_lowercase()).or_insert(col.as_str());
        }
        ColumnResolver {
            candidates,
            columns,
            folded,
        }
    }

    /// Candidate names configured for `role` (empty when none are).
    pub fn candidates_for(&self, role: Role) -> &'a [String] {
        self.candidates
            .get(&role)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First candidate of `role` present in the header, or `None`.
    ///
    /// An exact spelling wins over a case-folded match, so a header with
    /// both `Jahr` and `JAHR` resolves deterministically.
    pub fn optional(&self, role: Role) -> Option<String> {
        self.candidates_for(role).iter().find_map(|candidate| {
            if self.columns.iter().any(|c| c == candidate) {
                return Some(candidate.clone());
            }
            self.folded
                .get(&candidate.to_lowercase())
                .map(|actual| actual.to_string())
        })
    }

    /// Like [`optional`](Self::optional) but fails with `SchemaMismatch`.
    pub fn require(&self, role: Role) -> AnalysisResult<String> {
        self.optional(role)
            .ok_or_else(|| AnalysisError::SchemaMismatch {
                role,
                candidates: self.candidates_for(role).to_vec(),
                present: self.columns.to_vec(),
            })
    }

    /// Resolve `role`, failing only when `required` is set.
    pub fn resolve(&self, role: Role, required: bool) -> AnalysisResult<Option<String>> {
        if required {
            self.require(role).map(Some)
        } else {
            Ok(self.optional(role))
        }
    }

    /// Resolve everything the analysis core needs.
    ///
    /// Period and count are always required. The category column is only
    /// required when no age column is present, since age mode never
    /// groups by category.
    pub fn resolve_schema(&self, category_role: Role) -> AnalysisResult<ResolvedSchema> {
        let period = self.require(Role::Period)?;
        let count = self.require(Role::Count)?;
        let age = self.optional(Role::Age);
        let category = self.resolve(category_role, age.is_none())?;

        log::debug!(
            "Resolved columns: period={period:?} count={count:?} {category_role}={category:?} age={age:?}"
        );

        Ok(ResolvedSchema {
            period,
            count,
            category,
            age,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> ColumnCandidates {
        let mut map = ColumnCandidates::new();
        map.insert(Role::Period, vec!["Jahr".into(), "jahr".into()]);
        map.insert(Role::Count, vec!["Anzahl".into(), "anzahl".into()]);
        map.insert(
            Role::Nationality,
            vec!["Staatsangehörigkeit".into(), "Staatsangehoerigkeit".into()],
        );
        map.insert(Role::Age, vec!["Alter".into()]);
        map
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_case_insensitively() {
        let c = candidates();
        let columns = cols(&["JAHR", "anzahl"]);
        let resolver = ColumnResolver::new(&c, &columns);
        assert_eq!(resolver.require(Role::Period).unwrap(), "JAHR");
        assert_eq!(resolver.require(Role::Count).unwrap(), "anzahl");
    }

    #[test]
    fn unresolved_required_role_reports_candidates_and_columns() {
        let c = candidates();
        let columns = cols(&["Year", "Anzahl"]);
        let resolver = ColumnResolver::new(&c, &columns);
        let err = resolver.require(Role::Period).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::SchemaMismatch {
                role: Role::Period,
                candidates: cols(&["Jahr", "jahr"]),
                present: cols(&["Year", "Anzahl"]),
            }
        );
    }

    #[test]
    fn optional_role_resolves_to_none() {
        let c = candidates();
        let columns = cols(&["Jahr", "Anzahl"]);
        let resolver = ColumnResolver::new(&c, &columns);
        assert_eq!(resolver.resolve(Role::Age, false).unwrap(), None);
        assert_eq!(resolver.optional(Role::District), None);
    }

    #[test]
    fn earlier_candidate_wins() {
        let c = candidates();
        let columns = cols(&["Staatsangehoerigkeit", "Staatsangehörigkeit"]);
        let resolver = ColumnResolver::new(&c, &columns);
        assert_eq!(
            resolver.optional(Role::Nationality).as_deref(),
            Some("Staatsangehörigkeit")
        );
    }

    #[test]
    fn exact_spelling_preferred_over_folded_duplicate() {
        let c = candidates();
        let columns = cols(&["JAHR", "Jahr"]);
        let resolver = ColumnResolver::new(&c, &columns);
        assert_eq!(resolver.optional(Role::Period).as_deref(), Some("Jahr"));
    }

    #[test]
    fn category_required_only_without_age() {
        let c = candidates();

        let with_age = cols(&["Jahr", "Alter", "Anzahl"]);
        let schema = ColumnResolver::new(&c, &with_age)
            .resolve_schema(Role::Nationality)
            .unwrap();
        assert_eq!(schema.age.as_deref(), Some("Alter"));
        assert_eq!(schema.category, None);

        let without_age = cols(&["Jahr", "Anzahl"]);
        let err = ColumnResolver::new(&c, &without_age)
            .resolve_schema(Role::Nationality)
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::SchemaMismatch {
                role: Role::Nationality,
                ..
            }
        ));
    }
}
