// ABOUTME: Upper Tolerable Intake reference table and per-user resolution
// ABOUTME: Resolves demographic defaults overlaid with user overrides into a final nutrient-to-UL map
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Mealplanner Contributors

//! Upper Tolerable Intake (UL) handling.
//!
//! Reference values follow IOM DRI / EFSA guidance by demographic. A resolved
//! map is what the solver consumes: nutrients present in the map have a hard
//! daily cap; nutrients absent from it are uncapped for the run. A UL may
//! apply to a nutrient that has no RDI target, and a tracked nutrient may have
//! no UL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{PlannerError, PlannerResult};

/// Reference UL table keyed by demographic, then nutrient.
///
/// A `None` entry means the demographic explicitly has no UL for that
/// nutrient (distinct from the nutrient being absent, which means the same
/// thing in practice but lets tables be explicit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpperLimitsTable {
    demographics: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

impl UpperLimitsTable {
    /// Built-in reference values for common adult demographics.
    ///
    /// Values are daily ULs in the nutrient's conventional unit (IOM DRI,
    /// with EFSA values where IOM has none).
    #[must_use]
    pub fn reference() -> Self {
        let adult: Vec<(&str, Option<f64>)> = vec![
            ("vitamin_a_ug", Some(3000.0)),
            ("vitamin_c_mg", Some(2000.0)),
            ("vitamin_d_ug", Some(100.0)),
            ("vitamin_e_mg", Some(1000.0)),
            ("vitamin_b6_mg", Some(100.0)),
            ("folate_ug", Some(1000.0)),
            ("niacin_mg", Some(35.0)),
            ("calcium_mg", Some(2500.0)),
            ("iron_mg", Some(45.0)),
            ("zinc_mg", Some(40.0)),
            ("magnesium_mg", Some(350.0)),
            ("selenium_ug", Some(400.0)),
            ("copper_mg", Some(10.0)),
            ("iodine_ug", Some(1100.0)),
            ("sodium_mg", Some(2300.0)),
            ("fiber_g", None),
            ("potassium_mg", None),
        ];
        let row: BTreeMap<String, Option<f64>> = adult
            .into_iter()
            .map(|(name, ul)| (name.to_owned(), ul))
            .collect();
        let mut demographics = BTreeMap::new();
        demographics.insert("adult_male".to_owned(), row.clone());
        demographics.insert("adult_female".to_owned(), row);
        Self { demographics }
    }

    /// Build a table from a JSON value shaped like
    /// `{"demographics": {"adult_male": {"iron_mg": 45.0, "fiber_g": null}}}`.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::MalformedUpperLimits`] when the shape or any
    /// value cannot be interpreted.
    pub fn from_json(value: &serde_json::Value) -> PlannerResult<Self> {
        let demographics_value = value
            .get("demographics")
            .and_then(serde_json::Value::as_object)
            .ok_or_else(|| {
                PlannerError::MalformedUpperLimits("missing 'demographics' object".into())
            })?;

        let mut demographics = BTreeMap::new();
        for (demographic, row_value) in demographics_value {
            let row_obj = row_value.as_object().ok_or_else(|| {
                PlannerError::MalformedUpperLimits(format!(
                    "demographic '{demographic}' is not an object"
                ))
            })?;
            let mut row = BTreeMap::new();
            for (nutrient, ul_value) in row_obj {
                let ul = if ul_value.is_null() {
                    None
                } else {
                    Some(ul_value.as_f64().ok_or_else(|| {
                        PlannerError::MalformedUpperLimits(format!(
                            "UL for '{nutrient}' in '{demographic}' is not numeric"
                        ))
                    })?)
                };
                row.insert(nutrient.clone(), ul);
            }
            demographics.insert(demographic.clone(), row);
        }
        Ok(Self { demographics })
    }

    /// Demographics available in this table.
    #[must_use]
    pub fn demographics(&self) -> Vec<String> {
        self.demographics.keys().cloned().collect()
    }

    /// Resolve final ULs for a demographic with user overrides applied.
    ///
    /// Precedence: an override with a value replaces the reference; a `None`
    /// override is ignored (the reference stands); nutrients the overrides do
    /// not mention keep their reference values; overrides may introduce ULs
    /// for nutrients the reference does not list.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::UnknownDemographic`] when the demographic has
    /// no entry in the table.
    pub fn resolve(
        &self,
        demographic: &str,
        overrides: &BTreeMap<String, Option<f64>>,
    ) -> PlannerResult<ResolvedUpperLimits> {
        let row = self.demographics.get(demographic).ok_or_else(|| {
            PlannerError::UnknownDemographic {
                demographic: demographic.to_owned(),
                available: self.demographics(),
            }
        })?;

        let mut limits = BTreeMap::new();
        for (nutrient, ul) in row {
            if let Some(value) = ul {
                limits.insert(nutrient.clone(), *value);
            }
        }
        for (nutrient, override_value) in overrides {
            if let Some(value) = override_value {
                limits.insert(nutrient.clone(), *value);
            }
        }
        Ok(ResolvedUpperLimits { limits })
    }
}

/// Final nutrient-to-UL mapping the solver consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedUpperLimits {
    limits: BTreeMap<String, f64>,
}

impl ResolvedUpperLimits {
    /// No upper limits at all: every nutrient is uncapped for the run.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Build directly from a nutrient-to-UL map.
    #[must_use]
    pub fn from_limits(limits: BTreeMap<String, f64>) -> Self {
        Self { limits }
    }

    /// The UL for a nutrient, `None` when uncapped.
    #[must_use]
    pub fn limit_for(&self, nutrient: &str) -> Option<f64> {
        self.limits.get(nutrient).copied()
    }

    /// True when no nutrient is capped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    /// Iterate over `(nutrient, limit)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.limits.iter().map(|(name, ul)| (name.as_str(), *ul))
    }

    /// Violations of these limits by a day's consumed micronutrients.
    ///
    /// Only strict excess violates: intake exactly at the UL is valid.
    #[must_use]
    pub fn daily_violations(&self, consumed: &BTreeMap<String, f64>) -> Vec<UlViolation> {
        let mut violations = Vec::new();
        for (nutrient, limit) in &self.limits {
            let actual = consumed.get(nutrient).copied().unwrap_or(0.0);
            if actual > *limit {
                violations.push(UlViolation {
                    nutrient: nutrient.clone(),
                    actual,
                    limit: *limit,
                    excess: actual - limit,
                });
            }
        }
        violations
    }
}

/// One exceeded upper limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UlViolation {
    /// Nutrient whose UL was exceeded
    pub nutrient: String,
    /// Actual daily intake
    pub actual: f64,
    /// The limit that was exceeded
    pub limit: f64,
    /// Amount over the limit
    pub excess: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_and_null_overrides_are_ignored() {
        let table = UpperLimitsTable::reference();
        let mut overrides = BTreeMap::new();
        overrides.insert("iron_mg".to_owned(), Some(30.0));
        overrides.insert("zinc_mg".to_owned(), None);
        overrides.insert("custom_x_mg".to_owned(), Some(12.0));

        let resolved = table.resolve("adult_female", &overrides).unwrap();
        assert_eq!(resolved.limit_for("iron_mg"), Some(30.0));
        assert_eq!(resolved.limit_for("zinc_mg"), Some(40.0));
        assert_eq!(resolved.limit_for("custom_x_mg"), Some(12.0));
        assert_eq!(resolved.limit_for("fiber_g"), None);
    }

    #[test]
    fn unknown_demographic_is_an_error() {
        let table = UpperLimitsTable::reference();
        let err = table.resolve("toddler", &BTreeMap::new());
        assert!(err.is_err());
    }

    #[test]
    fn intake_at_limit_is_not_a_violation() {
        let resolved = ResolvedUpperLimits::from_limits(
            [("iron_mg".to_owned(), 45.0)].into_iter().collect(),
        );
        let mut consumed = BTreeMap::new();
        consumed.insert("iron_mg".to_owned(), 45.0);
        assert!(resolved.daily_violations(&consumed).is_empty());

        consumed.insert("iron_mg".to_owned(), 45.5);
        let violations = resolved.daily_violations(&consumed);
        assert_eq!(violations.len(), 1);
        assert!((violations[0].excess - 0.5).abs() < 1e-9);
    }
}
