//! # Data Characteristics
//!
//! Read-only statistics the planner optimizes against: per-alias input rates
//! (tuples per time unit) and pairwise join selectivities in (0, 1].
//!
//! ## Symmetry and Canonicalization
//!
//! Selectivity is a property of an unordered alias pair. All backends
//! canonicalize the pair key by lexicographic alias order, so looking up
//! `(a, b)` and `(b, a)` always returns the same value regardless of the
//! order entries were inserted in.
//!
//! ## Missing-Entry Policy
//!
//! - A missing **rate** is a hard failure (`MissingStatistic`): without a
//!   rate no cardinality can be estimated at all.
//! - A missing **selectivity** defaults to 1.0, which treats the unlinked
//!   pair as a cross product. This makes the induced-subgraph cardinality
//!   formula come out right without storing explicit 1.0 entries for every
//!   non-adjacent pair.
//!
//! Backends: [`ManualCharacteristics`] for programmatic assignment (with
//! optional per-predicate overrides), [`SymmetricJsonCharacteristics`] for
//! the JSON wire shape, and [`AllCross`] for constant-rate cross products.

use crate::error::PlanError;
use crate::query::{BinaryPredicate, RelationAlias};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Source of rate and selectivity statistics.
pub trait DataCharacteristics {
    /// Rate of the stream identified by `alias`, in tuples per time unit.
    fn get_rate(&self, alias: &RelationAlias) -> Result<f64, PlanError>;

    /// Selectivity of the join between the two aliases. Symmetric in its
    /// arguments; 1.0 when no selectivity is recorded for the pair.
    fn get_selectivity(&self, a: &RelationAlias, b: &RelationAlias) -> f64;

    /// Selectivity of the join over the given predicate. Defaults to the
    /// pairwise selectivity of the predicate's two aliases.
    fn get_predicate_selectivity(&self, predicate: &BinaryPredicate) -> f64 {
        self.get_selectivity(predicate.left_alias(), predicate.right_alias())
    }
}

/// Canonical ordering of a selectivity pair key: lexicographic by alias name.
fn ordered(a: &RelationAlias, b: &RelationAlias) -> (RelationAlias, RelationAlias) {
    if a.as_str() <= b.as_str() {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// In-memory characteristics populated programmatically.
///
/// Besides pairwise selectivities, individual predicates can carry their own
/// selectivity; lookups for a predicate fall back to the pairwise value of
/// its two aliases when no override is registered.
#[derive(Debug, Clone, Default)]
pub struct ManualCharacteristics {
    rates: BTreeMap<RelationAlias, f64>,
    pairwise_selectivities: BTreeMap<(RelationAlias, RelationAlias), f64>,
    predicate_selectivities: BTreeMap<BinaryPredicate, f64>,
}

impl ManualCharacteristics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_rate(&mut self, alias: impl Into<RelationAlias>, rate: f64) {
        self.rates.insert(alias.into(), rate);
    }

    pub fn set_selectivity(
        &mut self,
        a: impl Into<RelationAlias>,
        b: impl Into<RelationAlias>,
        selectivity: f64,
    ) {
        let a = a.into();
        let b = b.into();
        debug_assert!(a != b, "selectivity of a stream with itself is undefined");
        self.pairwise_selectivities.insert(ordered(&a, &b), selectivity);
    }

    pub fn set_predicate_selectivity(&mut self, predicate: BinaryPredicate, selectivity: f64) {
        self.predicate_selectivities.insert(predicate, selectivity);
    }
}

impl DataCharacteristics for ManualCharacteristics {
    fn get_rate(&self, alias: &RelationAlias) -> Result<f64, PlanError> {
        self.rates.get(alias).copied().ok_or_else(|| {
            PlanError::MissingStatistic(format!("no rate recorded for relation '{}'", alias))
        })
    }

    fn get_selectivity(&self, a: &RelationAlias, b: &RelationAlias) -> f64 {
        self.pairwise_selectivities
            .get(&ordered(a, b))
            .copied()
            .unwrap_or(1.0)
    }

    fn get_predicate_selectivity(&self, predicate: &BinaryPredicate) -> f64 {
        self.predicate_selectivities
            .get(predicate)
            .copied()
            .unwrap_or_else(|| {
                self.get_selectivity(predicate.left_alias(), predicate.right_alias())
            })
    }
}

/// JSON wire shape of the characteristics input.
#[derive(Debug, Deserialize)]
struct CharacteristicsDocument {
    rates: BTreeMap<String, f64>,
    #[serde(default)]
    selectivities: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Characteristics parsed from a JSON object like
///
/// ```json
/// {
///   "rates": { "x": 100, "y": 66.67 },
///   "selectivities": {
///     "x": { "y": 0.03 }
///   }
/// }
/// ```
///
/// The nesting order of the selectivities object does not matter; pair keys
/// are canonicalized on construction.
#[derive(Debug, Clone)]
pub struct SymmetricJsonCharacteristics {
    rates: BTreeMap<RelationAlias, f64>,
    selectivities: BTreeMap<(RelationAlias, RelationAlias), f64>,
}

impl SymmetricJsonCharacteristics {
    pub fn from_value(value: serde_json::Value) -> Result<Self, PlanError> {
        let document: CharacteristicsDocument = serde_json::from_value(value)
            .map_err(|e| PlanError::Configuration(format!("malformed characteristics: {}", e)))?;

        let rates = document
            .rates
            .into_iter()
            .map(|(alias, rate)| (RelationAlias::new(alias), rate))
            .collect();

        let mut selectivities = BTreeMap::new();
        for (outer, inner) in document.selectivities {
            let outer = RelationAlias::new(outer);
            for (other, selectivity) in inner {
                let other = RelationAlias::new(other);
                selectivities.insert(ordered(&outer, &other), selectivity);
            }
        }

        Ok(Self { rates, selectivities })
    }

    pub fn from_str(s: &str) -> Result<Self, PlanError> {
        let value: serde_json::Value = serde_json::from_str(s)
            .map_err(|e| PlanError::Configuration(format!("malformed characteristics: {}", e)))?;
        Self::from_value(value)
    }
}

impl DataCharacteristics for SymmetricJsonCharacteristics {
    fn get_rate(&self, alias: &RelationAlias) -> Result<f64, PlanError> {
        self.rates.get(alias).copied().ok_or_else(|| {
            PlanError::MissingStatistic(format!("no rate recorded for relation '{}'", alias))
        })
    }

    fn get_selectivity(&self, a: &RelationAlias, b: &RelationAlias) -> f64 {
        self.selectivities
            .get(&ordered(a, b))
            .copied()
            .unwrap_or(1.0)
    }
}

/// Constant-rate characteristics where every join is a cross product.
/// Useful as a worst-case baseline and in tests.
#[derive(Debug, Clone)]
pub struct AllCross {
    rate: f64,
}

const DEFAULT_RATE: f64 = 10_000.0;

impl AllCross {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }
}

impl Default for AllCross {
    fn default() -> Self {
        Self { rate: DEFAULT_RATE }
    }
}

impl DataCharacteristics for AllCross {
    fn get_rate(&self, _alias: &RelationAlias) -> Result<f64, PlanError> {
        Ok(self.rate)
    }

    fn get_selectivity(&self, _a: &RelationAlias, _b: &RelationAlias) -> f64 {
        1.0
    }
}
