//! # Cardinality Estimation
//!
//! Output-rate estimation for arbitrary alias subsets and derived relations.
//!
//! The estimate for a set of aliases is the product of the input rates times
//! the product of the selectivities of every alias pair inside the set.
//! Pairs without a recorded selectivity contribute 1.0 (see the
//! missing-entry policy in `characteristics`), so the formula reduces to the
//! induced-subgraph form: only predicate edges whose both endpoints lie in
//! the set shrink the estimate, edges to outside aliases are ignored.

use crate::characteristics::DataCharacteristics;
use crate::error::PlanError;
use crate::query::{Relation, RelationAlias};
use std::collections::BTreeSet;

/// Expected output rate of the join over the given alias set.
///
/// Empty set → 0.0; a single alias → its rate.
pub fn join_size(
    characteristics: &dyn DataCharacteristics,
    aliases: &BTreeSet<RelationAlias>,
) -> Result<f64, PlanError> {
    if aliases.is_empty() {
        return Ok(0.0);
    }

    let mut size = 1.0;
    for alias in aliases {
        size *= characteristics.get_rate(alias)?;
    }
    let ordered: Vec<&RelationAlias> = aliases.iter().collect();
    for (i, a) in ordered.iter().enumerate() {
        for b in &ordered[i + 1..] {
            size *= characteristics.get_selectivity(a, b);
        }
    }
    Ok(size)
}

/// Estimator over one characteristics source.
pub struct Estimator<'a> {
    pub characteristics: &'a dyn DataCharacteristics,
}

impl<'a> Estimator<'a> {
    pub fn new(characteristics: &'a dyn DataCharacteristics) -> Self {
        Self { characteristics }
    }

    /// Size of a derived relation, using the relation's own declared binary
    /// predicates. Predicates reaching outside the relation's alias set are
    /// ignored.
    pub fn estimate_size(&self, relation: &Relation) -> Result<f64, PlanError> {
        let aliases = relation.aliases();
        if aliases.is_empty() {
            return Ok(0.0);
        }

        let mut size = 1.0;
        for alias in &aliases {
            size *= self.characteristics.get_rate(alias)?;
        }
        for predicate in &relation.join_predicates {
            if aliases.contains(predicate.left_alias()) && aliases.contains(predicate.right_alias())
            {
                size *= self.characteristics.get_predicate_selectivity(predicate);
            }
        }
        Ok(size)
    }

    /// Size of the join over a plain alias list, pairwise selectivities.
    pub fn estimate_alias_size(&self, aliases: &[RelationAlias]) -> Result<f64, PlanError> {
        let set: BTreeSet<RelationAlias> = aliases.iter().cloned().collect();
        join_size(self.characteristics, &set)
    }
}

/// Convenience wrapper constructing a throwaway [`Estimator`].
pub fn estimate_size(
    relation: &Relation,
    characteristics: &dyn DataCharacteristics,
) -> Result<f64, PlanError> {
    Estimator::new(characteristics).estimate_size(relation)
}
