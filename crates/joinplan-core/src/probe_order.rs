//! # Probe-Order Search
//!
//! A probe order is defined for a single join input. For example, the probe
//! order ⟨R, S, T⟩ means: tuples from R are first routed to S's store and the
//! intermediate matches are then routed to T's store. Each step also records
//! which predicates become bindable at that step -- exactly those with one
//! endpoint among the already-placed inputs and one endpoint at the input
//! being placed.
//!
//! ## Cost Model
//!
//! The cost attributed to placing input `n` after prefix `S` is the expected
//! number of intermediate tuples produced there:
//!
//! ```text
//! join_size(S ∪ aliases(n)) = join_size(S) × rate(n) × Π sel(bindable predicates)
//! ```
//!
//! The total cost of an order is the sum over all non-root steps. The cost of
//! a step depends only on the already-placed set and the input being added,
//! never on later steps -- permuting a suffix cannot change a prefix's cost.
//!
//! ## Strategies
//!
//! - [`ExhaustiveProbeOrder`] enumerates all (k−1)! permutations per root and
//!   keeps the cheapest. Factorial, so a `maxRelations` guard rejects large
//!   inputs instead of hanging.
//! - [`GreedyProbeOrder`] extends each order by the input with the smallest
//!   next intermediate size, ties broken by lexicographic relation name.
//!
//! Both refuse to cross-join disconnected components unless cross products
//! were explicitly allowed; they fail with a configuration error instead of
//! silently costing the cross step as if it were free.

use crate::characteristics::DataCharacteristics;
use crate::error::PlanError;
use crate::estimator::join_size;
use crate::query::{BinaryPredicate, Relation, RelationAlias, RelationName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Cost of a probe order: expected intermediate tuples over all steps.
pub type ProbeCost = f64;

/// One step of a probe order: the input visited at this position and the
/// predicates that become bindable here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOrderStep {
    pub relation: Relation,
    pub predicates: BTreeSet<BinaryPredicate>,
}

/// A full probe order rooted at its first step's relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOrder {
    pub steps: Vec<ProbeOrderStep>,
}

impl ProbeOrder {
    /// Canonical names of the step relations, in probe order.
    pub fn relation_names(&self) -> Vec<RelationName> {
        self.steps.iter().map(|s| s.relation.name()).collect()
    }
}

/// Best probe order and cost per root, keyed by the root relation's
/// canonical name. A multi-stream operator holds one entry per child.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeOrders {
    pub inner: BTreeMap<RelationName, (ProbeOrder, ProbeCost)>,
}

impl ProbeOrders {
    pub fn get(&self, root: &str) -> Option<&(ProbeOrder, ProbeCost)> {
        self.inner.get(root)
    }

    pub fn total_cost(&self) -> ProbeCost {
        self.inner.values().map(|(_, cost)| cost).sum()
    }
}

/// Predicates eligible for a join between two alias sets: one endpoint in
/// `from`, the other in `to`. For predicates `["x.a = y.a", "y.b = z.b",
/// "x.b < z.c"]` with `from = {x, z}` and `to = {y}` this returns the first
/// two.
pub fn predicates_for_join(
    predicates: &[BinaryPredicate],
    from: &BTreeSet<RelationAlias>,
    to: &BTreeSet<RelationAlias>,
) -> BTreeSet<BinaryPredicate> {
    predicates
        .iter()
        .filter(|p| p.connects(from, to))
        .cloned()
        .collect()
}

/// Build a probe order from an ordered list of inputs, assigning each step
/// the predicates newly bindable against the prefix placed so far.
pub fn probe_order_for(list: &[Relation], predicates: &[BinaryPredicate]) -> ProbeOrder {
    let mut steps = Vec::with_capacity(list.len());
    let mut placed: BTreeSet<RelationAlias> = BTreeSet::new();
    for relation in list {
        let bindable = predicates_for_join(predicates, &placed, &relation.aliases());
        placed.extend(relation.aliases());
        steps.push(ProbeOrderStep {
            relation: relation.clone(),
            predicates: bindable,
        });
    }
    ProbeOrder { steps }
}

/// Total cost of a probe order: the sum of the intermediate join sizes after
/// each non-root step. A single-step order costs 0.
pub fn probe_order_cost(
    characteristics: &dyn DataCharacteristics,
    order: &ProbeOrder,
) -> Result<ProbeCost, PlanError> {
    let mut placed: BTreeSet<RelationAlias> = match order.steps.first() {
        Some(first) => first.relation.aliases(),
        None => return Ok(0.0),
    };
    let mut cost = 0.0;
    for step in &order.steps[1..] {
        placed.extend(step.relation.aliases());
        cost += join_size(characteristics, &placed)?;
    }
    Ok(cost)
}

/// Chooses, per join input, the order in which the remaining inputs' stores
/// are probed.
pub trait ProbeOrderStrategy: std::fmt::Debug {
    /// Compute the best probe order for every child, plus the summed cost.
    ///
    /// `children` are the sibling inputs of one multi-stream operator;
    /// `predicates` the binary predicates connecting them. When
    /// `cross_products_allowed` is false and the predicate graph over the
    /// children is disconnected, this fails with a configuration error.
    fn optimize(
        &self,
        characteristics: &dyn DataCharacteristics,
        predicates: &[BinaryPredicate],
        children: &[Relation],
        cross_products_allowed: bool,
    ) -> Result<(ProbeOrders, ProbeCost), PlanError>;
}

fn children_sorted_by_name(children: &[Relation]) -> Vec<Relation> {
    let mut sorted = children.to_vec();
    sorted.sort_by_key(|r| r.name());
    sorted
}

/// Whether an order contains a cross step: a non-root step binding nothing.
fn has_cross_step(order: &ProbeOrder) -> bool {
    order.steps.iter().skip(1).any(|s| s.predicates.is_empty())
}

// ---------------------------------------------------------------------------
// Exhaustive search
// ---------------------------------------------------------------------------

/// Exhaustive probe-order search: for every root, all permutations of the
/// remaining inputs are enumerated and the cheapest valid one kept.
#[derive(Debug, Clone)]
pub struct ExhaustiveProbeOrder {
    /// Upper bound on the number of inputs. The search is factorial in the
    /// input count, so anything beyond this fails with a configuration error
    /// and the caller should pick a greedy strategy instead.
    pub max_relations: usize,
}

const DEFAULT_MAX_RELATIONS: usize = 8;

impl Default for ExhaustiveProbeOrder {
    fn default() -> Self {
        Self { max_relations: DEFAULT_MAX_RELATIONS }
    }
}

impl ExhaustiveProbeOrder {
    /// Build from a free-form parameter map; understands `maxRelations`.
    pub fn from_params(
        params: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, PlanError> {
        let mut config = Self::default();
        if let Some(value) = params.get("maxRelations") {
            config.max_relations = value
                .as_u64()
                .map(|v| v as usize)
                .ok_or_else(|| {
                    PlanError::Configuration(format!(
                        "maxRelations must be a positive integer, got {}",
                        value
                    ))
                })?;
        }
        Ok(config)
    }
}

/// All permutations of `items`, generated in lexicographic index order.
fn permutations(items: &[Relation]) -> Vec<Vec<Relation>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let mut rest: Vec<Relation> = items.to_vec();
        rest.remove(i);
        for mut tail in permutations(&rest) {
            let mut order = Vec::with_capacity(items.len());
            order.push(item.clone());
            order.append(&mut tail);
            result.push(order);
        }
    }
    result
}

impl ProbeOrderStrategy for ExhaustiveProbeOrder {
    fn optimize(
        &self,
        characteristics: &dyn DataCharacteristics,
        predicates: &[BinaryPredicate],
        children: &[Relation],
        cross_products_allowed: bool,
    ) -> Result<(ProbeOrders, ProbeCost), PlanError> {
        if children.len() > self.max_relations {
            return Err(PlanError::Configuration(format!(
                "exhaustive probe-order search over {} inputs exceeds the limit of {}; \
                 use the greedy strategy or raise maxRelations",
                children.len(),
                self.max_relations
            )));
        }

        debug!(
            children = children.len(),
            "exhaustive probe-order search"
        );

        let sorted = children_sorted_by_name(children);
        let mut result: BTreeMap<RelationName, (ProbeOrder, ProbeCost)> = BTreeMap::new();

        for root in &sorted {
            let rest: Vec<Relation> = sorted
                .iter()
                .filter(|r| r.name() != root.name())
                .cloned()
                .collect();

            let mut best: Option<(ProbeOrder, ProbeCost)> = None;
            for tail in permutations(&rest) {
                let mut list = Vec::with_capacity(sorted.len());
                list.push(root.clone());
                list.extend(tail);
                let order = probe_order_for(&list, predicates);
                if !cross_products_allowed && has_cross_step(&order) {
                    continue;
                }
                let cost = probe_order_cost(characteristics, &order)?;
                if best.as_ref().map_or(true, |(_, b)| cost < *b) {
                    best = Some((order, cost));
                }
            }

            match best {
                Some(found) => {
                    result.insert(root.name(), found);
                }
                None => {
                    return Err(PlanError::Configuration(format!(
                        "the predicate graph does not connect '{}' to the other inputs \
                         and cross products are not allowed",
                        root.name()
                    )));
                }
            }
        }

        let orders = ProbeOrders { inner: result };
        let total = orders.total_cost();
        Ok((orders, total))
    }
}

// ---------------------------------------------------------------------------
// Greedy search
// ---------------------------------------------------------------------------

/// Greedy probe-order search: each order is grown by the input producing the
/// smallest next intermediate result. Linear in permutations instead of
/// factorial; the trade-off is that a locally cheap step can lead into a
/// globally more expensive order.
#[derive(Debug, Clone, Default)]
pub struct GreedyProbeOrder;

impl GreedyProbeOrder {
    pub fn from_params(
        _params: &BTreeMap<String, serde_json::Value>,
    ) -> Result<Self, PlanError> {
        Ok(Self)
    }

    fn order_for(
        &self,
        characteristics: &dyn DataCharacteristics,
        predicates: &[BinaryPredicate],
        children: &[Relation],
        root: &Relation,
        cross_products_allowed: bool,
    ) -> Result<(ProbeOrder, ProbeCost), PlanError> {
        let mut remaining: Vec<Relation> = children
            .iter()
            .filter(|r| r.name() != root.name())
            .cloned()
            .collect();

        let mut list = vec![root.clone()];
        let mut placed = root.aliases();
        let mut cost = 0.0;

        while !remaining.is_empty() {
            // Inputs reachable through at least one bindable predicate; only
            // when none is reachable may the order cross, and only if allowed.
            let mut candidates: Vec<usize> = (0..remaining.len())
                .filter(|&i| {
                    !predicates_for_join(predicates, &placed, &remaining[i].aliases()).is_empty()
                })
                .collect();
            if candidates.is_empty() {
                if !cross_products_allowed {
                    return Err(PlanError::Configuration(format!(
                        "the predicate graph does not connect {{{}}} to the remaining inputs \
                         and cross products are not allowed",
                        list.iter()
                            .map(|r| r.name())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )));
                }
                candidates = (0..remaining.len()).collect();
            }

            let mut chosen = candidates[0];
            let mut chosen_size = f64::INFINITY;
            for &i in &candidates {
                let mut extended = placed.clone();
                extended.extend(remaining[i].aliases());
                let size = join_size(characteristics, &extended)?;
                // Strict comparison keeps the lexicographically first input
                // on ties, since `remaining` is sorted by name.
                if size < chosen_size {
                    chosen = i;
                    chosen_size = size;
                }
            }

            let next = remaining.remove(chosen);
            placed.extend(next.aliases());
            cost += chosen_size;
            list.push(next);
        }

        Ok((probe_order_for(&list, predicates), cost))
    }
}

impl ProbeOrderStrategy for GreedyProbeOrder {
    fn optimize(
        &self,
        characteristics: &dyn DataCharacteristics,
        predicates: &[BinaryPredicate],
        children: &[Relation],
        cross_products_allowed: bool,
    ) -> Result<(ProbeOrders, ProbeCost), PlanError> {
        debug!(children = children.len(), "greedy probe-order search");

        let sorted = children_sorted_by_name(children);
        let mut result: BTreeMap<RelationName, (ProbeOrder, ProbeCost)> = BTreeMap::new();
        for root in &sorted {
            let found = self.order_for(
                characteristics,
                predicates,
                &sorted,
                root,
                cross_products_allowed,
            )?;
            result.insert(root.name(), found);
        }

        let orders = ProbeOrders { inner: result };
        let total = orders.total_cost();
        Ok((orders, total))
    }
}
