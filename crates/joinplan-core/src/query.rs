//! # Query Model
//!
//! This module defines the planner's view of a parsed query. Queries are
//! produced by an external parser and treated as read-only inputs here.
//!
//! The central type is [`Relation`]: a base or derived relation described by
//! its input aliases (each with a window), its unary filter predicates, its
//! binary join predicates, and the aggregations/projections it computes.
//! A [`Query`] is the result relation plus the mapping from relation aliases
//! to the physical input names the runtime later binds them to.
//!
//! All predicate hierarchies are closed enums so that exhaustive handling
//! (cost computation, predicate-direction selection, JSON export) is checked
//! by the compiler.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Short name identifying one occurrence of a relation in a query.
///
/// Equality, ordering, and hashing go by the name, so the same alias used in
/// two places refers to the same relation occurrence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationAlias(pub String);

impl RelationAlias {
    pub fn new(inner: impl Into<String>) -> Self {
        Self(inner.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelationAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RelationAlias {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Name of an attribute within a relation.
pub type Attribute = String;

/// Canonical name of a (sub)relation: its sorted input aliases joined.
pub type RelationName = String;

/// A column reference: one attribute of one relation occurrence.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttributeAccess {
    pub relation_alias: RelationAlias,
    pub attribute: Attribute,
}

impl AttributeAccess {
    pub fn new(alias: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            relation_alias: RelationAlias::new(alias),
            attribute: attribute.into(),
        }
    }

    /// Parse a dotted access like `"lineitem.orderkey"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (alias, attribute) = s.split_once('.')?;
        if alias.is_empty() || attribute.is_empty() {
            return None;
        }
        Some(Self::new(alias, attribute))
    }
}

impl fmt::Display for AttributeAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.relation_alias, self.attribute)
    }
}

/// Constant values appearing in unary predicates.
///
/// Floats are wrapped in `OrderedFloat` so predicates can be used as set
/// members and map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConstantValue {
    Bool(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    Text(String),
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Bool(v) => write!(f, "{}", v),
            ConstantValue::Integer(v) => write!(f, "{}", v),
            ConstantValue::Float(v) => write!(f, "{}", v),
            ConstantValue::Text(v) => write!(f, "'{}'", v),
        }
    }
}

/// A predicate over a single relation: attribute vs. constant, or LIKE.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnaryPredicate {
    ConstantEquality {
        attribute_access: AttributeAccess,
        constant: ConstantValue,
    },
    LessThanConstant {
        attribute_access: AttributeAccess,
        constant: ConstantValue,
    },
    LessOrEqualConstant {
        attribute_access: AttributeAccess,
        constant: ConstantValue,
    },
    GreaterThanConstant {
        attribute_access: AttributeAccess,
        constant: ConstantValue,
    },
    GreaterOrEqualConstant {
        attribute_access: AttributeAccess,
        constant: ConstantValue,
    },
    Like {
        attribute_access: AttributeAccess,
        pattern: String,
    },
}

impl UnaryPredicate {
    pub fn attribute_access(&self) -> &AttributeAccess {
        match self {
            UnaryPredicate::ConstantEquality { attribute_access, .. }
            | UnaryPredicate::LessThanConstant { attribute_access, .. }
            | UnaryPredicate::LessOrEqualConstant { attribute_access, .. }
            | UnaryPredicate::GreaterThanConstant { attribute_access, .. }
            | UnaryPredicate::GreaterOrEqualConstant { attribute_access, .. }
            | UnaryPredicate::Like { attribute_access, .. } => attribute_access,
        }
    }

    pub fn relation_alias(&self) -> &RelationAlias {
        &self.attribute_access().relation_alias
    }
}

impl fmt::Display for UnaryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryPredicate::ConstantEquality { attribute_access, constant } => {
                write!(f, "{} = {}", attribute_access, constant)
            }
            UnaryPredicate::LessThanConstant { attribute_access, constant } => {
                write!(f, "{} < {}", attribute_access, constant)
            }
            UnaryPredicate::LessOrEqualConstant { attribute_access, constant } => {
                write!(f, "{} <= {}", attribute_access, constant)
            }
            UnaryPredicate::GreaterThanConstant { attribute_access, constant } => {
                write!(f, "{} > {}", attribute_access, constant)
            }
            UnaryPredicate::GreaterOrEqualConstant { attribute_access, constant } => {
                write!(f, "{} >= {}", attribute_access, constant)
            }
            UnaryPredicate::Like { attribute_access, pattern } => {
                write!(f, "{} LIKE '{}'", attribute_access, pattern)
            }
        }
    }
}

/// A comparison between attributes of two different relations.
///
/// In `a.x = b.y` the left access is `a.x` and the right access is `b.y`.
/// The same predicate object is evaluated at both relations' stores; which
/// side refers to the stored tuple is decided when the predicate is attached
/// to a store (see `physical::rules::BinaryPredicateEvaluation`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BinaryPredicate {
    Equality {
        left: AttributeAccess,
        right: AttributeAccess,
    },
    LessThan {
        left: AttributeAccess,
        right: AttributeAccess,
    },
    GreaterThan {
        left: AttributeAccess,
        right: AttributeAccess,
    },
}

impl BinaryPredicate {
    /// Equality predicate from dotted accesses, e.g. `equality("a.x", "b.y")`.
    pub fn equality(left: &str, right: &str) -> Self {
        BinaryPredicate::Equality {
            left: AttributeAccess::parse(left).unwrap_or_else(|| AttributeAccess::new(left, "")),
            right: AttributeAccess::parse(right).unwrap_or_else(|| AttributeAccess::new(right, "")),
        }
    }

    pub fn left(&self) -> &AttributeAccess {
        match self {
            BinaryPredicate::Equality { left, .. }
            | BinaryPredicate::LessThan { left, .. }
            | BinaryPredicate::GreaterThan { left, .. } => left,
        }
    }

    pub fn right(&self) -> &AttributeAccess {
        match self {
            BinaryPredicate::Equality { right, .. }
            | BinaryPredicate::LessThan { right, .. }
            | BinaryPredicate::GreaterThan { right, .. } => right,
        }
    }

    pub fn left_alias(&self) -> &RelationAlias {
        &self.left().relation_alias
    }

    pub fn right_alias(&self) -> &RelationAlias {
        &self.right().relation_alias
    }

    /// Whether this predicate links the two alias sets (one endpoint in each).
    pub fn connects(
        &self,
        from: &BTreeSet<RelationAlias>,
        to: &BTreeSet<RelationAlias>,
    ) -> bool {
        from.contains(self.left_alias()) && to.contains(self.right_alias())
            || from.contains(self.right_alias()) && to.contains(self.left_alias())
    }
}

impl fmt::Display for BinaryPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryPredicate::Equality { left, right } => write!(f, "{} = {}", left, right),
            BinaryPredicate::LessThan { left, right } => write!(f, "{} < {}", left, right),
            BinaryPredicate::GreaterThan { left, right } => write!(f, "{} > {}", left, right),
        }
    }
}

/// Window over an input stream: unbounded, time-based, or count-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WindowDefinition {
    pub variant: WindowVariant,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WindowVariant {
    None,
    TimeInSeconds,
    Count,
}

impl WindowDefinition {
    pub fn infinite() -> Self {
        Self { variant: WindowVariant::None, amount: 0 }
    }

    pub fn seconds(seconds: i64) -> Self {
        Self { variant: WindowVariant::TimeInSeconds, amount: seconds }
    }

    pub fn minutes(minutes: i64) -> Self {
        Self::seconds(minutes * 60)
    }

    pub fn hours(hours: i64) -> Self {
        Self::seconds(hours * 60 * 60)
    }

    pub fn count(count: i64) -> Self {
        Self { variant: WindowVariant::Count, amount: count }
    }
}

impl fmt::Display for WindowDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variant {
            WindowVariant::None => write!(f, "[∞]"),
            WindowVariant::TimeInSeconds => write!(f, "[{} s]", self.amount),
            WindowVariant::Count => write!(f, "[{} t]", self.amount),
        }
    }
}

/// Output column of a relation: one attribute access under an output alias.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Projection {
    pub attribute_access: AttributeAccess,
    pub alias: String,
}

/// Aggregate functions supported by aggregation stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// One aggregate computation, e.g. `SUM(l.price) AS revenue`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AggregationOperation {
    pub function: AggregateFunction,
    pub attribute_access: AttributeAccess,
    pub alias: String,
}

/// Grouped aggregation: group-by keys plus the aggregate operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Aggregation {
    pub group_by: Vec<AttributeAccess>,
    pub operations: Vec<AggregationOperation>,
}

/// A base or derived relation.
///
/// Built by the external parser and never mutated by the planner. Derived
/// relations (sub-relations, joins) are fresh values created through the
/// methods below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Input aliases and the window each one carries.
    pub inputs: BTreeMap<RelationAlias, WindowDefinition>,
    /// Unary predicates over single inputs.
    pub filters: Vec<UnaryPredicate>,
    /// Binary join predicates between inputs.
    pub join_predicates: Vec<BinaryPredicate>,
    pub aggregations: Vec<Aggregation>,
    pub projections: Vec<Projection>,
    /// Alias under which this relation itself is known.
    pub alias: RelationAlias,
}

impl Relation {
    /// The set of input aliases of this relation.
    pub fn aliases(&self) -> BTreeSet<RelationAlias> {
        self.inputs.keys().cloned().collect()
    }

    pub fn contains_alias(&self, alias: &RelationAlias) -> bool {
        self.inputs.contains_key(alias)
    }

    /// Canonical name: the sorted input aliases joined together. Two
    /// sub-relations over the same inputs share one name, which is what the
    /// physical graph keys its store and producer maps by.
    pub fn name(&self) -> RelationName {
        self.inputs
            .keys()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Restriction of this relation to the given aliases: keeps the matching
    /// windows, the filters over them, and the join predicates whose both
    /// endpoints survive.
    pub fn sub_relation(&self, aliases: &[RelationAlias]) -> Relation {
        let keep: BTreeSet<&RelationAlias> = aliases.iter().collect();
        Relation {
            inputs: self
                .inputs
                .iter()
                .filter(|(a, _)| keep.contains(a))
                .map(|(a, w)| (a.clone(), *w))
                .collect(),
            filters: self
                .filters
                .iter()
                .filter(|p| keep.contains(p.relation_alias()))
                .cloned()
                .collect(),
            join_predicates: self
                .join_predicates
                .iter()
                .filter(|p| keep.contains(p.left_alias()) && keep.contains(p.right_alias()))
                .cloned()
                .collect(),
            aggregations: Vec::new(),
            projections: self
                .projections
                .iter()
                .filter(|p| keep.contains(&p.attribute_access.relation_alias))
                .cloned()
                .collect(),
            alias: RelationAlias::new(
                aliases
                    .iter()
                    .map(|a| a.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }

    /// One single-input relation per input alias, carrying that alias'
    /// window, filters, and projections.
    pub fn base_relations(&self) -> Vec<Relation> {
        self.inputs
            .keys()
            .map(|alias| self.sub_relation(std::slice::from_ref(alias)))
            .collect()
    }

    /// Just the inputs and join predicates, with filters, aggregations, and
    /// projections stripped.
    pub fn just_input(&self) -> Relation {
        Relation {
            inputs: self.inputs.clone(),
            filters: Vec::new(),
            join_predicates: self.join_predicates.clone(),
            aggregations: Vec::new(),
            projections: Vec::new(),
            alias: self.alias.clone(),
        }
    }

    /// This relation without its aggregations, but still projecting every
    /// attribute the aggregations require.
    pub fn without_aggregation(&self) -> Relation {
        let mut projections = self.projections.clone();
        for aggregation in &self.aggregations {
            for access in aggregation
                .group_by
                .iter()
                .chain(aggregation.operations.iter().map(|op| &op.attribute_access))
            {
                projections.push(Projection {
                    attribute_access: access.clone(),
                    alias: access.to_string(),
                });
            }
        }
        Relation {
            inputs: self.inputs.clone(),
            filters: self.filters.clone(),
            join_predicates: self.join_predicates.clone(),
            aggregations: Vec::new(),
            projections,
            alias: self.alias.clone(),
        }
    }

    /// The smallest window amount over all bounded inputs, or 0 when every
    /// input is unbounded. Storage costs scale by this factor.
    pub fn window_multiplier(&self) -> i64 {
        self.inputs
            .values()
            .filter(|w| w.variant != WindowVariant::None)
            .map(|w| w.amount)
            .min()
            .unwrap_or(0)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let windows: Vec<String> = self
            .inputs
            .iter()
            .map(|(a, w)| format!("{}{}", a, w))
            .collect();
        let predicates: Vec<String> = self
            .filters
            .iter()
            .map(|p| p.to_string())
            .chain(self.join_predicates.iter().map(|p| p.to_string()))
            .collect();
        write!(f, "<{{{}}}, {{{}}}>", windows.join(", "), predicates.join(", "))
    }
}

/// A single-input relation with an unbounded window and no predicates.
pub fn relation_of(name: &str) -> Relation {
    let alias = RelationAlias::new(name);
    let mut inputs = BTreeMap::new();
    inputs.insert(alias.clone(), WindowDefinition::infinite());
    Relation {
        inputs,
        filters: Vec::new(),
        join_predicates: Vec::new(),
        aggregations: Vec::new(),
        projections: Vec::new(),
        alias,
    }
}

/// Join of two relations. Keeps both sides' windows, filters, aggregations,
/// and projections, and adds every passed predicate whose endpoints both lie
/// within the combined alias set.
pub fn join_relations(
    left: &Relation,
    right: &Relation,
    predicates: &[BinaryPredicate],
) -> Relation {
    let mut inputs = left.inputs.clone();
    inputs.extend(right.inputs.iter().map(|(a, w)| (a.clone(), *w)));

    let aliases: BTreeSet<RelationAlias> = inputs.keys().cloned().collect();
    let mut join_predicates: BTreeSet<BinaryPredicate> = left
        .join_predicates
        .iter()
        .chain(right.join_predicates.iter())
        .cloned()
        .collect();
    for predicate in predicates {
        if aliases.contains(predicate.left_alias()) && aliases.contains(predicate.right_alias()) {
            join_predicates.insert(predicate.clone());
        }
    }

    Relation {
        inputs,
        filters: left.filters.iter().chain(right.filters.iter()).cloned().collect(),
        join_predicates: join_predicates.into_iter().collect(),
        aggregations: left
            .aggregations
            .iter()
            .chain(right.aggregations.iter())
            .cloned()
            .collect(),
        projections: left
            .projections
            .iter()
            .chain(right.projections.iter())
            .cloned()
            .collect(),
        alias: RelationAlias::new(format!("{}-{}", left.alias, right.alias)),
    }
}

/// Whether joining the two alias sets under the given predicates would be a
/// cross product, i.e. no predicate links them.
pub fn is_cross_product_aliases(
    predicates: &[BinaryPredicate],
    left: &BTreeSet<RelationAlias>,
    right: &BTreeSet<RelationAlias>,
) -> bool {
    !predicates.iter().any(|p| p.connects(left, right))
}

/// Whether extending the joined relations by `candidate` crosses without a
/// connecting predicate.
pub fn is_cross_product(
    predicates: &[BinaryPredicate],
    joined: &[Relation],
    candidate: &Relation,
) -> bool {
    let left: BTreeSet<RelationAlias> = joined.iter().flat_map(|r| r.aliases()).collect();
    let right = candidate.aliases();
    is_cross_product_aliases(predicates, &left, &right)
}

/// Physical input name a relation alias is bound to by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InputName(pub String);

/// A parsed query: the result relation plus the input binding map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub result: Relation,
    pub input_map: BTreeMap<RelationAlias, InputName>,
}

impl Query {
    /// Query over the given result relation, binding every input alias to an
    /// input of the same name.
    pub fn from_relation(result: Relation) -> Self {
        let input_map = result
            .inputs
            .keys()
            .map(|a| (a.clone(), InputName(a.0.clone())))
            .collect();
        Self { result, input_map }
    }

    pub fn relation_count(&self) -> usize {
        self.input_map.len()
    }
}
