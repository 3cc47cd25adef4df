//! End-to-end probe-order search tests over realistic join graphs.
//!
//! - A fully connected five-relation query must produce one probe order per
//!   root, each a permutation of the other four relations, for both search
//!   strategies.
//! - The TPC-H Q2 chain (region -- nation -- supplier -- partsupp -- part) is a
//!   regression fixture: the cheapest orders for the `part` and `supplier`
//!   roots are known.

use joinplan_core::characteristics::ManualCharacteristics;
use joinplan_core::presets::tpch;
use joinplan_core::probe_order::{
    ExhaustiveProbeOrder, GreedyProbeOrder, ProbeOrderStrategy,
};
use joinplan_core::query::{relation_of, BinaryPredicate, Relation};
use std::collections::BTreeSet;

fn clique_predicates(names: &[&str]) -> Vec<BinaryPredicate> {
    let mut predicates = Vec::new();
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            predicates.push(BinaryPredicate::equality(
                &format!("{}.k", a),
                &format!("{}.k", b),
            ));
        }
    }
    predicates
}

#[test]
fn five_clique_has_one_full_order_per_root() {
    let names = ["a", "b", "c", "d", "e"];
    let mut dc = ManualCharacteristics::new();
    for (i, name) in names.iter().enumerate() {
        dc.set_rate(*name, 100.0 * (i + 1) as f64);
    }
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            dc.set_selectivity(*a, *b, 0.01);
        }
    }
    let predicates = clique_predicates(&names);
    let children: Vec<Relation> = names.iter().map(|n| relation_of(n)).collect();

    for strategy in [
        Box::new(ExhaustiveProbeOrder::default()) as Box<dyn ProbeOrderStrategy>,
        Box::new(GreedyProbeOrder) as Box<dyn ProbeOrderStrategy>,
    ] {
        let (orders, total) = strategy
            .optimize(&dc, &predicates, &children, false)
            .unwrap();

        assert_eq!(orders.inner.len(), 5);
        assert!(total > 0.0);
        for name in &names {
            let (order, cost) = orders.get(name).unwrap();
            assert_eq!(order.steps[0].relation.name(), *name);
            // Each order visits exactly the other four relations.
            let visited: BTreeSet<String> =
                order.relation_names().into_iter().skip(1).collect();
            let expected: BTreeSet<String> = names
                .iter()
                .filter(|n| *n != name)
                .map(|n| n.to_string())
                .collect();
            assert_eq!(visited, expected);
            assert!(*cost > 0.0);
        }
    }
}

#[test]
fn exhaustive_is_never_beaten_by_greedy_on_the_clique() {
    let names = ["a", "b", "c", "d", "e"];
    let mut dc = ManualCharacteristics::new();
    dc.set_rate("a", 1000.0);
    dc.set_rate("b", 50.0);
    dc.set_rate("c", 700.0);
    dc.set_rate("d", 20.0);
    dc.set_rate("e", 300.0);
    for (i, a) in names.iter().enumerate() {
        for b in &names[i + 1..] {
            dc.set_selectivity(*a, *b, 0.02);
        }
    }
    let predicates = clique_predicates(&names);
    let children: Vec<Relation> = names.iter().map(|n| relation_of(n)).collect();

    let (greedy, _) = GreedyProbeOrder
        .optimize(&dc, &predicates, &children, false)
        .unwrap();
    let (exhaustive, _) = ExhaustiveProbeOrder::default()
        .optimize(&dc, &predicates, &children, false)
        .unwrap();

    for name in &names {
        let (_, greedy_cost) = greedy.get(name).unwrap();
        let (_, exhaustive_cost) = exhaustive.get(name).unwrap();
        assert!(exhaustive_cost <= greedy_cost);
    }
}

#[test]
fn tpch_q2_chain_regression() {
    let dc = tpch::scale_factor_one();
    let children: Vec<Relation> = [
        tpch::PART,
        tpch::PARTSUPP,
        tpch::SUPPLIER,
        tpch::NATION,
        tpch::REGION,
    ]
    .iter()
    .map(|n| relation_of(n))
    .collect();
    let predicates = vec![
        BinaryPredicate::equality("part.partkey", "partsupp.partkey"),
        BinaryPredicate::equality("partsupp.suppkey", "supplier.suppkey"),
        BinaryPredicate::equality("supplier.nationkey", "nation.nationkey"),
        BinaryPredicate::equality("nation.regionkey", "region.regionkey"),
    ];

    let (orders, _) = GreedyProbeOrder
        .optimize(&dc, &predicates, &children, false)
        .unwrap();
    assert_eq!(orders.inner.len(), 5);

    let (part_order, _) = orders.get(tpch::PART).unwrap();
    assert_eq!(
        part_order.relation_names(),
        vec![tpch::PART, tpch::PARTSUPP, tpch::SUPPLIER, tpch::NATION, tpch::REGION]
    );

    // From the supplier root the dimension chain is cheapest first.
    let (supplier_order, _) = orders.get(tpch::SUPPLIER).unwrap();
    assert_eq!(
        supplier_order.relation_names(),
        vec![tpch::SUPPLIER, tpch::NATION, tpch::REGION, tpch::PARTSUPP, tpch::PART]
    );
}
