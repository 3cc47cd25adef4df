//! # Benchmark Presets
//!
//! Fixed numeric characteristics for well-known benchmark schemas, so tests
//! and demos can plan against realistic statistics without wiring up a
//! statistics source.
//!
//! The TPC-H numbers are the scale-factor-1 base table cardinalities used as
//! rates, with join-edge selectivities of `1 / max(NDV)` over the key
//! columns -- the standard containment assumption for equi-joins.

use crate::characteristics::ManualCharacteristics;

/// TPC-H SF=1 relation names and rates with selectivities for the join
/// edges of the schema's key/foreign-key paths.
pub mod tpch {
    use super::*;

    pub const PART: &str = "part";
    pub const PARTSUPP: &str = "partsupp";
    pub const SUPPLIER: &str = "supplier";
    pub const NATION: &str = "nation";
    pub const REGION: &str = "region";
    pub const CUSTOMER: &str = "customer";
    pub const ORDERS: &str = "orders";
    pub const LINEITEM: &str = "lineitem";

    /// Characteristics covering all eight base tables at SF=1.
    pub fn scale_factor_one() -> ManualCharacteristics {
        let mut dc = ManualCharacteristics::new();
        dc.set_rate(PART, 200_000.0);
        dc.set_rate(PARTSUPP, 800_000.0);
        dc.set_rate(SUPPLIER, 10_000.0);
        dc.set_rate(NATION, 25.0);
        dc.set_rate(REGION, 5.0);
        dc.set_rate(CUSTOMER, 150_000.0);
        dc.set_rate(ORDERS, 1_500_000.0);
        dc.set_rate(LINEITEM, 6_001_215.0);

        dc.set_selectivity(PART, PARTSUPP, 1.0 / 200_000.0);
        dc.set_selectivity(PARTSUPP, SUPPLIER, 1.0 / 10_000.0);
        dc.set_selectivity(SUPPLIER, NATION, 1.0 / 25.0);
        dc.set_selectivity(NATION, REGION, 1.0 / 5.0);
        dc.set_selectivity(CUSTOMER, NATION, 1.0 / 25.0);
        dc.set_selectivity(CUSTOMER, ORDERS, 1.0 / 150_000.0);
        dc.set_selectivity(ORDERS, LINEITEM, 1.0 / 1_500_000.0);
        dc.set_selectivity(SUPPLIER, LINEITEM, 1.0 / 10_000.0);
        dc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characteristics::DataCharacteristics;
    use crate::query::RelationAlias;

    #[test]
    fn tpch_covers_all_base_tables() {
        let dc = tpch::scale_factor_one();
        for name in [
            tpch::PART,
            tpch::PARTSUPP,
            tpch::SUPPLIER,
            tpch::NATION,
            tpch::REGION,
            tpch::CUSTOMER,
            tpch::ORDERS,
            tpch::LINEITEM,
        ] {
            assert!(dc.get_rate(&RelationAlias::new(name)).unwrap() > 0.0);
        }
        // Key-path edges are symmetric like everything else.
        let supplier = RelationAlias::new(tpch::SUPPLIER);
        let nation = RelationAlias::new(tpch::NATION);
        assert_eq!(dc.get_selectivity(&nation, &supplier), 1.0 / 25.0);
    }
}
