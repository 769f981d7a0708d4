//! Aggregation level classification.
//!
//! A result row's level is fully determined by which of the three dimensions
//! were rolled up. Both decision tables are indexed by [`RollupMask::index`],
//! so every boolean triple has exactly one entry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which dimensions a row aggregates away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RollupMask {
    pub geo: bool,
    pub time: bool,
    pub product: bool,
}

impl RollupMask {
    pub const DETAIL: RollupMask = RollupMask::new(false, false, false);
    pub const GRAND_TOTAL: RollupMask = RollupMask::new(true, true, true);

    pub const fn new(geo: bool, time: bool, product: bool) -> Self {
        Self { geo, time, product }
    }

    /// Position in the decision tables: geo is the high bit, product the low bit.
    pub const fn index(self) -> usize {
        ((self.geo as usize) << 2) | ((self.time as usize) << 1) | (self.product as usize)
    }

    pub const fn from_index(idx: usize) -> Self {
        Self::new(idx & 0b100 != 0, idx & 0b010 != 0, idx & 0b001 != 0)
    }

    /// All eight triples in table order (detail first, grand total last).
    pub fn all() -> impl Iterator<Item = RollupMask> {
        (0..8).map(RollupMask::from_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationLevel {
    Detail,
    GeoAndTime,
    GeoAndProduct,
    TimeAndProduct,
    GeoOnly,
    TimeOnly,
    ProductOnly,
    GrandTotal,
}

const CUBE_LEVELS: [AggregationLevel; 8] = [
    AggregationLevel::Detail,         // (0, 0, 0)
    AggregationLevel::GeoAndTime,     // (0, 0, 1)
    AggregationLevel::GeoAndProduct,  // (0, 1, 0)
    AggregationLevel::GeoOnly,        // (0, 1, 1)
    AggregationLevel::TimeAndProduct, // (1, 0, 0)
    AggregationLevel::TimeOnly,       // (1, 0, 1)
    AggregationLevel::ProductOnly,    // (1, 1, 0)
    AggregationLevel::GrandTotal,     // (1, 1, 1)
];

impl AggregationLevel {
    pub fn label(self) -> &'static str {
        match self {
            AggregationLevel::Detail => "Detail Level",
            AggregationLevel::GeoAndTime => "By Geo + Time",
            AggregationLevel::GeoAndProduct => "By Geo + Product",
            AggregationLevel::TimeAndProduct => "By Time + Product",
            AggregationLevel::GeoOnly => "By Geography Only",
            AggregationLevel::TimeOnly => "By Time Only",
            AggregationLevel::ProductOnly => "By Product Only",
            AggregationLevel::GrandTotal => "Grand Total",
        }
    }
}

impl fmt::Display for AggregationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reduced classification used by the cross-table query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossTableLevel {
    Detail,
    RowSubtotal,
    ColumnSubtotal,
    GeographicTotal,
    GrandTotal,
    /// Triple the cross-table grouping sets never produce.
    Unknown,
}

const CROSS_TABLE_LEVELS: [CrossTableLevel; 8] = [
    CrossTableLevel::Detail,          // (0, 0, 0)
    CrossTableLevel::RowSubtotal,     // (0, 0, 1)
    CrossTableLevel::ColumnSubtotal,  // (0, 1, 0)
    CrossTableLevel::GeographicTotal, // (0, 1, 1)
    CrossTableLevel::Unknown,         // (1, 0, 0)
    CrossTableLevel::Unknown,         // (1, 0, 1)
    CrossTableLevel::Unknown,         // (1, 1, 0)
    CrossTableLevel::GrandTotal,      // (1, 1, 1)
];

impl CrossTableLevel {
    pub fn label(self) -> &'static str {
        match self {
            CrossTableLevel::Detail => "Detail",
            CrossTableLevel::RowSubtotal => "Row Subtotal",
            CrossTableLevel::ColumnSubtotal => "Column Subtotal",
            CrossTableLevel::GeographicTotal => "Geographic Total",
            CrossTableLevel::GrandTotal => "Grand Total",
            CrossTableLevel::Unknown => "Other",
        }
    }
}

impl fmt::Display for CrossTableLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn classify(mask: RollupMask) -> AggregationLevel {
    CUBE_LEVELS[mask.index()]
}

pub fn classify_cross_table(mask: RollupMask) -> CrossTableLevel {
    CROSS_TABLE_LEVELS[mask.index()]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn mask_index_round_trips() {
        for idx in 0..8 {
            assert_eq!(RollupMask::from_index(idx).index(), idx);
        }
        assert_eq!(RollupMask::DETAIL.index(), 0);
        assert_eq!(RollupMask::GRAND_TOTAL.index(), 7);
    }

    #[test]
    fn cube_table_is_total_and_injective() {
        let tags: HashSet<_> = RollupMask::all().map(classify).collect();
        assert_eq!(tags.len(), 8);
    }

    #[test]
    fn cube_table_matches_rolled_up_dimensions() {
        assert_eq!(classify(RollupMask::new(false, false, false)), AggregationLevel::Detail);
        assert_eq!(classify(RollupMask::new(false, false, true)), AggregationLevel::GeoAndTime);
        assert_eq!(classify(RollupMask::new(false, true, false)), AggregationLevel::GeoAndProduct);
        assert_eq!(classify(RollupMask::new(true, false, false)), AggregationLevel::TimeAndProduct);
        assert_eq!(classify(RollupMask::new(false, true, true)), AggregationLevel::GeoOnly);
        assert_eq!(classify(RollupMask::new(true, false, true)), AggregationLevel::TimeOnly);
        assert_eq!(classify(RollupMask::new(true, true, false)), AggregationLevel::ProductOnly);
        assert_eq!(classify(RollupMask::new(true, true, true)), AggregationLevel::GrandTotal);
    }

    #[test]
    fn cross_table_unknown_only_for_omitted_subsets() {
        let unknown: Vec<_> = RollupMask::all()
            .filter(|m| classify_cross_table(*m) == CrossTableLevel::Unknown)
            .collect();
        assert_eq!(
            unknown,
            vec![
                RollupMask::new(true, false, false),
                RollupMask::new(true, false, true),
                RollupMask::new(true, true, false),
            ]
        );
        assert_eq!(
            classify_cross_table(RollupMask::new(false, true, true)),
            CrossTableLevel::GeographicTotal
        );
    }
}
