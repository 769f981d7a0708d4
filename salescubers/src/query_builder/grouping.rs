//! Grouping-set generation for the aggregation shapes.
//!
//! A grouping subset is described by the dimensions it rolls up, so the same
//! [`RollupMask`] drives query construction and row classification.

use crate::classify::RollupMask;
use crate::hierarchy::Dimension;
use crate::models::AggregationShape;

/// Every subset of the three dimensions, finest first.
pub fn cube_subsets() -> Vec<RollupMask> {
    RollupMask::all().collect()
}

/// Subsets needed for a geography × time by product table:
/// detail, row subtotals, column subtotals, geography totals, grand total.
pub fn cross_table_subsets() -> Vec<RollupMask> {
    vec![
        RollupMask::new(false, false, false),
        RollupMask::new(false, false, true),
        RollupMask::new(false, true, false),
        RollupMask::new(false, true, true),
        RollupMask::new(true, true, true),
    ]
}

pub fn subsets_for(shape: AggregationShape) -> Vec<RollupMask> {
    match shape {
        AggregationShape::Cube => cube_subsets(),
        AggregationShape::CrossTable => cross_table_subsets(),
    }
}

/// Dimensions kept (not rolled up) by a subset, in geo, time, product order.
pub fn retained(mask: RollupMask) -> Vec<Dimension> {
    Dimension::ALL
        .into_iter()
        .filter(|d| !is_rolled_up(mask, *d))
        .collect()
}

pub fn is_rolled_up(mask: RollupMask, dimension: Dimension) -> bool {
    match dimension {
        Dimension::Geographic => mask.geo,
        Dimension::Temporal => mask.time,
        Dimension::Product => mask.product,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn cube_is_the_power_set() {
        let subsets = cube_subsets();
        assert_eq!(subsets.len(), 8);
        let distinct: HashSet<_> = subsets.iter().collect();
        assert_eq!(distinct.len(), 8);
        assert_eq!(subsets.first(), Some(&RollupMask::DETAIL));
        assert_eq!(subsets.last(), Some(&RollupMask::GRAND_TOTAL));
    }

    #[test]
    fn cross_table_omits_geo_rollups_except_grand_total() {
        let subsets = cross_table_subsets();
        assert_eq!(subsets.len(), 5);
        for mask in &subsets {
            if mask.geo {
                assert_eq!(*mask, RollupMask::GRAND_TOTAL);
            }
        }
        assert!(!subsets.contains(&RollupMask::new(true, false, false)));
        assert!(!subsets.contains(&RollupMask::new(true, false, true)));
        assert!(!subsets.contains(&RollupMask::new(true, true, false)));
    }

    #[test]
    fn retained_lists_grouped_dimensions() {
        assert_eq!(
            retained(RollupMask::new(false, true, false)),
            vec![Dimension::Geographic, Dimension::Product]
        );
        assert!(retained(RollupMask::GRAND_TOTAL).is_empty());
    }
}
