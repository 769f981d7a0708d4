//! Dimension hierarchies of the sales warehouse.
//!
//! Each dimension has a fixed list of levels ordered from coarsest to finest,
//! and every level is backed by exactly one column of a dimension table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CubeError, Result};

/// Fact table and join layout of the star schema.
pub mod schema {
    pub const FACT_TABLE: &str = "factsales";
    pub const FACT_ALIAS: &str = "f";
    pub const QUANTITY: &str = "quantitysold";
    pub const REVENUE: &str = "revenue";
    pub const PRODUCT_KEY: &str = "productkey";
    pub const SHOP_KEY: &str = "shopkey";
    pub const DATE_KEY: &str = "datekey";
    pub const FULL_DATE: &str = "fulldate";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Geographic,
    Temporal,
    Product,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Geographic, Dimension::Temporal, Dimension::Product];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Geographic => "Geographic",
            Dimension::Temporal => "Time",
            Dimension::Product => "Product",
        }
    }

    /// Dimension table joined to the fact table for this hierarchy.
    pub fn table(self) -> DimensionTable {
        match self {
            Dimension::Geographic => DimensionTable {
                name: "dimshop",
                alias: "s",
                key: schema::SHOP_KEY,
            },
            Dimension::Temporal => DimensionTable {
                name: "dimdate",
                alias: "d",
                key: schema::DATE_KEY,
            },
            Dimension::Product => DimensionTable {
                name: "dimproduct",
                alias: "p",
                key: schema::PRODUCT_KEY,
            },
        }
    }

    pub fn hierarchy(self) -> &'static [Level] {
        match self {
            Dimension::Geographic => GEOGRAPHIC_LEVELS,
            Dimension::Temporal => TEMPORAL_LEVELS,
            Dimension::Product => PRODUCT_LEVELS,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = CubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "geo" | "geographic" | "geography" => Ok(Dimension::Geographic),
            "time" | "temporal" => Ok(Dimension::Temporal),
            "product" => Ok(Dimension::Product),
            other => Err(CubeError::InvalidGranularity(format!(
                "unknown dimension {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionTable {
    pub name: &'static str,
    pub alias: &'static str,
    pub key: &'static str,
}

/// One granularity level and the warehouse column backing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Level {
    pub name: &'static str,
    pub column: &'static str,
}

impl Level {
    const fn new(name: &'static str, column: &'static str) -> Self {
        Self { name, column }
    }
}

/// Fully qualified backing field of a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub table_alias: &'static str,
    pub column: &'static str,
}

const GEOGRAPHIC_LEVELS: &[Level] = &[
    Level::new("country", "countryname"),
    Level::new("region", "regionname"),
    Level::new("city", "cityname"),
    Level::new("shop", "shopname"),
];

const TEMPORAL_LEVELS: &[Level] = &[
    Level::new("year", "year"),
    Level::new("quarter", "quarter"),
    Level::new("month", "month"),
    Level::new("day", "day"),
];

const PRODUCT_LEVELS: &[Level] = &[
    Level::new("productCategory", "productcategoryname"),
    Level::new("productFamily", "productfamilyname"),
    Level::new("productGroup", "productgroupname"),
    Level::new("article", "articlename"),
];

/// Ordered level names of a dimension, coarsest first.
pub fn levels(dimension: Dimension) -> Vec<&'static str> {
    dimension.hierarchy().iter().map(|l| l.name).collect()
}

pub fn level_index(dimension: Dimension, level: &str) -> Result<usize> {
    dimension
        .hierarchy()
        .iter()
        .position(|l| l.name == level)
        .ok_or_else(|| invalid_level(dimension, level))
}

pub fn field(dimension: Dimension, level: &str) -> Result<FieldRef> {
    let idx = level_index(dimension, level)?;
    Ok(FieldRef {
        table_alias: dimension.table().alias,
        column: dimension.hierarchy()[idx].column,
    })
}

fn invalid_level(dimension: Dimension, level: &str) -> CubeError {
    CubeError::InvalidGranularity(format!(
        "invalid {} level {level:?}; must be one of: {}",
        dimension.name().to_ascii_lowercase(),
        levels(dimension).join(", ")
    ))
}
