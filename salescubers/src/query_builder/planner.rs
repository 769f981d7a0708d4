//! Query construction over the sales star schema.
//!
//! Every aggregation query joins the fact table to all three dimension tables,
//! applies the optional year filter, and groups by the grouping sets of the
//! requested shape. Rolled-up dimensions come back as NULL from the database;
//! the `GROUPING()` flags tell them apart from genuine NULL values.

use serde_json::Value;

use crate::classify::RollupMask;
use crate::hierarchy::{schema, Dimension, FieldRef};
use crate::models::{AggregationShape, DimensionValue, ResolvedRequest};
use crate::sql_ast::{
    Aggregation, Function, GroupBy, Join, OrderItem, SelectItem, SelectQuery, SqlBinaryOperator,
    SqlExpr, SqlJoinType, SqlType, TableRef,
};

use super::columns;
use super::grouping::{retained, subsets_for};

pub(crate) fn field_expr(field: FieldRef) -> SqlExpr {
    SqlExpr::column(field.table_alias, field.column)
}

fn fact_column(name: &str) -> SqlExpr {
    SqlExpr::column(schema::FACT_ALIAS, name)
}

fn fact_table() -> TableRef {
    TableRef {
        name: schema::FACT_TABLE.to_string(),
        alias: Some(schema::FACT_ALIAS.to_string()),
    }
}

fn dimension_join(dimension: Dimension) -> Join {
    let table = dimension.table();
    Join {
        join_type: SqlJoinType::Inner,
        table: TableRef {
            name: table.name.to_string(),
            alias: Some(table.alias.to_string()),
        },
        on: vec![SqlExpr::binary(
            SqlBinaryOperator::Eq,
            fact_column(table.key),
            SqlExpr::column(table.alias, table.key),
        )],
    }
}

fn year_filter() -> SqlExpr {
    let dates = Dimension::Temporal.table();
    SqlExpr::binary(
        SqlBinaryOperator::Eq,
        SqlExpr::column(dates.alias, "year"),
        SqlExpr::Placeholder(0),
    )
}

/// `COALESCE(CAST(field AS TEXT), '[Total]')`
fn display_value(field: FieldRef) -> SqlExpr {
    SqlExpr::func(
        Function::Coalesce,
        vec![
            field_expr(field).cast(SqlType::Text),
            SqlExpr::Literal(Value::String(DimensionValue::TOTAL_LABEL.to_string())),
        ],
    )
}

fn grouping_flag(field: FieldRef) -> SqlExpr {
    SqlExpr::func(Function::Grouping, vec![field_expr(field)])
}

fn measure_selects() -> Vec<SelectItem> {
    let quantity = fact_column(schema::QUANTITY);
    let revenue = fact_column(schema::REVENUE);
    let unit_price = SqlExpr::binary(
        SqlBinaryOperator::Divide,
        revenue.clone(),
        SqlExpr::func(
            Function::NullIf,
            vec![quantity.clone(), SqlExpr::Literal(Value::from(0))],
        ),
    );
    vec![
        SelectItem::aliased(
            SqlExpr::aggregate(Aggregation::Sum, quantity).cast(SqlType::BigInt),
            columns::TOTAL_QUANTITY,
        ),
        SelectItem::aliased(
            SqlExpr::aggregate(Aggregation::Sum, revenue).cast(SqlType::Double),
            columns::TOTAL_REVENUE,
        ),
        SelectItem::aliased(
            SqlExpr::aggregate(Aggregation::Count, SqlExpr::Star),
            columns::TRANSACTION_COUNT,
        ),
        SelectItem::aliased(
            SqlExpr::aggregate(Aggregation::Avg, unit_price).cast(SqlType::Double),
            columns::AVG_UNIT_PRICE,
        ),
    ]
}

fn grouping_sets(request: &ResolvedRequest, subsets: &[RollupMask]) -> Vec<Vec<SqlExpr>> {
    subsets
        .iter()
        .map(|mask| {
            retained(*mask)
                .into_iter()
                .map(|d| field_expr(request.field(d)))
                .collect()
        })
        .collect()
}

/// Build the grouped aggregation for `shape`.
///
/// Rows are ordered by the three grouping flags (detail first, grand total
/// last), then by each dimension's text value with rolled-up values last.
pub fn build_aggregation_query(request: &ResolvedRequest, shape: AggregationShape) -> SelectQuery {
    let mut query = SelectQuery {
        from: fact_table(),
        joins: Dimension::ALL.into_iter().map(dimension_join).collect(),
        ..SelectQuery::default()
    };

    for dimension in Dimension::ALL {
        query.select.push(SelectItem::aliased(
            display_value(request.field(dimension)),
            columns::value_column(dimension),
        ));
    }
    for dimension in Dimension::ALL {
        query.select.push(SelectItem::aliased(
            grouping_flag(request.field(dimension)),
            columns::grouping_column(dimension),
        ));
    }
    query.select.extend(measure_selects());

    if request.year.is_some() {
        query.filters.push(year_filter());
    }

    query.group_by = GroupBy::GroupingSets(grouping_sets(request, &subsets_for(shape)));

    for dimension in Dimension::ALL {
        query
            .order_by
            .push(OrderItem::asc(SqlExpr::alias_ref(columns::grouping_column(dimension))));
    }
    for dimension in Dimension::ALL {
        query.order_by.push(
            OrderItem::asc(field_expr(request.field(dimension)).cast(SqlType::Text)).nulls_last(),
        );
    }

    query
}

/// Warehouse-wide statistics, one query each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryQuery {
    TotalRevenue,
    TotalTransactions,
    DateRange,
    DistinctProducts,
    DistinctShops,
}

impl SummaryQuery {
    pub const ALL: [SummaryQuery; 5] = [
        SummaryQuery::TotalRevenue,
        SummaryQuery::TotalTransactions,
        SummaryQuery::DateRange,
        SummaryQuery::DistinctProducts,
        SummaryQuery::DistinctShops,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SummaryQuery::TotalRevenue => "total_revenue",
            SummaryQuery::TotalTransactions => "total_transactions",
            SummaryQuery::DateRange => "date_range",
            SummaryQuery::DistinctProducts => "unique_products",
            SummaryQuery::DistinctShops => "unique_shops",
        }
    }

    pub fn build(self) -> SelectQuery {
        let mut query = SelectQuery {
            from: fact_table(),
            ..SelectQuery::default()
        };
        match self {
            SummaryQuery::TotalRevenue => {
                query.select.push(SelectItem::aliased(
                    SqlExpr::aggregate(Aggregation::Sum, fact_column(schema::REVENUE))
                        .cast(SqlType::Double),
                    columns::TOTAL_REVENUE,
                ));
            }
            SummaryQuery::TotalTransactions => {
                query.select.push(SelectItem::aliased(
                    SqlExpr::aggregate(Aggregation::Count, SqlExpr::Star),
                    columns::TRANSACTION_COUNT,
                ));
            }
            SummaryQuery::DateRange => {
                let dates = Dimension::Temporal.table();
                let full_date = SqlExpr::column(dates.alias, schema::FULL_DATE);
                query.joins.push(dimension_join(Dimension::Temporal));
                query.select.push(SelectItem::aliased(
                    SqlExpr::aggregate(Aggregation::Min, full_date.clone()).cast(SqlType::Text),
                    columns::START_DATE,
                ));
                query.select.push(SelectItem::aliased(
                    SqlExpr::aggregate(Aggregation::Max, full_date).cast(SqlType::Text),
                    columns::END_DATE,
                ));
            }
            SummaryQuery::DistinctProducts => {
                query.select.push(SelectItem::aliased(
                    SqlExpr::aggregate(Aggregation::CountDistinct, fact_column(schema::PRODUCT_KEY)),
                    columns::DISTINCT_COUNT,
                ));
            }
            SummaryQuery::DistinctShops => {
                query.select.push(SelectItem::aliased(
                    SqlExpr::aggregate(Aggregation::CountDistinct, fact_column(schema::SHOP_KEY)),
                    columns::DISTINCT_COUNT,
                ));
            }
        }
        query
    }
}
