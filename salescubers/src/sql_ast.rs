use serde_json::Value;

use crate::dialect::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Count,
    CountDistinct,
    Avg,
    Min,
    Max,
}

/// Logical scalar types used in casts; dialects pick the spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    BigInt,
    Double,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Function {
    Coalesce,
    NullIf,
    Cast(SqlType),
    Grouping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        name: String,
    },
    Literal(Value),
    /// Positional parameter, zero based.
    Placeholder(usize),
    /// `*`, only meaningful as an aggregate argument.
    Star,
    Function {
        func: Function,
        args: Vec<SqlExpr>,
    },
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Aggregate {
        agg: Aggregation,
        expr: Box<SqlExpr>,
    },
}

impl SqlExpr {
    pub fn column(table: &str, name: &str) -> Self {
        SqlExpr::Column {
            table: Some(table.to_string()),
            name: name.to_string(),
        }
    }

    /// Reference to an output column by its alias.
    pub fn alias_ref(name: &str) -> Self {
        SqlExpr::Column {
            table: None,
            name: name.to_string(),
        }
    }

    pub fn func(func: Function, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Function { func, args }
    }

    pub fn cast(self, ty: SqlType) -> Self {
        SqlExpr::func(Function::Cast(ty), vec![self])
    }

    pub fn aggregate(agg: Aggregation, expr: SqlExpr) -> Self {
        SqlExpr::Aggregate {
            agg,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: SqlBinaryOperator, left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SqlBinaryOperator {
    Divide,
    Eq,
}

#[derive(Debug, Clone)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

impl SelectItem {
    pub fn aliased(expr: SqlExpr, alias: &str) -> Self {
        Self {
            expr,
            alias: Some(alias.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum SqlJoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub join_type: SqlJoinType,
    pub table: TableRef,
    pub on: Vec<SqlExpr>,
}

#[derive(Debug, Clone)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
    pub nulls_last: bool,
}

impl OrderItem {
    pub fn asc(expr: SqlExpr) -> Self {
        Self {
            expr,
            direction: SortDirection::Asc,
            nulls_last: false,
        }
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls_last = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub enum GroupBy {
    #[default]
    None,
    /// `GROUP BY GROUPING SETS ((a, b), (a), ())`.
    GroupingSets(Vec<Vec<SqlExpr>>),
}

#[derive(Debug, Clone, Default)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub group_by: GroupBy,
    pub order_by: Vec<OrderItem>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr);
                match &item.alias {
                    Some(alias) => format!("{expr_sql} AS {}", self.dialect.quote_ident(alias)),
                    None => expr_sql,
                }
            })
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {}",
            select_items.join(", "),
            self.render_table_ref(&query.from)
        );

        for join in &query.joins {
            let join_kw = match join.join_type {
                SqlJoinType::Inner => "JOIN",
                SqlJoinType::Left => "LEFT JOIN",
            };
            let on_clause: Vec<String> = join.on.iter().map(|e| self.render_expr(e)).collect();
            sql.push_str(&format!(
                " {join_kw} {} ON {}",
                self.render_table_ref(&join.table),
                on_clause.join(" AND ")
            ));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query.filters.iter().map(|f| self.render_expr(f)).collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        match &query.group_by {
            GroupBy::None => {}
            GroupBy::GroupingSets(sets) => {
                let rendered: Vec<String> = sets
                    .iter()
                    .map(|set| {
                        let cols: Vec<String> = set.iter().map(|e| self.render_expr(e)).collect();
                        format!("({})", cols.join(", "))
                    })
                    .collect();
                sql.push_str(&format!(" GROUP BY GROUPING SETS ({})", rendered.join(", ")));
            }
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let expr = self.render_expr(&o.expr);
                    let dir = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    if o.nulls_last {
                        format!("{expr} {dir} NULLS LAST")
                    } else {
                        format!("{expr} {dir}")
                    }
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        sql
    }

    fn render_table_ref(&self, table: &TableRef) -> String {
        match &table.alias {
            Some(alias) => format!(
                "{} {}",
                self.dialect.qualify_table(&table.name),
                self.dialect.quote_ident(alias)
            ),
            None => self.dialect.qualify_table(&table.name),
        }
    }

    fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column { table, name } => match table {
                Some(t) => format!(
                    "{}.{}",
                    self.dialect.quote_ident(t),
                    self.dialect.quote_ident(name)
                ),
                None => self.dialect.quote_ident(name),
            },
            SqlExpr::Literal(v) => self.dialect.render_literal(v),
            SqlExpr::Placeholder(idx) => self.dialect.placeholder(*idx),
            SqlExpr::Star => "*".to_string(),
            SqlExpr::Function { func, args } => {
                let rendered_args: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                self.dialect.render_function(func, rendered_args)
            }
            SqlExpr::BinaryOp { op, left, right } => {
                let op_sql = match op {
                    SqlBinaryOperator::Divide => "/",
                    SqlBinaryOperator::Eq => "=",
                };
                format!(
                    "({} {} {})",
                    self.render_expr(left),
                    op_sql,
                    self.render_expr(right)
                )
            }
            SqlExpr::Aggregate { agg, expr } => self
                .dialect
                .render_aggregation(agg, &self.render_expr(expr)),
        }
    }
}
