//! Deferred object queries
//!
//! An [`ObjectQuery`] composes filters, ordering, projection, and pagination
//! against one registered type and renders a parameterized SELECT only when a
//! terminal accessor executes it. Filters added one after another compose
//! conjunctively.

use std::sync::Arc;

use sqlx::{PgPool, Row};

use crate::error::{Result, StoreError};
use crate::record::DataRecord;
use crate::sql::bind::{bind_param, decode_record};
use crate::sql::condition::{column_sql, render_filter, render_order_by};
use crate::sql::sanitize::{qualify, quote_identifier};
use crate::typeinfo::{CoupledInclusion, ObjectTypeInfo};
use crate::value::ScalarValue;

/// Comparison operator for a column filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// Filter tree rendered into a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Compare {
        column: String,
        op: CompareOp,
        value: ScalarValue,
    },
    Like {
        column: String,
        pattern: String,
    },
    In {
        column: String,
        values: Vec<ScalarValue>,
    },
    IsNull {
        column: String,
    },
    IsNotNull {
        column: String,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Filter::Compare {
            column: column.into(),
            op: CompareOp::Eq,
            value: value.into(),
        }
    }

    pub fn ne(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Filter::Compare {
            column: column.into(),
            op: CompareOp::Ne,
            value: value.into(),
        }
    }

    pub fn gt(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Filter::Compare {
            column: column.into(),
            op: CompareOp::Gt,
            value: value.into(),
        }
    }

    pub fn gte(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Filter::Compare {
            column: column.into(),
            op: CompareOp::Gte,
            value: value.into(),
        }
    }

    pub fn lt(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Filter::Compare {
            column: column.into(),
            op: CompareOp::Lt,
            value: value.into(),
        }
    }

    pub fn lte(column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        Filter::Compare {
            column: column.into(),
            op: CompareOp::Lte,
            value: value.into(),
        }
    }

    pub fn contains(column: impl Into<String>, fragment: &str) -> Self {
        Filter::Like {
            column: column.into(),
            pattern: format!("%{}%", fragment),
        }
    }

    pub fn starts_with(column: impl Into<String>, prefix: &str) -> Self {
        Filter::Like {
            column: column.into(),
            pattern: format!("{}%", prefix),
        }
    }

    pub fn ends_with(column: impl Into<String>, suffix: &str) -> Self {
        Filter::Like {
            column: column.into(),
            pattern: format!("%{}", suffix),
        }
    }

    pub fn is_in(
        column: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<ScalarValue>>,
    ) -> Self {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull {
            column: column.into(),
        }
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Filter::IsNotNull {
            column: column.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Filter::Or(filters)
    }

    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Deferred query against one registered type
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    type_info: Arc<ObjectTypeInfo>,
    filters: Vec<Filter>,
    order_by: Vec<(String, SortOrder)>,
    top_n: Option<i64>,
    offset: Option<i64>,
    columns: Option<Vec<String>>,
    coupled: CoupledInclusion,
}

impl ObjectQuery {
    /// Start a query over a type; coupled inclusion defaults from the
    /// descriptor
    pub fn new(type_info: Arc<ObjectTypeInfo>) -> Self {
        let coupled = type_info.coupled_inclusion;
        Self {
            type_info,
            filters: Vec::new(),
            order_by: Vec::new(),
            top_n: None,
            offset: None,
            columns: None,
            coupled,
        }
    }

    /// Add a filter; successive filters compose conjunctively
    pub fn where_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Shorthand for an equality filter
    pub fn where_eq(self, column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.where_filter(Filter::eq(column, value))
    }

    /// Shorthand for a LIKE filter matching a substring
    pub fn where_contains(self, column: impl Into<String>, fragment: &str) -> Self {
        self.where_filter(Filter::contains(column, fragment))
    }

    /// Append an ascending sort key
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by.push((column.into(), SortOrder::Asc));
        self
    }

    /// Append a descending sort key
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push((column.into(), SortOrder::Desc));
        self
    }

    /// Limit the result to the first `n` rows
    pub fn top_n(mut self, n: i64) -> Self {
        self.top_n = Some(n);
        self
    }

    /// Skip `n` rows
    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Project a subset of columns instead of the full column list
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Override coupled-table participation for this query
    pub fn coupled(mut self, inclusion: CoupledInclusion) -> Self {
        self.coupled = inclusion;
        self
    }

    fn joined(&self) -> bool {
        self.type_info.coupled.is_some() && self.coupled != CoupledInclusion::None
    }

    fn column_sql(&self, column: &str, joined: bool) -> Result<String> {
        column_sql(&self.type_info, joined, column)
    }

    fn select_list(&self, joined: bool) -> Result<String> {
        if let Some(columns) = &self.columns {
            if columns.is_empty() {
                return Err(StoreError::invalid_query("Empty column projection"));
            }
            let mut parts = Vec::with_capacity(columns.len());
            for column in columns {
                parts.push(self.column_sql(column, joined)?);
            }
            return Ok(parts.join(", "));
        }

        let mut parts: Vec<String> = self
            .type_info
            .base_columns()
            .iter()
            .map(|c| self.column_sql(c, joined))
            .collect::<Result<_>>()?;

        if joined && self.coupled == CoupledInclusion::Complete {
            for column in self.type_info.coupled_columns() {
                parts.push(self.column_sql(column, joined)?);
            }
        }

        Ok(parts.join(", "))
    }

    fn from_clause(&self, joined: bool) -> String {
        let base = quote_identifier(&self.type_info.table_name);
        let coupled = match &self.type_info.coupled {
            Some(coupled) if joined => coupled,
            _ => return base,
        };
        format!(
            "{} INNER JOIN {} ON {} = {}",
            base,
            quote_identifier(&coupled.table_name),
            qualify(&self.type_info.table_name, &self.type_info.id_column),
            qualify(&coupled.table_name, &coupled.join_column),
        )
    }

    fn where_clause(
        &self,
        joined: bool,
        param_offset: &mut i32,
    ) -> Result<(String, Vec<ScalarValue>)> {
        if self.filters.is_empty() {
            return Ok(("TRUE".to_string(), Vec::new()));
        }

        let mut clauses = Vec::with_capacity(self.filters.len());
        let mut params = Vec::new();
        for filter in &self.filters {
            let (clause, mut filter_params) =
                render_filter(&self.type_info, joined, filter, param_offset)?;
            clauses.push(format!("({})", clause));
            params.append(&mut filter_params);
        }
        Ok((clauses.join(" AND "), params))
    }

    /// Render the SELECT statement and its parameters without executing it
    pub fn to_sql(&self) -> Result<(String, Vec<ScalarValue>)> {
        let joined = self.joined();
        let mut param_offset = 1;

        let (where_clause, params) = self.where_clause(joined, &mut param_offset)?;
        let order_by = render_order_by(&self.type_info, joined, &self.order_by)?;

        let mut sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY {}",
            self.select_list(joined)?,
            self.from_clause(joined),
            where_clause,
            order_by,
        );

        if self.top_n.is_some() {
            sql.push_str(&format!(" LIMIT ${}", param_offset));
            param_offset += 1;
        }
        if self.offset.is_some() {
            sql.push_str(&format!(" OFFSET ${}", param_offset));
        }

        Ok((sql, params))
    }

    fn count_sql(&self) -> Result<(String, Vec<ScalarValue>)> {
        let joined = self.joined();
        let mut param_offset = 1;
        let (where_clause, params) = self.where_clause(joined, &mut param_offset)?;

        Ok((
            format!(
                "SELECT COUNT(*) FROM {} WHERE {}",
                self.from_clause(joined),
                where_clause
            ),
            params,
        ))
    }

    /// Execute and decode every matching row
    pub async fn fetch_all(&self, pool: &PgPool) -> Result<Vec<DataRecord>> {
        let joined = self.joined();
        let include_coupled = joined && self.coupled == CoupledInclusion::Complete;
        let (sql, params) = self.to_sql()?;

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = bind_param(query, param)?;
        }
        if let Some(n) = self.top_n {
            query = query.bind(n);
        }
        if let Some(offset) = self.offset {
            query = query.bind(offset);
        }

        let rows = query.fetch_all(pool).await?;
        Ok(rows
            .iter()
            .map(|row| decode_record(row, &self.type_info, include_coupled))
            .collect())
    }

    /// Execute and return the first row, or `None` on an empty result
    pub async fn first_or_default(&self, pool: &PgPool) -> Result<Option<DataRecord>> {
        let query = if self.top_n.is_some() {
            self.clone()
        } else {
            self.clone().top_n(1)
        };
        let mut records = query.fetch_all(pool).await?;
        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records.swap_remove(0)))
        }
    }

    /// Execute a COUNT(*) over the same filters
    pub async fn count(&self, pool: &PgPool) -> Result<i64> {
        let (sql, params) = self.count_sql()?;

        let mut query = sqlx::query(&sql);
        for param in &params {
            query = bind_param(query, param)?;
        }

        let row = query.fetch_one(pool).await?;
        let count: i64 = row.try_get(0)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::{FieldDefinition, FieldKind};

    fn product_info() -> Arc<ObjectTypeInfo> {
        Arc::new(
            ObjectTypeInfo::new("shop.product", "shop_product", "product_id")
                .with_code_name("product_name")
                .with_fields(vec![
                    FieldDefinition::new("product_price", FieldKind::decimal(10, 2)),
                    FieldDefinition::new("product_enabled", FieldKind::Bool),
                ]),
        )
    }

    fn coupled_product_info() -> Arc<ObjectTypeInfo> {
        Arc::new(
            ObjectTypeInfo::new("shop.product", "shop_product", "product_id")
                .with_code_name("product_name")
                .with_fields(vec![FieldDefinition::new(
                    "product_enabled",
                    FieldKind::Bool,
                )])
                .with_coupled(
                    "shop_product_ext",
                    "ext_product_id",
                    vec![FieldDefinition::new("ext_weight", FieldKind::decimal(10, 3))],
                ),
        )
    }

    #[test]
    fn test_plain_select() {
        let (sql, params) = ObjectQuery::new(product_info()).to_sql().unwrap();

        assert_eq!(
            sql,
            "SELECT \"product_id\", \"product_name\", \"product_price\", \"product_enabled\" \
             FROM \"shop_product\" WHERE TRUE ORDER BY \"product_id\" ASC"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_successive_wheres_compose_conjunctively() {
        let (sql, params) = ObjectQuery::new(product_info())
            .where_eq("product_enabled", true)
            .where_filter(Filter::gt("product_price", 10i64))
            .to_sql()
            .unwrap();

        assert!(sql.contains("(\"product_enabled\" = $1) AND (\"product_price\" > $2)"));
        assert_eq!(
            params,
            vec![ScalarValue::Bool(true), ScalarValue::Integer(10)]
        );
    }

    #[test]
    fn test_order_by_top_n_offset() {
        let (sql, params) = ObjectQuery::new(product_info())
            .where_eq("product_enabled", true)
            .order_by_desc("product_price")
            .order_by("product_name")
            .top_n(5)
            .offset(10)
            .to_sql()
            .unwrap();

        assert!(sql.contains("ORDER BY \"product_price\" DESC, \"product_name\" ASC"));
        assert!(sql.ends_with("LIMIT $2 OFFSET $3"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_column_projection() {
        let (sql, _) = ObjectQuery::new(product_info())
            .columns(&["product_name", "product_price"])
            .to_sql()
            .unwrap();

        assert!(sql.starts_with("SELECT \"product_name\", \"product_price\" FROM"));
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let err = ObjectQuery::new(product_info())
            .where_eq("missing", 1i64)
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));

        let err = ObjectQuery::new(product_info())
            .order_by("missing")
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_coupled_complete_joins_and_projects() {
        let (sql, _) = ObjectQuery::new(coupled_product_info()).to_sql().unwrap();

        assert!(sql.contains(
            "FROM \"shop_product\" INNER JOIN \"shop_product_ext\" \
             ON \"shop_product\".\"product_id\" = \"shop_product_ext\".\"ext_product_id\""
        ));
        assert!(sql.contains("\"shop_product_ext\".\"ext_weight\""));
        assert!(sql.contains("\"shop_product\".\"product_id\""));
    }

    #[test]
    fn test_coupled_inner_query_only_joins_without_projection() {
        let (sql, params) = ObjectQuery::new(coupled_product_info())
            .coupled(CoupledInclusion::InnerQueryOnly)
            .where_filter(Filter::gt("ext_weight", 5i64))
            .to_sql()
            .unwrap();

        assert!(sql.contains("INNER JOIN \"shop_product_ext\""));
        assert!(sql.contains("\"shop_product_ext\".\"ext_weight\" > $1"));
        assert!(!sql[..sql.find("FROM").unwrap()].contains("ext_weight"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_coupled_none_stays_on_base_table() {
        let (sql, _) = ObjectQuery::new(coupled_product_info())
            .coupled(CoupledInclusion::None)
            .to_sql()
            .unwrap();

        assert!(!sql.contains("INNER JOIN"));
        assert!(!sql.contains("ext_weight"));
    }

    #[test]
    fn test_coupled_column_without_join_is_rejected() {
        let err = ObjectQuery::new(coupled_product_info())
            .coupled(CoupledInclusion::None)
            .where_filter(Filter::gt("ext_weight", 5i64))
            .to_sql()
            .unwrap_err();

        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_filter_helpers() {
        assert_eq!(
            Filter::contains("product_name", "wid"),
            Filter::Like {
                column: "product_name".into(),
                pattern: "%wid%".into()
            }
        );
        assert_eq!(
            Filter::starts_with("product_name", "a"),
            Filter::Like {
                column: "product_name".into(),
                pattern: "a%".into()
            }
        );
        assert_eq!(
            Filter::ends_with("product_name", "z"),
            Filter::Like {
                column: "product_name".into(),
                pattern: "%z".into()
            }
        );
    }
}
