//! WHERE and ORDER BY rendering
//!
//! Converts a [`Filter`](crate::query::Filter) tree into a parameterized SQL
//! fragment. Column references are validated against the type descriptor and
//! quoted; literals become `$n` placeholders with a running offset so
//! fragments compose into larger statements.

use crate::error::{Result, StoreError};
use crate::query::{Filter, SortOrder};
use crate::sql::sanitize::{qualify, quote_identifier};
use crate::typeinfo::{ColumnTable, ObjectTypeInfo};
use crate::value::ScalarValue;

/// Render one validated, quoted column reference.
///
/// `joined` reflects whether the coupled table participates in the statement;
/// coupled columns are only reachable then, and all references are
/// table-qualified to stay unambiguous.
pub(crate) fn column_sql(
    type_info: &ObjectTypeInfo,
    joined: bool,
    column: &str,
) -> Result<String> {
    match type_info.column_table(column) {
        Some(ColumnTable::Base) => Ok(if joined {
            qualify(&type_info.table_name, column)
        } else {
            quote_identifier(column)
        }),
        Some(ColumnTable::Coupled) => {
            if !joined {
                return Err(StoreError::invalid_query(format!(
                    "Column '{}' lives in the coupled table; the query does not include it",
                    column
                )));
            }
            let table = type_info
                .coupled
                .as_ref()
                .map(|c| c.table_name.as_str())
                .unwrap_or_default();
            Ok(qualify(table, column))
        }
        None => Err(StoreError::invalid_query(format!(
            "Unknown column '{}' for object type '{}'",
            column, type_info.object_type
        ))),
    }
}

/// Render a filter tree.
///
/// Returns the clause text and the parameter values in placeholder order;
/// `param_offset` is advanced past the placeholders this fragment consumed.
pub fn render_filter(
    type_info: &ObjectTypeInfo,
    joined: bool,
    filter: &Filter,
    param_offset: &mut i32,
) -> Result<(String, Vec<ScalarValue>)> {
    match filter {
        Filter::Compare { column, op, value } => {
            let column = column_sql(type_info, joined, column)?;

            if value.is_null() {
                let clause = match op {
                    crate::query::CompareOp::Eq => format!("{} IS NULL", column),
                    crate::query::CompareOp::Ne => format!("{} IS NOT NULL", column),
                    _ => {
                        return Err(StoreError::invalid_query(
                            "Only equality comparisons may use NULL",
                        ));
                    }
                };
                return Ok((clause, Vec::new()));
            }

            let clause = format!("{} {} ${}", column, op.sql(), param_offset);
            *param_offset += 1;
            Ok((clause, vec![value.clone()]))
        }
        Filter::Like { column, pattern } => {
            let column = column_sql(type_info, joined, column)?;
            let clause = format!("{} LIKE ${}", column, param_offset);
            *param_offset += 1;
            Ok((clause, vec![ScalarValue::Text(pattern.clone())]))
        }
        Filter::In { column, values } => {
            let column = column_sql(type_info, joined, column)?;
            if values.is_empty() {
                return Ok(("FALSE".to_string(), Vec::new()));
            }
            if values.iter().any(ScalarValue::is_null) {
                return Err(StoreError::invalid_query("IN list cannot contain NULL"));
            }

            let placeholders: Vec<String> = (0..values.len())
                .map(|i| format!("${}", *param_offset + i as i32))
                .collect();
            *param_offset += values.len() as i32;

            Ok((
                format!("{} IN ({})", column, placeholders.join(", ")),
                values.clone(),
            ))
        }
        Filter::IsNull { column } => {
            let column = column_sql(type_info, joined, column)?;
            Ok((format!("{} IS NULL", column), Vec::new()))
        }
        Filter::IsNotNull { column } => {
            let column = column_sql(type_info, joined, column)?;
            Ok((format!("{} IS NOT NULL", column), Vec::new()))
        }
        Filter::And(filters) => render_group(type_info, joined, filters, " AND ", param_offset),
        Filter::Or(filters) => render_group(type_info, joined, filters, " OR ", param_offset),
        Filter::Not(inner) => {
            let (clause, params) = render_filter(type_info, joined, inner, param_offset)?;
            Ok((format!("NOT ({})", clause), params))
        }
    }
}

fn render_group(
    type_info: &ObjectTypeInfo,
    joined: bool,
    filters: &[Filter],
    separator: &str,
    param_offset: &mut i32,
) -> Result<(String, Vec<ScalarValue>)> {
    if filters.is_empty() {
        return Err(StoreError::invalid_query(
            "Grouped condition requires at least one filter",
        ));
    }

    let mut clauses = Vec::with_capacity(filters.len());
    let mut params = Vec::new();
    for filter in filters {
        let (clause, mut filter_params) = render_filter(type_info, joined, filter, param_offset)?;
        clauses.push(format!("({})", clause));
        params.append(&mut filter_params);
    }
    Ok((clauses.join(separator), params))
}

/// Render the ORDER BY list; an empty list falls back to the primary key
pub fn render_order_by(
    type_info: &ObjectTypeInfo,
    joined: bool,
    order_by: &[(String, SortOrder)],
) -> Result<String> {
    if order_by.is_empty() {
        let id = column_sql(type_info, joined, &type_info.id_column)?;
        return Ok(format!("{} ASC", id));
    }

    let mut parts = Vec::with_capacity(order_by.len());
    for (column, order) in order_by {
        let column = column_sql(type_info, joined, column)?;
        parts.push(format!("{} {}", column, order.sql()));
    }
    Ok(parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::{FieldDefinition, FieldKind};

    fn product() -> ObjectTypeInfo {
        ObjectTypeInfo::new("shop.product", "shop_product", "product_id")
            .with_code_name("product_name")
            .with_fields(vec![
                FieldDefinition::new("product_price", FieldKind::decimal(10, 2)),
                FieldDefinition::new("product_enabled", FieldKind::Bool),
            ])
    }

    fn render(filter: &Filter) -> (String, Vec<ScalarValue>) {
        let mut offset = 1;
        render_filter(&product(), false, filter, &mut offset).unwrap()
    }

    #[test]
    fn test_eq_condition() {
        let (clause, params) = render(&Filter::eq("product_name", "widget"));

        assert_eq!(clause, "\"product_name\" = $1");
        assert_eq!(params, vec![ScalarValue::Text("widget".into())]);
    }

    #[test]
    fn test_comparison_operators() {
        let (clause, _) = render(&Filter::gt("product_price", 10i64));
        assert_eq!(clause, "\"product_price\" > $1");

        let (clause, _) = render(&Filter::lte("product_price", 10i64));
        assert_eq!(clause, "\"product_price\" <= $1");

        let (clause, _) = render(&Filter::ne("product_name", "x"));
        assert_eq!(clause, "\"product_name\" != $1");
    }

    #[test]
    fn test_null_comparisons_render_is_null() {
        let (clause, params) = render(&Filter::eq("product_name", None::<String>));
        assert_eq!(clause, "\"product_name\" IS NULL");
        assert!(params.is_empty());

        let (clause, _) = render(&Filter::ne("product_name", None::<String>));
        assert_eq!(clause, "\"product_name\" IS NOT NULL");

        let mut offset = 1;
        let err = render_filter(
            &product(),
            false,
            &Filter::gt("product_name", None::<String>),
            &mut offset,
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_like() {
        let (clause, params) = render(&Filter::contains("product_name", "wid"));
        assert_eq!(clause, "\"product_name\" LIKE $1");
        assert_eq!(params, vec![ScalarValue::Text("%wid%".into())]);
    }

    #[test]
    fn test_in_list() {
        let (clause, params) = render(&Filter::is_in("product_name", ["a", "b", "c"]));
        assert_eq!(clause, "\"product_name\" IN ($1, $2, $3)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_empty_in_list_matches_nothing() {
        let (clause, params) = render(&Filter::is_in("product_name", Vec::<String>::new()));
        assert_eq!(clause, "FALSE");
        assert!(params.is_empty());
    }

    #[test]
    fn test_and_or_nesting() {
        let filter = Filter::and(vec![
            Filter::eq("product_enabled", true),
            Filter::or(vec![
                Filter::eq("product_name", "a"),
                Filter::eq("product_name", "b"),
            ]),
        ]);

        let (clause, params) = render(&filter);
        assert_eq!(
            clause,
            "(\"product_enabled\" = $1) AND \
             ((\"product_name\" = $2) OR (\"product_name\" = $3))"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_not() {
        let (clause, _) = render(&Filter::not(Filter::eq("product_enabled", true)));
        assert_eq!(clause, "NOT (\"product_enabled\" = $1)");
    }

    #[test]
    fn test_empty_group_is_rejected() {
        let mut offset = 1;
        let err =
            render_filter(&product(), false, &Filter::and(vec![]), &mut offset).unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_param_offset_tracking() {
        let filter = Filter::and(vec![
            Filter::eq("product_name", "a"),
            Filter::eq("product_name", "b"),
            Filter::eq("product_name", "c"),
        ]);

        let mut offset = 5;
        let (clause, params) = render_filter(&product(), false, &filter, &mut offset).unwrap();

        assert!(clause.contains("$5"));
        assert!(clause.contains("$6"));
        assert!(clause.contains("$7"));
        assert_eq!(params.len(), 3);
        assert_eq!(offset, 8);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut offset = 1;
        let err = render_filter(
            &product(),
            false,
            &Filter::eq("missing", 1i64),
            &mut offset,
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_order_by_default_and_explicit() {
        let order = render_order_by(&product(), false, &[]).unwrap();
        assert_eq!(order, "\"product_id\" ASC");

        let order = render_order_by(
            &product(),
            false,
            &[
                ("product_price".to_string(), SortOrder::Desc),
                ("product_name".to_string(), SortOrder::Asc),
            ],
        )
        .unwrap();
        assert_eq!(order, "\"product_price\" DESC, \"product_name\" ASC");
    }

    #[test]
    fn test_order_by_unknown_column_is_rejected() {
        let err = render_order_by(
            &product(),
            false,
            &[("missing".to_string(), SortOrder::Asc)],
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }

    #[test]
    fn test_qualified_rendering_when_joined() {
        let info = ObjectTypeInfo::new("shop.product", "shop_product", "product_id")
            .with_fields(vec![FieldDefinition::new(
                "product_enabled",
                FieldKind::Bool,
            )])
            .with_coupled(
                "shop_product_ext",
                "ext_product_id",
                vec![FieldDefinition::new("ext_weight", FieldKind::decimal(10, 3))],
            );

        let mut offset = 1;
        let (clause, _) = render_filter(
            &info,
            true,
            &Filter::and(vec![
                Filter::eq("product_enabled", true),
                Filter::gt("ext_weight", 2i64),
            ]),
            &mut offset,
        )
        .unwrap();

        assert!(clause.contains("\"shop_product\".\"product_enabled\" = $1"));
        assert!(clause.contains("\"shop_product_ext\".\"ext_weight\" > $2"));
    }
}
