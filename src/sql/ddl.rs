//! DDL generation for registered types
//!
//! Generates the CREATE TABLE/INDEX statements for a descriptor's base and
//! coupled tables and for the staging-task table. All statements are
//! idempotent (`IF NOT EXISTS`) so installing a type twice is harmless.

use crate::sql::sanitize::quote_identifier;
use crate::typeinfo::{FieldDefinition, ObjectTypeInfo};

/// DDL generator for object tables
pub struct DdlGenerator;

impl DdlGenerator {
    /// CREATE TABLE for the descriptor's base table
    pub fn create_base_table(info: &ObjectTypeInfo) -> String {
        let mut columns = vec![format!(
            "{} BIGSERIAL PRIMARY KEY",
            quote_identifier(&info.id_column)
        )];

        if let Some(guid) = &info.guid_column {
            columns.push(format!(
                "{} TEXT NOT NULL DEFAULT gen_random_uuid()::text",
                quote_identifier(guid)
            ));
        }
        if let Some(code_name) = &info.code_name_column {
            columns.push(format!("{} TEXT", quote_identifier(code_name)));
        }
        if let Some(site) = &info.site_column {
            columns.push(format!("{} BIGINT", quote_identifier(site)));
        }
        if let Some(display) = &info.display_name_column {
            columns.push(format!("{} TEXT", quote_identifier(display)));
        }
        for field in &info.fields {
            columns.push(Self::format_field(field));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&info.table_name),
            columns.join(", ")
        )
    }

    /// CREATE TABLE for the coupled extension table, when the type has one
    pub fn create_coupled_table(info: &ObjectTypeInfo) -> Option<String> {
        let coupled = info.coupled.as_ref()?;

        let mut columns = vec![format!(
            "{} BIGINT PRIMARY KEY",
            quote_identifier(&coupled.join_column)
        )];
        for field in &coupled.fields {
            columns.push(Self::format_field(field));
        }

        Some(format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(&coupled.table_name),
            columns.join(", ")
        ))
    }

    /// Index statements for guid, code name scope, and the parent column
    pub fn create_indexes(info: &ObjectTypeInfo) -> Vec<String> {
        let table = quote_identifier(&info.table_name);
        let mut statements = Vec::new();

        if let Some(guid) = &info.guid_column {
            statements.push(format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {}({})",
                quote_identifier(&format!("idx_{}_guid", info.table_name)),
                table,
                quote_identifier(guid)
            ));
        }

        if let Some(code_name) = &info.code_name_column {
            let key = match &info.site_column {
                Some(site) => format!(
                    "{}, {}",
                    quote_identifier(code_name),
                    quote_identifier(site)
                ),
                None => quote_identifier(code_name),
            };
            statements.push(format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {}({})",
                quote_identifier(&format!("idx_{}_code_name", info.table_name)),
                table,
                key
            ));
        }

        if let Some(parent) = &info.parent {
            statements.push(format!(
                "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                quote_identifier(&format!("idx_{}_parent", info.table_name)),
                table,
                quote_identifier(&parent.column)
            ));
        }

        statements
    }

    /// DROP statements for the descriptor's tables (coupled first)
    pub fn drop_tables(info: &ObjectTypeInfo) -> Vec<String> {
        let mut statements = Vec::new();
        if let Some(coupled) = &info.coupled {
            statements.push(format!(
                "DROP TABLE IF EXISTS {} CASCADE",
                quote_identifier(&coupled.table_name)
            ));
        }
        statements.push(format!(
            "DROP TABLE IF EXISTS {} CASCADE",
            quote_identifier(&info.table_name)
        ));
        statements
    }

    /// CREATE TABLE for the staging-task log
    pub fn create_staging_table(table_name: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id BIGSERIAL PRIMARY KEY, \
             object_type TEXT NOT NULL, \
             object_id BIGINT NOT NULL, \
             operation TEXT NOT NULL, \
             payload JSONB NOT NULL, \
             target TEXT, \
             created_at TIMESTAMPTZ NOT NULL DEFAULT NOW())",
            quote_identifier(table_name)
        )
    }

    fn format_field(field: &FieldDefinition) -> String {
        let mut parts = vec![quote_identifier(&field.name), field.kind.to_sql_type()];

        if field.unique {
            parts.push("UNIQUE".to_string());
        }
        if field.required {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = &field.default_sql {
            parts.push(format!("DEFAULT {}", default));
        }

        parts.join(" ")
    }
}
