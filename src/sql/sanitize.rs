//! SQL identifier handling
//!
//! Identifiers (table and column names) are never taken from query input;
//! they come from registered descriptors, are validated at install time, and
//! are always double-quoted when interpolated into SQL text.

use regex::Regex;

/// PostgreSQL reserved keywords rejected as identifiers
pub const RESERVED_KEYWORDS: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "ASYMMETRIC", "BOTH", "CASE",
    "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_CATALOG",
    "CURRENT_DATE", "CURRENT_ROLE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER",
    "DEFAULT", "DEFERRABLE", "DESC", "DISTINCT", "DO", "ELSE", "END", "EXCEPT", "FALSE", "FETCH",
    "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INITIALLY", "INTERSECT", "INTO",
    "LATERAL", "LEADING", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NOT", "NULL", "OFFSET", "ON",
    "ONLY", "OR", "ORDER", "PLACING", "PRIMARY", "REFERENCES", "RETURNING", "SELECT",
    "SESSION_USER", "SOME", "SYMMETRIC", "TABLE", "THEN", "TO", "TRAILING", "TRUE", "UNION",
    "UNIQUE", "USER", "USING", "VARIADIC", "WHEN", "WHERE", "WINDOW", "WITH",
];

/// Quote an identifier for safe interpolation into SQL text
pub fn quote_identifier(identifier: &str) -> String {
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Quote a table-qualified column reference
pub fn qualify(table: &str, column: &str) -> String {
    format!("{}.{}", quote_identifier(table), quote_identifier(column))
}

/// Validate a table or column name declared in a type descriptor.
///
/// Names must start with a lowercase letter, contain only lowercase letters,
/// digits, and underscores, and must not be a PostgreSQL reserved keyword.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }

    let re = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    if !re.is_match(name) {
        return Err(format!(
            "Identifier '{}' is invalid. Must start with a lowercase letter and contain only lowercase letters, digits, and underscores.",
            name
        ));
    }

    if RESERVED_KEYWORDS.contains(&name.to_uppercase().as_str()) {
        return Err(format!(
            "Identifier '{}' is a PostgreSQL reserved keyword.",
            name
        ));
    }

    Ok(())
}
