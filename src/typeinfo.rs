//! Entity type descriptors
//!
//! Every entity type is described by an [`ObjectTypeInfo`]: table and system
//! column names, the declared field list, the parent dependency edge, staging
//! flags, and optional coupled-table metadata. Descriptors are built once with
//! the consuming builder and never mutated after registration.

use serde::{Deserialize, Serialize};

use crate::value::ScalarValue;

/// Field type with validation and SQL mapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldKind {
    /// Text field (maps to TEXT)
    Text,

    /// 64-bit integer field (maps to BIGINT)
    Integer,

    /// Decimal field with precision and scale (maps to NUMERIC)
    Decimal {
        #[serde(default = "default_precision")]
        precision: u8,
        #[serde(default = "default_scale")]
        scale: u8,
    },

    /// Boolean field (maps to BOOLEAN)
    Bool,

    /// UTC timestamp field (maps to TIMESTAMPTZ)
    Timestamp,

    /// JSON field (maps to JSONB)
    Json,
}

fn default_precision() -> u8 {
    19
}

fn default_scale() -> u8 {
    4
}

impl FieldKind {
    /// Create a Decimal kind with specified precision and scale
    pub fn decimal(precision: u8, scale: u8) -> Self {
        FieldKind::Decimal { precision, scale }
    }

    /// PostgreSQL column type for this kind
    pub fn to_sql_type(&self) -> String {
        match self {
            FieldKind::Text => "TEXT".to_string(),
            FieldKind::Integer => "BIGINT".to_string(),
            FieldKind::Decimal { precision, scale } => {
                format!("NUMERIC({},{})", precision, scale)
            }
            FieldKind::Bool => "BOOLEAN".to_string(),
            FieldKind::Timestamp => "TIMESTAMPTZ".to_string(),
            FieldKind::Json => "JSONB".to_string(),
        }
    }

    /// Check that a typed value can be stored in a field of this kind.
    ///
    /// `Null` is always accepted here; required-ness is enforced separately.
    /// Integer values are accepted into decimal fields.
    pub fn accepts(&self, value: &ScalarValue) -> Result<(), String> {
        if value.is_null() {
            return Ok(());
        }

        match (self, value) {
            (FieldKind::Text, ScalarValue::Text(_)) => Ok(()),
            (FieldKind::Integer, ScalarValue::Integer(_)) => Ok(()),
            (FieldKind::Decimal { .. }, ScalarValue::Decimal(_)) => Ok(()),
            (FieldKind::Decimal { .. }, ScalarValue::Integer(_)) => Ok(()),
            (FieldKind::Bool, ScalarValue::Bool(_)) => Ok(()),
            (FieldKind::Timestamp, ScalarValue::Timestamp(_)) => Ok(()),
            (FieldKind::Json, ScalarValue::Json(_)) => Ok(()),
            _ => Err(format!("expected {:?}, got {:?}", self, value)),
        }
    }

    /// Parse a JSON value into a typed scalar for this kind.
    ///
    /// String-to-number and string-to-boolean coercions are allowed, matching
    /// what external snapshot producers commonly emit.
    pub fn from_json(&self, value: &serde_json::Value) -> Result<ScalarValue, String> {
        if value.is_null() {
            return Ok(ScalarValue::Null);
        }

        match self {
            FieldKind::Text => value
                .as_str()
                .map(|s| ScalarValue::Text(s.to_string()))
                .ok_or_else(|| format!("expected string, got {}", value)),
            FieldKind::Integer => value
                .as_i64()
                .or_else(|| value.as_str().and_then(|s| s.parse::<i64>().ok()))
                .map(ScalarValue::Integer)
                .ok_or_else(|| format!("cannot convert {} to integer", value)),
            FieldKind::Decimal { .. } => ScalarValue::decimal_from_json(value)
                .map(ScalarValue::Decimal)
                .ok_or_else(|| format!("cannot convert {} to decimal", value)),
            FieldKind::Bool => value
                .as_bool()
                .or_else(|| {
                    value.as_str().and_then(|s| match s.to_lowercase().as_str() {
                        "true" | "1" | "yes" => Some(true),
                        "false" | "0" | "no" => Some(false),
                        _ => None,
                    })
                })
                .map(ScalarValue::Bool)
                .ok_or_else(|| format!("cannot convert {} to boolean", value)),
            FieldKind::Timestamp => value
                .as_str()
                .ok_or_else(|| format!("expected timestamp string, got {}", value))
                .and_then(|s| {
                    chrono::DateTime::parse_from_rfc3339(s)
                        .map(|t| ScalarValue::Timestamp(t.with_timezone(&chrono::Utc)))
                        .map_err(|e| format!("invalid timestamp: {}", e))
                }),
            FieldKind::Json => Ok(ScalarValue::Json(value.clone())),
        }
    }
}

fn default_false() -> bool {
    false
}

/// Declared field of an entity type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    /// Column name (must be a valid PostgreSQL identifier)
    pub name: String,

    /// Field kind with validation rules
    #[serde(flatten)]
    pub kind: FieldKind,

    /// Whether a value is required on insert (default: false)
    #[serde(default = "default_false")]
    pub required: bool,

    /// Whether the column has a UNIQUE constraint (default: false)
    #[serde(default)]
    pub unique: bool,

    /// Default value as a SQL expression, e.g. "0", "NOW()", "'draft'"
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "default")]
    pub default_sql: Option<String>,
}

impl FieldDefinition {
    /// Create a new field definition with a name and kind
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            unique: false,
            default_sql: None,
        }
    }

    /// Require a value on insert
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Add a UNIQUE constraint
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set a SQL default expression
    pub fn default_sql(mut self, expr: impl Into<String>) -> Self {
        self.default_sql = Some(expr.into());
        self
    }
}

/// How dependents of a type are handled when a parent object is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyMode {
    /// Deletion fails while dependent rows exist
    Restrict,
    /// Dependent rows are deleted first
    Cascade,
}

/// Payload recorded in the staging log per mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingPayload {
    /// Only the columns changed by the mutation
    ChangedColumns,
    /// The full column snapshot of the object
    FullSnapshot,
}

/// Whether and how the coupled table participates in queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoupledInclusion {
    /// Base table only
    None,
    /// Join the coupled table for filtering, project base columns only
    InnerQueryOnly,
    /// Join and project both column sets
    Complete,
}

/// Dependency edge to a parent object type
#[derive(Debug, Clone, PartialEq)]
pub struct ParentLink {
    /// Object type of the parent
    pub object_type: String,
    /// Column on this type's base table referencing the parent id
    pub column: String,
}

/// Extension table holding type-specific columns, joined on the base id
#[derive(Debug, Clone, PartialEq)]
pub struct CoupledData {
    /// Extension table name
    pub table_name: String,
    /// Column on the extension table referencing the base id
    pub join_column: String,
    /// Fields stored in the extension table
    pub fields: Vec<FieldDefinition>,
}

/// Which physical table a column lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnTable {
    Base,
    Coupled,
}

/// Immutable descriptor of one entity type
#[derive(Debug, Clone)]
pub struct ObjectTypeInfo {
    /// Object type string, e.g. "shop.brand"
    pub object_type: String,
    /// Base table name
    pub table_name: String,
    /// Primary key column (BIGSERIAL)
    pub id_column: String,
    /// Optional guid column (text UUID, unique)
    pub guid_column: Option<String>,
    /// Optional code name column
    pub code_name_column: Option<String>,
    /// Optional site column scoping code name uniqueness
    pub site_column: Option<String>,
    /// Optional display name column
    pub display_name_column: Option<String>,
    /// Declared fields of the base table
    pub fields: Vec<FieldDefinition>,
    /// Parent dependency edge
    pub parent: Option<ParentLink>,
    /// Delete behavior toward dependents
    pub dependency_mode: DependencyMode,
    /// Whether mutations of this type are recorded in the staging log
    pub log_staging: bool,
    /// Staging payload shape
    pub staging_payload: StagingPayload,
    /// Optional coupled extension table
    pub coupled: Option<CoupledData>,
    /// Default coupled-table participation in queries
    pub coupled_inclusion: CoupledInclusion,
}

impl ObjectTypeInfo {
    /// Start a descriptor with the mandatory parts
    pub fn new(
        object_type: impl Into<String>,
        table_name: impl Into<String>,
        id_column: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            table_name: table_name.into(),
            id_column: id_column.into(),
            guid_column: None,
            code_name_column: None,
            site_column: None,
            display_name_column: None,
            fields: Vec::new(),
            parent: None,
            dependency_mode: DependencyMode::Restrict,
            log_staging: true,
            staging_payload: StagingPayload::ChangedColumns,
            coupled: None,
            coupled_inclusion: CoupledInclusion::None,
        }
    }

    /// Set the guid column
    pub fn with_guid(mut self, column: impl Into<String>) -> Self {
        self.guid_column = Some(column.into());
        self
    }

    /// Set the code name column
    pub fn with_code_name(mut self, column: impl Into<String>) -> Self {
        self.code_name_column = Some(column.into());
        self
    }

    /// Scope code name uniqueness by a site column
    pub fn with_site_scope(mut self, column: impl Into<String>) -> Self {
        self.site_column = Some(column.into());
        self
    }

    /// Set the display name column
    pub fn with_display_name(mut self, column: impl Into<String>) -> Self {
        self.display_name_column = Some(column.into());
        self
    }

    /// Declare the base-table fields
    pub fn with_fields(mut self, fields: Vec<FieldDefinition>) -> Self {
        self.fields = fields;
        self
    }

    /// Declare the parent dependency edge
    pub fn with_parent(
        mut self,
        object_type: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.parent = Some(ParentLink {
            object_type: object_type.into(),
            column: column.into(),
        });
        self
    }

    /// Set the delete behavior toward dependents
    pub fn dependency_mode(mut self, mode: DependencyMode) -> Self {
        self.dependency_mode = mode;
        self
    }

    /// Enable or disable staging logging for this type
    pub fn log_staging(mut self, enabled: bool) -> Self {
        self.log_staging = enabled;
        self
    }

    /// Set the staging payload shape
    pub fn staging_payload(mut self, payload: StagingPayload) -> Self {
        self.staging_payload = payload;
        self
    }

    /// Attach a coupled extension table; queries default to `Complete`
    pub fn with_coupled(
        mut self,
        table_name: impl Into<String>,
        join_column: impl Into<String>,
        fields: Vec<FieldDefinition>,
    ) -> Self {
        self.coupled = Some(CoupledData {
            table_name: table_name.into(),
            join_column: join_column.into(),
            fields,
        });
        self.coupled_inclusion = CoupledInclusion::Complete;
        self
    }

    /// Override the default coupled-table participation
    pub fn coupled_inclusion(mut self, inclusion: CoupledInclusion) -> Self {
        self.coupled_inclusion = inclusion;
        self
    }

    /// Whether `name` is one of the system columns of the base table
    pub fn is_system_column(&self, name: &str) -> bool {
        name == self.id_column
            || self.guid_column.as_deref() == Some(name)
            || self.code_name_column.as_deref() == Some(name)
            || self.site_column.as_deref() == Some(name)
            || self.display_name_column.as_deref() == Some(name)
    }

    /// Look up a declared field by column name
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.coupled_field(name))
    }

    fn coupled_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.coupled
            .as_ref()
            .and_then(|c| c.fields.iter().find(|f| f.name == name))
    }

    /// Which table a column lives in, or None for an unknown column
    pub fn column_table(&self, name: &str) -> Option<ColumnTable> {
        if self.is_system_column(name) || self.fields.iter().any(|f| f.name == name) {
            Some(ColumnTable::Base)
        } else if self.coupled_field(name).is_some() {
            Some(ColumnTable::Coupled)
        } else {
            None
        }
    }

    /// Kind of a column, covering both system columns and declared fields
    pub fn column_kind(&self, name: &str) -> Option<FieldKind> {
        if name == self.id_column {
            return Some(FieldKind::Integer);
        }
        if self.site_column.as_deref() == Some(name) {
            return Some(FieldKind::Integer);
        }
        if self.guid_column.as_deref() == Some(name)
            || self.code_name_column.as_deref() == Some(name)
            || self.display_name_column.as_deref() == Some(name)
        {
            return Some(FieldKind::Text);
        }
        self.field(name).map(|f| f.kind.clone())
    }

    /// Base-table columns in declaration order (system columns first)
    pub fn base_columns(&self) -> Vec<&str> {
        let mut columns = vec![self.id_column.as_str()];
        if let Some(c) = &self.guid_column {
            columns.push(c);
        }
        if let Some(c) = &self.code_name_column {
            columns.push(c);
        }
        if let Some(c) = &self.site_column {
            columns.push(c);
        }
        if let Some(c) = &self.display_name_column {
            columns.push(c);
        }
        for f in &self.fields {
            columns.push(&f.name);
        }
        columns
    }

    /// Columns of the coupled table, excluding the join column
    pub fn coupled_columns(&self) -> Vec<&str> {
        self.coupled
            .as_ref()
            .map(|c| c.fields.iter().map(|f| f.name.as_str()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brand_type() -> ObjectTypeInfo {
        ObjectTypeInfo::new("shop.brand", "shop_brand", "brand_id")
            .with_guid("brand_guid")
            .with_code_name("brand_name")
            .with_site_scope("brand_site_id")
            .with_display_name("brand_display_name")
            .with_fields(vec![
                FieldDefinition::new("brand_description", FieldKind::Text),
                FieldDefinition::new("brand_enabled", FieldKind::Bool).required(),
            ])
    }

    #[test]
    fn test_field_kind_sql_types() {
        assert_eq!(FieldKind::Text.to_sql_type(), "TEXT");
        assert_eq!(FieldKind::Integer.to_sql_type(), "BIGINT");
        assert_eq!(FieldKind::decimal(10, 2).to_sql_type(), "NUMERIC(10,2)");
        assert_eq!(FieldKind::Bool.to_sql_type(), "BOOLEAN");
        assert_eq!(FieldKind::Timestamp.to_sql_type(), "TIMESTAMPTZ");
        assert_eq!(FieldKind::Json.to_sql_type(), "JSONB");
    }

    #[test]
    fn test_field_kind_accepts() {
        assert!(FieldKind::Text.accepts(&ScalarValue::Text("x".into())).is_ok());
        assert!(FieldKind::Text.accepts(&ScalarValue::Integer(1)).is_err());
        assert!(FieldKind::Integer.accepts(&ScalarValue::Integer(1)).is_ok());
        assert!(
            FieldKind::decimal(10, 2)
                .accepts(&ScalarValue::Integer(1))
                .is_ok()
        );
        assert!(FieldKind::Bool.accepts(&ScalarValue::Null).is_ok());
        assert!(FieldKind::Bool.accepts(&ScalarValue::Text("t".into())).is_err());
    }

    #[test]
    fn test_field_kind_from_json_coercions() {
        assert_eq!(
            FieldKind::Integer.from_json(&serde_json::json!("42")),
            Ok(ScalarValue::Integer(42))
        );
        assert_eq!(
            FieldKind::Bool.from_json(&serde_json::json!("yes")),
            Ok(ScalarValue::Bool(true))
        );
        assert!(FieldKind::Integer.from_json(&serde_json::json!("x")).is_err());
        assert!(
            FieldKind::Timestamp
                .from_json(&serde_json::json!("2024-01-15T10:30:00Z"))
                .is_ok()
        );
        assert!(FieldKind::Timestamp.from_json(&serde_json::json!(5)).is_err());
    }

    #[test]
    fn test_field_kind_serde_shape() {
        let kind = FieldKind::decimal(12, 3);
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"kind\":\"decimal\""));
        assert!(json.contains("\"precision\":12"));

        let parsed: FieldKind = serde_json::from_str(r#"{"kind":"decimal"}"#).unwrap();
        assert_eq!(parsed, FieldKind::decimal(19, 4));
    }

    #[test]
    fn test_field_definition_builder() {
        let field = FieldDefinition::new("status", FieldKind::Text)
            .required()
            .unique()
            .default_sql("'draft'");

        assert_eq!(field.name, "status");
        assert!(field.required);
        assert!(field.unique);
        assert_eq!(field.default_sql, Some("'draft'".to_string()));
    }

    #[test]
    fn test_type_info_builder() {
        let info = brand_type();

        assert_eq!(info.object_type, "shop.brand");
        assert_eq!(info.table_name, "shop_brand");
        assert_eq!(info.id_column, "brand_id");
        assert_eq!(info.guid_column.as_deref(), Some("brand_guid"));
        assert_eq!(info.code_name_column.as_deref(), Some("brand_name"));
        assert_eq!(info.site_column.as_deref(), Some("brand_site_id"));
        assert_eq!(info.fields.len(), 2);
        assert_eq!(info.dependency_mode, DependencyMode::Restrict);
        assert!(info.log_staging);
    }

    #[test]
    fn test_system_column_lookup() {
        let info = brand_type();

        assert!(info.is_system_column("brand_id"));
        assert!(info.is_system_column("brand_guid"));
        assert!(!info.is_system_column("brand_description"));
        assert!(!info.is_system_column("missing"));
    }

    #[test]
    fn test_column_kind() {
        let info = brand_type();

        assert_eq!(info.column_kind("brand_id"), Some(FieldKind::Integer));
        assert_eq!(info.column_kind("brand_site_id"), Some(FieldKind::Integer));
        assert_eq!(info.column_kind("brand_name"), Some(FieldKind::Text));
        assert_eq!(info.column_kind("brand_enabled"), Some(FieldKind::Bool));
        assert_eq!(info.column_kind("missing"), None);
    }

    #[test]
    fn test_base_columns_order() {
        let info = brand_type();
        let columns = info.base_columns();

        assert_eq!(
            columns,
            vec![
                "brand_id",
                "brand_guid",
                "brand_name",
                "brand_site_id",
                "brand_display_name",
                "brand_description",
                "brand_enabled",
            ]
        );
    }

    #[test]
    fn test_coupled_metadata() {
        let info = ObjectTypeInfo::new("shop.product", "shop_product", "product_id")
            .with_fields(vec![FieldDefinition::new("product_name", FieldKind::Text)])
            .with_coupled(
                "shop_product_ext",
                "ext_product_id",
                vec![FieldDefinition::new("ext_weight", FieldKind::decimal(10, 3))],
            );

        assert_eq!(info.coupled_inclusion, CoupledInclusion::Complete);
        assert_eq!(info.column_table("product_name"), Some(ColumnTable::Base));
        assert_eq!(info.column_table("ext_weight"), Some(ColumnTable::Coupled));
        assert_eq!(info.column_table("missing"), None);
        assert_eq!(info.coupled_columns(), vec!["ext_weight"]);
        assert_eq!(
            info.column_kind("ext_weight"),
            Some(FieldKind::decimal(10, 3))
        );
    }

    #[test]
    fn test_coupled_inclusion_override() {
        let info = ObjectTypeInfo::new("shop.product", "shop_product", "product_id")
            .with_coupled("shop_product_ext", "ext_product_id", vec![])
            .coupled_inclusion(CoupledInclusion::InnerQueryOnly);

        assert_eq!(info.coupled_inclusion, CoupledInclusion::InnerQueryOnly);
    }
}
