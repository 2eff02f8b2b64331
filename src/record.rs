//! In-memory object records
//!
//! A [`DataRecord`] is one row of one registered type: a typed column map
//! plus dirty-column tracking. Records are constructed empty, or from a
//! fetched row (clean and persisted), and written back through their
//! provider which persists dirty columns only.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::typeinfo::ObjectTypeInfo;
use crate::value::ScalarValue;

/// One row in memory, bound to its type descriptor
#[derive(Debug, Clone)]
pub struct DataRecord {
    type_info: Arc<ObjectTypeInfo>,
    values: HashMap<String, ScalarValue>,
    dirty: BTreeSet<String>,
    persisted: bool,
}

impl DataRecord {
    /// Create an empty, unpersisted record
    pub fn new(type_info: Arc<ObjectTypeInfo>) -> Self {
        Self {
            type_info,
            values: HashMap::new(),
            dirty: BTreeSet::new(),
            persisted: false,
        }
    }

    /// Build a clean, persisted record from fetched column values
    pub(crate) fn from_values(
        type_info: Arc<ObjectTypeInfo>,
        values: HashMap<String, ScalarValue>,
    ) -> Self {
        Self {
            type_info,
            values,
            dirty: BTreeSet::new(),
            persisted: true,
        }
    }

    pub fn type_info(&self) -> &Arc<ObjectTypeInfo> {
        &self.type_info
    }

    pub fn object_type(&self) -> &str {
        &self.type_info.object_type
    }

    /// Primary key, when the record has been persisted or explicitly set
    pub fn id(&self) -> Option<i64> {
        self.get(&self.type_info.id_column)?.as_integer()
    }

    /// Object guid parsed from its text column
    pub fn guid(&self) -> Option<Uuid> {
        let column = self.type_info.guid_column.as_deref()?;
        Uuid::parse_str(self.get(column)?.as_text()?).ok()
    }

    pub fn code_name(&self) -> Option<&str> {
        let column = self.type_info.code_name_column.as_deref()?;
        self.get(column)?.as_text()
    }

    pub fn site_id(&self) -> Option<i64> {
        let column = self.type_info.site_column.as_deref()?;
        self.get(column)?.as_integer()
    }

    pub fn display_name(&self) -> Option<&str> {
        let column = self.type_info.display_name_column.as_deref()?;
        self.get(column)?.as_text()
    }

    /// Raw value of a column, if present
    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.values.get(column)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column)?.as_text()
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        self.get(column)?.as_integer()
    }

    pub fn boolean(&self, column: &str) -> Option<bool> {
        self.get(column)?.as_bool()
    }

    /// Set a column value, marking it dirty.
    ///
    /// Fails for unknown columns, kind mismatches, and for the primary key
    /// of a persisted record (primary keys are immutable once stored).
    /// Setting a column to its current value is a no-op.
    pub fn set(&mut self, column: &str, value: impl Into<ScalarValue>) -> Result<()> {
        let value = value.into();

        let kind = self.type_info.column_kind(column).ok_or_else(|| {
            StoreError::validation(format!(
                "Unknown column '{}' for object type '{}'",
                column, self.type_info.object_type
            ))
        })?;

        if column == self.type_info.id_column && self.persisted {
            return Err(StoreError::validation(format!(
                "Primary key column '{}' cannot change once persisted",
                column
            )));
        }

        kind.accepts(&value).map_err(|e| {
            StoreError::validation(format!("Invalid value for column '{}': {}", column, e))
        })?;

        if self.values.get(column) == Some(&value) {
            return Ok(());
        }

        self.values.insert(column.to_string(), value);
        self.dirty.insert(column.to_string());
        Ok(())
    }

    /// Assign the generated primary key after an insert
    pub(crate) fn mark_persisted(&mut self, id: i64) {
        self.values.insert(
            self.type_info.id_column.clone(),
            ScalarValue::Integer(id),
        );
        self.dirty.remove(&self.type_info.id_column);
        self.persisted = true;
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Dirty column names in deterministic order
    pub fn dirty_columns(&self) -> Vec<&str> {
        self.dirty.iter().map(|c| c.as_str()).collect()
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Full column snapshot for the serialization boundary
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for column in self.type_info.base_columns() {
            if let Some(value) = self.values.get(column) {
                map.insert(column.to_string(), value.to_json());
            }
        }
        for column in self.type_info.coupled_columns() {
            if let Some(value) = self.values.get(column) {
                map.insert(column.to_string(), value.to_json());
            }
        }
        serde_json::Value::Object(map)
    }

    /// Dirty columns only, for changed-column staging payloads
    pub fn changed_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for column in &self.dirty {
            if let Some(value) = self.values.get(column) {
                map.insert(column.clone(), value.to_json());
            }
        }
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::{FieldDefinition, FieldKind};

    fn brand_info() -> Arc<ObjectTypeInfo> {
        Arc::new(
            ObjectTypeInfo::new("shop.brand", "shop_brand", "brand_id")
                .with_guid("brand_guid")
                .with_code_name("brand_name")
                .with_site_scope("brand_site_id")
                .with_fields(vec![
                    FieldDefinition::new("brand_description", FieldKind::Text),
                    FieldDefinition::new("brand_enabled", FieldKind::Bool),
                ]),
        )
    }

    #[test]
    fn test_new_record_is_clean_and_unpersisted() {
        let record = DataRecord::new(brand_info());
        assert!(!record.is_persisted());
        assert!(!record.is_dirty());
        assert_eq!(record.id(), None);
    }

    #[test]
    fn test_set_marks_dirty() {
        let mut record = DataRecord::new(brand_info());
        record.set("brand_name", "acme").unwrap();
        record.set("brand_enabled", true).unwrap();

        assert!(record.is_dirty());
        assert_eq!(record.dirty_columns(), vec!["brand_enabled", "brand_name"]);
        assert_eq!(record.code_name(), Some("acme"));
        assert_eq!(record.boolean("brand_enabled"), Some(true));
    }

    #[test]
    fn test_set_same_value_is_noop() {
        let mut record = DataRecord::new(brand_info());
        record.set("brand_name", "acme").unwrap();
        record.clear_dirty();

        record.set("brand_name", "acme").unwrap();
        assert!(!record.is_dirty());
    }

    #[test]
    fn test_set_unknown_column_fails() {
        let mut record = DataRecord::new(brand_info());
        let err = record.set("missing", 1i64).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_set_kind_mismatch_fails() {
        let mut record = DataRecord::new(brand_info());
        let err = record.set("brand_enabled", "yes").unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_primary_key_immutable_once_persisted() {
        let mut record = DataRecord::new(brand_info());
        record.set("brand_id", 5i64).unwrap();

        record.mark_persisted(5);
        let err = record.set("brand_id", 6i64).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(record.id(), Some(5));
    }

    #[test]
    fn test_mark_persisted_assigns_id_clean() {
        let mut record = DataRecord::new(brand_info());
        record.set("brand_name", "acme").unwrap();

        record.mark_persisted(12);
        assert!(record.is_persisted());
        assert_eq!(record.id(), Some(12));
        assert_eq!(record.dirty_columns(), vec!["brand_name"]);
    }

    #[test]
    fn test_guid_parsing() {
        let mut record = DataRecord::new(brand_info());
        let guid = Uuid::new_v4();
        record.set("brand_guid", guid.to_string()).unwrap();
        assert_eq!(record.guid(), Some(guid));

        record.set("brand_guid", "not-a-guid").unwrap();
        assert_eq!(record.guid(), None);
    }

    #[test]
    fn test_from_values_is_clean_and_persisted() {
        let mut values = HashMap::new();
        values.insert("brand_id".to_string(), ScalarValue::Integer(3));
        values.insert("brand_name".to_string(), ScalarValue::Text("acme".into()));

        let record = DataRecord::from_values(brand_info(), values);
        assert!(record.is_persisted());
        assert!(!record.is_dirty());
        assert_eq!(record.id(), Some(3));
    }

    #[test]
    fn test_json_snapshots() {
        let mut record = DataRecord::new(brand_info());
        record.set("brand_name", "acme").unwrap();
        record.set("brand_enabled", false).unwrap();
        record.clear_dirty();
        record.set("brand_description", "tools").unwrap();

        let full = record.to_json();
        assert_eq!(full["brand_name"], serde_json::json!("acme"));
        assert_eq!(full["brand_description"], serde_json::json!("tools"));

        let changed = record.changed_json();
        assert_eq!(changed, serde_json::json!({"brand_description": "tools"}));
    }
}
