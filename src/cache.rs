//! Provider caches
//!
//! Each registered type owns one [`ProviderCache`]: a read-through cache of
//! immutable record snapshots with three key spaces (id, guid, code name
//! within site scope). The cache has an explicit lifecycle (insert, evict,
//! clear, age-based sweep) and is maintained in-line with every write.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use crate::record::DataRecord;

#[derive(Debug, Clone)]
struct CacheEntry {
    record: DataRecord,
    stored_at: Instant,
}

/// Read-through cache for one object type
#[derive(Debug, Default)]
pub struct ProviderCache {
    by_id: DashMap<i64, CacheEntry>,
    by_guid: DashMap<Uuid, i64>,
    by_name: DashMap<String, i64>,
}

fn name_key(code_name: &str, site_id: Option<i64>) -> String {
    match site_id {
        Some(site) => format!("{}@{}", code_name, site),
        None => code_name.to_string(),
    }
}

impl ProviderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot of a persisted record under all of its keys
    pub fn insert(&self, record: &DataRecord) {
        let Some(id) = record.id() else {
            return;
        };

        if let Some(guid) = record.guid() {
            self.by_guid.insert(guid, id);
        }
        if let Some(name) = record.code_name() {
            self.by_name.insert(name_key(name, record.site_id()), id);
        }
        self.by_id.insert(
            id,
            CacheEntry {
                record: record.clone(),
                stored_at: Instant::now(),
            },
        );
    }

    pub fn get_by_id(&self, id: i64) -> Option<DataRecord> {
        self.by_id.get(&id).map(|entry| entry.record.clone())
    }

    pub fn get_by_guid(&self, guid: Uuid) -> Option<DataRecord> {
        let id = *self.by_guid.get(&guid)?;
        self.get_by_id(id)
    }

    pub fn get_by_name(&self, code_name: &str, site_id: Option<i64>) -> Option<DataRecord> {
        let key = name_key(code_name, site_id);
        let id = *self.by_name.get(&key)?;
        match self.get_by_id(id) {
            Some(record)
                if record.code_name() == Some(code_name) && record.site_id() == site_id =>
            {
                Some(record)
            }
            _ => {
                // Stale secondary key after a rename or eviction
                self.by_name.remove(&key);
                None
            }
        }
    }

    /// Remove one record and its secondary keys
    pub fn evict(&self, id: i64) {
        if let Some((_, entry)) = self.by_id.remove(&id) {
            if let Some(guid) = entry.record.guid() {
                self.by_guid.remove(&guid);
            }
            if let Some(name) = entry.record.code_name() {
                self.by_name
                    .remove(&name_key(name, entry.record.site_id()));
            }
        }
    }

    /// Drop everything
    pub fn clear(&self) {
        self.by_id.clear();
        self.by_guid.clear();
        self.by_name.clear();
    }

    /// Evict entries stored longer ago than `max_age`; returns the count
    pub fn evict_older_than(&self, max_age: Duration) -> usize {
        let stale: Vec<i64> = self
            .by_id
            .iter()
            .filter(|entry| entry.stored_at.elapsed() > max_age)
            .map(|entry| *entry.key())
            .collect();

        for id in &stale {
            self.evict(*id);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::{FieldDefinition, FieldKind, ObjectTypeInfo};
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::value::ScalarValue;

    fn brand_info() -> Arc<ObjectTypeInfo> {
        Arc::new(
            ObjectTypeInfo::new("shop.brand", "shop_brand", "brand_id")
                .with_guid("brand_guid")
                .with_code_name("brand_name")
                .with_site_scope("brand_site_id")
                .with_fields(vec![FieldDefinition::new(
                    "brand_description",
                    FieldKind::Text,
                )]),
        )
    }

    fn record(id: i64, guid: Uuid, name: &str, site: Option<i64>) -> DataRecord {
        let mut values = HashMap::new();
        values.insert("brand_id".to_string(), ScalarValue::Integer(id));
        values.insert("brand_guid".to_string(), ScalarValue::Text(guid.to_string()));
        values.insert("brand_name".to_string(), ScalarValue::Text(name.to_string()));
        if let Some(site) = site {
            values.insert("brand_site_id".to_string(), ScalarValue::Integer(site));
        }
        DataRecord::from_values(brand_info(), values)
    }

    #[test]
    fn test_insert_and_lookup_by_all_keys() {
        let cache = ProviderCache::new();
        let guid = Uuid::new_v4();
        cache.insert(&record(1, guid, "acme", Some(2)));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_by_id(1).unwrap().code_name(), Some("acme"));
        assert_eq!(cache.get_by_guid(guid).unwrap().id(), Some(1));
        assert_eq!(cache.get_by_name("acme", Some(2)).unwrap().id(), Some(1));
        assert!(cache.get_by_name("acme", None).is_none());
        assert!(cache.get_by_name("acme", Some(3)).is_none());
    }

    #[test]
    fn test_unpersisted_record_is_not_cached() {
        let cache = ProviderCache::new();
        let record = DataRecord::new(brand_info());
        cache.insert(&record);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evict_removes_secondary_keys() {
        let cache = ProviderCache::new();
        let guid = Uuid::new_v4();
        cache.insert(&record(1, guid, "acme", None));

        cache.evict(1);
        assert!(cache.get_by_id(1).is_none());
        assert!(cache.get_by_guid(guid).is_none());
        assert!(cache.get_by_name("acme", None).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_rename_leaves_no_stale_name_hit() {
        let cache = ProviderCache::new();
        let guid = Uuid::new_v4();
        cache.insert(&record(1, guid, "acme", None));
        cache.insert(&record(1, guid, "apex", None));

        assert_eq!(cache.get_by_name("apex", None).unwrap().id(), Some(1));
        assert!(cache.get_by_name("acme", None).is_none());
    }

    #[test]
    fn test_clear() {
        let cache = ProviderCache::new();
        cache.insert(&record(1, Uuid::new_v4(), "a", None));
        cache.insert(&record(2, Uuid::new_v4(), "b", None));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_evict_older_than() {
        let cache = ProviderCache::new();
        cache.insert(&record(1, Uuid::new_v4(), "a", None));
        cache.insert(&record(2, Uuid::new_v4(), "b", None));

        // Nothing is older than an hour yet
        assert_eq!(cache.evict_older_than(Duration::from_secs(3600)), 0);
        assert_eq!(cache.len(), 2);

        // Everything is older than zero
        assert_eq!(cache.evict_older_than(Duration::ZERO), 2);
        assert!(cache.is_empty());
    }
}
