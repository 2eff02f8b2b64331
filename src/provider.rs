//! Data store and object providers
//!
//! [`DataStore`] is the root handle: it owns the connection pool, the type
//! registry, the staging log, the farm bus, and one cache per registered
//! type. An [`ObjectProvider`] mediates all persistence for one type
//! (cached lookups, validated writes of dirty columns, dependency-aware
//! deletes) and publishes the staging and farm side effects synchronously
//! with each write.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::cache::ProviderCache;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::farm::{FarmBus, FarmTask, actions, parse_evict_data};
use crate::query::{Filter, ObjectQuery};
use crate::record::DataRecord;
use crate::registry::TypeRegistry;
use crate::sql::bind::bind_field;
use crate::sql::ddl::DdlGenerator;
use crate::sql::sanitize::{quote_identifier, validate_identifier};
use crate::staging::{StagingLog, StagingOperation, payload_for};
use crate::typeinfo::{ColumnTable, CoupledInclusion, DependencyMode, ObjectTypeInfo};
use crate::value::ScalarValue;

#[derive(Debug)]
struct StoreInner {
    pool: PgPool,
    config: StoreConfig,
    registry: TypeRegistry,
    staging: Option<StagingLog>,
    farm: FarmBus,
    caches: DashMap<String, Arc<ProviderCache>>,
}

impl StoreInner {
    fn cache_for(&self, object_type: &str) -> Arc<ProviderCache> {
        self.caches
            .entry(object_type.to_string())
            .or_insert_with(|| Arc::new(ProviderCache::new()))
            .value()
            .clone()
    }
}

/// Root handle over one database
#[derive(Debug, Clone)]
pub struct DataStore {
    inner: Arc<StoreInner>,
}

impl DataStore {
    /// Connect to the database and prepare the staging table
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let pool = PgPool::connect(&config.database_url).await.map_err(|e| {
            StoreError::Connection(format!("Database connection failed: {}", e))
        })?;
        Self::from_pool(pool, config).await
    }

    /// Build a store over an existing pool
    pub async fn from_pool(pool: PgPool, config: StoreConfig) -> Result<Self> {
        let staging = if config.log_staging {
            let staging = StagingLog::new(pool.clone(), config.staging_table.clone());
            staging.ensure_table().await?;
            Some(staging)
        } else {
            None
        };

        let farm = FarmBus::new(config.server_name.clone(), config.farm_capacity);

        Ok(Self {
            inner: Arc::new(StoreInner {
                pool,
                config,
                registry: TypeRegistry::new(),
                staging,
                farm,
                caches: DashMap::new(),
            }),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    pub fn farm(&self) -> &FarmBus {
        &self.inner.farm
    }

    pub fn staging(&self) -> Option<&StagingLog> {
        self.inner.staging.as_ref()
    }

    /// Register a descriptor and create its tables and indexes.
    ///
    /// Identifiers are validated before any DDL runs; installation is
    /// idempotent (registration and DDL both are).
    pub async fn install_type(&self, info: ObjectTypeInfo) -> Result<Arc<ObjectTypeInfo>> {
        Self::validate_descriptor(&info)?;

        let info = self.inner.registry.register(info);

        sqlx::query(&DdlGenerator::create_base_table(&info))
            .execute(&self.inner.pool)
            .await?;
        if let Some(coupled_sql) = DdlGenerator::create_coupled_table(&info) {
            sqlx::query(&coupled_sql).execute(&self.inner.pool).await?;
        }
        for index_sql in DdlGenerator::create_indexes(&info) {
            sqlx::query(&index_sql).execute(&self.inner.pool).await?;
        }

        tracing::info!(object_type = %info.object_type, table = %info.table_name, "object type installed");
        Ok(info)
    }

    fn validate_descriptor(info: &ObjectTypeInfo) -> Result<()> {
        let mut names = vec![info.table_name.as_str(), info.id_column.as_str()];
        names.extend(info.guid_column.as_deref());
        names.extend(info.code_name_column.as_deref());
        names.extend(info.site_column.as_deref());
        names.extend(info.display_name_column.as_deref());
        names.extend(info.fields.iter().map(|f| f.name.as_str()));
        if let Some(coupled) = &info.coupled {
            names.push(coupled.table_name.as_str());
            names.push(coupled.join_column.as_str());
            names.extend(coupled.fields.iter().map(|f| f.name.as_str()));
        }

        for name in names {
            validate_identifier(name).map_err(StoreError::validation)?;
        }
        Ok(())
    }

    /// Provider for a registered type
    pub fn provider(&self, object_type: &str) -> Result<ObjectProvider> {
        let type_info = self.inner.registry.get(object_type)?;
        Ok(ObjectProvider {
            inner: self.inner.clone(),
            type_info,
        })
    }

    /// Start a query over a registered type
    pub fn query(&self, object_type: &str) -> Result<ObjectQuery> {
        Ok(ObjectQuery::new(self.inner.registry.get(object_type)?))
    }

    /// Apply one incoming farm task.
    ///
    /// Tasks stamped with this instance's own origin are dropped: the local
    /// cache was already maintained in-line with the write. Unknown actions
    /// are logged and skipped.
    pub fn process_farm_task(&self, task: &FarmTask) {
        if task.origin == self.inner.config.server_name {
            tracing::debug!(action = %task.action, "ignoring farm task from own origin");
            return;
        }

        match task.action.as_str() {
            actions::CACHE_EVICT => match parse_evict_data(&task.data) {
                Some((object_type, id)) => {
                    self.inner.cache_for(object_type).evict(id);
                    tracing::debug!(object_type, id, "evicted by farm task");
                }
                None => {
                    tracing::warn!(data = %task.data, "malformed cache.evict farm task");
                }
            },
            actions::CACHE_CLEAR => {
                self.inner.cache_for(&task.data).clear();
                tracing::debug!(object_type = %task.data, "cache cleared by farm task");
            }
            other => {
                tracing::warn!(action = other, "unknown farm task action");
            }
        }
    }

    /// Evict cache entries older than `max_age` across all types
    pub fn evict_stale_caches(&self, max_age: Duration) -> usize {
        self.inner
            .caches
            .iter()
            .map(|entry| entry.value().evict_older_than(max_age))
            .sum()
    }
}

/// Persistence mediator for one registered type
#[derive(Debug, Clone)]
pub struct ObjectProvider {
    inner: Arc<StoreInner>,
    type_info: Arc<ObjectTypeInfo>,
}

impl ObjectProvider {
    pub fn type_info(&self) -> &Arc<ObjectTypeInfo> {
        &self.type_info
    }

    fn cache(&self) -> Arc<ProviderCache> {
        self.inner.cache_for(&self.type_info.object_type)
    }

    /// Start a query over this type
    pub fn query(&self) -> ObjectQuery {
        ObjectQuery::new(self.type_info.clone())
    }

    /// Execute a query built from [`ObjectProvider::query`]
    pub async fn fetch(&self, query: &ObjectQuery) -> Result<Vec<DataRecord>> {
        query.fetch_all(&self.inner.pool).await
    }

    /// Fetch every record of this type
    pub async fn get_all(&self) -> Result<Vec<DataRecord>> {
        self.query().fetch_all(&self.inner.pool).await
    }

    /// Fetch by primary key, cache first
    pub async fn get_by_id(&self, id: i64) -> Result<Option<DataRecord>> {
        if let Some(record) = self.cache().get_by_id(id) {
            tracing::debug!(object_type = %self.type_info.object_type, id, "cache hit");
            return Ok(Some(record));
        }

        let record = self
            .query()
            .where_eq(self.type_info.id_column.clone(), id)
            .first_or_default(&self.inner.pool)
            .await?;

        if let Some(record) = &record {
            self.cache().insert(record);
        }
        Ok(record)
    }

    /// Fetch by guid, cache first
    pub async fn get_by_guid(&self, guid: Uuid) -> Result<Option<DataRecord>> {
        let guid_column = self.type_info.guid_column.clone().ok_or_else(|| {
            StoreError::validation(format!(
                "Object type '{}' has no guid column",
                self.type_info.object_type
            ))
        })?;

        if let Some(record) = self.cache().get_by_guid(guid) {
            return Ok(Some(record));
        }

        let record = self
            .query()
            .where_eq(guid_column, guid.to_string())
            .first_or_default(&self.inner.pool)
            .await?;

        if let Some(record) = &record {
            self.cache().insert(record);
        }
        Ok(record)
    }

    /// Fetch by code name within its site scope, cache first.
    ///
    /// For site-scoped types, `site_id` of `None` addresses the global
    /// (site-less) object.
    pub async fn get_by_code_name(
        &self,
        code_name: &str,
        site_id: Option<i64>,
    ) -> Result<Option<DataRecord>> {
        let code_column = self.type_info.code_name_column.clone().ok_or_else(|| {
            StoreError::validation(format!(
                "Object type '{}' has no code name column",
                self.type_info.object_type
            ))
        })?;

        if let Some(record) = self.cache().get_by_name(code_name, site_id) {
            return Ok(Some(record));
        }

        let mut query = self.query().where_eq(code_column, code_name);
        if let Some(site_column) = &self.type_info.site_column {
            query = query.where_filter(Filter::eq(site_column.clone(), site_id));
        }

        let record = query.first_or_default(&self.inner.pool).await?;
        if let Some(record) = &record {
            self.cache().insert(record);
        }
        Ok(record)
    }

    /// Persist a record: INSERT when the primary key is unset, otherwise an
    /// UPDATE of dirty columns only. A clean, persisted record is a no-op.
    pub async fn set(&self, record: &mut DataRecord) -> Result<()> {
        if record.object_type() != self.type_info.object_type {
            return Err(StoreError::validation(format!(
                "Record of type '{}' given to provider for '{}'",
                record.object_type(),
                self.type_info.object_type
            )));
        }

        let operation = if record.id().is_none() {
            self.insert_record(record).await?;
            StagingOperation::Insert
        } else {
            if !record.is_dirty() {
                return Ok(());
            }
            self.update_record(record).await?;
            StagingOperation::Update
        };

        let payload = payload_for(record, operation);
        record.clear_dirty();
        self.cache().insert(record);
        self.log_staging(record, operation, payload).await?;
        self.inner
            .farm
            .publish_evict(&self.type_info.object_type, record.id().unwrap_or_default());

        Ok(())
    }

    /// Delete a persisted record after checking its dependents.
    ///
    /// With `Restrict`, blocking children fail the delete; with `Cascade`,
    /// dependent rows are removed first, recursively.
    pub async fn delete(&self, record: &DataRecord) -> Result<()> {
        let id = record.id().ok_or_else(|| {
            StoreError::validation("Cannot delete a record without a primary key")
        })?;

        self.delete_dependents(self.type_info.clone(), id).await?;
        self.delete_row(&self.type_info, id).await?;

        let payload = payload_for(record, StagingOperation::Delete);
        self.log_staging(record, StagingOperation::Delete, payload)
            .await?;
        Ok(())
    }

    async fn log_staging(
        &self,
        record: &DataRecord,
        operation: StagingOperation,
        payload: serde_json::Value,
    ) -> Result<()> {
        if !self.type_info.log_staging {
            return Ok(());
        }
        let Some(staging) = &self.inner.staging else {
            return Ok(());
        };
        let id = record.id().ok_or_else(|| {
            StoreError::validation("Cannot log staging for a record without a primary key")
        })?;
        staging
            .record(
                &self.type_info.object_type,
                id,
                operation,
                payload,
                None,
            )
            .await?;
        Ok(())
    }

    async fn insert_record(&self, record: &mut DataRecord) -> Result<()> {
        self.assert_required_fields(record)?;
        self.assert_code_name_free(record, None).await?;

        // Guids are assigned client-side so the cached record is complete
        // without a refetch
        if let Some(guid_column) = self.type_info.guid_column.clone() {
            if record.get(&guid_column).is_none() {
                record.set(&guid_column, Uuid::new_v4().to_string())?;
            }
        }

        let mut columns = Vec::new();
        let mut values = Vec::new();
        for column in self.type_info.base_columns() {
            if column == self.type_info.id_column {
                continue;
            }
            if let (Some(value), Some(kind)) =
                (record.get(column), self.type_info.column_kind(column))
            {
                columns.push(quote_identifier(column));
                values.push((kind, value.clone()));
            }
        }

        let insert_sql = if columns.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                quote_identifier(&self.type_info.table_name),
                quote_identifier(&self.type_info.id_column)
            )
        } else {
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("${}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                quote_identifier(&self.type_info.table_name),
                columns.join(", "),
                placeholders.join(", "),
                quote_identifier(&self.type_info.id_column)
            )
        };

        let mut query = sqlx::query(&insert_sql);
        for (kind, value) in &values {
            query = bind_field(query, kind, value);
        }

        let row = query.fetch_one(&self.inner.pool).await?;
        let id: i64 = row.try_get(self.type_info.id_column.as_str())?;
        record.mark_persisted(id);

        if let Some(coupled) = &self.type_info.coupled {
            let mut columns = vec![quote_identifier(&coupled.join_column)];
            let mut values = Vec::new();
            for field in &coupled.fields {
                if let Some(value) = record.get(&field.name) {
                    columns.push(quote_identifier(&field.name));
                    values.push((field.kind.clone(), value.clone()));
                }
            }

            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("${}", i)).collect();
            let coupled_sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_identifier(&coupled.table_name),
                columns.join(", "),
                placeholders.join(", ")
            );

            let mut query = sqlx::query(&coupled_sql).bind(id);
            for (kind, value) in &values {
                query = bind_field(query, kind, value);
            }
            query.execute(&self.inner.pool).await?;
        }

        tracing::debug!(object_type = %self.type_info.object_type, id, "record inserted");
        Ok(())
    }

    async fn update_record(&self, record: &DataRecord) -> Result<()> {
        let id = record.id().ok_or_else(|| {
            StoreError::validation("Cannot update a record without a primary key")
        })?;

        let code_name_dirty = self
            .type_info
            .code_name_column
            .as_deref()
            .is_some_and(|c| record.dirty_columns().contains(&c));
        if code_name_dirty {
            self.assert_code_name_free(record, Some(id)).await?;
        }

        let mut base = Vec::new();
        let mut coupled = Vec::new();
        for column in record.dirty_columns() {
            let Some(kind) = self.type_info.column_kind(column) else {
                continue;
            };
            let value = record.get(column).cloned().unwrap_or(ScalarValue::Null);
            match self.type_info.column_table(column) {
                Some(ColumnTable::Base) => base.push((column.to_string(), kind, value)),
                Some(ColumnTable::Coupled) => coupled.push((column.to_string(), kind, value)),
                None => {}
            }
        }

        if !base.is_empty() {
            let set_clauses: Vec<String> = base
                .iter()
                .enumerate()
                .map(|(i, (column, _, _))| {
                    format!("{} = ${}", quote_identifier(column), i as i64 + 2)
                })
                .collect();
            let update_sql = format!(
                "UPDATE {} SET {} WHERE {} = $1",
                quote_identifier(&self.type_info.table_name),
                set_clauses.join(", "),
                quote_identifier(&self.type_info.id_column)
            );

            let mut query = sqlx::query(&update_sql).bind(id);
            for (_, kind, value) in &base {
                query = bind_field(query, kind, value);
            }

            let result = query.execute(&self.inner.pool).await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::not_found(format!(
                    "{} {}",
                    self.type_info.object_type, id
                )));
            }
        }

        if !coupled.is_empty() {
            let table = self.type_info.coupled.as_ref().ok_or_else(|| {
                StoreError::validation(format!(
                    "Object type '{}' has no coupled table",
                    self.type_info.object_type
                ))
            })?;
            let set_clauses: Vec<String> = coupled
                .iter()
                .enumerate()
                .map(|(i, (column, _, _))| {
                    format!("{} = ${}", quote_identifier(column), i as i64 + 2)
                })
                .collect();
            let update_sql = format!(
                "UPDATE {} SET {} WHERE {} = $1",
                quote_identifier(&table.table_name),
                set_clauses.join(", "),
                quote_identifier(&table.join_column)
            );

            let mut query = sqlx::query(&update_sql).bind(id);
            for (_, kind, value) in &coupled {
                query = bind_field(query, kind, value);
            }

            let result = query.execute(&self.inner.pool).await?;
            if result.rows_affected() == 0 {
                return Err(StoreError::not_found(format!(
                    "{} {} (coupled row)",
                    self.type_info.object_type, id
                )));
            }
        }

        tracing::debug!(object_type = %self.type_info.object_type, id, "record updated");
        Ok(())
    }

    fn assert_required_fields(&self, record: &DataRecord) -> Result<()> {
        let base_fields = self.type_info.fields.iter();
        let coupled_fields = self
            .type_info
            .coupled
            .iter()
            .flat_map(|c| c.fields.iter());

        for field in base_fields.chain(coupled_fields) {
            if !field.required || field.default_sql.is_some() {
                continue;
            }
            let missing = match record.get(&field.name) {
                None => true,
                Some(value) => value.is_null(),
            };
            if missing {
                return Err(StoreError::validation(format!(
                    "Required column '{}' is missing",
                    field.name
                )));
            }
        }
        Ok(())
    }

    async fn assert_code_name_free(
        &self,
        record: &DataRecord,
        exclude_id: Option<i64>,
    ) -> Result<()> {
        let Some(code_column) = self.type_info.code_name_column.clone() else {
            return Ok(());
        };
        let Some(code_name) = record.code_name().map(str::to_string) else {
            return Ok(());
        };

        let mut query = ObjectQuery::new(self.type_info.clone())
            .coupled(CoupledInclusion::None)
            .where_eq(code_column, code_name.clone());
        if let Some(site_column) = &self.type_info.site_column {
            query = query.where_filter(Filter::eq(site_column.clone(), record.site_id()));
        }
        if let Some(exclude) = exclude_id {
            query = query.where_filter(Filter::ne(self.type_info.id_column.clone(), exclude));
        }

        if query.count(&self.inner.pool).await? > 0 {
            return Err(StoreError::validation(format!(
                "Code name '{}' is already in use within its scope",
                code_name
            )));
        }
        Ok(())
    }

    fn delete_dependents(
        &self,
        info: Arc<ObjectTypeInfo>,
        id: i64,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for edge in self.inner.registry.children_of(&info.object_type) {
                let child = self.inner.registry.get(&edge.child_type)?;

                let select_sql = format!(
                    "SELECT {} FROM {} WHERE {} = $1 ORDER BY {} ASC",
                    quote_identifier(&child.id_column),
                    quote_identifier(&child.table_name),
                    quote_identifier(&edge.column),
                    quote_identifier(&child.id_column),
                );
                let rows = sqlx::query(&select_sql)
                    .bind(id)
                    .fetch_all(&self.inner.pool)
                    .await?;
                if rows.is_empty() {
                    continue;
                }

                if info.dependency_mode == DependencyMode::Restrict {
                    return Err(StoreError::dependency(format!(
                        "{} {} has {} dependent {} object(s)",
                        info.object_type,
                        id,
                        rows.len(),
                        child.object_type
                    )));
                }

                for row in rows {
                    let child_id: i64 = row.try_get(child.id_column.as_str())?;
                    self.delete_dependents(child.clone(), child_id).await?;
                    self.delete_row(&child, child_id).await?;
                }
            }
            Ok(())
        })
    }

    async fn delete_row(&self, info: &ObjectTypeInfo, id: i64) -> Result<()> {
        if let Some(coupled) = &info.coupled {
            let delete_sql = format!(
                "DELETE FROM {} WHERE {} = $1",
                quote_identifier(&coupled.table_name),
                quote_identifier(&coupled.join_column)
            );
            sqlx::query(&delete_sql)
                .bind(id)
                .execute(&self.inner.pool)
                .await?;
        }

        let delete_sql = format!(
            "DELETE FROM {} WHERE {} = $1",
            quote_identifier(&info.table_name),
            quote_identifier(&info.id_column)
        );
        let result = sqlx::query(&delete_sql)
            .bind(id)
            .execute(&self.inner.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(format!(
                "{} {}",
                info.object_type, id
            )));
        }

        self.inner.cache_for(&info.object_type).evict(id);
        self.inner.farm.publish_evict(&info.object_type, id);
        tracing::debug!(object_type = %info.object_type, id, "record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeinfo::{FieldDefinition, FieldKind};
    use crate::value::ScalarValue;
    use std::collections::HashMap;

    // With staging disabled, from_pool performs no I/O, so a lazy pool never
    // actually connects.
    async fn lazy_store(server_name: &str) -> DataStore {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        let config = StoreConfig::builder("postgres://localhost/unused")
            .server_name(server_name)
            .log_staging(false)
            .build();
        DataStore::from_pool(pool, config).await.unwrap()
    }

    fn brand_info() -> ObjectTypeInfo {
        ObjectTypeInfo::new("shop.brand", "shop_brand", "brand_id")
            .with_code_name("brand_name")
            .with_fields(vec![FieldDefinition::new(
                "brand_description",
                FieldKind::Text,
            )])
    }

    fn cached_record(store: &DataStore, id: i64) {
        let info = store.registry().get("shop.brand").unwrap();
        let mut values = HashMap::new();
        values.insert("brand_id".to_string(), ScalarValue::Integer(id));
        values.insert("brand_name".to_string(), ScalarValue::Text("acme".into()));
        let record = DataRecord::from_values(info, values);
        store.inner.cache_for("shop.brand").insert(&record);
    }

    #[tokio::test]
    async fn test_provider_requires_registration() {
        let store = lazy_store("web01").await;
        let err = store.provider("shop.brand").unwrap_err();
        assert!(matches!(err, StoreError::NotRegistered(_)));

        store.registry().register(brand_info());
        assert!(store.provider("shop.brand").is_ok());
    }

    #[test]
    fn test_descriptor_validation_rejects_bad_identifiers() {
        let err =
            DataStore::validate_descriptor(&ObjectTypeInfo::new("x", "Shop-Brand", "brand_id"))
                .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        let err = DataStore::validate_descriptor(
            &ObjectTypeInfo::new("x", "shop_brand", "brand_id").with_fields(vec![
                FieldDefinition::new("select", FieldKind::Text),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));

        assert!(DataStore::validate_descriptor(&brand_info()).is_ok());
    }

    #[tokio::test]
    async fn test_farm_task_from_other_origin_evicts() {
        let store = lazy_store("web01").await;
        store.registry().register(brand_info());
        cached_record(&store, 7);

        assert!(store.inner.cache_for("shop.brand").get_by_id(7).is_some());
        store.process_farm_task(&FarmTask::evict("web02", "shop.brand", 7));
        assert!(store.inner.cache_for("shop.brand").get_by_id(7).is_none());
    }

    #[tokio::test]
    async fn test_farm_task_from_own_origin_is_ignored() {
        let store = lazy_store("web01").await;
        store.registry().register(brand_info());
        cached_record(&store, 7);

        store.process_farm_task(&FarmTask::evict("web01", "shop.brand", 7));
        assert!(store.inner.cache_for("shop.brand").get_by_id(7).is_some());
    }

    #[tokio::test]
    async fn test_farm_clear_and_unknown_actions() {
        let store = lazy_store("web01").await;
        store.registry().register(brand_info());
        cached_record(&store, 7);

        store.process_farm_task(&FarmTask::new("web02", "no.such.action", ""));
        assert!(store.inner.cache_for("shop.brand").get_by_id(7).is_some());

        store.process_farm_task(&FarmTask::clear("web02", "shop.brand"));
        assert!(store.inner.cache_for("shop.brand").get_by_id(7).is_none());
    }

    #[tokio::test]
    async fn test_evict_stale_caches() {
        let store = lazy_store("web01").await;
        store.registry().register(brand_info());
        cached_record(&store, 1);
        cached_record(&store, 2);

        assert_eq!(store.evict_stale_caches(Duration::from_secs(3600)), 0);
        assert_eq!(store.evict_stale_caches(Duration::ZERO), 2);
    }
}
