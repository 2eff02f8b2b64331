//! Versioned object snapshots
//!
//! Export/import documents carry every object of one type as JSON, stamped
//! with a compatibility version. Importing an older document runs it through
//! a chain of converters until it reaches the current version, then upserts
//! each object through the type's provider (matching by guid, falling back
//! to code name).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::provider::ObjectProvider;
use crate::record::DataRecord;

/// Version stamped on documents this crate produces
pub const SNAPSHOT_VERSION: &str = "1.0";

/// Snapshot of all exported objects of one type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    /// Compatibility version of the document
    pub version: String,
    /// Object type the document belongs to
    #[serde(rename = "objectType")]
    pub object_type: String,
    /// One JSON object per record
    pub objects: Vec<serde_json::Value>,
}

impl ObjectSnapshot {
    /// Build a current-version snapshot from records
    pub fn from_records(object_type: impl Into<String>, records: &[DataRecord]) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            object_type: object_type.into(),
            objects: records.iter().map(DataRecord::to_json).collect(),
        }
    }
}

/// One cross-version migration step
pub trait SnapshotConverter: Send + Sync {
    /// Version string this converter consumes
    fn source_version(&self) -> &str;
    /// Version string this converter produces
    fn target_version(&self) -> &str;
    /// Rewrite the document for the target version
    fn convert(&self, snapshot: ObjectSnapshot) -> Result<ObjectSnapshot>;
}

/// Converter chain plus export/import entry points
#[derive(Default)]
pub struct SnapshotPipeline {
    converters: Vec<Box<dyn SnapshotConverter>>,
}

impl SnapshotPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a converter step
    pub fn with_converter(mut self, converter: Box<dyn SnapshotConverter>) -> Self {
        self.converters.push(converter);
        self
    }

    /// Upgrade a document to [`SNAPSHOT_VERSION`] by chaining converters.
    ///
    /// Fails when no converter consumes the document's version.
    pub fn upgrade(&self, mut snapshot: ObjectSnapshot) -> Result<ObjectSnapshot> {
        let mut steps = 0;
        while snapshot.version != SNAPSHOT_VERSION {
            if steps > self.converters.len() {
                return Err(StoreError::validation(format!(
                    "Converter chain does not terminate for version '{}'",
                    snapshot.version
                )));
            }

            let converter = self
                .converters
                .iter()
                .find(|c| c.source_version() == snapshot.version)
                .ok_or_else(|| {
                    StoreError::validation(format!(
                        "No converter for snapshot version '{}'",
                        snapshot.version
                    ))
                })?;

            let target = converter.target_version().to_string();
            snapshot = converter.convert(snapshot)?;
            snapshot.version = target;
            steps += 1;
        }
        Ok(snapshot)
    }

    /// Export every object of the provider's type
    pub async fn export(&self, provider: &ObjectProvider) -> Result<ObjectSnapshot> {
        let records = provider.get_all().await?;
        Ok(ObjectSnapshot::from_records(
            provider.type_info().object_type.clone(),
            &records,
        ))
    }

    /// Upgrade and upsert a document; returns the number of objects applied
    pub async fn import(
        &self,
        provider: &ObjectProvider,
        snapshot: ObjectSnapshot,
    ) -> Result<usize> {
        if snapshot.object_type != provider.type_info().object_type {
            return Err(StoreError::validation(format!(
                "Snapshot is for '{}', provider is for '{}'",
                snapshot.object_type,
                provider.type_info().object_type
            )));
        }

        let snapshot = self.upgrade(snapshot)?;
        let count = snapshot.objects.len();
        for object in &snapshot.objects {
            self.upsert_object(provider, object).await?;
        }
        Ok(count)
    }

    async fn upsert_object(
        &self,
        provider: &ObjectProvider,
        payload: &serde_json::Value,
    ) -> Result<()> {
        let object = payload.as_object().ok_or_else(|| {
            StoreError::validation("Snapshot object must be a JSON object")
        })?;
        let info = provider.type_info().clone();

        let mut record = match self.find_existing(provider, object).await? {
            Some(record) => record,
            None => DataRecord::new(info.clone()),
        };

        for (column, value) in object {
            if *column == info.id_column {
                continue;
            }
            let Some(kind) = info.column_kind(column) else {
                tracing::warn!(
                    object_type = %info.object_type,
                    column = %column,
                    "snapshot column not in descriptor; skipped"
                );
                continue;
            };
            let scalar = kind.from_json(value).map_err(|e| {
                StoreError::validation(format!("Invalid value for column '{}': {}", column, e))
            })?;
            record.set(column, scalar)?;
        }

        provider.set(&mut record).await
    }

    async fn find_existing(
        &self,
        provider: &ObjectProvider,
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Option<DataRecord>> {
        let info = provider.type_info();

        if let Some(guid_column) = &info.guid_column {
            if let Some(guid) = object
                .get(guid_column)
                .and_then(|v| v.as_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                if let Some(record) = provider.get_by_guid(guid).await? {
                    return Ok(Some(record));
                }
                return Ok(None);
            }
        }

        if let Some(code_column) = &info.code_name_column {
            if let Some(code_name) = object.get(code_column).and_then(|v| v.as_str()) {
                let site_id = info
                    .site_column
                    .as_ref()
                    .and_then(|c| object.get(c))
                    .and_then(|v| v.as_i64());
                return provider.get_by_code_name(code_name, site_id).await;
            }
        }

        Ok(None)
    }
}
