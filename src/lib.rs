//! # objectbase
//!
//! A metadata-driven PostgreSQL object persistence and query layer.
//!
//! Entity types are declared once as immutable descriptors (table, system
//! columns, fields, dependency edges) and every registered type gets the
//! same provider surface: cached lookups by id/guid/code name, validated
//! writes of dirty columns, dependency-aware deletes, and a deferred fluent
//! query builder. Mutations synchronously publish cache-invalidation farm
//! tasks and append to a durable staging log for cross-server replay.
//!
//! ## Features
//!
//! - **Declarative Type Registry**: one immutable descriptor per entity
//!   type, registered idempotently at startup
//! - **Generic Providers**: CRUD for every type with read-through caches
//!   keyed by id, guid, and code name within site scope
//! - **Object Queries**: conjunctive fluent filters rendered to
//!   parameterized SQL, including coupled-table join modes
//! - **Transaction Scopes**: reference-counted nesting with
//!   rollback-on-dispose discipline
//! - **Staging Log**: FIFO change tasks plus versioned snapshot
//!   export/import with converter steps
//! - **Farm Tasks**: broadcast cache invalidation for multi-instance
//!   deployments
//! - **Scheduled Workers**: panic-isolated maintenance jobs for an external
//!   timer loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use objectbase::{
//!     DataRecord, DataStore, FieldDefinition, FieldKind, ObjectTypeInfo, StoreConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::builder("postgres://localhost/shop").build();
//!     let store = DataStore::connect(config).await?;
//!
//!     // Declare and install a type
//!     store
//!         .install_type(
//!             ObjectTypeInfo::new("shop.brand", "shop_brand", "brand_id")
//!                 .with_guid("brand_guid")
//!                 .with_code_name("brand_name")
//!                 .with_fields(vec![
//!                     FieldDefinition::new("brand_description", FieldKind::Text),
//!                     FieldDefinition::new("brand_enabled", FieldKind::Bool)
//!                         .required()
//!                         .default_sql("TRUE"),
//!                 ]),
//!         )
//!         .await?;
//!
//!     // Write through the provider
//!     let provider = store.provider("shop.brand")?;
//!     let mut brand = DataRecord::new(provider.type_info().clone());
//!     brand.set("brand_name", "acme")?;
//!     brand.set("brand_description", "Power tools")?;
//!     provider.set(&mut brand).await?;
//!
//!     // Cached read-your-writes
//!     let fetched = provider.get_by_id(brand.id().unwrap()).await?;
//!     assert!(fetched.is_some());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The store is configured with [`StoreConfig`]:
//!
//! ```rust
//! use objectbase::StoreConfig;
//! use std::time::Duration;
//!
//! let config = StoreConfig::builder("postgres://localhost/shop")
//!     .server_name("web01")                       // origin stamped on farm tasks
//!     .staging_table("object_staging_task")       // change-log table
//!     .log_staging(true)                          // record mutations for replay
//!     .cache_max_age(Duration::from_secs(600))    // cleanup-worker horizon
//!     .build();
//! ```
//!
//! ## Multi-Instance Deployments
//!
//! Providers keep their own caches coherent in-line with each write. Other
//! instances learn about writes through farm tasks: relay the tasks from
//! [`FarmBus::subscribe`](farm::FarmBus::subscribe) between instances and
//! feed incoming ones to [`DataStore::process_farm_task`].

pub mod cache;
pub mod config;
pub mod error;
pub mod farm;
pub mod provider;
pub mod query;
pub mod record;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod sql;
pub mod staging;
pub mod transaction;
pub mod typeinfo;
pub mod value;

// Re-export main types for convenience
pub use cache::ProviderCache;
pub use config::{StoreConfig, StoreConfigBuilder};
pub use error::{Result, StoreError};
pub use farm::{FarmBus, FarmTask};
pub use provider::{DataStore, ObjectProvider};
pub use query::{CompareOp, Filter, ObjectQuery, SortOrder};
pub use record::DataRecord;
pub use registry::{DependencyEdge, TypeRegistry};
pub use scheduler::{
    CacheCleanupWorker, StagingPurgeWorker, TaskInfo, TaskWorker, execute_worker,
};
pub use snapshot::{ObjectSnapshot, SnapshotConverter, SnapshotPipeline, SNAPSHOT_VERSION};
pub use staging::{StagingLog, StagingOperation, StagingTask};
pub use transaction::{
    PgBackend, ScopeOutcome, ScopeState, TransactionBackend, TransactionScope,
};
pub use typeinfo::{
    ColumnTable, CoupledData, CoupledInclusion, DependencyMode, FieldDefinition, FieldKind,
    ObjectTypeInfo, ParentLink, StagingPayload,
};
pub use value::ScalarValue;

// Re-export SQL utilities for advanced users
pub use sql::ddl::DdlGenerator;
pub use sql::sanitize::{quote_identifier, validate_identifier};
