//! Configuration for the data store
//!
//! Provides a builder pattern for configuring connection, staging, and
//! cache-coherence behavior.

use std::time::Duration;

/// Configuration for the data store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// PostgreSQL database URL
    pub database_url: String,
    /// Name of the staging-task table (default: "object_staging_task")
    pub staging_table: String,
    /// Name identifying this instance in farm tasks (default: "local")
    pub server_name: String,
    /// Whether mutations of staging-enabled types are logged (default: true)
    pub log_staging: bool,
    /// Buffered capacity of the farm broadcast channel (default: 256)
    pub farm_capacity: usize,
    /// Age past which the cache-cleanup worker evicts entries (default: 10 min)
    pub cache_max_age: Duration,
}

impl StoreConfig {
    /// Create a new configuration builder
    pub fn builder(database_url: impl Into<String>) -> StoreConfigBuilder {
        StoreConfigBuilder::new(database_url)
    }
}

/// Builder for StoreConfig
#[derive(Debug)]
pub struct StoreConfigBuilder {
    database_url: String,
    staging_table: String,
    server_name: String,
    log_staging: bool,
    farm_capacity: usize,
    cache_max_age: Duration,
}

impl StoreConfigBuilder {
    /// Create a new builder with the database URL
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            staging_table: "object_staging_task".to_string(),
            server_name: "local".to_string(),
            log_staging: true,
            farm_capacity: 256,
            cache_max_age: Duration::from_secs(600),
        }
    }

    /// Set the staging-task table name (default: "object_staging_task")
    pub fn staging_table(mut self, name: impl Into<String>) -> Self {
        self.staging_table = name.into();
        self
    }

    /// Set the name this instance stamps on outgoing farm tasks
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Enable or disable staging logging globally (default: true)
    pub fn log_staging(mut self, enabled: bool) -> Self {
        self.log_staging = enabled;
        self
    }

    /// Set the farm broadcast channel capacity (default: 256)
    pub fn farm_capacity(mut self, capacity: usize) -> Self {
        self.farm_capacity = capacity;
        self
    }

    /// Set the maximum age of provider-cache entries (default: 10 minutes)
    pub fn cache_max_age(mut self, max_age: Duration) -> Self {
        self.cache_max_age = max_age;
        self
    }

    /// Build the configuration
    pub fn build(self) -> StoreConfig {
        StoreConfig {
            database_url: self.database_url,
            staging_table: self.staging_table,
            server_name: self.server_name,
            log_staging: self.log_staging,
            farm_capacity: self.farm_capacity,
            cache_max_age: self.cache_max_age,
        }
    }
}
