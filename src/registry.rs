//! Process-wide registry of entity type descriptors
//!
//! Types are registered once at startup; registration is idempotent per
//! object-type string and descriptors are immutable afterwards. The registry
//! also tracks the dependency edges used by delete-time checks, with
//! [`TypeRegistry::add_dependency`] as the module-init extension point for
//! edges that are not part of a descriptor itself.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::{Result, StoreError};
use crate::typeinfo::ObjectTypeInfo;

/// Edge from a parent object type to a dependent child type
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyEdge {
    /// Object type of the dependent
    pub child_type: String,
    /// Column on the child's base table referencing the parent id
    pub column: String,
}

/// Registry of immutable type descriptors
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: DashMap<String, Arc<ObjectTypeInfo>>,
    edges: DashMap<String, Vec<DependencyEdge>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// Idempotent: registering an object type string a second time returns
    /// the previously registered descriptor unchanged. A parent link on the
    /// descriptor is recorded as a dependency edge.
    pub fn register(&self, info: ObjectTypeInfo) -> Arc<ObjectTypeInfo> {
        let key = info.object_type.clone();
        match self.types.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let info = Arc::new(info);
                entry.insert(info.clone());
                if let Some(parent) = &info.parent {
                    self.push_edge(&parent.object_type, &info.object_type, &parent.column);
                }
                tracing::debug!(object_type = %info.object_type, "registered object type");
                info
            }
        }
    }

    /// Look up a descriptor, failing when the type was never registered
    pub fn get(&self, object_type: &str) -> Result<Arc<ObjectTypeInfo>> {
        self.try_get(object_type)
            .ok_or_else(|| StoreError::not_registered(object_type))
    }

    /// Look up a descriptor without failing
    pub fn try_get(&self, object_type: &str) -> Option<Arc<ObjectTypeInfo>> {
        self.types.get(object_type).map(|entry| entry.value().clone())
    }

    /// All registered descriptors
    pub fn all(&self) -> Vec<Arc<ObjectTypeInfo>> {
        self.types.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Add a dependency edge outside of descriptor registration.
    ///
    /// Both endpoint types must already be registered.
    pub fn add_dependency(
        &self,
        parent_type: &str,
        child_type: &str,
        column: impl Into<String>,
    ) -> Result<()> {
        if self.try_get(parent_type).is_none() {
            return Err(StoreError::not_registered(parent_type));
        }
        if self.try_get(child_type).is_none() {
            return Err(StoreError::not_registered(child_type));
        }
        self.push_edge(parent_type, child_type, &column.into());
        Ok(())
    }

    /// Dependency edges from a parent type to its children
    pub fn children_of(&self, object_type: &str) -> Vec<DependencyEdge> {
        self.edges
            .get(object_type)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    fn push_edge(&self, parent_type: &str, child_type: &str, column: &str) {
        let edge = DependencyEdge {
            child_type: child_type.to_string(),
            column: column.to_string(),
        };
        let mut edges = self.edges.entry(parent_type.to_string()).or_default();
        if !edges.contains(&edge) {
            edges.push(edge);
        }
    }
}
