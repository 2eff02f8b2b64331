//! Farm tasks
//!
//! Cross-instance cache coherence is driven by broadcast "farm tasks":
//! named actions plus a small payload, published synchronously with every
//! write. In-process the bus is a `tokio::sync::broadcast` channel; a
//! transport layer relaying tasks between instances subscribes here and
//! republishes on the other side. Consumers dispatch by action name and
//! ignore tasks stamped with their own origin.

use tokio::sync::broadcast;

/// Well-known farm actions
pub mod actions {
    /// Evict one cached object; data is `object_type|id`
    pub const CACHE_EVICT: &str = "cache.evict";
    /// Clear the whole cache of one type; data is the object type
    pub const CACHE_CLEAR: &str = "cache.clear";
}

/// One broadcast task
#[derive(Debug, Clone)]
pub struct FarmTask {
    /// Server name of the publishing instance
    pub origin: String,
    /// Action name consumers dispatch on
    pub action: String,
    /// Textual payload
    pub data: String,
    /// Optional binary payload
    pub binary: Option<Vec<u8>>,
}

impl FarmTask {
    pub fn new(
        origin: impl Into<String>,
        action: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            action: action.into(),
            data: data.into(),
            binary: None,
        }
    }

    pub fn with_binary(mut self, binary: Vec<u8>) -> Self {
        self.binary = Some(binary);
        self
    }

    /// Task evicting one cached object on other instances
    pub fn evict(origin: impl Into<String>, object_type: &str, id: i64) -> Self {
        Self::new(origin, actions::CACHE_EVICT, format!("{}|{}", object_type, id))
    }

    /// Task clearing one type's cache on other instances
    pub fn clear(origin: impl Into<String>, object_type: &str) -> Self {
        Self::new(origin, actions::CACHE_CLEAR, object_type)
    }
}

/// Parse the `object_type|id` payload of a [`actions::CACHE_EVICT`] task
pub fn parse_evict_data(data: &str) -> Option<(&str, i64)> {
    let (object_type, id) = data.rsplit_once('|')?;
    Some((object_type, id.parse().ok()?))
}

/// Broadcast channel for farm tasks
#[derive(Debug)]
pub struct FarmBus {
    sender: broadcast::Sender<FarmTask>,
    server_name: String,
}

impl FarmBus {
    pub fn new(server_name: impl Into<String>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            server_name: server_name.into(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Publish a task stamped with this instance's origin.
    ///
    /// A send with no subscribers is not an error; publishing never fails
    /// the write path it accompanies.
    pub fn publish(&self, task: FarmTask) {
        let _ = self.sender.send(task);
    }

    /// Shorthand publishing an eviction for one object
    pub fn publish_evict(&self, object_type: &str, id: i64) {
        self.publish(FarmTask::evict(self.server_name.clone(), object_type, id));
    }

    /// Shorthand publishing a full cache clear for one type
    pub fn publish_clear(&self, object_type: &str) {
        self.publish(FarmTask::clear(self.server_name.clone(), object_type));
    }

    /// Subscribe to tasks published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<FarmTask> {
        self.sender.subscribe()
    }
}
