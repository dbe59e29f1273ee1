//! Message bus: a FIFO queue plus a watcher list, with messages from a
//! composite's internal bus bubbling up to its parent's.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessageKind {
    StateChanged,
    Error,
    Eos,
    Custom(String),
}

#[derive(Debug, Clone)]
pub struct BusMessage {
    pub kind: BusMessageKind,
    pub source_path: String,
    pub payload: serde_json::Value,
}

impl BusMessage {
    pub fn new(kind: BusMessageKind, source_path: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind,
            source_path: source_path.into(),
            payload,
        }
    }
}

type Watcher = dyn Fn(&BusMessage) + Send + Sync;

/// A capsule's (or pipeline's) message bus. Composites give each child its
/// own bus and set themselves as its parent, so a message posted deep in
/// the hierarchy bubbles all the way to the root pipeline's bus without the
/// poster needing a handle to the root.
pub struct Bus {
    queue: Mutex<VecDeque<BusMessage>>,
    watchers: Mutex<Vec<Arc<Watcher>>>,
    parent: Mutex<Option<Arc<Bus>>>,
}

impl Bus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: Mutex::new(VecDeque::new()),
            watchers: Mutex::new(Vec::new()),
            parent: Mutex::new(None),
        })
    }

    pub fn set_parent(&self, parent: Arc<Bus>) {
        *self.parent.lock().unwrap() = Some(parent);
    }

    pub fn watch<F>(&self, callback: F)
    where
        F: Fn(&BusMessage) + Send + Sync + 'static,
    {
        self.watchers.lock().unwrap().push(Arc::new(callback));
    }

    /// Enqueues `message` on this bus, notifies watchers, then bubbles the
    /// same message to the parent bus (if any) so it notifies watchers and
    /// is enqueued there too.
    pub fn post(&self, message: BusMessage) {
        for watcher in self.watchers.lock().unwrap().iter() {
            watcher(&message);
        }
        self.queue.lock().unwrap().push_back(message.clone());
        let parent = self.parent.lock().unwrap().clone();
        if let Some(parent) = parent {
            parent.post(message);
        }
    }

    pub fn poll(&self) -> Option<BusMessage> {
        self.queue.lock().unwrap().pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_returns_messages_in_post_order() {
        let bus = Bus::new();
        bus.post(BusMessage::new(BusMessageKind::Eos, "a", serde_json::Value::Null));
        bus.post(BusMessage::new(BusMessageKind::Eos, "b", serde_json::Value::Null));
        assert_eq!(bus.poll().unwrap().source_path, "a");
        assert_eq!(bus.poll().unwrap().source_path, "b");
        assert!(bus.poll().is_none());
    }

    #[test]
    fn messages_bubble_to_parent() {
        let parent = Bus::new();
        let child = Bus::new();
        child.set_parent(parent.clone());
        child.post(BusMessage::new(BusMessageKind::StateChanged, "child", serde_json::Value::Null));
        assert_eq!(child.poll().unwrap().source_path, "child");
        assert_eq!(parent.poll().unwrap().source_path, "child");
    }

    #[test]
    fn watchers_fire_before_bubbling() {
        let bus = Bus::new();
        let seen = Arc::new(Mutex::new(false));
        let seen_clone = seen.clone();
        bus.watch(move |_| {
            *seen_clone.lock().unwrap() = true;
        });
        bus.post(BusMessage::new(BusMessageKind::Error, "x", serde_json::Value::Null));
        assert!(*seen.lock().unwrap());
    }
}
