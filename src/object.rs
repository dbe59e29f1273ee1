//! Base identity, property bag, and signal registry shared by every node in
//! the graph (ports, tasks, capsules, buses).
//!
//! Capsules live behind `Arc<dyn Capsule>` so pipeline code and the
//! composite driving their state machine can share one instance; every
//! mutable part of `Object` is therefore behind a `Mutex` and its mutators
//! take `&self`.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use crate::property::PropertyValue;

type SignalCallback = Box<dyn Fn(&dyn Any) + Send + Sync>;

/// Naming, hierarchical path, property bag, signals, and a bound logging
/// span. Every framework type (`Port`, `Task`, `Capsule`, `Bus`) embeds one.
pub struct Object {
    class_name: &'static str,
    name: String,
    inner: Mutex<Inner>,
}

struct Inner {
    path: String,
    properties: HashMap<String, PropertyValue>,
    signals: HashMap<String, Vec<SignalCallback>>,
    span: tracing::Span,
}

impl Object {
    /// `class_name` is the `&'static str` type name used as the default
    /// display name and as the `class` field on the object's logging span.
    pub fn new(class_name: &'static str, name: Option<String>) -> Self {
        let name = name.unwrap_or_else(|| class_name.to_string());
        let span = tracing::info_span!("vpobj", class = class_name, name = %name);
        Self {
            class_name,
            inner: Mutex::new(Inner {
                path: name.clone(),
                properties: HashMap::new(),
                signals: HashMap::new(),
                span,
            }),
            name,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> String {
        self.inner.lock().unwrap().path.clone()
    }

    /// Called by a composite when a child is added: rebinds this object's
    /// path to `parent_path/name` and refreshes the logging span to carry
    /// the full path.
    pub fn set_parent_path(&self, parent_path: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.path = format!("{parent_path}/{}", self.name);
        inner.span = tracing::info_span!("vpobj", class = self.class_name, path = %inner.path);
    }

    pub fn span(&self) -> tracing::Span {
        self.inner.lock().unwrap().span.clone()
    }

    pub fn set_property(&self, key: impl Into<String>, value: PropertyValue) {
        self.inner.lock().unwrap().properties.insert(key.into(), value);
    }

    pub fn get_property(&self, key: &str) -> Option<PropertyValue> {
        self.inner.lock().unwrap().properties.get(key).cloned()
    }

    pub fn connect_signal<F>(&self, signal_name: impl Into<String>, callback: F)
    where
        F: Fn(&dyn Any) + Send + Sync + 'static,
    {
        self.inner
            .lock()
            .unwrap()
            .signals
            .entry(signal_name.into())
            .or_default()
            .push(Box::new(callback));
    }

    /// Invoke every callback registered for `signal_name` with `payload`.
    /// Callbacks are synchronous and run in registration order; this mirrors
    /// the original's `emit_signal`, which is itself a plain (non-async)
    /// method. Callbacks must not call back into this object's signal API
    /// re-entrantly (the lock is held for the duration of the emit).
    pub fn emit_signal(&self, signal_name: &str, payload: &dyn Any) {
        let inner = self.inner.lock().unwrap();
        if let Some(callbacks) = inner.signals.get(signal_name) {
            for callback in callbacks {
                callback(payload);
            }
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class_name", &self.class_name)
            .field("path", &self.path())
            .finish()
    }
}
