//! Data ports: the typed edges capsules push buffers through.
//!
//! A port carries one optional chain callback, a list of linked sink ports,
//! an activation handler invoked on `READY<->PAUSED` transitions, and an
//! optionally-owned background `Task` whose lifecycle follows the port's own
//! activation rather than the capsule's state machine directly (this is
//! what lets a queue's drain task track its *input* port specifically).
//!
//! `push` is `async` and the chain callback returns a future: fan-out and
//! any back-pressure a chain applies (a full queue, a mixer waiting on its
//! other inputs) suspend the calling task rather than blocking its worker
//! thread, so a single-threaded runtime (the `AsyncLoopThread` bridge, a
//! `#[tokio::test]` current-thread test) can still make progress on other
//! tasks while one push is pending.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::object::Object;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Src,
    Sink,
}

/// Type-erased activation handle so a capsule can hold a `Vec<Arc<dyn
/// PortActivation>>` without naming every port's payload type.
pub trait PortActivation: Send + Sync {
    fn port_name(&self) -> &str;
    fn set_active(&self, active: bool);
    fn is_active(&self) -> bool;
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type ChainFn<T> = dyn Fn(T) -> BoxFuture<bool> + Send + Sync;
type ActivationFn = dyn Fn(bool) + Send + Sync;

pub struct DataPushed<'a, T> {
    pub data: &'a T,
}

pub struct Port<T: Send + Sync + 'static> {
    name: String,
    object: Object,
    direction: PortDirection,
    active: AtomicBool,
    chain: Mutex<Option<Arc<ChainFn<T>>>>,
    links: Mutex<Vec<Arc<Port<T>>>>,
    activation_handler: Mutex<Option<Arc<ActivationFn>>>,
    task: Mutex<Option<Task>>,
}

impl<T: Send + Sync + 'static> Port<T> {
    pub fn new(name: impl Into<String>, direction: PortDirection) -> Arc<Self> {
        let name = name.into();
        Arc::new(Self {
            object: Object::new("Port", Some(name.clone())),
            name,
            direction,
            active: AtomicBool::new(false),
            chain: Mutex::new(None),
            links: Mutex::new(Vec::new()),
            activation_handler: Mutex::new(None),
            task: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    /// Installs a callback invoked on every `push`, before fan-out to linked
    /// sinks. Returning `false` suppresses the fan-out for that call. The
    /// callback returns a future so it can cooperatively await back-pressure
    /// (a full queue, a mixer waiting on its other inputs) instead of
    /// blocking the caller's thread.
    pub fn set_chain<F, Fut>(&self, chain: F)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        *self.chain.lock().unwrap() = Some(Arc::new(move |data: T| -> BoxFuture<bool> {
            Box::pin(chain(data))
        }));
    }

    pub fn set_activation_handler<F>(&self, handler: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        *self.activation_handler.lock().unwrap() = Some(Arc::new(handler));
    }

    /// Binds a background task whose start/stop follows this port's own
    /// activation state rather than its owning capsule directly.
    pub fn bind_task(&self, task: Task) {
        *self.task.lock().unwrap() = Some(task);
    }

    pub fn link(self: &Arc<Self>, sink: Arc<Port<T>>) {
        debug_assert_eq!(self.direction, PortDirection::Src);
        debug_assert_eq!(sink.direction, PortDirection::Sink);
        self.links.lock().unwrap().push(sink.clone());
        self.object.emit_signal("target_linked", &sink.name().to_string());
    }

    pub fn unlink(&self, sink: &Arc<Port<T>>) {
        self.links
            .lock()
            .unwrap()
            .retain(|p| !Arc::ptr_eq(p, sink));
    }

    pub fn linked_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    /// Runs the chain callback (if any), then sequentially pushes to every
    /// linked sink in link order. Resolves to `false` if the chain vetoed
    /// the push or the port is inactive. Returns a boxed future rather than
    /// being declared `async fn` so the fan-out below can call `push`
    /// recursively on each linked port without an unbounded future type.
    pub fn push<'a>(&'a self, data: T) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>
    where
        T: Clone,
    {
        Box::pin(async move {
            if !self.active.load(Ordering::Acquire) {
                return false;
            }
            let chain = self.chain.lock().unwrap().clone();
            if let Some(chain) = chain {
                if !chain(data.clone()).await {
                    return false;
                }
            }
            self.object
                .emit_signal("data_pushed", &DataPushed { data: &data } as &dyn Any);
            let links = self.links.lock().unwrap().clone();
            for sink in links {
                sink.push(data.clone()).await;
            }
            true
        })
    }
}

impl<T: Send + Sync + 'static> PortActivation for Port<T> {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
        if let Some(handler) = self.activation_handler.lock().unwrap().clone() {
            handler(active);
        }
        if let Some(task) = self.task.lock().unwrap().as_ref() {
            if active {
                task.resume();
            } else {
                task.pause();
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
