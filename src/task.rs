//! Cooperative background task owned by a port or source/sink capsule.
//!
//! Mirrors the original's `VpTask`: a named unit of background work with a
//! `Stopped -> Started -> Paused` state machine, driven by an owning
//! capsule's activation rather than by its own public API. Cancellation and
//! pausing are cooperative: the running future observes a `TaskHandle` and
//! must check it between units of work.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::object::Object;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Stopped,
    Started,
    Paused,
}

/// Handed to the spawned future so it can cooperate with pause/stop requests
/// issued from the owning task's thread.
#[derive(Clone)]
pub struct TaskHandle {
    cancel: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl TaskHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Blocks the caller while the task is paused. Returns immediately (even
    /// while paused) once cancellation is requested, so a paused loop can
    /// still unwind on stop.
    pub async fn wait_if_paused(&self) {
        while self.paused.load(Ordering::Acquire) && !self.cancel.load(Ordering::Acquire) {
            self.notify.notified().await;
        }
    }
}

pub struct Task {
    object: Object,
    state: std::sync::Mutex<TaskState>,
    cancel: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    notify: Arc<Notify>,
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            object: Object::new("Task", Some(name.into())),
            state: std::sync::Mutex::new(TaskState::Stopped),
            cancel: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            handle: std::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> TaskState {
        *self.state.lock().unwrap()
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    /// Spawns `body` on the current tokio runtime. `body` receives a
    /// `TaskHandle` it must poll cooperatively. No-op if already started.
    pub fn start<F, Fut>(&self, body: F)
    where
        F: FnOnce(TaskHandle) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state.lock().unwrap();
        if *state != TaskState::Stopped {
            return;
        }
        self.cancel.store(false, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        let task_handle = TaskHandle {
            cancel: self.cancel.clone(),
            paused: self.paused.clone(),
            notify: self.notify.clone(),
        };
        let span = self.object.span().clone();
        let join = tokio::spawn(async move {
            let _enter = span.enter();
            body(task_handle).await;
        });
        *self.handle.lock().unwrap() = Some(join);
        *state = TaskState::Started;
        tracing::debug!(parent: &self.object.span(), "task started");
    }

    pub fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != TaskState::Started {
            return;
        }
        self.paused.store(true, Ordering::Release);
        *state = TaskState::Paused;
    }

    pub fn resume(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != TaskState::Paused {
            return;
        }
        self.paused.store(false, Ordering::Release);
        self.notify.notify_waiters();
        *state = TaskState::Started;
    }

    /// Requests cancellation and waits for the spawned future to finish.
    pub async fn stop(&self) {
        let join = {
            let mut state = self.state.lock().unwrap();
            if *state == TaskState::Stopped {
                return;
            }
            *state = TaskState::Stopped;
            self.handle.lock().unwrap().take()
        };
        self.cancel.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);
        self.notify.notify_waiters();
        if let Some(join) = join {
            let _ = join.await;
        }
        tracing::debug!(parent: &self.object.span(), "task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_until_stopped() {
        let task = Task::new("counter");
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        task.start(move |handle| async move {
            while !handle.is_cancelled() {
                handle.wait_if_paused().await;
                if handle.is_cancelled() {
                    break;
                }
                counter_clone.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.stop().await;
        assert!(counter.load(Ordering::SeqCst) > 0);
        assert_eq!(task.state(), TaskState::Stopped);
    }

    #[tokio::test]
    async fn pause_halts_progress() {
        let task = Task::new("counter");
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();
        task.start(move |handle| async move {
            while !handle.is_cancelled() {
                handle.wait_if_paused().await;
                if handle.is_cancelled() {
                    break;
                }
                counter_clone.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        task.pause();
        let snapshot = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), snapshot);
        task.resume();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(counter.load(Ordering::SeqCst) > snapshot);
        task.stop().await;
    }
}
