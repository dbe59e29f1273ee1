//! Bridges synchronous, non-tokio callers (device callback threads, a host
//! application's own main loop) into the async world: a dedicated OS thread
//! owns a current-thread tokio runtime, and `submit` lets any foreign
//! thread run a future on it and block until it resolves.

use std::future::Future;
use std::thread::JoinHandle;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

use crate::error::{VpError, VpResult};

pub struct AsyncLoopThread {
    handle: Handle,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl AsyncLoopThread {
    pub fn spawn() -> VpResult<Self> {
        let (handle_tx, handle_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let join = std::thread::Builder::new()
            .name("vpipe-async-loop".into())
            .spawn(move || {
                let runtime = match Builder::new_current_thread().enable_all().build() {
                    Ok(rt) => rt,
                    Err(_) => return,
                };
                if handle_tx.send(runtime.handle().clone()).is_err() {
                    return;
                }
                runtime.block_on(async {
                    let _ = shutdown_rx.await;
                });
            })
            .map_err(|e| VpError::DeviceError(e.to_string()))?;

        let handle = handle_rx
            .recv()
            .map_err(|_| VpError::DeviceError("async loop thread failed to start".into()))?;

        Ok(Self {
            handle,
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// Runs `future` to completion on the background loop, blocking the
    /// calling thread until it resolves. The caller must not itself be
    /// inside a tokio runtime — `Handle::block_on` panics if it is.
    pub fn submit<F, T>(&self, future: F) -> T
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.handle.block_on(future)
    }
}

impl Drop for AsyncLoopThread {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
