//! Pull-driven source capsule.
//!
//! The background pull loop runs whenever the output port is active (i.e.
//! from `Paused` onward), the same way the original kept reading from its
//! device in `PAUSED` to keep buffers warm, but only forwards what it reads
//! once the capsule reaches `Running` — pulling early is harmless, pushing
//! early would leak a stale frame downstream before the pipeline is ready.
//!
//! A rate-paced source (a file, a virtual device) reports a `block_duration`
//! so the pull loop waits for each block to become due on a fixed schedule
//! instead of pulling as fast as it is polled; a hardware-clocked source
//! (a microphone) returns `None` and is left to pace itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::capsule::{Capsule, CapsuleCore, VpStateTransition};
use crate::error::VpResult;
use crate::port::{Port, PortDirection};
use crate::task::Task;

/// Implemented by a concrete source (file reader, mic capture, virtual
/// device). `pull` blocks the pull-loop task until a frame is available, or
/// returns `None` at end of stream / when starved.
pub trait Source<T: Send + Sync + 'static>: Send + Sync {
    fn pull(&self) -> Option<T>;

    /// Time between successive blocks for a pull-driven source. `None` (the
    /// default) means the source paces itself and the pull loop should poll
    /// continuously instead of waiting on a schedule.
    fn block_duration(&self) -> Option<Duration> {
        None
    }

    /// Opens the underlying device/resource. Called when the output port
    /// activates (`READY -> PAUSED`).
    fn start(&self) -> VpResult<()> {
        Ok(())
    }

    /// Closes the underlying device/resource. Called when the output port
    /// deactivates (`PAUSED -> READY`).
    fn stop(&self) -> VpResult<()> {
        Ok(())
    }
}

pub struct BaseSource<T: Send + Sync + Clone + 'static> {
    core: CapsuleCore,
    out_port: Arc<Port<T>>,
    running: Arc<AtomicBool>,
}

impl<T: Send + Sync + Clone + 'static> BaseSource<T> {
    pub fn new(
        class_name: &'static str,
        name: Option<String>,
        source: Arc<dyn Source<T>>,
    ) -> Arc<Self> {
        let out_port: Arc<Port<T>> = Port::new("src", PortDirection::Src);
        let core = CapsuleCore::new(class_name, name);
        core.register_port(out_port.clone());

        let running = Arc::new(AtomicBool::new(false));
        let task = Task::new("pull-loop");
        let out_for_task = out_port.clone();
        let running_for_task = running.clone();
        let source_for_task = source.clone();
        let block_duration = source.block_duration();
        task.start(move |handle| async move {
            let mut next_time = block_duration.map(|_| Instant::now());
            loop {
                if handle.is_cancelled() {
                    break;
                }
                handle.wait_if_paused().await;
                if handle.is_cancelled() {
                    break;
                }
                if let (Some(block_duration), Some(due)) = (block_duration, next_time) {
                    tokio::time::sleep_until(due).await;
                    next_time = Some(due + block_duration);
                }
                match source_for_task.pull() {
                    Some(frame) => {
                        if running_for_task.load(Ordering::Acquire) {
                            out_for_task.push(frame).await;
                        }
                    }
                    None => {
                        if block_duration.is_none() {
                            tokio::time::sleep(Duration::from_millis(5)).await;
                        }
                    }
                }
            }
        });
        task.pause();
        out_port.bind_task(task);

        let source_for_activation = source.clone();
        out_port.set_activation_handler(move |active| {
            let result = if active {
                source_for_activation.start()
            } else {
                source_for_activation.stop()
            };
            if let Err(error) = result {
                tracing::error!(%error, active, "source activation hook failed");
            }
        });

        Arc::new(Self {
            core,
            out_port,
            running,
        })
    }

    pub fn out_port(&self) -> Arc<Port<T>> {
        self.out_port.clone()
    }
}

impl<T: Send + Sync + Clone + 'static> Capsule for BaseSource<T> {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }

    fn on_transition(&self, transition: VpStateTransition) -> VpResult<()> {
        match transition {
            VpStateTransition::PausedToRunning => self.running.store(true, Ordering::Release),
            VpStateTransition::RunningToPaused => self.running.store(false, Ordering::Release),
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::VpState;
    use std::sync::Mutex;

    struct FixedSource(Mutex<Vec<i32>>);
    impl Source<i32> for FixedSource {
        fn pull(&self) -> Option<i32> {
            self.0.lock().unwrap().pop()
        }
    }

    #[tokio::test]
    async fn pulled_frames_reach_downstream_once_running() {
        let source = Arc::new(FixedSource(Mutex::new(vec![1, 2, 3])));
        let base = BaseSource::new("Source", None, source);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let sink: Arc<Port<i32>> = Port::new("downstream", PortDirection::Sink);
        sink.set_chain(move |v: i32| {
            let seen_clone = seen_clone.clone();
            async move {
                seen_clone.lock().unwrap().push(v);
                true
            }
        });
        sink.set_active(true);
        base.out_port().link(sink);
        base.set_state(VpState::Paused).unwrap();
        base.set_state(VpState::Running).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    struct LifecycleSource {
        started: Arc<AtomicBool>,
    }
    impl Source<i32> for LifecycleSource {
        fn pull(&self) -> Option<i32> {
            None
        }
        fn start(&self) -> VpResult<()> {
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn stop(&self) -> VpResult<()> {
            self.started.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn device_opens_on_activate_and_closes_on_deactivate() {
        let started = Arc::new(AtomicBool::new(false));
        let source = Arc::new(LifecycleSource {
            started: started.clone(),
        });
        let base = BaseSource::new("Source", None, source);
        assert!(!started.load(Ordering::SeqCst));
        base.set_state(VpState::Paused).unwrap();
        assert!(started.load(Ordering::SeqCst));
        base.set_state(VpState::Ready).unwrap();
        assert!(!started.load(Ordering::SeqCst));
    }
}
