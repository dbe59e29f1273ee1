//! Push-driven sink capsule: delivers everything pushed to its input port
//! to an owned `Sink` implementation, opening/closing the underlying device
//! as the input port activates.

use std::sync::Arc;

use crate::capsule::{Capsule, CapsuleCore};
use crate::port::{Port, PortDirection};

pub trait Sink<T: Send + Sync + 'static>: Send + Sync {
    fn consume(&self, data: T);

    /// Opens the underlying device/resource. Called when the input port
    /// activates (`READY -> PAUSED`).
    fn open(&self) -> crate::error::VpResult<()> {
        Ok(())
    }

    /// Closes the underlying device/resource. Called when the input port
    /// deactivates (`PAUSED -> READY`).
    fn close(&self) -> crate::error::VpResult<()> {
        Ok(())
    }
}

pub struct BaseSink<T: Send + Sync + Clone + 'static> {
    core: CapsuleCore,
    in_port: Arc<Port<T>>,
}

impl<T: Send + Sync + Clone + 'static> BaseSink<T> {
    pub fn new(class_name: &'static str, name: Option<String>, sink: Arc<dyn Sink<T>>) -> Arc<Self> {
        let in_port: Arc<Port<T>> = Port::new("sink", PortDirection::Sink);
        let core = CapsuleCore::new(class_name, name);
        core.register_port(in_port.clone());

        let sink_for_chain = sink.clone();
        in_port.set_chain(move |data: T| {
            let sink_for_chain = sink_for_chain.clone();
            async move {
                sink_for_chain.consume(data);
                true
            }
        });

        let sink_for_activation = sink.clone();
        in_port.set_activation_handler(move |active| {
            let result = if active {
                sink_for_activation.open()
            } else {
                sink_for_activation.close()
            };
            if let Err(error) = result {
                tracing::error!(%error, active, "sink activation hook failed");
            }
        });

        Arc::new(Self { core, in_port })
    }

    pub fn in_port(&self) -> Arc<Port<T>> {
        self.in_port.clone()
    }
}

impl<T: Send + Sync + Clone + 'static> Capsule for BaseSink<T> {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::VpState;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    struct Collector(Mutex<Vec<i32>>);
    impl Sink<i32> for Collector {
        fn consume(&self, data: i32) {
            self.0.lock().unwrap().push(data);
        }
    }

    #[tokio::test]
    async fn pushed_data_reaches_sink_once_active() {
        let collector = Arc::new(Collector(Mutex::new(Vec::new())));
        let base = BaseSink::new("Sink", None, collector.clone());
        base.set_state(VpState::Paused).unwrap();
        assert!(base.in_port().push(7).await);
        assert_eq!(*collector.0.lock().unwrap(), vec![7]);
    }

    struct LifecycleSink {
        open: Arc<AtomicBool>,
    }
    impl Sink<i32> for LifecycleSink {
        fn consume(&self, _data: i32) {}
        fn open(&self) -> crate::error::VpResult<()> {
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn close(&self) -> crate::error::VpResult<()> {
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn device_opens_on_activate_and_closes_on_deactivate() {
        let open = Arc::new(AtomicBool::new(false));
        let sink = Arc::new(LifecycleSink { open: open.clone() });
        let base = BaseSink::new("Sink", None, sink);
        assert!(!open.load(Ordering::SeqCst));
        base.set_state(VpState::Paused).unwrap();
        assert!(open.load(Ordering::SeqCst));
        base.set_state(VpState::Ready).unwrap();
        assert!(!open.load(Ordering::SeqCst));
    }
}
