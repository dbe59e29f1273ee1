//! N-way fan-out capsule: one input port, any number of dynamically added
//! output ports, each fed every item the input receives.

use std::sync::{Arc, Mutex};

use crate::capsule::{Capsule, CapsuleCore};
use crate::port::{Port, PortDirection};

pub struct Fork<T: Send + Sync + Clone + 'static> {
    core: CapsuleCore,
    in_port: Arc<Port<T>>,
    out_ports: Arc<Mutex<Vec<Arc<Port<T>>>>>,
}

impl<T: Send + Sync + Clone + 'static> Fork<T> {
    pub fn new(name: Option<String>) -> Arc<Self> {
        let in_port: Arc<Port<T>> = Port::new("sink", PortDirection::Sink);
        let core = CapsuleCore::new("Fork", name);
        core.register_port(in_port.clone());

        let out_ports: Arc<Mutex<Vec<Arc<Port<T>>>>> = Arc::new(Mutex::new(Vec::new()));
        let out_ports_for_chain = out_ports.clone();
        in_port.set_chain(move |data: T| {
            let out_ports_for_chain = out_ports_for_chain.clone();
            async move {
                let outs = out_ports_for_chain.lock().unwrap().clone();
                for out in outs {
                    out.push(data.clone()).await;
                }
                true
            }
        });

        Arc::new(Self {
            core,
            in_port,
            out_ports,
        })
    }

    pub fn in_port(&self) -> Arc<Port<T>> {
        self.in_port.clone()
    }

    /// Adds and returns a new output port, registered for the same
    /// `Ready<->Paused` activation as every other port on this capsule.
    pub fn add_output(&self, name: impl Into<String>) -> Arc<Port<T>> {
        let port: Arc<Port<T>> = Port::new(name, PortDirection::Src);
        self.core.register_port(port.clone());
        port.set_active(self.in_port.is_active());
        self.out_ports.lock().unwrap().push(port.clone());
        port
    }
}

impl<T: Send + Sync + Clone + 'static> Capsule for Fork<T> {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::VpState;

    #[tokio::test]
    async fn every_output_receives_every_item() {
        let fork = Fork::<i32>::new(None);
        fork.set_state(VpState::Paused).unwrap();
        let a = fork.add_output("a");
        let b = fork.add_output("b");
        let seen_a = Arc::new(Mutex::new(Vec::new()));
        let seen_b = Arc::new(Mutex::new(Vec::new()));
        let sa = seen_a.clone();
        a.set_chain(move |v: i32| {
            let sa = sa.clone();
            async move {
                sa.lock().unwrap().push(v);
                true
            }
        });
        let sb = seen_b.clone();
        b.set_chain(move |v: i32| {
            let sb = sb.clone();
            async move {
                sb.lock().unwrap().push(v);
                true
            }
        });
        fork.in_port().push(1).await;
        fork.in_port().push(2).await;
        assert_eq!(*seen_a.lock().unwrap(), vec![1, 2]);
        assert_eq!(*seen_b.lock().unwrap(), vec![1, 2]);
    }
}
