//! Top-level pipeline: a composite plus an owned root bus that every child
//! bus bubbles messages up to.

use std::sync::Arc;

use crate::bus::{Bus, BusMessage, BusMessageKind};
use crate::capsule::{Capsule, CapsuleCore, VpState, VpStateTransition};
use crate::composite::Composite;
use crate::error::VpResult;

pub struct Pipeline {
    composite: Composite,
    bus: Arc<Bus>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            composite: Composite::new("Pipeline", Some(name.into())),
            bus: Bus::new(),
        }
    }

    pub fn bus(&self) -> Arc<Bus> {
        self.bus.clone()
    }

    /// Appends `child`. If `child` owns its own bus (true when nesting a
    /// `Pipeline` inside another, as `dualstream` does with its upstream and
    /// downstream legs), that bus is parented onto this one so its
    /// `state_changed` messages bubble up to the root.
    pub fn add_child(&self, child: Arc<dyn Capsule>) {
        if let Some(child_bus) = child.bus() {
            child_bus.set_parent(self.bus.clone());
        }
        self.composite.add_child(child);
    }

    pub fn children(&self) -> Vec<Arc<dyn Capsule>> {
        self.composite.children()
    }

    pub fn play(&self) -> VpResult<()> {
        self.set_state(VpState::Running)
    }

    pub fn pause(&self) -> VpResult<()> {
        self.set_state(VpState::Paused)
    }

    pub fn stop(&self) -> VpResult<()> {
        self.set_state(VpState::Null)
    }
}

impl Capsule for Pipeline {
    fn core(&self) -> &CapsuleCore {
        self.composite.core()
    }

    fn bus(&self) -> Option<Arc<Bus>> {
        Some(self.bus.clone())
    }

    fn on_transition(&self, transition: VpStateTransition) -> VpResult<()> {
        self.composite.on_transition(transition)?;
        self.bus.post(BusMessage::new(
            BusMessageKind::StateChanged,
            self.core().object.path(),
            serde_json::json!({ "to": format!("{:?}", transition.to()) }),
        ));
        Ok(())
    }
}
