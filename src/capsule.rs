//! Hierarchical capsule state machine.
//!
//! States form a line `Null < Ready < Paused < Running`. `set_state` only
//! accepts adjacent-step transitions directly; a caller asking to jump more
//! than one step (e.g. `Null -> Running`) gets walked through every
//! intermediate state in order, each one emitting its own `state_changed`
//! signal, exactly as if the caller had called `set_state` repeatedly.
//!
//! Capsules are shared (a composite drives a child's state machine while a
//! pipeline assembly holds the same child for typed port wiring), so
//! `Capsule` methods take `&self` and `CapsuleCore` keeps its mutable state
//! behind a `Mutex`.

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::bus::Bus;
use crate::error::{VpError, VpResult};
use crate::object::Object;
use crate::port::PortActivation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VpState {
    Null,
    Ready,
    Paused,
    Running,
}

impl VpState {
    fn step_toward(self, target: VpState) -> Option<VpState> {
        if self == target {
            return None;
        }
        let order = [VpState::Null, VpState::Ready, VpState::Paused, VpState::Running];
        let cur_idx = order.iter().position(|s| *s == self).unwrap();
        let tgt_idx = order.iter().position(|s| *s == target).unwrap();
        if tgt_idx > cur_idx {
            Some(order[cur_idx + 1])
        } else {
            Some(order[cur_idx - 1])
        }
    }
}

/// One of the six adjacent state transitions a capsule can undergo in a
/// single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpStateTransition {
    NullToReady,
    ReadyToNull,
    ReadyToPaused,
    PausedToReady,
    PausedToRunning,
    RunningToPaused,
}

impl VpStateTransition {
    pub fn from(self) -> VpState {
        match self {
            VpStateTransition::NullToReady => VpState::Null,
            VpStateTransition::ReadyToNull => VpState::Ready,
            VpStateTransition::ReadyToPaused => VpState::Ready,
            VpStateTransition::PausedToReady => VpState::Paused,
            VpStateTransition::PausedToRunning => VpState::Paused,
            VpStateTransition::RunningToPaused => VpState::Running,
        }
    }

    pub fn to(self) -> VpState {
        match self {
            VpStateTransition::NullToReady => VpState::Ready,
            VpStateTransition::ReadyToNull => VpState::Null,
            VpStateTransition::ReadyToPaused => VpState::Paused,
            VpStateTransition::PausedToReady => VpState::Ready,
            VpStateTransition::PausedToRunning => VpState::Running,
            VpStateTransition::RunningToPaused => VpState::Paused,
        }
    }

    fn between(from: VpState, to: VpState) -> Option<Self> {
        use VpState::*;
        match (from, to) {
            (Null, Ready) => Some(Self::NullToReady),
            (Ready, Null) => Some(Self::ReadyToNull),
            (Ready, Paused) => Some(Self::ReadyToPaused),
            (Paused, Ready) => Some(Self::PausedToReady),
            (Paused, Running) => Some(Self::PausedToRunning),
            (Running, Paused) => Some(Self::RunningToPaused),
            _ => None,
        }
    }
}

pub struct StateChanged {
    pub old: VpState,
    pub new: VpState,
}

/// Shared state every capsule embeds: identity, current state, and the
/// ports whose activation tracks `Ready<->Paused`.
pub struct CapsuleCore {
    pub object: Object,
    state: Mutex<VpState>,
    ports: Mutex<Vec<Arc<dyn PortActivation>>>,
}

impl CapsuleCore {
    pub fn new(class_name: &'static str, name: Option<String>) -> Self {
        Self {
            object: Object::new(class_name, name),
            state: Mutex::new(VpState::Null),
            ports: Mutex::new(Vec::new()),
        }
    }

    pub fn state(&self) -> VpState {
        *self.state.lock().unwrap()
    }

    pub fn register_port(&self, port: Arc<dyn PortActivation>) {
        self.ports.lock().unwrap().push(port);
    }

    pub fn ports(&self) -> Vec<Arc<dyn PortActivation>> {
        self.ports.lock().unwrap().clone()
    }

    /// Sets every registered port's activation flag to `active`. Called
    /// automatically by `set_state` on `Ready<->Paused` transitions; exposed
    /// so a composite can also drive it on behalf of alias ports.
    pub fn activate_ports(&self, active: bool) {
        for port in self.ports.lock().unwrap().iter() {
            port.set_active(active);
        }
    }
}

/// Implemented by every concrete capsule type. `on_transition` receives each
/// single-step transition on the path from the current state to the
/// requested target and may fail, halting the walk at the last state that
/// succeeded.
pub trait Capsule: Send + Sync {
    fn core(&self) -> &CapsuleCore;

    /// Hook for capsule-specific side effects (opening a device, spawning a
    /// task). Default does nothing beyond the generic port activation that
    /// `set_state` already performs.
    fn on_transition(&self, _transition: VpStateTransition) -> VpResult<()> {
        Ok(())
    }

    fn state(&self) -> VpState {
        self.core().state()
    }

    /// A capsule's own event bus, if it has one. Leaf capsules have none;
    /// `Pipeline` (and any composite that owns a sub-bus) returns `Some`, so
    /// a parent can parent a nested pipeline's bus onto its own for bubbling.
    fn bus(&self) -> Option<Arc<Bus>> {
        None
    }

    /// Walks the capsule from its current state to `target`, one adjacent
    /// step at a time. Each step invokes `on_transition`, applies the
    /// generic port-activation side effect, updates the stored state, and
    /// emits `state_changed` before attempting the next step.
    fn set_state(&self, target: VpState) -> VpResult<()> {
        loop {
            let current = self.core().state();
            let Some(next) = current.step_toward(target) else {
                return Ok(());
            };
            let transition = VpStateTransition::between(current, next).ok_or(VpError::StateError {
                from: current,
                to: next,
                current,
            })?;
            self.on_transition(transition)?;
            match transition {
                VpStateTransition::ReadyToPaused => self.core().activate_ports(true),
                VpStateTransition::PausedToReady => self.core().activate_ports(false),
                _ => {}
            }
            *self.core().state.lock().unwrap() = next;
            let signal = StateChanged { old: current, new: next };
            self.core()
                .object
                .emit_signal("state_changed", &signal as &dyn Any);
            tracing::debug!(
                parent: &self.core().object.span(),
                from = ?current,
                to = ?next,
                "state transition"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy {
        core: CapsuleCore,
    }

    impl Capsule for Dummy {
        fn core(&self) -> &CapsuleCore {
            &self.core
        }
    }

    #[test]
    fn multi_step_transition_walks_every_state() {
        let dummy = Dummy {
            core: CapsuleCore::new("Dummy", None),
        };
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        dummy.core.object.connect_signal("state_changed", move |payload| {
            if let Some(change) = payload.downcast_ref::<StateChanged>() {
                seen_clone.lock().unwrap().push((change.old, change.new));
            }
        });
        dummy.set_state(VpState::Running).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (VpState::Null, VpState::Ready),
                (VpState::Ready, VpState::Paused),
                (VpState::Paused, VpState::Running),
            ]
        );
    }

    #[test]
    fn set_state_to_current_state_is_noop() {
        let dummy = Dummy {
            core: CapsuleCore::new("Dummy", None),
        };
        dummy.set_state(VpState::Null).unwrap();
        assert_eq!(dummy.state(), VpState::Null);
    }
}
