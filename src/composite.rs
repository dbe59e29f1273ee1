//! A capsule that owns an ordered list of child capsules and drives their
//! state machines in lock-step with its own.

use std::sync::{Arc, Mutex};

use crate::capsule::{Capsule, CapsuleCore, VpStateTransition};
use crate::error::VpResult;

/// Owns children in insertion order. On every single-step transition,
/// `on_transition` walks every child to that same target state, in
/// insertion order, before the generic `Capsule::set_state` loop records
/// the transition on the composite itself. A pipeline assembly is a
/// `Composite` whose children are its source/transform/sink capsules;
/// ports are exposed by the assembly holding direct `Arc<Port<T>>` handles
/// to its children's ports rather than through a generic alias layer here.
pub struct Composite {
    core: CapsuleCore,
    children: Mutex<Vec<Arc<dyn Capsule>>>,
}

impl Composite {
    pub fn new(class_name: &'static str, name: Option<String>) -> Self {
        Self {
            core: CapsuleCore::new(class_name, name),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Appends `child` to the end of the child list and rebinds its path
    /// under this composite's path.
    pub fn add_child(&self, child: Arc<dyn Capsule>) {
        child.core().object.set_parent_path(&self.core.object.path());
        self.children.lock().unwrap().push(child);
    }

    pub fn children(&self) -> Vec<Arc<dyn Capsule>> {
        self.children.lock().unwrap().clone()
    }

    pub fn child_at_path(&self, path: &str) -> Option<Arc<dyn Capsule>> {
        self.children
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.core().object.path() == path)
            .cloned()
    }
}

impl Capsule for Composite {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }

    fn on_transition(&self, transition: VpStateTransition) -> VpResult<()> {
        let children = self.children.lock().unwrap().clone();
        for child in children {
            child.set_state(transition.to())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::VpState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Leaf {
        core: CapsuleCore,
        transitions: Arc<AtomicUsize>,
    }

    impl Capsule for Leaf {
        fn core(&self) -> &CapsuleCore {
            &self.core
        }
        fn on_transition(&self, _t: VpStateTransition) -> VpResult<()> {
            self.transitions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn driving_composite_drives_children_first() {
        let composite = Composite::new("Pipeline", Some("root".into()));
        let counter = Arc::new(AtomicUsize::new(0));
        let leaf: Arc<dyn Capsule> = Arc::new(Leaf {
            core: CapsuleCore::new("Leaf", Some("leaf".into())),
            transitions: counter.clone(),
        });
        composite.add_child(leaf.clone());
        composite.set_state(VpState::Running).unwrap();
        assert_eq!(leaf.state(), VpState::Running);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn child_path_is_prefixed_by_parent() {
        let composite = Composite::new("Pipeline", Some("root".into()));
        let leaf: Arc<dyn Capsule> = Arc::new(Leaf {
            core: CapsuleCore::new("Leaf", Some("leaf".into())),
            transitions: Arc::new(AtomicUsize::new(0)),
        });
        composite.add_child(leaf);
        assert!(composite.child_at_path("root/leaf").is_some());
    }
}
