//! One-in-one-out transform capsule: feeds every input through a `Transform`
//! impl and, for anything it returns, pushes the result downstream. Used as
//! the base for the adapter/volume/RMS transforms; the ASR/translation/TTS
//! service wrappers have their own chains since they also need a service
//! lifecycle hooked to port activation.

use std::sync::Arc;

use crate::capsule::{Capsule, CapsuleCore};
use crate::port::{Port, PortDirection};

pub trait Transform<In: Send + Sync + 'static, Out: Send + Sync + 'static>: Send + Sync {
    fn process(&self, data: In) -> Option<Out>;
}

pub struct BaseTransform<In: Send + Sync + Clone + 'static, Out: Send + Sync + Clone + 'static> {
    core: CapsuleCore,
    in_port: Arc<Port<In>>,
    out_port: Arc<Port<Out>>,
}

impl<In: Send + Sync + Clone + 'static, Out: Send + Sync + Clone + 'static> BaseTransform<In, Out> {
    pub fn new(
        class_name: &'static str,
        name: Option<String>,
        transform: Arc<dyn Transform<In, Out>>,
    ) -> Arc<Self> {
        let in_port: Arc<Port<In>> = Port::new("sink", PortDirection::Sink);
        let out_port: Arc<Port<Out>> = Port::new("src", PortDirection::Src);
        let core = CapsuleCore::new(class_name, name);
        core.register_port(in_port.clone());
        core.register_port(out_port.clone());

        let out_for_chain = out_port.clone();
        in_port.set_chain(move |data: In| {
            let transform = transform.clone();
            let out_for_chain = out_for_chain.clone();
            async move {
                if let Some(result) = transform.process(data) {
                    out_for_chain.push(result).await;
                }
                true
            }
        });

        Arc::new(Self {
            core,
            in_port,
            out_port,
        })
    }

    pub fn in_port(&self) -> Arc<Port<In>> {
        self.in_port.clone()
    }

    pub fn out_port(&self) -> Arc<Port<Out>> {
        self.out_port.clone()
    }
}

impl<In: Send + Sync + Clone + 'static, Out: Send + Sync + Clone + 'static> Capsule
    for BaseTransform<In, Out>
{
    fn core(&self) -> &CapsuleCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::VpState;

    struct Double;
    impl Transform<i32, i32> for Double {
        fn process(&self, data: i32) -> Option<i32> {
            Some(data * 2)
        }
    }

    struct DropOdd;
    impl Transform<i32, i32> for DropOdd {
        fn process(&self, data: i32) -> Option<i32> {
            if data % 2 == 0 {
                Some(data)
            } else {
                None
            }
        }
    }

    #[tokio::test]
    async fn transform_result_reaches_downstream_link() {
        let base = BaseTransform::new("Transform", None, Arc::new(Double));
        base.set_state(VpState::Paused).unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let downstream: Arc<Port<i32>> = Port::new("downstream", PortDirection::Sink);
        downstream.set_chain(move |v: i32| {
            let seen_clone = seen_clone.clone();
            async move {
                seen_clone.lock().unwrap().push(v);
                true
            }
        });
        downstream.set_active(true);
        base.out_port().link(downstream);
        base.in_port().push(3).await;
        assert_eq!(*seen.lock().unwrap(), vec![6]);
    }

    #[tokio::test]
    async fn none_result_suppresses_downstream_push() {
        let base = BaseTransform::new("Transform", None, Arc::new(DropOdd));
        base.set_state(VpState::Paused).unwrap();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let downstream: Arc<Port<i32>> = Port::new("downstream", PortDirection::Sink);
        downstream.set_chain(move |v: i32| {
            let seen_clone = seen_clone.clone();
            async move {
                seen_clone.lock().unwrap().push(v);
                true
            }
        });
        downstream.set_active(true);
        base.out_port().link(downstream);
        base.in_port().push(3).await;
        base.in_port().push(4).await;
        assert_eq!(*seen.lock().unwrap(), vec![4]);
    }
}
