//! Translation transform: turns a payload's recognized text into translated
//! text for the configured source/destination language pair.
//!
//! Like [`crate::services::asr::AsrCapsule`], the backing service is resolved
//! lazily from a shared [`ServiceRegistry`] when the output port activates.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::capsule::{Capsule, CapsuleCore};
use crate::error::VpResult;
use crate::payload::Payload;
use crate::port::{Port, PortDirection};
use crate::services::registry::ServiceRegistry;

#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn start(&self) -> VpResult<()> {
        Ok(())
    }

    async fn stop(&self) -> VpResult<()> {
        Ok(())
    }

    async fn translate(&self, text: &str, src_lang: &str, dest_lang: &str) -> VpResult<String>;
}

pub struct TranslationCapsule {
    core: CapsuleCore,
    in_port: Arc<Port<Payload>>,
    out_port: Arc<Port<Payload>>,
    src_lang: Arc<Mutex<String>>,
    dest_lang: Arc<Mutex<String>>,
    service: Arc<Mutex<Option<Arc<dyn TranslationService>>>>,
}

impl TranslationCapsule {
    pub fn new(
        name: Option<String>,
        registry: Arc<ServiceRegistry>,
        service_name: impl Into<String>,
        src_lang: impl Into<String>,
        dest_lang: impl Into<String>,
    ) -> Arc<Self> {
        let in_port: Arc<Port<Payload>> = Port::new("sink", PortDirection::Sink);
        let out_port: Arc<Port<Payload>> = Port::new("src", PortDirection::Src);
        let core = CapsuleCore::new("TranslationCapsule", name);
        core.register_port(in_port.clone());
        core.register_port(out_port.clone());

        let src_lang = Arc::new(Mutex::new(src_lang.into()));
        let dest_lang = Arc::new(Mutex::new(dest_lang.into()));
        let service: Arc<Mutex<Option<Arc<dyn TranslationService>>>> = Arc::new(Mutex::new(None));
        let service_name = service_name.into();

        let registry_for_activation = registry.clone();
        let service_name_for_activation = service_name.clone();
        let service_for_activation = service.clone();
        out_port.set_activation_handler(move |active| {
            let registry = registry_for_activation.clone();
            let service_name = service_name_for_activation.clone();
            let service_slot = service_for_activation.clone();
            if active {
                tokio::spawn(async move {
                    let service = match registry.create_translation(&service_name) {
                        Ok(service) => service,
                        Err(error) => {
                            tracing::error!(%error, service_name, "translation service factory failed");
                            return;
                        }
                    };
                    if let Err(error) = service.start().await {
                        tracing::error!(%error, "translation service start failed");
                        return;
                    }
                    *service_slot.lock().unwrap() = Some(service);
                });
            } else {
                tokio::spawn(async move {
                    let service = service_slot.lock().unwrap().take();
                    if let Some(service) = service {
                        if let Err(error) = service.stop().await {
                            tracing::error!(%error, "translation service stop failed");
                        }
                    }
                });
            }
        });

        let src_for_chain = src_lang.clone();
        let dest_for_chain = dest_lang.clone();
        let out_for_chain = out_port.clone();
        let service_for_chain = service.clone();
        in_port.set_chain(move |payload: Payload| {
            let src_for_chain = src_for_chain.clone();
            let dest_for_chain = dest_for_chain.clone();
            let out_port = out_for_chain.clone();
            let service_slot = service_for_chain.clone();
            async move {
                if !payload.is_final {
                    return true;
                }
                let Some(text) = payload.origin_text.clone() else {
                    return true;
                };
                let Some(service) = service_slot.lock().unwrap().clone() else {
                    return true;
                };
                let base = payload;
                let src_lang = src_for_chain.lock().unwrap().clone();
                let dest_lang = dest_for_chain.lock().unwrap().clone();
                tokio::spawn(async move {
                    match service.translate(&text, &src_lang, &dest_lang).await {
                        Ok(translated) => {
                            let mut update = base;
                            update.translated_text = Some(translated);
                            update.src_lang = Some(src_lang);
                            update.dest_lang = Some(dest_lang);
                            out_port.push(update).await;
                        }
                        Err(error) => tracing::error!(%error, "translation failed"),
                    }
                });
                true
            }
        });

        Arc::new(Self {
            core,
            in_port,
            out_port,
            src_lang,
            dest_lang,
            service,
        })
    }

    pub fn in_port(&self) -> Arc<Port<Payload>> {
        self.in_port.clone()
    }

    pub fn out_port(&self) -> Arc<Port<Payload>> {
        self.out_port.clone()
    }

    pub fn set_src_lang(&self, lang: impl Into<String>) {
        *self.src_lang.lock().unwrap() = lang.into();
    }

    pub fn set_dest_lang(&self, lang: impl Into<String>) {
        *self.dest_lang.lock().unwrap() = lang.into();
    }
}

impl Capsule for TranslationCapsule {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }
}
