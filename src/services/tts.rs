//! TTS transform: synthesizes audio for a payload's translated text, gated
//! on the payload being both final and carrying translated text — a partial
//! or untranslated payload produces no audio.
//!
//! Like [`crate::services::asr::AsrCapsule`], the backing service is resolved
//! lazily from a shared [`ServiceRegistry`] when the output port activates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::audio::AudioFrame;
use crate::capsule::{Capsule, CapsuleCore};
use crate::error::VpResult;
use crate::payload::Payload;
use crate::port::{Port, PortDirection};
use crate::services::registry::ServiceRegistry;

#[async_trait]
pub trait TtsService: Send + Sync {
    async fn start(&self) -> VpResult<()> {
        Ok(())
    }

    async fn stop(&self) -> VpResult<()> {
        Ok(())
    }

    async fn synthesize(&self, text: &str, lang: &str) -> VpResult<AudioFrame>;
}

pub struct TtsCapsule {
    core: CapsuleCore,
    in_port: Arc<Port<Payload>>,
    out_port: Arc<Port<Payload>>,
    lang: Arc<Mutex<String>>,
    enabled: Arc<AtomicBool>,
    service: Arc<Mutex<Option<Arc<dyn TtsService>>>>,
}

impl TtsCapsule {
    pub fn new(
        name: Option<String>,
        registry: Arc<ServiceRegistry>,
        service_name: impl Into<String>,
        lang: impl Into<String>,
    ) -> Arc<Self> {
        let in_port: Arc<Port<Payload>> = Port::new("sink", PortDirection::Sink);
        let out_port: Arc<Port<Payload>> = Port::new("src", PortDirection::Src);
        let core = CapsuleCore::new("TtsCapsule", name);
        core.register_port(in_port.clone());
        core.register_port(out_port.clone());

        let lang = Arc::new(Mutex::new(lang.into()));
        let enabled = Arc::new(AtomicBool::new(true));
        let service: Arc<Mutex<Option<Arc<dyn TtsService>>>> = Arc::new(Mutex::new(None));
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
                    let service = match registry.create_tts(&service_name) {
                        Ok(service) => service,
                        Err(error) => {
                            tracing::error!(%error, service_name, "tts service factory failed");
                            return;
                        }
                    };
                    if let Err(error) = service.start().await {
                        tracing::error!(%error, "tts service start failed");
                        return;
                    }
                    *service_slot.lock().unwrap() = Some(service);
                });
            } else {
                tokio::spawn(async move {
                    let service = service_slot.lock().unwrap().take();
                    if let Some(service) = service {
                        if let Err(error) = service.stop().await {
                            tracing::error!(%error, "tts service stop failed");
                        }
                    }
                });
            }
        });

        let lang_for_chain = lang.clone();
        let enabled_for_chain = enabled.clone();
        let out_for_chain = out_port.clone();
        let service_for_chain = service.clone();
        in_port.set_chain(move |payload: Payload| {
            let lang_for_chain = lang_for_chain.clone();
            let enabled = enabled_for_chain.clone();
            let out_port = out_for_chain.clone();
            let service_slot = service_for_chain.clone();
            async move {
                if !enabled.load(Ordering::Acquire) {
                    return true;
                }
                if !payload.is_final {
                    return true;
                }
                let Some(text) = payload.translated_text.clone() else {
                    return true;
                };
                let Some(service) = service_slot.lock().unwrap().clone() else {
                    return true;
                };
                let base = payload;
                let lang = lang_for_chain.lock().unwrap().clone();
                tokio::spawn(async move {
                    match service.synthesize(&text, &lang).await {
                        Ok(audio) => {
                            let mut update = base;
                            update.translated_audio = Some(audio);
                            out_port.push(update).await;
                        }
                        Err(error) => tracing::error!(%error, "tts synthesize failed"),
                    }
                });
                true
            }
        });

        Arc::new(Self {
            core,
            in_port,
            out_port,
            lang,
            enabled,
            service,
        })
    }

    pub fn in_port(&self) -> Arc<Port<Payload>> {
        self.in_port.clone()
    }

    pub fn out_port(&self) -> Arc<Port<Payload>> {
        self.out_port.clone()
    }

    pub fn set_lang(&self, lang: impl Into<String>) {
        *self.lang.lock().unwrap() = lang.into();
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

impl Capsule for TtsCapsule {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }
}
