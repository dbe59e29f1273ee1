//! ASR transform: turns incoming audio into recognized text, merging
//! work-in-progress partials until a final result arrives.
//!
//! The backing service is resolved lazily from a shared [`ServiceRegistry`]
//! when the output port activates, not at construction time, so swapping
//! which concrete ASR backend a pipeline uses never touches the capsule
//! wiring, only what is registered under the name it asks for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::audio::AudioFrame;
use crate::capsule::{Capsule, CapsuleCore};
use crate::error::{VpError, VpResult};
use crate::payload::Payload;
use crate::port::{Port, PortDirection};
use crate::services::registry::ServiceRegistry;

#[derive(Debug, Clone)]
pub struct AsrResult {
    pub text: String,
    pub is_final: bool,
    pub speaker: Option<String>,
    /// Overrides the payload's `origin_audio` when the service re-segments
    /// or trims the audio it actually recognized (e.g. a VAD-aligned span).
    pub origin_audio: Option<AudioFrame>,
}

#[async_trait]
pub trait AsrService: Send + Sync {
    async fn start(&self) -> VpResult<()> {
        Ok(())
    }

    async fn stop(&self) -> VpResult<()> {
        Ok(())
    }

    /// Attempts to switch the active recognition language without a
    /// restart. The default always fails, the same way the original's base
    /// service class raised `NotImplementedError`; a caller that gets an
    /// error here should stop and restart the service instead.
    async fn switch_lang(&self, _lang: &str) -> VpResult<()> {
        Err(VpError::ConfigError("switch_lang not supported".into()))
    }

    /// Returns `Ok(None)` when there is no transcription yet for this block
    /// (e.g. silence, still buffering) rather than an empty/degenerate
    /// result.
    async fn recognize(&self, audio: AudioFrame, final_hint: bool) -> VpResult<Option<AsrResult>>;
}

pub struct AsrCapsule {
    core: CapsuleCore,
    in_port: Arc<Port<Payload>>,
    out_port: Arc<Port<Payload>>,
    enabled: Arc<AtomicBool>,
    lang: Arc<Mutex<String>>,
    service: Arc<Mutex<Option<Arc<dyn AsrService>>>>,
}

impl AsrCapsule {
    pub fn new(
        name: Option<String>,
        registry: Arc<ServiceRegistry>,
        service_name: impl Into<String>,
        lang: impl Into<String>,
    ) -> Arc<Self> {
        let in_port: Arc<Port<Payload>> = Port::new("sink", PortDirection::Sink);
        let out_port: Arc<Port<Payload>> = Port::new("src", PortDirection::Src);
        let core = CapsuleCore::new("AsrCapsule", name);
        core.register_port(in_port.clone());
        core.register_port(out_port.clone());

        let enabled = Arc::new(AtomicBool::new(true));
        let lang = Arc::new(Mutex::new(lang.into()));
        let wip: Arc<Mutex<Option<Payload>>> = Arc::new(Mutex::new(None));
        let service: Arc<Mutex<Option<Arc<dyn AsrService>>>> = Arc::new(Mutex::new(None));
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
                    let service = match registry.create_asr(&service_name) {
                        Ok(service) => service,
                        Err(error) => {
                            tracing::error!(%error, service_name, "asr service factory failed");
                            return;
                        }
                    };
                    if let Err(error) = service.start().await {
                        tracing::error!(%error, "asr service start failed");
                        return;
                    }
                    *service_slot.lock().unwrap() = Some(service);
                });
            } else {
                tokio::spawn(async move {
                    let service = service_slot.lock().unwrap().take();
                    if let Some(service) = service {
                        if let Err(error) = service.stop().await {
                            tracing::error!(%error, "asr service stop failed");
                        }
                    }
                });
            }
        });

        let enabled_for_chain = enabled.clone();
        let out_for_chain = out_port.clone();
        let wip_for_chain = wip.clone();
        let service_for_chain = service.clone();
        in_port.set_chain(move |payload: Payload| {
            let enabled = enabled_for_chain.clone();
            let out_port = out_for_chain.clone();
            let wip = wip_for_chain.clone();
            let service_slot = service_for_chain.clone();
            async move {
                let Some(audio) = payload.origin_audio.clone() else {
                    return true;
                };
                let Some(service) = service_slot.lock().unwrap().clone() else {
                    // Service not started yet (port not active or still
                    // starting up); nothing to do with this block.
                    return true;
                };
                // Disabled ASR still calls the service with zeroed audio
                // rather than skipping the call, so the connection stays
                // alive.
                let audio = if enabled.load(Ordering::Acquire) {
                    audio
                } else {
                    crate::audio::silence(audio.len())
                };
                let base = payload.clone();
                tokio::spawn(async move {
                    let result = match service.recognize(audio, base.is_final).await {
                        Ok(Some(result)) => result,
                        Ok(None) => return,
                        Err(error) => {
                            tracing::error!(%error, "asr recognize failed");
                            return;
                        }
                    };
                    let mut update = base.clone();
                    update.origin_text = Some(result.text);
                    update.is_final = result.is_final;
                    update.speaker = result.speaker;
                    if let Some(audio) = result.origin_audio {
                        update.origin_audio = Some(audio);
                    }

                    let merged = {
                        let mut guard = wip.lock().unwrap();
                        let accumulator = guard.get_or_insert_with(|| base.clone());
                        accumulator.merge_wip(&update);
                        let snapshot = accumulator.clone();
                        if update.is_final {
                            *guard = None;
                        }
                        snapshot
                    };
                    out_port.push(merged).await;
                });
                true
            }
        });

        Arc::new(Self {
            core,
            in_port,
            out_port,
            enabled,
            lang,
            service,
        })
    }

    pub fn in_port(&self) -> Arc<Port<Payload>> {
        self.in_port.clone()
    }

    pub fn out_port(&self) -> Arc<Port<Payload>> {
        self.out_port.clone()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Changes the recognition language. If a service is currently running,
    /// attempts `switch_lang` on it in place; on failure (including the
    /// default `switch_lang`, which always fails) restarts the service
    /// instead of leaving it on the old language.
    pub fn set_lang(&self, lang: impl Into<String>) {
        let new_lang = lang.into();
        *self.lang.lock().unwrap() = new_lang.clone();
        let service_slot = self.service.clone();
        tokio::spawn(async move {
            let service = service_slot.lock().unwrap().clone();
            let Some(service) = service else { return };
            if let Err(error) = service.switch_lang(&new_lang).await {
                tracing::warn!(%error, "switch_lang failed, restarting asr service");
                if let Err(error) = service.stop().await {
                    tracing::error!(%error, "asr service stop during restart failed");
                }
                if let Err(error) = service.start().await {
                    tracing::error!(%error, "asr service restart failed");
                }
            }
        });
    }

    pub fn lang(&self) -> String {
        self.lang.lock().unwrap().clone()
    }
}

impl Capsule for AsrCapsule {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::VpState;
    use std::time::Duration;

    struct StubAsr;
    #[async_trait]
    impl AsrService for StubAsr {
        async fn recognize(&self, audio: AudioFrame, _final_hint: bool) -> VpResult<Option<AsrResult>> {
            if audio.iter().all(|s| *s == 0.0) {
                return Ok(None);
            }
            Ok(Some(AsrResult {
                text: "hello".into(),
                is_final: true,
                speaker: Some("alice".into()),
                origin_audio: None,
            }))
        }
    }

    #[tokio::test]
    async fn silent_block_produces_no_transcription() {
        let registry = ServiceRegistry::new();
        registry.register_asr("stub", || Arc::new(StubAsr) as Arc<dyn AsrService>);
        let capsule = AsrCapsule::new(None, registry, "stub", "en");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let downstream: Arc<Port<Payload>> = Port::new("downstream", PortDirection::Sink);
        downstream.set_chain(move |p: Payload| {
            let seen_clone = seen_clone.clone();
            async move {
                seen_clone.lock().unwrap().push(p);
                true
            }
        });
        downstream.set_active(true);
        capsule.out_port().link(downstream);
        capsule.set_state(VpState::Paused).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut payload = Payload::new(crate::payload::Direction::Upstream);
        payload.origin_audio = Some(crate::audio::silence(4));
        capsule.in_port().push(payload).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn recognized_text_merges_speaker_into_output() {
        let registry = ServiceRegistry::new();
        registry.register_asr("stub", || Arc::new(StubAsr) as Arc<dyn AsrService>);
        let capsule = AsrCapsule::new(None, registry, "stub", "en");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let downstream: Arc<Port<Payload>> = Port::new("downstream", PortDirection::Sink);
        downstream.set_chain(move |p: Payload| {
            let seen_clone = seen_clone.clone();
            async move {
                seen_clone.lock().unwrap().push(p);
                true
            }
        });
        downstream.set_active(true);
        capsule.out_port().link(downstream);
        capsule.set_state(VpState::Paused).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut payload = Payload::new(crate::payload::Direction::Upstream);
        payload.origin_audio = Some(Arc::new(vec![0.1, 0.2]));
        capsule.in_port().push(payload).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].origin_text.as_deref(), Some("hello"));
        assert_eq!(seen[0].speaker.as_deref(), Some("alice"));
    }
}
