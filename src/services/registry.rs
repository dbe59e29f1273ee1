//! Caller-owned service registry.
//!
//! The original kept a process-wide `ServiceManager` singleton that loaded
//! service definitions from a YAML file. Neither the singleton nor the YAML
//! loader survives here: a pipeline assembly is handed an
//! `Arc<ServiceRegistry>` explicitly, and factories are registered by
//! calling code rather than parsed from a config file.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::asr::AsrService;
use super::translation::TranslationService;
use super::tts::TtsService;
use crate::error::{VpError, VpResult};

type AsrFactory = Arc<dyn Fn() -> Arc<dyn AsrService> + Send + Sync>;
type TranslationFactory = Arc<dyn Fn() -> Arc<dyn TranslationService> + Send + Sync>;
type TtsFactory = Arc<dyn Fn() -> Arc<dyn TtsService> + Send + Sync>;

pub struct ServiceRegistry {
    asr: Mutex<HashMap<String, AsrFactory>>,
    translation: Mutex<HashMap<String, TranslationFactory>>,
    tts: Mutex<HashMap<String, TtsFactory>>,
}

impl ServiceRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            asr: Mutex::new(HashMap::new()),
            translation: Mutex::new(HashMap::new()),
            tts: Mutex::new(HashMap::new()),
        })
    }

    pub fn register_asr<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn AsrService> + Send + Sync + 'static,
    {
        self.asr.lock().unwrap().insert(name.into(), Arc::new(factory));
    }

    pub fn register_translation<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn TranslationService> + Send + Sync + 'static,
    {
        self.translation
            .lock()
            .unwrap()
            .insert(name.into(), Arc::new(factory));
    }

    pub fn register_tts<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn TtsService> + Send + Sync + 'static,
    {
        self.tts.lock().unwrap().insert(name.into(), Arc::new(factory));
    }

    pub fn create_asr(&self, name: &str) -> VpResult<Arc<dyn AsrService>> {
        self.asr
            .lock()
            .unwrap()
            .get(name)
            .map(|f| f())
            .ok_or_else(|| VpError::ConfigError(format!("no ASR service registered as '{name}'")))
    }

    pub fn create_translation(&self, name: &str) -> VpResult<Arc<dyn TranslationService>> {
        self.translation
            .lock()
            .unwrap()
            .get(name)
            .map(|f| f())
            .ok_or_else(|| {
                VpError::ConfigError(format!("no translation service registered as '{name}'"))
            })
    }

    pub fn create_tts(&self, name: &str) -> VpResult<Arc<dyn TtsService>> {
        self.tts
            .lock()
            .unwrap()
            .get(name)
            .map(|f| f())
            .ok_or_else(|| VpError::ConfigError(format!("no TTS service registered as '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Payload;

    struct EchoAsr;
    #[async_trait::async_trait]
    impl AsrService for EchoAsr {
        async fn recognize(
            &self,
            _audio: crate::audio::AudioFrame,
            _final_hint: bool,
        ) -> VpResult<Option<super::super::asr::AsrResult>> {
            Ok(Some(super::super::asr::AsrResult {
                text: "hello".into(),
                is_final: true,
                speaker: None,
                origin_audio: None,
            }))
        }
    }

    #[test]
    fn unregistered_service_is_a_config_error() {
        let registry = ServiceRegistry::new();
        assert!(registry.create_asr("missing").is_err());
    }

    #[test]
    fn registered_factory_is_invoked_on_create() {
        let registry = ServiceRegistry::new();
        registry.register_asr("echo", || Arc::new(EchoAsr));
        assert!(registry.create_asr("echo").is_ok());
        let _ = Payload::new(crate::payload::Direction::Upstream);
    }
}
