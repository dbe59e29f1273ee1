//! Pluggable ASR/translation/TTS service interfaces, the registry that
//! constructs them by name, and the capsules that wrap them into the
//! pipeline graph.

pub mod asr;
pub mod registry;
pub mod translation;
pub mod tts;

pub use asr::{AsrCapsule, AsrResult, AsrService};
pub use registry::ServiceRegistry;
pub use translation::{TranslationCapsule, TranslationService};
pub use tts::{TtsCapsule, TtsService};
