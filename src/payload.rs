//! The payload type that flows through the translation pipelines' ports.
//!
//! Audio buffers are wrapped in `Arc` so that fan-out through a port (which
//! clones the payload once per linked sink) never copies sample data.

use std::sync::Arc;

use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upstream,
    Downstream,
}

#[derive(Debug, Clone)]
pub struct Payload {
    pub id: Uuid,
    pub timestamp: f64,
    pub src_lang: Option<String>,
    pub dest_lang: Option<String>,
    pub origin_text: Option<String>,
    pub origin_audio: Option<Arc<Vec<f32>>>,
    pub is_final: bool,
    pub speaker: Option<String>,
    pub translated_text: Option<String>,
    pub translated_audio: Option<Arc<Vec<f32>>>,
    pub direction: Direction,
}

impl Payload {
    pub fn new(direction: Direction) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: 0.0,
            src_lang: None,
            dest_lang: None,
            origin_text: None,
            origin_audio: None,
            is_final: false,
            speaker: None,
            translated_text: None,
            translated_audio: None,
            direction,
        }
    }

    /// Merges an interim (not-yet-final) ASR update into this payload: later
    /// fields overwrite earlier ones the way work-in-progress recognition
    /// results supersede previous partials for the same utterance.
    pub fn merge_wip(&mut self, other: &Payload) {
        if let Some(text) = &other.origin_text {
            self.origin_text = Some(text.clone());
        }
        if let Some(audio) = &other.origin_audio {
            self.origin_audio = Some(audio.clone());
        }
        if let Some(speaker) = &other.speaker {
            self.speaker = Some(speaker.clone());
        }
        if let Some(src_lang) = &other.src_lang {
            self.src_lang = Some(src_lang.clone());
        }
        self.is_final = other.is_final;
        self.timestamp = other.timestamp;
    }
}
