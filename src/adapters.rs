//! Small transforms that bridge a raw `AudioFrame` port to a `Payload` port
//! and back, so audio endpoints (mic/file/speaker) and service capsules
//! (which speak `Payload`) can be linked directly into the same pipeline.

use crate::audio::AudioFrame;
use crate::capsules::transform::Transform;
use crate::payload::{Direction, Payload};

/// Wraps every incoming audio frame in a fresh, non-final `Payload`.
pub struct AudioToPayload {
    direction: Direction,
}

impl AudioToPayload {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }
}

impl Transform<AudioFrame, Payload> for AudioToPayload {
    fn process(&self, data: AudioFrame) -> Option<Payload> {
        let mut payload = Payload::new(self.direction);
        payload.origin_audio = Some(data);
        Some(payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadAudioField {
    Origin,
    Translated,
}

/// Extracts one audio field from a payload, dropping payloads that don't
/// carry it yet (e.g. a partial ASR result with no synthesized audio).
pub struct PayloadToAudio {
    field: PayloadAudioField,
}

impl PayloadToAudio {
    pub fn new(field: PayloadAudioField) -> Self {
        Self { field }
    }
}

impl Transform<Payload, AudioFrame> for PayloadToAudio {
    fn process(&self, data: Payload) -> Option<AudioFrame> {
        match self.field {
            PayloadAudioField::Origin => data.origin_audio,
            PayloadAudioField::Translated => data.translated_audio,
        }
    }
}
