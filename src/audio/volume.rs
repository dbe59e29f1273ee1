//! Per-stream gain and mute, used both as a standalone transform capsule and
//! as the per-input stage inside the mixer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::AudioFrame;
use crate::capsules::transform::Transform;

pub struct Volume {
    gain: Mutex<f32>,
    muted: AtomicBool,
}

impl Volume {
    pub fn new(initial_gain: f32) -> Arc<Self> {
        Arc::new(Self {
            gain: Mutex::new(initial_gain.clamp(0.0, 4.0)),
            muted: AtomicBool::new(false),
        })
    }

    pub fn set_gain(&self, gain: f32) {
        *self.gain.lock().unwrap() = gain.clamp(0.0, 4.0);
    }

    pub fn gain(&self) -> f32 {
        *self.gain.lock().unwrap()
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    pub fn apply(&self, frame: &AudioFrame) -> AudioFrame {
        if self.is_muted() {
            return super::silence(frame.len());
        }
        let gain = self.gain();
        if (gain - 1.0).abs() < f32::EPSILON {
            return frame.clone();
        }
        Arc::new(frame.iter().map(|s| s * gain).collect())
    }
}

impl Transform<AudioFrame, AudioFrame> for Volume {
    fn process(&self, data: AudioFrame) -> Option<AudioFrame> {
        Some(self.apply(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mute_produces_silence_of_same_length() {
        let volume = Volume::new(1.0);
        volume.set_muted(true);
        let frame: AudioFrame = Arc::new(vec![1.0, 0.5, -1.0]);
        let out = volume.apply(&frame);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn gain_scales_samples() {
        let volume = Volume::new(2.0);
        let frame: AudioFrame = Arc::new(vec![0.1, 0.2]);
        let out = volume.apply(&frame);
        assert!((out[0] - 0.2).abs() < 1e-6);
        assert!((out[1] - 0.4).abs() < 1e-6);
    }
}
