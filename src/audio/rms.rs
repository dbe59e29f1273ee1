//! Passthrough RMS level meter.

use std::sync::{Arc, Mutex};

use super::AudioFrame;
use crate::capsules::transform::Transform;

pub struct RmsMeter {
    level: Mutex<f32>,
}

impl RmsMeter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            level: Mutex::new(0.0),
        })
    }

    pub fn level(&self) -> f32 {
        *self.level.lock().unwrap()
    }
}

impl Transform<AudioFrame, AudioFrame> for RmsMeter {
    fn process(&self, data: AudioFrame) -> Option<AudioFrame> {
        let sum_sq: f32 = data.iter().map(|s| s * s).sum();
        let rms = if data.is_empty() {
            0.0
        } else {
            (sum_sq / data.len() as f32).sqrt()
        };
        *self.level.lock().unwrap() = rms;
        Some(data)
    }
}
