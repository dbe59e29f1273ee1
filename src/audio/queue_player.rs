//! Variable-speed TTS playback capsule: buffers incoming synthesized audio
//! and drains it through a resampler whose ratio tracks a runtime-settable
//! playback speed, so downstream always gets `chunk_len`-sample frames at
//! the device's native rate regardless of how fast the queue drains.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::cache_resampler::CacheResampler;
use super::AudioFrame;
use crate::capsule::{Capsule, CapsuleCore};
use crate::port::{Port, PortDirection};
use crate::task::Task;

pub struct QueuePlayer {
    core: CapsuleCore,
    in_port: Arc<Port<AudioFrame>>,
    out_port: Arc<Port<AudioFrame>>,
    speed: Arc<Mutex<f64>>,
}

impl QueuePlayer {
    pub fn new(name: Option<String>, native_rate: u32, chunk_len: usize) -> Arc<Self> {
        let in_port: Arc<Port<AudioFrame>> = Port::new("sink", PortDirection::Sink);
        let out_port: Arc<Port<AudioFrame>> = Port::new("src", PortDirection::Src);
        let core = CapsuleCore::new("QueuePlayer", name);
        core.register_port(in_port.clone());
        core.register_port(out_port.clone());

        let buffer: Arc<Mutex<VecDeque<f32>>> = Arc::new(Mutex::new(VecDeque::new()));
        let buffer_for_chain = buffer.clone();
        in_port.set_chain(move |frame: AudioFrame| {
            let buffer_for_chain = buffer_for_chain.clone();
            async move {
                buffer_for_chain.lock().unwrap().extend(frame.iter().copied());
                true
            }
        });

        let speed = Arc::new(Mutex::new(1.0f64));
        let speed_for_task = speed.clone();
        let out_for_task = out_port.clone();
        let drain_task = Task::new("playback-drain");
        drain_task.start(move |handle| async move {
            let mut resampler: Option<(f64, CacheResampler)> = None;
            loop {
                if handle.is_cancelled() {
                    break;
                }
                handle.wait_if_paused().await;
                if handle.is_cancelled() {
                    break;
                }
                let current_speed = *speed_for_task.lock().unwrap();
                if resampler.as_ref().map(|(s, _)| *s) != Some(current_speed) {
                    let warped_rate = (native_rate as f64 * current_speed).round() as usize;
                    if let Ok(r) = CacheResampler::new(warped_rate, native_rate as usize, chunk_len) {
                        resampler = Some((current_speed, r));
                    }
                }
                let chunk: Option<Vec<f32>> = {
                    let mut buf = buffer.lock().unwrap();
                    if buf.len() >= chunk_len {
                        Some(buf.drain(..chunk_len).collect())
                    } else {
                        None
                    }
                };
                match (chunk, resampler.as_ref()) {
                    (Some(samples), Some((_, r))) => {
                        if let Ok(out) = r.process(&Arc::new(samples)) {
                            if !out.is_empty() {
                                out_for_task.push(out).await;
                            }
                        }
                    }
                    _ => tokio::time::sleep(Duration::from_millis(5)).await,
                }
            }
        });
        drain_task.pause();
        out_port.bind_task(drain_task);

        Arc::new(Self {
            core,
            in_port,
            out_port,
            speed,
        })
    }

    pub fn in_port(&self) -> Arc<Port<AudioFrame>> {
        self.in_port.clone()
    }

    pub fn out_port(&self) -> Arc<Port<AudioFrame>> {
        self.out_port.clone()
    }

    /// `speed` > 1.0 plays back faster (shorter duration), < 1.0 slower.
    pub fn set_speed(&self, speed: f64) {
        *self.speed.lock().unwrap() = speed.clamp(0.25, 4.0);
    }

    pub fn speed(&self) -> f64 {
        *self.speed.lock().unwrap()
    }
}

impl Capsule for QueuePlayer {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }
}

