//! N:1 audio mixer with per-input volume/mute and generation-based lock-step
//! synchronization: every tick waits for a frame on all inputs before a
//! combined frame is emitted, so no input can run ahead of the others by
//! more than one buffer.
//!
//! `push` on an input port may suspend the calling task until the other
//! inputs catch up for the current tick, via a `tokio::sync::Notify`
//! broadcast rather than blocking the calling thread — on a single-threaded
//! runtime the task yields instead of parking the only worker, so whichever
//! input arrives last can still make progress.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use super::volume::Volume;
use super::AudioFrame;
use crate::capsule::{Capsule, CapsuleCore};
use crate::port::{Port, PortDirection};

struct MixState {
    generation: u64,
    pending: HashMap<usize, AudioFrame>,
}

pub struct Mixer {
    core: CapsuleCore,
    out_port: Arc<Port<AudioFrame>>,
    inputs: Arc<Mutex<Vec<Arc<Port<AudioFrame>>>>>,
    volumes: Mutex<Vec<Arc<Volume>>>,
    state: Arc<Mutex<MixState>>,
    advanced: Arc<Notify>,
}

fn mix(frames: impl Iterator<Item = AudioFrame>) -> AudioFrame {
    let mut combined: Vec<f32> = Vec::new();
    let mut count = 0usize;
    for frame in frames {
        count += 1;
        if combined.len() < frame.len() {
            combined.resize(frame.len(), 0.0);
        }
        for (out, sample) in combined.iter_mut().zip(frame.iter()) {
            *out += sample;
        }
    }
    if count > 1 {
        let count = count as f32;
        for sample in combined.iter_mut() {
            *sample /= count;
        }
    }
    Arc::new(combined)
}

impl Mixer {
    pub fn new(name: Option<String>) -> Arc<Self> {
        let out_port: Arc<Port<AudioFrame>> = Port::new("src", PortDirection::Src);
        let core = CapsuleCore::new("Mixer", name);
        core.register_port(out_port.clone());
        Arc::new(Self {
            core,
            out_port,
            inputs: Arc::new(Mutex::new(Vec::new())),
            volumes: Mutex::new(Vec::new()),
            state: Arc::new(Mutex::new(MixState {
                generation: 0,
                pending: HashMap::new(),
            })),
            advanced: Arc::new(Notify::new()),
        })
    }

    pub fn out_port(&self) -> Arc<Port<AudioFrame>> {
        self.out_port.clone()
    }

    /// Adds a new mixer input with its own volume/mute control, returning
    /// the input's sink port and its `Volume` handle.
    pub fn add_input(&self, name: impl Into<String>) -> (Arc<Port<AudioFrame>>, Arc<Volume>) {
        let mut inputs = self.inputs.lock().unwrap();
        let idx = inputs.len();
        let port: Arc<Port<AudioFrame>> = Port::new(name, PortDirection::Sink);
        self.core.register_port(port.clone());
        let volume = Volume::new(1.0);

        let volume_for_chain = volume.clone();
        let state = self.state.clone();
        let advanced = self.advanced.clone();
        let out_port = self.out_port.clone();
        let inputs_for_chain = self.inputs.clone();
        port.set_chain(move |frame: AudioFrame| {
            let volume_for_chain = volume_for_chain.clone();
            let state = state.clone();
            let advanced = advanced.clone();
            let out_port = out_port.clone();
            let inputs_for_chain = inputs_for_chain.clone();
            async move {
                let processed = volume_for_chain.apply(&frame);
                let expected = inputs_for_chain.lock().unwrap().len();
                let my_generation = {
                    let mut guard = state.lock().unwrap();
                    let my_generation = guard.generation;
                    guard.pending.insert(idx, processed);
                    if guard.pending.len() >= expected {
                        let mixed = mix(guard.pending.drain().map(|(_, v)| v));
                        guard.generation += 1;
                        drop(guard);
                        advanced.notify_waiters();
                        out_port.push(mixed).await;
                        return true;
                    }
                    my_generation
                };
                loop {
                    // Registered before re-checking the generation so an
                    // advance that happens between the check and the wait
                    // below can't be missed.
                    let notified = advanced.notified();
                    if state.lock().unwrap().generation != my_generation {
                        break;
                    }
                    notified.await;
                }
                true
            }
        });

        inputs.push(port.clone());
        self.volumes.lock().unwrap().push(volume.clone());
        (port, volume)
    }

    pub fn input_count(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

impl Capsule for Mixer {
    fn core(&self) -> &CapsuleCore {
        &self.core
    }
}
