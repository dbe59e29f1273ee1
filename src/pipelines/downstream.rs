//! Playback-only leg: reads whatever audio a peer call leg has written to
//! the virtual device and plays it to the local speaker. No ASR/translation
//! — this is the receiving half of a call, not a translator.

use std::sync::Arc;

use crate::audio::queue_player::QueuePlayer;
use crate::audio::speaker_sink::SpeakerSink;
use crate::audio::virtual_device::{VirtualAudioDevice, VirtualDeviceSource};
use crate::audio::AudioFrame;
use crate::capsules::queue::{DrainPolicy, Queue};
use crate::capsules::sink::BaseSink;
use crate::capsules::source::{BaseSource, Source};
use crate::config::AudioConfig;
use crate::error::VpResult;
use crate::pipeline::Pipeline;

pub fn build_downstream_pipeline(
    name: impl Into<String>,
    config: &AudioConfig,
    device: Arc<dyn VirtualAudioDevice>,
) -> VpResult<Arc<Pipeline>> {
    let pipeline = Arc::new(Pipeline::new(name));

    let source: Arc<dyn Source<AudioFrame>> =
        Arc::new(VirtualDeviceSource::new(device, config.block_duration()));
    let input = BaseSource::new("VirtualDeviceSource", Some("virtual-in".into()), source);
    pipeline.add_child(input.clone());

    let queue = Queue::<AudioFrame>::new(Some("playback-queue".into()), 32, DrainPolicy::Downstream);
    pipeline.add_child(queue.clone());
    input.out_port().link(queue.in_port());

    let player = QueuePlayer::new(Some("player".into()), config.format.sample_rate, config.buffer_frames);
    pipeline.add_child(player.clone());
    queue.out_port().link(player.in_port());

    let speaker = Arc::new(SpeakerSink::open(None, config.format.sample_rate)?);
    let speaker_capsule = BaseSink::new("SpeakerSink", Some("speaker".into()), speaker);
    pipeline.add_child(speaker_capsule.clone());
    player.out_port().link(speaker_capsule.in_port());

    Ok(pipeline)
}
