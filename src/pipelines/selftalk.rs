//! Local-only loop for testing a voice end to end without a peer: mic in,
//! translated speech out the local speaker, with an `RmsMeter` tapped on the
//! raw capture so a caller can monitor input level. No virtual device, no
//! second leg.

use std::sync::Arc;

use crate::adapters::{AudioToPayload, PayloadAudioField, PayloadToAudio};
use crate::audio::file_source::FileSource;
use crate::audio::mic_source::MicSource;
use crate::audio::queue_player::QueuePlayer;
use crate::audio::rms::RmsMeter;
use crate::audio::speaker_sink::SpeakerSink;
use crate::audio::AudioFrame;
use crate::capsules::queue::{DrainPolicy, Queue};
use crate::capsules::sink::BaseSink;
use crate::capsules::source::{BaseSource, Source};
use crate::capsules::transform::BaseTransform;
use crate::config::AudioConfig;
use crate::error::VpResult;
use crate::payload::Direction;
use crate::pipeline::Pipeline;
use crate::pipelines::speech_translator::MicInput;
use crate::services::{AsrCapsule, ServiceRegistry, TranslationCapsule, TtsCapsule};

pub fn build_selftalk_pipeline(
    name: impl Into<String>,
    config: &AudioConfig,
    input: MicInput,
    registry: Arc<ServiceRegistry>,
    asr_name: impl Into<String>,
    translation_name: impl Into<String>,
    tts_name: impl Into<String>,
    src_lang: impl Into<String>,
    dest_lang: impl Into<String>,
) -> VpResult<(Arc<Pipeline>, Arc<RmsMeter>)> {
    let pipeline = Arc::new(Pipeline::new(name));

    let source: Arc<dyn Source<AudioFrame>> = match input {
        MicInput::Device { name } => Arc::new(MicSource::open(
            name.as_deref(),
            config.format.sample_rate,
            config.buffer_frames,
        )?),
        MicInput::File { path } => Arc::new(FileSource::open(&path, config.buffer_frames)?),
    };
    let mic = BaseSource::new("MicSource", Some("mic".into()), source);
    pipeline.add_child(mic.clone());

    let queue = Queue::<AudioFrame>::new(Some("capture-queue".into()), 32, DrainPolicy::Downstream);
    pipeline.add_child(queue.clone());
    mic.out_port().link(queue.in_port());

    let meter = RmsMeter::new();
    let meter_capsule = BaseTransform::new("RmsMeter", Some("level-meter".into()), meter.clone());
    pipeline.add_child(meter_capsule.clone());
    queue.out_port().link(meter_capsule.in_port());

    let to_payload = BaseTransform::new(
        "AudioToPayload",
        Some("to-payload".into()),
        Arc::new(AudioToPayload::new(Direction::Upstream)),
    );
    pipeline.add_child(to_payload.clone());
    meter_capsule.out_port().link(to_payload.in_port());

    let src_lang = src_lang.into();
    let dest_lang = dest_lang.into();

    let asr_capsule = AsrCapsule::new(Some("asr".into()), registry.clone(), asr_name, src_lang.clone());
    pipeline.add_child(asr_capsule.clone());
    to_payload.out_port().link(asr_capsule.in_port());

    let translation_capsule = TranslationCapsule::new(
        Some("translation".into()),
        registry.clone(),
        translation_name,
        src_lang,
        dest_lang.clone(),
    );
    pipeline.add_child(translation_capsule.clone());
    asr_capsule.out_port().link(translation_capsule.in_port());

    let tts_capsule = TtsCapsule::new(Some("tts".into()), registry, tts_name, dest_lang);
    pipeline.add_child(tts_capsule.clone());
    translation_capsule.out_port().link(tts_capsule.in_port());

    let to_audio = BaseTransform::new(
        "PayloadToAudio",
        Some("to-audio".into()),
        Arc::new(PayloadToAudio::new(PayloadAudioField::Translated)),
    );
    pipeline.add_child(to_audio.clone());
    tts_capsule.out_port().link(to_audio.in_port());

    let player = QueuePlayer::new(Some("player".into()), config.format.sample_rate, config.buffer_frames);
    pipeline.add_child(player.clone());
    to_audio.out_port().link(player.in_port());

    let speaker = Arc::new(SpeakerSink::open(None, config.format.sample_rate)?);
    let speaker_capsule = BaseSink::new("SpeakerSink", Some("speaker".into()), speaker);
    pipeline.add_child(speaker_capsule.clone());
    player.out_port().link(speaker_capsule.in_port());

    Ok((pipeline, meter))
}
