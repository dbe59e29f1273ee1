//! Bidirectional call: an [`upstream`](crate::pipelines::upstream) leg and a
//! [`downstream`](crate::pipelines::downstream) leg composed as children of
//! one pipeline, so a single `play`/`pause`/`stop` drives both directions of
//! the call together.

use std::sync::Arc;

use crate::audio::virtual_device::VirtualAudioDevice;
use crate::config::AudioConfig;
use crate::error::VpResult;
use crate::pipeline::Pipeline;
use crate::pipelines::downstream::build_downstream_pipeline;
use crate::pipelines::speech_translator::MicInput;
use crate::pipelines::upstream::build_upstream_pipeline;
use crate::services::ServiceRegistry;

pub fn build_dualstream_pipeline(
    name: impl Into<String>,
    config: &AudioConfig,
    mic_input: MicInput,
    outgoing_device: Arc<dyn VirtualAudioDevice>,
    incoming_device: Arc<dyn VirtualAudioDevice>,
    registry: Arc<ServiceRegistry>,
    asr_name: impl Into<String>,
    translation_name: impl Into<String>,
    tts_name: impl Into<String>,
    src_lang: impl Into<String>,
    dest_lang: impl Into<String>,
) -> VpResult<Arc<Pipeline>> {
    let pipeline = Arc::new(Pipeline::new(name));

    let up = build_upstream_pipeline(
        "upstream",
        config,
        mic_input,
        outgoing_device,
        registry,
        asr_name,
        translation_name,
        tts_name,
        src_lang,
        dest_lang,
    )?;
    pipeline.add_child(up);

    let down = build_downstream_pipeline("downstream", config, incoming_device)?;
    pipeline.add_child(down);

    Ok(pipeline)
}
