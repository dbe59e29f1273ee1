//! End-to-end scenarios built by wiring the public capsule API the way an
//! application assembling a pipeline would, rather than unit-testing one
//! capsule in isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vpipe::audio::mixer::Mixer;
use vpipe::audio::volume::Volume;
use vpipe::audio::AudioFrame;
use vpipe::capsules::queue::{DrainPolicy, Queue};
use vpipe::capsules::sink::{BaseSink, Sink};
use vpipe::capsules::source::{BaseSource, Source};
use vpipe::capsules::transform::{BaseTransform, Transform};
use vpipe::error::VpResult;
use vpipe::services::{AsrCapsule, AsrResult, AsrService, ServiceRegistry};
use vpipe::{Capsule, CapsuleCore, Pipeline, VpState, VpStateTransition};

/// A `Source` fed from a fixed, pre-loaded list of frames; returns `None`
/// (silence, no push) once exhausted, like a file source past EOF.
struct FixedSource {
    frames: Mutex<std::collections::VecDeque<AudioFrame>>,
}

impl FixedSource {
    fn new(frames: Vec<AudioFrame>) -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(frames.into()),
        })
    }
}

impl Source<AudioFrame> for FixedSource {
    fn pull(&self) -> Option<AudioFrame> {
        self.frames.lock().unwrap().pop_front()
    }
}

struct CollectingSink {
    seen: Mutex<Vec<AudioFrame>>,
}

impl CollectingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
        })
    }

    fn snapshot(&self) -> Vec<AudioFrame> {
        self.seen.lock().unwrap().clone()
    }
}

impl Sink<AudioFrame> for CollectingSink {
    fn consume(&self, data: AudioFrame) {
        self.seen.lock().unwrap().push(data);
    }
}

/// S1 — File → Volume → Queue → Sink passthrough, scaled by volume.
#[tokio::test]
async fn s1_volume_and_queue_passthrough_scales_every_block() {
    let frames: Vec<AudioFrame> = (0..5).map(|_| Arc::new(vec![1.0_f32, 1.0])).collect();
    let source = FixedSource::new(frames);
    let base_source = BaseSource::new("FixedSource", Some("a".into()), source.clone());

    let volume = Volume::new(0.5);
    let volume_capsule = BaseTransform::new("Volume", Some("volume".into()), volume.clone());

    let queue = Queue::<AudioFrame>::new(Some("queue".into()), 2, DrainPolicy::Downstream);

    let collector = CollectingSink::new();
    let sink_capsule = BaseSink::new("Sink", Some("sink".into()), collector.clone());

    let pipeline = Pipeline::new("s1");
    pipeline.add_child(base_source.clone());
    pipeline.add_child(volume_capsule.clone());
    pipeline.add_child(queue.clone());
    pipeline.add_child(sink_capsule.clone());

    base_source.out_port().link(volume_capsule.in_port());
    volume_capsule.out_port().link(queue.in_port());
    queue.out_port().link(sink_capsule.in_port());

    pipeline.play().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    pipeline.stop().unwrap();

    let seen = collector.snapshot();
    assert!(!seen.is_empty(), "speaker should have received at least one block");
    for block in &seen {
        for sample in block.iter() {
            assert!((sample - 0.5).abs() < 1e-6);
        }
    }
    assert_eq!(pipeline.state(), VpState::Null);
}

/// S2 — Two sources into a mixer, weighted by per-input volume.
#[tokio::test]
async fn s2_mixer_averages_two_weighted_inputs() {
    let pipeline = Pipeline::new("s2");

    let a_frames: Vec<AudioFrame> = (0..5).map(|_| Arc::new(vec![1.0_f32])).collect();
    let b_frames: Vec<AudioFrame> = (0..5).map(|_| Arc::new(vec![0.0_f32])).collect();
    let a_source = BaseSource::new("A", Some("a".into()), FixedSource::new(a_frames));
    let b_source = BaseSource::new("B", Some("b".into()), FixedSource::new(b_frames));
    pipeline.add_child(a_source.clone());
    pipeline.add_child(b_source.clone());

    let mixer = Mixer::new(Some("mixer".into()));
    pipeline.add_child(mixer.clone());
    let (in_a, volume_a) = mixer.add_input("a");
    let (in_b, volume_b) = mixer.add_input("b");
    volume_a.set_gain(0.5);
    volume_b.set_gain(1.0);
    a_source.out_port().link(in_a);
    b_source.out_port().link(in_b);

    let collector = CollectingSink::new();
    let sink_capsule = BaseSink::new("Sink", Some("sink".into()), collector.clone());
    pipeline.add_child(sink_capsule.clone());
    mixer.out_port().link(sink_capsule.in_port());

    pipeline.play().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    pipeline.stop().unwrap();

    let seen = collector.snapshot();
    assert!(!seen.is_empty());
    // in1=1.0*0.5, in2=0.0*1.0, mean over 2 inputs = 0.25.
    for block in &seen {
        assert!((block[0] - 0.25).abs() < 1e-6);
    }
}

/// S5 — state walk from NULL to RUNNING and back, in composite insertion
/// order, with every intermediate step recorded.
#[test]
fn s5_state_walk_visits_every_adjacent_step_in_order() {
    struct RecordingLeaf {
        core: CapsuleCore,
        trace: Arc<Mutex<Vec<VpStateTransition>>>,
    }

    impl Capsule for RecordingLeaf {
        fn core(&self) -> &CapsuleCore {
            &self.core
        }
        fn on_transition(&self, transition: VpStateTransition) -> VpResult<()> {
            self.trace.lock().unwrap().push(transition);
            Ok(())
        }
    }

    let pipeline = Pipeline::new("s5");
    let traces: Vec<_> = (0..3).map(|_| Arc::new(Mutex::new(Vec::new()))).collect();
    for (i, trace) in traces.iter().enumerate() {
        let leaf: Arc<dyn Capsule> = Arc::new(RecordingLeaf {
            core: CapsuleCore::new("Leaf", Some(format!("leaf{i}"))),
            trace: trace.clone(),
        });
        pipeline.add_child(leaf);
    }

    pipeline.play().unwrap();
    let expected_up = vec![
        VpStateTransition::NullToReady,
        VpStateTransition::ReadyToPaused,
        VpStateTransition::PausedToRunning,
    ];
    for trace in &traces {
        assert_eq!(*trace.lock().unwrap(), expected_up);
    }

    pipeline.stop().unwrap();
    let expected_down = vec![
        VpStateTransition::NullToReady,
        VpStateTransition::ReadyToPaused,
        VpStateTransition::PausedToRunning,
        VpStateTransition::RunningToPaused,
        VpStateTransition::PausedToReady,
        VpStateTransition::ReadyToNull,
    ];
    for trace in &traces {
        assert_eq!(*trace.lock().unwrap(), expected_down);
    }
}

/// S6 — ASR enable toggle: a stub service reports the input's mean
/// amplitude; toggling `enable` off should zero-substitute the audio before
/// the service call rather than skip the call.
#[tokio::test]
async fn s6_asr_disable_zero_substitutes_instead_of_skipping() {
    struct MeanAmplitudeAsr {
        calls: AtomicUsize,
        last_mean: Mutex<f32>,
    }

    #[async_trait::async_trait]
    impl AsrService for MeanAmplitudeAsr {
        async fn recognize(&self, audio: AudioFrame, _final_hint: bool) -> VpResult<Option<AsrResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mean = audio.iter().map(|s| s.abs()).sum::<f32>() / audio.len().max(1) as f32;
            *self.last_mean.lock().unwrap() = mean;
            Ok(Some(AsrResult {
                text: String::new(),
                is_final: true,
                speaker: None,
                origin_audio: None,
            }))
        }
    }

    let service = Arc::new(MeanAmplitudeAsr {
        calls: AtomicUsize::new(0),
        last_mean: Mutex::new(0.0),
    });
    let registry = ServiceRegistry::new();
    {
        let service = service.clone();
        registry.register_asr("mean-amplitude", move || service.clone() as Arc<dyn AsrService>);
    }
    let asr = AsrCapsule::new(Some("asr".into()), registry, "mean-amplitude", "en");
    asr.set_state(VpState::Paused).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let tone: AudioFrame = Arc::new(vec![10_000.0_f32; 16]);
    let mut payload = vpipe::Payload::new(vpipe::Direction::Upstream);
    payload.origin_audio = Some(tone.clone());
    payload.is_final = true;

    asr.in_port().push(payload.clone()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!((*service.last_mean.lock().unwrap() - 10_000.0).abs() < 1.0);

    asr.set_enabled(false);
    asr.in_port().push(payload.clone()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(*service.last_mean.lock().unwrap(), 0.0);
    let calls_after_disable = service.calls.load(Ordering::SeqCst);
    assert_eq!(calls_after_disable, 2, "disabled ASR must still call the service with silence");

    asr.set_enabled(true);
    let mut payload2 = payload;
    payload2.origin_audio = Some(tone);
    asr.in_port().push(payload2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!((*service.last_mean.lock().unwrap() - 10_000.0).abs() < 1.0);
}
