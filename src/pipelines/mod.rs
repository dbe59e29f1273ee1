//! The six pipeline assemblies: concrete wirings of source, transform, and
//! sink capsules into a `Pipeline` for each of the supported call
//! topologies.

pub mod augmented_speech_translator;
pub mod dualstream;
pub mod downstream;
pub mod selftalk;
pub mod speech_translator;
pub mod upstream;

pub use augmented_speech_translator::build_augmented_speech_translator;
pub use downstream::build_downstream_pipeline;
pub use dualstream::build_dualstream_pipeline;
pub use selftalk::build_selftalk_pipeline;
pub use speech_translator::build_speech_translator;
pub use upstream::build_upstream_pipeline;
