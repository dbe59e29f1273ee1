//! `vpipe`: a capsule-based streaming dataflow framework for real-time
//! speech translation pipelines.
//!
//! The core graph (`object`, `property`, `port`, `capsule`, `bus`,
//! `composite`, `pipeline`) is media-agnostic; `capsules` builds generic
//! source/sink/transform/fork/queue shapes on top of it; `audio` and
//! `services` are the concrete capsules a speech translator is assembled
//! from; `pipelines` wires those into the six supported call topologies.

pub mod adapters;
pub mod audio;
pub mod bridge;
pub mod bus;
pub mod capsule;
pub mod capsules;
pub mod composite;
pub mod config;
pub mod error;
pub mod object;
pub mod payload;
pub mod pipeline;
pub mod pipelines;
pub mod port;
pub mod property;
pub mod services;
pub mod task;

pub use capsule::{Capsule, CapsuleCore, VpState, VpStateTransition};
pub use error::{VpError, VpResult};
pub use object::Object;
pub use payload::{Direction, Payload};
pub use pipeline::Pipeline;
