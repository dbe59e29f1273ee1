//! Generic capsule shapes built on top of `Port`/`Capsule`: a pull-driven
//! source, a push-driven sink, a one-in-one-out transform, an N-way fan-out,
//! and a bounded queue. Audio and service capsules are built from these.

pub mod fork;
pub mod queue;
pub mod sink;
pub mod source;
pub mod transform;

pub use fork::Fork;
pub use queue::{DrainPolicy, Queue};
pub use sink::{BaseSink, Sink};
pub use source::{BaseSource, Source};
pub use transform::{BaseTransform, Transform};
