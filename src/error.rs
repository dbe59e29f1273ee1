//! Typed error surface for the framework.
//!
//! Framework-level failures (bad state transitions, unknown properties) are
//! typed; service and device failures wrap `anyhow::Error` the way
//! `ServiceError`/`DeviceError` wrap an arbitrary underlying cause.

use crate::capsule::VpState;

/// Errors surfaced by capsules, ports, and pipelines.
#[derive(Debug, thiserror::Error)]
pub enum VpError {
    /// Requested transition is not one of the six adjacent state pairs, or
    /// the capsule's current state does not match the transition's `from`.
    #[error("invalid state transition: {from:?} -> {to:?} (current state is {current:?})")]
    StateError {
        from: VpState,
        to: VpState,
        current: VpState,
    },

    /// Underlying device (mic, speaker, virtual audio device) failed to
    /// open, read, write, or close.
    #[error("device error: {0}")]
    DeviceError(String),

    /// A pluggable ASR/TTS/translation service failed.
    #[error("service error: {0}")]
    ServiceError(#[source] anyhow::Error),

    /// `set_prop` was called with a key the capsule does not recognize.
    #[error("unknown property '{0}'")]
    ConfigError(String),
}

pub type VpResult<T> = Result<T, VpError>;
