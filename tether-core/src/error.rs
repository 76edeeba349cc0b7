//! Error types shared across the crate.

use thiserror::Error;

use crate::host::StateKey;
use crate::reactive::Phase;

/// Errors surfaced by the reactive core and the component shim.
#[derive(Debug, Error)]
pub enum TetherError {
    /// The storage record holds a value of a different type under a slot's key.
    #[error("state slot {key} holds a value of an unexpected type")]
    StateTypeMismatch { key: StateKey },

    /// The storage record has no entry for a slot's key.
    #[error("state slot {key} is missing from the storage record")]
    StateMissing { key: StateKey },

    /// `Component::settle` kept re-rendering past the configured bound.
    #[error("component did not settle after {passes} render passes")]
    RenderLoop { passes: usize },

    /// A props struct could not be converted into a keyed mapping.
    #[error("props conversion failed: {0}")]
    Props(#[from] serde_json::Error),

    /// A props struct serialized to something other than a map.
    #[error("props must serialize to an object, got {kind}")]
    NotAnObject { kind: &'static str },
}

/// A panic caught while a lifecycle callback was running.
///
/// Never returned to callers; the dispatcher logs it and moves on to the
/// next callback.
#[derive(Debug, Error)]
#[error("{phase} callback panicked: {message}")]
pub struct ReactionPanic {
    pub phase: Phase,
    pub message: String,
}

impl ReactionPanic {
    pub(crate) fn from_payload(phase: Phase, payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { phase, message }
    }
}

pub type Result<T, E = TetherError> = std::result::Result<T, E>;
