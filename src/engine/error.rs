// Engine error taxonomy
//
// Configuration and collision-compatibility errors are programmer
// mistakes: they propagate out of `start()` or the tick call and are
// expected to halt the process. Stale references (an animation or
// hitbox whose owning node was dropped) are never errors - every access
// point checks liveness and degrades to a silent no-op instead.

use crate::engine::providers::{AssetError, StateError};

/// Fatal engine errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("a scene root must be set before the game can be started")]
    NoRoot,

    #[error("unknown animation key: {0}")]
    UnknownAnimation(String),

    #[error(
        "animation '{key}' declares {total_frames} frames but {windup_frames} windup frames; \
         at least one repeating frame is required"
    )]
    BadFrameTable {
        key: String,
        total_frames: usize,
        windup_frames: usize,
    },

    #[error("invalid hitbox tag: {0}")]
    InvalidTag(String),

    #[error("no compatible collision checker for a collision between `{a}` and `{b}` hitboxes")]
    NoCollisionChecker {
        a: &'static str,
        b: &'static str,
    },

    #[error("unable to resolve the class name '{0}'")]
    UnknownClass(String),

    #[error("animation data error: {0}")]
    AnimationData(String),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    State(#[from] StateError),
}
