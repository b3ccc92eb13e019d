// Animation instances and frame-index timing
//
// An animation never owns its node: `owner` is an arena id, and anyone
// holding an animation whose owner has been dropped must treat it as
// inert. Progress is tracked in effective elapsed time (real time
// integrated with the speed multiplier) so the speed can change at any
// point without the animation losing its place.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::engine::animation::AnimationSettings;
use crate::engine::error::EngineError;
use crate::engine::scene::NodeId;

static NEXT_ANIMATION_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of one animation instance. Clones share the identity, so
/// re-applying the currently active animation is recognised as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(u64);

impl AnimationId {
    fn next() -> Self {
        Self(NEXT_ANIMATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What happens after the last frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayMode {
    /// Windup frames play once, then the remaining frames cycle forever
    Repeat,
    /// The animation hangs on its final frame
    Hold,
}

/// One playing animation, bound to the node it animates.
#[derive(Debug, Clone)]
pub struct Animation {
    id: AnimationId,

    /// Non-owning back-reference to the animated node
    owner: NodeId,

    /// Selects the frame-set/timing table in the `AnimationLibrary`
    key: String,

    /// Arbitration rank; see `Node::apply_animation`
    priority: i32,

    /// Playback speed multiplier. Clamped non-negative: a negative
    /// speed is undefined and would break the monotonicity of
    /// `elapsed_effective`.
    speed: f32,

    /// Scale factor handed to the asset provider when frames are loaded
    scale: f32,

    /// Real time this animation has been active
    elapsed: Duration,

    /// ∫ speed dt - the clock frames are actually indexed by
    elapsed_effective: Duration,

    /// Leading frames that play exactly once before the cycle
    windup_frames: usize,

    /// Per-instance frame duration override
    frame_duration: Option<Duration>,

    mode: PlayMode,
}

impl Animation {
    /// Create a repeating animation with default priority and speed
    pub fn repeating(owner: NodeId, key: &str) -> Self {
        Self::new(owner, key, PlayMode::Repeat)
    }

    /// Create an animation that hangs on its last frame
    pub fn hold(owner: NodeId, key: &str) -> Self {
        Self::new(owner, key, PlayMode::Hold)
    }

    fn new(owner: NodeId, key: &str, mode: PlayMode) -> Self {
        Self {
            id: AnimationId::next(),
            owner,
            key: key.to_string(),
            priority: 0,
            speed: 1.0,
            scale: 1.0,
            elapsed: Duration::ZERO,
            elapsed_effective: Duration::ZERO,
            windup_frames: 0,
            frame_duration: None,
            mode,
        }
    }

    /// Set the arbitration priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the playback speed (clamped non-negative)
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.max(0.0);
        self
    }

    /// Set the frame scale factor
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Set the number of windup frames
    pub fn with_windup(mut self, frames: usize) -> Self {
        self.windup_frames = frames;
        self
    }

    /// Override the frame duration for this instance only
    pub fn with_frame_duration(mut self, duration: Duration) -> Self {
        self.frame_duration = Some(duration);
        self
    }

    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Change the playback speed mid-flight. Progress is preserved
    /// because frames are indexed by `elapsed_effective`, not by
    /// rescaling real elapsed time.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn elapsed_effective(&self) -> Duration {
        self.elapsed_effective
    }

    pub fn windup_frames(&self) -> usize {
        self.windup_frames
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Advance both clocks by one tick's duration
    pub fn advance(&mut self, dt: Duration) {
        self.elapsed += dt;
        self.elapsed_effective += dt.mul_f32(self.speed);
    }

    /// Resolve the frame duration for this instance, in priority order:
    /// the per-instance override, then the settings-table default, then
    /// the engine-wide default.
    pub fn resolve_frame_duration(
        &self,
        settings: &AnimationSettings,
        engine_default: Duration,
    ) -> Duration {
        self.frame_duration
            .or_else(|| settings.frame_duration())
            .unwrap_or(engine_default)
    }

    /// Current frame index for a frame set of `total_frames` frames.
    ///
    /// With `W` windup frames and `F` total frames, the first `W`
    /// frames play exactly once and frames `[W, F)` cycle indefinitely;
    /// `Hold` mode clamps to the final frame instead of cycling. A
    /// repeating animation with no repeating frames (`F <= W`) is a
    /// configuration error.
    pub fn frame_index(
        &self,
        total_frames: usize,
        frame_duration: Duration,
    ) -> Result<usize, EngineError> {
        let bad_table = || EngineError::BadFrameTable {
            key: self.key.clone(),
            total_frames,
            windup_frames: self.windup_frames,
        };

        if total_frames == 0 {
            return Err(bad_table());
        }

        let frames_elapsed =
            (self.elapsed_effective.as_nanos() / frame_duration.as_nanos().max(1)) as usize;

        match self.mode {
            PlayMode::Repeat => {
                if total_frames <= self.windup_frames {
                    return Err(bad_table());
                }

                if frames_elapsed < self.windup_frames {
                    Ok(frames_elapsed)
                } else {
                    let cycle = total_frames - self.windup_frames;
                    Ok(self.windup_frames + (frames_elapsed - self.windup_frames) % cycle)
                }
            }
            PlayMode::Hold => Ok(frames_elapsed.min(total_frames - 1)),
        }
    }
}
