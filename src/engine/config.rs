// Engine configuration
//
// All tuning knobs that are configuration inputs rather than engine
// behavior live here: tick/frame rates, the engine-wide animation
// default, the hitbox tag whitelist and the resource folder convention.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Default engine-wide animation rate, used when neither an animation
/// instance nor its settings table declares a frame duration.
pub const DEFAULT_ANIMATION_FPS: u32 = 12;

/// Engine-wide configuration.
///
/// A rate of 0 means unlimited: the scheduler runs one logical update
/// per real-time sample (consuming the whole accumulator) and renders
/// on every sample.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Logical updates per second (0 = unlimited)
    pub tick_rate: u32,

    /// Render passes per second (0 = unlimited)
    pub frame_rate: u32,

    /// Fallback animation rate when nothing more specific is declared
    pub default_animation_fps: u32,

    /// Every tag a hitbox may carry; registering a hitbox with a tag
    /// outside this set is a configuration error
    pub hitbox_tags: HashSet<String>,

    /// Root folder for animation data and surfaces, absolute or relative
    /// to the working directory
    pub resource_path: PathBuf,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            tick_rate: 0,
            frame_rate: 0,
            default_animation_fps: DEFAULT_ANIMATION_FPS,
            hitbox_tags: HashSet::new(),
            resource_path: PathBuf::from("res"),
        }
    }

    /// Set the logical update rate
    pub fn with_tick_rate(mut self, ticks_per_second: u32) -> Self {
        self.tick_rate = ticks_per_second;
        self
    }

    /// Set the render rate
    pub fn with_frame_rate(mut self, frames_per_second: u32) -> Self {
        self.frame_rate = frames_per_second;
        self
    }

    /// Set the engine-wide default animation rate
    pub fn with_default_animation_fps(mut self, fps: u32) -> Self {
        self.default_animation_fps = fps;
        self
    }

    /// Declare the set of valid hitbox tags
    pub fn with_hitbox_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hitbox_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Set the resource folder path
    pub fn with_resource_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.resource_path = path.into();
        self
    }

    /// Frame duration implied by the engine-wide default fps
    pub fn default_frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.default_animation_fps.max(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
