// Animation settings tables and the frame cache
//
// The library is an explicitly owned cache object with the lifetime of
// the `Game` that holds it. Frame images are cached per (frame key,
// scale) so an animation playing on many nodes loads each frame once.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::engine::error::EngineError;
use crate::engine::providers::{AssetProvider, Image};

/// The timing table and frame set for one animation key.
///
/// Deserialized from the `animation_settings` section of an animation
/// data file:
///
/// ```json
/// {
///     "animation_settings": {
///         "idle": { "frames": ["idle_0", "idle_1"], "frame_duration_ms": 120 },
///         "walk": { "frames": ["walk_0", "walk_1", "walk_2"] }
///     }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AnimationSettings {
    /// Frame keys, in play order; resolved through the asset provider
    pub frames: Vec<String>,

    /// Default frame duration for this animation; instances may
    /// override it, and the engine default applies when absent
    #[serde(default)]
    pub frame_duration_ms: Option<u64>,
}

impl AnimationSettings {
    pub fn with_frames(frames: Vec<String>) -> Self {
        Self {
            frames,
            frame_duration_ms: None,
        }
    }

    pub fn with_frames_and_duration(frames: Vec<String>, frame_duration_ms: Option<u64>) -> Self {
        Self {
            frames,
            frame_duration_ms,
        }
    }

    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn frame_duration(&self) -> Option<Duration> {
        self.frame_duration_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Deserialize)]
struct AnimationData {
    animation_settings: HashMap<String, AnimationSettings>,
}

/// Owned store of animation settings plus a frame-image cache.
#[derive(Default)]
pub struct AnimationLibrary {
    settings: HashMap<String, AnimationSettings>,
    frames: HashMap<(String, u32), Image>,
}

impl AnimationLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the `animation_settings` section of an animation data file
    /// into the library. Later loads replace earlier entries per key.
    pub fn load_json(&mut self, json: &str) -> Result<(), EngineError> {
        let data: AnimationData =
            serde_json::from_str(json).map_err(|e| EngineError::AnimationData(e.to_string()))?;

        debug!(
            "loaded {} animation settings entr(ies)",
            data.animation_settings.len()
        );
        self.settings.extend(data.animation_settings);
        Ok(())
    }

    /// Register or replace the settings for one animation key
    pub fn insert(&mut self, key: &str, settings: AnimationSettings) {
        self.settings.insert(key.to_string(), settings);
    }

    /// Look up the settings for an animation key
    pub fn settings(&self, key: &str) -> Result<&AnimationSettings, EngineError> {
        self.settings
            .get(key)
            .ok_or_else(|| EngineError::UnknownAnimation(key.to_string()))
    }

    /// Fetch a frame image at the given scale, loading through the
    /// provider on the first request only.
    pub fn frame(
        &mut self,
        frame_key: &str,
        scale: f32,
        provider: &mut dyn AssetProvider,
    ) -> Result<Image, EngineError> {
        let cache_key = (frame_key.to_string(), scale.to_bits());

        if let Some(image) = self.frames.get(&cache_key) {
            return Ok(*image);
        }

        let image = provider.load_frame(frame_key, scale)?;
        self.frames.insert(cache_key, image);
        Ok(image)
    }

    /// Number of cached frame images
    pub fn cached_frames(&self) -> usize {
        self.frames.len()
    }
}
