// Animation arbitration engine
//
// Selects each node's active animation by priority and maps elapsed
// time to a frame index. The arbitration itself lives on `Node`
// (`apply_animation`); this module owns the timing model and the
// settings/frame caches.

mod animation;
mod library;

pub use animation::{Animation, AnimationId, PlayMode};
pub use library::{AnimationLibrary, AnimationSettings};
