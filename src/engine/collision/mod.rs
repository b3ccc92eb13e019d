// Hitbox and collision subsystem

mod hitbox;
mod registry;

pub use hitbox::{CheckerFn, Hitbox, HitboxGeometry, HitboxId, SurfaceHitbox};
pub use registry::HitboxRegistry;
