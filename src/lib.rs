//! Playroom: the simulation core of a 2D scene-graph game engine.
//!
//! Fixed-timestep tick scheduling, a priority-ordered scene graph with
//! partial-redraw bookkeeping, priority-arbitrated sprite animation and
//! tag-indexed AABB collision. All I/O (images, input, persistent
//! state, drawing) is behind the provider traits in
//! [`engine::providers`]; the core itself never blocks or touches a
//! backend.

pub mod core;
pub mod engine;
pub mod game;

pub use engine::animation::{Animation, AnimationLibrary, AnimationSettings, PlayMode};
pub use engine::collision::{Hitbox, HitboxId, HitboxRegistry, SurfaceHitbox};
pub use engine::config::EngineConfig;
pub use engine::error::EngineError;
pub use engine::events::{EventKind, EventPhase, GameEvent, GameEventHandler, ListenerAction};
pub use engine::game::{FrameReport, Game, GameContext};
pub use engine::providers::{
    AssetProvider, ClassRegistry, ClassResolver, Image, ImageHandle, InputEvent, InputSource,
    RenderTarget, StateProvider,
};
pub use engine::scene::{Node, NodeBehavior, NodeId, Scene, Surface, TickContext};
pub use engine::scheduler::{FramePlan, Scheduler, TickStep};
pub use game::RoomLoader;
