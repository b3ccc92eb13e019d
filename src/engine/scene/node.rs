// Scene graph nodes
//
// A node owns its surface and its children and nothing else; hitboxes
// and animations refer back to it only by id. Destroying a node
// therefore can never leave an owning reference dangling - holders of
// its id find the arena slot empty and go inert.

use std::time::Duration;

use glam::Vec2;
use log::trace;

use crate::core::Rect;
use crate::engine::animation::Animation;
use crate::engine::error::EngineError;
use crate::engine::providers::{Image, InputEvent};
use crate::engine::scene::Scene;

/// Identity of a node in its scene's arena. Ids are never reused
/// within a scene, so a stale id reliably fails lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl NodeId {
    #[cfg(test)]
    pub(crate) fn test_id(raw: u64) -> Self {
        Self(raw)
    }
}

/// A renderable surface: an opaque image handle plus its size in scene
/// units. The image itself lives with the asset provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub image: crate::engine::providers::ImageHandle,
    pub size: Vec2,
}

impl Surface {
    pub fn new(image: crate::engine::providers::ImageHandle, size: Vec2) -> Self {
        Self { image, size }
    }

    /// The rectangle this surface covers when drawn at `position`
    pub fn rect_at(&self, position: Vec2) -> Rect {
        Rect::new(position, self.size)
    }
}

impl From<Image> for Surface {
    fn from(image: Image) -> Self {
        Self {
            image: image.handle,
            size: image.size(),
        }
    }
}

/// Per-tick information handed down the update traversal
#[derive(Debug, Clone, Copy)]
pub struct TickContext<'a> {
    /// Tick number, wrapping at the tick rate
    pub tick_number: u64,
    /// Logical duration of this update
    pub elapsed: Duration,
    /// Input events snapshotted for this update
    pub events: &'a [InputEvent],
}

/// Node-local update logic, run after the node's children have been
/// visited. Behaviors get full mutable access to the scene; the
/// traversal tolerates a behavior removing or reparenting nodes
/// (including its own) mid-pass.
pub trait NodeBehavior {
    fn on_update(
        &mut self,
        node: NodeId,
        scene: &mut Scene,
        ctx: &TickContext<'_>,
    ) -> Result<(), EngineError>;
}

/// An element of the scene graph.
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    /// Child ids in insertion order; priority ordering is derived
    pub(crate) children: Vec<NodeId>,
    pub(crate) priority: i32,

    /// Position relative to the parent node
    position: Vec2,
    surface: Option<Surface>,
    animation: Option<Animation>,
    pub(crate) behavior: Option<Box<dyn NodeBehavior>>,

    /// Needs its region invalidated on the next render
    pub(crate) dirty: bool,
    /// Where this node's surface was drawn by the previous render
    pub(crate) last_drawn: Option<Rect>,
}

impl Node {
    pub fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            priority: 0,
            position: Vec2::ZERO,
            surface: None,
            animation: None,
            behavior: None,
            dirty: true,
            last_drawn: None,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_behavior(mut self, behavior: Box<dyn NodeBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child ids in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        if self.position != position {
            self.position = position;
            self.dirty = true;
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn set_surface(&mut self, surface: Option<Surface>) {
        if self.surface != surface {
            self.surface = surface;
            self.dirty = true;
        }
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    pub fn animation_mut(&mut self) -> Option<&mut Animation> {
        self.animation.as_mut()
    }

    /// Suggest a new active animation.
    ///
    /// The candidate replaces the active animation only when its
    /// priority is greater than or equal to the active one's; ties
    /// favor the newer candidate so an equal-priority animation can
    /// restart itself. Re-applying the currently active instance is a
    /// no-op on elapsed time, and declining is silent - callers may
    /// suggest opportunistically every tick without tracking state.
    pub fn apply_animation(&mut self, candidate: Animation) -> bool {
        match &self.animation {
            Some(active) if candidate.id() == active.id() => false,
            Some(active) if candidate.priority() < active.priority() => {
                trace!(
                    "animation '{}' (priority {}) declined: '{}' (priority {}) is active",
                    candidate.key(),
                    candidate.priority(),
                    active.key(),
                    active.priority()
                );
                false
            }
            _ => {
                self.animation = Some(candidate);
                true
            }
        }
    }

    pub fn clear_animation(&mut self) {
        self.animation = None;
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}
