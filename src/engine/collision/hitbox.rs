// Hitboxes and collision geometry
//
// A hitbox binds a geometry object to the node it protects, by id
// only. Geometry types resolve their pairwise checkers dynamically:
// each type answers `checker_for(other_type)` and the registry tries
// both operands before giving up. That keeps the dispatch open to new
// geometry types without a central match over every pairing.

use std::any::{Any, TypeId};
use std::collections::BTreeSet;

use crate::engine::scene::{NodeArena, NodeId};

/// Identity of a registered hitbox. Ids are never reused within a
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HitboxId(pub(crate) u64);

/// A pairwise collision test. Takes both hitboxes plus the node arena
/// their owners live in; an unresolvable owner means no collision.
pub type CheckerFn = fn(&Hitbox, &Hitbox, &NodeArena) -> bool;

/// Collision geometry attached to a hitbox.
pub trait HitboxGeometry: Any {
    /// The checker this geometry knows for colliding with `other`, if
    /// any. Callers pass `self` as the first checker argument.
    fn checker_for(&self, other: TypeId) -> Option<CheckerFn>;

    fn as_any(&self) -> &dyn Any;

    /// Type name for error reporting
    fn kind_name(&self) -> &'static str;
}

/// A tagged, geometry-carrying collision volume owned by the registry.
pub struct Hitbox {
    owner: NodeId,
    tags: BTreeSet<String>,
    geometry: Box<dyn HitboxGeometry>,
}

impl Hitbox {
    pub fn new(owner: NodeId, geometry: Box<dyn HitboxGeometry>) -> Self {
        Self {
            owner,
            tags: BTreeSet::new(),
            geometry,
        }
    }

    /// Add one tag
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    /// Replace the tag set
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn geometry(&self) -> &dyn HitboxGeometry {
        self.geometry.as_ref()
    }
}

/// Axis-aligned geometry derived from the owning node's surface: the
/// bounds are the owner's absolute position extended by its surface
/// size, recomputed at every test. An owner with no surface, or one
/// that has been dropped, makes the hitbox inert.
///
/// `inverted` flips the volume inside-out, for bounds-style boxes that
/// collide with whatever pokes *outside* them (a room keeping its
/// occupants in). Two inverted boxes always collide; almost everything
/// is outside both.
pub struct SurfaceHitbox {
    inverted: bool,
}

impl SurfaceHitbox {
    pub fn new() -> Self {
        Self { inverted: false }
    }

    pub fn inverted() -> Self {
        Self { inverted: true }
    }

    pub fn is_inverted(&self) -> bool {
        self.inverted
    }
}

impl Default for SurfaceHitbox {
    fn default() -> Self {
        Self::new()
    }
}

impl HitboxGeometry for SurfaceHitbox {
    fn checker_for(&self, other: TypeId) -> Option<CheckerFn> {
        if other == TypeId::of::<SurfaceHitbox>() {
            Some(surface_vs_surface)
        } else {
            None
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn kind_name(&self) -> &'static str {
        "SurfaceHitbox"
    }
}

fn surface_vs_surface(a: &Hitbox, b: &Hitbox, nodes: &NodeArena) -> bool {
    let (Some(geom_a), Some(geom_b)) = (
        a.geometry().as_any().downcast_ref::<SurfaceHitbox>(),
        b.geometry().as_any().downcast_ref::<SurfaceHitbox>(),
    ) else {
        return false;
    };

    // Stale owners and surface-less nodes are inert
    let (Some(rect_a), Some(rect_b)) = (
        nodes.absolute_rect(a.owner()),
        nodes.absolute_rect(b.owner()),
    ) else {
        return false;
    };

    match (geom_a.inverted, geom_b.inverted) {
        (false, false) => rect_a.overlaps(&rect_b),
        // A normal box collides with an inverted one exactly when it is
        // not fully inside it
        (false, true) => !rect_b.contains_rect(&rect_a),
        (true, false) => !rect_a.contains_rect(&rect_b),
        (true, true) => true,
    }
}
