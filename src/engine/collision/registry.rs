// Hitbox registry: tag buckets and per-tick collision dedup
//
// The registry owns every live hitbox and indexes them by tag for
// queries. Collision checks are deduplicated within one tick through a
// set of normalized pair keys, cleared by the scene at the start of
// each update pass, so two entities probing the same pair both see the
// collision reported exactly once.

use std::collections::{HashMap, HashSet};

use log::trace;

use crate::engine::collision::{CheckerFn, Hitbox, HitboxId};
use crate::engine::error::EngineError;
use crate::engine::scene::{NodeArena, NodeId};

/// Normalized unordered pair identifying one collision check.
///
/// Keying by owner collapses all hitbox pairs between two nodes into a
/// single check per tick; keying by hitbox keeps each pair distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CollisionKey {
    Owners(NodeId, NodeId),
    Hitboxes(HitboxId, HitboxId),
}

impl CollisionKey {
    fn owners(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self::Owners(a, b)
        } else {
            Self::Owners(b, a)
        }
    }

    fn hitboxes(a: HitboxId, b: HitboxId) -> Self {
        if a <= b {
            Self::Hitboxes(a, b)
        } else {
            Self::Hitboxes(b, a)
        }
    }
}

/// Owns and indexes the hitboxes of one scene.
pub struct HitboxRegistry {
    hitboxes: HashMap<HitboxId, Hitbox>,
    by_tag: HashMap<String, HashSet<HitboxId>>,
    checked: HashSet<CollisionKey>,
    allowed_tags: HashSet<String>,
    next_id: u64,
}

impl HitboxRegistry {
    pub fn new(allowed_tags: HashSet<String>) -> Self {
        let by_tag = allowed_tags
            .iter()
            .map(|tag| (tag.clone(), HashSet::new()))
            .collect();

        Self {
            hitboxes: HashMap::new(),
            by_tag,
            checked: HashSet::new(),
            allowed_tags,
            next_id: 0,
        }
    }

    /// Register a hitbox under every tag it carries. Tags outside the
    /// configured whitelist are a configuration error.
    pub fn register(&mut self, hitbox: Hitbox) -> Result<HitboxId, EngineError> {
        for tag in hitbox.tags() {
            if !self.allowed_tags.contains(tag) {
                return Err(EngineError::InvalidTag(tag.clone()));
            }
        }

        let id = HitboxId(self.next_id);
        self.next_id += 1;

        for tag in hitbox.tags() {
            if let Some(bucket) = self.by_tag.get_mut(tag) {
                bucket.insert(id);
            }
        }
        self.hitboxes.insert(id, hitbox);
        Ok(id)
    }

    /// Remove a hitbox from the raw set and every tag bucket at once
    pub fn unregister(&mut self, id: HitboxId) -> Option<Hitbox> {
        let hitbox = self.hitboxes.remove(&id)?;
        for tag in hitbox.tags() {
            if let Some(bucket) = self.by_tag.get_mut(tag) {
                bucket.remove(&id);
            }
        }
        Some(hitbox)
    }

    pub fn get(&self, id: HitboxId) -> Option<&Hitbox> {
        self.hitboxes.get(&id)
    }

    pub fn contains(&self, id: HitboxId) -> bool {
        self.hitboxes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.hitboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hitboxes.is_empty()
    }

    /// Ids registered under a tag
    pub fn tagged(&self, tag: &str) -> impl Iterator<Item = HitboxId> + '_ {
        self.by_tag.get(tag).into_iter().flatten().copied()
    }

    /// Select hitboxes by tag membership and an optional predicate.
    ///
    /// `tags_any` keeps hitboxes carrying at least one of the tags,
    /// `tags_all` keeps those carrying every tag; passing `None` for
    /// every filter returns everything. Results are sorted by id for
    /// deterministic iteration.
    pub fn query(
        &self,
        tags_any: Option<&[&str]>,
        tags_all: Option<&[&str]>,
        predicate: Option<&dyn Fn(&Hitbox) -> bool>,
    ) -> Vec<HitboxId> {
        let mut results: Vec<HitboxId> = self
            .hitboxes
            .iter()
            .filter(|(_, hitbox)| {
                if let Some(any) = tags_any {
                    if !any.iter().any(|tag| hitbox.has_tag(tag)) {
                        return false;
                    }
                }
                if let Some(all) = tags_all {
                    if !all.iter().all(|tag| hitbox.has_tag(tag)) {
                        return false;
                    }
                }
                if let Some(predicate) = predicate {
                    if !predicate(hitbox) {
                        return false;
                    }
                }
                true
            })
            .map(|(&id, _)| id)
            .collect();

        results.sort();
        results
    }

    /// Forget this tick's checked pairs. Called by the scene at the
    /// start of every update pass.
    pub fn reset_checked(&mut self) {
        if !self.checked.is_empty() {
            trace!("clearing {} checked collision pair(s)", self.checked.len());
        }
        self.checked.clear();
    }

    /// Deduplicated collision test between two registered hitboxes.
    ///
    /// The pair key is recorded so the same pair tests `false` for the
    /// rest of the tick; with `key_by_owner` the key is the owning node
    /// pair instead of the hitbox pair. Stale ids test `false` silently.
    /// A geometry pairing neither side knows a checker for is fatal,
    /// raised before the key is recorded so the error repeats.
    pub fn is_collision(
        &mut self,
        nodes: &NodeArena,
        a: HitboxId,
        b: HitboxId,
        key_by_owner: bool,
    ) -> Result<bool, EngineError> {
        let (Some(hitbox_a), Some(hitbox_b)) = (self.hitboxes.get(&a), self.hitboxes.get(&b))
        else {
            return Ok(false);
        };

        let key = if key_by_owner {
            CollisionKey::owners(hitbox_a.owner(), hitbox_b.owner())
        } else {
            CollisionKey::hitboxes(a, b)
        };

        if self.checked.contains(&key) {
            return Ok(false);
        }

        let checker = resolve_checker(hitbox_a, hitbox_b).ok_or_else(|| {
            EngineError::NoCollisionChecker {
                a: hitbox_a.geometry().kind_name(),
                b: hitbox_b.geometry().kind_name(),
            }
        })?;

        self.checked.insert(key);
        let (checker, first, second) = checker;
        Ok(checker(first, second, nodes))
    }
}

/// Two-step checker lookup: ask `a`'s geometry about `b`'s type, then
/// the reverse with the operands swapped.
fn resolve_checker<'h>(
    a: &'h Hitbox,
    b: &'h Hitbox,
) -> Option<(CheckerFn, &'h Hitbox, &'h Hitbox)> {
    let type_a = a.geometry().as_any().type_id();
    let type_b = b.geometry().as_any().type_id();

    if let Some(checker) = a.geometry().checker_for(type_b) {
        return Some((checker, a, b));
    }
    if let Some(checker) = b.geometry().checker_for(type_a) {
        return Some((checker, b, a));
    }
    None
}
