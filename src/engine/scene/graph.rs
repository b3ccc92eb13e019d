// Scene graph storage and traversal
//
// Nodes live in an arena keyed by `NodeId`; ids are never reused, so a
// stale id (held by a hitbox or an animation after its node was
// dropped) fails lookup instead of dangling. The update pass visits
// children before their parent's own logic, highest priority first;
// the render pass paints a node's surface before its children,
// ascending priority, so higher-priority nodes end up visually on top.

use std::collections::HashMap;
use std::time::Duration;

use glam::Vec2;
use log::warn;

use crate::core::Rect;
use crate::engine::animation::AnimationLibrary;
use crate::engine::collision::{Hitbox, HitboxId, HitboxRegistry};
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::providers::{AssetProvider, RenderTarget};
use crate::engine::scene::{Node, NodeId, TickContext};

/// Arena storage for scene nodes
pub struct NodeArena {
    nodes: HashMap<NodeId, Node>,
    next_id: u64,
}

impl NodeArena {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_id: 0,
        }
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.remove(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Absolute position: the node's parent-relative position summed up
    /// the ancestor chain. `None` if the node (or an ancestor) is gone.
    pub fn absolute_position(&self, id: NodeId) -> Option<Vec2> {
        let mut node = self.get(id)?;
        let mut position = node.position();

        while let Some(parent) = node.parent() {
            node = self.get(parent)?;
            position += node.position();
        }

        Some(position)
    }

    /// The rectangle the node's surface covers in absolute coordinates.
    /// `None` for stale ids and surface-less nodes.
    pub fn absolute_rect(&self, id: NodeId) -> Option<Rect> {
        let position = self.absolute_position(id)?;
        let surface = self.get(id)?.surface()?;
        Some(surface.rect_at(position))
    }
}

/// A scene: the node tree plus its hitbox registry.
pub struct Scene {
    nodes: NodeArena,
    root: NodeId,
    hitboxes: HitboxRegistry,
    default_frame_duration: Duration,
}

impl Scene {
    /// Create a scene with an empty root node
    pub fn new(config: &EngineConfig) -> Self {
        let mut nodes = NodeArena::new();
        let root = nodes.insert(Node::new());

        Self {
            nodes,
            root,
            hitboxes: HitboxRegistry::new(config.hitbox_tags.clone()),
            default_frame_duration: config.default_frame_duration(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Insert a node into a parent's child set.
    ///
    /// If the parent has disappeared, the node is inserted detached and
    /// a warning is logged; the caller keeps the id and may reparent.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node, priority: i32) -> NodeId {
        node.priority = priority;

        if !self.nodes.contains(parent) {
            warn!("add_child: parent node no longer exists; inserting detached");
            node.parent = None;
            return self.nodes.insert(node);
        }

        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.push(id);
        }
        id
    }

    /// Move a node under a new parent. A node appears in exactly one
    /// parent's child set, so removal from the old parent happens
    /// first. Refuses (with a warning) to create a cycle.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> bool {
        if !self.nodes.contains(id) || !self.nodes.contains(new_parent) {
            return false;
        }

        let mut cursor = Some(new_parent);
        while let Some(current) = cursor {
            if current == id {
                warn!("reparent refused: the target parent is inside the node's own subtree");
                return false;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent());
        }

        self.detach(id);
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = Some(new_parent);
        }
        if let Some(parent_node) = self.nodes.get_mut(new_parent) {
            parent_node.children.push(id);
        }
        true
    }

    /// Detach a node from the scene, keeping it in the arena
    pub fn remove_child(&mut self, id: NodeId) {
        self.detach(id);
    }

    /// Destroy a node. Its children are detached and returned as
    /// orphans for the caller to reparent or discard; any hitboxes or
    /// animations still referring to the node become inert.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        if id == self.root {
            warn!("the scene root cannot be removed");
            return Vec::new();
        }

        self.detach(id);
        let Some(node) = self.nodes.remove(id) else {
            return Vec::new();
        };

        let orphans = node.children;
        for &child in &orphans {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
            }
        }
        orphans
    }

    /// Destroy a node and every descendant
    pub fn remove_subtree(&mut self, id: NodeId) {
        if id == self.root {
            warn!("the scene root cannot be removed");
            return;
        }

        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children);
            }
        }
    }

    fn detach(&mut self, id: NodeId) {
        let old_parent = self.nodes.get(id).and_then(|n| n.parent());
        if let Some(parent) = old_parent {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|&child| child != id);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    /// Children in ascending priority order; equal priorities keep
    /// insertion order (the stable fallback for unordered nodes)
    pub fn ordered_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(id) else {
            return Vec::new();
        };

        let mut children = node.children.clone();
        children.sort_by_key(|&child| self.nodes.get(child).map_or(0, |n| n.priority));
        children
    }

    pub fn hitboxes(&self) -> &HitboxRegistry {
        &self.hitboxes
    }

    pub fn hitboxes_mut(&mut self) -> &mut HitboxRegistry {
        &mut self.hitboxes
    }

    pub fn register_hitbox(&mut self, hitbox: Hitbox) -> Result<HitboxId, EngineError> {
        self.hitboxes.register(hitbox)
    }

    pub fn unregister_hitbox(&mut self, id: HitboxId) -> Option<Hitbox> {
        self.hitboxes.unregister(id)
    }

    /// Deduplicated collision check between two registered hitboxes;
    /// see `HitboxRegistry::is_collision`
    pub fn check_collision(
        &mut self,
        a: HitboxId,
        b: HitboxId,
        key_by_owner: bool,
    ) -> Result<bool, EngineError> {
        self.hitboxes.is_collision(&self.nodes, a, b, key_by_owner)
    }

    /// One logical update pass over the whole tree.
    ///
    /// Children are visited before their own node's logic, and among
    /// siblings highest priority first: event-consuming nodes rendered
    /// in front react to input before the nodes behind them. Each
    /// node's active animation is advanced afterwards and its surface
    /// refreshed from the current frame.
    pub fn update(
        &mut self,
        ctx: &TickContext<'_>,
        animations: &mut AnimationLibrary,
        assets: &mut dyn AssetProvider,
    ) -> Result<(), EngineError> {
        // Dedup keys live for exactly one tick
        self.hitboxes.reset_checked();
        self.update_node(self.root, ctx, animations, assets)
    }

    fn update_node(
        &mut self,
        id: NodeId,
        ctx: &TickContext<'_>,
        animations: &mut AnimationLibrary,
        assets: &mut dyn AssetProvider,
    ) -> Result<(), EngineError> {
        let mut children = self.ordered_children(id);
        children.reverse();

        for child in children {
            // Behaviors may remove or reparent nodes mid-pass
            let still_attached = self
                .nodes
                .get(child)
                .is_some_and(|n| n.parent() == Some(id));
            if still_attached {
                self.update_node(child, ctx, animations, assets)?;
            }
        }

        if let Some(mut behavior) = self.nodes.get_mut(id).and_then(|n| n.behavior.take()) {
            let result = behavior.on_update(id, self, ctx);
            if let Some(node) = self.nodes.get_mut(id) {
                if node.behavior.is_none() {
                    node.behavior = Some(behavior);
                }
            }
            result?;
        }

        self.refresh_animation(id, ctx, animations, assets)
    }

    /// Advance the node's active animation and swap its surface to the
    /// current frame. Nodes without an animation are untouched.
    fn refresh_animation(
        &mut self,
        id: NodeId,
        ctx: &TickContext<'_>,
        animations: &mut AnimationLibrary,
        assets: &mut dyn AssetProvider,
    ) -> Result<(), EngineError> {
        let (key, scale) = {
            let Some(node) = self.nodes.get_mut(id) else {
                return Ok(());
            };
            let Some(animation) = node.animation_mut() else {
                return Ok(());
            };
            animation.advance(ctx.elapsed);
            (animation.key().to_string(), animation.scale())
        };

        let frame_key = {
            let settings = animations.settings(&key)?;
            let Some(animation) = self.nodes.get(id).and_then(|n| n.animation()) else {
                return Ok(());
            };
            let duration =
                animation.resolve_frame_duration(settings, self.default_frame_duration);
            let index = animation.frame_index(settings.total_frames(), duration)?;
            settings.frames[index].clone()
        };

        let image = animations.frame(&frame_key, scale, assets)?;
        if let Some(node) = self.nodes.get_mut(id) {
            node.set_surface(Some(image.into()));
        }
        Ok(())
    }

    /// One render pass. Paints each node's own surface before its
    /// children, siblings in ascending priority, and returns the
    /// regions invalidated since the previous render for partial
    /// redraw.
    pub fn render(&mut self, target: &mut dyn RenderTarget) -> Vec<Rect> {
        let mut invalidated = Vec::new();
        self.render_node(self.root, Vec2::ZERO, target, &mut invalidated);
        invalidated
    }

    fn render_node(
        &mut self,
        id: NodeId,
        parent_origin: Vec2,
        target: &mut dyn RenderTarget,
        invalidated: &mut Vec<Rect>,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let origin = parent_origin + node.position();
        let drawn = node.surface().map(|s| s.rect_at(origin));

        if let (Some(surface), Some(rect)) = (node.surface(), drawn) {
            target.blit(surface.image, rect);
        }

        if let Some(node) = self.nodes.get_mut(id) {
            if node.dirty || node.last_drawn != drawn {
                if let Some(old) = node.last_drawn {
                    if Some(old) != drawn {
                        invalidated.push(old);
                    }
                }
                if let Some(new) = drawn {
                    invalidated.push(new);
                }
                node.last_drawn = drawn;
                node.dirty = false;
            }
        }

        for child in self.ordered_children(id) {
            self.render_node(child, origin, target, invalidated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::providers::{AssetError, Image, ImageHandle};
    use crate::engine::scene::{NodeBehavior, Surface};
    use glam::vec2;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    struct NullAssets;

    impl AssetProvider for NullAssets {
        fn load_frame(&mut self, key: &str, _scale: f32) -> Result<Image, AssetError> {
            Ok(Image {
                handle: ImageHandle::from_key(key),
                width: 8,
                height: 8,
            })
        }

        fn load_surface(&mut self, path: &Path) -> Result<Image, AssetError> {
            Err(AssetError::NotFound(path.display().to_string()))
        }
    }

    /// Behavior that appends its label to a shared visitation log
    struct Recorder {
        label: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl NodeBehavior for Recorder {
        fn on_update(
            &mut self,
            _node: NodeId,
            _scene: &mut Scene,
            _ctx: &TickContext<'_>,
        ) -> Result<(), EngineError> {
            self.log.borrow_mut().push(self.label);
            Ok(())
        }
    }

    /// Render target that records blit order
    struct BlitLog {
        blits: Vec<(ImageHandle, Rect)>,
    }

    impl RenderTarget for BlitLog {
        fn blit(&mut self, image: ImageHandle, region: Rect) {
            self.blits.push((image, region));
        }
    }

    fn scene() -> Scene {
        Scene::new(&EngineConfig::new())
    }

    fn tick(elapsed_ms: u64) -> TickContext<'static> {
        TickContext {
            tick_number: 0,
            elapsed: Duration::from_millis(elapsed_ms),
            events: &[],
        }
    }

    fn recorder(label: &'static str, log: &Rc<RefCell<Vec<&'static str>>>) -> Node {
        Node::new().with_behavior(Box::new(Recorder {
            label,
            log: Rc::clone(log),
        }))
    }

    fn run_update(scene: &mut Scene) {
        let mut animations = AnimationLibrary::new();
        scene
            .update(&tick(10), &mut animations, &mut NullAssets)
            .unwrap();
    }

    #[test]
    fn test_update_visits_children_before_parent_descending_priority() {
        // Several priority assignments, inserted in scrambled orders
        let cases: Vec<Vec<(&'static str, i32)>> = vec![
            vec![("low", 1), ("high", 5), ("mid", 3)],
            vec![("high", 9), ("mid", 0), ("low", -4)],
            vec![("mid", 2), ("low", -2), ("high", 7)],
        ];

        for case in cases {
            let log = Rc::new(RefCell::new(Vec::new()));
            let mut scene = scene();
            let root = scene.root();
            let parent = scene.add_child(root, recorder("parent", &log), 0);
            for (label, priority) in &case {
                scene.add_child(parent, recorder(label, &log), *priority);
            }

            run_update(&mut scene);

            assert_eq!(
                *log.borrow(),
                vec!["high", "mid", "low", "parent"],
                "case {case:?}"
            );
        }
    }

    #[test]
    fn test_update_tie_breaks_are_stable() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scene = scene();
        let root = scene.root();
        scene.add_child(root, recorder("first", &log), 1);
        scene.add_child(root, recorder("second", &log), 1);

        run_update(&mut scene);

        // Equal priority: the update pass reverses stable ascending
        // order, so the later insertion comes first
        assert_eq!(*log.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn test_render_paints_parent_then_children_ascending() {
        let mut scene = scene();
        let root = scene.root();

        let parent_surface = Surface::new(ImageHandle::from_key("parent"), vec2(10.0, 10.0));
        let parent = scene.add_child(root, Node::new().with_surface(parent_surface), 0);

        for (key, priority) in [("top", 5), ("bottom", -1), ("middle", 2)] {
            let surface = Surface::new(ImageHandle::from_key(key), vec2(4.0, 4.0));
            scene.add_child(parent, Node::new().with_surface(surface), priority);
        }

        let mut target = BlitLog { blits: Vec::new() };
        scene.render(&mut target);

        let order: Vec<ImageHandle> = target.blits.iter().map(|(image, _)| *image).collect();
        assert_eq!(
            order,
            vec![
                ImageHandle::from_key("parent"),
                ImageHandle::from_key("bottom"),
                ImageHandle::from_key("middle"),
                ImageHandle::from_key("top"),
            ],
            "low-to-high so later draws overlay earlier ones"
        );
    }

    #[test]
    fn test_render_positions_are_parent_relative() {
        let mut scene = scene();
        let root = scene.root();

        let parent = scene.add_child(
            root,
            Node::new().with_position(vec2(100.0, 50.0)),
            0,
        );
        let surface = Surface::new(ImageHandle::from_key("child"), vec2(8.0, 8.0));
        let child = scene.add_child(
            parent,
            Node::new().with_surface(surface).with_position(vec2(10.0, 10.0)),
            0,
        );

        assert_eq!(
            scene.nodes().absolute_position(child),
            Some(vec2(110.0, 60.0))
        );

        let mut target = BlitLog { blits: Vec::new() };
        scene.render(&mut target);
        assert_eq!(target.blits[0].1.min, vec2(110.0, 60.0));
    }

    #[test]
    fn test_render_reports_invalidated_regions() {
        let mut scene = scene();
        let root = scene.root();
        let surface = Surface::new(ImageHandle::from_key("box"), vec2(10.0, 10.0));
        let id = scene.add_child(root, Node::new().with_surface(surface), 0);

        let mut target = BlitLog { blits: Vec::new() };

        // First render invalidates the initial region
        let invalidated = scene.render(&mut target);
        assert_eq!(invalidated.len(), 1);

        // Nothing changed: nothing invalidated
        let invalidated = scene.render(&mut target);
        assert!(invalidated.is_empty());

        // Moving the node invalidates the old and the new region
        scene
            .node_mut(id)
            .unwrap()
            .set_position(vec2(50.0, 0.0));
        let invalidated = scene.render(&mut target);
        assert_eq!(invalidated.len(), 2);
        assert_eq!(invalidated[0].min, vec2(0.0, 0.0));
        assert_eq!(invalidated[1].min, vec2(50.0, 0.0));
    }

    #[test]
    fn test_remove_orphans_children() {
        let mut scene = scene();
        let root = scene.root();
        let parent = scene.add_child(root, Node::new(), 0);
        let child_a = scene.add_child(parent, Node::new(), 0);
        let child_b = scene.add_child(parent, Node::new(), 1);

        let orphans = scene.remove(parent);

        assert_eq!(orphans, vec![child_a, child_b]);
        assert!(!scene.contains(parent));
        // Orphans stay alive, detached, for the caller to deal with
        assert!(scene.contains(child_a));
        assert_eq!(scene.node(child_a).unwrap().parent(), None);

        // The caller may reparent an orphan back into the scene
        assert!(scene.reparent(child_a, root));
        assert_eq!(scene.node(child_a).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_reparent_keeps_single_ownership() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.add_child(root, Node::new(), 0);
        let b = scene.add_child(root, Node::new(), 0);
        let child = scene.add_child(a, Node::new(), 0);

        assert!(scene.reparent(child, b));

        assert!(!scene.node(a).unwrap().children().contains(&child));
        assert!(scene.node(b).unwrap().children().contains(&child));
        assert_eq!(scene.node(child).unwrap().parent(), Some(b));
    }

    #[test]
    fn test_reparent_refuses_cycles() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.add_child(root, Node::new(), 0);
        let b = scene.add_child(a, Node::new(), 0);

        assert!(!scene.reparent(a, b));
        assert_eq!(scene.node(a).unwrap().parent(), Some(root));
    }

    #[test]
    fn test_remove_subtree_drops_descendants() {
        let mut scene = scene();
        let root = scene.root();
        let a = scene.add_child(root, Node::new(), 0);
        let b = scene.add_child(a, Node::new(), 0);
        let c = scene.add_child(b, Node::new(), 0);

        scene.remove_subtree(a);

        assert!(!scene.contains(a));
        assert!(!scene.contains(b));
        assert!(!scene.contains(c));
        assert!(scene.node(root).unwrap().children().is_empty());
    }

    #[test]
    fn test_animation_drives_surface() {
        use crate::engine::animation::{Animation, AnimationSettings};

        let mut scene = scene();
        let root = scene.root();
        let id = scene.add_child(root, Node::new(), 0);

        let mut animations = AnimationLibrary::new();
        animations.insert(
            "idle",
            AnimationSettings::with_frames_and_duration(
                vec!["idle_0".into(), "idle_1".into()],
                Some(100),
            ),
        );

        scene
            .node_mut(id)
            .unwrap()
            .apply_animation(Animation::repeating(id, "idle"));

        // 150ms of effective time lands on frame index 1
        scene
            .update(&tick(150), &mut animations, &mut NullAssets)
            .unwrap();

        let surface = *scene.node(id).unwrap().surface().unwrap();
        assert_eq!(surface.image, ImageHandle::from_key("idle_1"));
    }

    #[test]
    fn test_unknown_animation_key_is_fatal() {
        use crate::engine::animation::Animation;

        let mut scene = scene();
        let root = scene.root();
        let id = scene.add_child(root, Node::new(), 0);
        scene
            .node_mut(id)
            .unwrap()
            .apply_animation(Animation::repeating(id, "missing"));

        let mut animations = AnimationLibrary::new();
        let err = scene
            .update(&tick(10), &mut animations, &mut NullAssets)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownAnimation(_)));
    }
}
