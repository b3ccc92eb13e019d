// External collaborator interfaces
//
// The simulation core owns no I/O: images, persistent state, input
// polling and data-declared entity classes all arrive through the
// traits below. Providers are called synchronously from inside the tick
// loop and must not block indefinitely; pre-loading is their concern,
// not this core's.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec2;
use serde_json::Value;

use crate::engine::error::EngineError;
use crate::engine::scene::{NodeId, Scene};

/// Opaque identifier for an image owned by the asset provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(pub u64);

impl ImageHandle {
    /// Derive a stable handle from a string key
    pub fn from_key(key: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// A loaded image: an opaque handle plus its pixel dimensions.
///
/// The core never touches pixels; dimensions are all it needs to place
/// surfaces and derive hitbox bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Image {
    pub handle: ImageHandle,
    pub width: u32,
    pub height: u32,
}

impl Image {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// Asset loading errors
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("failed to load asset: {0}")]
    LoadError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Loads and decodes images. Implementations are expected to cache;
/// the engine caches animation frames on top (see `AnimationLibrary`)
/// but calls straight through for one-off surfaces.
pub trait AssetProvider {
    /// Load a single animation frame at the given scale factor
    fn load_frame(&mut self, key: &str, scale: f32) -> Result<Image, AssetError>;

    /// Load a standalone surface image (room backgrounds etc.)
    fn load_surface(&mut self, path: &Path) -> Result<Image, AssetError>;
}

/// Persistent-state errors. `Locked` is recoverable: the caller may
/// choose to unlock the resource and retry.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("cannot modify this value while it is locked")]
    Locked,

    #[error("no value registered under state path: {0}")]
    MissingPath(String),

    #[error("unexpected value shape at state path: {0}")]
    WrongShape(String),
}

/// JSON-backed persistent state. The core only reads values (room,
/// entity and animation keys) and never interprets the storage format.
pub trait StateProvider {
    fn get(&self, path: &str, params: &[Value]) -> Result<Value, StateError>;

    fn set(&mut self, value: Value, path: &str, params: &[Value]) -> Result<(), StateError>;
}

/// A single input event, already translated from whatever backend
/// produced it. Scancodes and pointer positions are passed through
/// untouched; interpretation belongs to node logic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(u32),
    KeyReleased(u32),
    PointerMoved(Vec2),
    PointerPressed(Vec2),
    PointerReleased(Vec2),
    Quit,
}

/// Polled once per logical tick by the scheduler; each call returns the
/// events that arrived since the previous call.
pub trait InputSource {
    fn poll_events(&mut self) -> Vec<InputEvent>;
}

/// Receives draw calls during a render pass. This is the external 2D
/// drawing surface abstraction; the core decides order and placement
/// and nothing else.
pub trait RenderTarget {
    fn blit(&mut self, image: ImageHandle, region: crate::core::Rect);
}

/// Constructor for a data-declared entity class: builds the entity's
/// node(s) under `parent` from its JSON arguments and returns the root
/// node it created.
pub type EntityCtor =
    fn(scene: &mut Scene, parent: NodeId, args: &Value) -> Result<NodeId, EngineError>;

/// Resolves a class name from game data to an entity constructor
pub trait ClassResolver {
    fn resolve(&self, name: &str) -> Result<EntityCtor, EngineError>;
}

/// Map-backed `ClassResolver`. Classes are registered up front (or at
/// any point during runtime) under the names game data refers to them by.
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<String, EntityCtor>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under a name, replacing any previous registration
    pub fn insert(&mut self, name: &str, ctor: EntityCtor) {
        self.classes.insert(name.to_string(), ctor);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }
}

impl ClassResolver for ClassRegistry {
    fn resolve(&self, name: &str) -> Result<EntityCtor, EngineError> {
        self.classes
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UnknownClass(name.to_string()))
    }
}
