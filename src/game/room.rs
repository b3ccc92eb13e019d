// Room loading
//
// Rooms are data-driven: the state provider holds a JSON description
// per room (its class plus the entities it spawns), class names resolve
// to constructors through the class registry, and the loader swaps the
// active room subtree inside a `RoomChange` event pair.
//
// Expected state shape under `rooms.<id>`:
//
// ```json
// {
//     "class": "Room",
//     "entities": [
//         { "class": "Crate", "args": { "x": 48.0, "y": 16.0 } }
//     ]
// }
// ```

use log::info;
use serde_json::Value;

use crate::engine::error::EngineError;
use crate::engine::events::EventKind;
use crate::engine::game::GameContext;
use crate::engine::providers::{ClassResolver, StateError};
use crate::engine::scene::NodeId;

/// Builds rooms from state data and tracks the active one.
#[derive(Default)]
pub struct RoomLoader {
    room_node: Option<NodeId>,
    current_room: Option<String>,
}

impl RoomLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_room(&self) -> Option<&str> {
        self.current_room.as_deref()
    }

    /// Root node of the active room
    pub fn room_node(&self) -> Option<NodeId> {
        self.room_node
    }

    /// Swap the active room.
    ///
    /// Reads the room description from the state provider, resolves its
    /// class and entity classes, then inside `Before`/`After`
    /// `RoomChange` events removes the previous room subtree and builds
    /// the new room under the scene root. Returns the new room node.
    pub fn set_room(
        &mut self,
        room_id: &str,
        ctx: GameContext<'_>,
    ) -> Result<NodeId, EngineError> {
        let GameContext {
            scene,
            state,
            classes,
            events,
        } = ctx;

        let room_data = state.get(&format!("rooms.{room_id}"), &[])?;
        let class_name = room_data
            .get("class")
            .and_then(Value::as_str)
            .ok_or_else(|| StateError::WrongShape(format!("rooms.{room_id}.class")))?;
        let entities = room_data
            .get("entities")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        // Resolve every class before touching the scene, so a bad name
        // cannot leave a half-built room behind
        let room_ctor = classes.resolve(class_name)?;
        let mut entity_ctors = Vec::with_capacity(entities.len());
        for entity in &entities {
            let name = entity
                .get("class")
                .and_then(Value::as_str)
                .ok_or_else(|| StateError::WrongShape(format!("rooms.{room_id}.entities")))?;
            entity_ctors.push(classes.resolve(name)?);
        }

        let previous = self.room_node.take();
        let room = events.surround(
            EventKind::RoomChange,
            Value::String(room_id.to_string()),
            || -> Result<NodeId, EngineError> {
                if let Some(old) = previous {
                    scene.remove_subtree(old);
                }

                let root = scene.root();
                let room = room_ctor(scene, root, &room_data)?;
                for (ctor, entity) in entity_ctors.iter().zip(&entities) {
                    let args = entity.get("args").cloned().unwrap_or(Value::Null);
                    ctor(scene, room, &args)?;
                }
                Ok(room)
            },
        )?;

        info!(
            "room '{}' loaded with {} entit(ies)",
            room_id,
            entities.len()
        );
        self.room_node = Some(room);
        self.current_room = Some(room_id.to_string());
        Ok(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::EngineConfig;
    use crate::engine::events::{EventPhase, ListenerAction};
    use crate::engine::game::Game;
    use crate::engine::providers::{
        AssetError, AssetProvider, Image, ImageHandle, InputEvent, InputSource, StateProvider,
    };
    use crate::engine::scene::{Node, Scene, Surface};
    use glam::vec2;
    use serde_json::json;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    struct NullInput;

    impl InputSource for NullInput {
        fn poll_events(&mut self) -> Vec<InputEvent> {
            Vec::new()
        }
    }

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

    /// State provider over an in-memory JSON tree with dotted paths
    struct MemoryState {
        root: Value,
    }

    impl StateProvider for MemoryState {
        fn get(&self, path: &str, _params: &[Value]) -> Result<Value, StateError> {
            let mut cursor = &self.root;
            for part in path.split('.') {
                cursor = cursor
                    .get(part)
                    .ok_or_else(|| StateError::MissingPath(path.to_string()))?;
            }
            Ok(cursor.clone())
        }

        fn set(&mut self, _value: Value, _path: &str, _params: &[Value]) -> Result<(), StateError> {
            Err(StateError::Locked)
        }
    }

    fn room_ctor(scene: &mut Scene, parent: NodeId, _args: &Value) -> Result<NodeId, EngineError> {
        let surface = Surface::new(ImageHandle::from_key("room_bg"), vec2(100.0, 100.0));
        Ok(scene.add_child(parent, Node::new().with_surface(surface), -10))
    }

    fn crate_ctor(scene: &mut Scene, parent: NodeId, args: &Value) -> Result<NodeId, EngineError> {
        let x = args.get("x").and_then(Value::as_f64).unwrap_or(0.0) as f32;
        let y = args.get("y").and_then(Value::as_f64).unwrap_or(0.0) as f32;
        Ok(scene.add_child(parent, Node::new().with_position(vec2(x, y)), 0))
    }

    fn game_with_rooms() -> Game {
        let state = MemoryState {
            root: json!({
                "rooms": {
                    "cave": {
                        "class": "Room",
                        "entities": [
                            { "class": "Crate", "args": { "x": 48.0, "y": 16.0 } },
                            { "class": "Crate", "args": { "x": 8.0, "y": 8.0 } }
                        ]
                    },
                    "hall": {
                        "class": "Room",
                        "entities": []
                    },
                    "broken": {
                        "class": "NoSuchClass",
                        "entities": []
                    }
                }
            }),
        };

        let mut game = Game::new(
            EngineConfig::new(),
            Box::new(NullInput),
            Box::new(NullAssets),
            Box::new(state),
        );
        game.classes_mut().insert("Room", room_ctor);
        game.classes_mut().insert("Crate", crate_ctor);
        game.create_scene();
        game
    }

    #[test]
    fn test_set_room_builds_entities() {
        let mut game = game_with_rooms();
        let mut loader = RoomLoader::new();

        let room = loader.set_room("cave", game.context().unwrap()).unwrap();

        assert_eq!(loader.current_room(), Some("cave"));
        let scene = game.scene().unwrap();
        let children = scene.node(room).unwrap().children();
        assert_eq!(children.len(), 2);
        assert_eq!(
            scene.node(children[0]).unwrap().position(),
            vec2(48.0, 16.0)
        );
    }

    #[test]
    fn test_room_swap_detaches_previous_room() {
        let mut game = game_with_rooms();
        let mut loader = RoomLoader::new();

        let cave = loader.set_room("cave", game.context().unwrap()).unwrap();
        let hall = loader.set_room("hall", game.context().unwrap()).unwrap();

        let scene = game.scene().unwrap();
        assert!(!scene.contains(cave), "old room subtree is destroyed");
        assert!(scene.contains(hall));
        assert_eq!(scene.node(scene.root()).unwrap().children(), &[hall][..]);
    }

    #[test]
    fn test_room_change_events_surround_the_swap() {
        let mut game = game_with_rooms();
        let mut loader = RoomLoader::new();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        game.events_mut()
            .subscribe(Some(EventKind::RoomChange), move |event| {
                log.borrow_mut().push((event.phase, event.data.clone()));
                ListenerAction::Keep
            });

        loader.set_room("cave", game.context().unwrap()).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                (EventPhase::Before, json!("cave")),
                (EventPhase::After, json!("cave")),
            ]
        );
    }

    #[test]
    fn test_unknown_room_class_fails_before_the_swap() {
        let mut game = game_with_rooms();
        let mut loader = RoomLoader::new();

        loader.set_room("cave", game.context().unwrap()).unwrap();
        let err = loader
            .set_room("broken", game.context().unwrap())
            .unwrap_err();

        assert!(matches!(err, EngineError::UnknownClass(name) if name == "NoSuchClass"));
    }

    #[test]
    fn test_missing_room_is_a_state_error() {
        let mut game = game_with_rooms();
        let mut loader = RoomLoader::new();

        let err = loader
            .set_room("nowhere", game.context().unwrap())
            .unwrap_err();
        assert!(matches!(err, EngineError::State(StateError::MissingPath(_))));
    }
}
