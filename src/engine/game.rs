// Game orchestration
//
// `Game` owns the scheduler, the active scene, the animation library,
// the event handler and the external providers, and runs the
// tick/render cycle: for every real-time sample the scheduler decides
// the work owed, each owed update gets a fresh input snapshot, and a
// render pass paints the scene into the caller's target.

use std::time::Duration;

use log::info;
use serde_json::Value;

use crate::core::Rect;
use crate::engine::animation::AnimationLibrary;
use crate::engine::config::EngineConfig;
use crate::engine::error::EngineError;
use crate::engine::events::{EventKind, GameEventHandler};
use crate::engine::providers::{
    AssetProvider, ClassRegistry, InputSource, RenderTarget, StateProvider,
};
use crate::engine::scene::{Scene, TickContext};
use crate::engine::scheduler::Scheduler;

/// What one `advance` call actually did
#[derive(Debug)]
pub struct FrameReport {
    /// Logical updates run
    pub updates: usize,
    /// Whether a render pass ran
    pub rendered: bool,
    /// Regions invalidated by the render pass, empty when none ran
    pub invalidated: Vec<Rect>,
}

/// Disjoint borrows of the engine parts a collaborator needs at once
/// (room loading reads state, resolves classes, mutates the scene and
/// emits events in a single operation).
pub struct GameContext<'a> {
    pub scene: &'a mut Scene,
    pub state: &'a dyn StateProvider,
    pub classes: &'a ClassRegistry,
    pub events: &'a mut GameEventHandler,
}

/// The running game.
pub struct Game {
    config: EngineConfig,
    scheduler: Scheduler,
    scene: Option<Scene>,
    animations: AnimationLibrary,
    events: GameEventHandler,
    classes: ClassRegistry,
    input: Box<dyn InputSource>,
    assets: Box<dyn AssetProvider>,
    state: Box<dyn StateProvider>,
}

impl Game {
    pub fn new(
        config: EngineConfig,
        input: Box<dyn InputSource>,
        assets: Box<dyn AssetProvider>,
        state: Box<dyn StateProvider>,
    ) -> Self {
        let scheduler = Scheduler::new(config.tick_rate, config.frame_rate);

        Self {
            config,
            scheduler,
            scene: None,
            animations: AnimationLibrary::new(),
            events: GameEventHandler::new(),
            classes: ClassRegistry::new(),
            input,
            assets,
            state,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    pub fn animations(&self) -> &AnimationLibrary {
        &self.animations
    }

    pub fn animations_mut(&mut self) -> &mut AnimationLibrary {
        &mut self.animations
    }

    pub fn events_mut(&mut self) -> &mut GameEventHandler {
        &mut self.events
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        &mut self.classes
    }

    pub fn state(&self) -> &dyn StateProvider {
        self.state.as_ref()
    }

    pub fn state_mut(&mut self) -> &mut dyn StateProvider {
        self.state.as_mut()
    }

    /// Install a scene, replacing the previous one inside a
    /// `SceneChange` event pair
    pub fn set_scene(&mut self, new_scene: Scene) {
        let Game { events, scene, .. } = self;
        events.surround(EventKind::SceneChange, Value::Null, || {
            *scene = Some(new_scene);
        });
    }

    /// Build and install a fresh scene from the engine configuration
    pub fn create_scene(&mut self) {
        let scene = Scene::new(&self.config);
        self.set_scene(scene);
    }

    /// Borrow the parts room loading operates on together. Fails when
    /// no scene is installed.
    pub fn context(&mut self) -> Result<GameContext<'_>, EngineError> {
        let scene = self.scene.as_mut().ok_or(EngineError::NoRoot)?;
        Ok(GameContext {
            scene,
            state: self.state.as_ref(),
            classes: &self.classes,
            events: &mut self.events,
        })
    }

    /// Validate that the game can run. Fails fast when no scene (and
    /// therefore no scene root) is installed.
    pub fn start(&mut self) -> Result<(), EngineError> {
        if self.scene.is_none() {
            return Err(EngineError::NoRoot);
        }

        info!(
            "starting: {} ticks/sec, {} frames/sec (0 = unlimited)",
            self.config.tick_rate, self.config.frame_rate
        );
        Ok(())
    }

    /// Feed one wall-clock delta through the scheduler and run the work
    /// it owes.
    ///
    /// Each owed logical update gets its own input snapshot, polled
    /// immediately before the update runs. The render pass, when due,
    /// paints into `target` and reports the invalidated regions.
    pub fn advance(
        &mut self,
        wall_delta: Duration,
        target: &mut dyn RenderTarget,
    ) -> Result<FrameReport, EngineError> {
        if self.scene.is_none() {
            return Err(EngineError::NoRoot);
        }

        let plan = self.scheduler.advance(wall_delta);
        let updates = plan.ticks.len();

        for step in &plan.ticks {
            let events = self.input.poll_events();
            let ctx = TickContext {
                tick_number: step.number,
                elapsed: step.elapsed,
                events: &events,
            };

            if let Some(scene) = self.scene.as_mut() {
                scene.update(&ctx, &mut self.animations, self.assets.as_mut())?;
            }
        }

        let invalidated = match (plan.render, self.scene.as_mut()) {
            (true, Some(scene)) => scene.render(target),
            _ => Vec::new(),
        };

        Ok(FrameReport {
            updates,
            rendered: plan.render,
            invalidated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::providers::{AssetError, Image, ImageHandle, InputEvent, StateError};
    use std::path::Path;

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

    struct NullState;

    impl StateProvider for NullState {
        fn get(&self, path: &str, _params: &[Value]) -> Result<Value, StateError> {
            Err(StateError::MissingPath(path.to_string()))
        }

        fn set(&mut self, _value: Value, _path: &str, _params: &[Value]) -> Result<(), StateError> {
            Ok(())
        }
    }

    /// Input source that counts how often it gets polled
    struct CountingInput {
        polls: std::rc::Rc<std::cell::RefCell<usize>>,
    }

    impl InputSource for CountingInput {
        fn poll_events(&mut self) -> Vec<InputEvent> {
            *self.polls.borrow_mut() += 1;
            Vec::new()
        }
    }

    struct NullTarget;

    impl RenderTarget for NullTarget {
        fn blit(&mut self, _image: ImageHandle, _region: Rect) {}
    }

    fn game(config: EngineConfig) -> (Game, std::rc::Rc<std::cell::RefCell<usize>>) {
        let polls = std::rc::Rc::new(std::cell::RefCell::new(0));
        let input = CountingInput {
            polls: std::rc::Rc::clone(&polls),
        };
        let game = Game::new(
            config,
            Box::new(input),
            Box::new(NullAssets),
            Box::new(NullState),
        );
        (game, polls)
    }

    #[test]
    fn test_start_without_scene_fails_fast() {
        let (mut game, _) = game(EngineConfig::new());
        assert!(matches!(game.start().unwrap_err(), EngineError::NoRoot));

        game.create_scene();
        assert!(game.start().is_ok());
    }

    #[test]
    fn test_advance_without_scene_fails() {
        let (mut game, _) = game(EngineConfig::new());
        let err = game
            .advance(Duration::from_millis(10), &mut NullTarget)
            .unwrap_err();
        assert!(matches!(err, EngineError::NoRoot));
    }

    #[test]
    fn test_input_polled_once_per_update() {
        let (mut game, polls) = game(EngineConfig::new().with_tick_rate(50));
        game.create_scene();

        // 45ms at 20ms per tick: two updates, two polls
        let report = game
            .advance(Duration::from_millis(45), &mut NullTarget)
            .unwrap();
        assert_eq!(report.updates, 2);
        assert_eq!(*polls.borrow(), 2);

        // Not enough accumulated for an update: no poll either
        let report = game
            .advance(Duration::from_millis(5), &mut NullTarget)
            .unwrap();
        assert_eq!(report.updates, 0);
        assert_eq!(*polls.borrow(), 2);
    }

    #[test]
    fn test_render_gating() {
        // 100 fps render, unlimited ticks
        let (mut game, _) = game(EngineConfig::new().with_frame_rate(100));
        game.create_scene();

        let report = game
            .advance(Duration::from_millis(25), &mut NullTarget)
            .unwrap();
        assert!(report.rendered);

        let report = game
            .advance(Duration::from_millis(5), &mut NullTarget)
            .unwrap();
        assert!(!report.rendered);
    }

    #[test]
    fn test_set_scene_emits_scene_change() {
        use crate::engine::events::{EventPhase, ListenerAction};
        use std::cell::RefCell;
        use std::rc::Rc;

        let (mut game, _) = game(EngineConfig::new());

        let phases = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&phases);
        game.events_mut()
            .subscribe(Some(EventKind::SceneChange), move |event| {
                log.borrow_mut().push(event.phase);
                ListenerAction::Keep
            });

        game.create_scene();
        assert_eq!(*phases.borrow(), vec![EventPhase::Before, EventPhase::After]);
    }
}
