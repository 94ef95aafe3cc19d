//! The engine and its frame loop.
//!
//! [`Engine`] owns every scene, the camera, the pause flag and the engine's
//! own hooks. [`Engine::frame`] runs one frame:
//!
//! 1. Pending display changes (size, fullscreen) reach the renderer.
//! 2. Each input event is handled: quit and `escape` stop the loop, pointer
//!    motion updates the cached pointer, presses reach every entity under the
//!    pointer, then category handlers fan out (see [`router`](crate::router)).
//! 3. `delta_time` and `elapsed` advance.
//! 4. The background is cleared.
//! 5. Engine `update`/`draw` hooks run, ungated.
//! 6. Active-scene `update`/`draw` hooks run if the scene is pause-eligible.
//! 7. Each entity, in z-order: if active and pause-eligible, the collision
//!    pass and `update`; then, if visible, the placement draw and `draw`.
//! 8. A camera zoom other than 1 is composed onto the frame.
//! 9. Requested screenshots are written and the frame is presented.
//!
//! Hooks never mutate the engine directly. They queue
//! [`EngineCommand`]s, which are applied in FIFO order after each event's
//! fan-out, after the engine hooks, after the scene hooks and after the
//! entity pass.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde_json::Value;
use tessel_scene::camera::Camera;
use tessel_scene::command::{CommandBuffer, EngineCommand};
use tessel_scene::context::{Canvas, Context, FrameInfo, Pointer, Siblings};
use tessel_scene::entity::{Entity, Layer};
use tessel_scene::event::{EventCategory, InputEvent};
use tessel_scene::geometry::is_colliding;
use tessel_scene::hooks::{with_hooks, HookResult, Hooks};
use tessel_scene::render::{ImageHandle, Renderer};
use tessel_scene::scene::Scene;
use tessel_scene::{SceneError, Vars};

use crate::clock::{frame_budget, Clock};
use crate::config::EngineConfig;
use crate::error::{in_phase, EngineError, EngineResult};
use crate::input::InputSource;
use crate::router::{self, pause_eligible, Broadcast, Targets};
use crate::screenshot::save_screenshot;

// ---------------------------------------------------------------------------
// LoopState
// ---------------------------------------------------------------------------

/// Whether [`Engine::run`] keeps iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Wall-clock time per phase, in execution order.
    pub phase_times: Vec<(&'static str, Duration)>,
    /// Total time for the frame, including command application.
    pub total_time: Duration,
    /// Time spent applying queued commands.
    pub command_apply_time: Duration,
    /// Input events dispatched.
    pub events: usize,
    /// Commands applied.
    pub commands_applied: usize,
}

#[derive(Debug, Default)]
struct PendingDisplay {
    size: Option<(u32, u32)>,
    fullscreen: Option<bool>,
}

fn missing_active(name: &str) -> EngineError {
    EngineError::config(format!("active scene '{name}' is not registered"))
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Top-level owner of scenes, camera and the frame loop.
pub struct Engine {
    config: EngineConfig,
    scenes: BTreeMap<String, Scene>,
    camera: Camera,
    /// Per-frame state shared with hooks. Holds the pause flag, pointer,
    /// viewport and active scene name.
    frame: FrameInfo,
    commands: CommandBuffer,
    hooks: Hooks<Vars>,
    vars: Vars,
    state: LoopState,
    loaded: bool,
    fullscreen: bool,
    cursor_visible: bool,
    icon: Option<ImageHandle>,
    pending_display: PendingDisplay,
    pending_screenshots: Vec<Option<PathBuf>>,
    screenshots: Vec<PathBuf>,
    start_time: Option<Duration>,
    last_tick: Option<Duration>,
    diagnostics: FrameDiagnostics,
    command_count: usize,
    command_time: Duration,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("title", &self.config.title)
            .field("state", &self.state)
            .field("frame", &self.frame)
            .field("scenes", &self.scene_names())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Build an engine with an empty scene registered and activated under
    /// `config.default_scene`.
    ///
    /// # Errors
    ///
    /// Whatever [`EngineConfig::validate`] reports.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let viewport = (config.width, config.height);
        let camera = Camera::new(
            config.camera.clone(),
            (f64::from(config.width), f64::from(config.height)),
        )?;
        let frame = FrameInfo {
            viewport,
            active_scene: config.default_scene.clone(),
            ..Default::default()
        };
        let default_scene = config.default_scene.clone();
        let mut engine = Self {
            cursor_visible: config.cursor_visible,
            config,
            scenes: BTreeMap::new(),
            camera,
            frame,
            commands: CommandBuffer::new(),
            hooks: Hooks::new(),
            vars: Vars::new(),
            state: LoopState::Stopped,
            loaded: false,
            fullscreen: false,
            icon: None,
            pending_display: PendingDisplay::default(),
            pending_screenshots: Vec::new(),
            screenshots: Vec::new(),
            start_time: None,
            last_tick: None,
            diagnostics: FrameDiagnostics::default(),
            command_count: 0,
            command_time: Duration::ZERO,
        };
        engine.set_scene(default_scene, Scene::new())?;
        Ok(engine)
    }

    // -- engine hooks -------------------------------------------------------

    /// Fired once, by the first [`start`](Self::start).
    pub fn on_load(&mut self, hook: impl FnMut(&mut Vars, &mut Context<'_>) -> HookResult + 'static) -> &mut Self {
        self.hooks.set_on_load(hook);
        self
    }

    /// Runs every frame, paused or not.
    pub fn on_update(&mut self, hook: impl FnMut(&mut Vars, &mut Context<'_>) -> HookResult + 'static) -> &mut Self {
        self.hooks.set_update(hook);
        self
    }

    /// Draws every frame, before the active scene.
    pub fn on_draw(&mut self, hook: impl FnMut(&Vars, &mut Canvas<'_>) -> HookResult + 'static) -> &mut Self {
        self.hooks.set_draw(hook);
        self
    }

    pub fn on_pause(
        &mut self,
        hook: impl FnMut(&mut Vars, bool, &mut Context<'_>) -> HookResult + 'static,
    ) -> &mut Self {
        self.hooks.set_on_pause(hook);
        self
    }

    pub fn on_event(
        &mut self,
        category: EventCategory,
        hook: impl FnMut(&mut Vars, &InputEvent, &mut Context<'_>) -> HookResult + 'static,
    ) -> &mut Self {
        self.hooks.set_event(category, hook);
        self
    }

    pub fn on_custom(
        &mut self,
        name: impl Into<String>,
        hook: impl FnMut(&mut Vars, Option<&Value>, &mut Context<'_>) -> HookResult + 'static,
    ) -> &mut Self {
        self.hooks.set_custom(name, hook);
        self
    }

    // -- scenes -------------------------------------------------------------

    /// Register `scene` as `name`, replacing any scene of that name, and fire
    /// its `on_load`.
    pub fn add_scene(&mut self, name: impl Into<String>, mut scene: Scene) -> EngineResult<()> {
        let name = name.into();
        scene.bind(name.clone());
        let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
        let loaded = scene.load(&mut ctx).map_err(in_phase("on_load"));
        tracing::debug!(scene = %name, entities = scene.len(), "scene added");
        self.scenes.insert(name, scene);
        loaded?;
        self.apply_commands()
    }

    /// Make `name` the active scene.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] if no scene has that name.
    pub fn change_scene(&mut self, name: &str) -> EngineResult<()> {
        if !self.scenes.contains_key(name) {
            return Err(EngineError::config(format!(
                "cannot activate scene '{name}': not registered"
            )));
        }
        if self.frame.active_scene != name {
            tracing::info!(from = %self.frame.active_scene, to = %name, "scene changed");
            self.frame.active_scene = name.to_owned();
        }
        Ok(())
    }

    /// [`add_scene`](Self::add_scene) then [`change_scene`](Self::change_scene).
    pub fn set_scene(&mut self, name: impl Into<String>, scene: Scene) -> EngineResult<()> {
        let name = name.into();
        self.add_scene(name.clone(), scene)?;
        self.change_scene(&name)
    }

    /// Unregister and return the scene `name`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] for the active scene,
    /// [`SceneError::NotFound`] for an unknown name.
    pub fn remove_scene(&mut self, name: &str) -> EngineResult<Scene> {
        if self.frame.active_scene == name {
            return Err(EngineError::config(format!(
                "cannot remove the active scene '{name}'"
            )));
        }
        let scene = self
            .scenes
            .remove(name)
            .ok_or_else(|| SceneError::not_found("scene", name))?;
        tracing::debug!(scene = %name, "scene removed");
        Ok(scene)
    }

    pub fn active_scene_name(&self) -> &str {
        &self.frame.active_scene
    }

    /// # Errors
    ///
    /// [`EngineError::Configuration`] if the active scene is not registered.
    pub fn active_scene(&self) -> EngineResult<&Scene> {
        self.scenes
            .get(&self.frame.active_scene)
            .ok_or_else(|| missing_active(&self.frame.active_scene))
    }

    /// # Errors
    ///
    /// [`EngineError::Configuration`] if the active scene is not registered.
    pub fn active_scene_mut(&mut self) -> EngineResult<&mut Scene> {
        self.scenes
            .get_mut(&self.frame.active_scene)
            .ok_or_else(|| missing_active(&self.frame.active_scene))
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        self.scenes.get_mut(name)
    }

    /// Registered scene names, sorted.
    pub fn scene_names(&self) -> Vec<&str> {
        self.scenes.keys().map(String::as_str).collect()
    }

    // -- entities -----------------------------------------------------------

    /// Register `entity` as `name` in the scene `scene` and fire its
    /// `on_load`.
    ///
    /// Before the engine first starts this is level setup: the entity joins
    /// the scene's reset roster. Entities added later are dropped by
    /// [`reset_scene`](Self::reset_scene).
    ///
    /// # Errors
    ///
    /// [`SceneError::NotFound`] for an unknown scene; [`EngineError::Hook`]
    /// if `on_load` fails.
    pub fn add_entity(&mut self, scene: &str, name: impl Into<String>, entity: Entity) -> EngineResult<()> {
        let name = name.into();
        if !self.loaded {
            if let Some(target) = self.scenes.get_mut(scene) {
                target.keep_on_reset(name.clone());
            }
        }
        self.insert_entity(scene, name, entity)
    }

    fn insert_entity(&mut self, scene: &str, name: String, entity: Entity) -> EngineResult<()> {
        let target = self
            .scenes
            .get_mut(scene)
            .ok_or_else(|| SceneError::not_found("scene", scene))?;
        let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
        target.add_entity(name, entity, &mut ctx).map_err(in_phase("on_load"))?;
        self.apply_commands()
    }

    /// Register `entity` in the active scene under a generated name.
    pub fn spawn(&mut self, entity: Entity) -> EngineResult<String> {
        let scene = self.frame.active_scene.clone();
        self.spawn_into(&scene, entity)
    }

    fn spawn_into(&mut self, scene: &str, entity: Entity) -> EngineResult<String> {
        let target = self
            .scenes
            .get_mut(scene)
            .ok_or_else(|| SceneError::not_found("scene", scene))?;
        let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
        let name = target
            .add_anonymous_entity(entity, &mut ctx)
            .map_err(in_phase("on_load"))?;
        self.apply_commands()?;
        Ok(name)
    }

    /// Detach and return an entity of the active scene.
    pub fn remove_entity(&mut self, name: &str) -> EngineResult<Entity> {
        Ok(self.active_scene_mut()?.remove_entity(name)?)
    }

    /// Reset the active scene: its state and roster, its `on_load`, then
    /// every roster entity.
    pub fn reset_scene(&mut self) -> EngineResult<()> {
        let scene = self
            .scenes
            .get_mut(&self.frame.active_scene)
            .ok_or_else(|| missing_active(&self.frame.active_scene))?;
        let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
        scene.reset(&mut ctx).map_err(in_phase("on_load"))?;
        tracing::info!(scene = %self.frame.active_scene, "scene reset");
        self.apply_commands()
    }

    /// Reset one entity of the active scene to its snapshot.
    pub fn reset_entity(&mut self, name: &str) -> EngineResult<()> {
        let scene = self
            .scenes
            .get_mut(&self.frame.active_scene)
            .ok_or_else(|| missing_active(&self.frame.active_scene))?;
        let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
        scene
            .entity_mut(name)?
            .reset(&mut ctx)
            .map_err(in_phase("on_load"))?;
        scene.sort_if_needed();
        self.apply_commands()
    }

    // -- pause & custom events ----------------------------------------------

    /// Set the pause flag, then notify `on_pause` hooks: engine, active scene
    /// (if it ignores pause or the engine is unpausing), then each eligible
    /// entity in z-order.
    pub fn set_pause(&mut self, paused: bool) -> EngineResult<()> {
        self.frame.paused = paused;
        tracing::info!(paused, "pause changed");
        self.broadcast(Broadcast::Pause(paused))?;
        self.apply_commands()
    }

    pub fn toggle_pause(&mut self) -> EngineResult<()> {
        self.set_pause(!self.frame.paused)
    }

    pub fn paused(&self) -> bool {
        self.frame.paused
    }

    /// Fan a named event out to the engine, active scene and entities, each
    /// level gated like pause notifications.
    pub fn custom_event(&mut self, name: &str, payload: Option<&Value>) -> EngineResult<()> {
        tracing::debug!(event = %name, "custom event");
        self.broadcast(Broadcast::Custom { name, payload })?;
        self.apply_commands()
    }

    fn broadcast(&mut self, message: Broadcast<'_>) -> EngineResult<()> {
        let scene = self
            .scenes
            .get_mut(&self.frame.active_scene)
            .ok_or_else(|| missing_active(&self.frame.active_scene))?;
        let targets = Targets {
            hooks: &mut self.hooks,
            vars: &mut self.vars,
            scene,
        };
        let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
        router::broadcast(message, targets, &mut ctx)
    }

    // -- display ------------------------------------------------------------

    /// # Errors
    ///
    /// [`SceneError::InvalidArgument`] for zero.
    pub fn set_fps(&mut self, fps: u32) -> EngineResult<()> {
        if fps == 0 {
            return Err(SceneError::InvalidArgument("fps must be positive".to_owned()).into());
        }
        self.config.fps = fps;
        Ok(())
    }

    pub fn fps(&self) -> u32 {
        self.config.fps
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.config.title = title.into();
    }

    pub fn title(&self) -> &str {
        &self.config.title
    }

    /// Resize the window. The camera viewport changes immediately; the
    /// renderer is resized at the start of the next frame.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidArgument`] for a zero side.
    pub fn set_size(&mut self, width: u32, height: u32) -> EngineResult<()> {
        if width == 0 || height == 0 {
            return Err(SceneError::InvalidArgument(format!(
                "window size must be non-zero, got {width}x{height}"
            ))
            .into());
        }
        self.apply_size(width, height);
        self.pending_display.size = Some((width, height));
        Ok(())
    }

    fn apply_size(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
        self.frame.viewport = (width, height);
        self.camera.set_viewport(f64::from(width), f64::from(height));
    }

    pub fn size(&self) -> (u32, u32) {
        self.frame.viewport
    }

    /// Applied to the renderer at the start of the next frame.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
        self.pending_display.fullscreen = Some(fullscreen);
    }

    pub fn toggle_fullscreen(&mut self) {
        self.set_fullscreen(!self.fullscreen);
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
    }

    pub fn toggle_cursor_visible(&mut self) {
        self.cursor_visible = !self.cursor_visible;
    }

    pub fn hide_cursor(&mut self) {
        self.cursor_visible = false;
    }

    pub fn show_cursor(&mut self) {
        self.cursor_visible = true;
    }

    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// Window icon for hosts that support one.
    pub fn set_icon(&mut self, icon: ImageHandle) {
        self.icon = Some(icon);
    }

    pub fn icon(&self) -> Option<&ImageHandle> {
        self.icon.as_ref()
    }

    fn apply_display(&mut self, renderer: &mut dyn Renderer) {
        if let Some((width, height)) = self.pending_display.size.take() {
            tracing::debug!(width, height, "resizing renderer");
            renderer.resize(width, height);
        }
        if let Some(fullscreen) = self.pending_display.fullscreen.take() {
            tracing::debug!(fullscreen, "switching fullscreen");
            renderer.set_fullscreen(fullscreen);
        }
    }

    // -- screenshots --------------------------------------------------------

    /// Capture the renderer's current frame into `folder` (or the configured
    /// screenshot folder) and return the written path.
    pub fn screenshot(&mut self, renderer: &mut dyn Renderer, folder: Option<&Path>) -> EngineResult<PathBuf> {
        let folder = folder.map_or_else(|| self.config.screenshot_dir.clone(), Path::to_path_buf);
        let path = save_screenshot(renderer, &self.config.title, &folder)?;
        self.screenshots.push(path.clone());
        Ok(path)
    }

    /// Every screenshot written so far, oldest first.
    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    // -- accessors ----------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut Vars {
        &mut self.vars
    }

    pub fn frame_info(&self) -> &FrameInfo {
        &self.frame
    }

    pub fn pointer(&self) -> Pointer {
        self.frame.pointer
    }

    /// Seconds between the last two frames.
    pub fn delta_time(&self) -> f64 {
        self.frame.delta_time
    }

    /// Seconds since the first frame.
    pub fn elapsed(&self) -> f64 {
        self.frame.elapsed
    }

    /// Frames completed.
    pub fn frame_count(&self) -> u64 {
        self.frame.frame
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.diagnostics
    }

    // -- commands -----------------------------------------------------------

    /// Queue a command as if a hook had issued it. Applied at the next phase
    /// boundary.
    pub fn queue(&mut self, command: EngineCommand) {
        self.commands.push(command);
    }

    /// Drain the command buffer in FIFO order. Commands queued while applying
    /// are drained too.
    fn apply_commands(&mut self) -> EngineResult<()> {
        let started = Instant::now();
        while let Some(command) = self.commands.pop() {
            self.command_count += 1;
            self.apply(command)?;
        }
        if let Some(scene) = self.scenes.get_mut(&self.frame.active_scene) {
            scene.sort_if_needed();
        }
        self.command_time += started.elapsed();
        Ok(())
    }

    fn apply(&mut self, command: EngineCommand) -> EngineResult<()> {
        tracing::trace!(?command, "applying command");
        match command {
            EngineCommand::Stop => self.stop(),
            EngineCommand::SetPause(paused) => self.set_pause(paused)?,
            EngineCommand::TogglePause => self.toggle_pause()?,
            EngineCommand::ChangeScene(name) => self.change_scene(&name)?,
            EngineCommand::ResetScene => self.reset_scene()?,
            EngineCommand::ResetEntity(name) => match self.reset_entity(&name) {
                Err(EngineError::Scene(err @ SceneError::NotFound { .. })) => {
                    tracing::warn!(entity = %name, %err, "reset requested for missing entity");
                }
                other => other?,
            },
            EngineCommand::Spawn { scene, name, entity } => {
                let scene = scene.unwrap_or_else(|| self.frame.active_scene.clone());
                match name {
                    Some(name) => self.insert_entity(&scene, name, *entity)?,
                    None => {
                        self.spawn_into(&scene, *entity)?;
                    }
                }
            }
            EngineCommand::Despawn(name) => {
                if let Err(err) = self.remove_entity(&name) {
                    tracing::debug!(entity = %name, %err, "despawn of missing entity ignored");
                }
            }
            EngineCommand::Custom { name, payload } => self.custom_event(&name, payload.as_ref())?,
            EngineCommand::SetFps(fps) => self.set_fps(fps)?,
            EngineCommand::SetTitle(title) => self.set_title(title),
            EngineCommand::SetFullscreen(fullscreen) => self.set_fullscreen(fullscreen),
            EngineCommand::ToggleFullscreen => self.toggle_fullscreen(),
            EngineCommand::SetCursorVisible(visible) => self.set_cursor_visible(visible),
            EngineCommand::Screenshot(folder) => self.pending_screenshots.push(folder),
        }
        Ok(())
    }

    // -- loop ---------------------------------------------------------------

    /// Validate the active scene and enter [`LoopState::Running`]. The
    /// engine `on_load` hook fires on the first start only.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] if the active scene is missing.
    pub fn start(&mut self) -> EngineResult<()> {
        if !self.scenes.contains_key(&self.frame.active_scene) {
            return Err(missing_active(&self.frame.active_scene));
        }
        if self.state == LoopState::Running {
            return Ok(());
        }
        self.state = LoopState::Running;
        tracing::info!(title = %self.config.title, scene = %self.frame.active_scene, "engine started");
        if !self.loaded {
            self.loaded = true;
            let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
            self.hooks
                .fire_load(&mut self.vars, &mut ctx)
                .map_err(in_phase("on_load"))?;
            self.apply_commands()?;
        }
        Ok(())
    }

    /// Ask the loop to stop. The current frame completes; [`run`](Self::run)
    /// returns before the next one.
    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            tracing::info!(frame = self.frame.frame, "stop requested");
        }
        self.state = LoopState::Stopped;
    }

    /// Start, then run frames until stopped.
    ///
    /// Each iteration polls `input` once, runs [`frame`](Self::frame) with
    /// the clock's timestamp and, unless the engine is headless, waits out
    /// the rest of the frame budget.
    ///
    /// # Errors
    ///
    /// The first error raised by a frame; the engine is stopped.
    pub fn run(
        &mut self,
        input: &mut dyn InputSource,
        renderer: &mut dyn Renderer,
        clock: &mut dyn Clock,
    ) -> EngineResult<()> {
        self.start()?;
        while self.is_running() {
            let events = input.poll();
            let started = clock.frame_start();
            if let Err(err) = self.frame(events, renderer, started) {
                self.state = LoopState::Stopped;
                tracing::error!(frame = self.frame.frame, %err, "frame failed, stopping");
                return Err(err);
            }
            if !self.config.headless {
                clock.wait_out(started, frame_budget(self.config.fps));
            }
        }
        tracing::info!(frames = self.frame.frame, "engine stopped");
        Ok(())
    }

    /// Run one frame at time `now`, without any frame-budget wait.
    ///
    /// Starts the engine first if it has never been started.
    pub fn frame(
        &mut self,
        events: Vec<InputEvent>,
        renderer: &mut dyn Renderer,
        now: Duration,
    ) -> EngineResult<()> {
        if !self.loaded {
            self.start()?;
        }
        let frame_start = Instant::now();
        let mut phase_times = Vec::with_capacity(6);
        self.command_count = 0;
        self.command_time = Duration::ZERO;

        self.apply_display(renderer);
        renderer.begin_frame();

        // Events.
        let phase_start = Instant::now();
        for event in &events {
            self.handle_event(event)?;
            self.apply_commands()?;
        }
        phase_times.push(("events", phase_start.elapsed()));

        // Time.
        let delta = self.last_tick.map_or(Duration::ZERO, |prev| now.saturating_sub(prev));
        self.last_tick = Some(now);
        let start_time = *self.start_time.get_or_insert(now);
        self.frame.delta_time = delta.as_secs_f64();
        self.frame.elapsed = now.saturating_sub(start_time).as_secs_f64();

        // Background.
        let zoomed = self.camera.zoom() != 1.0;
        if zoomed {
            renderer.clear(self.config.background, 255);
        }
        if !self.frame.paused || self.config.fill_on_pause {
            renderer.clear(self.config.background, self.config.background_alpha);
        }

        // Engine hooks.
        let phase_start = Instant::now();
        {
            let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
            self.hooks
                .fire_update(&mut self.vars, &mut ctx)
                .map_err(in_phase("update"))?;
        }
        {
            let mut canvas = Canvas::new(&mut *renderer, &self.camera, &self.frame);
            self.hooks
                .fire_draw(&self.vars, &mut canvas)
                .map_err(in_phase("draw"))?;
        }
        self.apply_commands()?;
        phase_times.push(("engine_hooks", phase_start.elapsed()));

        // Scene hooks.
        let phase_start = Instant::now();
        self.scene_pass(renderer)?;
        self.apply_commands()?;
        phase_times.push(("scene_hooks", phase_start.elapsed()));

        // Entities.
        let phase_start = Instant::now();
        {
            let scene = self
                .scenes
                .get_mut(&self.frame.active_scene)
                .ok_or_else(|| missing_active(&self.frame.active_scene))?;
            entity_pass(
                scene.entities_mut(),
                &self.frame,
                &mut self.camera,
                &mut self.commands,
                renderer,
            )?;
        }
        self.apply_commands()?;
        phase_times.push(("entities", phase_start.elapsed()));

        // Zoom.
        let zoom = self.camera.zoom();
        if zoom != 1.0 {
            let phase_start = Instant::now();
            renderer.compose_zoom(zoom, self.config.background);
            phase_times.push(("zoom", phase_start.elapsed()));
        }

        for folder in std::mem::take(&mut self.pending_screenshots) {
            let path = self.screenshot(renderer, folder.as_deref())?;
            tracing::info!(path = %path.display(), "screenshot written");
        }

        let phase_start = Instant::now();
        renderer.present();
        phase_times.push(("present", phase_start.elapsed()));

        self.frame.frame += 1;
        self.diagnostics = FrameDiagnostics {
            phase_times,
            total_time: frame_start.elapsed(),
            command_apply_time: self.command_time,
            events: events.len(),
            commands_applied: self.command_count,
        };
        tracing::debug!(
            frame = self.frame.frame,
            events = events.len(),
            commands = self.command_count,
            total_us = self.diagnostics.total_time.as_micros() as u64,
            "frame complete"
        );
        Ok(())
    }

    fn handle_event(&mut self, event: &InputEvent) -> EngineResult<()> {
        match event.category {
            EventCategory::Quit => {
                tracing::info!("quit event received");
                self.stop();
            }
            EventCategory::KeyDown if self.config.quit_on_escape && event.is_key_down("escape") => {
                tracing::info!("escape pressed, quitting");
                self.stop();
            }
            EventCategory::PointerMove => {
                if let Some((x, y)) = event.position {
                    let (cx, cy) = self.camera.offset();
                    self.frame.pointer = Pointer {
                        screen: (x, y),
                        world: (x + cx, y + cy),
                    };
                }
            }
            EventCategory::Resize => {
                if let Some((width, height)) = event.size.filter(|&(w, h)| w > 0 && h > 0) {
                    self.apply_size(width, height);
                    self.pending_display.size = Some((width, height));
                }
            }
            _ => {}
        }

        let scene = self
            .scenes
            .get_mut(&self.frame.active_scene)
            .ok_or_else(|| missing_active(&self.frame.active_scene))?;
        let targets = Targets {
            hooks: &mut self.hooks,
            vars: &mut self.vars,
            scene,
        };
        let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
        router::dispatch_input(event, targets, &mut ctx)
    }

    fn scene_pass(&mut self, renderer: &mut dyn Renderer) -> EngineResult<()> {
        let scene = self
            .scenes
            .get_mut(&self.frame.active_scene)
            .ok_or_else(|| missing_active(&self.frame.active_scene))?;
        if !pause_eligible(scene.ignore_pause(), self.frame.paused) {
            return Ok(());
        }
        {
            let mut ctx = Context::new(&self.frame, &mut self.camera, &mut self.commands);
            with_hooks(scene, |hooks, scene| hooks.fire_update(scene, &mut ctx))
                .map_err(in_phase("update"))?;
        }
        let mut canvas = Canvas::new(renderer, &self.camera, &self.frame);
        with_hooks(scene, |hooks, scene| hooks.fire_draw(scene, &mut canvas)).map_err(in_phase("draw"))
    }
}

// ---------------------------------------------------------------------------
// Entity pass
// ---------------------------------------------------------------------------

fn eligible(entity: &Entity, paused: bool) -> bool {
    let props = entity.props();
    props.active && pause_eligible(props.ignore_pause, paused)
}

/// Two distinct mutable entries of one slice.
fn pair_mut(entities: &mut [Entity], i: usize, j: usize) -> (&mut Entity, &mut Entity) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = entities.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = entities.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

fn entity_pass(
    entities: &mut [Entity],
    frame: &FrameInfo,
    camera: &mut Camera,
    commands: &mut CommandBuffer,
    renderer: &mut dyn Renderer,
) -> EngineResult<()> {
    let paused = frame.paused;
    for i in 0..entities.len() {
        if eligible(&entities[i], paused) {
            collide(entities, i, paused, &mut Context::new(frame, camera, commands))?;
            let (before, rest) = entities.split_at_mut(i);
            if let Some((entity, after)) = rest.split_first_mut() {
                let mut ctx =
                    Context::new(frame, camera, commands).with_siblings(Siblings::new(before, after));
                with_hooks(entity, |hooks, entity| hooks.fire_update(entity, &mut ctx))
                    .map_err(in_phase("update"))?;
            }
        }
        if entities[i].props().visible {
            draw_entity(&mut entities[i], &mut *renderer, camera, frame)?;
        }
    }
    Ok(())
}

/// Notify every overlapping pair involving entity `i`.
///
/// `i`'s own hook fires for each overlap; the other entity's fires only if
/// it is pause-eligible. A pair is notified once per frame: when the other
/// entity precedes `i` and was itself eligible, the pair was already handled
/// on its turn.
fn collide(entities: &mut [Entity], i: usize, paused: bool, ctx: &mut Context<'_>) -> EngineResult<()> {
    for j in 0..entities.len() {
        if j == i {
            continue;
        }
        let (a, b) = pair_mut(entities, i, j);
        if !b.props().active || a.props().gui || b.props().gui || a.id() == b.id() {
            continue;
        }
        let b_eligible = pause_eligible(b.props().ignore_pause, paused);
        if j < i && b_eligible {
            continue;
        }
        if !is_colliding(&a.rect(), &b.rect()) {
            continue;
        }
        tracing::trace!(a = %a.id(), b = %b.id(), "collision");
        with_hooks(&mut *a, |hooks, this| hooks.fire_collide(this, &*b, ctx)).map_err(in_phase("on_collide"))?;
        if b_eligible {
            with_hooks(&mut *b, |hooks, this| hooks.fire_collide(this, &*a, ctx))
                .map_err(in_phase("on_collide"))?;
        }
    }
    Ok(())
}

fn draw_entity(
    entity: &mut Entity,
    renderer: &mut dyn Renderer,
    camera: &Camera,
    frame: &FrameInfo,
) -> EngineResult<()> {
    let props = entity.props();
    renderer.draw_rect(&entity.render_placement(camera), props.color, props.alpha);
    match &props.layer {
        Layer::Image(image) => {
            if let Some(placement) = entity.image_placement(camera) {
                renderer.draw_image(&placement, &image.handle, image.alpha);
            }
        }
        Layer::Text(text) => {
            if let Some(placement) = entity.text_placement(camera) {
                renderer.draw_text(&placement, &text.text, &text.font(), text.font_color, text.font_alpha);
            }
        }
        Layer::None => {}
    }
    let mut canvas = Canvas::new(renderer, camera, frame);
    with_hooks(entity, |hooks, this| hooks.fire_draw(this, &mut canvas)).map_err(in_phase("draw"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
