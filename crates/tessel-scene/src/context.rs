//! What a hook can see and touch while it runs.
//!
//! Logic hooks (`on_load`, `update`, event handlers, ...) receive a
//! [`Context`]: a read-only [`FrameInfo`], the camera, and the command buffer
//! for deferred engine mutations. Entity `update` hooks can also read the
//! other entities of the scene through [`Siblings`]. Draw hooks receive a
//! [`Canvas`] instead, which exposes the renderer.

use std::path::PathBuf;

use crate::camera::Camera;
use crate::command::{CommandBuffer, EngineCommand};
use crate::entity::Entity;
use crate::render::Renderer;

/// The single pause gate used throughout dispatch.
///
/// An owner runs while unpaused, or while paused if it ignores pause.
#[inline]
pub fn pause_eligible(ignore_pause: bool, paused: bool) -> bool {
    !paused || ignore_pause
}

// ---------------------------------------------------------------------------
// FrameInfo
// ---------------------------------------------------------------------------

/// Last known pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pointer {
    /// Window coordinates, unaffected by the camera.
    pub screen: (f64, f64),
    /// `screen` plus the camera offset at the time of the motion event.
    pub world: (f64, f64),
}

/// Engine state visible to hooks for the current frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    /// Frames completed before this one.
    pub frame: u64,
    pub paused: bool,
    /// Seconds since the previous frame.
    pub delta_time: f64,
    /// Seconds since the loop started.
    pub elapsed: f64,
    pub pointer: Pointer,
    /// Window size in pixels.
    pub viewport: (u32, u32),
    pub active_scene: String,
}

impl Default for FrameInfo {
    fn default() -> Self {
        Self {
            frame: 0,
            paused: false,
            delta_time: 0.0,
            elapsed: 0.0,
            pointer: Pointer::default(),
            viewport: (640, 480),
            active_scene: "default".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Siblings
// ---------------------------------------------------------------------------

/// Read-only view of the scene's other entities, in z-order, around the
/// entity whose hook is running.
#[derive(Clone, Copy, Default)]
pub struct Siblings<'a> {
    before: &'a [Entity],
    after: &'a [Entity],
}

impl<'a> Siblings<'a> {
    /// Entities preceding and following the running one.
    pub fn new(before: &'a [Entity], after: &'a [Entity]) -> Self {
        Self { before, after }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Entity> {
        self.before.iter().chain(self.after)
    }

    pub fn get(&self, name: &str) -> Option<&'a Entity> {
        self.iter().find(|entity| entity.name() == Some(name))
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&'a Entity> {
        self.iter().filter(|entity| entity.has_tag(tag)).collect()
    }

    pub fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Handle passed to every logic hook.
pub struct Context<'a> {
    frame: &'a FrameInfo,
    camera: &'a mut Camera,
    commands: &'a mut CommandBuffer,
    siblings: Siblings<'a>,
}

impl<'a> Context<'a> {
    pub fn new(
        frame: &'a FrameInfo,
        camera: &'a mut Camera,
        commands: &'a mut CommandBuffer,
    ) -> Self {
        Self {
            frame,
            camera,
            commands,
            siblings: Siblings::default(),
        }
    }

    /// Give the hook read access to the rest of the scene.
    pub fn with_siblings(mut self, siblings: Siblings<'a>) -> Self {
        self.siblings = siblings;
        self
    }

    /// A shorter-lived context over the same state.
    pub fn reborrow(&mut self) -> Context<'_> {
        Context {
            frame: self.frame,
            camera: &mut *self.camera,
            commands: &mut *self.commands,
            siblings: self.siblings,
        }
    }

    pub fn frame(&self) -> &FrameInfo {
        self.frame
    }

    pub fn paused(&self) -> bool {
        self.frame.paused
    }

    pub fn delta_time(&self) -> f64 {
        self.frame.delta_time
    }

    pub fn pointer(&self) -> Pointer {
        self.frame.pointer
    }

    pub fn camera(&self) -> &Camera {
        self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut *self.camera
    }

    pub fn commands(&mut self) -> &mut CommandBuffer {
        &mut *self.commands
    }

    // -- scene lookup -------------------------------------------------------

    /// The other entities of the active scene. Only entity `update` hooks
    /// see them; every other hook gets an empty view.
    pub fn siblings(&self) -> Siblings<'a> {
        self.siblings
    }

    /// Another entity of the active scene, as it is at this point of the
    /// entity pass.
    pub fn entity(&self, name: &str) -> Option<&'a Entity> {
        self.siblings.get(name)
    }

    pub fn entities_by_tag(&self, tag: &str) -> Vec<&'a Entity> {
        self.siblings.by_tag(tag)
    }

    // -- command shortcuts --------------------------------------------------

    pub fn stop(&mut self) {
        self.commands.push(EngineCommand::Stop);
    }

    /// Queue a pause change. It applies at the next phase boundary, so
    /// entities later in the current entity pass still update this frame.
    pub fn set_pause(&mut self, paused: bool) {
        self.commands.push(EngineCommand::SetPause(paused));
    }

    /// Deferred like [`set_pause`](Self::set_pause).
    pub fn toggle_pause(&mut self) {
        self.commands.push(EngineCommand::TogglePause);
    }

    pub fn change_scene(&mut self, name: impl Into<String>) {
        self.commands.push(EngineCommand::ChangeScene(name.into()));
    }

    pub fn reset_scene(&mut self) {
        self.commands.push(EngineCommand::ResetScene);
    }

    pub fn reset_entity(&mut self, name: impl Into<String>) {
        self.commands.push(EngineCommand::ResetEntity(name.into()));
    }

    /// Add `entity` to the active scene under a generated name.
    pub fn spawn(&mut self, entity: Entity) {
        self.commands.push(EngineCommand::Spawn {
            scene: None,
            name: None,
            entity: Box::new(entity),
        });
    }

    /// Add `entity` to the active scene as `name`, replacing any namesake.
    pub fn spawn_named(&mut self, name: impl Into<String>, entity: Entity) {
        self.commands.push(EngineCommand::Spawn {
            scene: None,
            name: Some(name.into()),
            entity: Box::new(entity),
        });
    }

    pub fn despawn(&mut self, name: impl Into<String>) {
        self.commands.push(EngineCommand::Despawn(name.into()));
    }

    /// Fan a custom event out after the current phase.
    pub fn emit(&mut self, name: impl Into<String>, payload: Option<serde_json::Value>) {
        self.commands.push(EngineCommand::Custom {
            name: name.into(),
            payload,
        });
    }

    pub fn screenshot(&mut self, folder: Option<PathBuf>) {
        self.commands.push(EngineCommand::Screenshot(folder));
    }
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

/// Handle passed to every draw hook.
pub struct Canvas<'a> {
    renderer: &'a mut dyn Renderer,
    camera: &'a Camera,
    frame: &'a FrameInfo,
}

impl<'a> Canvas<'a> {
    pub fn new(renderer: &'a mut dyn Renderer, camera: &'a Camera, frame: &'a FrameInfo) -> Self {
        Self {
            renderer,
            camera,
            frame,
        }
    }

    pub fn renderer(&mut self) -> &mut dyn Renderer {
        &mut *self.renderer
    }

    pub fn camera(&self) -> &Camera {
        self.camera
    }

    pub fn frame(&self) -> &FrameInfo {
        self.frame
    }

    /// A shorter-lived canvas over the same renderer.
    pub fn reborrow(&mut self) -> Canvas<'_> {
        Canvas {
            renderer: &mut *self.renderer,
            camera: self.camera,
            frame: self.frame,
        }
    }
}
