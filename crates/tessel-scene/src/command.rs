//! Deferred engine mutations requested from inside hooks.
//!
//! A hook only ever holds `&mut` to its own owner (an entity, a scene, or
//! the engine's vars), so anything that reaches further -- pausing, switching
//! scenes, spawning or despawning entities, stopping the loop -- is queued
//! here as an [`EngineCommand`]. The engine drains the buffer in FIFO order at
//! every phase boundary of the frame.
//!
//! # Example
//!
//! ```
//! use tessel_scene::command::{CommandBuffer, EngineCommand};
//!
//! let mut cmds = CommandBuffer::new();
//! cmds.push(EngineCommand::SetPause(true));
//! cmds.push(EngineCommand::Stop);
//!
//! assert_eq!(cmds.len(), 2);
//! assert!(matches!(cmds.pop(), Some(EngineCommand::SetPause(true))));
//! assert!(matches!(cmds.pop(), Some(EngineCommand::Stop)));
//! assert!(cmds.is_empty());
//! ```

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::entity::Entity;

// ---------------------------------------------------------------------------
// EngineCommand
// ---------------------------------------------------------------------------

/// One deferred mutation of engine state.
#[derive(Debug)]
pub enum EngineCommand {
    /// End the run loop after the current frame.
    Stop,
    /// Set the pause flag and notify `on_pause` hooks.
    SetPause(bool),
    /// Flip the pause flag and notify `on_pause` hooks.
    TogglePause,
    /// Make the named scene active.
    ChangeScene(String),
    /// Reset the active scene and all its entities.
    ResetScene,
    /// Reset one entity of the active scene.
    ResetEntity(String),
    /// Register an entity. `scene: None` targets the active scene and
    /// `name: None` generates a unique name.
    Spawn {
        scene: Option<String>,
        name: Option<String>,
        entity: Box<Entity>,
    },
    /// Remove an entity from the active scene.
    Despawn(String),
    /// Fan a named event out to the engine, active scene and entities.
    Custom {
        name: String,
        payload: Option<serde_json::Value>,
    },
    SetFps(u32),
    SetTitle(String),
    SetFullscreen(bool),
    ToggleFullscreen,
    SetCursorVisible(bool),
    /// Write a screenshot. `None` uses the configured folder.
    Screenshot(Option<PathBuf>),
}

// ---------------------------------------------------------------------------
// CommandBuffer
// ---------------------------------------------------------------------------

/// FIFO queue of [`EngineCommand`]s.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: VecDeque<EngineCommand>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a command behind everything already queued.
    pub fn push(&mut self, command: EngineCommand) {
        self.commands.push_back(command);
    }

    /// Take the oldest queued command.
    pub fn pop(&mut self) -> Option<EngineCommand> {
        self.commands.pop_front()
    }

    /// Queued commands in the order they will be applied.
    pub fn iter(&self) -> impl Iterator<Item = &EngineCommand> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every queued command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
