//! Tessel Scene -- the data model of the tessel 2D engine.
//!
//! This crate holds everything the frame loop operates on but none of the
//! loop itself: axis-aligned [`geometry`], tagged and z-ordered
//! [`Entity`](entity::Entity) values, the [`Scene`](scene::Scene) that keeps
//! them sorted, the smoothed [`Camera`](camera::Camera), the canonical
//! [`event`] taxonomy, per-owner [`hooks`] tables, and the deferred
//! [`CommandBuffer`](command::CommandBuffer) through which hooks ask the
//! engine for changes they cannot make themselves.
//!
//! # Quick Start
//!
//! ```
//! use tessel_scene::prelude::*;
//!
//! let mut camera = Camera::new(CameraConfig::default(), (640.0, 480.0)).unwrap();
//! let mut commands = CommandBuffer::new();
//! let frame = FrameInfo::default();
//! let mut ctx = Context::new(&frame, &mut camera, &mut commands);
//!
//! let mut scene = Scene::new();
//! let player = Entity::new(EntityProps {
//!     x: 10.0,
//!     y: 20.0,
//!     tags: vec!["player".to_owned()],
//!     ..Default::default()
//! })
//! .unwrap();
//! scene.add_entity("player", player, &mut ctx).unwrap();
//!
//! assert_eq!(scene.entities_by_tag("player").len(), 1);
//! assert_eq!(scene.entity("player").unwrap().props().x, 10.0);
//! ```

#![deny(unsafe_code)]

pub mod camera;
pub mod color;
pub mod command;
pub mod context;
pub mod entity;
pub mod event;
pub mod geometry;
pub mod hooks;
pub mod render;
pub mod scene;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by scene-graph operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// A name or tag was looked up or removed but is not registered.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// What was being looked up (`"entity"`, `"tag"`, `"scene"`, ...).
        kind: &'static str,
        /// The missing key.
        name: String,
    },

    /// A value outside its valid domain (negative size, non-positive delay).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl SceneError {
    /// Shorthand for a [`SceneError::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

/// Free-form user state attached to entities, scenes and the engine.
///
/// Kept as JSON values so it can be snapshotted for reset and persisted
/// without knowing the game's own types.
pub type Vars = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::camera::{Camera, CameraConfig};
    pub use crate::color::Color;
    pub use crate::command::{CommandBuffer, EngineCommand};
    pub use crate::context::{pause_eligible, Canvas, Context, FrameInfo, Pointer, Siblings};
    pub use crate::entity::{Entity, EntityId, EntityProps, ImageLayer, Layer, TextLayer};
    pub use crate::event::{EventCategory, InputEvent};
    pub use crate::geometry::{distance, is_colliding, is_inside, positions_match, Rect};
    pub use crate::hooks::{with_hooks, HookOwner, HookResult, Hooks};
    pub use crate::render::{Font, ImageHandle, Placement, Renderer};
    pub use crate::scene::{Scene, SceneState};
    pub use crate::{SceneError, Vars};
}
