//! Tessel Engine -- the frame loop and its collaborators.
//!
//! This crate builds on [`tessel_scene`] to provide the driver: an
//! [`Engine`](engine::Engine) that owns scenes and the camera, dispatches
//! input, runs hooks in a fixed order, detects collisions and hands every
//! visible entity to a [`Renderer`](tessel_scene::render::Renderer).
//! Hooks change engine state by queuing commands, which the engine applies
//! at phase boundaries.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use tessel_engine::prelude::*;
//!
//! let mut engine = Engine::new(EngineConfig { headless: true, ..Default::default() }).unwrap();
//! let ball = Entity::new(EntityProps { x: 10.0, ..Default::default() })
//!     .unwrap()
//!     .on_update(|ball, ctx| {
//!         ball.translate(60.0 * ctx.delta_time(), 0.0);
//!         Ok(())
//!     });
//! engine.add_entity("default", "ball", ball).unwrap();
//!
//! let mut renderer = RecordingRenderer::new(640, 480);
//! let mut input = ScriptedInput::idle(60).then_quit();
//! let mut clock = FixedClock::new(60);
//! engine.run(&mut input, &mut renderer, &mut clock).unwrap();
//!
//! assert_eq!(engine.frame_count(), 61);
//! let x = engine.active_scene().unwrap().entity("ball").unwrap().props().x;
//! assert!((x - 70.0).abs() < 1e-3);
//! ```

#![deny(unsafe_code)]

pub mod assets;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod logging;
pub mod persistence;
pub mod render;
pub mod router;
pub mod screenshot;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the scene crate for convenience.
pub use tessel_scene;

pub use error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tessel_scene::prelude::*;

    pub use crate::assets::{AssetStore, FsAssetStore, Sound, SoundHandle};
    pub use crate::clock::{frame_budget, Clock, FixedClock, SystemClock};
    pub use crate::config::EngineConfig;
    pub use crate::engine::{Engine, FrameDiagnostics, LoopState};
    pub use crate::error::{EngineError, EngineResult};
    pub use crate::input::{InputSender, InputSource, ScriptedInput, SharedInputQueue};
    pub use crate::persistence::JsonStore;
    pub use crate::render::{DrawCall, RecordingRenderer, SoftwareRenderer};
}
