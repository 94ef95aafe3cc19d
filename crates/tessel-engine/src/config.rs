//! Engine construction settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tessel_scene::camera::CameraConfig;
use tessel_scene::color::Color;
use tessel_scene::SceneError;

use crate::error::{EngineError, EngineResult};

/// Settings consumed by [`Engine::new`](crate::engine::Engine::new).
///
/// Every field has a default, so JSON configs only need the fields they
/// change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title, also used in screenshot file names.
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub background_alpha: u8,
    /// Target frames per second. Must be positive.
    pub fps: u32,
    /// Paint the background even while paused.
    pub fill_on_pause: bool,
    /// Stop the loop when `escape` is pressed.
    pub quit_on_escape: bool,
    pub cursor_visible: bool,
    /// Skip the frame-budget wait and run as fast as possible.
    pub headless: bool,
    /// Name the initial empty scene is registered and activated under.
    pub default_scene: String,
    /// Folder screenshots go to when no folder is given.
    pub screenshot_dir: PathBuf,
    pub camera: CameraConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Title".to_owned(),
            width: 640,
            height: 480,
            background: Color::BLACK,
            background_alpha: 255,
            fps: 60,
            fill_on_pause: true,
            quit_on_escape: false,
            cursor_visible: true,
            headless: false,
            default_scene: "default".to_owned(),
            screenshot_dir: PathBuf::from("screenshots"),
            camera: CameraConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] on malformed JSON, otherwise whatever
    /// [`validate`](Self::validate) reports.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::config(format!("invalid engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidArgument`] for a zero fps, a zero-sized window or
    /// invalid camera settings; [`EngineError::Configuration`] for an empty
    /// default scene name.
    pub fn validate(&self) -> EngineResult<()> {
        if self.fps == 0 {
            return Err(SceneError::InvalidArgument("fps must be positive".to_owned()).into());
        }
        if self.width == 0 || self.height == 0 {
            return Err(SceneError::InvalidArgument(format!(
                "window size must be non-zero, got {}x{}",
                self.width, self.height
            ))
            .into());
        }
        self.camera.validate()?;
        if self.default_scene.is_empty() {
            return Err(EngineError::config("default scene name must not be empty"));
        }
        Ok(())
    }
}
