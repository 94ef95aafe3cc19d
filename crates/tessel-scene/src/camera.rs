//! Smoothed 2D camera with clamped zoom.
//!
//! The camera does not transform anything itself. World-space entities
//! subtract [`Camera::offset`] from their position at draw time, and the
//! renderer applies [`Camera::zoom`] to the finished frame.

use serde::{Deserialize, Serialize};

use crate::SceneError;

/// Construction-time camera settings. Also the state [`Camera::reset`]
/// returns to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub x: f64,
    pub y: f64,
    /// Follow smoothing divisor. `1.0` snaps, larger values lag more.
    pub delay: f64,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            delay: 50.0,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 3.0,
        }
    }
}

impl CameraConfig {
    /// Check the settings without building a camera.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidArgument`] if `delay` is not positive and finite,
    /// or the zoom range is empty or non-positive.
    pub fn validate(&self) -> Result<(), SceneError> {
        validate_delay(self.delay)?;
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(SceneError::InvalidArgument(format!(
                "zoom range must satisfy 0 < min_zoom <= max_zoom, got [{}, {}]",
                self.min_zoom, self.max_zoom
            )));
        }
        Ok(())
    }
}

fn validate_delay(delay: f64) -> Result<(), SceneError> {
    if delay > 0.0 && delay.is_finite() {
        Ok(())
    } else {
        Err(SceneError::InvalidArgument(format!(
            "camera delay must be positive and finite, got {delay}"
        )))
    }
}

/// The engine's single camera.
#[derive(Debug, Clone)]
pub struct Camera {
    x: f64,
    y: f64,
    delay: f64,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    /// Window size; `follow` centers the target within it.
    viewport: (f64, f64),
    initial: CameraConfig,
}

impl Camera {
    /// Build a camera for a `viewport` of `(width, height)` pixels.
    ///
    /// The initial zoom is clamped into the configured range.
    ///
    /// # Errors
    ///
    /// See [`CameraConfig::validate`].
    pub fn new(config: CameraConfig, viewport: (f64, f64)) -> Result<Self, SceneError> {
        config.validate()?;
        let mut camera = Self {
            x: config.x,
            y: config.y,
            delay: config.delay,
            zoom: 1.0,
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            viewport,
            initial: config,
        };
        camera.set_zoom(camera.initial.zoom);
        Ok(camera)
    }

    /// Move one smoothing step toward centering `(target_x, target_y)`.
    ///
    /// `position += ((target - viewport / 2) - position) / delay`
    pub fn follow(&mut self, target_x: f64, target_y: f64) {
        let (vw, vh) = self.viewport;
        self.x += ((target_x - vw / 2.0) - self.x) / self.delay;
        self.y += ((target_y - vh / 2.0) - self.y) / self.delay;
    }

    /// Set the zoom, clamped to `[min_zoom, max_zoom]`.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidArgument`] if `delay` is not positive and finite.
    pub fn set_delay(&mut self, delay: f64) -> Result<(), SceneError> {
        validate_delay(delay)?;
        self.delay = delay;
        Ok(())
    }

    /// Jump directly to `(x, y)`.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Restore the construction-time settings. The viewport is kept.
    pub fn reset(&mut self) {
        let initial = self.initial.clone();
        self.x = initial.x;
        self.y = initial.y;
        self.delay = initial.delay;
        self.min_zoom = initial.min_zoom;
        self.max_zoom = initial.max_zoom;
        self.set_zoom(initial.zoom);
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
    }

    // -- accessors ----------------------------------------------------------

    /// Render-space offset subtracted from world-space positions.
    pub fn offset(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn zoom_range(&self) -> (f64, f64) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
