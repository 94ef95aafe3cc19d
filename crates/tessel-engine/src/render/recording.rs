//! Headless renderer that records draw calls instead of drawing.
//!
//! Used by tests and headless runs to inspect exactly what the frame loop
//! asked for, in order. It keeps no pixels, so screenshots are unavailable
//! and zoom composition is recorded as a [`DrawCall::Zoom`] marker.

use image::RgbaImage;
use tessel_scene::color::Color;
use tessel_scene::render::{Font, ImageHandle, Placement, Renderer};

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear {
        color: Color,
        alpha: u8,
    },
    Rect {
        placement: Placement,
        color: Color,
        alpha: u8,
    },
    Image {
        placement: Placement,
        /// Source path of the drawn image.
        path: String,
        alpha: u8,
    },
    Text {
        placement: Placement,
        text: String,
        font: Font,
        color: Color,
        alpha: u8,
    },
    Zoom {
        zoom: f64,
        background: Color,
    },
}

impl DrawCall {
    /// Placement of a rect, image or text call.
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            DrawCall::Rect { placement, .. }
            | DrawCall::Image { placement, .. }
            | DrawCall::Text { placement, .. } => Some(placement),
            DrawCall::Clear { .. } | DrawCall::Zoom { .. } => None,
        }
    }
}

/// Renderer that logs every call of the current frame.
///
/// `calls()` holds everything since the last `begin_frame`; after `present`
/// the same list is also kept as [`previous_frame`](Self::previous_frame)
/// until the next frame is presented.
#[derive(Debug, Clone)]
pub struct RecordingRenderer {
    width: u32,
    height: u32,
    fullscreen: bool,
    calls: Vec<DrawCall>,
    previous: Vec<DrawCall>,
    presented: u64,
}

impl RecordingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fullscreen: false,
            calls: Vec::new(),
            previous: Vec::new(),
            presented: 0,
        }
    }

    /// Calls recorded since the last `begin_frame`.
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// The calls of the last presented frame.
    pub fn previous_frame(&self) -> &[DrawCall] {
        &self.previous
    }

    /// Rect placements of the current frame, in draw order.
    pub fn rects(&self) -> Vec<Placement> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Rect { placement, .. } => Some(*placement),
                _ => None,
            })
            .collect()
    }

    /// Frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }
}

impl Renderer for RecordingRenderer {
    fn begin_frame(&mut self) {
        self.calls.clear();
    }

    fn clear(&mut self, color: Color, alpha: u8) {
        self.calls.push(DrawCall::Clear { color, alpha });
    }

    fn draw_rect(&mut self, placement: &Placement, color: Color, alpha: u8) {
        self.calls.push(DrawCall::Rect {
            placement: *placement,
            color,
            alpha,
        });
    }

    fn draw_image(&mut self, placement: &Placement, image: &ImageHandle, alpha: u8) {
        self.calls.push(DrawCall::Image {
            placement: *placement,
            path: image.path().to_owned(),
            alpha,
        });
    }

    fn draw_text(&mut self, placement: &Placement, text: &str, font: &Font, color: Color, alpha: u8) {
        self.calls.push(DrawCall::Text {
            placement: *placement,
            text: text.to_owned(),
            font: font.clone(),
            color,
            alpha,
        });
    }

    fn present(&mut self) {
        self.previous.clone_from(&self.calls);
        self.presented += 1;
    }

    fn capture_frame(&mut self) -> Option<RgbaImage> {
        None
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn compose_zoom(&mut self, zoom: f64, background: Color) {
        self.calls.push(DrawCall::Zoom { zoom, background });
    }
}
