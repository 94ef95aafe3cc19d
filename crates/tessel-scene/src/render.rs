//! The renderer contract the frame loop draws through.
//!
//! The engine never touches pixels itself. Each visible entity is reduced to
//! a [`Placement`] and handed to a [`Renderer`] together with its color,
//! image or text. Backends decide how (or whether) to rasterize it.

use std::fmt;
use std::sync::Arc;

use image::imageops::FilterType;
use image::RgbaImage;

use crate::color::Color;

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Final draw-time geometry for one primitive, already in screen space.
///
/// `(x, y)` is where the top-left corner of the (scaled, rotated) primitive
/// lands. `rotation` is in degrees, counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotation: f64,
}

impl Placement {
    /// Unscaled, unrotated placement of a `width` x `height` box at `(x, y)`.
    pub fn at(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }

    /// Width and height after applying the scale factors.
    pub fn scaled_size(&self) -> (f64, f64) {
        (self.width * self.scale_x, self.height * self.scale_y)
    }
}

// ---------------------------------------------------------------------------
// ImageHandle
// ---------------------------------------------------------------------------

struct ImageAsset {
    path: String,
    pixels: RgbaImage,
}

/// A decoded RGBA image shared by reference count.
///
/// Cloning a handle never copies pixels, so entity snapshots that hold one
/// stay cheap and keep pointing at the same loaded asset.
#[derive(Clone)]
pub struct ImageHandle(Arc<ImageAsset>);

impl ImageHandle {
    /// Wrap already-decoded pixels. `path` is informational.
    pub fn new(path: impl Into<String>, pixels: RgbaImage) -> Self {
        Self(Arc::new(ImageAsset {
            path: path.into(),
            pixels,
        }))
    }

    /// Where the image was loaded from.
    pub fn path(&self) -> &str {
        &self.0.path
    }

    /// The decoded pixel size.
    pub fn native_size(&self) -> (u32, u32) {
        self.0.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.0.pixels
    }

    /// Whether both handles point at the same loaded asset.
    pub fn ptr_eq(&self, other: &ImageHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ImageHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.native_size();
        write!(f, "ImageHandle({:?}, {w}x{h})", self.0.path)
    }
}

// ---------------------------------------------------------------------------
// Font
// ---------------------------------------------------------------------------

/// Font selection passed through to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    pub family: String,
    /// Nominal glyph height in pixels.
    pub size: f64,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Arial".to_owned(),
            size: 10.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// A drawing backend.
///
/// Calls arrive in frame order: `begin_frame`, any number of `clear` and
/// `draw_*` calls, an optional `compose_zoom`, then `present`.
pub trait Renderer {
    /// Start a new frame.
    fn begin_frame(&mut self);

    /// Paint the whole target with `color` at `alpha` (255 = opaque).
    fn clear(&mut self, color: Color, alpha: u8);

    fn draw_rect(&mut self, placement: &Placement, color: Color, alpha: u8);

    fn draw_image(&mut self, placement: &Placement, image: &ImageHandle, alpha: u8);

    fn draw_text(&mut self, placement: &Placement, text: &str, font: &Font, color: Color, alpha: u8);

    /// Finish the frame and show it.
    fn present(&mut self);

    /// Copy of the current target contents, if this backend keeps pixels.
    fn capture_frame(&mut self) -> Option<RgbaImage>;

    fn resize(&mut self, width: u32, height: u32);

    fn set_fullscreen(&mut self, fullscreen: bool);

    /// Current target size in pixels.
    fn size(&self) -> (u32, u32);

    /// Scale everything drawn so far by `zoom` around the target center.
    ///
    /// The frame is captured, resized, the target cleared to `background`,
    /// and the scaled copy drawn centered. Backends without
    /// [`capture_frame`](Self::capture_frame) leave the frame untouched.
    fn compose_zoom(&mut self, zoom: f64, background: Color) {
        let Some(frame) = self.capture_frame() else {
            tracing::debug!(zoom, "renderer cannot capture frames; zoom composition skipped");
            return;
        };
        let (width, height) = frame.dimensions();
        let scaled_w = (f64::from(width) * zoom) as u32;
        let scaled_h = (f64::from(height) * zoom) as u32;

        self.clear(background, 255);
        if scaled_w == 0 || scaled_h == 0 {
            return;
        }

        let scaled = image::imageops::resize(&frame, scaled_w, scaled_h, FilterType::Triangle);
        let handle = ImageHandle::new("<zoomed frame>", scaled);
        let placement = Placement::at(
            f64::from(width) / 2.0 - f64::from(scaled_w) / 2.0,
            f64::from(height) / 2.0 - f64::from(scaled_h) / 2.0,
            f64::from(scaled_w),
            f64::from(scaled_h),
        );
        self.draw_image(&placement, &handle, 255);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
