//! CPU framebuffer renderer.
//!
//! Draws into an [`RgbaImage`] with source-over alpha blending. Rects and
//! images honour the placement's scale and rotation: the primitive is
//! rotated counter-clockwise about its center and the rotated bounding box
//! is anchored at the placement origin. Text uses the built-in 5x7 glyphs,
//! scaled so a glyph is `font.size` pixels tall, and is never rotated.
//!
//! The framebuffer survives `present`, so it can be captured for
//! screenshots and zoom composition, and the windowed backend uploads it as
//! a texture.

use image::{Rgba, RgbaImage};
use tessel_scene::color::Color;
use tessel_scene::render::{Font, ImageHandle, Placement, Renderer};

use super::font;

const OPAQUE_BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Source-over blend of `src` onto `dst`.
fn blend(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let a = u32::from(src[3]);
    match a {
        0 => {}
        255 => *dst = Rgba([src[0], src[1], src[2], 255]),
        _ => {
            let inv = 255 - a;
            for c in 0..3 {
                dst.0[c] = ((u32::from(src[c]) * a + u32::from(dst.0[c]) * inv + 127) / 255) as u8;
            }
            dst.0[3] = (a + u32::from(dst.0[3]) * inv / 255).min(255) as u8;
        }
    }
}

/// Pixel range `[start, end)` covering `[from, from + len)`, clipped to
/// `[0, limit)`.
fn span(from: f64, len: f64, limit: u32) -> (u32, u32) {
    let clip = |v: f64| v.clamp(0.0, f64::from(limit)) as u32;
    (clip(from.floor()), clip((from + len).ceil()))
}

/// Renderer that rasterizes into an in-memory RGBA image.
#[derive(Debug, Clone)]
pub struct SoftwareRenderer {
    frame: RgbaImage,
    fullscreen: bool,
    presented: u64,
}

impl SoftwareRenderer {
    /// A `width` x `height` framebuffer filled with opaque black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frame: RgbaImage::from_pixel(width, height, OPAQUE_BLACK),
            fullscreen: false,
            presented: 0,
        }
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }

    pub fn into_frame(self) -> RgbaImage {
        self.frame
    }

    /// RGBA at `(x, y)`, or `None` outside the framebuffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.frame.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Blend `sample(u, v)` over every pixel covered by `placement`, where
    /// `(u, v)` are the pixel's normalized coordinates in the unrotated
    /// primitive.
    fn fill(&mut self, placement: &Placement, sample: impl Fn(f64, f64) -> Option<[u8; 4]>) {
        let (w, h) = placement.scaled_size();
        let (w, h) = (w.abs(), h.abs());
        if !(w > 0.0 && h > 0.0) {
            return;
        }
        let (sin, cos) = placement.rotation.to_radians().sin_cos();
        let box_w = (w * cos).abs() + (h * sin).abs();
        let box_h = (w * sin).abs() + (h * cos).abs();
        let cx = placement.x + box_w / 2.0;
        let cy = placement.y + box_h / 2.0;

        let (width, height) = self.frame.dimensions();
        let (x0, x1) = span(placement.x, box_w, width);
        let (y0, y1) = span(placement.y, box_h, height);
        for py in y0..y1 {
            for px in x0..x1 {
                let dx = f64::from(px) + 0.5 - cx;
                let dy = f64::from(py) + 0.5 - cy;
                let lx = dx * cos - dy * sin + w / 2.0;
                let ly = dx * sin + dy * cos + h / 2.0;
                if lx < 0.0 || ly < 0.0 || lx >= w || ly >= h {
                    continue;
                }
                if let Some(src) = sample(lx / w, ly / h) {
                    blend(self.frame.get_pixel_mut(px, py), src);
                }
            }
        }
    }
}

impl Renderer for SoftwareRenderer {
    fn begin_frame(&mut self) {}

    fn clear(&mut self, color: Color, alpha: u8) {
        let src = color.with_alpha(alpha);
        for pixel in self.frame.pixels_mut() {
            blend(pixel, src);
        }
    }

    fn draw_rect(&mut self, placement: &Placement, color: Color, alpha: u8) {
        let src = color.with_alpha(alpha);
        self.fill(placement, |_, _| Some(src));
    }

    fn draw_image(&mut self, placement: &Placement, image: &ImageHandle, alpha: u8) {
        let pixels = image.pixels();
        let (iw, ih) = pixels.dimensions();
        if iw == 0 || ih == 0 {
            return;
        }
        self.fill(placement, |u, v| {
            let x = ((u * f64::from(iw)) as u32).min(iw - 1);
            let y = ((v * f64::from(ih)) as u32).min(ih - 1);
            let [r, g, b, a] = pixels.get_pixel(x, y).0;
            Some([r, g, b, (u32::from(a) * u32::from(alpha) / 255) as u8])
        });
    }

    fn draw_text(&mut self, placement: &Placement, text: &str, font: &Font, color: Color, alpha: u8) {
        let src = color.with_alpha(alpha);
        let cell_w = font.size / f64::from(font::GLYPH_HEIGHT) * placement.scale_x;
        let cell_h = font.size / f64::from(font::GLYPH_HEIGHT) * placement.scale_y;
        for (i, ch) in text.chars().enumerate() {
            let origin = placement.x + i as f64 * f64::from(font::ADVANCE) * cell_w;
            for (col, row) in font::lit_cells(ch) {
                let cell = Placement::at(
                    origin + f64::from(col) * cell_w,
                    placement.y + f64::from(row) * cell_h,
                    cell_w,
                    cell_h,
                );
                self.fill(&cell, |_, _| Some(src));
            }
        }
    }

    fn present(&mut self) {
        self.presented += 1;
    }

    fn capture_frame(&mut self) -> Option<RgbaImage> {
        Some(self.frame.clone())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.frame.dimensions() != (width, height) {
            self.frame = RgbaImage::from_pixel(width, height, OPAQUE_BLACK);
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    fn size(&self) -> (u32, u32) {
        self.frame.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(r: &SoftwareRenderer) -> usize {
        r.frame().pixels().filter(|p| p.0 != OPAQUE_BLACK.0).count()
    }

    #[test]
    fn rect_covers_exact_pixels() {
        let mut r = SoftwareRenderer::new(20, 20);
        r.draw_rect(&Placement::at(2.0, 3.0, 4.0, 5.0), Color::RED, 255);
        assert_eq!(lit(&r), 20);
        assert_eq!(r.pixel(2, 3), Some([255, 0, 0, 255]));
        assert_eq!(r.pixel(5, 7), Some([255, 0, 0, 255]));
        assert_eq!(r.pixel(6, 7), Some([0, 0, 0, 255]));
    }

    #[test]
    fn scale_stretches_rect() {
        let mut r = SoftwareRenderer::new(20, 20);
        let placement = Placement {
            scale_x: 2.0,
            ..Placement::at(0.0, 0.0, 3.0, 1.0)
        };
        r.draw_rect(&placement, Color::WHITE, 255);
        assert_eq!(lit(&r), 6);
    }

    #[test]
    fn quarter_turn_swaps_extent() {
        let mut r = SoftwareRenderer::new(20, 20);
        let placement = Placement {
            rotation: 90.0,
            ..Placement::at(0.0, 0.0, 6.0, 2.0)
        };
        r.draw_rect(&placement, Color::WHITE, 255);
        assert_eq!(lit(&r), 12);
        assert_eq!(r.pixel(1, 5), Some([255, 255, 255, 255]));
        assert_eq!(r.pixel(2, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn half_alpha_blends() {
        let mut r = SoftwareRenderer::new(1, 1);
        r.clear(Color::WHITE, 255);
        r.draw_rect(&Placement::at(0.0, 0.0, 1.0, 1.0), Color::BLACK, 128);
        let [red, _, _, a] = r.pixel(0, 0).unwrap();
        assert!((126..=128).contains(&red), "got {red}");
        assert_eq!(a, 255);
    }

    #[test]
    fn offscreen_drawing_is_clipped() {
        let mut r = SoftwareRenderer::new(4, 4);
        r.draw_rect(&Placement::at(-2.0, -2.0, 4.0, 4.0), Color::GREEN, 255);
        assert_eq!(lit(&r), 4);
    }

    #[test]
    fn image_blit_samples_source() {
        let mut src = RgbaImage::from_pixel(2, 1, Rgba([255, 0, 0, 255]));
        src.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        let handle = ImageHandle::new("two.png", src);
        let mut r = SoftwareRenderer::new(8, 8);
        r.draw_image(&Placement::at(0.0, 0.0, 4.0, 2.0), &handle, 255);
        assert_eq!(r.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(r.pixel(3, 1), Some([0, 0, 255, 255]));
        assert_eq!(lit(&r), 8);
    }

    #[test]
    fn text_draws_glyph_cells() {
        let mut r = SoftwareRenderer::new(20, 10);
        let font = Font {
            size: 7.0,
            ..Font::default()
        };
        r.draw_text(&Placement::at(0.0, 0.0, 10.0, 10.0), "-", &font, Color::WHITE, 255);
        assert_eq!(lit(&r), 5);
        assert_eq!(r.pixel(0, 3), Some([255, 255, 255, 255]));
    }

    #[test]
    fn zoom_composition_shrinks_frame() {
        let mut r = SoftwareRenderer::new(10, 10);
        r.clear(Color::WHITE, 255);
        r.compose_zoom(0.5, Color::BLACK);
        assert_eq!(r.pixel(0, 0), Some([0, 0, 0, 255]));
        assert!(r.pixel(5, 5).unwrap()[0] > 200);
        assert_eq!(lit(&r), 25);
    }
}
