//! Renderer backends.
//!
//! [`RecordingRenderer`] and [`SoftwareRenderer`] are always available and
//! need no GPU. With the `renderer` feature, [`WindowRenderer`] presents the
//! software framebuffer in a winit window through wgpu, and
//! [`run_windowed`](app::run_windowed) drives an engine inside the window's
//! event loop.

pub mod font;
pub mod recording;
pub mod software;

#[cfg(feature = "renderer")]
pub mod app;
#[cfg(feature = "renderer")]
pub mod window;

pub use recording::{DrawCall, RecordingRenderer};
pub use software::SoftwareRenderer;

#[cfg(feature = "renderer")]
pub use app::run_windowed;
#[cfg(feature = "renderer")]
pub use window::WindowRenderer;
