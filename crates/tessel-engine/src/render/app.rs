//! Windowed runner.
//!
//! Provides [`run_windowed`], which takes ownership of an [`Engine`] and
//! drives it inside a winit event loop. Window events are translated into
//! [`InputEvent`]s and buffered; each `RedrawRequested` runs one engine
//! frame with the buffered batch, paces to the configured fps and requests
//! the next redraw.
//!
//! This module is feature-gated behind `renderer`.

use std::sync::Arc;

use tessel_scene::event::InputEvent;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Icon, WindowAttributes, WindowId};

use super::window::WindowRenderer;
use crate::clock::{frame_budget, Clock, SystemClock};
use crate::engine::Engine;

/// Run `engine` in a window until it stops or the window is closed.
///
/// Returns the engine so callers can inspect its final state.
///
/// # Errors
///
/// Returns an error if the event loop, window or renderer cannot be
/// created, or if a frame fails.
pub fn run_windowed(engine: Engine) -> Result<Engine, anyhow::Error> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        state: AppState::Pending { engine },
        failure: None,
    };
    event_loop.run_app(&mut app)?;

    if let Some(err) = app.failure {
        return Err(err);
    }
    match app.state {
        AppState::Pending { engine } | AppState::Running { engine, .. } => Ok(engine),
        AppState::Transitioning => Err(anyhow::anyhow!("windowed runner ended mid-transition")),
    }
}

// ---------------------------------------------------------------------------
// Event translation
// ---------------------------------------------------------------------------

/// Lowercase engine key name for a winit logical key.
fn key_name(key: &Key) -> Option<String> {
    let name = match key {
        Key::Character(s) => return Some(s.to_lowercase()),
        Key::Named(named) => match named {
            NamedKey::Escape => "escape",
            NamedKey::Space => "space",
            NamedKey::Enter => "return",
            NamedKey::Tab => "tab",
            NamedKey::Backspace => "backspace",
            NamedKey::Delete => "delete",
            NamedKey::ArrowLeft => "left",
            NamedKey::ArrowRight => "right",
            NamedKey::ArrowUp => "up",
            NamedKey::ArrowDown => "down",
            NamedKey::Shift => "shift",
            NamedKey::Control => "ctrl",
            NamedKey::Alt => "alt",
            NamedKey::F11 => "f11",
            NamedKey::F12 => "f12",
            _ => return None,
        },
        _ => return None,
    };
    Some(name.to_owned())
}

/// Button numbering: 1 left, 2 middle, 3 right.
fn button_index(button: MouseButton) -> u32 {
    match button {
        MouseButton::Left => 1,
        MouseButton::Middle => 2,
        MouseButton::Right => 3,
        MouseButton::Back => 4,
        MouseButton::Forward => 5,
        MouseButton::Other(n) => u32::from(n),
    }
}

// ---------------------------------------------------------------------------
// Internal state machine
// ---------------------------------------------------------------------------

/// Winit 0.30 creates windows inside `resumed`, so the runner starts
/// `Pending` and becomes `Running` once the window and renderer exist.
enum AppState {
    Pending {
        engine: Engine,
    },
    Running {
        engine: Engine,
        renderer: WindowRenderer,
        clock: SystemClock,
        events: Vec<InputEvent>,
        cursor: (f64, f64),
        applied: WindowSync,
    },
    /// Placeholder used during state transitions.
    Transitioning,
}

/// Window properties last pushed to the OS window.
#[derive(Default)]
struct WindowSync {
    title: String,
    cursor_visible: bool,
}

struct App {
    state: AppState,
    failure: Option<anyhow::Error>,
}

impl App {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        tracing::error!(error = %err, "windowed runner failed, exiting");
        self.failure = Some(err);
        event_loop.exit();
    }
}

fn window_icon(engine: &Engine) -> Option<Icon> {
    let icon = engine.icon()?;
    let (width, height) = icon.native_size();
    match Icon::from_rgba(icon.pixels().as_raw().clone(), width, height) {
        Ok(icon) => Some(icon),
        Err(e) => {
            tracing::warn!(error = %e, path = icon.path(), "window icon rejected");
            None
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let state = std::mem::replace(&mut self.state, AppState::Transitioning);
        let mut engine = match state {
            AppState::Pending { engine } => engine,
            other => {
                self.state = other;
                return;
            }
        };

        let (width, height) = engine.size();
        let attrs = WindowAttributes::default()
            .with_title(engine.title())
            .with_inner_size(winit::dpi::PhysicalSize::new(width, height))
            .with_window_icon(window_icon(&engine));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                self.state = AppState::Pending { engine };
                self.fail(event_loop, e.into());
                return;
            }
        };
        window.set_cursor_visible(engine.cursor_visible());

        let renderer = match pollster::block_on(WindowRenderer::new(window.clone())) {
            Ok(renderer) => renderer,
            Err(e) => {
                self.state = AppState::Pending { engine };
                self.fail(event_loop, e);
                return;
            }
        };
        if let Err(e) = engine.start() {
            self.state = AppState::Pending { engine };
            self.fail(event_loop, e.into());
            return;
        }

        window.request_redraw();
        self.state = AppState::Running {
            applied: WindowSync {
                title: engine.title().to_owned(),
                cursor_visible: engine.cursor_visible(),
            },
            engine,
            renderer,
            clock: SystemClock::new(),
            events: Vec::new(),
            cursor: (0.0, 0.0),
        };
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let AppState::Running {
            engine,
            renderer,
            clock,
            events,
            cursor,
            applied,
        } = &mut self.state
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => events.push(InputEvent::quit()),
            WindowEvent::Resized(size) => {
                tracing::debug!(width = size.width, height = size.height, "window resized");
                events.push(InputEvent::resize(size.width, size.height));
            }
            WindowEvent::Focused(focused) => events.push(InputEvent::focus(focused)),
            WindowEvent::KeyboardInput { event, .. } => {
                if let Some(key) = key_name(&event.logical_key) {
                    events.push(match event.state {
                        ElementState::Pressed => InputEvent::key_down(key),
                        ElementState::Released => InputEvent::key_up(key),
                    });
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                *cursor = (position.x, position.y);
                events.push(InputEvent::pointer_move(position.x, position.y));
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let (x, y) = *cursor;
                let button = button_index(button);
                events.push(match state {
                    ElementState::Pressed => InputEvent::pointer_down(x, y, button),
                    ElementState::Released => InputEvent::pointer_up(x, y, button),
                });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(dx, dy) => (f64::from(dx), f64::from(dy)),
                    MouseScrollDelta::PixelDelta(p) => (p.x, p.y),
                };
                events.push(InputEvent::wheel(dx, dy));
            }
            WindowEvent::RedrawRequested => {
                let started = clock.frame_start();
                let batch = std::mem::take(events);
                if let Err(err) = engine.frame(batch, renderer, started) {
                    self.fail(event_loop, err.into());
                    return;
                }
                if applied.title != engine.title() {
                    applied.title = engine.title().to_owned();
                    renderer.window().set_title(&applied.title);
                }
                if applied.cursor_visible != engine.cursor_visible() {
                    applied.cursor_visible = engine.cursor_visible();
                    renderer.window().set_cursor_visible(applied.cursor_visible);
                }
                if !engine.is_running() {
                    tracing::info!(frames = engine.frame_count(), "engine stopped, closing window");
                    event_loop.exit();
                    return;
                }
                clock.wait_out(started, frame_budget(engine.fps()));
                renderer.window().request_redraw();
            }
            _ => {}
        }
    }
}
