//! Canonical input/window event taxonomy.
//!
//! Platform events are translated into [`InputEvent`]s before they reach the
//! engine. Each carries exactly one [`EventCategory`], which selects the
//! per-category handler in a [`Hooks`](crate::hooks::Hooks) table.

use serde::{Deserialize, Serialize};

/// The closed set of event categories handlers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    KeyDown,
    KeyUp,
    PointerDown,
    PointerUp,
    PointerMove,
    Wheel,
    ControllerAxis,
    ControllerButtonDown,
    ControllerButtonUp,
    Quit,
    FullscreenToggle,
    Resize,
    Expose,
    Focus,
}

impl EventCategory {
    /// Every category, in declaration order.
    pub const ALL: [EventCategory; 14] = [
        EventCategory::KeyDown,
        EventCategory::KeyUp,
        EventCategory::PointerDown,
        EventCategory::PointerUp,
        EventCategory::PointerMove,
        EventCategory::Wheel,
        EventCategory::ControllerAxis,
        EventCategory::ControllerButtonDown,
        EventCategory::ControllerButtonUp,
        EventCategory::Quit,
        EventCategory::FullscreenToggle,
        EventCategory::Resize,
        EventCategory::Expose,
        EventCategory::Focus,
    ];

    /// Stable snake_case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::KeyDown => "key_down",
            EventCategory::KeyUp => "key_up",
            EventCategory::PointerDown => "pointer_down",
            EventCategory::PointerUp => "pointer_up",
            EventCategory::PointerMove => "pointer_move",
            EventCategory::Wheel => "wheel",
            EventCategory::ControllerAxis => "controller_axis",
            EventCategory::ControllerButtonDown => "controller_button_down",
            EventCategory::ControllerButtonUp => "controller_button_up",
            EventCategory::Quit => "quit",
            EventCategory::FullscreenToggle => "fullscreen_toggle",
            EventCategory::Resize => "resize",
            EventCategory::Expose => "expose",
            EventCategory::Focus => "focus",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single translated platform event.
///
/// Only the fields meaningful for the category are populated; the rest stay
/// `None`. Key names are lowercase (`"escape"`, `"a"`, `"left"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Which handler family this event is routed to.
    pub category: EventCategory,
    /// Key name for key events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Screen-space position for pointer events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<(f64, f64)>,
    /// Pointer or controller button index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<u32>,
    /// Wheel scroll amount, or `(axis, value)` for controller axes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<(f64, f64)>,
    /// New window size for resize events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<(u32, u32)>,
    /// Gained (`true`) or lost focus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused: Option<bool>,
}

impl InputEvent {
    /// An event of `category` with no payload.
    pub fn new(category: EventCategory) -> Self {
        Self {
            category,
            key: None,
            position: None,
            button: None,
            delta: None,
            size: None,
            focused: None,
        }
    }

    pub fn key_down(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(EventCategory::KeyDown)
        }
    }

    pub fn key_up(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::new(EventCategory::KeyUp)
        }
    }

    pub fn pointer_down(x: f64, y: f64, button: u32) -> Self {
        Self {
            position: Some((x, y)),
            button: Some(button),
            ..Self::new(EventCategory::PointerDown)
        }
    }

    pub fn pointer_up(x: f64, y: f64, button: u32) -> Self {
        Self {
            position: Some((x, y)),
            button: Some(button),
            ..Self::new(EventCategory::PointerUp)
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self {
            position: Some((x, y)),
            ..Self::new(EventCategory::PointerMove)
        }
    }

    pub fn wheel(dx: f64, dy: f64) -> Self {
        Self {
            delta: Some((dx, dy)),
            ..Self::new(EventCategory::Wheel)
        }
    }

    pub fn controller_axis(axis: u32, value: f64) -> Self {
        Self {
            delta: Some((f64::from(axis), value)),
            ..Self::new(EventCategory::ControllerAxis)
        }
    }

    pub fn controller_button_down(button: u32) -> Self {
        Self {
            button: Some(button),
            ..Self::new(EventCategory::ControllerButtonDown)
        }
    }

    pub fn controller_button_up(button: u32) -> Self {
        Self {
            button: Some(button),
            ..Self::new(EventCategory::ControllerButtonUp)
        }
    }

    pub fn quit() -> Self {
        Self::new(EventCategory::Quit)
    }

    pub fn resize(width: u32, height: u32) -> Self {
        Self {
            size: Some((width, height)),
            ..Self::new(EventCategory::Resize)
        }
    }

    pub fn focus(focused: bool) -> Self {
        Self {
            focused: Some(focused),
            ..Self::new(EventCategory::Focus)
        }
    }

    /// Whether this is a key-down of `key` (case-insensitive).
    pub fn is_key_down(&self, key: &str) -> bool {
        self.category == EventCategory::KeyDown
            && self
                .key
                .as_deref()
                .is_some_and(|k| k.eq_ignore_ascii_case(key))
    }
}
