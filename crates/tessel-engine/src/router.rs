//! Fan-out of input, pause and custom events.
//!
//! Every fan-out visits the same three levels in the same order: the
//! engine's own hooks (never gated), the active scene (gated by its
//! `ignore_pause`), then each entity of the active scene in z-order (gated
//! by its own `ignore_pause`). Input handlers additionally skip inactive
//! entities.

use serde_json::Value;
use tessel_scene::context::Context;
use tessel_scene::entity::Entity;
use tessel_scene::event::{EventCategory, InputEvent};
use tessel_scene::geometry::{is_inside, Rect};
use tessel_scene::hooks::{with_hooks, Hooks};
use tessel_scene::scene::Scene;
use tessel_scene::Vars;

pub use tessel_scene::context::pause_eligible;

use crate::error::{in_phase, EngineResult};

/// The hook owners one fan-out reaches.
pub struct Targets<'a> {
    pub hooks: &'a mut Hooks<Vars>,
    pub vars: &'a mut Vars,
    pub scene: &'a mut Scene,
}

/// A message delivered to every level regardless of `active`.
#[derive(Debug, Clone, Copy)]
pub enum Broadcast<'a> {
    /// The new pause flag, delivered to `on_pause`.
    Pause(bool),
    /// A named custom event.
    Custom {
        name: &'a str,
        payload: Option<&'a Value>,
    },
}

impl Broadcast<'_> {
    fn phase(&self) -> &'static str {
        match self {
            Broadcast::Pause(_) => "on_pause",
            Broadcast::Custom { .. } => "custom_event",
        }
    }
}

fn deliver<T>(hooks: &mut Hooks<T>, owner: &mut T, message: Broadcast<'_>, ctx: &mut Context<'_>) -> anyhow::Result<()> {
    match message {
        Broadcast::Pause(paused) => hooks.fire_pause(owner, paused, ctx),
        Broadcast::Custom { name, payload } => hooks.fire_custom(owner, name, payload, ctx),
    }
}

/// Deliver `message` to the engine, the scene, then every entity.
pub fn broadcast(message: Broadcast<'_>, targets: Targets<'_>, ctx: &mut Context<'_>) -> EngineResult<()> {
    let phase = message.phase();
    let paused = ctx.paused();
    tracing::trace!(?message, "broadcast");

    deliver(targets.hooks, targets.vars, message, ctx).map_err(in_phase(phase))?;

    let scene = targets.scene;
    if pause_eligible(scene.ignore_pause(), paused) {
        with_hooks(scene, |hooks, scene| deliver(hooks, scene, message, ctx)).map_err(in_phase(phase))?;
    }

    for entity in scene.entities_mut() {
        if pause_eligible(entity.props().ignore_pause, paused) {
            with_hooks(entity, |hooks, entity| deliver(hooks, entity, message, ctx))
                .map_err(in_phase(phase))?;
        }
    }
    Ok(())
}

/// Whether an entity takes part in input dispatch right now.
fn receives_input(entity: &Entity, paused: bool) -> bool {
    let props = entity.props();
    props.active && pause_eligible(props.ignore_pause, paused)
}

/// Route one input event: pointer presses first reach every entity under the
/// pointer, then the category handlers fan out.
pub fn dispatch_input(event: &InputEvent, targets: Targets<'_>, ctx: &mut Context<'_>) -> EngineResult<()> {
    let paused = ctx.paused();
    let scene = targets.scene;

    if event.category == EventCategory::PointerDown {
        if let Some((x, y)) = event.position {
            let (cx, cy) = ctx.camera().offset();
            for entity in scene.entities_mut() {
                if !receives_input(entity, paused) || !entity.hooks().has_on_click() {
                    continue;
                }
                let cursor = if entity.props().gui {
                    Rect::point(x, y)
                } else {
                    Rect::point(x + cx, y + cy)
                };
                if is_inside(&cursor, &entity.rect()) {
                    tracing::trace!(entity = %entity.id(), "on_click");
                    with_hooks(entity, |hooks, entity| hooks.fire_click(entity, event, ctx))
                        .map_err(in_phase("on_click"))?;
                }
            }
        }
    }

    let phase = event.category.as_str();
    targets
        .hooks
        .fire_event(targets.vars, event, ctx)
        .map_err(in_phase(phase))?;

    if pause_eligible(scene.ignore_pause(), paused) {
        with_hooks(scene, |hooks, scene| hooks.fire_event(scene, event, ctx)).map_err(in_phase(phase))?;
    }

    for entity in scene.entities_mut() {
        if receives_input(entity, paused) && entity.hooks().has_event(event.category) {
            with_hooks(entity, |hooks, entity| hooks.fire_event(entity, event, ctx))
                .map_err(in_phase(phase))?;
        }
    }
    Ok(())
}
