//! Optional per-owner callback tables.
//!
//! Every owner (entity, scene, engine) carries a [`Hooks<T>`] table where
//! `T` is the owner itself. Each slot is optional; dispatch only checks for
//! presence, so an owner opts into a capability simply by registering it.
//!
//! While a hook runs, the table is taken out of its owner (see
//! [`with_hooks`]) so the closure can receive `&mut` to the whole owner
//! without aliasing its own storage.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::context::{Canvas, Context};
use crate::entity::Entity;
use crate::event::{EventCategory, InputEvent};

/// What every hook returns. Errors abort the current frame.
pub type HookResult = anyhow::Result<()>;

/// `on_load` and `update`.
pub type LifecycleHook<T> = Box<dyn FnMut(&mut T, &mut Context<'_>) -> HookResult>;
/// Free-form drawing after the built-in placement draw.
pub type DrawHook<T> = Box<dyn FnMut(&T, &mut Canvas<'_>) -> HookResult>;
/// Receives the new pause flag.
pub type PauseHook<T> = Box<dyn FnMut(&mut T, bool, &mut Context<'_>) -> HookResult>;
/// Per-category input handlers and `on_click`.
pub type EventHook<T> = Box<dyn FnMut(&mut T, &InputEvent, &mut Context<'_>) -> HookResult>;
/// Receives the other entity of an overlapping pair.
pub type CollideHook<T> = Box<dyn FnMut(&mut T, &Entity, &mut Context<'_>) -> HookResult>;
/// Named custom events with an optional JSON payload.
pub type CustomHook<T> = Box<dyn FnMut(&mut T, Option<&Value>, &mut Context<'_>) -> HookResult>;

/// Owners that carry a [`Hooks`] table of their own type.
pub trait HookOwner: Sized {
    fn hooks_mut(&mut self) -> &mut Hooks<Self>;
}

/// Run `f` with the owner's hook table detached from it.
///
/// Hooks registered on the owner while `f` runs are kept and take precedence
/// over the slots of the restored table.
pub fn with_hooks<T, R>(owner: &mut T, f: impl FnOnce(&mut Hooks<T>, &mut T) -> R) -> R
where
    T: HookOwner,
{
    let mut hooks = std::mem::take(owner.hooks_mut());
    let out = f(&mut hooks, owner);
    let added = std::mem::replace(owner.hooks_mut(), hooks);
    owner.hooks_mut().absorb(added);
    out
}

/// Callback table for one owner of type `T`.
pub struct Hooks<T> {
    on_load: Option<LifecycleHook<T>>,
    update: Option<LifecycleHook<T>>,
    draw: Option<DrawHook<T>>,
    on_pause: Option<PauseHook<T>>,
    on_click: Option<EventHook<T>>,
    on_collide: Option<CollideHook<T>>,
    events: HashMap<EventCategory, EventHook<T>>,
    custom: HashMap<String, CustomHook<T>>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            on_load: None,
            update: None,
            draw: None,
            on_pause: None,
            on_click: None,
            on_collide: None,
            events: HashMap::new(),
            custom: HashMap::new(),
        }
    }
}

impl<T> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<_> = self.events.keys().map(|c| c.as_str()).collect();
        events.sort_unstable();
        let mut custom: Vec<_> = self.custom.keys().map(String::as_str).collect();
        custom.sort_unstable();
        f.debug_struct("Hooks")
            .field("on_load", &self.on_load.is_some())
            .field("update", &self.update.is_some())
            .field("draw", &self.draw.is_some())
            .field("on_pause", &self.on_pause.is_some())
            .field("on_click", &self.on_click.is_some())
            .field("on_collide", &self.on_collide.is_some())
            .field("events", &events)
            .field("custom", &custom)
            .finish()
    }
}

impl<T> Hooks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    // -- registration -------------------------------------------------------

    pub fn set_on_load(&mut self, hook: impl FnMut(&mut T, &mut Context<'_>) -> HookResult + 'static) {
        self.on_load = Some(Box::new(hook));
    }

    pub fn set_update(&mut self, hook: impl FnMut(&mut T, &mut Context<'_>) -> HookResult + 'static) {
        self.update = Some(Box::new(hook));
    }

    pub fn set_draw(&mut self, hook: impl FnMut(&T, &mut Canvas<'_>) -> HookResult + 'static) {
        self.draw = Some(Box::new(hook));
    }

    pub fn set_on_pause(
        &mut self,
        hook: impl FnMut(&mut T, bool, &mut Context<'_>) -> HookResult + 'static,
    ) {
        self.on_pause = Some(Box::new(hook));
    }

    pub fn set_on_click(
        &mut self,
        hook: impl FnMut(&mut T, &InputEvent, &mut Context<'_>) -> HookResult + 'static,
    ) {
        self.on_click = Some(Box::new(hook));
    }

    pub fn set_on_collide(
        &mut self,
        hook: impl FnMut(&mut T, &Entity, &mut Context<'_>) -> HookResult + 'static,
    ) {
        self.on_collide = Some(Box::new(hook));
    }

    /// Handler for one input category. Replaces any previous one.
    pub fn set_event(
        &mut self,
        category: EventCategory,
        hook: impl FnMut(&mut T, &InputEvent, &mut Context<'_>) -> HookResult + 'static,
    ) {
        self.events.insert(category, Box::new(hook));
    }

    /// Handler for a named custom event. Replaces any previous one.
    pub fn set_custom(
        &mut self,
        name: impl Into<String>,
        hook: impl FnMut(&mut T, Option<&Value>, &mut Context<'_>) -> HookResult + 'static,
    ) {
        self.custom.insert(name.into(), Box::new(hook));
    }

    /// Move every slot of `newer` into `self`, overwriting on conflict.
    pub fn absorb(&mut self, newer: Hooks<T>) {
        let Hooks {
            on_load,
            update,
            draw,
            on_pause,
            on_click,
            on_collide,
            events,
            custom,
        } = newer;
        if on_load.is_some() {
            self.on_load = on_load;
        }
        if update.is_some() {
            self.update = update;
        }
        if draw.is_some() {
            self.draw = draw;
        }
        if on_pause.is_some() {
            self.on_pause = on_pause;
        }
        if on_click.is_some() {
            self.on_click = on_click;
        }
        if on_collide.is_some() {
            self.on_collide = on_collide;
        }
        self.events.extend(events);
        self.custom.extend(custom);
    }

    // -- presence -----------------------------------------------------------

    pub fn has_on_load(&self) -> bool {
        self.on_load.is_some()
    }

    pub fn has_update(&self) -> bool {
        self.update.is_some()
    }

    pub fn has_draw(&self) -> bool {
        self.draw.is_some()
    }

    pub fn has_on_click(&self) -> bool {
        self.on_click.is_some()
    }

    pub fn has_on_collide(&self) -> bool {
        self.on_collide.is_some()
    }

    pub fn has_event(&self, category: EventCategory) -> bool {
        self.events.contains_key(&category)
    }

    pub fn has_custom(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.on_load.is_none()
            && self.update.is_none()
            && self.draw.is_none()
            && self.on_pause.is_none()
            && self.on_click.is_none()
            && self.on_collide.is_none()
            && self.events.is_empty()
            && self.custom.is_empty()
    }

    // -- dispatch -----------------------------------------------------------
    //
    // Each `fire_*` is a no-op returning `Ok(())` when the slot is empty.

    pub fn fire_load(&mut self, owner: &mut T, ctx: &mut Context<'_>) -> HookResult {
        match self.on_load.as_mut() {
            Some(hook) => hook(owner, ctx),
            None => Ok(()),
        }
    }

    pub fn fire_update(&mut self, owner: &mut T, ctx: &mut Context<'_>) -> HookResult {
        match self.update.as_mut() {
            Some(hook) => hook(owner, ctx),
            None => Ok(()),
        }
    }

    pub fn fire_draw(&mut self, owner: &T, canvas: &mut Canvas<'_>) -> HookResult {
        match self.draw.as_mut() {
            Some(hook) => hook(owner, canvas),
            None => Ok(()),
        }
    }

    pub fn fire_pause(&mut self, owner: &mut T, paused: bool, ctx: &mut Context<'_>) -> HookResult {
        match self.on_pause.as_mut() {
            Some(hook) => hook(owner, paused, ctx),
            None => Ok(()),
        }
    }

    pub fn fire_click(&mut self, owner: &mut T, event: &InputEvent, ctx: &mut Context<'_>) -> HookResult {
        match self.on_click.as_mut() {
            Some(hook) => hook(owner, event, ctx),
            None => Ok(()),
        }
    }

    pub fn fire_collide(&mut self, owner: &mut T, other: &Entity, ctx: &mut Context<'_>) -> HookResult {
        match self.on_collide.as_mut() {
            Some(hook) => hook(owner, other, ctx),
            None => Ok(()),
        }
    }

    pub fn fire_event(&mut self, owner: &mut T, event: &InputEvent, ctx: &mut Context<'_>) -> HookResult {
        match self.events.get_mut(&event.category) {
            Some(hook) => hook(owner, event, ctx),
            None => Ok(()),
        }
    }

    pub fn fire_custom(
        &mut self,
        owner: &mut T,
        name: &str,
        payload: Option<&Value>,
        ctx: &mut Context<'_>,
    ) -> HookResult {
        match self.custom.get_mut(name) {
            Some(hook) => hook(owner, payload, ctx),
            None => Ok(()),
        }
    }
}
