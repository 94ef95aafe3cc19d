//! Positioned, tagged, drawable game objects.
//!
//! An [`Entity`] is a bag of [`EntityProps`] plus an identity, an optional
//! name/scene binding assigned on registration, and a [`Hooks`] table. The
//! props given to [`Entity::new`] are kept as the initial snapshot that
//! [`Entity::reset`] restores.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::camera::Camera;
use crate::color::Color;
use crate::context::{Canvas, Context};
use crate::event::{EventCategory, InputEvent};
use crate::geometry::Rect;
use crate::hooks::{with_hooks, HookOwner, HookResult, Hooks};
use crate::render::{Font, ImageHandle, Placement};
use crate::{SceneError, Vars};

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Opaque, process-unique entity identity.
///
/// Ids are never reused and survive [`Entity::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl EntityId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// An image drawn on top of the entity's base rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    pub handle: ImageHandle,
    pub width: f64,
    pub height: f64,
    pub alpha: u8,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees, counter-clockwise.
    pub rotation: f64,
}

impl ImageLayer {
    /// Layer showing `handle` at its native size, opaque, unscaled.
    pub fn new(handle: ImageHandle) -> Self {
        let (w, h) = handle.native_size();
        Self {
            handle,
            width: f64::from(w),
            height: f64::from(h),
            alpha: 255,
            offset_x: 0.0,
            offset_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }

    /// Set the drawn size. A `None` side falls back to the native size.
    pub fn set_size(&mut self, width: Option<f64>, height: Option<f64>) {
        let (native_w, native_h) = self.handle.native_size();
        self.width = width.unwrap_or(f64::from(native_w));
        self.height = height.unwrap_or(f64::from(native_h));
    }

    /// Set the width; the height reverts to native.
    pub fn set_width(&mut self, width: f64) {
        self.set_size(Some(width), None);
    }

    /// Set the height; the width reverts to native.
    pub fn set_height(&mut self, height: f64) {
        self.set_size(None, Some(height));
    }

    /// Update the offsets that are `Some`, leave the others.
    pub fn set_offset(&mut self, offset_x: Option<f64>, offset_y: Option<f64>) {
        if let Some(x) = offset_x {
            self.offset_x = x;
        }
        if let Some(y) = offset_y {
            self.offset_y = y;
        }
    }

    pub fn set_offset_x(&mut self, offset_x: f64) {
        self.set_offset(Some(offset_x), None);
    }

    pub fn set_offset_y(&mut self, offset_y: f64) {
        self.set_offset(None, Some(offset_y));
    }

    pub fn set_alpha(&mut self, alpha: u8) {
        self.alpha = alpha;
    }
}

/// A text label drawn on top of the entity's base rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    pub text: String,
    pub font_size: f64,
    pub font_color: Color,
    pub font_alpha: u8,
    pub font_family: String,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for TextLayer {
    fn default() -> Self {
        Self {
            text: "Text".to_owned(),
            font_size: 10.0,
            font_color: Color::WHITE,
            font_alpha: 255,
            font_family: "Arial".to_owned(),
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl TextLayer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn font(&self) -> Font {
        Font {
            family: self.font_family.clone(),
            size: self.font_size,
        }
    }
}

/// Optional rendering overlay carried by an entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Layer {
    #[default]
    None,
    Image(ImageLayer),
    Text(TextLayer),
}

// ---------------------------------------------------------------------------
// EntityProps
// ---------------------------------------------------------------------------

/// Every resettable entity field.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityProps {
    pub x: f64,
    pub y: f64,
    /// Draw, update and dispatch order key. Lower goes first.
    pub z: f64,
    pub width: f64,
    pub height: f64,
    pub color: Color,
    pub alpha: u8,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees, counter-clockwise.
    pub rotation: f64,
    pub tags: Vec<String>,
    /// Screen-space: ignores the camera and never collides.
    pub gui: bool,
    pub ignore_pause: bool,
    /// Receives updates, input and collisions.
    pub active: bool,
    /// Receives draw calls.
    pub visible: bool,
    pub layer: Layer,
    pub vars: Vars,
}

impl Default for EntityProps {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            width: 10.0,
            height: 10.0,
            color: Color::WHITE,
            alpha: 255,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            tags: Vec::new(),
            gui: false,
            ignore_pause: false,
            active: true,
            visible: true,
            layer: Layer::None,
            vars: Vars::new(),
        }
    }
}

fn validate_size(width: f64, height: f64) -> Result<(), SceneError> {
    if width >= 0.0 && height >= 0.0 {
        Ok(())
    } else {
        Err(SceneError::InvalidArgument(format!(
            "entity size must be non-negative, got {width}x{height}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A game object.
pub struct Entity {
    id: EntityId,
    name: Option<String>,
    scene: Option<String>,
    props: EntityProps,
    initial: EntityProps,
    hooks: Hooks<Entity>,
    depth_dirty: bool,
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("scene", &self.scene)
            .field("props", &self.props)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl HookOwner for Entity {
    fn hooks_mut(&mut self) -> &mut Hooks<Self> {
        &mut self.hooks
    }
}

impl Entity {
    /// Create a detached entity. `props` becomes the reset snapshot.
    ///
    /// # Errors
    ///
    /// [`SceneError::InvalidArgument`] if the width or height is negative.
    pub fn new(props: EntityProps) -> Result<Self, SceneError> {
        validate_size(props.width, props.height)?;
        Ok(Self {
            id: EntityId::next(),
            name: None,
            scene: None,
            initial: props.clone(),
            props,
            hooks: Hooks::new(),
            depth_dirty: false,
        })
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Registration name; `None` while detached.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name of the owning scene, if it has one.
    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.name.is_some()
    }

    pub(crate) fn bind(&mut self, name: String, scene: Option<String>) {
        self.name = Some(name);
        self.scene = scene;
    }

    pub(crate) fn bind_scene(&mut self, scene: Option<String>) {
        self.scene = scene;
    }

    pub(crate) fn unbind(&mut self) {
        self.name = None;
        self.scene = None;
    }

    pub fn props(&self) -> &EntityProps {
        &self.props
    }

    /// Direct field access. Depth changes made here are picked up by the
    /// owning scene's next re-sort.
    pub fn props_mut(&mut self) -> &mut EntityProps {
        &mut self.props
    }

    /// The construction-time snapshot.
    pub fn initial(&self) -> &EntityProps {
        &self.initial
    }

    pub fn hooks(&self) -> &Hooks<Entity> {
        &self.hooks
    }

    // -- geometry -----------------------------------------------------------

    /// Unscaled bounds used for collision and click tests.
    pub fn rect(&self) -> Rect {
        Rect::new(self.props.x, self.props.y, self.props.width, self.props.height)
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.props.x = x;
        self.props.y = y;
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.props.x += dx;
        self.props.y += dy;
    }

    /// Change `z` and ask the owning scene to re-sort.
    pub fn set_depth(&mut self, z: f64) {
        self.props.z = z;
        self.depth_dirty = true;
    }

    pub(crate) fn take_depth_dirty(&mut self) -> bool {
        std::mem::take(&mut self.depth_dirty)
    }

    /// # Errors
    ///
    /// [`SceneError::InvalidArgument`] if either side is negative.
    pub fn set_size(&mut self, width: f64, height: f64) -> Result<(), SceneError> {
        validate_size(width, height)?;
        self.props.width = width;
        self.props.height = height;
        Ok(())
    }

    // -- tags ---------------------------------------------------------------

    /// Append `tag` and return it.
    pub fn add_tag(&mut self, tag: impl Into<String>) -> &str {
        self.props.tags.push(tag.into());
        self.props.tags.last().map_or("", String::as_str)
    }

    /// Remove the first occurrence of `tag`.
    ///
    /// # Errors
    ///
    /// [`SceneError::NotFound`] if the entity does not carry `tag`.
    pub fn remove_tag(&mut self, tag: &str) -> Result<String, SceneError> {
        let index = self
            .props
            .tags
            .iter()
            .position(|t| t == tag)
            .ok_or_else(|| SceneError::not_found("tag", tag))?;
        Ok(self.props.tags.remove(index))
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.props.tags.iter().any(|t| t == tag)
    }

    pub fn tags(&self) -> &[String] {
        &self.props.tags
    }

    // -- reset --------------------------------------------------------------

    /// Restore the snapshot without firing any hook.
    ///
    /// Identity, name, scene binding and hooks are kept.
    pub fn restore_initial(&mut self) {
        if self.props.z != self.initial.z {
            self.depth_dirty = true;
        }
        self.props.clone_from(&self.initial);
    }

    /// Restore the snapshot, then fire `on_load`.
    pub fn reset(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.restore_initial();
        self.load(ctx)
    }

    /// Fire `on_load`, if registered.
    pub fn load(&mut self, ctx: &mut Context<'_>) -> HookResult {
        tracing::trace!(entity = %self.id, name = ?self.name, "on_load");
        with_hooks(self, |hooks, entity| hooks.fire_load(entity, ctx))
    }

    // -- placement ----------------------------------------------------------

    fn screen_origin(&self, camera: &Camera) -> (f64, f64) {
        if self.props.gui {
            (self.props.x, self.props.y)
        } else {
            let (cx, cy) = camera.offset();
            (self.props.x - cx, self.props.y - cy)
        }
    }

    /// Where the base rectangle is drawn. World-space entities subtract the
    /// camera offset; `gui` entities are already in screen space.
    pub fn render_placement(&self, camera: &Camera) -> Placement {
        let (x, y) = self.screen_origin(camera);
        Placement {
            x,
            y,
            width: self.props.width,
            height: self.props.height,
            scale_x: self.props.scale_x,
            scale_y: self.props.scale_y,
            rotation: self.props.rotation,
        }
    }

    /// Placement of the image overlay, if the entity carries one.
    pub fn image_placement(&self, camera: &Camera) -> Option<Placement> {
        let Layer::Image(image) = &self.props.layer else {
            return None;
        };
        let (x, y) = self.screen_origin(camera);
        Some(Placement {
            x: x + image.offset_x,
            y: y + image.offset_y,
            width: image.width,
            height: image.height,
            scale_x: image.scale_x,
            scale_y: image.scale_y,
            rotation: image.rotation,
        })
    }

    /// Placement of the text overlay, if the entity carries one.
    pub fn text_placement(&self, camera: &Camera) -> Option<Placement> {
        let Layer::Text(text) = &self.props.layer else {
            return None;
        };
        let (x, y) = self.screen_origin(camera);
        Some(Placement::at(
            x + text.offset_x,
            y + text.offset_y,
            self.props.width,
            self.props.height,
        ))
    }

    // -- hook registration --------------------------------------------------

    /// Fired on registration and after every reset.
    pub fn on_load(mut self, hook: impl FnMut(&mut Entity, &mut Context<'_>) -> HookResult + 'static) -> Self {
        self.hooks.set_on_load(hook);
        self
    }

    pub fn on_update(mut self, hook: impl FnMut(&mut Entity, &mut Context<'_>) -> HookResult + 'static) -> Self {
        self.hooks.set_update(hook);
        self
    }

    pub fn on_draw(mut self, hook: impl FnMut(&Entity, &mut Canvas<'_>) -> HookResult + 'static) -> Self {
        self.hooks.set_draw(hook);
        self
    }

    pub fn on_click(
        mut self,
        hook: impl FnMut(&mut Entity, &InputEvent, &mut Context<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.set_on_click(hook);
        self
    }

    pub fn on_collide(
        mut self,
        hook: impl FnMut(&mut Entity, &Entity, &mut Context<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.set_on_collide(hook);
        self
    }

    pub fn on_pause(
        mut self,
        hook: impl FnMut(&mut Entity, bool, &mut Context<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.set_on_pause(hook);
        self
    }

    pub fn on_event(
        mut self,
        category: EventCategory,
        hook: impl FnMut(&mut Entity, &InputEvent, &mut Context<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.set_event(category, hook);
        self
    }

    pub fn on_custom(
        mut self,
        name: impl Into<String>,
        hook: impl FnMut(&mut Entity, Option<&serde_json::Value>, &mut Context<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.set_custom(name, hook);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
