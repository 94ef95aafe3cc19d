//! Named, z-ordered entity collections.
//!
//! A [`Scene`] stores its entities in a `Vec` kept in ascending `z` order
//! (stable on ties, so equal depths keep insertion order) plus a name index
//! rebuilt after every structural change. That order is the draw order and
//! the dispatch order for updates, input and collisions.
//!
//! # Reset
//!
//! A scene remembers a roster: the names of the entities that make up the
//! level before play starts. [`Scene::reset`] drops every entity outside
//! the roster (spawned bullets, anything the scene's `on_load` built), lets
//! `on_load` lay the level out again and resets the roster entities to their
//! snapshots. The roster is the set of entities present when the scene is
//! bound plus any name passed to [`Scene::keep_on_reset`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::context::{Canvas, Context};
use crate::entity::{Entity, EntityId};
use crate::event::{EventCategory, InputEvent};
use crate::hooks::{with_hooks, HookOwner, HookResult, Hooks};
use crate::{SceneError, Vars};

/// Seed for anonymous entity names; fixed so runs are reproducible.
const NAME_SEED: u64 = 0x7e55_e100;

/// The resettable part of a scene.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneState {
    /// Keep running scene hooks while the engine is paused.
    pub ignore_pause: bool,
    pub vars: Vars,
}

/// One game screen or level.
pub struct Scene {
    name: Option<String>,
    state: SceneState,
    initial: SceneState,
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    roster: HashSet<String>,
    hooks: Hooks<Scene>,
    rng: Pcg32,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("entities", &self.names().collect::<Vec<_>>())
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl HookOwner for Scene {
    fn hooks_mut(&mut self) -> &mut Hooks<Self> {
        &mut self.hooks
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_state(SceneState::default())
    }

    /// A scene whose reset snapshot is `state`.
    pub fn with_state(state: SceneState) -> Self {
        Self {
            name: None,
            initial: state.clone(),
            state,
            entities: Vec::new(),
            index: HashMap::new(),
            roster: HashSet::new(),
            hooks: Hooks::new(),
            rng: Pcg32::seed_from_u64(NAME_SEED),
        }
    }

    /// Registration name; `None` until bound.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Bind the scene to `name` and propagate it to every entity's scene
    /// reference. The entities present now join the reset roster. Called by
    /// the engine on registration, before the scene's `on_load`.
    pub fn bind(&mut self, name: impl Into<String>) {
        let name = name.into();
        for entity in &mut self.entities {
            entity.bind_scene(Some(name.clone()));
            if let Some(entity_name) = entity.name() {
                self.roster.insert(entity_name.to_owned());
            }
        }
        self.name = Some(name);
    }

    /// Keep the entity registered as `name` across [`reset`](Self::reset).
    pub fn keep_on_reset(&mut self, name: impl Into<String>) {
        self.roster.insert(name.into());
    }

    /// Whether `name` survives [`reset`](Self::reset).
    pub fn is_kept_on_reset(&self, name: &str) -> bool {
        self.roster.contains(name)
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    pub fn ignore_pause(&self) -> bool {
        self.state.ignore_pause
    }

    pub fn set_ignore_pause(&mut self, ignore_pause: bool) {
        self.state.ignore_pause = ignore_pause;
    }

    pub fn vars(&self) -> &Vars {
        &self.state.vars
    }

    pub fn vars_mut(&mut self) -> &mut Vars {
        &mut self.state.vars
    }

    pub fn hooks(&self) -> &Hooks<Scene> {
        &self.hooks
    }

    /// Reseed the anonymous-name generator.
    pub fn set_name_seed(&mut self, seed: u64) {
        self.rng = Pcg32::seed_from_u64(seed);
    }

    // -- registration -------------------------------------------------------

    /// Register `entity` as `name`, replacing any entity already under that
    /// name, then fire its `on_load`.
    pub fn add_entity(
        &mut self,
        name: impl Into<String>,
        mut entity: Entity,
        ctx: &mut Context<'_>,
    ) -> HookResult {
        let name = name.into();
        if let Some(&old) = self.index.get(&name) {
            tracing::debug!(entity = %name, "replacing entity with the same name");
            self.entities.remove(old).unbind();
        }
        entity.bind(name.clone(), self.name.clone());
        self.entities.push(entity);
        self.sort_by_depth();
        tracing::debug!(entity = %name, scene = ?self.name, count = self.entities.len(), "entity added");

        let result = match self.index.get(&name) {
            Some(&i) => self.entities[i].load(ctx),
            None => Ok(()),
        };
        self.sort_if_needed();
        result
    }

    /// Register `entity` under a freshly generated UUID-style name.
    ///
    /// Returns the generated name.
    pub fn add_anonymous_entity(
        &mut self,
        entity: Entity,
        ctx: &mut Context<'_>,
    ) -> anyhow::Result<String> {
        let name = self.generate_name();
        self.add_entity(name.clone(), entity, ctx)?;
        Ok(name)
    }

    fn generate_name(&mut self) -> String {
        loop {
            let bits: u128 = self.rng.gen();
            // Version 4, RFC 4122 variant.
            let bits = (bits & !(0xF << 76)) | (0x4 << 76);
            let bits = (bits & !(0x3 << 62)) | (0x2 << 62);
            let name = format!(
                "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
                bits >> 96,
                (bits >> 80) & 0xFFFF,
                (bits >> 64) & 0xFFFF,
                (bits >> 48) & 0xFFFF,
                bits & 0xFFFF_FFFF_FFFF
            );
            if !self.index.contains_key(&name) {
                return name;
            }
        }
    }

    /// Detach and return the entity registered as `name`.
    ///
    /// # Errors
    ///
    /// [`SceneError::NotFound`] if no entity has that name.
    pub fn remove_entity(&mut self, name: &str) -> Result<Entity, SceneError> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| SceneError::not_found("entity", name))?;
        let mut entity = self.entities.remove(i);
        entity.unbind();
        self.rebuild_index();
        tracing::debug!(entity = %name, scene = ?self.name, "entity removed");
        Ok(entity)
    }

    // -- lookup -------------------------------------------------------------

    /// # Errors
    ///
    /// [`SceneError::NotFound`] if no entity has that name.
    pub fn entity(&self, name: &str) -> Result<&Entity, SceneError> {
        self.index
            .get(name)
            .map(|&i| &self.entities[i])
            .ok_or_else(|| SceneError::not_found("entity", name))
    }

    /// # Errors
    ///
    /// [`SceneError::NotFound`] if no entity has that name.
    pub fn entity_mut(&mut self, name: &str) -> Result<&mut Entity, SceneError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.entities[i]),
            None => Err(SceneError::not_found("entity", name)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entities in z-order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entities in z-order. Depth edits through this slice take effect at
    /// the next [`sort_if_needed`](Self::sort_if_needed).
    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    /// Entity names in z-order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().filter_map(Entity::name)
    }

    /// Every entity carrying `tag`, in z-order.
    pub fn entities_by_tag(&self, tag: &str) -> Vec<&Entity> {
        self.entities.iter().filter(|e| e.has_tag(tag)).collect()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    // -- ordering -----------------------------------------------------------

    /// Stable sort by ascending `z`, then rebuild the name index.
    pub fn sort_by_depth(&mut self) {
        self.entities.sort_by(|a, b| a.props().z.total_cmp(&b.props().z));
        for entity in &mut self.entities {
            entity.take_depth_dirty();
        }
        self.rebuild_index();
    }

    /// Re-sort if any entity changed depth or the order is no longer
    /// ascending. Returns whether a sort happened.
    pub fn sort_if_needed(&mut self) -> bool {
        let mut dirty = false;
        for entity in &mut self.entities {
            dirty |= entity.take_depth_dirty();
        }
        let ordered = self
            .entities
            .windows(2)
            .all(|w| w[0].props().z.total_cmp(&w[1].props().z).is_le());
        if dirty || !ordered {
            self.sort_by_depth();
            true
        } else {
            false
        }
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, entity) in self.entities.iter().enumerate() {
            if let Some(name) = entity.name() {
                self.index.insert(name.to_owned(), i);
            }
        }
    }

    // -- lifecycle ----------------------------------------------------------

    /// Fire the scene's own `on_load`.
    pub fn load(&mut self, ctx: &mut Context<'_>) -> HookResult {
        tracing::trace!(scene = ?self.name, "scene on_load");
        with_hooks(self, |hooks, scene| hooks.fire_load(scene, ctx))
    }

    /// Restore the scene snapshot and drop every entity outside the roster,
    /// fire `on_load`, reset the roster entities (each fires its own
    /// `on_load` once), then re-sort.
    ///
    /// Roster entities removed during play are not brought back.
    pub fn reset(&mut self, ctx: &mut Context<'_>) -> HookResult {
        self.state.clone_from(&self.initial);
        let before = self.entities.len();
        let roster = &self.roster;
        self.entities
            .retain(|entity| entity.name().is_some_and(|name| roster.contains(name)));
        self.rebuild_index();
        let kept: HashSet<EntityId> = self.entities.iter().map(Entity::id).collect();
        tracing::debug!(scene = ?self.name, dropped = before - kept.len(), "scene roster restored");

        self.load(ctx)?;
        for entity in &mut self.entities {
            if kept.contains(&entity.id()) {
                entity.reset(ctx)?;
            }
        }
        self.sort_by_depth();
        tracing::debug!(scene = ?self.name, entities = self.entities.len(), "scene reset");
        Ok(())
    }

    // -- hook registration --------------------------------------------------

    pub fn on_load(mut self, hook: impl FnMut(&mut Scene, &mut Context<'_>) -> HookResult + 'static) -> Self {
        self.hooks.set_on_load(hook);
        self
    }

    pub fn on_update(mut self, hook: impl FnMut(&mut Scene, &mut Context<'_>) -> HookResult + 'static) -> Self {
        self.hooks.set_update(hook);
        self
    }

    pub fn on_draw(mut self, hook: impl FnMut(&Scene, &mut Canvas<'_>) -> HookResult + 'static) -> Self {
        self.hooks.set_draw(hook);
        self
    }

    pub fn on_pause(
        mut self,
        hook: impl FnMut(&mut Scene, bool, &mut Context<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.set_on_pause(hook);
        self
    }

    pub fn on_event(
        mut self,
        category: EventCategory,
        hook: impl FnMut(&mut Scene, &InputEvent, &mut Context<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.set_event(category, hook);
        self
    }

    pub fn on_custom(
        mut self,
        name: impl Into<String>,
        hook: impl FnMut(&mut Scene, Option<&serde_json::Value>, &mut Context<'_>) -> HookResult + 'static,
    ) -> Self {
        self.hooks.set_custom(name, hook);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::camera::{Camera, CameraConfig};
    use crate::command::CommandBuffer;
    use crate::context::FrameInfo;
    use crate::entity::EntityProps;

    struct Harness {
        frame: FrameInfo,
        camera: Camera,
        commands: CommandBuffer,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                frame: FrameInfo::default(),
                camera: Camera::new(CameraConfig::default(), (640.0, 480.0)).unwrap(),
                commands: CommandBuffer::new(),
            }
        }

        fn ctx(&mut self) -> Context<'_> {
            Context::new(&self.frame, &mut self.camera, &mut self.commands)
        }
    }

    fn at_depth(z: f64) -> Entity {
        Entity::new(EntityProps {
            z,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn z_order_is_stable() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        for (i, z) in [2.0, 1.0, 2.0, 0.0].into_iter().enumerate() {
            scene.add_entity(format!("e{i}"), at_depth(z), &mut h.ctx()).unwrap();
        }
        let names: Vec<_> = scene.names().collect();
        assert_eq!(names, ["e3", "e1", "e0", "e2"]);
    }

    #[test]
    fn add_binds_and_fires_load() {
        let mut h = Harness::new();
        let loads = Rc::new(Cell::new(0));
        let counter = Rc::clone(&loads);
        let mut scene = Scene::new();
        scene.bind("level");
        let e = at_depth(0.0).on_load(move |_, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        scene.add_entity("hero", e, &mut h.ctx()).unwrap();

        let hero = scene.entity("hero").unwrap();
        assert_eq!(hero.name(), Some("hero"));
        assert_eq!(hero.scene(), Some("level"));
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn same_name_overwrites() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        scene.add_entity("a", at_depth(0.0), &mut h.ctx()).unwrap();
        let second = at_depth(5.0);
        let second_id = second.id();
        scene.add_entity("a", second, &mut h.ctx()).unwrap();

        assert_eq!(scene.len(), 1);
        assert_eq!(scene.entity("a").unwrap().id(), second_id);
    }

    #[test]
    fn remove_unbinds_and_missing_is_not_found() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        scene.bind("s");
        scene.add_entity("a", at_depth(0.0), &mut h.ctx()).unwrap();
        scene.add_entity("b", at_depth(1.0), &mut h.ctx()).unwrap();

        let a = scene.remove_entity("a").unwrap();
        assert_eq!(a.name(), None);
        assert_eq!(a.scene(), None);
        assert_eq!(scene.entity("b").unwrap().name(), Some("b"));
        assert!(matches!(
            scene.remove_entity("a"),
            Err(SceneError::NotFound { kind: "entity", .. })
        ));
        assert!(scene.entity("a").is_err());
    }

    #[test]
    fn anonymous_names_are_uuid_shaped_and_unique() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        let a = scene.add_anonymous_entity(at_depth(0.0), &mut h.ctx()).unwrap();
        let b = scene.add_anonymous_entity(at_depth(0.0), &mut h.ctx()).unwrap();

        assert_ne!(a, b);
        for name in [&a, &b] {
            let groups: Vec<_> = name.split('-').map(str::len).collect();
            assert_eq!(groups, [8, 4, 4, 4, 12]);
            assert_eq!(name.as_bytes()[14], b'4');
        }
        assert!(scene.contains(&a) && scene.contains(&b));
    }

    #[test]
    fn by_tag_returns_z_order() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        let mut high = at_depth(9.0);
        high.add_tag("enemy");
        let mut low = at_depth(-1.0);
        low.add_tag("enemy");
        scene.add_entity("high", high, &mut h.ctx()).unwrap();
        scene.add_entity("plain", at_depth(0.0), &mut h.ctx()).unwrap();
        scene.add_entity("low", low, &mut h.ctx()).unwrap();

        let names: Vec<_> = scene
            .entities_by_tag("enemy")
            .into_iter()
            .filter_map(Entity::name)
            .collect();
        assert_eq!(names, ["low", "high"]);
        assert!(scene.entities_by_tag("missing").is_empty());
    }

    #[test]
    fn set_depth_resorts_on_demand() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        scene.add_entity("a", at_depth(0.0), &mut h.ctx()).unwrap();
        scene.add_entity("b", at_depth(1.0), &mut h.ctx()).unwrap();

        scene.entity_mut("a").unwrap().set_depth(2.0);
        assert!(scene.sort_if_needed());
        assert_eq!(scene.names().collect::<Vec<_>>(), ["b", "a"]);
        assert!(!scene.sort_if_needed());
    }

    #[test]
    fn depth_change_in_on_load_is_sorted() {
        let mut h = Harness::new();
        let mut scene = Scene::new();
        scene.add_entity("a", at_depth(1.0), &mut h.ctx()).unwrap();
        let sinker = at_depth(5.0).on_load(|e, _| {
            e.set_depth(-5.0);
            Ok(())
        });
        scene.add_entity("b", sinker, &mut h.ctx()).unwrap();
        assert_eq!(scene.names().collect::<Vec<_>>(), ["b", "a"]);
    }

    #[test]
    fn reset_restores_state_and_entities() {
        let mut h = Harness::new();
        let scene_loads = Rc::new(Cell::new(0));
        let entity_loads = Rc::new(Cell::new(0));
        let (sl, el) = (Rc::clone(&scene_loads), Rc::clone(&entity_loads));

        let mut scene = Scene::with_state(SceneState {
            ignore_pause: true,
            vars: Vars::new(),
        })
        .on_load(move |_, _| {
            sl.set(sl.get() + 1);
            Ok(())
        });
        let e = Entity::new(EntityProps {
            x: 3.0,
            z: 1.0,
            ..Default::default()
        })
        .unwrap()
        .on_load(move |_, _| {
            el.set(el.get() + 1);
            Ok(())
        });
        scene.add_entity("e", e, &mut h.ctx()).unwrap();
        scene.add_entity("f", at_depth(2.0), &mut h.ctx()).unwrap();
        scene.bind("level");
        entity_loads.set(0);

        scene.set_ignore_pause(false);
        scene.vars_mut().insert("score".into(), 10.into());
        scene.entity_mut("e").unwrap().set_position(99.0, 99.0);
        scene.entity_mut("e").unwrap().set_depth(10.0);

        scene.reset(&mut h.ctx()).unwrap();

        assert!(scene.ignore_pause());
        assert!(scene.vars().is_empty());
        assert_eq!(scene.entity("e").unwrap().props().x, 3.0);
        assert_eq!(scene.names().collect::<Vec<_>>(), ["e", "f"]);
        assert_eq!(scene_loads.get(), 1);
        assert_eq!(entity_loads.get(), 1);
    }

    #[test]
    fn reset_drops_extras_and_rebuilds_the_layout() {
        let mut h = Harness::new();
        let built = Rc::new(Cell::new(0));
        let counter = Rc::clone(&built);
        let mut scene = Scene::new().on_load(move |scene, ctx| {
            counter.set(counter.get() + 1);
            scene.add_anonymous_entity(at_depth(0.0), ctx)?;
            Ok(())
        });
        scene.add_entity("wall", at_depth(1.0), &mut h.ctx()).unwrap();
        scene.bind("level");
        scene.load(&mut h.ctx()).unwrap();
        scene.add_entity("bullet", at_depth(2.0), &mut h.ctx()).unwrap();
        assert_eq!(scene.len(), 3);
        assert!(scene.is_kept_on_reset("wall"));
        assert!(!scene.is_kept_on_reset("bullet"));

        scene.reset(&mut h.ctx()).unwrap();
        assert_eq!(scene.len(), 2);
        assert!(scene.contains("wall"));
        assert!(!scene.contains("bullet"));
        assert_eq!(built.get(), 2);

        scene.keep_on_reset("bullet");
        scene.add_entity("bullet", at_depth(2.0), &mut h.ctx()).unwrap();
        scene.reset(&mut h.ctx()).unwrap();
        assert_eq!(scene.len(), 3);
        assert!(scene.contains("bullet"));
    }
}
