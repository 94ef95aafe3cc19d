//! Pause gating: which hooks run, which collisions are reported and who is
//! told about pause changes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use tessel_engine::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;

fn headless(config: EngineConfig) -> Engine {
    Engine::new(EngineConfig {
        headless: true,
        ..config
    })
    .unwrap()
}

fn entity(x: f64, z: f64, ignore_pause: bool) -> Entity {
    Entity::new(EntityProps {
        x,
        z,
        ignore_pause,
        ..Default::default()
    })
    .unwrap()
}

fn logging_update(entity: Entity, log: &Log, label: &'static str) -> Entity {
    let log = Rc::clone(log);
    entity.on_update(move |_, _| {
        log.borrow_mut().push(label.to_owned());
        Ok(())
    })
}

fn step(engine: &mut Engine, renderer: &mut RecordingRenderer) {
    engine.frame(Vec::new(), renderer, Duration::ZERO).unwrap();
}

// ---------------------------------------------------------------------------
// Update gating
// ---------------------------------------------------------------------------

#[test]
fn paused_frame_runs_only_eligible_updates() {
    let log: Log = Rc::default();
    let mut engine = headless(EngineConfig::default());

    let l = Rc::clone(&log);
    engine.on_update(move |_, _| {
        l.borrow_mut().push("engine".to_owned());
        Ok(())
    });
    let l = Rc::clone(&log);
    let scene = Scene::new().on_update(move |_, _| {
        l.borrow_mut().push("scene".to_owned());
        Ok(())
    });
    engine.set_scene("default", scene).unwrap();
    engine
        .add_entity("default", "frozen", logging_update(entity(0.0, 0.0, false), &log, "frozen"))
        .unwrap();
    engine
        .add_entity("default", "menu", logging_update(entity(50.0, 1.0, true), &log, "menu"))
        .unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    engine.set_pause(true).unwrap();
    step(&mut engine, &mut renderer);
    assert_eq!(*log.borrow(), ["engine", "menu"]);
    assert_eq!(renderer.rects().len(), 2, "paused entities are still drawn");

    log.borrow_mut().clear();
    engine.set_pause(false).unwrap();
    step(&mut engine, &mut renderer);
    assert_eq!(*log.borrow(), ["engine", "scene", "frozen", "menu"]);
}

#[test]
fn scene_ignoring_pause_keeps_updating() {
    let updates = Rc::new(Cell::new(0));
    let counter = Rc::clone(&updates);
    let mut engine = headless(EngineConfig::default());
    let mut scene = Scene::new().on_update(move |_, _| {
        counter.set(counter.get() + 1);
        Ok(())
    });
    scene.set_ignore_pause(true);
    engine.set_scene("hud", scene).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    engine.set_pause(true).unwrap();
    step(&mut engine, &mut renderer);
    step(&mut engine, &mut renderer);
    assert_eq!(updates.get(), 2);
}

#[test]
fn toggle_pause_from_a_key_handler() {
    let mut engine = headless(EngineConfig::default());
    engine.on_event(EventCategory::KeyDown, |_, event, ctx| {
        if event.is_key_down("p") {
            ctx.toggle_pause();
        }
        Ok(())
    });

    let mut renderer = RecordingRenderer::new(640, 480);
    engine.frame(vec![InputEvent::key_down("p")], &mut renderer, Duration::ZERO).unwrap();
    assert!(engine.paused());
    assert!(engine.frame_info().paused);
    engine.frame(vec![InputEvent::key_down("p")], &mut renderer, Duration::ZERO).unwrap();
    assert!(!engine.paused());
}

// ---------------------------------------------------------------------------
// Collisions while paused
// ---------------------------------------------------------------------------

fn collision_counts(runner_z: f64, frozen_z: f64) -> (u32, u32) {
    let runner_hits = Rc::new(Cell::new(0));
    let frozen_hits = Rc::new(Cell::new(0));
    let mut engine = headless(EngineConfig::default());

    let hits = Rc::clone(&runner_hits);
    let runner = entity(0.0, runner_z, true).on_collide(move |_, _, _| {
        hits.set(hits.get() + 1);
        Ok(())
    });
    let hits = Rc::clone(&frozen_hits);
    let frozen = entity(4.0, frozen_z, false).on_collide(move |_, _, _| {
        hits.set(hits.get() + 1);
        Ok(())
    });
    engine.add_entity("default", "runner", runner).unwrap();
    engine.add_entity("default", "frozen", frozen).unwrap();

    engine.set_pause(true).unwrap();
    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer);
    (runner_hits.get(), frozen_hits.get())
}

#[test]
fn only_the_eligible_side_hears_a_paused_collision() {
    assert_eq!(collision_counts(0.0, 1.0), (1, 0));
    assert_eq!(collision_counts(1.0, 0.0), (1, 0));
}

#[test]
fn two_frozen_entities_never_collide_while_paused() {
    let hits = Rc::new(Cell::new(0));
    let mut engine = headless(EngineConfig::default());
    for (name, x) in [("a", 0.0), ("b", 3.0)] {
        let counter = Rc::clone(&hits);
        let e = entity(x, 0.0, false).on_collide(move |_, _, _| {
            counter.set(counter.get() + 1);
            Ok(())
        });
        engine.add_entity("default", name, e).unwrap();
    }
    engine.set_pause(true).unwrap();
    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer);
    assert_eq!(hits.get(), 0);
}

// ---------------------------------------------------------------------------
// Pause notifications
// ---------------------------------------------------------------------------

#[test]
fn pause_notifications_reach_eligible_levels_in_order() {
    let log: Log = Rc::default();
    let mut engine = headless(EngineConfig::default());

    let l = Rc::clone(&log);
    engine.on_pause(move |_, paused, _| {
        l.borrow_mut().push(format!("engine:{paused}"));
        Ok(())
    });
    let l = Rc::clone(&log);
    let scene = Scene::new().on_pause(move |_, paused, _| {
        l.borrow_mut().push(format!("scene:{paused}"));
        Ok(())
    });
    engine.set_scene("default", scene).unwrap();
    for (name, z, ignore) in [("overlay", 1.0, true), ("player", 0.0, false)] {
        let l = Rc::clone(&log);
        let e = entity(z * 100.0, z, ignore).on_pause(move |_, paused, _| {
            l.borrow_mut().push(format!("{name}:{paused}"));
            Ok(())
        });
        engine.add_entity("default", name, e).unwrap();
    }

    engine.set_pause(true).unwrap();
    assert_eq!(*log.borrow(), ["engine:true", "overlay:true"]);

    log.borrow_mut().clear();
    engine.set_pause(false).unwrap();
    assert_eq!(
        *log.borrow(),
        ["engine:false", "scene:false", "player:false", "overlay:false"]
    );
}

#[test]
fn pause_hook_can_spawn_and_despawn_a_menu() {
    let mut engine = headless(EngineConfig::default());
    engine.on_pause(|vars, paused, ctx| {
        vars.insert("paused".to_owned(), serde_json::Value::Bool(paused));
        if paused {
            ctx.spawn_named("pause_menu", Entity::new(EntityProps::default())?);
        } else {
            ctx.despawn("pause_menu");
        }
        Ok(())
    });

    engine.set_pause(true).unwrap();
    assert!(engine.active_scene().unwrap().contains("pause_menu"));
    assert_eq!(engine.vars()["paused"], serde_json::Value::Bool(true));

    engine.toggle_pause().unwrap();
    assert!(!engine.active_scene().unwrap().contains("pause_menu"));
}

// ---------------------------------------------------------------------------
// Background
// ---------------------------------------------------------------------------

fn clears(renderer: &RecordingRenderer) -> usize {
    renderer
        .calls()
        .iter()
        .filter(|call| matches!(call, DrawCall::Clear { .. }))
        .count()
}

#[test]
fn background_is_skipped_while_paused_unless_fill_on_pause() {
    let mut renderer = RecordingRenderer::new(640, 480);

    let mut engine = headless(EngineConfig {
        fill_on_pause: false,
        ..Default::default()
    });
    step(&mut engine, &mut renderer);
    assert_eq!(clears(&renderer), 1);
    engine.set_pause(true).unwrap();
    step(&mut engine, &mut renderer);
    assert_eq!(clears(&renderer), 0);

    let mut engine = headless(EngineConfig::default());
    engine.set_pause(true).unwrap();
    step(&mut engine, &mut renderer);
    assert_eq!(clears(&renderer), 1);
}

// ---------------------------------------------------------------------------
// Deferred pause requests
// ---------------------------------------------------------------------------

#[test]
fn pause_from_an_entity_update_applies_after_the_entity_pass() {
    let log: Log = Rc::default();
    let mut engine = headless(EngineConfig::default());
    let pauser = entity(0.0, 0.0, false).on_update(|_, ctx| {
        ctx.set_pause(true);
        Ok(())
    });
    engine.add_entity("default", "pauser", pauser).unwrap();
    engine
        .add_entity("default", "later", logging_update(entity(50.0, 1.0, false), &log, "later"))
        .unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer);
    assert!(engine.paused());
    assert_eq!(*log.borrow(), ["later"], "later entities still update this frame");

    step(&mut engine, &mut renderer);
    assert_eq!(*log.borrow(), ["later"]);
}
