//! End-to-end behavior of the frame loop: ordering, collisions, input
//! routing, camera and zoom, driven headlessly through a
//! `RecordingRenderer`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use serde_json::json;
use tessel_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn headless() -> Engine {
    Engine::new(EngineConfig {
        headless: true,
        ..Default::default()
    })
    .unwrap()
}

fn block(x: f64, y: f64, z: f64) -> Entity {
    Entity::new(EntityProps {
        x,
        y,
        z,
        ..Default::default()
    })
    .unwrap()
}

fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0));
    (Rc::clone(&count), count)
}

fn step(engine: &mut Engine, renderer: &mut RecordingRenderer, events: Vec<InputEvent>) {
    let now = Duration::from_millis(16) * engine.frame_count() as u32;
    engine.frame(events, renderer, now).unwrap();
}

// ---------------------------------------------------------------------------
// 1. Ordering
// ---------------------------------------------------------------------------

#[test]
fn hooks_run_engine_then_scene_then_entities_in_z_order() {
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let mut engine = headless();

    let l = Rc::clone(&log);
    engine.on_update(move |_, _| {
        l.borrow_mut().push("engine");
        Ok(())
    });
    let l = Rc::clone(&log);
    let scene = Scene::new().on_update(move |_, _| {
        l.borrow_mut().push("scene");
        Ok(())
    });
    engine.set_scene("default", scene).unwrap();

    let l = Rc::clone(&log);
    let back = block(0.0, 100.0, 5.0).on_update(move |_, _| {
        l.borrow_mut().push("back");
        Ok(())
    });
    let l = Rc::clone(&log);
    let front = block(100.0, 0.0, -1.0).on_update(move |_, _| {
        l.borrow_mut().push("front");
        Ok(())
    });
    engine.add_entity("default", "back", back).unwrap();
    engine.add_entity("default", "front", front).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    assert_eq!(*log.borrow(), ["engine", "scene", "front", "back"]);
}

#[test]
fn rects_are_drawn_in_z_order_with_camera_offset() {
    let mut engine = headless();
    engine.add_entity("default", "far", block(100.0, 40.0, 2.0)).unwrap();
    engine.add_entity("default", "near", block(0.0, 0.0, 1.0)).unwrap();
    let hud = Entity::new(EntityProps {
        x: 5.0,
        y: 5.0,
        gui: true,
        ..Default::default()
    })
    .unwrap();
    engine.add_entity("default", "hud", hud).unwrap();
    engine.camera_mut().set_position(10.0, 20.0);

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());

    let origins: Vec<(f64, f64)> = renderer.rects().iter().map(|p| (p.x, p.y)).collect();
    assert_eq!(origins, [(5.0, 5.0), (-10.0, -20.0), (90.0, 20.0)]);
    assert_eq!(
        renderer.calls().first(),
        Some(&DrawCall::Clear {
            color: Color::BLACK,
            alpha: 255
        })
    );
    assert_eq!(renderer.presented(), 1);
}

#[test]
fn invisible_entities_update_but_are_not_drawn() {
    let mut engine = headless();
    let (updates, seen) = counter();
    let ghost = Entity::new(EntityProps {
        visible: false,
        ..Default::default()
    })
    .unwrap()
    .on_update(move |_, _| {
        updates.set(updates.get() + 1);
        Ok(())
    });
    engine.add_entity("default", "ghost", ghost).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    assert_eq!(seen.get(), 1);
    assert!(renderer.rects().is_empty());
}

#[test]
fn text_layer_is_drawn_after_its_rect() {
    let mut engine = headless();
    let label = Entity::new(EntityProps {
        x: 20.0,
        y: 30.0,
        layer: Layer::Text(TextLayer::new("SCORE")),
        ..Default::default()
    })
    .unwrap();
    engine.add_entity("default", "label", label).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());

    let calls = renderer.calls();
    let rect = calls.iter().position(|c| matches!(c, DrawCall::Rect { .. })).unwrap();
    let text = calls
        .iter()
        .position(|c| matches!(c, DrawCall::Text { text, .. } if text == "SCORE"))
        .unwrap();
    assert!(rect < text);
    assert_eq!(calls[text].placement().map(|p| (p.x, p.y)), Some((20.0, 30.0)));
}

// ---------------------------------------------------------------------------
// 2. Collisions
// ---------------------------------------------------------------------------

#[test]
fn overlapping_pair_is_notified_once_each() {
    let mut engine = headless();
    let (a_hits, a_seen) = counter();
    let (b_hits, b_seen) = counter();
    let a = block(0.0, 0.0, 0.0).on_collide(move |_, _, _| {
        a_hits.set(a_hits.get() + 1);
        Ok(())
    });
    let b = block(5.0, 5.0, 0.0).on_collide(move |_, other, _| {
        assert_eq!(other.name(), Some("a"));
        b_hits.set(b_hits.get() + 1);
        Ok(())
    });
    engine.add_entity("default", "a", a).unwrap();
    engine.add_entity("default", "b", b).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    assert_eq!((a_seen.get(), b_seen.get()), (1, 1));
    step(&mut engine, &mut renderer, Vec::new());
    assert_eq!((a_seen.get(), b_seen.get()), (2, 2));
}

#[test]
fn touching_edges_inactive_and_gui_entities_do_not_collide() {
    let mut engine = headless();
    let (hits, seen) = counter();
    let probe = block(0.0, 0.0, 0.0).on_collide(move |_, _, _| {
        hits.set(hits.get() + 1);
        Ok(())
    });
    engine.add_entity("default", "probe", probe).unwrap();
    engine.add_entity("default", "edge", block(10.0, 0.0, 0.0)).unwrap();
    let sleeping = Entity::new(EntityProps {
        active: false,
        ..Default::default()
    })
    .unwrap();
    engine.add_entity("default", "sleeping", sleeping).unwrap();
    let overlay = Entity::new(EntityProps {
        gui: true,
        ..Default::default()
    })
    .unwrap();
    engine.add_entity("default", "overlay", overlay).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    assert_eq!(seen.get(), 0);
}

#[test]
fn collision_hook_can_despawn_through_commands() {
    let mut engine = headless();
    let bullet = block(0.0, 0.0, 0.0).on_collide(|this, _, ctx| {
        if let Some(name) = this.name() {
            ctx.despawn(name);
        }
        Ok(())
    });
    engine.add_entity("default", "bullet", bullet).unwrap();
    engine.add_entity("default", "wall", block(2.0, 2.0, 0.0)).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    let scene = engine.active_scene().unwrap();
    assert!(!scene.contains("bullet"));
    assert!(scene.contains("wall"));
}

// ---------------------------------------------------------------------------
// 3. Input
// ---------------------------------------------------------------------------

#[test]
fn quit_event_stops_run() {
    let mut engine = headless();
    let mut input = ScriptedInput::idle(3).then_quit();
    let mut renderer = RecordingRenderer::new(640, 480);
    let mut clock = FixedClock::new(60);
    engine.run(&mut input, &mut renderer, &mut clock).unwrap();
    assert_eq!(engine.frame_count(), 4);
    assert_eq!(engine.state(), LoopState::Stopped);
}

#[test]
fn escape_quits_only_when_enabled() {
    let mut renderer = RecordingRenderer::new(640, 480);

    let mut engine = headless();
    engine.start().unwrap();
    step(&mut engine, &mut renderer, vec![InputEvent::key_down("escape")]);
    assert!(engine.is_running());

    let mut engine = Engine::new(EngineConfig {
        headless: true,
        quit_on_escape: true,
        ..Default::default()
    })
    .unwrap();
    engine.start().unwrap();
    step(&mut engine, &mut renderer, vec![InputEvent::key_down("escape")]);
    assert!(!engine.is_running());
}

#[test]
fn pointer_tracks_screen_and_world_positions() {
    let mut engine = headless();
    engine.camera_mut().set_position(100.0, 50.0);
    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, vec![InputEvent::pointer_move(10.0, 20.0)]);

    let pointer = engine.pointer();
    assert_eq!(pointer.screen, (10.0, 20.0));
    assert_eq!(pointer.world, (110.0, 70.0));
}

#[test]
fn click_reaches_entity_under_pointer_in_world_space() {
    let mut engine = headless();
    engine.camera_mut().set_position(100.0, 0.0);
    let (clicks, seen) = counter();
    let button = block(100.0, 0.0, 0.0).on_click(move |_, event, _| {
        assert_eq!(event.button, Some(1));
        clicks.set(clicks.get() + 1);
        Ok(())
    });
    engine.add_entity("default", "button", button).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, vec![InputEvent::pointer_down(5.0, 5.0, 1)]);
    assert_eq!(seen.get(), 1);
    step(&mut engine, &mut renderer, vec![InputEvent::pointer_down(50.0, 5.0, 1)]);
    assert_eq!(seen.get(), 1);
}

#[test]
fn key_events_fan_out_to_every_level() {
    let log: Rc<RefCell<Vec<String>>> = Rc::default();
    let mut engine = headless();

    let l = Rc::clone(&log);
    engine.on_event(EventCategory::KeyDown, move |_, event, _| {
        l.borrow_mut().push(format!("engine:{}", event.key.as_deref().unwrap_or("")));
        Ok(())
    });
    let l = Rc::clone(&log);
    let scene = Scene::new().on_event(EventCategory::KeyDown, move |_, _, _| {
        l.borrow_mut().push("scene".to_owned());
        Ok(())
    });
    engine.set_scene("default", scene).unwrap();
    let l = Rc::clone(&log);
    let paddle = block(0.0, 0.0, 0.0).on_event(EventCategory::KeyDown, move |this, _, _| {
        this.translate(0.0, -5.0);
        l.borrow_mut().push("paddle".to_owned());
        Ok(())
    });
    engine.add_entity("default", "paddle", paddle).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, vec![InputEvent::key_down("w"), InputEvent::key_up("w")]);

    assert_eq!(*log.borrow(), ["engine:w", "scene", "paddle"]);
    let y = engine.active_scene().unwrap().entity("paddle").unwrap().props().y;
    assert_eq!(y, -5.0);
    assert_eq!(engine.last_diagnostics().events, 2);
}

#[test]
fn resize_event_updates_size_and_viewport() {
    let mut engine = headless();
    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, vec![InputEvent::resize(1024, 768)]);
    assert_eq!(engine.size(), (1024, 768));
    assert_eq!(engine.camera().viewport(), (1024.0, 768.0));
}

// ---------------------------------------------------------------------------
// 4. Time, camera and zoom
// ---------------------------------------------------------------------------

#[test]
fn delta_time_follows_the_clock() {
    let mut engine = headless();
    let mut renderer = RecordingRenderer::new(640, 480);
    engine.frame(Vec::new(), &mut renderer, Duration::from_millis(100)).unwrap();
    assert_eq!(engine.delta_time(), 0.0);
    engine.frame(Vec::new(), &mut renderer, Duration::from_millis(150)).unwrap();
    assert!((engine.delta_time() - 0.05).abs() < 1e-9);
    assert!((engine.elapsed() - 0.05).abs() < 1e-9);
}

#[test]
fn camera_follow_moves_toward_target() {
    let mut engine = headless();
    engine.on_update(|_, ctx| {
        ctx.camera_mut().follow(320.0, 240.0 + 100.0);
        Ok(())
    });
    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    let (_, y) = engine.camera().offset();
    assert!(y > 0.0 && y <= 100.0);
}

#[test]
fn zoomed_frames_clear_opaque_and_compose_zoom() {
    let mut engine = Engine::new(EngineConfig {
        headless: true,
        background_alpha: 40,
        ..Default::default()
    })
    .unwrap();
    engine.camera_mut().set_zoom(2.0);
    engine.add_entity("default", "box", block(0.0, 0.0, 0.0)).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());

    let calls = renderer.calls();
    assert_eq!(
        &calls[..2],
        [
            DrawCall::Clear {
                color: Color::BLACK,
                alpha: 255
            },
            DrawCall::Clear {
                color: Color::BLACK,
                alpha: 40
            },
        ]
    );
    assert_eq!(
        calls.last(),
        Some(&DrawCall::Zoom {
            zoom: 2.0,
            background: Color::BLACK
        })
    );
}

// ---------------------------------------------------------------------------
// 5. Commands and custom events
// ---------------------------------------------------------------------------

#[test]
fn emitted_custom_event_reaches_all_levels_with_payload() {
    let log: Rc<RefCell<Vec<String>>> = Rc::default();
    let mut engine = headless();

    let l = Rc::clone(&log);
    engine.on_custom("goal", move |vars, payload, _| {
        vars.insert("last_goal".to_owned(), payload.cloned().unwrap_or_default());
        l.borrow_mut().push("engine".to_owned());
        Ok(())
    });
    let l = Rc::clone(&log);
    let scene = Scene::new().on_custom("goal", move |_, _, _| {
        l.borrow_mut().push("scene".to_owned());
        Ok(())
    });
    engine.set_scene("default", scene).unwrap();
    let l = Rc::clone(&log);
    let ball = block(0.0, 0.0, 0.0)
        .on_update(|_, ctx| {
            if ctx.frame().frame == 0 {
                ctx.emit("goal", Some(json!({ "side": "left" })));
            }
            Ok(())
        })
        .on_custom("goal", move |_, payload, _| {
            let side = payload.and_then(|p| p["side"].as_str()).unwrap_or("");
            l.borrow_mut().push(format!("ball:{side}"));
            Ok(())
        });
    engine.add_entity("default", "ball", ball).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    step(&mut engine, &mut renderer, Vec::new());

    assert_eq!(*log.borrow(), ["engine", "scene", "ball:left"]);
    assert_eq!(engine.vars()["last_goal"], json!({ "side": "left" }));
}

#[test]
fn commands_apply_in_fifo_order() {
    let mut engine = headless();
    engine.on_update(|_, ctx| {
        if ctx.frame().frame == 0 {
            ctx.spawn_named("temp", Entity::new(EntityProps::default())?);
            ctx.despawn("temp");
            ctx.spawn_named("kept", Entity::new(EntityProps::default())?);
        }
        Ok(())
    });
    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());

    let scene = engine.active_scene().unwrap();
    assert!(!scene.contains("temp"));
    assert!(scene.contains("kept"));
    assert_eq!(engine.last_diagnostics().commands_applied, 3);
}

#[test]
fn scene_change_takes_effect_before_the_entity_pass() {
    let mut engine = headless();
    let (menu_updates, seen) = counter();
    engine.add_scene("menu", Scene::new()).unwrap();
    let item = block(0.0, 0.0, 0.0).on_update(move |_, _| {
        menu_updates.set(menu_updates.get() + 1);
        Ok(())
    });
    engine.add_entity("menu", "item", item).unwrap();
    engine.on_update(|_, ctx| {
        if ctx.frame().frame == 0 {
            ctx.change_scene("menu");
        }
        Ok(())
    });

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    assert_eq!(engine.active_scene_name(), "menu");
    assert_eq!(seen.get(), 1);
}

#[test]
fn stop_command_finishes_the_current_frame() {
    let mut engine = headless();
    let (draws, seen) = counter();
    engine.on_update(|_, ctx| {
        ctx.stop();
        Ok(())
    });
    let marker = block(0.0, 0.0, 0.0).on_draw(move |_, _| {
        draws.set(draws.get() + 1);
        Ok(())
    });
    engine.add_entity("default", "marker", marker).unwrap();

    let mut input = ScriptedInput::idle(10);
    let mut renderer = RecordingRenderer::new(640, 480);
    let mut clock = FixedClock::new(60);
    engine.run(&mut input, &mut renderer, &mut clock).unwrap();
    assert_eq!(engine.frame_count(), 1);
    assert_eq!(seen.get(), 1);
    assert_eq!(renderer.presented(), 1);
}

#[test]
fn set_fps_rejects_zero() {
    let mut engine = headless();
    engine.queue(EngineCommand::SetFps(30));
    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    assert_eq!(engine.fps(), 30);
    assert!(matches!(
        engine.set_fps(0),
        Err(EngineError::Scene(SceneError::InvalidArgument(_)))
    ));
}

// ---------------------------------------------------------------------------
// 8. Scene lookup from entity updates
// ---------------------------------------------------------------------------

#[test]
fn chaser_reads_the_player_as_moved_earlier_in_the_pass() {
    let mut engine = headless();
    let player = block(0.0, 0.0, 0.0).on_update(|this, _| {
        this.translate(10.0, 0.0);
        Ok(())
    });
    let chaser = block(100.0, 50.0, 1.0).on_update(|this, ctx| {
        if let Some(player) = ctx.entity("player") {
            let (x, y) = (player.props().x, this.props().y);
            this.set_position(x, y);
        }
        Ok(())
    });
    engine.add_entity("default", "player", player).unwrap();
    engine.add_entity("default", "chaser", chaser).unwrap();

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    step(&mut engine, &mut renderer, Vec::new());

    let chaser = engine.active_scene().unwrap().entity("chaser").unwrap();
    assert_eq!((chaser.props().x, chaser.props().y), (20.0, 50.0));
}

#[test]
fn tag_lookup_sees_every_other_entity_but_not_itself() {
    let seen: Rc<RefCell<Vec<(usize, bool)>>> = Rc::default();
    let mut engine = headless();
    for (i, z) in [2.0, 0.0, 1.0].into_iter().enumerate() {
        let seen = Rc::clone(&seen);
        let name = format!("enemy{i}");
        let enemy = Entity::new(EntityProps {
            z,
            tags: vec!["enemy".to_owned()],
            ..Default::default()
        })
        .unwrap()
        .on_update(move |this, ctx| {
            let own = this.name().unwrap_or_default().to_owned();
            seen.borrow_mut()
                .push((ctx.entities_by_tag("enemy").len(), ctx.entity(&own).is_some()));
            Ok(())
        });
        engine.add_entity("default", name, enemy).unwrap();
    }
    engine.on_update(|_, ctx| {
        assert!(ctx.siblings().is_empty());
        Ok(())
    });

    let mut renderer = RecordingRenderer::new(640, 480);
    step(&mut engine, &mut renderer, Vec::new());
    assert_eq!(*seen.borrow(), vec![(2, false); 3]);
}
