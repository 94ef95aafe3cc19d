//! Headless demo -- a self-playing rally between two paddles.
//!
//! Runs about ten simulated seconds with a fixed clock and a scripted input feed,
//! renders into memory, writes a final screenshot and keeps the best rally
//! in a JSON record between runs.
//!
//! Run with:
//!   RUST_LOG=tessel_engine=debug cargo run --example headless_run -p tessel-engine

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tessel_engine::prelude::*;

const WIDTH: f64 = 320.0;
const HEIGHT: f64 = 200.0;
const FRAMES: usize = 600;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Record {
    best_rally: u64,
    runs: u64,
}

fn velocity(entity: &Entity) -> (f64, f64) {
    let get = |key: &str| entity.props().vars.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    (get("vx"), get("vy"))
}

fn set_velocity(entity: &mut Entity, vx: f64, vy: f64) {
    let vars = &mut entity.props_mut().vars;
    vars.insert("vx".to_owned(), json!(vx));
    vars.insert("vy".to_owned(), json!(vy));
}

/// A paddle that tracks the ball's height.
fn paddle(x: f64) -> anyhow::Result<Entity> {
    let paddle = Entity::new(EntityProps {
        x,
        y: HEIGHT / 2.0 - 20.0,
        width: 6.0,
        height: 40.0,
        tags: vec!["paddle".to_owned()],
        ..Default::default()
    })?
    .on_custom("ball_moved", |this, payload, _| {
        if let Some(target) = payload.and_then(|p| p["y"].as_f64()) {
            let y = (target - this.props().height / 2.0).clamp(0.0, HEIGHT - this.props().height);
            let x = this.props().x;
            this.set_position(x, y);
        }
        Ok(())
    });
    Ok(paddle)
}

fn ball() -> anyhow::Result<Entity> {
    let mut ball = Entity::new(EntityProps {
        x: WIDTH / 2.0,
        y: HEIGHT / 2.0,
        width: 6.0,
        height: 6.0,
        color: Color::YELLOW,
        ..Default::default()
    })?
    .on_update(|this, ctx| {
        let dt = ctx.delta_time();
        let (vx, mut vy) = velocity(this);
        this.translate(vx * dt, vy * dt);
        let y = this.props().y;
        if y <= 0.0 || y + this.props().height >= HEIGHT {
            vy = -vy;
        }
        set_velocity(this, vx, vy);
        ctx.emit("ball_moved", Some(json!({ "y": y })));
        Ok(())
    })
    .on_collide(|this, other, ctx| {
        if other.has_tag("paddle") {
            let (vx, vy) = velocity(this);
            let away = if other.props().x < WIDTH / 2.0 { vx.abs() } else { -vx.abs() };
            if away != vx {
                set_velocity(this, away, vy);
                ctx.emit("rally", None);
            }
        }
        Ok(())
    });
    set_velocity(&mut ball, 150.0, 90.0);
    Ok(ball)
}

fn main() -> anyhow::Result<()> {
    tessel_engine::logging::init_with_default("tessel_engine=info");

    let out = std::env::temp_dir().join("tessel-headless");
    let store = JsonStore::new(&out);
    let mut record: Record = store.load("record")?.unwrap_or_default();

    let mut engine = Engine::new(EngineConfig {
        title: "Headless Rally".to_owned(),
        width: WIDTH as u32,
        height: HEIGHT as u32,
        headless: true,
        quit_on_escape: true,
        screenshot_dir: PathBuf::from(&out),
        ..Default::default()
    })?;
    engine.vars_mut().insert("rally".to_owned(), json!(0));
    engine.on_custom("rally", |vars, _, _| {
        let rally = vars.get("rally").and_then(Value::as_u64).unwrap_or(0) + 1;
        vars.insert("rally".to_owned(), json!(rally));
        Ok(())
    });
    engine.on_event(EventCategory::KeyDown, |_, event, ctx| {
        if event.is_key_down("p") {
            ctx.toggle_pause();
        }
        Ok(())
    });

    engine.add_entity("default", "left", paddle(8.0)?)?;
    engine.add_entity("default", "right", paddle(WIDTH - 14.0)?)?;
    engine.add_entity("default", "ball", ball()?)?;

    // Pause for one second in the middle, then quit with escape.
    let mut script = ScriptedInput::idle(FRAMES / 2);
    script.push_frame(vec![InputEvent::key_down("p")]);
    for _ in 0..60 {
        script.push_frame(Vec::new());
    }
    script.push_frame(vec![InputEvent::key_down("p")]);
    for _ in 0..FRAMES / 2 {
        script.push_frame(Vec::new());
    }
    script.push_frame(vec![InputEvent::key_down("escape")]);

    let mut renderer = SoftwareRenderer::new(WIDTH as u32, HEIGHT as u32);
    let mut clock = FixedClock::new(60);
    engine.run(&mut script, &mut renderer, &mut clock)?;
    let shot = engine.screenshot(&mut renderer, None)?;

    let rally = engine.vars().get("rally").and_then(Value::as_u64).unwrap_or(0);
    record.runs += 1;
    record.best_rally = record.best_rally.max(rally);
    store.save("record", &record)?;

    tracing::info!(
        frames = engine.frame_count(),
        elapsed = engine.elapsed(),
        rally,
        best = record.best_rally,
        runs = record.runs,
        screenshot = %shot.display(),
        "headless run finished"
    );
    Ok(())
}
