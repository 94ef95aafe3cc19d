//! Interactive paddle demo -- keep the ball in play with the paddle.
//!
//! Run with:
//!   cargo run --example paddle_visual --features renderer -p tessel-engine
//!
//! Controls:
//!   Left/Right arrows or A/D -- move paddle
//!   P -- pause
//!   F12 -- screenshot into ./screenshots
//!   Escape -- quit

use serde_json::{json, Value};
use tessel_engine::prelude::*;
use tessel_engine::render::run_windowed;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 600.0;
const PADDLE_SPEED: f64 = 420.0;

fn var(entity: &Entity, key: &str) -> f64 {
    entity.props().vars.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn set_var(entity: &mut Entity, key: &str, value: f64) {
    entity.props_mut().vars.insert(key.to_owned(), json!(value));
}

fn paddle() -> anyhow::Result<Entity> {
    let paddle = Entity::new(EntityProps {
        x: WIDTH / 2.0 - 60.0,
        y: HEIGHT - 40.0,
        width: 120.0,
        height: 14.0,
        color: Color::LIGHT_BLUE,
        tags: vec!["paddle".to_owned()],
        ..Default::default()
    })?
    .on_event(EventCategory::KeyDown, |this, event, _| {
        match event.key.as_deref() {
            Some("left" | "a") => set_var(this, "dir", -1.0),
            Some("right" | "d") => set_var(this, "dir", 1.0),
            _ => {}
        }
        Ok(())
    })
    .on_event(EventCategory::KeyUp, |this, event, _| {
        if matches!(event.key.as_deref(), Some("left" | "a" | "right" | "d")) {
            set_var(this, "dir", 0.0);
        }
        Ok(())
    })
    .on_update(|this, ctx| {
        let dx = var(this, "dir") * PADDLE_SPEED * ctx.delta_time();
        let x = (this.props().x + dx).clamp(0.0, WIDTH - this.props().width);
        let y = this.props().y;
        this.set_position(x, y);
        Ok(())
    });
    Ok(paddle)
}

fn ball() -> anyhow::Result<Entity> {
    let mut vars = Vars::new();
    vars.insert("vx".to_owned(), json!(220.0));
    vars.insert("vy".to_owned(), json!(-260.0));
    let ball = Entity::new(EntityProps {
        x: WIDTH / 2.0,
        y: HEIGHT / 2.0,
        width: 14.0,
        height: 14.0,
        color: Color::YELLOW,
        vars,
        ..Default::default()
    })?
    .on_update(|this, ctx| {
        let dt = ctx.delta_time();
        let (mut vx, mut vy) = (var(this, "vx"), var(this, "vy"));
        this.translate(vx * dt, vy * dt);
        let props = this.props();
        if props.x <= 0.0 || props.x + props.width >= WIDTH {
            vx = -vx;
        }
        if props.y <= 0.0 {
            vy = vy.abs();
        }
        if props.y > HEIGHT {
            ctx.emit("missed", None);
            ctx.reset_entity("ball");
            return Ok(());
        }
        set_var(this, "vx", vx);
        set_var(this, "vy", vy);
        Ok(())
    })
    .on_collide(|this, other, ctx| {
        if other.has_tag("paddle") && var(this, "vy") > 0.0 {
            let vy = -var(this, "vy") * 1.05;
            set_var(this, "vy", vy);
            ctx.emit("hit", None);
        }
        Ok(())
    });
    Ok(ball)
}

fn score_label() -> anyhow::Result<Entity> {
    let label = Entity::new(EntityProps {
        x: 12.0,
        y: 12.0,
        width: 200.0,
        height: 21.0,
        alpha: 0,
        gui: true,
        ignore_pause: true,
        layer: Layer::Text(TextLayer {
            font_size: 21.0,
            ..TextLayer::new("SCORE 0")
        }),
        ..Default::default()
    })?
    .on_custom("hit", |this, _, _| {
        let score = var(this, "score") + 1.0;
        set_var(this, "score", score);
        if let Layer::Text(text) = &mut this.props_mut().layer {
            text.text = format!("SCORE {score}");
        }
        Ok(())
    })
    .on_custom("missed", |this, _, _| {
        set_var(this, "score", 0.0);
        if let Layer::Text(text) = &mut this.props_mut().layer {
            text.text = "SCORE 0".to_owned();
        }
        Ok(())
    })
    .on_pause(|this, paused, _| {
        this.props_mut().color = if paused { Color::ORANGE } else { Color::WHITE };
        this.props_mut().alpha = if paused { 120 } else { 0 };
        Ok(())
    });
    Ok(label)
}

fn main() -> anyhow::Result<()> {
    tessel_engine::logging::init_with_default("tessel_engine=info");

    let mut engine = Engine::new(EngineConfig {
        title: "Tessel Paddle".to_owned(),
        width: WIDTH as u32,
        height: HEIGHT as u32,
        background: Color::rgb(16, 16, 32),
        quit_on_escape: true,
        ..Default::default()
    })?;
    engine.on_event(EventCategory::KeyDown, |_, event, ctx| {
        if event.is_key_down("p") {
            ctx.toggle_pause();
        }
        if event.is_key_down("f12") {
            ctx.screenshot(None);
        }
        Ok(())
    });

    engine.add_entity("default", "paddle", paddle()?)?;
    engine.add_entity("default", "ball", ball()?)?;
    engine.add_entity("default", "score", score_label()?)?;

    let engine = run_windowed(engine)?;
    tracing::info!(
        frames = engine.frame_count(),
        screenshots = engine.screenshots().len(),
        "paddle demo finished"
    );
    Ok(())
}
