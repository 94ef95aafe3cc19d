//! Screenshots requested through commands, captured from a
//! `SoftwareRenderer` after the frame is composed.

use std::time::Duration;

use tessel_engine::prelude::*;

fn engine_with(config: EngineConfig) -> Engine {
    let mut engine = Engine::new(EngineConfig {
        headless: true,
        width: 64,
        height: 48,
        ..config
    })
    .unwrap();
    let tile = Entity::new(EntityProps {
        color: Color::RED,
        ..Default::default()
    })
    .unwrap();
    engine.add_entity("default", "tile", tile).unwrap();
    engine
}

#[test]
fn screenshot_command_captures_the_composed_frame() {
    let dir = tempfile::tempdir().unwrap();
    let folder = dir.path().to_path_buf();
    let mut engine = engine_with(EngineConfig {
        title: "Tiles".to_owned(),
        ..Default::default()
    });
    engine.on_update(move |_, ctx| {
        if ctx.frame().frame == 0 {
            ctx.screenshot(Some(folder.clone()));
        }
        Ok(())
    });

    let mut renderer = SoftwareRenderer::new(64, 48);
    engine.frame(Vec::new(), &mut renderer, Duration::ZERO).unwrap();

    assert_eq!(engine.screenshots().len(), 1);
    let path = &engine.screenshots()[0];
    assert!(path.starts_with(dir.path()));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Tiles screenshot - "), "{name}");

    let shot = image::open(path).unwrap().to_rgba8();
    assert_eq!(shot.dimensions(), (64, 48));
    assert_eq!(shot.get_pixel(5, 5).0, [255, 0, 0, 255]);
    assert_eq!(shot.get_pixel(40, 40).0, [0, 0, 0, 255]);
}

#[test]
fn screenshot_without_folder_uses_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    let shots = dir.path().join("captures");
    let mut engine = engine_with(EngineConfig {
        screenshot_dir: shots.clone(),
        ..Default::default()
    });
    engine.queue(EngineCommand::Screenshot(None));

    let mut renderer = SoftwareRenderer::new(64, 48);
    engine.frame(Vec::new(), &mut renderer, Duration::ZERO).unwrap();

    let written: Vec<_> = std::fs::read_dir(&shots).unwrap().collect();
    assert_eq!(written.len(), 1);
    assert!(engine.screenshots()[0].starts_with(&shots));
}

#[test]
fn screenshot_on_a_recording_renderer_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_with(EngineConfig {
        screenshot_dir: dir.path().to_path_buf(),
        ..Default::default()
    });
    engine.on_update(|_, ctx| {
        ctx.screenshot(None);
        Ok(())
    });

    let mut input = ScriptedInput::idle(5);
    let mut renderer = RecordingRenderer::new(64, 48);
    let mut clock = FixedClock::new(60);
    let err = engine.run(&mut input, &mut renderer, &mut clock).unwrap_err();
    assert!(matches!(err, EngineError::Screenshot(_)));
    assert!(!engine.is_running());
    assert!(engine.screenshots().is_empty());
}

#[test]
fn direct_screenshot_between_frames() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = engine_with(EngineConfig::default());
    let mut renderer = SoftwareRenderer::new(64, 48);
    engine.frame(Vec::new(), &mut renderer, Duration::ZERO).unwrap();

    let path = engine.screenshot(&mut renderer, Some(dir.path())).unwrap();
    assert!(path.exists());
    assert_eq!(engine.screenshots(), [path]);
}
