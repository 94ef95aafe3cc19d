//! Screenshot naming and writing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tessel_scene::render::Renderer;

use crate::error::{EngineError, EngineResult};

/// `"{title} screenshot - YYYY-MM-DD_HH-MM-SS.png"`.
///
/// ```
/// use chrono::{Local, TimeZone};
/// use tessel_engine::screenshot::screenshot_file_name;
///
/// let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
/// assert_eq!(screenshot_file_name("Pong", at), "Pong screenshot - 2024-03-09_14-05-07.png");
/// ```
pub fn screenshot_file_name(title: &str, at: DateTime<Local>) -> String {
    format!("{title} screenshot - {}.png", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Capture `renderer`'s current frame and write it as a PNG into `folder`,
/// creating the folder if needed. Returns the written path.
///
/// # Errors
///
/// [`EngineError::Screenshot`] if the renderer keeps no pixels or the PNG
/// cannot be encoded; [`EngineError::Io`] if the folder cannot be created.
pub fn save_screenshot(renderer: &mut dyn Renderer, title: &str, folder: &Path) -> EngineResult<PathBuf> {
    let frame = renderer
        .capture_frame()
        .ok_or_else(|| EngineError::Screenshot("renderer cannot capture frames".to_owned()))?;
    std::fs::create_dir_all(folder)?;
    let path = folder.join(screenshot_file_name(title, Local::now()));
    frame
        .save(&path)
        .map_err(|e| EngineError::Screenshot(format!("{}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), width = frame.width(), height = frame.height(), "screenshot saved");
    Ok(path)
}
