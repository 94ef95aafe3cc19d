//! Image and sound loading.
//!
//! Games obtain [`ImageHandle`]s and [`SoundHandle`]s through an
//! [`AssetStore`]. [`FsAssetStore`] reads from a root directory, decodes
//! images with the `image` crate and caches every handle by resolved path,
//! so loading the same file twice shares one decoded copy.
//!
//! Sounds are loaded and carry a volume, but are never played.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tessel_scene::render::ImageHandle;

use crate::error::{EngineError, EngineResult};

/// Source of loaded assets.
pub trait AssetStore {
    /// Decode the image at `path`.
    ///
    /// # Errors
    ///
    /// [`EngineError::ResourceLoad`] if the file is missing or undecodable.
    fn load_image(&mut self, path: &Path) -> EngineResult<ImageHandle>;

    /// Read the sound file at `path`.
    ///
    /// # Errors
    ///
    /// [`EngineError::ResourceLoad`] if the file cannot be read.
    fn load_sound(&mut self, path: &Path) -> EngineResult<SoundHandle>;
}

// ---------------------------------------------------------------------------
// Sounds
// ---------------------------------------------------------------------------

/// Raw bytes of a sound file, shared by reference count.
#[derive(Clone)]
pub struct SoundHandle {
    path: PathBuf,
    bytes: Arc<[u8]>,
}

impl SoundHandle {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn ptr_eq(&self, other: &SoundHandle) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl std::fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SoundHandle({}, {} bytes)", self.path.display(), self.bytes.len())
    }
}

/// Playback state of a [`Sound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Playback {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// A loaded sound with its volume, 0 to 100.
///
/// Playback calls only track state; no audio is produced.
#[derive(Debug, Clone)]
pub struct Sound {
    handle: SoundHandle,
    volume: u8,
    playback: Playback,
}

impl Sound {
    /// Full volume.
    pub fn new(handle: SoundHandle) -> Self {
        Self {
            handle,
            volume: 100,
            playback: Playback::Stopped,
        }
    }

    pub fn handle(&self) -> &SoundHandle {
        &self.handle
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Set the volume, clamped to `0..=100`.
    pub fn set_volume(&mut self, volume: i32) {
        self.volume = volume.clamp(0, 100) as u8;
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    pub fn play(&mut self) {
        tracing::debug!(sound = %self.handle.path.display(), volume = self.volume, "play");
        self.playback = Playback::Playing;
    }

    pub fn stop(&mut self) {
        self.playback = Playback::Stopped;
    }

    /// Only a playing sound pauses.
    pub fn pause(&mut self) {
        if self.playback == Playback::Playing {
            self.playback = Playback::Paused;
        }
    }

    pub fn unpause(&mut self) {
        if self.playback == Playback::Paused {
            self.playback = Playback::Playing;
        }
    }
}

// ---------------------------------------------------------------------------
// FsAssetStore
// ---------------------------------------------------------------------------

/// Filesystem-backed [`AssetStore`] with a per-path cache.
#[derive(Debug, Default)]
pub struct FsAssetStore {
    root: PathBuf,
    images: HashMap<PathBuf, ImageHandle>,
    sounds: HashMap<PathBuf, SoundHandle>,
}

impl FsAssetStore {
    /// Relative paths resolve against `root`; absolute paths are used as is.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Number of cached images and sounds.
    pub fn cached(&self) -> usize {
        self.images.len() + self.sounds.len()
    }

    /// Drop every cached handle. Handles already given out stay valid.
    pub fn clear_cache(&mut self) {
        self.images.clear();
        self.sounds.clear();
    }
}

fn load_failed(path: &Path, details: impl ToString) -> EngineError {
    EngineError::ResourceLoad {
        path: path.to_path_buf(),
        details: details.to_string(),
    }
}

impl AssetStore for FsAssetStore {
    fn load_image(&mut self, path: &Path) -> EngineResult<ImageHandle> {
        let full = self.resolve(path);
        if let Some(handle) = self.images.get(&full) {
            return Ok(handle.clone());
        }
        let pixels = image::open(&full)
            .map_err(|e| load_failed(&full, e))?
            .to_rgba8();
        let (width, height) = pixels.dimensions();
        tracing::debug!(path = %full.display(), width, height, "image loaded");
        let handle = ImageHandle::new(full.to_string_lossy(), pixels);
        self.images.insert(full, handle.clone());
        Ok(handle)
    }

    fn load_sound(&mut self, path: &Path) -> EngineResult<SoundHandle> {
        let full = self.resolve(path);
        if let Some(handle) = self.sounds.get(&full) {
            return Ok(handle.clone());
        }
        let bytes = std::fs::read(&full).map_err(|e| load_failed(&full, e))?;
        tracing::debug!(path = %full.display(), bytes = bytes.len(), "sound loaded");
        let handle = SoundHandle::new(full.clone(), bytes);
        self.sounds.insert(full, handle.clone());
        Ok(handle)
    }
}
