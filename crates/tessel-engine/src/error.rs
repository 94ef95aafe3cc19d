use std::path::PathBuf;

use tessel_scene::SceneError;

/// Errors produced by the engine and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A scene-graph operation failed (missing name or tag, bad argument).
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The engine was asked to run in a state that cannot work, such as an
    /// active scene that is not registered.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An image or sound could not be read or decoded.
    #[error("failed to load resource '{}': {details}", .path.display())]
    ResourceLoad {
        /// The path that was requested.
        path: PathBuf,
        /// Human-readable failure reason.
        details: String,
    },

    /// A user hook returned an error; the run is aborted.
    #[error("hook failed during {phase}: {source}")]
    Hook {
        /// The frame phase the hook ran in (`"update"`, `"on_collide"`, ...).
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The renderer could not produce or the file system could not store a
    /// screenshot.
    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// A persisted record could not be encoded or decoded.
    #[error("persistence error for '{name}': {details}")]
    Persistence {
        /// The record name.
        name: String,
        /// Human-readable failure reason.
        details: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Wrap a hook failure raised during `phase`.
    pub fn hook(phase: &'static str, source: anyhow::Error) -> Self {
        Self::Hook { phase, source }
    }

    /// Shorthand for [`EngineError::Configuration`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result alias used throughout the engine crate.
pub type EngineResult<T> = Result<T, EngineError>;

/// Adapter for `map_err` on hook results.
pub(crate) fn in_phase(phase: &'static str) -> impl FnOnce(anyhow::Error) -> EngineError {
    move |source| EngineError::hook(phase, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_errors_name_their_phase() {
        let err = EngineError::hook("update", anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "hook failed during update: boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn scene_errors_are_transparent() {
        let err: EngineError = SceneError::not_found("entity", "ghost").into();
        assert_eq!(err.to_string(), "entity 'ghost' not found");
    }
}
