//! Error taxonomy for the intensity core.
//!
//! Nothing in this crate is fatal. Validation failures are logged and the
//! offending update is refused; collaborator failures are logged and the
//! affected effect is released. `EngineError` is only returned from the debug
//! and configuration entry points so callers can assert on it.

use thiserror::Error;

use crate::effects::EffectKind;

/// Root error type for the intensity core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Score outside [-100, 100] or not finite.
    #[error("score {score} outside [-100, 100]")]
    ScoreOutOfRange {
        /// The refused score.
        score: f32,
    },

    /// Sophistication outside [1, 5] or not finite.
    #[error("sophistication {value} outside [1, 5]")]
    SophisticationOutOfRange {
        /// The refused sophistication.
        value: f32,
    },

    /// Forced intensity outside [0, 4] or not finite.
    #[error("intensity {value} outside [0, 4]")]
    IntensityOutOfRange {
        /// The refused intensity.
        value: f32,
    },

    /// The renderer failed (or panicked) while applying or clearing an effect.
    #[error("render error on {kind}: {message}")]
    Render {
        /// Effect kind being drawn or cleared.
        kind: EffectKind,
        /// Collaborator-supplied message.
        message: String,
    },

    /// Invalid configuration or profile table.
    #[error("config error: {0}")]
    Config(String),

    /// The engine was shut down and no longer accepts work.
    #[error("engine has been shut down")]
    ShutDown,

    /// Accessibility preference store failure.
    #[error("preference store error: {0}")]
    Preferences(String),
}

/// Convenience alias used across the crate.
pub type EngineResult<T> = Result<T, EngineError>;
