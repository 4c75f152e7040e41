use thiserror::Error;

/// Top-level error for engine setup. Playback operations never return it;
/// they log and no-op instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Note error: {0}")]
    Note(#[from] NoteError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid output sample rate {0}")]
    InvalidSampleRate(f64),

    #[error("Sampler has no zones loaded")]
    NoSamples,

    #[error("No sample zone can play {0}")]
    NoZone(String),

    #[error("Backend not prepared; call init first")]
    NotPrepared,

    #[error("The {0} backend does not take sample zones")]
    ZonesUnsupported(&'static str),

    #[cfg(feature = "wav")]
    #[error("Failed to decode WAV: {0}")]
    Wav(#[from] hound::Error),
}

/// Rejection of an unresolvable note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    #[error("Empty note identifier")]
    Empty,

    #[error("Unknown pitch class in '{0}'")]
    UnknownPitchClass(String),

    #[error("Invalid octave in '{0}'")]
    InvalidOctave(String),

    #[error("Note '{0}' is outside the MIDI key range")]
    OutOfRange(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("gracePeriod ({grace}s) must be less than orphanTimeout ({timeout}s)")]
    GraceNotBelowTimeout { grace: f64, timeout: f64 },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("historyCapacity must be at least 1")]
    EmptyHistory,

    #[error("oscillatorCount must be at least 1")]
    NoOscillators,

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejection raised by a scheduled sound source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source already has a stop scheduled")]
    AlreadyStopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown scale type: {0}")]
pub struct UnknownScale(pub String);
