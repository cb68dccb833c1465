use thiserror::Error;

/// Errors that stop a simulation from being constructed or configured.
///
/// Configuration errors and invariant violations both land here; numeric
/// degeneracy during a step is never an error (see `diagnostics::StepStats`).
#[derive(Error, Debug)]
pub enum SimError {
    #[error("smoothing radius must be positive and finite, got {0}")]
    InvalidSmoothingRadius(f32),
    #[error("spatial hash cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
    #[error("simulation needs at least one particle")]
    ZeroParticles,
    #[error("iterations per frame must be at least 1")]
    InvalidIterations,
    #[error("invalid setting `{name}`: {value}")]
    InvalidSetting { name: &'static str, value: f32 },
    #[error("buffer `{buffer}` has length {actual}, expected {expected}")]
    BufferLengthMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("triangle vertex array length {0} is not a multiple of 3")]
    TriangleArrayLength(usize),
    #[error("obstacles can only be replaced before the first step or while paused")]
    ObstaclesLocked,
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while decoding a 3DS model file.
///
/// Callers normally go through `model_3ds::read_model`, which logs these and
/// hands back whatever geometry was decoded.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("main chunk id not found in either byte order (read {0:#06x})")]
    UnknownByteOrder(u16),
    #[error("model data truncated at byte {offset} while reading {what}")]
    Truncated { offset: usize, what: &'static str },
    #[error("chunks nested too deeply at byte {offset}")]
    TooDeep { offset: usize },
}
