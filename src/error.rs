/// Errors surfaced by the fluid driver.
#[derive(Debug, thiserror::Error)]
pub enum FluidError {
    #[error("missing required collaborator: {0}")]
    MissingCollaborator(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("simulation is not running (call init first, or it was shut down)")]
    NotRunning,
    #[error("time step must be finite and > 0, got {0}")]
    InvalidTimeStep(f32),
    #[error("secondary obstacle count changed from {expected} to {found}")]
    ObstacleCountChanged { expected: usize, found: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, FluidError>;
