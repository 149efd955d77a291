use thiserror::Error;

/// Startup-time configuration problems. These are the only errors that
/// stop the process; everything after startup is recovered locally.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config: {0}")]
    Load(#[from] config::ConfigError),
    #[error("at least one target must be configured")]
    NoTargets,
    #[error("target id must not be empty")]
    EmptyTargetId,
    #[error("duplicate target id \"{0}\"")]
    DuplicateTarget(String),
    #[error("target \"{id}\" has an invalid url: {reason}")]
    InvalidUrl { id: String, reason: String },
    #[error("{field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Building the HTTP probe client failed (bad TLS backend, etc.).
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Delivering a frame to one viewer failed. The viewer is torn down.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("viewer transport: {0}")]
    Transport(String),
    #[error("viewer closed")]
    Closed,
}

/// Rasterizing a chart failed. Callers turn this into `NoData`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("degenerate chart: {0}")]
    Degenerate(&'static str),
    #[error("surface {width}x{height} is too small")]
    SurfaceTooSmall { width: u16, height: u16 },
}
