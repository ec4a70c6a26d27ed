/// Errors surfaced by the plot window subsystem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlotError {
    /// The windowing connection could not be opened or operated.
    ///
    /// Fatal to window creation. Nothing retries internally; call
    /// [`initialize`](crate::initialize) again to retry.
    #[error("windowing connection failed: {0}")]
    Connection(String),

    /// Width or height was zero or negative.
    #[error("invalid window dimensions {width}x{height}: width and height must be positive")]
    InvalidDimension { width: i32, height: i32 },

    /// No drawing surface could be bound to the window.
    ///
    /// Drawing calls swallow this and do nothing.
    #[error("drawing surface unavailable: {0}")]
    SurfaceAcquisition(String),
}

impl PlotError {
    pub(crate) fn connection(err: impl std::fmt::Display) -> Self {
        Self::Connection(err.to_string())
    }

    pub(crate) fn surface(err: impl std::fmt::Display) -> Self {
        Self::SurfaceAcquisition(err.to_string())
    }
}

pub type Result<T, E = PlotError> = std::result::Result<T, E>;
