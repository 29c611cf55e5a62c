//! Error type shared by every stage of the pipeline.

use thiserror::Error;

/// Fatal errors raised while compiling, loading or saving level data.
///
/// None of these are recovered inside the pipeline: the stage that hits one
/// aborts and hands it back to the caller.
#[derive(Debug, Error)]
pub enum BspError {
    /// Degenerate polygon or plane (zero-length normal, too few vertices).
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Malformed, inconsistent or out-of-order data.
    #[error("format error: {0}")]
    Format(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BspError>;
