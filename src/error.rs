use crate::overlay::RenderError;
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single card or alias could not be produced. None of these stop the
/// batch; the driver logs them and moves on.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("no source image at {location}")]
    NotFound { location: String },

    #[error("request to {url} failed")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },

    #[error("failed to read source image")]
    Read(#[source] std::io::Error),

    #[error("failed to decode source image")]
    Decode(#[source] image::ImageError),

    #[error("failed to draw badge")]
    Render(#[from] RenderError),

    #[error("failed to encode {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ItemError {
    /// Missing sources are reported as skips rather than failures.
    pub fn is_skip(&self) -> bool {
        matches!(self, ItemError::NotFound { .. })
    }
}
