use std::path::PathBuf;

use thiserror::Error;

/// Library error type for the wallpaper pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The media index could not be opened or read.
    #[error("media index unavailable: {0}")]
    MediaAccess(String),

    /// The selected file is missing, corrupt or in an unsupported format.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The resizer rejected the decoded or target buffers.
    #[error("failed to resample {}: {message}", path.display())]
    Resample { path: PathBuf, message: String },

    /// Allocation failed while building a bitmap of the given size.
    #[error("out of memory preparing a {width}x{height} bitmap")]
    ResourceExhausted { width: u32, height: u32 },

    /// Shader compilation, pipeline creation or render-target setup failed.
    #[error("graphics setup failed: {0}")]
    GraphicsSetup(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::decode(path, image::ImageError::IoError(source))
    }

    pub(crate) fn resample(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::Resample {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Whether the render loop may skip this failure and keep the previous frame.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::GraphicsSetup(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
