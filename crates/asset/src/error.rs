//! Import failures.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    /// Source could not be opened or read.
    #[error("failed to read {origin}: {source}")]
    Io {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed OBJ/MTL syntax.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A buffer could not be reserved.
    #[error("out of memory reserving {bytes} bytes for {what}")]
    Allocation { what: &'static str, bytes: usize },

    /// Texture file exists but could not be decoded.
    #[error("failed to decode texture {path:?}: {source}")]
    Texture {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl ImportError {
    pub(crate) fn io(origin: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            origin: origin.into(),
            source,
        }
    }

    pub(crate) fn parse(line_no: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line: line_no + 1,
            message: message.into(),
        }
    }
}

pub type ImportResult<T> = Result<T, ImportError>;
