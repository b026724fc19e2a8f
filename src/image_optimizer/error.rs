//! Engine errors. All of them end the request as a transform failure.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ImageError {
    /// Source or target format the engine cannot handle
    #[error("cannot handle image format '{format}'")]
    UnsupportedFormat { format: String },

    #[error("could not decode source image: {message}")]
    DecodeFailed { message: String },

    /// Resize or crop
    #[error("could not resize image: {message}")]
    ResizeFailed { message: String },

    #[error("could not encode {format}: {message}")]
    EncodeFailed { format: String, message: String },
}

impl ImageError {
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        Self::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        Self::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }
}
