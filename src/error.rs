use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("ONNX runtime error: {0}")]
    Runtime(#[from] ort::Error),
    #[error("model produced no usable output: {0}")]
    ModelOutput(String),
    #[error("malformed annotation {path}: {source}")]
    Annotation {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid pattern config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid pattern for tier `{tier}`: {source}")]
    Pattern {
        tier: String,
        #[source]
        source: regex::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn image(path: impl Into<PathBuf>) -> impl FnOnce(image::ImageError) -> Self {
        let path = path.into();
        move |source| match source {
            image::ImageError::IoError(source) => Self::Io { path, source },
            source => Self::Image { path, source },
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
