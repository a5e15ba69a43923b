//! Error types for glint-eye

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Fixture error: {path}: {reason}")]
    Fixture { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, VisionError>;

/// Failure while pulling the next frame off a live stream.
///
/// A corrupt segment is skipped; end of stream and a dead connection end the
/// session.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("end of stream")]
    EndOfStream,

    #[error("corrupt segment: {0}")]
    Decode(String),

    #[error("stream IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    pub fn is_terminal(&self) -> bool {
        use std::io::ErrorKind;

        match self {
            StreamError::EndOfStream => true,
            StreamError::Io(err) => !matches!(
                err.kind(),
                ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
            ),
            StreamError::Decode(_) => false,
        }
    }
}

impl From<image::ImageError> for StreamError {
    fn from(err: image::ImageError) -> Self {
        StreamError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::Camera("Test error".to_string());
        assert!(err.to_string().contains("Camera error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_fixture_error_names_path() {
        let err = VisionError::Fixture {
            path: PathBuf::from("images/inputs/a.jpeg"),
            reason: "bad huffman table".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("images/inputs/a.jpeg"));
        assert!(msg.contains("bad huffman table"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        match vision_err {
            VisionError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_stream_error_classification() {
        assert!(StreamError::EndOfStream.is_terminal());
        assert!(!StreamError::Decode("truncated".to_string()).is_terminal());

        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "peer closed");
        assert!(StreamError::from(eof).is_terminal());

        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(StreamError::from(reset).is_terminal());

        let interrupted = std::io::Error::new(std::io::ErrorKind::Interrupted, "signal");
        assert!(!StreamError::from(interrupted).is_terminal());
    }
}
