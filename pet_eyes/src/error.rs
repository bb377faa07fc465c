// THEORY:
// Every failure the engine can report lives in one enum, grouped by who is at
// fault:
// - caller errors (`UnknownProfile`, `NoProfileSelected`) come straight back from
//   the lifecycle API and are never retried;
// - definition errors (`InvalidProfile`) are raised while a registry is built, so
//   a broken coefficient tuple can never reach the render loop;
// - I/O-ish errors (`InvalidFrame`, `Image`, `Io`, `NoRuntime`) belong to the helpers
//   around the loop.
// A missing camera frame is NOT here: the loop absorbs it and keeps going.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("unknown vision profile: {0:?}")]
    UnknownProfile(String),

    #[error("filtering cannot start: no vision profile selected")]
    NoProfileSelected,

    #[error("invalid vision profile {id:?}: {reason}")]
    InvalidProfile { id: String, reason: String },

    #[error("frame {width}x{height} needs {expected} RGBA bytes, got {actual}")]
    InvalidFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VisionError>;
