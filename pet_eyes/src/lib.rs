// THEORY:
// This file is the main entry point for the `pet_eyes` library crate. It exposes
// the engine that re-renders a live video stream the way another species sees
// it: a read-only `Registry` of vision profiles and a `FilterSession` that runs
// the capture → transform → render loop against caller-supplied frame sources,
// sinks and schedulers.
//
// `pipeline` is the high-level interface and re-exports everything a host needs.
// The `core_modules` hold the pixel math, the species models, the registry and
// the frame buffer; `scheduler` holds the refresh-signal abstractions.

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod scheduler;

pub use error::{Result, VisionError};
pub use pipeline::{FilterConfig, FilterSession, FrameSink, FrameSource, LoopStats};
