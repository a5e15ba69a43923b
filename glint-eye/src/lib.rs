//! glint-eye: onboard target vision for a competition robot
//!
//! Pulls frames from a network MJPEG camera (or a fixture sequence on the
//! bench), segments the retro-reflective target by HSV thresholds, picks one
//! candidate per frame with positional hysteresis and publishes its bearing
//! and range to a shared robot-state table.
//!
//! Live frames arrive through a [`pump::StreamPump`] that never queues more
//! than one frame for the processing cycle.

pub mod annotate;
pub mod archive;
pub mod config;
pub mod error;
pub mod frame;
pub mod multipart;
pub mod pipeline;
pub mod processing;
pub mod publish;
pub mod pump;
pub mod source;

pub use config::VisionConfig;
pub use error::{Result, StreamError, VisionError};
pub use frame::Frame;
pub use pipeline::{CycleOutput, Pipeline};
pub use processing::{BoundingBox, Candidate, Target, TargetSelector, TrackingState, VisionReport};
pub use publish::{JsonLineTable, MemoryTable, Publisher, StateTable};
pub use source::{Acquired, FrameSource, LiveStreamSource, SequenceSource};
