//! Per-frame vision stages

pub mod extract;
pub mod project;
pub mod segment;
pub mod select;

pub use extract::{extract, BoundingBox, Candidate};
pub use project::{project, VisionReport};
pub use segment::segment;
pub use select::{select, Selection, Target, TargetSelector, TrackingState};
