//! Frame sources: a live network camera or a pre-loaded fixture sequence

pub mod live;
pub mod sequence;

pub use live::LiveStreamSource;
pub use sequence::SequenceSource;

use crate::error::Result;
use crate::frame::Frame;

/// Outcome of a successful pull from a [`FrameSource`].
#[derive(Debug)]
pub enum Acquired {
    Frame(Frame),
    EndOfStream,
}

impl Acquired {
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Acquired::Frame(frame) => Some(frame),
            Acquired::EndOfStream => None,
        }
    }
}

/// Pull-based supplier of frames for the processing cycle.
pub trait FrameSource {
    /// Block until the next frame is available or the source is exhausted.
    fn acquire(&mut self) -> Result<Acquired>;

    /// Short label for logs
    fn describe(&self) -> String;
}
