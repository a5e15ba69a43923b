//! Snapshot archive of input, mask and annotated frames

use chrono::{DateTime, Local, Utc};
use image::{GrayImage, ImageFormat, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::annotate::annotate;
use crate::config::ArchiveConfig;
use crate::error::Result;
use crate::frame::Frame;
use crate::pipeline::CycleOutput;

/// Local-time stamp used in snapshot file names
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%I[%M]%S_%m-%d").to_string()
}

pub struct SnapshotArchive {
    config: ArchiveConfig,
}

impl SnapshotArchive {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn path_for(&self, prefix: &str, stamp: &str) -> PathBuf {
        self.config.directory.join(format!("{}{}.jpeg", prefix, stamp))
    }

    /// Write the three images of one cycle, returning the paths written.
    pub fn save(
        &self,
        stamp: &str,
        raw: &RgbImage,
        mask: &GrayImage,
        annotated: &RgbImage,
    ) -> Result<Vec<PathBuf>> {
        let input = self.path_for(&self.config.input_prefix, stamp);
        let output = self.path_for(&self.config.output_prefix, stamp);
        let target = self.path_for(&self.config.target_prefix, stamp);

        for path in [&input, &output, &target] {
            ensure_parent(path)?;
        }
        raw.save_with_format(&input, ImageFormat::Jpeg)?;
        mask.save_with_format(&output, ImageFormat::Jpeg)?;
        annotated.save_with_format(&target, ImageFormat::Jpeg)?;

        Ok(vec![input, output, target])
    }

    /// Like [`save`](Self::save), but never fails; problems are logged.
    pub fn save_logged(
        &self,
        stamp: &str,
        raw: &RgbImage,
        mask: &GrayImage,
        annotated: &RgbImage,
    ) {
        match self.save(stamp, raw, mask, annotated) {
            Ok(_) => info!("Saved snapshot {}", stamp),
            Err(e) => warn!("Failed to save snapshot {}: {}", stamp, e),
        }
    }

    /// Archive one processed frame with its mask and annotated rendering,
    /// stamped with the frame's capture time.
    pub fn save_cycle(&self, frame: &Frame, output: &CycleOutput) {
        let annotated = annotate(frame.image(), &output.target, &output.others);
        let stamp = timestamp(frame.captured_at());
        self.save_logged(&stamp, frame.image(), &output.mask, &annotated);
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Fires once each time `found` goes from false to true.
#[derive(Debug, Default)]
pub struct FoundEdge {
    last: bool,
}

impl FoundEdge {
    pub fn observe(&mut self, found: bool) -> bool {
        let rising = found && !self.last;
        self.last = found;
        rising
    }
}
