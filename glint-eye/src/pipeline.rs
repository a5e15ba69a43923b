//! One processing cycle: segment, extract, select, project, publish

use image::GrayImage;
use tracing::{debug, warn};

use crate::config::{Calibration, ExtractionConfig, HsvThresholds, VisionConfig};
use crate::frame::Frame;
use crate::processing::{extract, project, segment, Candidate, Target, TargetSelector, VisionReport};
use crate::publish::Publisher;

/// Everything a cycle produced, for rendering and archiving.
#[derive(Debug)]
pub struct CycleOutput {
    pub mask: GrayImage,
    pub target: Target,
    pub others: Vec<Candidate>,
    pub report: VisionReport,
}

pub struct Pipeline {
    thresholds: HsvThresholds,
    extraction: ExtractionConfig,
    selector: TargetSelector,
    calibration: Calibration,
    publisher: Publisher,
}

impl Pipeline {
    pub fn new(config: &VisionConfig, publisher: Publisher) -> Self {
        Self {
            thresholds: config.segmentation,
            extraction: config.extraction.clone(),
            selector: TargetSelector::new(config.selection.goal_ratio),
            calibration: config.calibration.clone(),
            publisher,
        }
    }

    pub fn process(&mut self, frame: &Frame) -> CycleOutput {
        let mask = segment(frame.image(), &self.thresholds);
        let candidates = extract(&mask, &self.extraction);
        let (target, others) = self.selector.select(candidates);
        let report = project(&target.bbox, &self.calibration);

        if let Err(e) = self.publisher.publish(&report) {
            warn!("Failed to publish vision report: {}", e);
        }

        debug!(
            "Frame {}: found={} angle={:?} distance={:?} ({} other candidates)",
            frame.sequence(),
            report.found,
            report.bearing_angle,
            report.distance,
            others.len()
        );

        CycleOutput {
            mask,
            target,
            others,
            report,
        }
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn selector(&self) -> &TargetSelector {
        &self.selector
    }
}
