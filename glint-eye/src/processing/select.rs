//! Target selection with frame-to-frame hysteresis

use imageproc::point::Point;
use tracing::debug;

use crate::processing::extract::{BoundingBox, Candidate};

/// The candidate chosen this cycle, or the "no target" sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub polygon: Vec<Point<i32>>,
    pub bbox: BoundingBox,
}

impl Target {
    pub fn none() -> Self {
        Self {
            polygon: Vec::new(),
            bbox: BoundingBox::SENTINEL,
        }
    }

    pub fn is_found(&self) -> bool {
        !self.bbox.is_sentinel()
    }
}

impl From<Candidate> for Target {
    fn from(candidate: Candidate) -> Self {
        Self {
            polygon: candidate.polygon,
            bbox: candidate.bbox,
        }
    }
}

/// Previous cycle's target box, the reference for positional continuity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingState {
    pub previous: BoundingBox,
}

impl TrackingState {
    pub const fn sentinel() -> Self {
        Self {
            previous: BoundingBox::SENTINEL,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.previous.is_sentinel()
    }
}

impl Default for TrackingState {
    fn default() -> Self {
        Self::sentinel()
    }
}

/// Result of one selection pass.
#[derive(Debug, Clone)]
pub struct Selection {
    pub target: Target,
    /// Every candidate except the one that became the target
    pub others: Vec<Candidate>,
    pub tracking: TrackingState,
}

/// Pick this cycle's target from `candidates`.
///
/// The candidate whose box ratio is nearest `goal_ratio` wins, unless the
/// candidate nearest the previous target is that very box. Tracking always
/// moves to the new target, sentinel included.
pub fn select(candidates: Vec<Candidate>, tracking: &TrackingState, goal_ratio: f64) -> Selection {
    if candidates.is_empty() {
        return Selection {
            target: Target::none(),
            others: candidates,
            tracking: TrackingState::sentinel(),
        };
    }

    let by_ratio = closest_ratio(&candidates, goal_ratio);
    let by_position = closest_to_old(&candidates, tracking);

    let chosen = match (by_ratio, by_position) {
        (Some(r), Some(p)) if candidates[r].bbox == candidates[p].bbox => Some(p),
        (Some(r), _) => Some(r),
        (None, p) => p,
    };

    let mut others = candidates;
    let target = match chosen {
        Some(index) => Target::from(others.remove(index)),
        None => Target::none(),
    };

    debug!(
        "Selected {:?} (ratio pick {:?}, continuity pick {:?}), {} others",
        target.bbox,
        by_ratio,
        by_position,
        others.len()
    );

    Selection {
        tracking: TrackingState {
            previous: target.bbox,
        },
        target,
        others,
    }
}

fn closest_ratio(candidates: &[Candidate], goal_ratio: f64) -> Option<usize> {
    let mut best = None;
    let mut best_err = f64::INFINITY;
    for (i, candidate) in candidates.iter().enumerate() {
        let err = (candidate.bbox.aspect_ratio() - goal_ratio).abs();
        if err < best_err {
            best_err = err;
            best = Some(i);
        }
    }
    best
}

/// Only a candidate nearer on both axes than the best so far takes over.
fn closest_to_old(candidates: &[Candidate], tracking: &TrackingState) -> Option<usize> {
    if tracking.is_sentinel() {
        return None;
    }

    let (old_x, old_y) = tracking.previous.center();
    let mut best = None;
    let (mut best_dx, mut best_dy) = (f64::INFINITY, f64::INFINITY);
    for (i, candidate) in candidates.iter().enumerate() {
        let (x, y) = candidate.bbox.center();
        let (dx, dy) = ((x - old_x).abs(), (y - old_y).abs());
        if dx < best_dx && dy < best_dy {
            best_dx = dx;
            best_dy = dy;
            best = Some(i);
        }
    }
    best
}

/// Owns the tracking state of one running pipeline.
#[derive(Debug, Clone)]
pub struct TargetSelector {
    goal_ratio: f64,
    tracking: TrackingState,
}

impl TargetSelector {
    pub fn new(goal_ratio: f64) -> Self {
        Self {
            goal_ratio,
            tracking: TrackingState::sentinel(),
        }
    }

    pub fn select(&mut self, candidates: Vec<Candidate>) -> (Target, Vec<Candidate>) {
        let selection = select(candidates, &self.tracking, self.goal_ratio);
        self.tracking = selection.tracking;
        (selection.target, selection.others)
    }

    pub fn tracking(&self) -> TrackingState {
        self.tracking
    }
}
