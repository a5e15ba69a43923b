//! Contour-to-polygon candidate extraction

use image::GrayImage;
use image::imageops;
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length, convex_hull};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExtractionConfig;

/// Axis-aligned pixel bounding box. Width and height count pixels, so a
/// single pixel is 1x1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    /// The "no target" box: off-image and at most one pixel in size.
    pub const SENTINEL: BoundingBox = BoundingBox {
        x: -1,
        y: -1,
        width: 0,
        height: 0,
    };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest box enclosing `points`; the sentinel when there are none.
    pub fn enclosing(points: &[Point<i32>]) -> Self {
        let Some(first) = points.first() else {
            return Self::SENTINEL;
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
    }

    pub fn is_sentinel(&self) -> bool {
        self.width <= 1 && self.height <= 1
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Height over width; infinite for a zero-width box.
    pub fn aspect_ratio(&self) -> f64 {
        self.height as f64 / self.width as f64
    }
}

/// A convex polygon that passed every shape filter this cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub polygon: Vec<Point<i32>>,
    pub bbox: BoundingBox,
    pub area: f64,
}

impl Candidate {
    pub fn from_polygon(polygon: Vec<Point<i32>>) -> Self {
        let bbox = BoundingBox::enclosing(&polygon);
        let area = polygon_area(&polygon);
        Self { polygon, bbox, area }
    }
}

/// Find the outer regions of `mask` and keep the ones shaped like a target,
/// in discovery order.
pub fn extract(mask: &GrayImage, config: &ExtractionConfig) -> Vec<Candidate> {
    let contours = find_contours::<i32>(&pad(mask));
    let total = contours.len();

    let candidates: Vec<Candidate> = contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter_map(|c| {
            let points: Vec<Point<i32>> = c
                .points
                .iter()
                .map(|p| Point::new(p.x - 1, p.y - 1))
                .collect();
            shape_candidate(&points, config)
        })
        .collect();

    debug!("Extracted {} candidates from {} contours", candidates.len(), total);
    candidates
}

/// Copy of `mask` inside a one pixel background frame. Border following
/// misreads regions that start in column 0 as parentless holes.
fn pad(mask: &GrayImage) -> GrayImage {
    let mut framed = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut framed, mask, 1, 1);
    framed
}

fn shape_candidate(points: &[Point<i32>], config: &ExtractionConfig) -> Option<Candidate> {
    if points.len() < 3 {
        return None;
    }

    let epsilon = arc_length(points, true) * config.epsilon_factor;
    let approx = approximate_polygon_dp(points, epsilon, true);
    let hull = convex_hull(approx.as_slice());

    if hull.len() < config.min_hull_vertices {
        return None;
    }

    let candidate = Candidate::from_polygon(hull);
    if candidate.area < config.min_polygon_area || candidate.area >= config.max_polygon_area {
        return None;
    }
    if !is_convex(&candidate.polygon) {
        return None;
    }

    let box_area = candidate.bbox.area();
    if box_area < config.min_box_area || box_area > config.max_box_area {
        return None;
    }

    Some(candidate)
}

/// Unsigned shoelace area of a closed polygon.
pub fn polygon_area(polygon: &[Point<i32>]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let twice: i64 = polygon
        .iter()
        .zip(polygon.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// True when every turn along the closed polygon bends the same way.
/// Collinear runs are tolerated.
pub fn is_convex(polygon: &[Point<i32>]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut sign = 0i64;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[(i + 1) % n];
        let c = polygon[(i + 2) % n];
        let cross = (b.x - a.x) as i64 * (c.y - b.y) as i64 - (b.y - a.y) as i64 * (c.x - b.x) as i64;
        if cross == 0 {
            continue;
        }
        if sign == 0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0
}
