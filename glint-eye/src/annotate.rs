//! Outlining candidates on a copy of the frame

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use imageproc::point::Point;

use crate::processing::{Candidate, Target};

pub const OTHER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const TARGET_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const LINE_WIDTH: i32 = 3;

/// Copy of `image` with the other candidates outlined in blue and the target
/// in red on top.
pub fn annotate(image: &RgbImage, target: &Target, others: &[Candidate]) -> RgbImage {
    let mut canvas = image.clone();
    for candidate in others {
        outline(&mut canvas, &candidate.polygon, OTHER_COLOR);
    }
    if target.is_found() {
        outline(&mut canvas, &target.polygon, TARGET_COLOR);
    }
    canvas
}

/// Closed polyline through `polygon`, `LINE_WIDTH` pixels wide.
pub fn outline(canvas: &mut RgbImage, polygon: &[Point<i32>], color: Rgb<u8>) {
    if polygon.len() < 2 {
        return;
    }

    let half = LINE_WIDTH / 2;
    for (i, a) in polygon.iter().enumerate() {
        let b = polygon[(i + 1) % polygon.len()];
        for dx in -half..=half {
            for dy in -half..=half {
                draw_line_segment_mut(
                    canvas,
                    ((a.x + dx) as f32, (a.y + dy) as f32),
                    ((b.x + dx) as f32, (b.y + dy) as f32),
                    color,
                );
            }
        }
    }
}
