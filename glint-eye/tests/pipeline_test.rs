//! End-to-end cycles over synthetic frames

use glint_eye::annotate::{annotate, TARGET_COLOR};
use glint_eye::{BoundingBox, Frame, MemoryTable, Pipeline, Publisher, StateTable, VisionConfig};
use image::{Rgb, RgbImage};
use std::sync::Arc;

const LIT: Rgb<u8> = Rgb([40, 255, 40]);

fn frame_with(rects: &[(u32, u32, u32, u32)]) -> Frame {
    let mut image = RgbImage::from_pixel(320, 240, Rgb([5, 5, 5]));
    for &(x, y, w, h) in rects {
        for yy in y..y + h {
            for xx in x..x + w {
                image.put_pixel(xx, yy, LIT);
            }
        }
    }
    Frame::new(0, image)
}

fn pipeline() -> (Arc<MemoryTable>, Pipeline) {
    let config = VisionConfig::default();
    let table = Arc::new(MemoryTable::new(config.table.name.clone()));
    let publisher = Publisher::new(table.clone(), config.table.clone());
    (table, Pipeline::new(&config, publisher))
}

#[test]
fn test_centered_target_reports_zero_bearing() {
    let (table, mut pipeline) = pipeline();
    let output = pipeline.process(&frame_with(&[(65, 100, 190, 40)]));

    assert_eq!(output.target.bbox, BoundingBox::new(65, 100, 190, 40));
    assert!(output.others.is_empty());
    assert!(output.report.found);
    assert_eq!(output.report.bearing_angle, Some(0.0));
    assert_eq!(output.report.distance, Some(42.0));

    assert_eq!(table.get("found").as_deref(), Some("true"));
    assert_eq!(table.get("xtheta").as_deref(), Some("0"));
    assert_eq!(table.get("dist").as_deref(), Some("42"));
    assert_eq!(output.mask.get_pixel(100, 110)[0], 255);
    assert_eq!(output.mask.get_pixel(10, 10)[0], 0);
}

#[test]
fn test_aspect_ratio_picks_target_among_two() {
    let (_, mut pipeline) = pipeline();
    let output = pipeline.process(&frame_with(&[(10, 20, 100, 30), (180, 120, 100, 60)]));

    assert_eq!(output.target.bbox, BoundingBox::new(180, 120, 100, 60));
    assert_eq!(output.others.len(), 1);
    assert_eq!(output.others[0].bbox, BoundingBox::new(10, 20, 100, 30));
    assert_eq!(pipeline.selector().tracking().previous, output.target.bbox);
}

#[test]
fn test_target_on_left_edge_is_found() {
    let (table, mut pipeline) = pipeline();
    let output = pipeline.process(&frame_with(&[(0, 100, 60, 36)]));

    assert_eq!(output.target.bbox, BoundingBox::new(0, 100, 60, 36));
    assert!(output.report.found);
    assert!(output.report.bearing_angle.unwrap() < 0.0);
    assert_eq!(table.get("found").as_deref(), Some("true"));
}

#[test]
fn test_empty_frame_resets_tracking() {
    let (table, mut pipeline) = pipeline();
    pipeline.process(&frame_with(&[(65, 100, 190, 40)]));
    assert!(!pipeline.selector().tracking().is_sentinel());

    let output = pipeline.process(&frame_with(&[]));
    assert!(!output.target.is_found());
    assert!(!output.report.found);
    assert!(output.report.distance.is_none());
    assert!(pipeline.selector().tracking().is_sentinel());
    assert_eq!(table.get("found").as_deref(), Some("false"));
    assert!(!pipeline.publisher().found());
}

#[test]
fn test_annotated_output_outlines_target() {
    let (_, mut pipeline) = pipeline();
    let frame = frame_with(&[(65, 100, 190, 40)]);
    let output = pipeline.process(&frame);

    let annotated = annotate(frame.image(), &output.target, &output.others);
    assert_eq!(*annotated.get_pixel(150, 100), TARGET_COLOR);
    assert_eq!(*annotated.get_pixel(150, 120), LIT);
}
