//! Pixel geometry to bearing angle and range

use serde::{Deserialize, Serialize};

use crate::config::Calibration;
use crate::processing::extract::BoundingBox;

/// What the robot controller gets each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisionReport {
    pub found: bool,
    /// Degrees, positive to the right of the image center
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearing_angle: Option<f64>,
    /// Same unit as the calibrated target width
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl VisionReport {
    pub const NOT_FOUND: VisionReport = VisionReport {
        found: false,
        bearing_angle: None,
        distance: None,
    };
}

/// Range and bearing of the target in `bbox`.
///
/// A box without width has no finite range and reports not found.
pub fn project(bbox: &BoundingBox, calibration: &Calibration) -> VisionReport {
    let distance = (calibration.target_width * calibration.fov_constant) / bbox.width as f64;
    if !distance.is_finite() || distance <= 0.0 {
        return VisionReport::NOT_FOUND;
    }

    let (center_x, _) = bbox.center();
    let offset_px = center_x - calibration.reference_width / 2.0;
    let sine = (calibration.angular_coefficient() * offset_px / distance).clamp(-1.0, 1.0);
    let bearing_angle = sine.asin().to_degrees();

    VisionReport {
        found: true,
        bearing_angle: Some(bearing_angle),
        distance: Some(distance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_target_has_zero_bearing() {
        let report = project(&BoundingBox::new(65, 100, 190, 40), &Calibration::default());
        assert!(report.found);
        assert_eq!(report.bearing_angle, Some(0.0));
        let distance = report.distance.unwrap();
        assert!((distance - 20.0 * 399.0 / 190.0).abs() < 1e-12);
        assert!((distance - 42.0).abs() < 0.02);
    }

    #[test]
    fn test_zero_width_is_not_found() {
        let report = project(&BoundingBox::new(100, 100, 0, 40), &Calibration::default());
        assert_eq!(report, VisionReport::NOT_FOUND);
        assert_eq!(project(&BoundingBox::SENTINEL, &Calibration::default()), VisionReport::NOT_FOUND);
    }

    #[test]
    fn test_bearing_sign_follows_offset() {
        let cal = Calibration::default();
        let right = project(&BoundingBox::new(200, 100, 40, 24), &cal);
        let left = project(&BoundingBox::new(80, 100, 40, 24), &cal);
        assert!(right.bearing_angle.unwrap() > 0.0);
        assert!(left.bearing_angle.unwrap() < 0.0);
    }

    #[test]
    fn test_bearing_matches_formula() {
        let cal = Calibration::default();
        let bbox = BoundingBox::new(200, 100, 40, 24);
        let distance = 20.0 * 399.0 / 40.0;
        let offset = 220.0 - 160.0;
        let expected = (cal.angular_coefficient() * offset / distance).asin().to_degrees();
        let report = project(&bbox, &cal);
        assert!((report.bearing_angle.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_offset_is_clamped() {
        let cal = Calibration {
            correction_scale: 1000.0,
            ..Calibration::default()
        };
        let report = project(&BoundingBox::new(300, 0, 300, 200), &cal);
        assert!(report.found);
        assert!((report.bearing_angle.unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_not_found_serializes_without_fields() {
        let json = serde_json::to_string(&VisionReport::NOT_FOUND).unwrap();
        assert_eq!(json, r#"{"found":false}"#);
    }
}
