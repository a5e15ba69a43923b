//! Configuration for glint-eye

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::VisionError;

/// Network camera connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera host (name or address, optionally with port)
    pub host: String,
    /// Basic-auth user; empty with an empty password disables auth
    pub username: String,
    pub password: String,
    /// Path of the multipart MJPEG stream on the camera
    pub path: String,
    /// Fallback multipart boundary token
    pub boundary: String,
    /// Take the boundary from the response Content-Type when it carries one
    pub parse_boundary: bool,
    /// Fixed delay between session attempts
    pub reconnect_delay_ms: u64,
    pub connect_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            host: "10.9.73.20".to_string(),
            username: String::new(),
            password: String::new(),
            path: "/mjpg/video.mjpg".to_string(),
            boundary: "myboundary".to_string(),
            parse_boundary: true,
            reconnect_delay_ms: 4000,
            connect_timeout_ms: 5000,
        }
    }
}

impl CameraConfig {
    pub fn url(&self) -> String {
        format!("http://{}{}", self.host, self.path)
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() || !self.password.is_empty()
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Inclusive `[low, high]` band on one 8-bit channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRange {
    pub low: u8,
    pub high: u8,
}

impl ChannelRange {
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    #[inline]
    pub fn contains(&self, value: u8) -> bool {
        self.low <= value && value <= self.high
    }
}

/// Per-channel HSV cutoffs. Hue uses the 0..=179 half-degree scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvThresholds {
    pub hue: ChannelRange,
    pub saturation: ChannelRange,
    pub value: ChannelRange,
}

impl Default for HsvThresholds {
    fn default() -> Self {
        Self {
            hue: ChannelRange::new(51, 255),
            saturation: ChannelRange::new(157, 255),
            value: ChannelRange::new(101, 255),
        }
    }
}

/// Contour-to-candidate filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Polygon approximation tolerance as a fraction of the contour perimeter
    pub epsilon_factor: f64,
    /// Hull area must lie in `[min_polygon_area, max_polygon_area)`
    pub min_polygon_area: f64,
    pub max_polygon_area: f64,
    /// Bounding-box area (width * height) must lie in `[min_box_area, max_box_area]`
    pub min_box_area: i64,
    pub max_box_area: i64,
    pub min_hull_vertices: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            epsilon_factor: 0.02,
            min_polygon_area: 100.0,
            max_polygon_area: 70000.0,
            min_box_area: 500,
            max_box_area: 9000,
            min_hull_vertices: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Expected bounding-box height / width of the target
    pub goal_ratio: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { goal_ratio: 0.6 }
    }
}

/// Fixed calibration of the camera against the physical target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Physical target width (inches)
    pub target_width: f64,
    /// Focal scalar relating physical width and pixel width to range
    pub fov_constant: f64,
    /// Empirical lens correction angle (degrees)
    pub correction_angle_deg: f64,
    /// Empirical pixel-to-range scale paired with the correction angle
    pub correction_scale: f64,
    /// Nominal processing width the bearing offset is measured against
    pub reference_width: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            target_width: 20.0,
            fov_constant: 399.0,
            correction_angle_deg: 8.08,
            correction_scale: 190.0 / 55.0,
            reference_width: 320.0,
        }
    }
}

impl Calibration {
    pub fn angular_coefficient(&self) -> f64 {
        self.correction_angle_deg.to_radians().sin() * self.correction_scale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Nominal processing resolution (width, height)
    pub resolution: (u32, u32),
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self { resolution: (320, 240) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// Glob resolved once at startup in bench mode
    pub pattern: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            pattern: "images/inputs/*.jpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enabled: bool,
    pub directory: PathBuf,
    pub input_prefix: String,
    pub output_prefix: String,
    pub target_prefix: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: PathBuf::from("images"),
            input_prefix: "inputs/Input_".to_string(),
            output_prefix: "outputs/Out_".to_string(),
            target_prefix: "targets/Target_".to_string(),
        }
    }
}

/// Names used on the shared robot-state table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub name: String,
    pub found_key: String,
    pub angle_key: String,
    pub distance_key: String,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: "vision".to_string(),
            found_key: "found".to_string(),
            angle_key: "xtheta".to_string(),
            distance_key: "dist".to_string(),
        }
    }
}

/// Vision system configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub camera: CameraConfig,
    pub segmentation: HsvThresholds,
    pub extraction: ExtractionConfig,
    pub selection: SelectionConfig,
    pub calibration: Calibration,
    pub processing: ProcessingConfig,
    pub fixtures: FixtureConfig,
    pub archive: ArchiveConfig,
    pub table: TableConfig,
}

impl VisionConfig {
    /// Load configuration from a TOML or JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VisionError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
            .map_err(|e| VisionError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration, TOML first and JSON second
    pub fn from_str(content: &str) -> Result<Self, String> {
        let toml_err = match toml::from_str::<VisionConfig>(content) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        if let Ok(config) = serde_json::from_str::<VisionConfig>(content) {
            return Ok(config);
        }

        Err(format!("not valid TOML or JSON ({})", toml_err))
    }

    /// Override camera settings from `GLINT_CAMERA_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("GLINT_CAMERA_HOST") {
            self.camera.host = host;
        }
        if let Ok(user) = std::env::var("GLINT_CAMERA_USER") {
            self.camera.username = user;
        }
        if let Ok(password) = std::env::var("GLINT_CAMERA_PASSWORD") {
            self.camera.password = password;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.camera.host.trim().is_empty() {
            return Err("Camera host must not be empty".to_string());
        }

        if !self.camera.path.starts_with('/') {
            return Err("Camera path must start with '/'".to_string());
        }

        if self.camera.boundary.is_empty() {
            return Err("Multipart boundary must not be empty".to_string());
        }

        let hsv = &self.segmentation;
        for (name, range) in [("hue", hsv.hue), ("saturation", hsv.saturation), ("value", hsv.value)] {
            if range.low > range.high {
                return Err(format!("{} threshold low ({}) exceeds high ({})", name, range.low, range.high));
            }
        }

        let ex = &self.extraction;
        if !(ex.epsilon_factor > 0.0 && ex.epsilon_factor < 1.0) {
            return Err("epsilon_factor must be in (0, 1)".to_string());
        }
        if ex.min_polygon_area < 0.0 || ex.min_polygon_area >= ex.max_polygon_area {
            return Err("Polygon area band must satisfy 0 <= min < max".to_string());
        }
        if ex.min_box_area < 0 || ex.min_box_area > ex.max_box_area {
            return Err("Bounding-box area band must satisfy 0 <= min <= max".to_string());
        }
        if ex.min_hull_vertices < 3 {
            return Err("min_hull_vertices must be at least 3".to_string());
        }

        if !(self.selection.goal_ratio.is_finite() && self.selection.goal_ratio > 0.0) {
            return Err("goal_ratio must be a positive finite number".to_string());
        }

        let cal = &self.calibration;
        if !(cal.target_width > 0.0 && cal.fov_constant > 0.0) {
            return Err("Calibration target_width and fov_constant must be positive".to_string());
        }
        if !cal.angular_coefficient().is_finite() {
            return Err("Calibration angular coefficient is not finite".to_string());
        }
        if cal.reference_width <= 0.0 {
            return Err("Calibration reference_width must be positive".to_string());
        }

        let (width, height) = self.processing.resolution;
        if width == 0 || height == 0 {
            return Err("Resolution must be non-zero".to_string());
        }
        if width > 7680 || height > 4320 {
            return Err("Resolution too large (max 8K)".to_string());
        }

        if self.fixtures.pattern.trim().is_empty() {
            return Err("Fixture pattern must not be empty".to_string());
        }

        if self.table.name.is_empty() {
            return Err("Table name must not be empty".to_string());
        }

        Ok(())
    }
}
