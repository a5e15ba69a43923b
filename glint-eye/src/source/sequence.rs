//! Bench-mode fixture sequence

use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Result, VisionError};
use crate::frame::{fit_to, Frame};
use crate::source::{Acquired, FrameSource};

struct Fixture {
    path: PathBuf,
    image: RgbImage,
}

/// Fixture images decoded up front, walked with a cursor that wraps at both
/// ends.
pub struct SequenceSource {
    fixtures: Vec<Fixture>,
    position: Option<usize>,
    handed_out: u64,
}

impl SequenceSource {
    /// Decode every file matching `pattern`. Any unreadable file, or no match
    /// at all, is a fixture error.
    pub fn load(pattern: &str, resolution: (u32, u32)) -> Result<Self> {
        let mut fixtures = Vec::new();
        for entry in glob::glob(pattern)? {
            let path = entry.map_err(|e| VisionError::Fixture {
                path: e.path().to_path_buf(),
                reason: e.error().to_string(),
            })?;
            let image = decode_fixture(&path)?;
            debug!("Loaded fixture {}", path.display());
            fixtures.push(Fixture {
                path,
                image: fit_to(image, resolution),
            });
        }

        if fixtures.is_empty() {
            return Err(VisionError::Fixture {
                path: PathBuf::from(pattern),
                reason: "no files match".to_string(),
            });
        }

        info!("Loaded {} fixtures from {}", fixtures.len(), pattern);
        Ok(Self::with_fixtures(fixtures))
    }

    /// Sequence over in-memory images.
    pub fn from_images(images: Vec<RgbImage>) -> Result<Self> {
        if images.is_empty() {
            return Err(VisionError::Fixture {
                path: PathBuf::from("<memory>"),
                reason: "empty image set".to_string(),
            });
        }

        let fixtures = images
            .into_iter()
            .enumerate()
            .map(|(i, image)| Fixture {
                path: PathBuf::from(format!("<memory:{}>", i)),
                image,
            })
            .collect();
        Ok(Self::with_fixtures(fixtures))
    }

    fn with_fixtures(fixtures: Vec<Fixture>) -> Self {
        Self {
            fixtures,
            position: None,
            handed_out: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Index of the fixture last handed out; `None` before the first move.
    pub fn current_index(&self) -> Option<usize> {
        self.position
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.position.map(|i| self.fixtures[i].path.as_path())
    }

    /// Advance, wrapping from the last fixture to the first.
    pub fn next(&mut self) -> Frame {
        let n = self.fixtures.len();
        let index = match self.position {
            Some(pos) => (pos + 1) % n,
            None => 0,
        };
        self.move_to(index)
    }

    /// Step back, wrapping from the first fixture to the last.
    pub fn previous(&mut self) -> Frame {
        let n = self.fixtures.len();
        let index = match self.position {
            Some(pos) => (pos + n - 1) % n,
            None => n - 1,
        };
        self.move_to(index)
    }

    /// Another copy of the current fixture, or the first one if the cursor
    /// has not moved yet.
    pub fn current(&mut self) -> Frame {
        let index = self.position.unwrap_or(0);
        self.move_to(index)
    }

    fn move_to(&mut self, index: usize) -> Frame {
        self.position = Some(index);
        let frame = Frame::new(self.handed_out, self.fixtures[index].image.clone());
        self.handed_out += 1;
        frame
    }
}

impl FrameSource for SequenceSource {
    fn acquire(&mut self) -> Result<Acquired> {
        Ok(Acquired::Frame(self.next()))
    }

    fn describe(&self) -> String {
        format!("{} fixtures", self.fixtures.len())
    }
}

fn decode_fixture(path: &Path) -> Result<RgbImage> {
    image::open(path)
        .map(|image| image.into_rgb8())
        .map_err(|e| VisionError::Fixture {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn tagged(n: u8) -> RgbImage {
        RgbImage::from_pixel(2, 2, Rgb([n, n, n]))
    }

    fn tag(frame: &Frame) -> u8 {
        frame.image().get_pixel(0, 0)[0]
    }

    #[test]
    fn test_next_wraps_to_first() {
        let mut seq = SequenceSource::from_images(vec![tagged(0), tagged(1), tagged(2)]).unwrap();
        let tags: Vec<u8> = (0..4).map(|_| tag(&seq.next())).collect();
        assert_eq!(tags, vec![0, 1, 2, 0]);
        assert_eq!(seq.current_index(), Some(0));
    }

    #[test]
    fn test_previous_from_first_wraps_to_last() {
        let mut seq = SequenceSource::from_images(vec![tagged(0), tagged(1), tagged(2)]).unwrap();
        seq.next();
        assert_eq!(seq.current_index(), Some(0));
        assert_eq!(tag(&seq.previous()), 2);
        assert_eq!(seq.current_index(), Some(2));
    }

    #[test]
    fn test_previous_before_first_move_is_last() {
        let mut seq = SequenceSource::from_images(vec![tagged(0), tagged(1)]).unwrap();
        assert_eq!(tag(&seq.previous()), 1);
    }

    #[test]
    fn test_current_repeats_without_moving() {
        let mut seq = SequenceSource::from_images(vec![tagged(0), tagged(1)]).unwrap();
        seq.next();
        seq.next();
        let a = seq.current();
        let b = seq.current();
        assert_eq!(tag(&a), 1);
        assert_eq!(tag(&b), 1);
        assert!(b.sequence() > a.sequence());
    }

    #[test]
    fn test_empty_set_is_fixture_error() {
        match SequenceSource::from_images(Vec::new()) {
            Err(VisionError::Fixture { .. }) => {}
            _ => panic!("Expected Fixture error"),
        }
    }

    #[test]
    fn test_acquire_cycles_forever() {
        let mut seq = SequenceSource::from_images(vec![tagged(7)]).unwrap();
        for _ in 0..3 {
            let frame = seq.acquire().unwrap().into_frame().unwrap();
            assert_eq!(tag(&frame), 7);
        }
        assert_eq!(seq.describe(), "1 fixtures");
    }
}
