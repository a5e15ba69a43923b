// Bench-mode console
// Step through fixture images by hand, or run them all once headless

use anyhow::Result;
use glint_eye::archive::SnapshotArchive;
use glint_eye::{CycleOutput, Frame, Pipeline, SequenceSource, VisionReport};
use std::io::{self, BufRead, Write};
use tracing::info;

#[derive(Debug, PartialEq, Eq)]
pub enum BenchCommand {
    Next,
    Previous,
    Reprocess,
    Save,
    Quit,
    Help,
    Unknown(String),
}

pub fn parse_command(line: &str) -> BenchCommand {
    match line.trim() {
        "" => BenchCommand::Reprocess,
        "a" | "n" | "next" => BenchCommand::Next,
        "b" | "p" | "prev" | "previous" => BenchCommand::Previous,
        "s" | "save" => BenchCommand::Save,
        "q" | "quit" | "exit" => BenchCommand::Quit,
        "h" | "help" | "?" => BenchCommand::Help,
        other => BenchCommand::Unknown(other.to_string()),
    }
}

fn describe(report: &VisionReport) -> String {
    match (report.found, report.bearing_angle, report.distance) {
        (true, Some(angle), Some(distance)) => {
            format!("target at {:.2} deg, distance {:.2}", angle, distance)
        }
        _ => "no target".to_string(),
    }
}

/// Process every fixture once, in order.
pub fn run_headless(mut source: SequenceSource, pipeline: &mut Pipeline, max_cycles: Option<u64>) {
    let total = source.len() as u64;
    let count = max_cycles.map_or(total, |max| max.min(total));

    let mut found = 0;
    for _ in 0..count {
        let frame = source.next();
        let output = pipeline.process(&frame);
        if output.report.found {
            found += 1;
        }
        let name = source
            .current_path()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        info!("{}: {}", name, describe(&output.report));
    }
    info!("Processed {} fixtures, target found in {}", count, found);
}

pub struct BenchConsole {
    source: SequenceSource,
    pipeline: Pipeline,
    archive: SnapshotArchive,
    current: Option<(Frame, CycleOutput)>,
}

impl BenchConsole {
    pub fn new(source: SequenceSource, pipeline: Pipeline, archive: SnapshotArchive) -> Self {
        Self {
            source,
            pipeline,
            archive,
            current: None,
        }
    }

    /// Read commands until `quit`, end of input or `max_cycles` frames.
    /// Returns the number of frames processed.
    pub fn run<R: BufRead>(mut self, input: R, max_cycles: Option<u64>) -> Result<u64> {
        print_help();
        let mut cycles = 0;

        let frame = self.source.next();
        self.show(frame);
        cycles += 1;

        for line in input.lines() {
            if max_cycles.map_or(false, |max| cycles >= max) {
                break;
            }

            let frame = match parse_command(&line?) {
                BenchCommand::Next => self.source.next(),
                BenchCommand::Previous => self.source.previous(),
                BenchCommand::Reprocess => self.source.current(),
                BenchCommand::Save => {
                    self.save();
                    prompt()?;
                    continue;
                }
                BenchCommand::Quit => break,
                BenchCommand::Help => {
                    print_help();
                    prompt()?;
                    continue;
                }
                BenchCommand::Unknown(cmd) => {
                    eprintln!("Unknown command: {} (h for help)", cmd);
                    prompt()?;
                    continue;
                }
            };
            self.show(frame);
            cycles += 1;
        }

        Ok(cycles)
    }

    fn show(&mut self, frame: Frame) {
        let output = self.pipeline.process(&frame);
        let index = self.source.current_index().unwrap_or(0);
        eprintln!(
            "[{}/{}] {}",
            index + 1,
            self.source.len(),
            describe(&output.report)
        );
        self.current = Some((frame, output));
        let _ = prompt();
    }

    fn save(&self) {
        match &self.current {
            Some((frame, output)) => self.archive.save_cycle(frame, output),
            None => eprintln!("Nothing to save yet"),
        }
    }
}

fn prompt() -> io::Result<()> {
    let mut err = io::stderr();
    write!(err, "glint> ")?;
    err.flush()
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  a, n       - next fixture");
    eprintln!("  b, p       - previous fixture");
    eprintln!("  <enter>    - process the current fixture again");
    eprintln!("  s          - save a snapshot of the current frame");
    eprintln!("  q          - quit");
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_eye::config::ArchiveConfig;
    use glint_eye::{MemoryTable, Publisher, VisionConfig};
    use image::RgbImage;
    use std::io::Cursor;
    use std::sync::Arc;

    fn console(archive: ArchiveConfig) -> BenchConsole {
        let config = VisionConfig::default();
        let images = vec![RgbImage::new(320, 240), RgbImage::new(320, 240)];
        let source = SequenceSource::from_images(images).unwrap();
        let publisher = Publisher::new(Arc::new(MemoryTable::new("vision")), config.table.clone());
        BenchConsole::new(
            source,
            Pipeline::new(&config, publisher),
            SnapshotArchive::new(archive),
        )
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("a"), BenchCommand::Next);
        assert_eq!(parse_command("n\n"), BenchCommand::Next);
        assert_eq!(parse_command("p"), BenchCommand::Previous);
        assert_eq!(parse_command("b"), BenchCommand::Previous);
        assert_eq!(parse_command(""), BenchCommand::Reprocess);
        assert_eq!(parse_command("  "), BenchCommand::Reprocess);
        assert_eq!(parse_command("s"), BenchCommand::Save);
        assert_eq!(parse_command("q"), BenchCommand::Quit);
        assert_eq!(parse_command("zz"), BenchCommand::Unknown("zz".to_string()));
    }

    #[test]
    fn test_quit_stops_processing() {
        let dir = tempfile::tempdir().unwrap();
        let console = console(ArchiveConfig {
            directory: dir.path().to_path_buf(),
            ..ArchiveConfig::default()
        });
        let cycles = console.run(Cursor::new("n\np\n\nq\nn\n"), None).unwrap();
        assert_eq!(cycles, 4);
    }

    #[test]
    fn test_end_of_input_stops() {
        let dir = tempfile::tempdir().unwrap();
        let console = console(ArchiveConfig {
            directory: dir.path().to_path_buf(),
            ..ArchiveConfig::default()
        });
        assert_eq!(console.run(Cursor::new(""), None).unwrap(), 1);
    }

    #[test]
    fn test_max_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let console = console(ArchiveConfig {
            directory: dir.path().to_path_buf(),
            ..ArchiveConfig::default()
        });
        assert_eq!(console.run(Cursor::new("n\nn\nn\nn\n"), Some(3)).unwrap(), 3);
    }

    #[test]
    fn test_save_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let console = console(ArchiveConfig {
            directory: dir.path().to_path_buf(),
            ..ArchiveConfig::default()
        });
        console.run(Cursor::new("s\nq\n"), None).unwrap();

        for sub in ["inputs", "outputs", "targets"] {
            let entries = std::fs::read_dir(dir.path().join(sub)).unwrap().count();
            assert_eq!(entries, 1, "{}", sub);
        }
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(&VisionReport::NOT_FOUND), "no target");
        let report = VisionReport {
            found: true,
            bearing_angle: Some(1.5),
            distance: Some(42.0),
        };
        assert_eq!(describe(&report), "target at 1.50 deg, distance 42.00");
    }
}
