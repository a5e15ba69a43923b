// Live camera sessions
// Connect, process until the stream ends, reconnect

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver};
use glint_eye::archive::{FoundEdge, SnapshotArchive};
use glint_eye::{Acquired, FrameSource, LiveStreamSource, Pipeline, VisionConfig};
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, warn};

use crate::console::{parse_command, BenchCommand};

/// Commands typed while the camera streams, read on a background thread.
pub struct LiveControls {
    commands: Receiver<BenchCommand>,
    quit: Arc<AtomicBool>,
}

impl LiveControls {
    /// Start reading commands from `input`. The reader is detached and ends
    /// with its input.
    pub fn spawn<R: BufRead + Send + 'static>(input: R) -> io::Result<Self> {
        let (tx, rx) = unbounded();
        let quit = Arc::new(AtomicBool::new(false));

        let flag = quit.clone();
        let _reader = thread::Builder::new()
            .name("glint-keys".to_string())
            .spawn(move || {
                for line in input.lines() {
                    let Ok(line) = line else { break };
                    let command = parse_command(&line);
                    // Raised here so a reconnect wait sees it too.
                    if command == BenchCommand::Quit {
                        flag.store(true, Ordering::SeqCst);
                    }
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                debug!("Command input closed");
            })?;

        Ok(Self { commands: rx, quit })
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    EndOfStream,
    Quit,
    CycleLimit,
}

struct LiveLoop<'a> {
    pipeline: &'a mut Pipeline,
    archive: &'a SnapshotArchive,
    controls: Option<&'a LiveControls>,
    max_cycles: Option<u64>,
    cycles: u64,
    edge: FoundEdge,
}

impl<'a> LiveLoop<'a> {
    fn new(
        pipeline: &'a mut Pipeline,
        archive: &'a SnapshotArchive,
        controls: Option<&'a LiveControls>,
        max_cycles: Option<u64>,
    ) -> Self {
        Self {
            pipeline,
            archive,
            controls,
            max_cycles,
            cycles: 0,
            edge: FoundEdge::default(),
        }
    }

    /// Process frames from one session until it ends or we are told to stop.
    fn drain<S: FrameSource>(&mut self, source: &mut S) -> Result<SessionEnd> {
        loop {
            let frame = match source.acquire()? {
                Acquired::Frame(frame) => frame,
                Acquired::EndOfStream => return Ok(SessionEnd::EndOfStream),
            };

            let output = self.pipeline.process(&frame);
            if self.edge.observe(self.pipeline.publisher().found()) && self.archive.is_enabled() {
                self.archive.save_cycle(&frame, &output);
            }
            self.cycles += 1;

            if let Some(controls) = self.controls {
                for command in controls.commands.try_iter() {
                    match command {
                        BenchCommand::Save => self.archive.save_cycle(&frame, &output),
                        BenchCommand::Quit => return Ok(SessionEnd::Quit),
                        BenchCommand::Help => print_help(),
                        BenchCommand::Unknown(cmd) => {
                            eprintln!("Unknown command: {} (h for help)", cmd)
                        }
                        other => warn!("{:?} only applies to fixtures", other),
                    }
                }
            }

            if self.max_cycles.map_or(false, |max| self.cycles >= max) {
                return Ok(SessionEnd::CycleLimit);
            }
        }
    }
}

pub fn run_live(
    config: &VisionConfig,
    pipeline: &mut Pipeline,
    archive: &SnapshotArchive,
    controls: Option<&LiveControls>,
    max_cycles: Option<u64>,
) -> Result<()> {
    if controls.is_some() {
        print_help();
    }
    let mut live = LiveLoop::new(pipeline, archive, controls, max_cycles);

    loop {
        let shutdown = controls.map(|c| c.quit.as_ref());
        let Some(mut source) =
            LiveStreamSource::connect_with_retry(&config.camera, &config.processing, shutdown)
        else {
            info!("Quit requested while connecting");
            return Ok(());
        };

        let end = live.drain(&mut source)?;
        source.close();
        match end {
            SessionEnd::EndOfStream => info!("Camera stream ended, reconnecting"),
            SessionEnd::Quit => {
                info!("Quit requested after {} frames", live.cycles);
                return Ok(());
            }
            SessionEnd::CycleLimit => {
                info!("Processed {} frames, stopping", live.cycles);
                return Ok(());
            }
        }
    }
}

fn print_help() {
    eprintln!("Live commands:");
    eprintln!("  s          - save a snapshot of the latest frame");
    eprintln!("  q          - quit");
}
