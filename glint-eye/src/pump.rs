//! Background frame pump for live camera streams
//!
//! The pump decodes segments as fast as the network delivers them and offers
//! each frame to the processing cycle through a single-slot channel. When the
//! slot is occupied the new frame is dropped on the spot: the cycle sees a
//! stale-but-bounded view of the stream, never a growing queue.

use crossbeam_channel::{bounded, select, Receiver, Sender, TryRecvError, TrySendError};
use image::RgbImage;
use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::{StreamError, VisionError};
use crate::frame::{self, Frame};
use crate::multipart::MultipartReader;

/// Something the pump can pull decoded images from.
pub trait ImageStream: Send + 'static {
    fn next_image(&mut self) -> Result<RgbImage, StreamError>;
}

/// JPEG parts of a multipart stream, decoded at the processing resolution.
pub struct JpegPartStream<R> {
    parts: MultipartReader<R>,
    resolution: (u32, u32),
}

impl<R: BufRead> JpegPartStream<R> {
    pub fn new(reader: R, boundary: &str, resolution: (u32, u32)) -> Self {
        Self {
            parts: MultipartReader::new(reader, boundary),
            resolution,
        }
    }
}

impl<R: BufRead + Send + 'static> ImageStream for JpegPartStream<R> {
    fn next_image(&mut self) -> Result<RgbImage, StreamError> {
        let part = self.parts.next_part()?;
        frame::decode_jpeg(&part, self.resolution)
    }
}

/// What the consumer receives from the pump.
#[derive(Debug)]
pub enum Delivery {
    Frame(Frame),
    /// The stream ended; no further frames will follow on this session.
    EndOfStream,
}

#[derive(Debug, Default)]
pub struct PumpStats {
    produced: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    decode_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStatsSnapshot {
    pub produced: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub decode_errors: u64,
}

impl PumpStats {
    pub fn snapshot(&self) -> PumpStatsSnapshot {
        PumpStatsSnapshot {
            produced: self.produced.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running pump worker.
pub struct StreamPump {
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
    stats: Arc<PumpStats>,
}

impl StreamPump {
    /// Start a worker over `stream` and return it with the consumer end of
    /// the handoff.
    pub fn spawn<S: ImageStream>(stream: S) -> Result<(Self, Receiver<Delivery>), VisionError> {
        let (frame_tx, frame_rx) = bounded(1);
        let (stop_tx, stop_rx) = bounded(1);
        let stats = Arc::new(PumpStats::default());

        let worker_stats = stats.clone();
        let handle = thread::Builder::new()
            .name("glint-pump".to_string())
            .spawn(move || run(stream, frame_tx, stop_rx, worker_stats))?;

        info!("Stream pump started");
        Ok((
            Self {
                stop_tx,
                handle: Some(handle),
                stats,
            },
            frame_rx,
        ))
    }

    pub fn stats(&self) -> PumpStatsSnapshot {
        self.stats.snapshot()
    }

    /// Signal the worker and block until it has left its loop. The stream,
    /// and with it the connection, is released by the time this returns.
    pub fn stop(mut self) -> PumpStatsSnapshot {
        self.shutdown();
        self.stats.snapshot()
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            // Full or disconnected both mean the worker already knows.
            let _ = self.stop_tx.try_send(());
            if handle.join().is_err() {
                warn!("Stream pump worker panicked");
            }
            info!("Stream pump stopped");
        }
    }
}

impl Drop for StreamPump {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<S: ImageStream>(
    mut stream: S,
    frame_tx: Sender<Delivery>,
    stop_rx: Receiver<()>,
    stats: Arc<PumpStats>,
) {
    loop {
        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        match stream.next_image() {
            Ok(image) => {
                let sequence = stats.produced.fetch_add(1, Ordering::Relaxed);
                match frame_tx.try_send(Delivery::Frame(Frame::new(sequence, image))) {
                    Ok(()) => {
                        stats.delivered.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(TrySendError::Full(dropped)) => {
                        stats.dropped.fetch_add(1, Ordering::Relaxed);
                        debug!("Consumer busy, dropping frame {}", sequence);
                        drop(dropped);
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        debug!("Frame consumer gone, stopping pump");
                        break;
                    }
                }
            }
            Err(err) if err.is_terminal() => {
                info!("Camera stream ended: {}", err);
                // Must reach the consumer, unless we are told to stop first.
                select! {
                    send(frame_tx, Delivery::EndOfStream) -> _ => {}
                    recv(stop_rx) -> _ => {}
                }
                break;
            }
            Err(err) => {
                stats.decode_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Camera stream error, skipping segment: {}", err);
            }
        }
    }
}
