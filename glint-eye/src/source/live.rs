//! Live multipart MJPEG camera stream

use crossbeam_channel::Receiver;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::io::BufReader;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{CameraConfig, ProcessingConfig};
use crate::error::{Result, VisionError};
use crate::multipart::boundary_from_content_type;
use crate::pump::{Delivery, ImageStream, JpegPartStream, PumpStatsSnapshot, StreamPump};
use crate::source::{Acquired, FrameSource};

/// One camera session: an open HTTP response drained by a [`StreamPump`].
///
/// The pump owns the response body, so stopping the pump is what releases
/// the connection.
pub struct LiveStreamSource {
    label: String,
    pump: Option<StreamPump>,
    frames: Receiver<Delivery>,
    ended: bool,
}

impl LiveStreamSource {
    /// Open the camera stream and start pumping frames.
    pub fn connect(camera: &CameraConfig, processing: &ProcessingConfig) -> Result<Self> {
        let url = camera.url();
        let client = Client::builder()
            .timeout(None::<Duration>)
            .connect_timeout(camera.connect_timeout())
            .no_proxy()
            .build()?;

        let mut request = client.get(&url);
        if camera.has_credentials() {
            request = request.basic_auth(&camera.username, Some(&camera.password));
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(VisionError::Camera(format!("{} answered {}", url, status)));
        }

        let negotiated = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .filter(|_| camera.parse_boundary)
            .and_then(boundary_from_content_type);
        let boundary = match negotiated {
            Some(boundary) => boundary,
            None => {
                debug!("Using configured boundary {:?}", camera.boundary);
                camera.boundary.clone()
            }
        };

        info!("Connected to camera at {} (boundary {:?})", url, boundary);
        let stream = JpegPartStream::new(BufReader::new(response), &boundary, processing.resolution);
        Self::from_stream(url, stream)
    }

    /// Keep trying to open a session, sleeping the configured delay between
    /// attempts. Returns `None` only when `shutdown` is raised.
    pub fn connect_with_retry(
        camera: &CameraConfig,
        processing: &ProcessingConfig,
        shutdown: Option<&AtomicBool>,
    ) -> Option<Self> {
        let delay = camera.reconnect_delay();
        let mut attempt: u64 = 0;
        loop {
            if shutdown.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                return None;
            }

            attempt += 1;
            info!("Connecting to camera {} (attempt {})", camera.host, attempt);
            match Self::connect(camera, processing) {
                Ok(source) => return Some(source),
                Err(e) => {
                    warn!("Camera connection failed: {}; retrying in {:?}", e, delay);
                    thread::sleep(delay);
                }
            }
        }
    }

    /// Run a session over any image stream.
    pub fn from_stream<S: ImageStream>(label: impl Into<String>, stream: S) -> Result<Self> {
        let (pump, frames) = StreamPump::spawn(stream)?;
        Ok(Self {
            label: label.into(),
            pump: Some(pump),
            frames,
            ended: false,
        })
    }

    pub fn stats(&self) -> PumpStatsSnapshot {
        self.pump.as_ref().map(|p| p.stats()).unwrap_or_default()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Stop the pump, waiting for it to acknowledge, and release the session.
    pub fn close(mut self) -> PumpStatsSnapshot {
        self.shutdown()
    }

    fn shutdown(&mut self) -> PumpStatsSnapshot {
        match self.pump.take() {
            Some(pump) => {
                let stats = pump.stop();
                info!(
                    "Camera session closed: {} produced, {} delivered, {} dropped, {} corrupt",
                    stats.produced, stats.delivered, stats.dropped, stats.decode_errors
                );
                stats
            }
            None => PumpStatsSnapshot::default(),
        }
    }
}

impl FrameSource for LiveStreamSource {
    fn acquire(&mut self) -> Result<Acquired> {
        if self.ended {
            return Ok(Acquired::EndOfStream);
        }

        match self.frames.recv() {
            Ok(Delivery::Frame(frame)) => Ok(Acquired::Frame(frame)),
            // A vanished pump is an ended stream as far as the cycle is concerned.
            Ok(Delivery::EndOfStream) | Err(_) => {
                self.ended = true;
                Ok(Acquired::EndOfStream)
            }
        }
    }

    fn describe(&self) -> String {
        format!("live stream {}", self.label)
    }
}

impl Drop for LiveStreamSource {
    fn drop(&mut self) {
        self.shutdown();
    }
}
