//! Stream pump handoff, ordering and shutdown

use crossbeam_channel::{bounded, Sender};
use glint_eye::error::StreamError;
use glint_eye::pump::{Delivery, ImageStream, JpegPartStream, StreamPump};
use glint_eye::source::{Acquired, FrameSource, LiveStreamSource};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

/// Yields `remaining` images, then tells the test it ran dry and ends.
struct Scripted {
    remaining: u32,
    exhausted: Option<Sender<()>>,
}

impl ImageStream for Scripted {
    fn next_image(&mut self) -> Result<RgbImage, StreamError> {
        if self.remaining == 0 {
            if let Some(tx) = self.exhausted.take() {
                let _ = tx.send(());
            }
            return Err(StreamError::EndOfStream);
        }
        self.remaining -= 1;
        Ok(RgbImage::new(8, 8))
    }
}

/// Never ends; records when it is released.
struct Endless {
    released: Arc<AtomicBool>,
}

impl ImageStream for Endless {
    fn next_image(&mut self) -> Result<RgbImage, StreamError> {
        thread::sleep(Duration::from_millis(1));
        Ok(RgbImage::new(8, 8))
    }
}

impl Drop for Endless {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[test]
fn test_busy_consumer_drops_exactly_one_frame() {
    let (exhausted_tx, exhausted_rx) = bounded(1);
    let stream = Scripted {
        remaining: 2,
        exhausted: Some(exhausted_tx),
    };
    let (pump, rx) = StreamPump::spawn(stream).unwrap();

    // Both frames are produced before the consumer polls once.
    exhausted_rx.recv_timeout(WAIT).unwrap();

    match rx.recv_timeout(WAIT).unwrap() {
        Delivery::Frame(frame) => assert_eq!(frame.sequence(), 0),
        Delivery::EndOfStream => panic!("Expected the buffered frame"),
    }
    assert!(matches!(rx.recv_timeout(WAIT).unwrap(), Delivery::EndOfStream));

    let stats = pump.stop();
    assert_eq!(stats.produced, 2);
    assert_eq!(stats.delivered, 1);
    assert_eq!(stats.dropped, 1);
}

#[test]
fn test_delivered_frames_keep_production_order() {
    let stream = Scripted {
        remaining: 300,
        exhausted: None,
    };
    let (pump, rx) = StreamPump::spawn(stream).unwrap();

    let mut seen = Vec::new();
    loop {
        match rx.recv_timeout(WAIT).unwrap() {
            Delivery::Frame(frame) => {
                seen.push(frame.sequence());
                if seen.len() % 7 == 0 {
                    thread::sleep(Duration::from_millis(2));
                }
            }
            Delivery::EndOfStream => break,
        }
    }

    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert!(seen.iter().all(|&s| s < 300));

    let stats = pump.stop();
    assert_eq!(stats.produced, 300);
    assert_eq!(stats.delivered, seen.len() as u64);
    assert_eq!(stats.delivered + stats.dropped, stats.produced);
}

#[test]
fn test_stop_is_acknowledged_before_release() {
    let released = Arc::new(AtomicBool::new(false));
    let stream = Endless {
        released: released.clone(),
    };
    let (pump, rx) = StreamPump::spawn(stream).unwrap();

    for _ in 0..3 {
        assert!(matches!(rx.recv_timeout(WAIT).unwrap(), Delivery::Frame(_)));
    }
    assert!(!released.load(Ordering::SeqCst));

    let stats = pump.stop();
    assert!(released.load(Ordering::SeqCst));
    assert!(stats.produced >= 3);

    // Nothing new arrives once stopped; at most the frame left in the slot.
    let leftover = rx.try_iter().count();
    assert!(leftover <= 1);
}

fn jpeg(color: Rgb<u8>) -> Vec<u8> {
    let image = RgbImage::from_pixel(64, 48, color);
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .encode_image(&image)
        .unwrap();
    buf
}

fn part(body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "--myboundary\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out.extend_from_slice(b"\r\n");
    out
}

#[test]
fn test_live_source_skips_corrupt_segment() {
    let mut data = part(&jpeg(Rgb([0, 255, 0])));
    data.extend(part(b"\xff\xd8 definitely not a jpeg"));
    data.extend(part(&jpeg(Rgb([255, 255, 255]))));
    data.extend_from_slice(b"--myboundary--\r\n");

    let stream = JpegPartStream::new(Cursor::new(data), "myboundary", (320, 240));
    let mut source = LiveStreamSource::from_stream("memory", stream).unwrap();

    let mut frames = 0;
    loop {
        match source.acquire().unwrap() {
            Acquired::Frame(frame) => {
                assert_eq!(frame.image().dimensions(), (320, 240));
                frames += 1;
            }
            Acquired::EndOfStream => break,
        }
    }
    assert!(frames >= 1);

    let stats = source.close();
    assert_eq!(stats.produced, 2);
    assert_eq!(stats.decode_errors, 1);
}
