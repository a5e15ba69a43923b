//! Reader for `multipart/x-mixed-replace` camera streams

use bytes::Bytes;
use std::io::{self, BufRead, Read};

use crate::error::StreamError;

const MAX_PART_SIZE: usize = 16 * 1024 * 1024;

/// Extract the boundary token from a multipart Content-Type header value.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim().eq_ignore_ascii_case("boundary").then(|| value)
        })
        .map(|value| {
            let value = value.trim().trim_matches('"');
            value.strip_prefix("--").unwrap_or(value).to_string()
        })
        .find(|boundary| !boundary.is_empty())
}

/// Splits a byte stream into part bodies.
///
/// A part's `Content-Length` is honoured when present; otherwise the body
/// runs to the next delimiter line.
pub struct MultipartReader<R> {
    reader: R,
    delimiter: Vec<u8>,
    at_part_start: bool,
    finished: bool,
}

enum Delimiter {
    Open,
    Close,
}

impl<R: BufRead> MultipartReader<R> {
    pub fn new(reader: R, boundary: &str) -> Self {
        let mut delimiter = b"--".to_vec();
        delimiter.extend_from_slice(boundary.as_bytes());
        Self {
            reader,
            delimiter,
            at_part_start: false,
            finished: false,
        }
    }

    /// Body of the next part, or `EndOfStream` once the peer is done.
    pub fn next_part(&mut self) -> Result<Bytes, StreamError> {
        if self.finished {
            return Err(StreamError::EndOfStream);
        }

        if !self.at_part_start {
            self.seek_delimiter()?;
        }
        self.at_part_start = false;

        let content_length = self.read_headers()?;

        match content_length {
            Some(len) if len > MAX_PART_SIZE => {
                io::copy(&mut (&mut self.reader).take(len as u64), &mut io::sink())?;
                Err(StreamError::Decode(format!("part of {} bytes exceeds limit", len)))
            }
            Some(len) => {
                let mut body = vec![0u8; len];
                self.reader.read_exact(&mut body).map_err(eof_as_end)?;
                Ok(Bytes::from(body))
            }
            None => self.read_until_delimiter(),
        }
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<(), StreamError> {
        line.clear();
        if self.reader.read_until(b'\n', line)? == 0 {
            return Err(StreamError::EndOfStream);
        }
        Ok(())
    }

    fn classify(&self, line: &[u8]) -> Option<Delimiter> {
        let line = trim_line_end(line);
        let rest = line.strip_prefix(self.delimiter.as_slice())?;
        match rest {
            b"" => Some(Delimiter::Open),
            b"--" => Some(Delimiter::Close),
            _ => None,
        }
    }

    fn seek_delimiter(&mut self) -> Result<(), StreamError> {
        let mut line = Vec::new();
        loop {
            self.read_line(&mut line)?;
            match self.classify(&line) {
                Some(Delimiter::Open) => return Ok(()),
                Some(Delimiter::Close) => {
                    self.finished = true;
                    return Err(StreamError::EndOfStream);
                }
                None => continue,
            }
        }
    }

    fn read_headers(&mut self) -> Result<Option<usize>, StreamError> {
        let mut line = Vec::new();
        let mut content_length = None;
        loop {
            self.read_line(&mut line)?;
            let header = trim_line_end(&line);
            if header.is_empty() {
                return Ok(content_length);
            }

            let header = String::from_utf8_lossy(header);
            if let Some((name, value)) = header.split_once(':') {
                if name.trim().eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse::<usize>().ok();
                }
            }
        }
    }

    fn read_until_delimiter(&mut self) -> Result<Bytes, StreamError> {
        let mut body = Vec::new();
        let mut line = Vec::new();
        loop {
            self.read_line(&mut line)?;
            match self.classify(&line) {
                Some(delimiter) => {
                    self.at_part_start = true;
                    self.finished = matches!(delimiter, Delimiter::Close);
                    // The line break before the delimiter belongs to it.
                    let len = trim_line_end(&body).len();
                    body.truncate(len);
                    return Ok(Bytes::from(body));
                }
                None => {
                    if body.len() + line.len() > MAX_PART_SIZE {
                        return Err(StreamError::Decode("part exceeds size limit".to_string()));
                    }
                    body.extend_from_slice(&line);
                }
            }
        }
    }
}

fn trim_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn eof_as_end(err: io::Error) -> StreamError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        StreamError::EndOfStream
    } else {
        StreamError::Io(err)
    }
}
