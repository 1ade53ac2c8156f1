//! Line-delimited serial feed.

use std::{
    io::{BufRead, BufReader, ErrorKind, Read},
    thread,
    time::Duration,
};

use serialport::SerialPort;
use tracing::{debug, error, info, warn};

use crate::{error::ConnectionError, runtime::CoreHandle};

const READ_TIMEOUT: Duration = Duration::from_millis(500);
const ERROR_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
}

/// One decoded line with surrounding whitespace removed. May be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialLine(String);

impl SerialLine {
    pub fn from_raw(raw: &str) -> Self {
        Self(raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Lazy sequence of lines read from one connection.
///
/// Consumed by value; once it is exhausted or dropped the connection is gone
/// and a new feed has to be opened.
pub struct SerialFeed<R> {
    source: String,
    reader: BufReader<R>,
    pending: Vec<u8>,
    exhausted: bool,
}

impl SerialFeed<Box<dyn SerialPort>> {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, ConnectionError> {
        let port = serialport::new(path, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| ConnectionError::Open {
                path: path.to_string(),
                source,
            })?;
        Ok(Self::from_reader(path, port))
    }
}

impl<R: Read> SerialFeed<R> {
    pub fn from_reader(source: impl Into<String>, reader: R) -> Self {
        Self {
            source: source.into(),
            reader: BufReader::new(reader),
            pending: Vec::new(),
            exhausted: false,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn take_line(&mut self) -> SerialLine {
        let line = SerialLine::from_raw(&String::from_utf8_lossy(&self.pending));
        self.pending.clear();
        line
    }
}

impl<R: Read> Iterator for SerialFeed<R> {
    type Item = Result<SerialLine, ConnectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        loop {
            // Bytes read before a timeout stay in `pending` for the next attempt.
            match self.reader.read_until(b'\n', &mut self.pending) {
                Ok(0) => {
                    self.exhausted = true;
                    if self.pending.is_empty() {
                        return None;
                    }
                    return Some(Ok(self.take_line()));
                }
                Ok(_) if self.pending.ends_with(b"\n") => return Some(Ok(self.take_line())),
                Ok(_) => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                    continue
                }
                Err(err) => return Some(Err(ConnectionError::Io(err))),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpSummary {
    pub delivered: usize,
    pub errors: usize,
}

/// Forwards every line of `feed` to the core until the feed ends or the core
/// stops. I/O errors are logged and skipped.
pub fn pump<R: Read>(feed: SerialFeed<R>, core: &CoreHandle) -> PumpSummary {
    let source = feed.source().to_string();
    let mut summary = PumpSummary::default();
    for item in feed {
        match item {
            Ok(line) => {
                debug!(source = %source, line = line.as_str(), "received serial line");
                if core.serial_line(line).is_err() {
                    debug!(source = %source, "core stopped; ending serial feed");
                    break;
                }
                summary.delivered += 1;
            }
            Err(err) => {
                warn!(source = %source, "serial port error: {err}");
                summary.errors += 1;
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    summary
}

/// Opens the configured port on a dedicated thread and pumps it into the
/// core. An open failure is logged once and leaves the rest of the app running.
pub fn spawn_serial_feed(
    settings: SerialSettings,
    core: CoreHandle,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("serial-feed".to_string())
        .spawn(move || {
            let feed = match SerialFeed::open(&settings.path, settings.baud_rate) {
                Ok(feed) => feed,
                Err(err) => {
                    error!(path = %settings.path, "{err}");
                    return;
                }
            };
            info!(
                path = %settings.path,
                baud_rate = settings.baud_rate,
                "serial port opened"
            );
            let summary = pump(feed, &core);
            info!(
                path = %settings.path,
                delivered = summary.delivered,
                errors = summary.errors,
                "serial feed stopped"
            );
        })
}

#[cfg(test)]
#[path = "tests/serial_tests.rs"]
mod tests;
