//! Keypoint sources
//!
//! A source hands the session one frame of pose estimates per tick. The
//! estimator itself lives outside this crate; `JsonLinesSource` reads its
//! output as newline-delimited JSON from a file or a pipe. Besides frames,
//! a line may carry a `{"command":"clear"}` control request.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use super::{Frame, Pose};

/// Errors raised while pulling frames from a source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read frame: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Whether the source can keep going after this error
    ///
    /// A malformed line only loses that line; a read failure means the
    /// underlying stream is unusable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SourceError::Malformed { .. })
    }
}

/// Item delivered by a source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Frame(Frame),
    /// Forget gesture state and wipe the drawing surface
    Clear,
}

/// Anything that can deliver per-frame pose estimates
#[async_trait]
pub trait KeypointSource: Send {
    /// Source name for logs (e.g., "stdin", "capture.ndjson")
    fn name(&self) -> &str;

    /// Wait for the next frame or control request
    ///
    /// Returns `Ok(None)` once the source is exhausted. A malformed line is
    /// reported as an error but does not end the source.
    async fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Command {
    Clear,
}

/// One line of input: a full frame, a bare single pose, or a control request
#[derive(Deserialize)]
#[serde(untagged)]
enum Line {
    Frame { poses: Vec<Pose> },
    Pose(Pose),
    Control { command: Command },
}

impl From<Line> for SourceEvent {
    fn from(line: Line) -> Self {
        match line {
            Line::Frame { poses } => SourceEvent::Frame(Frame { poses }),
            Line::Pose(pose) => SourceEvent::Frame(Frame::from(pose)),
            Line::Control { command: Command::Clear } => SourceEvent::Clear,
        }
    }
}

/// Parse a single NDJSON line
pub fn parse_line(text: &str) -> Result<SourceEvent, serde_json::Error> {
    serde_json::from_str::<Line>(text).map(SourceEvent::from)
}

/// Reads frames as newline-delimited JSON from an async reader
pub struct JsonLinesSource<R> {
    name: String,
    reader: R,
    line_no: usize,
    buf: String,
}

impl<R> JsonLinesSource<BufReader<R>>
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    /// Wrap an unbuffered reader
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self::from_buffered(name, BufReader::new(reader))
    }
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn from_buffered(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }
}

#[async_trait]
impl<R> KeypointSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_event(&mut self) -> Result<Option<SourceEvent>, SourceError> {
        loop {
            self.buf.clear();
            let read = self.reader.read_line(&mut self.buf).await;
            match read {
                Ok(0) => {
                    debug!("Source '{}' exhausted after {} lines", self.name, self.line_no);
                    return Ok(None);
                }
                Ok(_) => self.line_no += 1,
                Err(e) => {
                    self.line_no += 1;
                    return Err(e.into());
                }
            }

            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }

            return parse_line(text)
                .map(Some)
                .map_err(|source| SourceError::Malformed {
                    line: self.line_no,
                    source,
                });
        }
    }
}

/// Pump `source` into `tx` until the source ends, fails, or the receiver is gone
///
/// Malformed lines are logged and skipped. With `interval` set, frames are
/// released at most once per period. Returns the number of events sent.
pub async fn forward_events(
    mut source: Box<dyn KeypointSource>,
    tx: mpsc::Sender<SourceEvent>,
    interval: Option<Duration>,
) -> u64 {
    let mut ticker = interval.map(|period| {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker
    });
    let mut sent = 0;

    loop {
        let event = match source.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(e) if e.is_recoverable() => {
                warn!("Skipping input from '{}': {}", source.name(), e);
                continue;
            }
            Err(e) => {
                error!("Frame stream '{}' failed: {}", source.name(), e);
                break;
            }
        };

        if let (SourceEvent::Frame(_), Some(ticker)) = (&event, ticker.as_mut()) {
            ticker.tick().await;
        }

        if tx.send(event).await.is_err() {
            debug!("Frame loop gone, stopping reader");
            break;
        }
        sent += 1;
    }

    sent
}
