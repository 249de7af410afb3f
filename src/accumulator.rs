//! Incremental reply accumulation
//!
//! Splits a reply body into protocol parts and folds them into the text that
//! ends up as one assistant message.

use crate::protocol::{DataStreamPart, FinishReason, ProtocolError};
use futures::{Stream, StreamExt};
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec};

/// Where a reply stands after the parts seen so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Pending,
    Finished,
    Failed(String),
}

/// Folds stream parts into the full reply text
#[derive(Debug, Clone)]
pub struct ReplyAccumulator {
    text: String,
    outcome: ReplyOutcome,
}

impl Default for ReplyAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyAccumulator {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            outcome: ReplyOutcome::Pending,
        }
    }

    /// Apply one part. Returns the text to append to the visible message.
    ///
    /// Parts after the reply has settled are ignored.
    pub fn apply(&mut self, part: DataStreamPart) -> Option<String> {
        if self.outcome != ReplyOutcome::Pending {
            return None;
        }
        match part {
            DataStreamPart::Text(delta) if !delta.is_empty() => {
                self.text.push_str(&delta);
                Some(delta)
            }
            DataStreamPart::Error(message) => {
                self.outcome = ReplyOutcome::Failed(message);
                None
            }
            DataStreamPart::Finish { finish_reason, .. } => {
                self.outcome = if finish_reason == FinishReason::Error {
                    ReplyOutcome::Failed("reply finished with an error".to_string())
                } else {
                    ReplyOutcome::Finished
                };
                None
            }
            DataStreamPart::Text(_)
            | DataStreamPart::StartStep { .. }
            | DataStreamPart::FinishStep { .. } => None,
        }
    }

    pub fn outcome(&self) -> &ReplyOutcome {
        &self.outcome
    }

    pub fn is_settled(&self) -> bool {
        self.outcome != ReplyOutcome::Pending
    }

    /// Settle at end of stream. A stream that ends cleanly without a finish
    /// part counts as finished.
    pub fn finish(self) -> Result<String, String> {
        match self.outcome {
            ReplyOutcome::Pending | ReplyOutcome::Finished => Ok(self.text),
            ReplyOutcome::Failed(message) => Err(message),
        }
    }
}

/// Decode a reply body into protocol parts, skipping unknown part types
pub fn decode_parts<R>(body: R) -> impl Stream<Item = Result<DataStreamPart, ProtocolError>>
where
    R: AsyncRead,
{
    FramedRead::new(body, LinesCodec::new()).filter_map(|line| async move {
        match line {
            Ok(line) => DataStreamPart::decode(&line).transpose(),
            Err(e) => Some(Err(ProtocolError::Io(e.to_string()))),
        }
    })
}
