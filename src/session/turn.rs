//! Per-turn accumulation of generation output

use crate::protocol::ServerEvent;
use crate::think::ScanEvent;
use std::time::Instant;

/// Final assembled output of one generation turn
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTurn {
    /// Answer text with reasoning tags stripped
    pub answer: String,
    /// Reasoning text; present whenever a reasoning block was opened
    pub reasoning: Option<String>,
    /// Verbatim concatenation of every upstream fragment
    pub raw: String,
    /// Seconds spent inside completed reasoning blocks; absent when no
    /// block was opened or the open block never closed
    pub thinking_seconds: Option<f64>,
}

/// Accumulates scanner events for a single generation turn and produces
/// the live notification for each one.
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    answer: String,
    reasoning: String,
    raw: String,
    think_opened: bool,
    think_closed: bool,
    think_since: Option<Instant>,
    think_seconds: f64,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one raw upstream fragment verbatim.
    pub fn push_raw(&mut self, fragment: &str) {
        self.raw.push_str(fragment);
    }

    /// Fold one scanner event into the buffers and return the
    /// notification to forward to the client.
    pub fn apply(&mut self, event: ScanEvent) -> ServerEvent {
        match event {
            ScanEvent::ThinkStart => {
                self.think_opened = true;
                self.think_since = Some(Instant::now());
                ServerEvent::ThinkingStart
            }
            ScanEvent::ThinkText(text) => {
                self.reasoning.push_str(&text);
                ServerEvent::ThinkingChunk(text)
            }
            ScanEvent::ThinkEnd => {
                if let Some(since) = self.think_since.take() {
                    self.think_seconds += since.elapsed().as_secs_f64();
                    self.think_closed = true;
                }
                ServerEvent::ThinkingEnd(self.reasoning.clone())
            }
            ScanEvent::AnswerText(text) => {
                self.answer.push_str(&text);
                ServerEvent::ResponseChunk(text)
            }
        }
    }

    /// Consume the accumulator once the stream has ended.
    pub fn finish(self) -> CompletedTurn {
        CompletedTurn {
            answer: self.answer,
            reasoning: if self.think_opened {
                Some(self.reasoning)
            } else {
                None
            },
            raw: self.raw,
            thinking_seconds: if self.think_closed {
                Some(self.think_seconds)
            } else {
                None
            },
        }
    }
}
