//! Incremental scanner for `<think>` reasoning tags
//!
//! Reasoning models wrap their chain-of-thought in literal
//! `<think>`/`</think>` tags, and the stream chunks Ollama delivers can
//! split a tag at any byte. The scanner classifies output into answer
//! and reasoning spans while carrying a small residual across chunk
//! boundaries so a straddling tag is still recognized as one tag.

#[cfg(test)]
mod proptests;

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// A classified span of generation output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    ThinkStart,
    ThinkText(String),
    ThinkEnd,
    AnswerText(String),
}

/// Streaming tag scanner.
///
/// Only the tag that would change the current mode is significant: an
/// open tag inside an already-open block, or a close tag with no open
/// block, passes through as literal text. A partial tag held back at end
/// of stream is flushed as literal text by [`TagScanner::finish`].
#[derive(Debug, Default)]
pub struct TagScanner {
    thinking: bool,
    residual: String,
}

impl TagScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one stream fragment, returning the spans it completes.
    pub fn push(&mut self, fragment: &str) -> Vec<ScanEvent> {
        let mut events = Vec::new();
        let mut buf = std::mem::take(&mut self.residual);
        buf.push_str(fragment);

        loop {
            let marker = if self.thinking { THINK_CLOSE } else { THINK_OPEN };
            if let Some(idx) = buf.find(marker) {
                if idx > 0 {
                    events.push(self.text_event(buf[..idx].to_string()));
                }
                buf.drain(..idx + marker.len());
                events.push(if self.thinking {
                    ScanEvent::ThinkEnd
                } else {
                    ScanEvent::ThinkStart
                });
                self.thinking = !self.thinking;
            } else {
                // Hold back a tail that could still grow into the marker
                let keep = holdback(&buf, marker);
                let emit_to = buf.len() - keep;
                if emit_to > 0 {
                    let text: String = buf.drain(..emit_to).collect();
                    events.push(self.text_event(text));
                }
                self.residual = buf;
                break;
            }
        }

        events
    }

    /// Flush any held-back partial tag as literal text at end of stream.
    pub fn finish(self) -> Vec<ScanEvent> {
        if self.residual.is_empty() {
            Vec::new()
        } else if self.thinking {
            vec![ScanEvent::ThinkText(self.residual)]
        } else {
            vec![ScanEvent::AnswerText(self.residual)]
        }
    }

    fn text_event(&self, text: String) -> ScanEvent {
        if self.thinking {
            ScanEvent::ThinkText(text)
        } else {
            ScanEvent::AnswerText(text)
        }
    }
}

/// Length of the longest buffer suffix that is a proper prefix of
/// `marker`. Bounded by the marker length minus one.
fn holdback(buf: &str, marker: &str) -> usize {
    let max = (marker.len() - 1).min(buf.len());
    (1..=max).rev().find(|&k| buf.ends_with(&marker[..k])).unwrap_or(0)
}
