//! Property tests for the tag scanner
//!
//! The fragment strategy mixes whole tags, tag pieces, and noisy text
//! containing `<`, `>`, and `/` so the boundary handling gets hit from
//! every angle.

use super::*;
use proptest::prelude::*;

fn fragment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(THINK_OPEN.to_string()),
        Just(THINK_CLOSE.to_string()),
        Just("<th".to_string()),
        Just("ink>".to_string()),
        Just("</th".to_string()),
        Just("<".to_string()),
        "[a-z<>/ ]{0,8}",
    ]
}

/// Replay scanner output back into a byte stream: marker events become
/// their literal tags, text events pass through.
fn replay(events: &[ScanEvent]) -> String {
    let mut out = String::new();
    for event in events {
        match event {
            ScanEvent::ThinkStart => out.push_str(THINK_OPEN),
            ScanEvent::ThinkEnd => out.push_str(THINK_CLOSE),
            ScanEvent::ThinkText(t) | ScanEvent::AnswerText(t) => out.push_str(t),
        }
    }
    out
}

/// Merge adjacent text events of the same kind so event streams from
/// different chunkings of one input compare equal.
fn normalize(events: Vec<ScanEvent>) -> Vec<ScanEvent> {
    let mut out: Vec<ScanEvent> = Vec::new();
    for event in events {
        match (out.last_mut(), event) {
            (Some(ScanEvent::ThinkText(prev)), ScanEvent::ThinkText(t)) => prev.push_str(&t),
            (Some(ScanEvent::AnswerText(prev)), ScanEvent::AnswerText(t)) => prev.push_str(&t),
            (_, event) => out.push(event),
        }
    }
    out
}

fn scan_fragments(fragments: &[String]) -> Vec<ScanEvent> {
    let mut scanner = TagScanner::new();
    let mut events = Vec::new();
    for fragment in fragments {
        events.extend(scanner.push(fragment));
    }
    events.extend(scanner.finish());
    events
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Replaying the classified spans reproduces the input exactly, no
    /// matter how the stream was fragmented.
    #[test]
    fn replay_reconstructs_input(fragments in proptest::collection::vec(fragment_strategy(), 0..16)) {
        let events = scan_fragments(&fragments);
        prop_assert_eq!(replay(&events), fragments.concat());
    }

    /// Classification is independent of chunking: scanning the whole
    /// input in one push yields the same normalized events as scanning
    /// it fragment by fragment.
    #[test]
    fn chunking_does_not_change_classification(fragments in proptest::collection::vec(fragment_strategy(), 0..16)) {
        let chunked = normalize(scan_fragments(&fragments));
        let whole = normalize(scan_fragments(&[fragments.concat()]));
        prop_assert_eq!(chunked, whole);
    }

    /// Tag-free input passes through entirely as answer text.
    #[test]
    fn tag_free_input_is_all_answer(fragments in proptest::collection::vec("[a-z ]{0,10}", 0..16)) {
        let events = scan_fragments(&fragments);
        for event in &events {
            prop_assert!(matches!(event, ScanEvent::AnswerText(_)));
        }
        prop_assert_eq!(replay(&events), fragments.concat());
    }

    /// The carried residual never reaches a full tag length.
    #[test]
    fn residual_is_bounded(fragments in proptest::collection::vec(fragment_strategy(), 0..16)) {
        let mut scanner = TagScanner::new();
        for fragment in &fragments {
            scanner.push(fragment);
            prop_assert!(scanner.residual.len() < THINK_CLOSE.len());
        }
    }
}
