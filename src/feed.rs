//! Hand-off point between a span producer thread and the UI thread.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::span::Span;

#[derive(Debug, Default)]
struct FeedState {
    pending: Vec<Span>,
    connected: bool,
    generation: u64,
}

/// Cloneable handle; producers push, the UI drains once per frame.
#[derive(Clone, Debug, Default)]
pub struct SpanFeed {
    state: Arc<Mutex<FeedState>>,
}

/// What the UI picked up from one drain.
#[derive(Debug, Default)]
pub struct Drained {
    pub spans: Vec<Span>,
    pub connected: bool,
    /// Transition count at drain time. A jump of two or more since the last
    /// drain means the producer reconnected in between.
    pub generation: u64,
}

impl SpanFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, span: Span) {
        self.state.lock().pending.push(span);
    }

    pub fn extend(&self, spans: impl IntoIterator<Item = Span>) {
        self.state.lock().pending.extend(spans);
    }

    pub fn set_connected(&self, connected: bool) {
        let mut state = self.state.lock();
        if state.connected != connected {
            state.connected = connected;
            state.generation += 1;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    /// Number of connect/disconnect transitions so far.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn drain(&self) -> Drained {
        let mut state = self.state.lock();
        Drained {
            spans: std::mem::take(&mut state.pending),
            connected: state.connected,
            generation: state.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TraceTime;

    #[test]
    fn producer_thread_hands_over_spans() {
        let feed = SpanFeed::new();
        let producer = feed.clone();
        std::thread::spawn(move || {
            producer.set_connected(true);
            for id in 0..100 {
                producer.push(Span::new(id, 0, TraceTime(id as i64), TraceTime(id as i64 + 1), 0, "f"));
            }
        })
        .join()
        .unwrap();

        let drained = feed.drain();
        assert!(drained.connected);
        assert_eq!(drained.generation, 1);
        assert_eq!(drained.spans.len(), 100);
        assert!(feed.drain().spans.is_empty());
        assert_eq!(feed.generation(), 1);
    }
}
