//! Span records and the append-only known-span sequence.

use std::collections::BTreeSet;
use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::layout::CoreFilter;
use crate::time::{TraceDuration, TraceTime};

pub type SpanId = u64;

/// One function activation on one core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    #[serde(alias = "funcCallId")]
    pub id: SpanId,
    pub core_id: u32,
    pub start_time: TraceTime,
    pub end_time: TraceTime,
    pub depth: u32,
    #[serde(alias = "funcName")]
    pub name: Arc<str>,
}

impl Span {
    pub fn new(
        id: SpanId,
        core_id: u32,
        start_time: TraceTime,
        end_time: TraceTime,
        depth: u32,
        name: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            id,
            core_id,
            start_time,
            end_time,
            depth,
            name: name.into(),
        }
    }

    /// Signed length; negative for inverted intervals.
    pub fn duration(&self) -> TraceDuration {
        self.end_time - self.start_time
    }

    /// Zero-length or inverted.
    pub fn is_malformed(&self) -> bool {
        self.end_time <= self.start_time
    }

    /// Name with NUL padding removed. Producers pad names to a fixed width.
    pub fn display_name(&self) -> String {
        self.name.chars().filter(|c| *c != '\0').collect()
    }
}

/// Earliest start and latest end of a set of spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min_start: TraceTime,
    pub max_end: TraceTime,
}

impl Bounds {
    pub fn duration(&self) -> TraceDuration {
        self.max_end - self.min_start
    }

    pub fn of<'a>(spans: impl IntoIterator<Item = &'a Span>) -> Option<Bounds> {
        spans.into_iter().fold(None, |acc, span| {
            let end = span.end_time.max(span.start_time);
            Some(match acc {
                None => Bounds {
                    min_start: span.start_time,
                    max_end: end,
                },
                Some(b) => Bounds {
                    min_start: b.min_start.min(span.start_time),
                    max_end: b.max_end.max(end),
                },
            })
        })
    }
}

/// Ever-growing, id-deduplicated sequence of spans in arrival order.
#[derive(Debug, Default)]
pub struct SpanStore {
    spans: Vec<Span>,
    ids: HashSet<SpanId>,
    cores: BTreeSet<u32>,
}

impl SpanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `span` unless a span with the same id is already known.
    pub fn push(&mut self, span: Span) -> bool {
        if !self.ids.insert(span.id) {
            log::trace!("dropping duplicate span {}", span.id);
            return false;
        }
        self.cores.insert(span.core_id);
        self.spans.push(span);
        true
    }

    /// Returns the number of spans actually appended.
    pub fn extend(&mut self, spans: impl IntoIterator<Item = Span>) -> usize {
        spans.into_iter().map(|span| self.push(span)).filter(|added| *added).count()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn as_slice(&self) -> &[Span] {
        &self.spans
    }

    /// Distinct core ids, ascending.
    pub fn cores(&self) -> Vec<u32> {
        self.cores.iter().copied().collect()
    }

    pub fn filtered<'a>(
        &'a self,
        filter: CoreFilter,
    ) -> impl DoubleEndedIterator<Item = &'a Span> + 'a {
        self.spans.iter().filter(move |span| filter.admits(span.core_id))
    }

    pub fn bounds(&self, filter: CoreFilter) -> Option<Bounds> {
        Bounds::of(self.filtered(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(id: u64, core: u32, start: i64, end: i64) -> Span {
        Span::new(id, core, TraceTime(start), TraceTime(end), 0, "f")
    }

    #[test]
    fn duplicates_are_dropped() {
        let mut store = SpanStore::new();
        assert!(store.push(span(1, 0, 0, 10)));
        assert!(!store.push(span(1, 0, 50, 60)));
        assert_eq!(store.extend([span(2, 1, 10, 20), span(2, 1, 10, 20)]), 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.cores(), vec![0, 1]);
    }

    #[test]
    fn bounds_follow_the_filter() {
        let mut store = SpanStore::new();
        store.extend([span(1, 0, 0, 10), span(2, 1, 100, 150), span(3, 0, 20, 5)]);
        let all = store.bounds(CoreFilter::All).unwrap();
        assert_eq!(all.min_start, TraceTime(0));
        assert_eq!(all.max_end, TraceTime(150));
        let core0 = store.bounds(CoreFilter::Core(0)).unwrap();
        assert_eq!(core0.max_end, TraceTime(20));
        assert!(store.bounds(CoreFilter::Core(7)).is_none());
    }

    #[test]
    fn nul_padding_is_stripped() {
        let s = Span::new(1, 0, TraceTime(0), TraceTime(1), 0, "init\0\0\0");
        assert_eq!(s.display_name(), "init");
    }

    #[test]
    fn decodes_producer_field_names() {
        let line = r#"{"funcCallId":7,"coreId":1,"startTime":"9007199254740993","endTime":"9007199254740999","depth":2,"funcName":"tick\u0000"}"#;
        let s: Span = serde_json::from_str(line).unwrap();
        assert_eq!(s.id, 7);
        assert_eq!(s.core_id, 1);
        assert_eq!(s.duration(), TraceDuration(6));
        assert_eq!(s.display_name(), "tick");
    }
}
