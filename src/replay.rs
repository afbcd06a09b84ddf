//! Recorded traces as a span source.
//!
//! A replay file holds one JSON record per line. Records carrying a
//! `traceType` other than the flame-graph entry type are skipped, so raw
//! producer logs can be replayed without filtering.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{Result, TimelineError};
use crate::feed::SpanFeed;
use crate::span::Span;

/// `traceType` of completed-span records.
pub const FLAME_GRAPH_ENTRY: u64 = 4;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub fn parse_str(content: &str) -> Result<Vec<Span>> {
    let mut spans = Vec::new();
    for (n, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: serde_json::Value = serde_json::from_str(line)
            .map_err(|source| TimelineError::Replay { line: n + 1, source })?;
        let trace_type = record.get("traceType").and_then(serde_json::Value::as_u64);
        if trace_type.is_some_and(|t| t != FLAME_GRAPH_ENTRY) {
            continue;
        }
        let span = serde_json::from_value(record)
            .map_err(|source| TimelineError::Replay { line: n + 1, source })?;
        spans.push(span);
    }
    Ok(spans)
}

pub fn load(path: impl AsRef<Path>) -> Result<Vec<Span>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|err| TimelineError::io(path, err))?;
    let spans = parse_str(&content)?;
    log::info!("loaded {} spans from {}", spans.len(), path.display());
    Ok(spans)
}

/// Running replay thread. Dropping the handle asks the thread to stop.
#[derive(Debug)]
pub struct ReplayHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReplayHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops the stream and waits for the thread.
    pub fn stop(self) {
        self.stop.store(true, Ordering::Relaxed);
        self.join();
    }

    /// Waits for the stream to run to completion.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("replay thread panicked");
            }
        }
    }
}

impl Drop for ReplayHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Streams `spans` into `feed` with their recorded spacing divided by
/// `speed`. The feed reads as connected for the duration of the stream.
/// A non-positive speed streams without delays.
pub fn spawn(
    spans: Vec<Span>,
    feed: SpanFeed,
    speed: f64,
    units_per_second: i64,
) -> Result<ReplayHandle> {
    let stop = Arc::new(AtomicBool::new(false));
    let thread = std::thread::Builder::new()
        .name("hermes-replay".into())
        .spawn({
            let stop = stop.clone();
            move || stream(spans, feed, speed, units_per_second, &stop)
        })
        .map_err(TimelineError::Spawn)?;
    Ok(ReplayHandle {
        stop,
        thread: Some(thread),
    })
}

fn stream(spans: Vec<Span>, feed: SpanFeed, speed: f64, units_per_second: i64, stop: &AtomicBool) {
    let _span = tracing::info_span!("replay", spans = spans.len(), speed).entered();
    feed.set_connected(true);
    let mut previous = None;
    for span in spans {
        if let Some(previous) = previous {
            let delay = replay_delay(previous, &span, speed, units_per_second);
            if !sleep_unless_stopped(delay, stop) {
                break;
            }
        }
        previous = Some(span.start_time);
        feed.push(span);
    }
    feed.set_connected(false);
    log::info!("replay finished");
}

fn replay_delay(
    previous_start: crate::time::TraceTime,
    next: &Span,
    speed: f64,
    units_per_second: i64,
) -> Duration {
    if speed <= 0.0 || !speed.is_finite() {
        return Duration::ZERO;
    }
    let units = (next.start_time - previous_start).clamp_non_negative().as_f64();
    let seconds = units / units_per_second.max(1) as f64 / speed;
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO)
}

fn sleep_unless_stopped(delay: Duration, stop: &AtomicBool) -> bool {
    let mut remaining = delay;
    while !remaining.is_zero() {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining -= slice;
    }
    !stop.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TraceTime;

    const SAMPLE: &str = r#"
{"traceType":4,"funcCallId":1,"coreId":0,"startTime":"1000","endTime":"1500","depth":0,"funcName":"main\u0000\u0000"}
{"traceType":0,"coreId":0,"timestamp":"1100","funcName":"enter"}
{"id":2,"coreId":1,"startTime":1200,"endTime":1300,"depth":1,"name":"irq"}
"#;

    #[test]
    fn parses_flame_records_only() {
        let spans = parse_str(SAMPLE).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].display_name(), "main");
        assert_eq!(spans[1].core_id, 1);
        assert_eq!(spans[1].start_time, TraceTime(1200));
    }

    #[test]
    fn reports_the_failing_line() {
        let err = parse_str("{\"traceType\":4}\n").unwrap_err();
        assert!(matches!(err, TimelineError::Replay { line: 1, .. }));
        let err = parse_str("\n\nnot json").unwrap_err();
        assert!(matches!(err, TimelineError::Replay { line: 3, .. }));
    }

    #[test]
    fn instant_replay_streams_everything() {
        let feed = SpanFeed::new();
        let spans = parse_str(SAMPLE).unwrap();
        spawn(spans, feed.clone(), 0.0, 1_000_000).unwrap().join();
        let drained = feed.drain();
        assert_eq!(drained.spans.len(), 2);
        assert!(!drained.connected);
        assert_eq!(feed.generation(), 2);
    }

    #[test]
    fn delay_scales_with_speed() {
        let next = Span::new(1, 0, TraceTime(2_000_000), TraceTime(2_000_001), 0, "f");
        assert_eq!(
            replay_delay(TraceTime(1_000_000), &next, 2.0, 1_000_000),
            Duration::from_millis(500)
        );
        assert_eq!(replay_delay(TraceTime(3_000_000), &next, 1.0, 1_000_000), Duration::ZERO);
    }
}
