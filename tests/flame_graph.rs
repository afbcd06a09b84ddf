use std::time::Instant;

use hermes_flame::egui::{self, pos2, vec2, Event, Key, Modifiers, Pos2, Rect};
use hermes_flame::themes::colorhash::span_color;
use hermes_flame::{
    CoreFilter, FlameGraph, FollowMode, NavCommand, PassKind, Span, SpanFeed, TraceTime,
};

const WIDTH: f32 = 840.0;
const USABLE: f32 = 800.0;

fn span(id: u64, core: u32, start: i64, end: i64, depth: u32) -> Span {
    Span::new(id, core, TraceTime(start), TraceTime(end), depth, format!("fn_{id}"))
}

fn graph_in(mode: FollowMode) -> FlameGraph {
    let mut graph = FlameGraph::default();
    graph.resize(vec2(WIDTH, 400.0), 1.0);
    graph.set_mode(mode);
    graph
}

fn drawn_ids(graph: &FlameGraph) -> Vec<u64> {
    graph.index().iter().map(|(_, span)| span.id).collect()
}

#[test]
fn follow_view_skips_the_stale_burst() {
    let feed = SpanFeed::new();
    let mut graph = graph_in(FollowMode::Auto).with_feed(feed.clone());

    feed.set_connected(true);
    feed.extend([
        span(1, 0, 0, 10, 0),
        span(2, 0, 10, 20, 0),
        span(3, 0, 1020, 1030, 0),
        span(4, 0, 1030, 1040, 0),
    ]);
    // The first frame picks up the connection and schedules both passes.
    graph.run_frame(Instant::now());
    graph.run_frame(Instant::now());

    assert!(graph.is_connected());
    assert_eq!(drawn_ids(&graph), vec![3, 4]);
    assert_eq!(graph.spans().len(), 4);
}

#[test]
fn every_drawn_rect_hits_its_own_span() {
    let mut graph = graph_in(FollowMode::Manual);
    graph.extend([
        span(1, 0, 0, 1000, 0),
        span(2, 0, 0, 400, 1),
        span(3, 0, 500, 900, 1),
        span(4, 0, 1200, 2000, 0),
    ]);
    graph.run_frame(Instant::now());

    assert_eq!(graph.index().len(), 4);
    for (rect, span) in graph.index().iter() {
        assert_eq!(graph.index().hit(rect.center()).map(|s| s.id), Some(span.id));
    }
    assert!(graph.index().hit(pos2(1.0, 1.0)).is_none());
}

#[test]
fn combined_view_splits_lanes_per_core() {
    let mut graph = graph_in(FollowMode::Manual);
    graph.extend([span(1, 0, 0, 500, 0), span(2, 1, 0, 500, 0)]);
    graph.run_frame(Instant::now());

    let y_of = |id: u64| {
        graph
            .index()
            .iter()
            .find(|(_, span)| span.id == id)
            .map(|(rect, _)| rect.min.y)
    };
    assert_eq!(y_of(1), Some(20.0));
    assert_eq!(y_of(2), Some(220.0));

    let labels: Vec<&str> = graph.overlay_layer().texts().collect();
    assert!(labels.contains(&"Core 0"));
    assert!(labels.contains(&"Core 1"));
    assert_eq!(
        graph.core_options(),
        vec![CoreFilter::Core(0), CoreFilter::Core(1), CoreFilter::All]
    );
}

#[test]
fn jumps_walk_span_starts() {
    let mut graph = graph_in(FollowMode::Manual);
    graph.extend([
        span(1, 0, 0, 10, 0),
        span(2, 0, 100, 110, 0),
        span(3, 0, 250, 260, 0),
    ]);
    graph.run_frame(Instant::now());

    let center = graph.viewport().center_time(USABLE);
    assert!(center > TraceTime(100) && center < TraceTime(250));

    graph.apply(NavCommand::JumpPrev);
    assert_eq!(graph.viewport().center_time(USABLE), TraceTime(100));
    graph.apply(NavCommand::JumpNext);
    assert_eq!(graph.viewport().center_time(USABLE), TraceTime(250));

    let last = *graph.viewport();
    graph.apply(NavCommand::JumpNext);
    assert_eq!(*graph.viewport(), last);
}

#[test]
fn colors_are_a_pure_function_of_name_and_depth() {
    assert_eq!(span_color("foo", 2), span_color("foo", 2));
    assert_ne!(span_color("foo", 2), span_color("foo", 3));

    let mut graph = graph_in(FollowMode::Manual);
    graph.extend([span(1, 0, 0, 100, 0)]);
    graph.run_frame(Instant::now());
    let first: Vec<_> = graph.data_layer().ops().to_vec();
    graph.apply(NavCommand::PanRight);
    graph.apply(NavCommand::PanLeft);
    graph.run_frame(Instant::now());
    assert_eq!(graph.data_layer().ops(), &first[..]);
}

#[test]
fn reconnect_does_not_duplicate_loops() {
    let mut graph = graph_in(FollowMode::Auto);
    graph.extend([span(1, 0, 0, 100, 0)]);
    for _ in 0..3 {
        graph.set_connected(true);
        graph.set_connected(false);
    }
    graph.set_connected(true);
    assert_eq!(graph.pending_frames(), 2);
    assert_eq!(graph.run_frame(Instant::now()).len(), 2);
    assert_eq!(graph.pending_frames(), 2);

    graph.teardown();
    assert!(!graph.has_pending_frame());
    assert!(graph.run_frame(Instant::now()).is_empty());
}

#[test]
fn disconnected_follow_view_redraws_on_filter_and_resize() {
    let mut graph = graph_in(FollowMode::Auto);
    graph.extend([span(1, 0, 0, 500, 0), span(2, 1, 0, 500, 0)]);
    graph.set_connected(true);
    graph.run_frame(Instant::now());
    assert_eq!(graph.index().len(), 2);

    graph.set_connected(false);
    assert_eq!(graph.pending_frames(), 0);

    graph.set_core_filter(CoreFilter::Core(1));
    let ran = graph.run_frame(Instant::now());
    assert!(ran.contains(&PassKind::Data));
    assert!(ran.contains(&PassKind::Overlay));
    let cores: Vec<u32> = graph.index().iter().map(|(_, span)| span.core_id).collect();
    assert_eq!(cores, vec![1]);
    assert_eq!(graph.pending_frames(), 0);

    graph.resize(vec2(1200.0, 600.0), 1.0);
    let ran = graph.run_frame(Instant::now());
    assert_eq!(ran.len(), 2);
    assert_eq!(graph.index().len(), 1);
    assert_eq!(graph.pending_frames(), 0);
    assert_eq!(graph.mode(), FollowMode::Auto);
}

#[test]
fn reconnect_between_drains_starts_a_new_session() {
    let feed = SpanFeed::new();
    let mut graph = graph_in(FollowMode::Auto).with_feed(feed.clone());
    feed.set_connected(true);
    feed.push(span(1, 0, 0, 100, 0));
    graph.run_frame(Instant::now());
    let first = graph.recording_since().expect("connected");

    std::thread::sleep(std::time::Duration::from_millis(5));
    feed.set_connected(false);
    feed.set_connected(true);
    graph.run_frame(Instant::now());

    assert!(graph.is_connected());
    assert!(graph.recording_since().expect("connected") > first);
    assert!(graph.is_pass_running(PassKind::Data));
    assert!(graph.is_pass_running(PassKind::Overlay));
    assert_eq!(graph.pending_frames(), 2);
}

/// Arrival order is not time order, one span ends before it starts and one
/// has no duration.
fn unordered_spans() -> Vec<Span> {
    vec![
        span(1, 0, 0, 1000, 0),
        span(2, 0, 600, 400, 1),
        span(3, 0, 300, 300, 2),
        span(4, 0, 200, 500, 1),
    ]
}

fn assert_unordered_spans_drawn(graph: &FlameGraph) {
    let mut ids = drawn_ids(graph);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    for id in [2, 3] {
        let rect = graph.index().rect_of(id).expect("malformed span drawn");
        assert!((rect.width() - 1.0).abs() < 1e-3, "span {id} is {} wide", rect.width());
    }
    let rect = graph.index().rect_of(4).expect("out of order span drawn");
    assert!(rect.width() > 1.0);
}

#[test]
fn unordered_and_inverted_spans_in_follow_view() {
    let feed = SpanFeed::new();
    let mut graph = graph_in(FollowMode::Auto).with_feed(feed.clone());
    feed.set_connected(true);
    feed.extend(unordered_spans());
    graph.run_frame(Instant::now());
    graph.run_frame(Instant::now());

    assert_eq!(graph.spans().len(), 4);
    assert_unordered_spans_drawn(&graph);
}

#[test]
fn unordered_and_inverted_spans_in_manual_view() {
    let mut graph = graph_in(FollowMode::Manual);
    graph.extend(unordered_spans());
    graph.run_frame(Instant::now());

    assert_unordered_spans_drawn(&graph);
    let center = graph.index().rect_of(3).map(|rect| rect.center());
    assert_eq!(graph.index().hit(center.expect("drawn")).map(|s| s.id), Some(3));
}

fn raw_input(events: Vec<Event>) -> egui::RawInput {
    egui::RawInput {
        screen_rect: Some(Rect::from_min_size(Pos2::ZERO, vec2(WIDTH, 600.0))),
        events,
        ..Default::default()
    }
}

fn run(ctx: &egui::Context, graph: &mut FlameGraph, events: Vec<Event>) {
    let _ = ctx.run(raw_input(events), |ctx| {
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                graph.show(ui);
            });
    });
}

#[test]
fn egui_frames_drive_the_widget() {
    let ctx = egui::Context::default();
    let mut graph = FlameGraph::default();
    graph.set_mode(FollowMode::Manual);
    graph.extend([span(1, 0, 0, 1000, 0), span(2, 0, 2000, 3000, 1)]);

    for _ in 0..3 {
        run(&ctx, &mut graph, Vec::new());
    }
    assert_eq!(graph.surface().size(), vec2(WIDTH, 600.0));
    assert_eq!(graph.index().len(), 2);
    assert!(graph
        .overlay_layer()
        .texts()
        .any(|t| t.starts_with("WASD to Move")));

    let target = graph.index().iter().next().map(|(rect, _)| rect.center());
    let target = target.expect("a span was drawn");
    run(&ctx, &mut graph, vec![Event::PointerMoved(target)]);
    run(&ctx, &mut graph, Vec::new());
    assert_eq!(graph.inspected().map(|s| s.id), Some(1));

    let zoom = graph.viewport().zoom();
    let press = Event::Key {
        key: Key::W,
        physical_key: None,
        pressed: true,
        repeat: false,
        modifiers: Modifiers::NONE,
    };
    run(&ctx, &mut graph, vec![press]);
    assert!(graph.viewport().zoom() > zoom);
}
