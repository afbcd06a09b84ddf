//! Retained display lists and the two pass builders.
//!
//! Both passes record [`DrawOp`]s in surface-local logical pixels. Painting
//! them onto an egui layer happens later, once per displayed frame, so the
//! overlay can refresh without the data layer being rebuilt.

use std::time::Duration;

use egui::{pos2, vec2, Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, StrokeKind, Vec2};

use crate::config::TimelineConfig;
use crate::hit_test::SpanIndex;
use crate::layout::LaneLayout;
use crate::span::Span;
use crate::themes::{self, colorhash};
use crate::time::{format_relative_seconds, TraceTime};
use crate::viewport::Viewport;

pub const NO_DATA_TEXT: &str = "No trace data available";

const LABEL_FONT_SIZE: f32 = 10.0;
const OVERLAY_FONT_SIZE: f32 = 12.0;
const PLACEHOLDER_FONT_SIZE: f32 = 14.0;
const TICK_LENGTH: f32 = 5.0;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Fill {
        rect: Rect,
        color: Color32,
    },
    Outline {
        rect: Rect,
        stroke: Stroke,
    },
    Line {
        from: Pos2,
        to: Pos2,
        stroke: Stroke,
    },
    Text {
        pos: Pos2,
        anchor: Align2,
        text: String,
        size: f32,
        color: Color32,
        clip: Option<Rect>,
    },
}

#[derive(Clone, Debug, Default)]
pub struct DrawList {
    ops: Vec<DrawOp>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn fill(&mut self, rect: Rect, color: Color32) {
        self.ops.push(DrawOp::Fill { rect, color });
    }

    pub fn outline(&mut self, rect: Rect, stroke: Stroke) {
        self.ops.push(DrawOp::Outline { rect, stroke });
    }

    pub fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.ops.push(DrawOp::Line { from, to, stroke });
    }

    pub fn text(
        &mut self,
        pos: Pos2,
        anchor: Align2,
        text: impl Into<String>,
        size: f32,
        color: Color32,
        clip: Option<Rect>,
    ) {
        self.ops.push(DrawOp::Text {
            pos,
            anchor,
            text: text.into(),
            size,
            color,
            clip,
        });
    }

    /// Every text op, in order. Handy for assertions.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Paints the list translated by `origin`.
    pub fn paint(&self, painter: &Painter, origin: Vec2) {
        for op in &self.ops {
            match op {
                DrawOp::Fill { rect, color } => {
                    painter.rect_filled(rect.translate(origin), 0.0, *color);
                }
                DrawOp::Outline { rect, stroke } => {
                    painter.rect_stroke(rect.translate(origin), 0.0, *stroke, StrokeKind::Inside);
                }
                DrawOp::Line { from, to, stroke } => {
                    painter.line_segment([*from + origin, *to + origin], *stroke);
                }
                DrawOp::Text {
                    pos,
                    anchor,
                    text,
                    size,
                    color,
                    clip,
                } => {
                    let font = FontId::monospace(*size);
                    match clip {
                        Some(clip) => {
                            let clip = clip.translate(origin).intersect(painter.clip_rect());
                            painter.with_clip_rect(clip).text(
                                *pos + origin,
                                *anchor,
                                text,
                                font,
                                *color,
                            );
                        }
                        None => {
                            painter.text(*pos + origin, *anchor, text, font, *color);
                        }
                    }
                }
            }
        }
    }
}

/// Per-mode knobs for the data pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassStyle {
    pub label_min_width: f32,
    pub ticks: usize,
}

impl PassStyle {
    pub fn live(config: &TimelineConfig) -> Self {
        Self {
            label_min_width: config.live_label_min_width,
            ticks: config.live_ticks,
        }
    }

    pub fn manual(config: &TimelineConfig) -> Self {
        Self {
            label_min_width: config.label_min_width,
            ticks: config.manual_ticks,
        }
    }
}

/// Inputs of one data pass.
pub struct DataFrame<'a> {
    /// Core-filtered spans, already pruned in auto-follow mode.
    pub spans: &'a [&'a Span],
    pub viewport: &'a Viewport,
    pub layout: &'a LaneLayout,
    pub size: Vec2,
    pub style: PassStyle,
    /// Origin of the relative tick labels.
    pub dataset_start: TraceTime,
    pub config: &'a TimelineConfig,
}

/// Horizontal extent of a span, or `None` when it is too thin to show.
pub fn span_extent(span: &Span, viewport: &Viewport, config: &TimelineConfig) -> Option<(f32, f32)> {
    let x1 = viewport.time_to_pixel(span.start_time);
    if span.is_malformed() {
        return Some((x1 as f32, config.min_span_width));
    }
    let x2 = viewport.time_to_pixel(span.end_time);
    let natural = (x2 - x1) as f32;
    if natural < config.min_visible_width {
        return None;
    }
    Some((x1 as f32, natural.max(config.min_span_width)))
}

/// Rebuilds the data layer and the hit-test index.
pub fn build_data_layer(frame: &DataFrame<'_>, list: &mut DrawList, index: &mut SpanIndex) {
    let _span = tracing::info_span!("data_pass", spans = frame.spans.len()).entered();
    list.clear();
    index.clear();

    let width = frame.size.x;
    let height = frame.size.y;
    let config = frame.config;
    list.fill(Rect::from_min_size(Pos2::ZERO, frame.size), themes::SURFACE_BACKGROUND);

    if frame.spans.is_empty() {
        list.text(
            pos2(width / 2.0, height / 2.0),
            Align2::CENTER_CENTER,
            NO_DATA_TEXT,
            PLACEHOLDER_FONT_SIZE,
            themes::PLACEHOLDER_TEXT,
            None,
        );
        return;
    }

    let left = frame.viewport.left_margin();
    let row_height = frame.layout.row_height();
    let rect_height = frame.layout.rect_height();

    for span in frame.spans.iter().copied() {
        let Some((x, w)) = span_extent(span, frame.viewport, config) else {
            continue;
        };
        if x + w < left || x > width {
            continue;
        }
        let Some(y) = frame.layout.span_y(span.core_id, span.depth) else {
            continue;
        };
        if y > height {
            continue;
        }

        let rect = Rect::from_min_size(pos2(x, y), vec2(w, rect_height));
        list.fill(rect, colorhash::span_color(&span.name, span.depth));
        if w > frame.style.label_min_width {
            list.text(
                pos2(x + 5.0, y + row_height / 2.0),
                Align2::LEFT_CENTER,
                span.display_name(),
                LABEL_FONT_SIZE,
                themes::SPAN_LABEL,
                Some(rect),
            );
        }
        index.insert(rect, span.clone());
    }

    build_axis(frame, list);
}

fn build_axis(frame: &DataFrame<'_>, list: &mut DrawList) {
    let width = frame.size.x;
    let left = frame.viewport.left_margin();
    let config = frame.config;
    let top = (frame.size.y - config.axis_height).max(0.0);
    let usable = (width - left).max(0.0);

    list.fill(
        Rect::from_min_max(pos2(left, top), pos2(width, frame.size.y)),
        themes::SURFACE_BACKGROUND,
    );
    list.line(
        pos2(left, top),
        pos2(width, top),
        Stroke::new(1.0, themes::AXIS_LINE),
    );

    let ticks = frame.style.ticks.max(1);
    for i in 0..=ticks {
        let x = left + usable * i as f32 / ticks as f32;
        let t = frame.viewport.pixel_to_time(x as f64);
        let label = format_relative_seconds(t - frame.dataset_start, config.units_per_second, 4);
        list.fill(
            Rect::from_min_size(pos2(x, top), vec2(1.0, TICK_LENGTH)),
            themes::TICK_MARK,
        );
        let anchor = if i == 0 {
            Align2::LEFT_CENTER
        } else if i == ticks {
            Align2::RIGHT_CENTER
        } else {
            Align2::CENTER_CENTER
        };
        list.text(
            pos2(x, top + config.axis_height / 2.0),
            anchor,
            label,
            LABEL_FONT_SIZE,
            themes::TICK_LABEL,
            None,
        );
    }
}

/// Inputs of one overlay pass.
pub struct OverlayFrame<'a> {
    pub size: Vec2,
    /// `(core, lane top)` for every labelled lane.
    pub lanes: &'a [(u32, f32)],
    pub dividers: &'a [f32],
    /// Shown while following a connected stream.
    pub elapsed: Option<Duration>,
    pub hint: Option<&'a str>,
    /// Inspected span, outlined on top of the data layer.
    pub highlight: Option<(Rect, Color32)>,
}

pub fn build_overlay(frame: &OverlayFrame<'_>, list: &mut DrawList) {
    list.clear();
    if frame.size.x <= 0.0 || frame.size.y <= 0.0 {
        return;
    }
    let corner = pos2(frame.size.x - 10.0, 5.0);

    if let Some(elapsed) = frame.elapsed {
        list.text(
            corner,
            Align2::RIGHT_TOP,
            format!("Time since start: {} ms", elapsed.as_millis()),
            OVERLAY_FONT_SIZE,
            Color32::WHITE,
            None,
        );
    } else if let Some(hint) = frame.hint {
        list.text(
            corner,
            Align2::RIGHT_TOP,
            hint,
            OVERLAY_FONT_SIZE,
            themes::HINT_TEXT,
            None,
        );
    }

    for &(core, top) in frame.lanes {
        list.text(
            pos2(5.0, top),
            Align2::LEFT_TOP,
            format!("Core {core}"),
            LABEL_FONT_SIZE,
            themes::LANE_LABEL,
            None,
        );
    }
    for &y in frame.dividers {
        list.fill(
            Rect::from_min_size(pos2(15.0, y), vec2(frame.size.x - 15.0, 1.0)),
            themes::LANE_DIVIDER,
        );
    }

    if let Some((rect, fill)) = frame.highlight {
        list.outline(rect, colorhash::highlight_stroke(fill));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::CoreFilter;

    fn frame_parts() -> (TimelineConfig, Viewport) {
        let config = TimelineConfig::default();
        let mut viewport = Viewport::from_config(&config);
        viewport.set_offset(TraceTime(0));
        viewport.set_zoom(1.0);
        (config, viewport)
    }

    #[test]
    fn width_rule() {
        let (config, mut viewport) = frame_parts();
        viewport.set_zoom(0.001);
        let thin = Span::new(1, 0, TraceTime(0), TraceTime(100), 0, "thin");
        assert_eq!(span_extent(&thin, &viewport, &config), None);
        let narrow = Span::new(2, 0, TraceTime(0), TraceTime(500), 0, "narrow");
        assert_eq!(span_extent(&narrow, &viewport, &config), Some((40.0, 1.0)));
        let inverted = Span::new(3, 0, TraceTime(10), TraceTime(0), 0, "inverted");
        assert_eq!(span_extent(&inverted, &viewport, &config).map(|e| e.1), Some(1.0));
    }

    #[test]
    fn data_layer_indexes_drawn_spans() {
        let (config, viewport) = frame_parts();
        let layout = LaneLayout::compute(&[0], CoreFilter::All, 400.0, &config);
        let spans = [
            Span::new(1, 0, TraceTime(0), TraceTime(100), 0, "root\0"),
            Span::new(2, 0, TraceTime(10), TraceTime(20), 1, "leaf"),
            Span::new(3, 0, TraceTime(5_000), TraceTime(5_100), 0, "offscreen"),
        ];
        let refs: Vec<&Span> = spans.iter().collect();
        let frame = DataFrame {
            spans: &refs,
            viewport: &viewport,
            layout: &layout,
            size: vec2(800.0, 400.0),
            style: PassStyle::manual(&config),
            dataset_start: TraceTime(0),
            config: &config,
        };
        let mut list = DrawList::new();
        let mut index = SpanIndex::new();
        build_data_layer(&frame, &mut list, &mut index);

        assert_eq!(index.len(), 2);
        assert_eq!(index.hit(pos2(90.0, 30.0)).map(|s| s.id), Some(1));
        assert_eq!(index.hit(pos2(55.0, 70.0)).map(|s| s.id), Some(2));
        let texts: Vec<&str> = list.texts().collect();
        assert!(texts.contains(&"root"));
        assert!(!texts.contains(&"leaf"));
        assert_eq!(texts.iter().filter(|t| t.ends_with('s')).count(), 11);
    }

    #[test]
    fn empty_data_draws_placeholder() {
        let (config, viewport) = frame_parts();
        let layout = LaneLayout::compute(&[], CoreFilter::Core(1), 400.0, &config);
        let frame = DataFrame {
            spans: &[],
            viewport: &viewport,
            layout: &layout,
            size: vec2(800.0, 400.0),
            style: PassStyle::live(&config),
            dataset_start: TraceTime(0),
            config: &config,
        };
        let mut list = DrawList::new();
        let mut index = SpanIndex::new();
        build_data_layer(&frame, &mut list, &mut index);
        assert_eq!(list.texts().collect::<Vec<_>>(), vec![NO_DATA_TEXT]);
        assert!(index.is_empty());
    }

    #[test]
    fn overlay_shows_timer_or_hint() {
        let mut list = DrawList::new();
        build_overlay(
            &OverlayFrame {
                size: vec2(800.0, 400.0),
                lanes: &[(0, 20.0), (1, 220.0)],
                dividers: &[200.0],
                elapsed: Some(Duration::from_millis(1234)),
                hint: Some("ignored while live"),
                highlight: None,
            },
            &mut list,
        );
        let texts: Vec<&str> = list.texts().collect();
        assert_eq!(texts, vec!["Time since start: 1234 ms", "Core 0", "Core 1"]);

        build_overlay(
            &OverlayFrame {
                size: vec2(800.0, 400.0),
                lanes: &[],
                dividers: &[],
                elapsed: None,
                hint: Some("WASD to Move"),
                highlight: None,
            },
            &mut list,
        );
        assert_eq!(list.texts().collect::<Vec<_>>(), vec!["WASD to Move"]);
    }
}
