//! Time offset and zoom of one flame surface.
//!
//! The offset is kept as a whole [`TraceTime`] plus a fractional unit in
//! `[0, 1)`. Timestamps are far too large for `f64` to carry sub-unit
//! precision, yet deep zoom levels map a single unit to many pixels, so the
//! fraction is what keeps the zoom anchor pinned.

use crate::config::TimelineConfig;
use crate::span::Bounds;
use crate::time::{TraceDuration, TraceTime};

/// Fallback window for zero-length data.
pub const EMPTY_WINDOW: TraceDuration = TraceDuration(100);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    offset: TraceTime,
    fract: f64,
    zoom: f64,
    min_zoom: f64,
    max_zoom: f64,
    left_margin: f64,
}

impl Viewport {
    pub fn new(min_zoom: f64, max_zoom: f64, left_margin: f32) -> Self {
        let (min_zoom, max_zoom) = if min_zoom <= max_zoom {
            (min_zoom, max_zoom)
        } else {
            (max_zoom, min_zoom)
        };
        Self {
            offset: TraceTime::ZERO,
            fract: 0.0,
            zoom: 1.0_f64.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            left_margin: left_margin as f64,
        }
    }

    pub fn from_config(config: &TimelineConfig) -> Self {
        Self::new(config.min_zoom, config.max_zoom, config.left_margin)
    }

    /// Time shown at `x = left_margin`, rounded down to a whole unit.
    pub fn offset(&self) -> TraceTime {
        self.offset
    }

    /// Pixels per time unit.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn left_margin(&self) -> f32 {
        self.left_margin as f32
    }

    pub fn set_offset(&mut self, offset: TraceTime) {
        self.offset = offset;
        self.fract = 0.0;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = self.clamp_zoom(zoom);
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Surface-local x of `t`. May fall outside the surface.
    pub fn time_to_pixel(&self, t: TraceTime) -> f64 {
        ((t - self.offset).as_f64() - self.fract) * self.zoom + self.left_margin
    }

    /// Nearest whole time unit at surface-local `x`.
    pub fn pixel_to_time(&self, x: f64) -> TraceTime {
        let rel = (x - self.left_margin) / self.zoom + self.fract;
        self.offset + TraceDuration(rel.round() as i64)
    }

    pub fn pan(&mut self, delta: TraceDuration) {
        self.offset += delta;
    }

    /// Multiplies the zoom (clamped) keeping `anchor` at the same pixel.
    pub fn zoom_by(&mut self, factor: f64, anchor: TraceTime) {
        let new_zoom = self.clamp_zoom(self.zoom * factor);
        if new_zoom == self.zoom {
            return;
        }
        let anchor_rel = (anchor - self.offset).as_f64() - self.fract;
        let rel = anchor_rel * self.zoom / new_zoom;
        let whole = rel.ceil();
        self.offset = anchor - TraceDuration(whole as i64);
        self.fract = whole - rel;
        self.zoom = new_zoom;
    }

    /// Frames `bounds` into roughly 95% of `usable_width` with 2.5% left
    /// padding.
    pub fn initialize_from_bounds(&mut self, bounds: Bounds, usable_width: f32) {
        let mut duration = bounds.duration();
        if !duration.is_positive() {
            duration = EMPTY_WINDOW;
        }
        self.zoom = self.clamp_zoom(usable_width.max(0.0) as f64 / duration.as_f64() * 0.95);
        self.set_offset(bounds.min_start - duration.div(40));
        log::debug!(
            "viewport framed at offset {} zoom {:.6}",
            self.offset,
            self.zoom
        );
    }

    /// Auto-follow framing: the data plus 5% slack, starting 5% of the window
    /// before the first span.
    pub fn follow(&mut self, bounds: Bounds, usable_width: f32) {
        let duration = bounds.duration();
        let window = if duration.is_positive() {
            duration + duration.div(20)
        } else {
            EMPTY_WINDOW
        };
        self.set_offset(bounds.min_start - window.scale(0.05));
        self.zoom = self.clamp_zoom(usable_width.max(0.0) as f64 / window.as_f64());
    }

    pub fn visible_duration(&self, usable_width: f32) -> TraceDuration {
        TraceDuration((usable_width.max(0.0) as f64 / self.zoom).floor() as i64)
    }

    /// Whole units between the left margin and the middle of the usable
    /// width.
    fn half_window(&self, usable_width: f32) -> TraceDuration {
        TraceDuration((usable_width.max(0.0) as f64 / 2.0 / self.zoom).round() as i64)
    }

    /// Time under the middle of the usable width, fractional offset included.
    pub fn center_time(&self, usable_width: f32) -> TraceTime {
        self.pixel_to_time(self.left_margin + usable_width.max(0.0) as f64 / 2.0)
    }

    /// Recenters on `t`, keeping the zoom.
    pub fn center_on(&mut self, t: TraceTime, usable_width: f32) {
        let half = self.half_window(usable_width);
        self.set_offset(t - half);
    }
}
