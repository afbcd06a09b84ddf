//! The flame graph engine: owned state plus its egui integration.
//!
//! All mutation happens on the UI thread through `&mut FlameGraph`. Producers
//! on other threads go through a [`SpanFeed`].

use std::time::Instant;

use egui::{vec2, LayerId, Order, Pos2, Sense, Vec2};

use crate::config::TimelineConfig;
use crate::error::{Result, TimelineError};
use crate::feed::SpanFeed;
use crate::frame::{FrameClock, PassKind, RenderPass};
use crate::hit_test::SpanIndex;
use crate::input::{jump_target, JumpDirection, KeyMap, NavCommand};
use crate::layout::{CoreFilter, LaneCache};
use crate::pruning::live_suffix;
use crate::render::{self, DataFrame, DrawList, OverlayFrame, PassStyle};
use crate::span::{Bounds, Span, SpanStore};
use crate::surface::Surface;
use crate::themes::colorhash;
use crate::time::TraceTime;
use crate::viewport::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowMode {
    /// Frames the live suffix of the stream every frame while connected.
    Auto,
    /// Keyboard-driven viewport over the full sequence.
    Manual,
}

pub struct FlameGraph {
    config: TimelineConfig,
    keymap: KeyMap,
    hint: String,
    mode: FollowMode,
    store: SpanStore,
    follow_viewport: Viewport,
    manual_viewport: Option<Viewport>,
    surface: Surface,
    index: SpanIndex,
    pointer: Option<Pos2>,
    inspected: Option<Span>,
    core_filter: CoreFilter,
    lanes: LaneCache,
    clock: FrameClock,
    overlay_pass: RenderPass,
    data_pass: RenderPass,
    connected: bool,
    record_start: Option<Instant>,
    data_layer: DrawList,
    overlay_layer: DrawList,
    feed: Option<SpanFeed>,
    feed_generation: u64,
}

impl Default for FlameGraph {
    fn default() -> Self {
        Self::with_keymap(TimelineConfig::default(), KeyMap::default())
    }
}

impl FlameGraph {
    /// Fails when a configured key name is unknown.
    pub fn new(config: TimelineConfig) -> Result<Self> {
        let keymap = KeyMap::from_bindings(&config.keys)?;
        Ok(Self::with_keymap(config, keymap))
    }

    fn with_keymap(config: TimelineConfig, keymap: KeyMap) -> Self {
        let hint = keymap.hint();
        Self {
            follow_viewport: Viewport::from_config(&config),
            config,
            keymap,
            hint,
            mode: FollowMode::Auto,
            store: SpanStore::new(),
            manual_viewport: None,
            surface: Surface::default(),
            index: SpanIndex::new(),
            pointer: None,
            inspected: None,
            core_filter: CoreFilter::All,
            lanes: LaneCache::default(),
            clock: FrameClock::new(),
            overlay_pass: RenderPass::new(PassKind::Overlay),
            data_pass: RenderPass::new(PassKind::Data),
            connected: false,
            record_start: None,
            data_layer: DrawList::new(),
            overlay_layer: DrawList::new(),
            feed: None,
            feed_generation: 0,
        }
    }

    /// Drains `feed` at the start of every frame.
    pub fn with_feed(mut self, feed: SpanFeed) -> Self {
        self.feed_generation = feed.generation();
        self.feed = Some(feed);
        self
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn keymap(&self) -> &KeyMap {
        &self.keymap
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// When the current recording session began. Reset on every connect.
    pub fn recording_since(&self) -> Option<Instant> {
        self.record_start
    }

    pub fn spans(&self) -> &[Span] {
        self.store.as_slice()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn index(&self) -> &SpanIndex {
        &self.index
    }

    pub fn data_layer(&self) -> &DrawList {
        &self.data_layer
    }

    pub fn overlay_layer(&self) -> &DrawList {
        &self.overlay_layer
    }

    pub fn core_filter(&self) -> CoreFilter {
        self.core_filter
    }

    pub fn core_options(&self) -> Vec<CoreFilter> {
        CoreFilter::options(&self.store.cores())
    }

    /// The span under the pointer, as of the last pointer move.
    pub fn inspected(&self) -> Option<&Span> {
        self.inspected.as_ref()
    }

    /// Viewport the data layer is drawn with.
    pub fn viewport(&self) -> &Viewport {
        match (self.mode, &self.manual_viewport) {
            (FollowMode::Manual, Some(viewport)) => viewport,
            _ => &self.follow_viewport,
        }
    }

    pub fn has_pending_frame(&self) -> bool {
        self.clock.has_pending()
    }

    pub fn is_pass_running(&self, kind: PassKind) -> bool {
        self.pass(kind).is_running()
    }

    pub fn pending_frames(&self) -> usize {
        self.clock.pending_count()
    }

    fn pass(&self, kind: PassKind) -> &RenderPass {
        match kind {
            PassKind::Overlay => &self.overlay_pass,
            PassKind::Data => &self.data_pass,
        }
    }

    fn usable_width(&self) -> f32 {
        (self.surface.width() - self.config.left_margin).max(0.0)
    }

    pub fn push(&mut self, span: Span) {
        self.extend(std::iter::once(span));
    }

    /// Appends spans, dropping ids already known.
    pub fn extend(&mut self, spans: impl IntoIterator<Item = Span>) {
        let added = self.store.extend(spans);
        if added > 0 && self.mode == FollowMode::Manual {
            self.request_redraw();
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        log::info!("stream {}", if connected { "connected" } else { "disconnected" });
        if connected {
            self.record_start = Some(Instant::now());
        }
        if self.mode != FollowMode::Auto {
            return;
        }
        if connected {
            if let Err(err) = self.start_passes() {
                log::warn!("{err}");
            }
        } else {
            self.stop_passes();
        }
    }

    /// Starts the passes the current mode calls for.
    pub fn start_passes(&mut self) -> Result<()> {
        if !self.surface.is_attached() {
            let pass = match self.mode {
                FollowMode::Auto if !self.connected => return Ok(()),
                FollowMode::Auto => PassKind::Data,
                FollowMode::Manual => PassKind::Overlay,
            };
            return Err(TimelineError::SurfaceDetached { pass: pass.name() });
        }
        match self.mode {
            FollowMode::Auto => {
                if self.connected {
                    self.overlay_pass.start(&mut self.clock);
                    self.data_pass.start(&mut self.clock);
                }
            }
            FollowMode::Manual => {
                self.overlay_pass.start(&mut self.clock);
                self.data_pass.schedule(&mut self.clock);
            }
        }
        Ok(())
    }

    fn stop_passes(&mut self) {
        self.overlay_pass.stop(&mut self.clock);
        self.data_pass.stop(&mut self.clock);
    }

    /// Cancels everything in flight and detaches the surface.
    pub fn teardown(&mut self) {
        self.stop_passes();
        let cancelled = self.clock.cancel_all();
        self.surface.detach();
        log::debug!("flame graph torn down, {cancelled} stray frames cancelled");
    }

    /// Re-attaches a torn-down surface and restarts the passes.
    pub fn attach(&mut self) -> Result<()> {
        self.surface.attach();
        self.start_passes()
    }

    /// Applies a new logical size and pixel density.
    pub fn resize(&mut self, size: Vec2, pixels_per_point: f32) {
        if self.surface.resize(size, pixels_per_point) {
            let [w, h] = self.surface.physical_size();
            log::trace!("surface resized to {w}x{h} device pixels");
            self.request_redraw();
        }
    }

    /// Schedules both passes for the next frame. Passes that are not
    /// looping run once.
    fn request_redraw(&mut self) {
        if self.surface.is_attached() {
            self.data_pass.schedule(&mut self.clock);
            self.overlay_pass.schedule(&mut self.clock);
        }
    }

    pub fn set_mode(&mut self, mode: FollowMode) {
        match mode {
            FollowMode::Auto => self.enter_auto(),
            FollowMode::Manual => self.enter_manual(),
        }
    }

    fn enter_manual(&mut self) {
        if self.mode == FollowMode::Manual {
            return;
        }
        self.stop_passes();
        self.mode = FollowMode::Manual;
        self.manual_viewport = self.framed_follow_viewport();
        log::debug!("switched to manual navigation");
        if let Err(err) = self.start_passes() {
            log::warn!("{err}");
        }
    }

    fn enter_auto(&mut self) {
        if self.mode == FollowMode::Auto {
            return;
        }
        self.stop_passes();
        self.mode = FollowMode::Auto;
        self.manual_viewport = None;
        log::debug!("switched to auto-follow");
        if self.surface.is_attached() {
            if self.connected {
                if let Err(err) = self.start_passes() {
                    log::warn!("{err}");
                }
            } else {
                // One refresh so the view leaves the manual framing.
                self.request_redraw();
            }
        }
    }

    fn filtered_spans(&self) -> Vec<&Span> {
        self.store.filtered(self.core_filter).collect()
    }

    /// Auto-follow framing of the live suffix, if there is any data.
    fn framed_follow_viewport(&self) -> Option<Viewport> {
        let filtered = self.filtered_spans();
        let live = live_suffix(&filtered, self.config.gap_threshold_multiplier);
        let bounds = Bounds::of(live.iter().copied())?;
        let mut viewport = self.follow_viewport;
        viewport.follow(bounds, self.usable_width());
        Some(viewport)
    }

    /// Switches the visible cores.
    pub fn set_core_filter(&mut self, filter: CoreFilter) {
        if self.core_filter == filter {
            return;
        }
        log::info!("core filter changed to {filter}");
        self.core_filter = filter;
        self.lanes.invalidate();
        self.inspected = None;
        let usable = self.usable_width();
        if let Some(viewport) = self.manual_viewport.as_mut() {
            if let Some(bounds) = self.store.bounds(filter) {
                viewport.initialize_from_bounds(bounds, usable);
            }
        }
        self.request_redraw();
    }

    /// Runs one navigation command. Navigation in auto-follow mode first
    /// switches to manual mode, seeded with the current framing.
    pub fn apply(&mut self, command: NavCommand) {
        if command == NavCommand::Follow {
            self.enter_auto();
            return;
        }
        self.enter_manual();

        let usable = self.usable_width();
        let Some(mut viewport) = self.manual_viewport else {
            return;
        };
        match command {
            NavCommand::PanLeft | NavCommand::PanRight => {
                let step = viewport.visible_duration(usable).scale(self.config.pan_fraction);
                let step = if command == NavCommand::PanLeft { -step } else { step };
                viewport.pan(step);
            }
            NavCommand::ZoomIn | NavCommand::ZoomOut => {
                let factor = if command == NavCommand::ZoomIn {
                    self.config.zoom_factor
                } else {
                    1.0 / self.config.zoom_factor
                };
                viewport.zoom_by(factor, viewport.center_time(usable));
            }
            NavCommand::JumpPrev | NavCommand::JumpNext => {
                let direction = if command == NavCommand::JumpPrev {
                    JumpDirection::Previous
                } else {
                    JumpDirection::Next
                };
                let center = viewport.center_time(usable);
                let Some(target) =
                    jump_target(self.store.filtered(self.core_filter), center, direction)
                else {
                    return;
                };
                viewport.center_on(target, usable);
            }
            NavCommand::Follow => {}
        }
        self.manual_viewport = Some(viewport);
        self.request_redraw();
    }

    /// Updates the inspected span from a surface-local pointer position.
    pub fn pointer_moved(&mut self, pos: Option<Pos2>) {
        self.pointer = pos;
        self.inspected = pos.and_then(|pos| self.index.hit(pos).cloned());
    }

    /// Drains the feed and runs every pass due this frame.
    pub fn run_frame(&mut self, now: Instant) -> Vec<PassKind> {
        if let Some(feed) = &self.feed {
            let drained = feed.drain();
            self.extend(drained.spans);
            let missed = drained.generation.wrapping_sub(self.feed_generation);
            self.feed_generation = drained.generation;
            if missed > 0 && drained.connected == self.connected {
                // The producer flipped and flipped back since the last drain.
                self.set_connected(!drained.connected);
            }
            self.set_connected(drained.connected);
        }

        let mut ran = Vec::new();
        for (token, kind) in self.clock.begin_frame() {
            match kind {
                PassKind::Overlay if self.overlay_pass.claim(token) => {
                    self.run_overlay(now);
                    self.overlay_pass.reschedule(&mut self.clock);
                    ran.push(kind);
                }
                PassKind::Data if self.data_pass.claim(token) => {
                    if !self.run_data() && self.mode == FollowMode::Manual {
                        // Nothing to draw yet; try again next frame.
                        self.data_pass.schedule(&mut self.clock);
                    }
                    self.data_pass.reschedule(&mut self.clock);
                    ran.push(kind);
                }
                _ => {}
            }
        }
        ran
    }

    /// Returns whether anything was drawn.
    fn run_data(&mut self) -> bool {
        if self.surface.is_empty() || self.store.is_empty() {
            return false;
        }
        let usable = self.usable_width();
        let filtered: Vec<&Span> = self.store.filtered(self.core_filter).collect();

        let (visible, style) = match self.mode {
            FollowMode::Auto => {
                let live = live_suffix(&filtered, self.config.gap_threshold_multiplier);
                if let Some(bounds) = Bounds::of(live.iter().copied()) {
                    self.follow_viewport.follow(bounds, usable);
                }
                (live, PassStyle::live(&self.config))
            }
            FollowMode::Manual => {
                if self.manual_viewport.is_none() {
                    if let Some(bounds) = Bounds::of(filtered.iter().copied()) {
                        let mut viewport = Viewport::from_config(&self.config);
                        viewport.initialize_from_bounds(bounds, usable);
                        self.manual_viewport = Some(viewport);
                    }
                }
                (&filtered[..], PassStyle::manual(&self.config))
            }
        };

        let viewport = match (self.mode, &self.manual_viewport) {
            (FollowMode::Manual, Some(viewport)) => viewport,
            _ => &self.follow_viewport,
        };
        let dataset_start = Bounds::of(filtered.iter().copied())
            .map_or(TraceTime::ZERO, |bounds| bounds.min_start);
        let cores = self.store.cores();
        let layout = self
            .lanes
            .get(&cores, self.core_filter, self.surface.height(), &self.config);

        let frame = DataFrame {
            spans: visible,
            viewport,
            layout,
            size: self.surface.size(),
            style,
            dataset_start,
            config: &self.config,
        };
        render::build_data_layer(&frame, &mut self.data_layer, &mut self.index);
        true
    }

    fn run_overlay(&mut self, now: Instant) {
        let cores = self.store.cores();
        let layout = self
            .lanes
            .get(&cores, self.core_filter, self.surface.height(), &self.config);

        let lanes: Vec<(u32, f32)> = if layout.is_split() {
            layout.lanes().collect()
        } else {
            let shown = match self.core_filter {
                CoreFilter::Core(core) => Some(core),
                CoreFilter::All if cores.len() == 1 => cores.first().copied(),
                CoreFilter::All => None,
            };
            shown.map(|core| (core, layout.lane_top(0))).into_iter().collect()
        };
        let dividers: Vec<f32> = layout.dividers().collect();

        let elapsed = match self.mode {
            FollowMode::Auto if self.connected => {
                self.record_start.map(|start| now.saturating_duration_since(start))
            }
            _ => None,
        };
        let hint = (self.mode == FollowMode::Manual).then_some(self.hint.as_str());
        let highlight = self.inspected.as_ref().and_then(|span| {
            self.index
                .rect_of(span.id)
                .map(|rect| (rect, colorhash::span_color(&span.name, span.depth)))
        });

        render::build_overlay(
            &OverlayFrame {
                size: self.surface.size(),
                lanes: &lanes,
                dividers: &dividers,
                elapsed,
                hint,
                highlight,
            },
            &mut self.overlay_layer,
        );
    }

    /// Allocates the surface, handles input, runs due passes and composites
    /// both layers.
    pub fn show(&mut self, ui: &mut egui::Ui) -> egui::Response {
        let size = vec2(
            ui.available_width(),
            ui.available_height().max(self.config.min_height),
        );
        let (rect, response) = ui.allocate_exact_size(size, Sense::hover());
        self.resize(rect.size(), ui.ctx().pixels_per_point());

        if !ui.ctx().wants_keyboard_input() {
            let commands = ui.input(|i| self.keymap.commands(&i.events));
            for command in commands {
                self.apply(command);
            }
        }

        let pointer = response.hover_pos().map(|pos| pos - rect.min.to_vec2());
        if pointer != self.pointer {
            self.pointer_moved(pointer);
        }

        self.run_frame(Instant::now());

        let origin = rect.min.to_vec2();
        self.data_layer.paint(&ui.painter_at(rect), origin);
        let overlay = ui
            .ctx()
            .layer_painter(LayerId::new(Order::Foreground, ui.id().with("flame_overlay")))
            .with_clip_rect(rect);
        self.overlay_layer.paint(&overlay, origin);

        if self.clock.has_pending() {
            ui.ctx().request_repaint();
        }
        response
    }
}

impl Drop for FlameGraph {
    fn drop(&mut self) {
        if self.surface.is_attached() {
            self.teardown();
        }
    }
}
