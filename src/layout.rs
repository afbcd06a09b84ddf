//! Vertical placement: one lane per core in the combined view.

use std::fmt;

use crate::config::TimelineConfig;

/// Which cores the surface shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CoreFilter {
    #[default]
    All,
    Core(u32),
}

impl CoreFilter {
    pub fn admits(self, core_id: u32) -> bool {
        match self {
            CoreFilter::All => true,
            CoreFilter::Core(core) => core == core_id,
        }
    }

    /// Selector entries for the cores present: each core, then the combined
    /// view when there is more than one.
    pub fn options(cores: &[u32]) -> Vec<CoreFilter> {
        let mut options: Vec<CoreFilter> = cores.iter().copied().map(CoreFilter::Core).collect();
        if cores.len() > 1 {
            options.push(CoreFilter::All);
        }
        options
    }
}

impl fmt::Display for CoreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreFilter::All => f.write_str("Both"),
            CoreFilter::Core(core) => write!(f, "Core {core}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaneLayout {
    /// Core id per lane, ascending. Empty when the surface is not split.
    lanes: Vec<u32>,
    surface_height: f32,
    top_offset: f32,
    row_height: f32,
}

impl LaneLayout {
    pub fn compute(
        cores: &[u32],
        filter: CoreFilter,
        surface_height: f32,
        config: &TimelineConfig,
    ) -> Self {
        let split = filter == CoreFilter::All && cores.len() > 1;
        let (lanes, row_height) = if split {
            let mut lanes = cores.to_vec();
            lanes.sort_unstable();
            lanes.dedup();
            (lanes, config.row_height / 2.0)
        } else {
            (Vec::new(), config.row_height)
        };
        Self {
            lanes,
            surface_height,
            top_offset: config.top_offset,
            row_height,
        }
    }

    pub fn is_split(&self) -> bool {
        self.lanes.len() > 1
    }

    pub fn row_height(&self) -> f32 {
        self.row_height
    }

    /// Height of a span rectangle, leaving a 2px gap between rows.
    pub fn rect_height(&self) -> f32 {
        (self.row_height - 2.0).max(1.0)
    }

    fn lane_count(&self) -> usize {
        self.lanes.len().max(1)
    }

    pub fn lane_top(&self, lane: usize) -> f32 {
        self.top_offset + lane as f32 * self.surface_height / self.lane_count() as f32
    }

    /// `None` for a core that has no lane in a split layout.
    pub fn lane_of(&self, core_id: u32) -> Option<usize> {
        if !self.is_split() {
            return Some(0);
        }
        self.lanes.binary_search(&core_id).ok()
    }

    /// Top edge of a span rectangle.
    pub fn span_y(&self, core_id: u32, depth: u32) -> Option<f32> {
        let lane = self.lane_of(core_id)?;
        Some(self.lane_top(lane) + depth as f32 * self.row_height)
    }

    /// `(core, top)` per lane, for labels.
    pub fn lanes(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.lanes
            .iter()
            .enumerate()
            .map(|(lane, core)| (*core, self.lane_top(lane)))
    }

    /// Y of the boundary between consecutive lanes.
    pub fn dividers(&self) -> impl Iterator<Item = f32> + '_ {
        let n = self.lanes.len();
        (1..n.max(1)).map(move |lane| lane as f32 * self.surface_height / n as f32)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct LaneKey {
    cores: Vec<u32>,
    filter: CoreFilter,
    surface_height: f32,
}

/// Recomputes the layout only when its inputs change.
#[derive(Debug, Default)]
pub struct LaneCache {
    cached: Option<(LaneKey, LaneLayout)>,
}

impl LaneCache {
    pub fn get(
        &mut self,
        cores: &[u32],
        filter: CoreFilter,
        surface_height: f32,
        config: &TimelineConfig,
    ) -> &LaneLayout {
        let key = LaneKey {
            cores: cores.to_vec(),
            filter,
            surface_height,
        };
        if !matches!(&self.cached, Some((cached, _)) if *cached == key) {
            self.cached = None;
        }
        let (_, layout) = self.cached.get_or_insert_with(|| {
            let layout = LaneLayout::compute(cores, filter, surface_height, config);
            (key, layout)
        });
        layout
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }
}
