//! Live flame-graph timeline for streamed execution-trace spans.
//!
//! Spans arrive from a [`SpanFeed`] (or are pushed directly) and are drawn by
//! a [`FlameGraph`] widget into two layers: a data layer with the span
//! rectangles and the time axis, and an overlay with lane labels, dividers
//! and the elapsed-time readout. The widget either follows the live end of
//! the stream or lets the user navigate with the keyboard.

pub mod config;
pub mod error;
pub mod feed;
pub mod frame;
pub mod graph;
pub mod headless;
pub mod input;
pub mod layout;
pub mod pruning;
pub mod render;
pub mod replay;
pub mod span;
pub mod surface;
pub mod themes;
pub mod time;
pub mod viewport;

pub use egui;

pub use config::{KeyBindings, TimelineConfig};
pub use error::{Result, TimelineError};
pub use feed::SpanFeed;
pub use frame::PassKind;
pub use graph::{FlameGraph, FollowMode};
pub use input::NavCommand;
pub use layout::CoreFilter;
pub use span::{Span, SpanId};
pub use time::{TraceDuration, TraceTime};
pub use viewport::Viewport;
