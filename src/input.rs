//! Keyboard navigation.

use egui::{Event, Key};

use crate::config::KeyBindings;
use crate::error::{Result, TimelineError};
use crate::span::Span;
use crate::time::TraceTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NavCommand {
    PanLeft,
    PanRight,
    ZoomIn,
    ZoomOut,
    JumpPrev,
    JumpNext,
    /// Back to auto-follow.
    Follow,
}

impl NavCommand {
    pub fn action(self) -> &'static str {
        match self {
            NavCommand::PanLeft => "pan left",
            NavCommand::PanRight => "pan right",
            NavCommand::ZoomIn => "zoom in",
            NavCommand::ZoomOut => "zoom out",
            NavCommand::JumpPrev => "jump to previous span",
            NavCommand::JumpNext => "jump to next span",
            NavCommand::Follow => "follow",
        }
    }
}

/// Resolved key bindings.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyMap {
    bindings: Vec<(Key, NavCommand)>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            bindings: vec![
                (Key::A, NavCommand::PanLeft),
                (Key::D, NavCommand::PanRight),
                (Key::W, NavCommand::ZoomIn),
                (Key::S, NavCommand::ZoomOut),
                (Key::Q, NavCommand::JumpPrev),
                (Key::E, NavCommand::JumpNext),
                (Key::F, NavCommand::Follow),
            ],
        }
    }
}

impl KeyMap {
    pub fn from_bindings(bindings: &KeyBindings) -> Result<Self> {
        let named = [
            (&bindings.pan_left, NavCommand::PanLeft),
            (&bindings.pan_right, NavCommand::PanRight),
            (&bindings.zoom_in, NavCommand::ZoomIn),
            (&bindings.zoom_out, NavCommand::ZoomOut),
            (&bindings.jump_prev, NavCommand::JumpPrev),
            (&bindings.jump_next, NavCommand::JumpNext),
            (&bindings.follow, NavCommand::Follow),
        ];
        let bindings = named
            .into_iter()
            .map(|(name, command)| {
                Key::from_name(name)
                    .map(|key| (key, command))
                    .ok_or_else(|| TimelineError::UnknownKey {
                        name: name.clone(),
                        action: command.action(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bindings })
    }

    pub fn command_for(&self, key: Key) -> Option<NavCommand> {
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == key)
            .map(|(_, command)| *command)
    }

    pub fn key_for(&self, command: NavCommand) -> Option<Key> {
        self.bindings
            .iter()
            .find(|(_, bound)| *bound == command)
            .map(|(key, _)| *key)
    }

    /// Overlay hint, e.g. `WASD to Move • Q/E to Jump Trace • F to Follow`.
    pub fn hint(&self) -> String {
        let name = |command| self.key_for(command).map_or("?", |key: Key| key.name());
        format!(
            "{}{}{}{} to Move • {}/{} to Jump Trace • {} to Follow",
            name(NavCommand::ZoomIn),
            name(NavCommand::PanLeft),
            name(NavCommand::ZoomOut),
            name(NavCommand::PanRight),
            name(NavCommand::JumpPrev),
            name(NavCommand::JumpNext),
            name(NavCommand::Follow),
        )
    }

    /// Discrete, unmodified key presses mapped to commands. Key repeats are
    /// dropped.
    pub fn commands(&self, events: &[Event]) -> Vec<NavCommand> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    modifiers,
                    ..
                } if !(modifiers.ctrl || modifiers.command || modifiers.alt) => {
                    self.command_for(*key)
                }
                _ => None,
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpDirection {
    Previous,
    Next,
}

/// Start of the span to jump to from `center`.
///
/// Walks the sequence backward (previous) or forward (next) and stops at the
/// first span starting strictly before or after `center`. On start-ordered
/// input that is the nearest one.
pub fn jump_target<'a, I>(spans: I, center: TraceTime, direction: JumpDirection) -> Option<TraceTime>
where
    I: DoubleEndedIterator<Item = &'a Span>,
{
    match direction {
        JumpDirection::Previous => spans
            .rev()
            .find(|span| span.start_time < center)
            .map(|span| span.start_time),
        JumpDirection::Next => spans
            .into_iter()
            .find(|span| span.start_time > center)
            .map(|span| span.start_time),
    }
}
