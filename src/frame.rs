//! Frame scheduling with cancellable tokens.
//!
//! [`FrameClock`] is the once-per-displayed-frame callback queue: a request
//! fires on the next [`FrameClock::begin_frame`] unless its token was cancelled
//! first. A [`RenderPass`] keeps at most one token in flight and re-requests
//! after each run while it is running.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Elapsed-time readout, lane labels, key hints.
    Overlay,
    /// Background, spans, axis and the hit-test index.
    Data,
}

impl PassKind {
    pub fn name(self) -> &'static str {
        match self {
            PassKind::Overlay => "overlay",
            PassKind::Data => "data",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameToken(u64);

#[derive(Debug, Default)]
pub struct FrameClock {
    next_token: u64,
    frame: u64,
    pending: Vec<(FrameToken, PassKind)>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `kind` for the next frame.
    pub fn request(&mut self, kind: PassKind) -> FrameToken {
        self.next_token += 1;
        let token = FrameToken(self.next_token);
        self.pending.push((token, kind));
        token
    }

    /// Returns whether the token was still pending. A cancelled token never
    /// fires.
    pub fn cancel(&mut self, token: FrameToken) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != token);
        self.pending.len() != before
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Advances to the next frame and hands out everything that was due.
    pub fn begin_frame(&mut self) -> Vec<(FrameToken, PassKind)> {
        self.frame += 1;
        std::mem::take(&mut self.pending)
    }

    pub fn frame_number(&self) -> u64 {
        self.frame
    }
}

/// One self-rescheduling render loop.
#[derive(Debug)]
pub struct RenderPass {
    kind: PassKind,
    token: Option<FrameToken>,
    running: bool,
}

impl RenderPass {
    pub fn new(kind: PassKind) -> Self {
        Self {
            kind,
            token: None,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Starts the loop. A no-op if it is already running.
    pub fn start(&mut self, clock: &mut FrameClock) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.schedule(clock);
        log::debug!("{} pass started", self.kind);
        true
    }

    /// Stops the loop and cancels its pending frame.
    pub fn stop(&mut self, clock: &mut FrameClock) {
        if let Some(token) = self.token.take() {
            clock.cancel(token);
        }
        if self.running {
            log::debug!("{} pass stopped", self.kind);
        }
        self.running = false;
    }

    /// Requests a single run without starting the loop.
    pub fn schedule(&mut self, clock: &mut FrameClock) {
        if self.token.is_none() {
            self.token = Some(clock.request(self.kind));
        }
    }

    /// Claims a due token. Returns whether it belonged to this pass.
    pub fn claim(&mut self, token: FrameToken) -> bool {
        if self.token == Some(token) {
            self.token = None;
            true
        } else {
            false
        }
    }

    /// Called after the pass ran.
    pub fn reschedule(&mut self, clock: &mut FrameClock) {
        if self.running {
            self.schedule(clock);
        }
    }
}
