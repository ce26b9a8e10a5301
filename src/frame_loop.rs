//! Scheduling state for the per-frame tick.
//!
//! The host (winit's `RedrawRequested`) asks the loop whether it is running
//! before each tick. Stopping is synchronous and permanent.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopState {
    #[default]
    Stopped,
    Running,
}

/// Running/stopped state machine, created stopped.
///
/// The owner holds the loop itself as its scheduling handle: `start` begins
/// ticking, `stop` ends it before the next tick can run. Once stopped the loop
/// never runs again.
#[derive(Debug, Default)]
pub struct FrameLoop {
    state: LoopState,
    frames: u64,
    retired: bool,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to `Running`. Returns false if already running or retired.
    pub fn start(&mut self) -> bool {
        if self.retired || self.state == LoopState::Running {
            return false;
        }
        self.state = LoopState::Running;
        true
    }

    pub fn stop(&mut self) {
        if self.state == LoopState::Running {
            tracing::debug!(frames = self.frames, "frame loop stopped");
        }
        self.state = LoopState::Stopped;
        self.retired = true;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Count one tick. Returns false (and counts nothing) when stopped.
    pub fn advance(&mut self) -> bool {
        if !self.is_running() {
            return false;
        }
        self.frames += 1;
        true
    }

    /// Ticks run since `start`.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
