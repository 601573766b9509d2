//! Input handling.
//!
//! Sampling happens on the per-frame loop, which runs faster than (and
//! independently of) the network tick. The jump key is buffered for a short
//! window so a press between two ticks is not lost; building a snapshot
//! consumes the buffered jump.

use arena_shared::net::InputSnapshot;

/// How long a jump press stays valid (seconds).
pub const JUMP_BUFFER_TIME: f32 = 0.2;

/// User input state at a moment in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput {
    /// Raw horizontal axis (strafe).
    pub horizontal: f32,
    /// Raw vertical axis (forward).
    pub vertical: f32,
    /// Whether the jump key is currently held.
    pub jump_held: bool,
}

/// Short-lived jump request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpBuffer {
    pending: bool,
    remaining: f32,
    window: f32,
}

impl JumpBuffer {
    pub fn new(window: f32) -> Self {
        Self {
            pending: false,
            remaining: 0.0,
            window,
        }
    }

    /// Arms the buffer on a jump press.
    pub fn press(&mut self) {
        self.pending = true;
        self.remaining = self.window;
    }

    /// Decays the window by one frame's elapsed time.
    pub fn update(&mut self, dt_sec: f32) {
        if self.remaining > 0.0 {
            self.remaining -= dt_sec;
            if self.remaining <= 0.0 {
                self.remaining = 0.0;
                self.pending = false;
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Returns the pending flag and clears it.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

impl Default for JumpBuffer {
    fn default() -> Self {
        Self::new(JUMP_BUFFER_TIME)
    }
}

/// Samples frame input and produces per-tick snapshots.
#[derive(Debug, Clone)]
pub struct InputSampler {
    jump: JumpBuffer,
    jump_was_held: bool,
    horizontal: f32,
    vertical: f32,
}

impl Default for InputSampler {
    fn default() -> Self {
        Self::new(JUMP_BUFFER_TIME)
    }
}

impl InputSampler {
    pub fn new(jump_window: f32) -> Self {
        Self {
            jump: JumpBuffer::new(jump_window),
            jump_was_held: false,
            horizontal: 0.0,
            vertical: 0.0,
        }
    }

    /// Per-frame update: latches axes, arms the jump buffer on the key-down
    /// edge and decays it.
    pub fn frame(&mut self, input: FrameInput, dt_sec: f32) {
        if input.jump_held && !self.jump_was_held {
            self.jump.press();
        }
        self.jump_was_held = input.jump_held;
        self.horizontal = input.horizontal;
        self.vertical = input.vertical;

        self.jump.update(dt_sec);
    }

    pub fn jump_buffer(&self) -> &JumpBuffer {
        &self.jump
    }

    /// Builds the snapshot for the next tick, consuming the buffered jump.
    ///
    /// The jump is consumed even if the caller never delivers the snapshot.
    pub fn build_snapshot(&mut self) -> InputSnapshot {
        InputSnapshot::new(self.horizontal, self.vertical, self.jump.take())
    }
}
