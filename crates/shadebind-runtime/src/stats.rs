use std::ops::AddAssign;

/// Per-frame device call counters, reset by the draw loop each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Uniform writes (including texture binds).
    pub shader_calls: usize,
    /// Render-state setter calls.
    pub state_calls: usize,
    pub draws: usize,
}

impl FrameStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record_draw(&mut self) {
        self.draws += 1;
    }
}

impl AddAssign for FrameStats {
    fn add_assign(&mut self, rhs: Self) {
        self.shader_calls += rhs.shader_calls;
        self.state_calls += rhs.state_calls;
        self.draws += rhs.draws;
    }
}
