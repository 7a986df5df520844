use std::time::Duration;

/// Default pause between two questions.
pub const DEFAULT_TRANSITION_DELAY: Duration = Duration::from_millis(1500);

/// Default number of timer ticks an action error stays visible.
pub const DEFAULT_ERROR_CLEAR_SECS: u32 = 3;

/// Tunables for the session engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub transition_delay: Duration,
    pub error_clear_secs: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transition_delay: DEFAULT_TRANSITION_DELAY,
            error_clear_secs: DEFAULT_ERROR_CLEAR_SECS,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn with_transition_delay(mut self, delay: Duration) -> Self {
        self.transition_delay = delay;
        self
    }

    /// Errors need at least one tick to clear.
    #[must_use]
    pub fn with_error_clear_secs(mut self, secs: u32) -> Self {
        self.error_clear_secs = secs.max(1);
        self
    }
}
