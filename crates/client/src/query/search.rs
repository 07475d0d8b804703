use std::time::{Duration, Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Search box state: the raw input and the debounced value used in queries.
///
/// Time is passed in explicitly so the owner decides what drives it (a UI
/// tick, a tokio timer, a test).
#[derive(Debug, Clone)]
pub struct SearchInput {
    raw: String,
    debounced: String,
    delay: Duration,
    last_input: Option<Instant>,
}

impl Default for SearchInput {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SearchInput {
    pub fn new(delay: Duration) -> Self {
        Self {
            raw: String::new(),
            debounced: String::new(),
            delay,
            last_input: None,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn debounced(&self) -> &str {
        &self.debounced
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a keystroke. Restarts the debounce window.
    pub fn input(&mut self, text: impl Into<String>, now: Instant) {
        self.raw = text.into();
        self.last_input = Some(now);
    }

    /// When the pending input settles, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_input.map(|at| at + self.delay)
    }

    /// Settle pending input once the window has elapsed.
    ///
    /// Returns the new debounced value only when it differs from the
    /// previous one, so the caller issues at most one request per pause.
    pub fn poll(&mut self, now: Instant) -> Option<&str> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.last_input = None;

        let trimmed = self.raw.trim();
        if trimmed == self.debounced {
            return None;
        }
        self.debounced = trimmed.to_string();
        Some(&self.debounced)
    }

    /// Reset both values immediately, without waiting for the delay.
    pub fn clear(&mut self) {
        self.raw.clear();
        self.debounced.clear();
        self.last_input = None;
    }
}
