//! Debounce gate coalescing bursts of activity into one reporting window.

use std::time::{Duration, Instant};

pub const DEFAULT_GATE_TIMEOUT_MS: u64 = 3000;

/// Opens on every edge and stays open while anything is held; once all
/// keys are up it closes only after the quiet timeout elapses since the
/// last activity. This keeps a burst of typing inside one window and
/// stops near-empty frames from flooding the sink once input goes idle.
#[derive(Debug)]
pub struct Gate {
    is_open: bool,
    last_activity: Option<Instant>,
    timeout: Duration,
}

impl Gate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            is_open: false,
            last_activity: None,
            timeout,
        }
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Called on every edge: opens the window and resets the quiet clock.
    pub fn open(&mut self, now: Instant) {
        self.is_open = true;
        self.last_activity = Some(now);
    }

    /// Re-evaluate the window. Held keys never go stale; with nothing
    /// held the window closes once the quiet timeout has elapsed.
    pub fn update(&mut self, now: Instant, any_key_held: bool) -> bool {
        if any_key_held {
            self.is_open = true;
            self.last_activity = Some(now);
        } else if self.is_open {
            let quiet = self
                .last_activity
                .map(|t| now.saturating_duration_since(t))
                .unwrap_or(self.timeout);
            if quiet >= self.timeout {
                self.is_open = false;
            }
        }
        self.is_open
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn reset(&mut self) {
        self.is_open = false;
        self.last_activity = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn starts_closed() {
        let mut gate = Gate::new(Duration::from_millis(500));
        assert!(!gate.is_open());
        assert!(!gate.update(Instant::now(), false));
    }

    #[test]
    fn stays_open_for_the_quiet_timeout_after_the_last_edge() {
        // Press at t=0, release at t=10ms, timeout 500ms: still open at
        // 400ms, closed by 510ms.
        let base = Instant::now();
        let mut gate = Gate::new(Duration::from_millis(500));

        gate.open(base);
        gate.update(ms(base, 5), true);
        gate.open(ms(base, 10));

        assert!(gate.update(ms(base, 400), false));
        assert!(!gate.update(ms(base, 510), false));
    }

    #[test]
    fn held_keys_keep_the_gate_open_indefinitely() {
        let base = Instant::now();
        let mut gate = Gate::new(Duration::from_millis(100));

        gate.open(base);
        assert!(gate.update(ms(base, 10_000), true));
        // The activity clock was refreshed by the held check.
        assert!(gate.update(ms(base, 10_050), false));
        assert!(!gate.update(ms(base, 10_100), false));
    }

    #[test]
    fn closed_gate_stays_closed_without_activity() {
        let base = Instant::now();
        let mut gate = Gate::new(Duration::from_millis(100));

        gate.open(base);
        assert!(!gate.update(ms(base, 200), false));
        assert!(!gate.update(ms(base, 300), false));
    }

    #[test]
    fn reopens_on_a_new_edge() {
        let base = Instant::now();
        let mut gate = Gate::new(Duration::from_millis(100));

        gate.open(base);
        gate.update(ms(base, 200), false);
        assert!(!gate.is_open());

        gate.open(ms(base, 250));
        assert!(gate.is_open());
    }
}
