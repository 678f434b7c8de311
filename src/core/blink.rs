//! Blink counter: edge-triggered debounce over the blink classifier
//!
//! A single sustained blink spans several frames; counting happens only on
//! the false→true edge. Runs every frame for the whole session lifetime,
//! independent of the challenge phase, so blinks during centering and
//! preparation count too.

/// Stateful blink edge detector
#[derive(Debug, Default)]
pub struct BlinkCounter {
    was_blinking: bool,
    count: u32,
}

impl BlinkCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this frame's blink classification. Returns `true` when a new
    /// blink was counted on this frame.
    pub fn observe(&mut self, blinking: bool) -> bool {
        let counted = blinking && !self.was_blinking;
        if counted {
            self.count += 1;
        }
        self.was_blinking = blinking;
        counted
    }

    /// Blinks counted since the last reset
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Zero both the edge flag and the count
    pub fn reset(&mut self) {
        self.was_blinking = false;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_triggering() {
        let mut counter = BlinkCounter::new();
        let stream = [
            false, false, true, true, true, true, true, false, false, true, true, true, false,
            false,
        ];
        for blinking in stream {
            counter.observe(blinking);
        }
        // Two sustained blinks, not eight frames
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_observe_reports_new_blinks_only() {
        let mut counter = BlinkCounter::new();
        assert!(counter.observe(true));
        assert!(!counter.observe(true));
        assert!(!counter.observe(false));
        assert!(counter.observe(true));
    }

    #[test]
    fn test_reset_clears_flag_and_count() {
        let mut counter = BlinkCounter::new();
        counter.observe(true);
        counter.reset();
        assert_eq!(counter.count(), 0);
        // Flag cleared: a blink right after reset counts again
        assert!(counter.observe(true));
    }
}
