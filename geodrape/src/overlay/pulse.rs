use std::time::Duration;

use web_time::Instant;

/// Opacity pulse: a slow sine wave on the overlay's opacity.
///
/// Owns no timer. The host polls it with the current time.
#[derive(Debug, Clone, Copy)]
pub struct Pulse {
    interval: Duration,
    step: f64,
    counter: f64,
    next_due: Option<Instant>,
}

impl Pulse {
    pub fn new(interval: Duration, step: f64) -> Self {
        Self {
            interval,
            step,
            counter: 0.0,
            next_due: None,
        }
    }

    /// Begin ticking; the first tick is due one interval after `now`.
    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Opacity for the current phase, then advance the phase.
    pub fn tick(&mut self) -> f64 {
        let opacity = 0.5 + self.counter.sin() / 2.0;
        self.counter += self.step;
        opacity
    }

    /// Tick if running and due. A host that fell several intervals behind
    /// gets one tick, not a burst.
    pub fn poll(&mut self, now: Instant) -> Option<f64> {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        let mut next = due + self.interval;
        if next <= now {
            next = now + self.interval;
        }
        self.next_due = Some(next);
        Some(self.tick())
    }
}
