// Rest countdown and the tick handle shared with the workout clock

/// Handle for a periodic one-second tick registered with the host.
///
/// Restarting always cancels the previous registration first, so at most one
/// tick source is alive. The generation lets a host drop callbacks that were
/// scheduled by an earlier registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interval {
    generation: u64,
    running: bool,
}

impl Interval {
    pub fn restart(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        self.running = true;
        self.generation
    }

    pub fn cancel(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestEvent {
    Tick { remaining: u32 },
    /// The countdown reached zero. Emitted once per countdown.
    Finished,
}

/// Rest countdown driven by host ticks and anchored to a wall-clock deadline.
///
/// The host delivers one [`RestTimer::tick`] per second while in the
/// foreground. Going to the background cancels the tick and arms a single
/// fallback deadline; coming back disarms it and recomputes the remaining
/// time from the deadline, never from the number of ticks seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestTimer {
    remaining: u32,
    due_at_ms: Option<i64>,
    ticker: Interval,
    fallback_at_ms: Option<i64>,
    active: bool,
}

impl RestTimer {
    pub fn new(default_secs: u32) -> Self {
        Self {
            remaining: default_secs,
            due_at_ms: None,
            ticker: Interval::default(),
            fallback_at_ms: None,
            active: false,
        }
    }

    pub fn start(&mut self, now_ms: i64, seconds: u32) {
        self.fallback_at_ms = None;
        self.remaining = seconds;
        self.due_at_ms = Some(now_ms + i64::from(seconds) * 1000);
        self.active = true;
        self.ticker.restart();
        log::debug!("Rest timer started for {seconds}s");
    }

    pub fn stop(&mut self) {
        self.ticker.cancel();
        self.fallback_at_ms = None;
        self.due_at_ms = None;
        self.active = false;
    }

    /// Stop and show `default_secs` again.
    pub fn reset(&mut self, default_secs: u32) {
        self.stop();
        self.remaining = default_secs;
    }

    /// Add or remove time from the running countdown, never below zero.
    pub fn adjust(&mut self, delta_secs: i32) {
        let next = (i64::from(self.remaining) + i64::from(delta_secs))
            .clamp(0, i64::from(u32::MAX));
        let applied = next - i64::from(self.remaining);
        self.remaining = next as u32;
        if let Some(due) = self.due_at_ms.as_mut() {
            *due += applied * 1000;
        }
        if let Some(at) = self.fallback_at_ms.as_mut() {
            *at += applied * 1000;
        }
    }

    /// One visible second elapsed.
    pub fn tick(&mut self) -> Option<RestEvent> {
        if !self.ticker.is_running() {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.finish();
            return Some(RestEvent::Finished);
        }
        Some(RestEvent::Tick {
            remaining: self.remaining,
        })
    }

    /// Host lost the foreground: swap the tick for a single deadline.
    pub fn on_background(&mut self, now_ms: i64) {
        if !self.ticker.is_running() {
            return;
        }
        self.ticker.cancel();
        let due = now_ms + i64::from(self.remaining) * 1000;
        self.due_at_ms = Some(due);
        self.fallback_at_ms = Some(due);
    }

    /// Deferred deadline callback; fires at most once.
    pub fn fire_deadline(&mut self, now_ms: i64) -> Option<RestEvent> {
        match self.fallback_at_ms {
            Some(at) if now_ms >= at => {
                self.remaining = 0;
                self.finish();
                Some(RestEvent::Finished)
            }
            _ => None,
        }
    }

    /// Host regained the foreground.
    pub fn on_foreground(&mut self, now_ms: i64) -> Option<RestEvent> {
        let due = self.due_at_ms?;
        self.fallback_at_ms = None;
        let left_ms = (due - now_ms).max(0);
        let remaining = ((left_ms + 999) / 1000) as u32;
        if remaining > 0 {
            self.start(now_ms, remaining);
            Some(RestEvent::Tick { remaining })
        } else {
            self.remaining = 0;
            self.finish();
            Some(RestEvent::Finished)
        }
    }

    fn finish(&mut self) {
        self.ticker.cancel();
        self.fallback_at_ms = None;
        self.due_at_ms = None;
        self.active = false;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn due_at_ms(&self) -> Option<i64> {
        self.due_at_ms
    }

    pub fn deadline_armed(&self) -> bool {
        self.fallback_at_ms.is_some()
    }

    pub fn ticker(&self) -> &Interval {
        &self.ticker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_restart_replaces_previous_registration() {
        let mut i = Interval::default();
        let first = i.restart();
        let second = i.restart();
        assert_ne!(first, second);
        assert_eq!(i.generation(), second);
        assert!(i.is_running());
        i.cancel();
        assert!(!i.is_running());
        assert_eq!(i.generation(), second);
    }

    #[test]
    fn countdown_finishes_once() {
        let mut t = RestTimer::new(90);
        t.start(0, 2);
        assert!(t.is_active());
        assert_eq!(t.tick(), Some(RestEvent::Tick { remaining: 1 }));
        assert_eq!(t.tick(), Some(RestEvent::Finished));
        assert!(!t.is_active());
        assert_eq!(t.tick(), None);
    }

    #[test]
    fn stop_cancels_everything() {
        let mut t = RestTimer::new(90);
        t.start(0, 60);
        t.on_background(1_000);
        t.stop();
        assert!(!t.is_active());
        assert!(t.due_at_ms().is_none());
        assert!(!t.deadline_armed());
        assert_eq!(t.fire_deadline(120_000), None);
        assert_eq!(t.tick(), None);
    }

    #[test]
    fn background_arms_deadline_from_remaining() {
        let mut t = RestTimer::new(90);
        t.start(0, 60);
        for _ in 0..10 {
            t.tick();
        }
        t.on_background(10_000);
        assert!(!t.ticker().is_running());
        assert_eq!(t.due_at_ms(), Some(60_000));
        assert_eq!(t.tick(), None);
        assert_eq!(t.fire_deadline(59_999), None);
        assert_eq!(t.fire_deadline(60_000), Some(RestEvent::Finished));
        // the deadline has fired; coming back must not alert again
        assert_eq!(t.on_foreground(70_000), None);
    }

    #[test]
    fn foreground_recomputes_from_deadline() {
        let mut t = RestTimer::new(90);
        t.start(0, 60);
        t.on_background(5_000);
        // the tick count is stale (still 60) but 40.5 s passed in background
        assert_eq!(
            t.on_foreground(45_500),
            Some(RestEvent::Tick { remaining: 15 })
        );
        assert!(!t.deadline_armed());
        assert!(t.ticker().is_running());
        assert_eq!(t.remaining(), 15);
    }

    #[test]
    fn foreground_after_missed_deadline_alerts_once() {
        let mut t = RestTimer::new(90);
        t.start(0, 30);
        t.on_background(0);
        assert_eq!(t.on_foreground(31_000), Some(RestEvent::Finished));
        assert_eq!(t.fire_deadline(40_000), None);
        assert_eq!(t.on_foreground(41_000), None);
    }

    #[test]
    fn adjust_never_goes_negative() {
        let mut t = RestTimer::new(90);
        t.start(0, 15);
        t.adjust(-10);
        assert_eq!(t.remaining(), 5);
        assert_eq!(t.due_at_ms(), Some(5_000));
        t.adjust(-10);
        assert_eq!(t.remaining(), 0);
        t.adjust(10);
        assert_eq!(t.remaining(), 10);
    }

    #[test]
    fn adjust_saturates_at_u32_max() {
        let mut t = RestTimer::new(90);
        t.start(0, u32::MAX - 5);
        t.adjust(100);
        assert_eq!(t.remaining(), u32::MAX);
        assert_eq!(t.due_at_ms(), Some(i64::from(u32::MAX) * 1000));
    }

    #[test]
    fn reset_restores_default() {
        let mut t = RestTimer::new(90);
        t.start(0, 30);
        t.reset(90);
        assert_eq!(t.remaining(), 90);
        assert!(!t.is_active());
    }
}
