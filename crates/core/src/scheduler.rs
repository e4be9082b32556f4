//! Explicit schedulers driven by caller-supplied time
//!
//! Nothing here owns a timer. Callers pass `now` in, ask whether work is due,
//! and may force pending work with `flush`.

/// Coalesces bursts of requests into a single run
///
/// A run becomes due once requests have been quiet for `quiet_ms`, or once
/// `max_latency_ms` has passed since the first pending request, whichever
/// comes first. Sustained load therefore cannot postpone a run forever.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet_ms: i64,
    max_latency_ms: i64,
    first_request: Option<i64>,
    last_request: Option<i64>,
    runs: u64,
}

impl Debouncer {
    pub fn new(quiet_ms: u64, max_latency_ms: u64) -> Self {
        let quiet_ms = quiet_ms as i64;
        Self {
            quiet_ms,
            max_latency_ms: (max_latency_ms as i64).max(quiet_ms),
            first_request: None,
            last_request: None,
            runs: 0,
        }
    }

    /// Record a request at `now`
    pub fn request(&mut self, now: i64) {
        if self.first_request.is_none() {
            self.first_request = Some(now);
        }
        self.last_request = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.first_request.is_some()
    }

    /// Time at which the pending run becomes due
    pub fn due_at(&self) -> Option<i64> {
        match (self.first_request, self.last_request) {
            (Some(first), Some(last)) => {
                Some((last + self.quiet_ms).min(first + self.max_latency_ms))
            }
            _ => None,
        }
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.due_at().map_or(false, |due| now >= due)
    }

    /// Consume the pending run if it is due
    pub fn take_if_due(&mut self, now: i64) -> bool {
        if self.is_due(now) {
            self.reset();
            true
        } else {
            false
        }
    }

    /// Consume the pending run regardless of timing
    pub fn flush(&mut self) -> bool {
        let pending = self.is_pending();
        if pending {
            self.reset();
        }
        pending
    }

    /// Number of runs handed out so far
    pub fn runs(&self) -> u64 {
        self.runs
    }

    fn reset(&mut self) {
        self.first_request = None;
        self.last_request = None;
        self.runs += 1;
    }
}

/// Fixed-cadence task such as history pruning
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    interval_ms: i64,
    last_run: Option<i64>,
}

impl PeriodicTask {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1) as i64,
            last_run: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms as u64
    }

    /// Returns true and records the run when the interval has elapsed
    ///
    /// The first call only arms the task.
    pub fn poll(&mut self, now: i64) -> bool {
        match self.last_run {
            None => {
                self.last_run = Some(now);
                false
            }
            Some(last) if now - last >= self.interval_ms => {
                self.last_run = Some(now);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_period_coalesces() {
        let mut debouncer = Debouncer::new(250, 1_000);
        debouncer.request(0);
        debouncer.request(100);
        debouncer.request(200);
        assert!(!debouncer.is_due(400));
        assert!(debouncer.take_if_due(450));
        assert!(!debouncer.is_pending());
        assert_eq!(debouncer.runs(), 1);
    }

    #[test]
    fn test_max_latency_under_sustained_load() {
        let mut debouncer = Debouncer::new(250, 1_000);
        let mut fired_at = None;
        for now in (0..3_000).step_by(100) {
            debouncer.request(now);
            if debouncer.take_if_due(now) {
                fired_at = Some(now);
                break;
            }
        }
        assert_eq!(fired_at, Some(1_000));
    }

    #[test]
    fn test_flush() {
        let mut debouncer = Debouncer::new(250, 1_000);
        assert!(!debouncer.flush());
        debouncer.request(0);
        assert!(debouncer.flush());
        assert!(!debouncer.is_due(10_000));
    }

    #[test]
    fn test_periodic_task() {
        let mut task = PeriodicTask::new(1_000);
        assert!(!task.poll(0));
        assert!(!task.poll(999));
        assert!(task.poll(1_000));
        assert!(!task.poll(1_500));
        assert!(task.poll(2_100));
    }
}
