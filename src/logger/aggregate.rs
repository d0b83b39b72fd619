use chrono::{DateTime, Duration, Utc};

/// Running sum/count over a fixed wall-clock window.
#[derive(Debug, Clone)]
pub struct AggregateWindow {
    length: Duration,
    sum: f64,
    count: u64,
    window_start: DateTime<Utc>,
}

impl AggregateWindow {
    pub fn new(length: Duration, now: DateTime<Utc>) -> Self {
        Self {
            length,
            sum: 0.0,
            count: 0,
            window_start: now,
        }
    }

    pub fn hourly(now: DateTime<Utc>) -> Self {
        Self::new(Duration::hours(1), now)
    }

    pub fn daily(now: DateTime<Utc>) -> Self {
        Self::new(Duration::days(1), now)
    }

    pub fn observe(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now - self.window_start >= self.length
    }

    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    /// Returns the window's average (if it saw any reading) and starts a new
    /// window at `now`.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Option<f64> {
        let average = self.average();
        self.sum = 0.0;
        self.count = 0;
        self.window_start = now;
        average
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }
}
