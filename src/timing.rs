//! Tick-driven timing helpers for the UI loop

use std::time::{Duration, Instant};

/// Value that only settles once it has stopped changing for `delay`
#[derive(Debug, Clone)]
pub struct Debounced<T> {
    settled: T,
    pending: Option<(T, Instant)>,
    delay: Duration,
}

impl<T: Clone + PartialEq> Debounced<T> {
    pub fn new(value: T, delay: Duration) -> Self {
        Self {
            settled: value,
            pending: None,
            delay,
        }
    }

    /// Record a new raw value; each call restarts the delay
    pub fn set(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Latest raw value, settled or not
    pub fn current(&self) -> &T {
        self.pending.as_ref().map(|(v, _)| v).unwrap_or(&self.settled)
    }

    pub fn settled(&self) -> &T {
        &self.settled
    }

    /// Promote the pending value once the delay has passed. Returns true if
    /// the settled value changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let ready = matches!(&self.pending, Some((_, at)) if now.duration_since(*at) >= self.delay);
        if !ready {
            return false;
        }
        match self.pending.take() {
            Some((value, _)) if value != self.settled => {
                self.settled = value;
                true
            }
            _ => false,
        }
    }
}

/// Fixed-period timer polled from the tick. A `None` period never fires.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Option<Duration>,
    last: Instant,
}

impl Interval {
    pub fn new(period: Option<Duration>, now: Instant) -> Self {
        Self { period, last: now }
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn set_period(&mut self, period: Option<Duration>, now: Instant) {
        self.period = period;
        self.last = now;
    }

    /// True at most once per period
    pub fn due(&mut self, now: Instant) -> bool {
        match self.period {
            Some(period) if now.duration_since(self.last) >= period => {
                self.last = now;
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
    fn test_debounce_settles_after_quiet_period() {
        let start = Instant::now();
        let mut query = Debounced::new(String::new(), Duration::from_millis(300));

        query.set("e".to_string(), start);
        query.set("et".to_string(), start + Duration::from_millis(100));
        query.set("eth".to_string(), start + Duration::from_millis(200));
        assert_eq!(query.current(), "eth");

        assert!(!query.poll(start + Duration::from_millis(400)));
        assert_eq!(query.settled(), "");

        assert!(query.poll(start + Duration::from_millis(500)));
        assert_eq!(query.settled(), "eth");
        assert!(!query.poll(start + Duration::from_secs(5)));
    }

    #[test]
    fn test_debounce_same_value_is_not_a_change() {
        let start = Instant::now();
        let mut value = Debounced::new(1, Duration::from_millis(10));
        value.set(1, start);
        assert!(!value.poll(start + Duration::from_millis(20)));
    }

    #[test]
    fn test_interval_fires_once_per_period() {
        let start = Instant::now();
        let mut interval = Interval::new(Some(Duration::from_secs(30)), start);

        assert!(!interval.due(start + Duration::from_secs(29)));
        assert!(interval.due(start + Duration::from_secs(30)));
        assert!(!interval.due(start + Duration::from_secs(31)));
        assert!(interval.due(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_disabled_interval_never_fires() {
        let start = Instant::now();
        let mut interval = Interval::new(None, start);
        assert!(!interval.due(start + Duration::from_secs(3600)));

        interval.set_period(Some(Duration::from_secs(1)), start);
        assert!(interval.due(start + Duration::from_secs(1)));
    }
}
