/// Abstraction over time sources.
/// Implementations: SystemTimeProvider (production), MockTimeProvider (testing).
pub trait TimeProvider {
    /// Current time in seconds from an arbitrary epoch.
    fn now(&self) -> f64;
}

/// System time provider using std::time::Instant.
pub struct SystemTimeProvider {
    start: std::time::Instant,
}

impl SystemTimeProvider {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for SystemTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Mock time provider for deterministic testing. Clones share one clock, so
/// a test can keep a handle to the clock it handed off.
#[derive(Clone)]
pub struct MockTimeProvider {
    current: std::rc::Rc<std::cell::Cell<f64>>,
}

impl MockTimeProvider {
    pub fn new() -> Self {
        Self {
            current: std::rc::Rc::new(std::cell::Cell::new(0.0)),
        }
    }

    pub fn set_time(&self, seconds: f64) {
        self.current.set(seconds);
    }

    pub fn advance(&self, delta_seconds: f64) {
        self.current.set(self.current.get() + delta_seconds);
    }
}

impl Default for MockTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> f64 {
        self.current.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_time_provider_advance() {
        let tp = MockTimeProvider::new();
        assert_eq!(tp.now(), 0.0);
        tp.advance(1.0);
        assert_eq!(tp.now(), 1.0);
        tp.advance(0.5);
        assert_eq!(tp.now(), 1.5);
    }

    #[test]
    fn mock_time_provider_set() {
        let tp = MockTimeProvider::new();
        tp.set_time(5.0);
        assert_eq!(tp.now(), 5.0);
    }

    #[test]
    fn system_time_provider_monotonic() {
        let tp = SystemTimeProvider::new();
        let t1 = tp.now();
        let t2 = tp.now();
        assert!(t2 >= t1);
    }
}
