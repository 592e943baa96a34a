//! Token-bucket admission control for a single tool or prompt.
//!
//! The bucket starts full and refills continuously at `rate` tokens per
//! second up to `burst`. `allow` never waits: it either takes a token or
//! reports denial straight away.

use std::sync::Mutex;
use std::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Debug)]
pub struct RateGate {
    rate: f64,
    burst: f64,
    unlimited: bool,
    bucket: Mutex<Bucket>,
}

impl RateGate {
    /// `rate_per_sec` tokens are added each second, holding at most `burst`.
    pub fn new(rate_per_sec: f64, burst: u32) -> Self {
        let burst = f64::from(burst);
        Self {
            rate: if rate_per_sec.is_finite() {
                rate_per_sec.max(0.0)
            } else {
                0.0
            },
            burst,
            unlimited: false,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            rate: 0.0,
            burst: 0.0,
            unlimited: true,
            bucket: Mutex::new(Bucket {
                tokens: 0.0,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        if self.unlimited {
            return true;
        }

        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        bucket.tokens = (bucket.tokens + elapsed.as_secs_f64() * self.rate).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn burst_of_one_denies_back_to_back_call() {
        let gate = RateGate::new(10.0, 1);
        let now = Instant::now();
        assert!(gate.allow_at(now));
        assert!(!gate.allow_at(now));
    }

    #[test]
    fn refills_after_interval() {
        let gate = RateGate::new(10.0, 1);
        let start = Instant::now();
        assert!(gate.allow_at(start));
        assert!(!gate.allow_at(start + Duration::from_millis(50)));
        assert!(gate.allow_at(start + Duration::from_millis(150)));
    }

    #[test]
    fn refill_is_capped_at_burst() {
        let gate = RateGate::new(100.0, 2);
        let later = Instant::now() + Duration::from_secs(60);
        assert!(gate.allow_at(later));
        assert!(gate.allow_at(later));
        assert!(!gate.allow_at(later));
    }

    #[test]
    fn burst_allows_that_many_at_once() {
        let gate = RateGate::new(1.0, 5);
        let now = Instant::now();
        for _ in 0..5 {
            assert!(gate.allow_at(now));
        }
        assert!(!gate.allow_at(now));
    }

    #[test]
    fn zero_burst_denies_everything() {
        let gate = RateGate::new(1000.0, 0);
        assert!(!gate.allow_at(Instant::now() + Duration::from_secs(10)));
    }

    #[test]
    fn zero_rate_never_refills() {
        let gate = RateGate::new(0.0, 1);
        let now = Instant::now();
        assert!(gate.allow_at(now));
        assert!(!gate.allow_at(now + Duration::from_secs(3600)));
    }

    #[test]
    fn unlimited_always_allows() {
        let gate = RateGate::unlimited();
        for _ in 0..1000 {
            assert!(gate.allow());
        }
    }

    #[test]
    fn concurrent_callers_never_exceed_burst() {
        let gate = Arc::new(RateGate::new(0.0, 50));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || (0..20).filter(|_| gate.allow()).count())
            })
            .collect();

        let granted: usize = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread join"))
            .sum();
        assert_eq!(granted, 50);
    }
}
