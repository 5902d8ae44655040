use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::interval;
use crate::clock::{Clock, SystemClock};
use crate::metrics::TRACKED_CLIENTS;

// Rate limit entry - tracks requests per IP/key
#[derive(Debug, Clone, Copy)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_start: Instant,
}

// Outcome of a single rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted,
    // limit is the configured max, retry_after is what is left of the window
    Rejected { limit: u32, retry_after: Duration },
}

impl Decision {
    #[cfg(test)]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted)
    }
}

// Fixed window request counter keyed by client identity.
// A key's window starts on its first request and is reset by the first request after
// it has fully elapsed. Rejected requests are not counted.
pub struct RateLimiter<K> {
    entries: DashMap<K, RateLimitEntry>,
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash,
{
    pub fn new(limit: u32, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: u32, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            limit,
            window,
            clock,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    // Admit or reject one request from `key`. The entry's shard stays locked from
    // lookup to update, so two calls for one key can't both get in under the limit.
    pub fn check(&self, key: K) -> Decision {
        let now = self.clock.now();

        match self.entries.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(RateLimitEntry {
                    count: 1,
                    window_start: now,
                });
                Decision::Admitted
            }
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                let elapsed = now.saturating_duration_since(entry.window_start);

                // window expired..? Reset it
                if elapsed >= self.window {
                    entry.count = 1;
                    entry.window_start = now;
                    return Decision::Admitted;
                }

                // under limit..? Allow
                if entry.count < self.limit {
                    entry.count += 1;
                    return Decision::Admitted;
                }

                Decision::Rejected {
                    limit: self.limit,
                    retry_after: self.window - elapsed,
                }
            }
        }
    }

    // Drop entries whose window has already run out, returns how many went away
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            let live = now.saturating_duration_since(entry.window_start) < self.window;
            if !live {
                removed += 1;
            }
            live
        });

        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn entry(&self, key: &K) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|e| *e)
    }
}

// Expired entry sweeper - runs forever, every `every`
pub async fn expiry_sweeper<K>(limiter: Arc<RateLimiter<K>>, every: Duration)
where
    K: Eq + Hash,
{
    let mut interval = interval(every);
    // first tick fires immediately, nothing to sweep yet
    interval.tick().await;

    tracing::info!("Rate limit sweeper started (interval: {:?})", every);

    loop {
        interval.tick().await;

        let removed = limiter.sweep_expired();
        TRACKED_CLIENTS.set(limiter.tracked_clients() as f64);
        if removed > 0 {
            tracing::debug!(removed, remaining = limiter.tracked_clients(), "Swept expired rate limit entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Barrier;
    use std::thread;

    fn limiter(limit: u32, window_secs: u64) -> (RateLimiter<&'static str>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(limit, Duration::from_secs(window_secs), clock.clone());
        (limiter, clock)
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let (limiter, _clock) = limiter(3, 10);

        let decisions: Vec<Decision> = (0..4).map(|_| limiter.check("10.0.0.1")).collect();

        assert!(decisions[..3].iter().all(Decision::is_admitted));
        assert!(matches!(decisions[3], Decision::Rejected { limit: 3, .. }));
    }

    #[test]
    fn keeps_rejecting_until_window_resets() {
        let (limiter, clock) = limiter(2, 10);

        limiter.check("a");
        limiter.check("a");
        for _ in 0..5 {
            clock.advance(Duration::from_secs(1));
            assert!(!limiter.check("a").is_admitted());
        }
        // rejected requests do not count
        assert_eq!(limiter.entry(&"a").unwrap().count, 2);
    }

    #[test]
    fn first_request_creates_entry() {
        let (limiter, _clock) = limiter(5, 10);

        assert!(limiter.entry(&"new").is_none());
        assert_eq!(limiter.check("new"), Decision::Admitted);
        assert_eq!(limiter.entry(&"new").unwrap().count, 1);
    }

    #[test]
    fn expired_window_resets_count() {
        let (limiter, clock) = limiter(3, 10);

        for _ in 0..3 {
            limiter.check("a");
        }
        let first_start = limiter.entry(&"a").unwrap().window_start;

        clock.advance(Duration::from_secs(11));
        assert_eq!(limiter.check("a"), Decision::Admitted);

        let entry = limiter.entry(&"a").unwrap();
        assert_eq!(entry.count, 1);
        assert!(entry.window_start > first_start);
    }

    #[test]
    fn exact_window_boundary_starts_new_window() {
        let (limiter, clock) = limiter(1, 10);

        assert_eq!(limiter.check("a"), Decision::Admitted);
        clock.advance(Duration::from_secs(9));
        assert!(!limiter.check("a").is_admitted());

        clock.advance(Duration::from_secs(1));
        assert_eq!(limiter.check("a"), Decision::Admitted);
        assert_eq!(limiter.entry(&"a").unwrap().count, 1);
    }

    #[test]
    fn retry_after_is_time_left_in_window() {
        let (limiter, clock) = limiter(1, 10);

        limiter.check("a");
        clock.advance(Duration::from_secs(4));

        assert_eq!(
            limiter.check("a"),
            Decision::Rejected {
                limit: 1,
                retry_after: Duration::from_secs(6),
            }
        );
    }

    #[test]
    fn identities_do_not_share_counters() {
        let (interleaved, _c1) = limiter(2, 10);
        let (isolated, _c2) = limiter(2, 10);

        let mut a = Vec::new();
        let mut b = Vec::new();
        for _ in 0..3 {
            a.push(interleaved.check("a"));
            b.push(interleaved.check("b"));
        }

        let a_alone: Vec<Decision> = (0..3).map(|_| isolated.check("a")).collect();
        let b_alone: Vec<Decision> = (0..3).map(|_| isolated.check("b")).collect();

        assert_eq!(a, a_alone);
        assert_eq!(b, b_alone);
    }

    #[test]
    fn concurrent_checks_admit_exactly_one_at_the_edge() {
        const THREADS: usize = 16;
        let limit = 5;
        let (limiter, _clock) = limiter(limit, 60);
        for _ in 0..limit - 1 {
            limiter.check("shared");
        }

        let limiter = Arc::new(limiter);
        let barrier = Arc::new(Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    limiter.check("shared")
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(Decision::is_admitted)
            .count();

        assert_eq!(admitted, 1);
        assert_eq!(limiter.entry(&"shared").unwrap().count, limit);
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let (limiter, clock) = limiter(3, 10);

        limiter.check("old");
        clock.advance(Duration::from_secs(6));
        limiter.check("fresh");
        clock.advance(Duration::from_secs(4));

        assert_eq!(limiter.sweep_expired(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.entry(&"old").is_none());
        assert!(limiter.entry(&"fresh").is_some());
    }

    #[test]
    fn swept_identity_starts_over() {
        let (limiter, clock) = limiter(1, 10);

        limiter.check("a");
        clock.advance(Duration::from_secs(10));
        limiter.sweep_expired();

        assert_eq!(limiter.check("a"), Decision::Admitted);
        assert!(!limiter.check("a").is_admitted());
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_expired_entries() {
        let clock = Arc::new(ManualClock::new());
        let limiter = Arc::new(RateLimiter::with_clock(1, Duration::from_secs(10), clock.clone()));
        limiter.check("a");
        limiter.check("b");
        clock.advance(Duration::from_secs(10));

        let task = tokio::spawn(expiry_sweeper(Arc::clone(&limiter), Duration::from_secs(1)));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        task.abort();

        assert_eq!(limiter.tracked_clients(), 0);
    }
}
