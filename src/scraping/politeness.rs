//! Politeness throttle for web crawling
//!
//! Bounds concurrent in-flight fetches per domain with a lazily created
//! semaphore, and makes an admitted worker back off for the configured delay
//! when the domain is already busier than a soft threshold.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::CrawlerConfig;

/// Configuration for the politeness throttle
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Maximum concurrent in-flight fetches per domain
    pub per_domain_concurrency: usize,
    /// In-flight count above which an admitted worker backs off
    pub soft_inflight_threshold: usize,
    /// Backoff sleep when over the soft threshold
    pub backoff_delay: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default())
    }
}

impl ThrottleConfig {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            per_domain_concurrency: config.per_domain_concurrency.max(1),
            soft_inflight_threshold: config.soft_inflight_threshold,
            backoff_delay: Duration::from_millis(config.time_delay_ms),
        }
    }
}

/// Per-domain admission state, never torn down during a run
#[derive(Debug)]
struct DomainGate {
    semaphore: Arc<Semaphore>,
    in_flight: AtomicUsize,
    admissions: AtomicU64,
    backoffs: AtomicU64,
}

impl DomainGate {
    fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            in_flight: AtomicUsize::new(0),
            admissions: AtomicU64::new(0),
            backoffs: AtomicU64::new(0),
        }
    }
}

/// Admission to fetch from one domain; released on drop
#[derive(Debug)]
pub struct ThrottlePermit {
    domain: String,
    gate: Arc<DomainGate>,
    _permit: OwnedSemaphorePermit,
}

impl ThrottlePermit {
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

impl Drop for ThrottlePermit {
    fn drop(&mut self) {
        self.gate.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Per-domain politeness shared by all workers
pub struct PolitenessThrottle {
    gates: DashMap<String, Arc<DomainGate>>,
    config: ThrottleConfig,
}

impl PolitenessThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            gates: DashMap::new(),
            config,
        }
    }

    /// Wait for admission to `domain`, backing off if it is busy
    pub async fn acquire(&self, domain: &str) -> ThrottlePermit {
        let gate = self.gate(domain);

        // Never held across the map lock; the semaphore is private and never closed
        let permit = Arc::clone(&gate.semaphore)
            .acquire_owned()
            .await
            .expect("domain semaphore is never closed");

        let in_flight = gate.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        gate.admissions.fetch_add(1, Ordering::Relaxed);

        if in_flight > self.config.soft_inflight_threshold {
            gate.backoffs.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                "{} has {} fetches in flight, backing off {:?}",
                domain,
                in_flight,
                self.config.backoff_delay
            );
            tokio::time::sleep(self.config.backoff_delay).await;
        }

        ThrottlePermit {
            domain: domain.to_string(),
            gate,
            _permit: permit,
        }
    }

    /// Release a permit obtained from [`acquire`](Self::acquire)
    pub fn release(&self, permit: ThrottlePermit) {
        drop(permit);
    }

    /// Fetches currently in flight for a domain
    pub fn in_flight(&self, domain: &str) -> usize {
        self.gates
            .get(domain)
            .map(|g| g.in_flight.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    /// Get throttle statistics
    pub fn stats(&self) -> ThrottleStats {
        ThrottleStats {
            domains_tracked: self.gates.len(),
            admissions: self
                .gates
                .iter()
                .map(|g| g.admissions.load(Ordering::Relaxed))
                .sum(),
            backoffs: self
                .gates
                .iter()
                .map(|g| g.backoffs.load(Ordering::Relaxed))
                .sum(),
        }
    }

    fn gate(&self, domain: &str) -> Arc<DomainGate> {
        let capacity = self.config.per_domain_concurrency;
        Arc::clone(
            &self
                .gates
                .entry(domain.to_string())
                .or_insert_with(|| Arc::new(DomainGate::new(capacity))),
        )
    }
}

/// Statistics from the politeness throttle
#[derive(Debug, Clone)]
pub struct ThrottleStats {
    pub domains_tracked: usize,
    pub admissions: u64,
    pub backoffs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn throttle(cap: usize, soft: usize, delay_ms: u64) -> Arc<PolitenessThrottle> {
        Arc::new(PolitenessThrottle::new(ThrottleConfig {
            per_domain_concurrency: cap,
            soft_inflight_threshold: soft,
            backoff_delay: Duration::from_millis(delay_ms),
        }))
    }

    #[tokio::test]
    async fn test_permit_tracks_in_flight() {
        let throttle = throttle(2, 10, 0);

        let a = throttle.acquire("www.ics.uci.edu").await;
        let b = throttle.acquire("www.ics.uci.edu").await;
        assert_eq!(throttle.in_flight("www.ics.uci.edu"), 2);
        assert_eq!(throttle.in_flight("www.cs.uci.edu"), 0);

        throttle.release(a);
        assert_eq!(throttle.in_flight("www.ics.uci.edu"), 1);
        drop(b);
        assert_eq!(throttle.in_flight("www.ics.uci.edu"), 0);
        assert_eq!(throttle.stats().domains_tracked, 1);
        assert_eq!(throttle.stats().admissions, 2);
    }

    #[tokio::test]
    async fn test_cap_blocks_until_release() {
        let throttle = throttle(1, 10, 0);
        let first = throttle.acquire("vision.ics.uci.edu").await;

        let waiter = {
            let throttle = Arc::clone(&throttle);
            tokio::spawn(async move {
                let permit = throttle.acquire("vision.ics.uci.edu").await;
                throttle.in_flight(permit.domain())
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished(), "second acquire should block at the cap");

        throttle.release(first);
        assert_eq!(waiter.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_domains_are_independent() {
        let throttle = throttle(1, 10, 0);
        let _a = throttle.acquire("www.ics.uci.edu").await;

        // A different domain is admitted immediately
        let b = tokio::time::timeout(
            Duration::from_millis(200),
            throttle.acquire("www.stat.uci.edu"),
        )
        .await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_soft_threshold_backs_off() {
        let throttle = throttle(3, 1, 100);

        let start = Instant::now();
        let _first = throttle.acquire("www.ics.uci.edu").await;
        assert!(start.elapsed() < Duration::from_millis(100));

        let start = Instant::now();
        let _second = throttle.acquire("www.ics.uci.edu").await;
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(throttle.stats().backoffs, 1);
    }

    #[tokio::test]
    async fn test_concurrent_never_exceeds_cap() {
        let throttle = throttle(2, 10, 0);
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let throttle = Arc::clone(&throttle);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let permit = throttle.acquire("www.cs.uci.edu").await;
                    peak.fetch_max(throttle.in_flight("www.cs.uci.edu"), Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    throttle.release(permit);
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(throttle.in_flight("www.cs.uci.edu"), 0);
    }
}
