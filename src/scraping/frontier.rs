//! URL frontier
//!
//! Workers only talk to the [`Frontier`] trait. [`MemoryFrontier`] is the
//! in-process implementation: a FIFO queue with a seen-set, so re-adding a URL
//! is a no-op, and an in-flight set so that an empty queue only means
//! exhaustion once no worker can still publish new links.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Notify;
use url::Url;

use super::normalize_url;

/// Source of URLs to crawl
#[async_trait]
pub trait Frontier: Send + Sync {
    /// Next URL to crawl, or `None` once the crawl is exhausted
    async fn next_url(&self) -> Option<Url>;

    /// Queue a discovered URL; adding a known URL is ignored
    async fn add_url(&self, url: Url);

    /// Record that a URL returned by `next_url` has been handled
    async fn mark_complete(&self, url: &Url);
}

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<Url>,
    seen: HashSet<String>,
    in_flight: HashSet<String>,
    completed: usize,
}

/// In-memory FIFO frontier
#[derive(Debug, Default)]
pub struct MemoryFrontier {
    state: Mutex<FrontierState>,
    changed: Notify,
}

impl MemoryFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frontier pre-loaded with seed URLs
    pub fn with_seeds(seeds: impl IntoIterator<Item = Url>) -> Self {
        let frontier = Self::new();
        {
            let mut state = frontier.state.lock();
            for seed in seeds {
                Self::enqueue(&mut state, seed);
            }
        }
        frontier
    }

    /// URLs waiting to be handed out
    pub fn pending_count(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Distinct URLs ever added
    pub fn seen_count(&self) -> usize {
        self.state.lock().seen.len()
    }

    /// URLs handed out and not yet completed
    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    pub fn completed_count(&self) -> usize {
        self.state.lock().completed
    }

    /// Check if a URL has been seen
    pub fn is_seen(&self, url: &Url) -> bool {
        self.state.lock().seen.contains(normalize_url(url).as_str())
    }

    fn enqueue(state: &mut FrontierState, url: Url) -> bool {
        let url = normalize_url(&url);
        if !state.seen.insert(url.as_str().to_string()) {
            return false;
        }
        state.queue.push_back(url);
        true
    }
}

#[async_trait]
impl Frontier for MemoryFrontier {
    async fn next_url(&self) -> Option<Url> {
        loop {
            // Register for wakeups before inspecting state so no change is missed
            let changed = self.changed.notified();
            tokio::pin!(changed);
            changed.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(url) = state.queue.pop_front() {
                    state.in_flight.insert(url.as_str().to_string());
                    return Some(url);
                }
                if state.in_flight.is_empty() {
                    drop(state);
                    // Let every other waiter observe exhaustion too
                    self.changed.notify_waiters();
                    return None;
                }
            }

            changed.await;
        }
    }

    async fn add_url(&self, url: Url) {
        let added = Self::enqueue(&mut self.state.lock(), url);
        if added {
            self.changed.notify_waiters();
        }
    }

    async fn mark_complete(&self, url: &Url) {
        {
            let mut state = self.state.lock();
            if state.in_flight.remove(normalize_url(url).as_str()) {
                state.completed += 1;
            }
        }
        self.changed.notify_waiters();
    }
}
