//! Run control: deciding, consistently across ranks, when to stop early.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::transport::Transport;

/// Created once at startup and passed by reference to whoever may ask
/// for the run to end. The flag can be raised from any thread.
#[derive(Debug)]
pub struct RunControl {
    stop: AtomicBool,
    started: Instant,
    limit: Option<Duration>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        RunControl { stop: AtomicBool::new(false), started: Instant::now(), limit: None }
    }

    /// Stops the run once `limit` of wall time has elapsed.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Whether this rank alone wants to stop.
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed) || self.limit.map_or(false, |limit| self.started.elapsed() >= limit)
    }

    /// Whether any rank wants to stop. Collective: every rank must call
    /// it at the same point of the step, and all get the same answer.
    pub fn should_stop<T: Transport + ?Sized>(&self, transport: &T) -> bool {
        let local = self.stop_requested();
        let global = transport.any(local);
        if global && !local {
            warn!(rank = transport.rank(), "stopping because another rank asked to");
        }
        global
    }
}
