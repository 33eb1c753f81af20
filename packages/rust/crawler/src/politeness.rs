//! Per-host crawl spacing.
//!
//! Each host moves through a two-state machine: never seen, or reserved
//! until some instant. The first access to a host is never delayed — only
//! the second and later accesses wait out the recorded spacing. State lives
//! for the process lifetime and is rebuilt on every run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Time source for the gate. Injectable so spacing logic is testable
/// without real waits.
#[allow(async_fn_in_trait)]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Sleep until `deadline`. Returns `false` if the wait was interrupted
    /// before the deadline passed.
    async fn sleep_until(&self, deadline: Instant) -> bool;
}

/// Production clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) -> bool {
        tokio::time::sleep_until(deadline).await;
        true
    }
}

// ---------------------------------------------------------------------------
// PolitenessGate
// ---------------------------------------------------------------------------

/// The politeness wait was interrupted before the slot opened. The caller
/// skips the current URL; host state is left untouched.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("politeness wait interrupted")]
pub struct ReserveInterrupted;

/// Enforces minimum spacing between fetches to the same host.
///
/// Hosts with no recorded access get their slot immediately. Later
/// reservations sleep until the recorded deadline, then push it out by the
/// requested delay. Each host has its own async mutex, so concurrent
/// reservations for one host serialize against each other without holding
/// up any other host; the registry itself is only locked long enough to
/// look up the slot.
pub struct PolitenessGate<C: Clock = TokioClock> {
    clock: C,
    hosts: Mutex<HashMap<String, Arc<tokio::sync::Mutex<Option<Instant>>>>>,
}

impl PolitenessGate<TokioClock> {
    /// Gate on the tokio timer.
    pub fn new() -> Self {
        Self::with_clock(TokioClock)
    }
}

impl Default for PolitenessGate<TokioClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> PolitenessGate<C> {
    /// Gate on a caller-supplied clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            hosts: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next fetch slot for `host`, waiting out any recorded
    /// spacing. On interruption the recorded deadline is left unchanged and
    /// the caller must skip the current item only.
    pub async fn reserve(&self, host: &str, delay: Duration) -> Result<(), ReserveInterrupted> {
        let slot = {
            let mut hosts = self.hosts.lock().expect("host registry poisoned");
            Arc::clone(hosts.entry(host.to_string()).or_default())
        };

        let mut next_free = slot.lock().await;
        match *next_free {
            // First access to a host is never delayed, even when the grant
            // specifies one; the delay only spaces later accesses.
            None => {
                *next_free = Some(self.clock.now() + delay);
                Ok(())
            }
            Some(deadline) => {
                if deadline > self.clock.now() && !self.clock.sleep_until(deadline).await {
                    return Err(ReserveInterrupted);
                }
                *next_free = Some(self.clock.now() + delay);
                Ok(())
            }
        }
    }
}
