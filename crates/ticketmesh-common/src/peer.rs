use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::warn;

/// Shared liveness state of one remote provider.
///
/// Written by exactly one heartbeat watchdog, read by any number of callers.
/// Peers are compared by identity (`Arc::ptr_eq`), not by address: two clients
/// of the same address are monitored independently.
#[derive(Debug)]
pub struct Peer {
    addr: String,
    available: AtomicBool,
    last_response_time_ms: AtomicU64,
}

impl Peer {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            available: AtomicBool::new(true),
            last_response_time_ms: AtomicU64::new(0),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Updates the availability flag, logging when it flips.
    pub fn set_available(&self, available: bool) {
        let previous = self.available.swap(available, Ordering::AcqRel);
        if previous != available {
            warn!(addr = %self.addr, available, "Provider availability changed");
        }
    }

    /// Round-trip time of the last successful heartbeat, in milliseconds.
    pub fn last_response_time_ms(&self) -> u64 {
        self.last_response_time_ms.load(Ordering::Relaxed)
    }

    pub fn record_response_time(&self, elapsed_ms: u64) {
        self.last_response_time_ms.store(elapsed_ms, Ordering::Relaxed);
    }
}
