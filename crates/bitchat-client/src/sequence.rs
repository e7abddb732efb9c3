//! Request sequencing.
//!
//! Every request carries a monotonically increasing sequence number. A read
//! response older than the newest one already applied for the same resource
//! is stale and gets dropped, and a status response issued before the latest
//! confirmed mode switch must not roll the mode back.

use std::collections::HashMap;

use crate::events::Resource;

#[derive(Debug, Default)]
pub struct RequestTracker {
    last_issued: u64,
    applied: HashMap<Resource, u64>,
    mode_confirmed: u64,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_seq(&mut self) -> u64 {
        self.last_issued += 1;
        self.last_issued
    }

    /// Record a response for `resource`; `false` means it is stale.
    pub fn accept(&mut self, resource: Resource, seq: u64) -> bool {
        let last = self.applied.entry(resource).or_insert(0);
        if seq <= *last {
            return false;
        }
        *last = seq;
        true
    }

    /// Note that the mode switch issued as `seq` succeeded.
    pub fn confirm_mode(&mut self, seq: u64) {
        self.mode_confirmed = self.mode_confirmed.max(seq);
    }

    /// Whether a status response for request `seq` may set the mode.
    pub fn mode_is_current(&self, seq: u64) -> bool {
        seq > self.mode_confirmed
    }
}
