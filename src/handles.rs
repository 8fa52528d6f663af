//! Per-session capability table
//!
//! Maps the small integer handles a client sees onto the process file
//! descriptors the daemon opened for it. Ids come from an incrementing
//! counter and are never reused within a session; session lifetime is
//! bounded, so no recycling is needed. Descriptors are `OwnedFd`, so
//! whatever is left in the table when the session is torn down is closed
//! exactly once when the table drops.

use std::collections::HashMap;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use tracing::debug;

/// Session-local handle → descriptor mapping.
#[derive(Debug, Default)]
pub struct HandleTable {
    next_id: u32,
    map: HashMap<u32, OwnedFd>,
}

impl HandleTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `fd` and assign it the next handle id.
    pub fn insert(&mut self, fd: OwnedFd) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.map.insert(id, fd);
        id
    }

    /// Borrow the descriptor behind `id`, if the handle exists.
    #[must_use]
    pub fn get(&self, id: u32) -> Option<BorrowedFd<'_>> {
        self.map.get(&id).map(AsFd::as_fd)
    }

    /// Remove `id` from the table, handing the descriptor back to the
    /// caller. The mapping is gone whether or not the caller's close
    /// succeeds.
    pub fn remove(&mut self, id: u32) -> Option<OwnedFd> {
        self.map.remove(&id)
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if no handles are open.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Close every remaining descriptor. Dropping the table does the same;
    /// this exists so session teardown can log what it cleaned up.
    pub fn close_all(&mut self) {
        if !self.map.is_empty() {
            debug!("closing {} leftover file handle(s)", self.map.len());
        }
        self.map.clear();
    }
}
