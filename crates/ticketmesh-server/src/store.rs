use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// In-memory ticket table: ticket id → serialized ticket bytes.
///
/// Owned by a single server event loop. The entry count is mirrored into a
/// shared counter so it can be observed from outside the loop.
#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: HashMap<String, Vec<u8>>,
    len: Arc<AtomicUsize>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the number of stored tickets.
    pub fn len_handle(&self) -> Arc<AtomicUsize> {
        self.len.clone()
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tickets.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&[u8]> {
        self.tickets.get(id).map(Vec::as_slice)
    }

    /// Inserts or replaces a ticket, returning the previous bytes.
    pub fn put(&mut self, id: String, ticket: Vec<u8>) -> Option<Vec<u8>> {
        let previous = self.tickets.insert(id, ticket);
        self.sync_len();
        previous
    }

    pub fn remove(&mut self, id: &str) -> Option<Vec<u8>> {
        let removed = self.tickets.remove(id);
        self.sync_len();
        removed
    }

    /// Every stored ticket, in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &[u8]> {
        self.tickets.values().map(Vec::as_slice)
    }

    fn sync_len(&self) {
        self.len.store(self.tickets.len(), Ordering::Release);
    }
}
