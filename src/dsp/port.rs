//! Input port bookkeeping
//!
//! Every chain exposes exactly one input. The port records which upstream
//! sources are connected so callers can assert routing, and counts every
//! connection ever made.

use std::collections::BTreeSet;
use std::fmt;

/// Handle for one upstream connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Single input port of a processing node
#[derive(Debug, Clone, Default)]
pub struct InputPort {
    next_id: u64,
    active: BTreeSet<ConnectionId>,
    total: u64,
}

impl InputPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new upstream connection
    pub fn connect(&mut self) -> ConnectionId {
        let id = ConnectionId(self.next_id);
        self.next_id += 1;
        self.total += 1;
        self.active.insert(id);
        id
    }

    /// Remove a connection; returns false if it was not connected
    pub fn disconnect(&mut self, id: ConnectionId) -> bool {
        self.active.remove(&id)
    }

    /// Whether `id` is currently connected
    pub fn is_connected(&self, id: ConnectionId) -> bool {
        self.active.contains(&id)
    }

    /// Number of live connections
    pub fn active_connections(&self) -> usize {
        self.active.len()
    }

    /// Number of connections ever made
    pub fn total_connections(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_disconnect() {
        let mut port = InputPort::new();
        let a = port.connect();
        let b = port.connect();
        assert_ne!(a, b);
        assert_eq!(port.active_connections(), 2);

        assert!(port.disconnect(a));
        assert!(!port.disconnect(a));
        assert!(!port.is_connected(a));
        assert!(port.is_connected(b));
        assert_eq!(port.active_connections(), 1);
        assert_eq!(port.total_connections(), 2);
    }
}
