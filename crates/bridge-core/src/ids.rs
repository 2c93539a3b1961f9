//! Connection identity.
//!
//! Every connection gets a [`ConnectionId`] rendered as `"<role>-<n>"`, where
//! the role prefix is `server` for the hub and `client` for peers and `n` comes
//! from a single counter shared by both roles. IDs are never reused while the
//! allocator lives.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::handshake::Role;

/// Identity of one connection: its role and its allocation sequence number.
///
/// The sequence number alone is unique per allocator; the role is carried so
/// the ID can be rendered without a registry lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    role: Role,
    seq: u64,
}

impl ConnectionId {
    /// Build an ID from its parts.
    #[must_use]
    pub const fn new(role: Role, seq: u64) -> Self {
        Self { role, seq }
    }

    /// Role this ID was allocated for.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Allocation sequence number.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.role.id_prefix(), self.seq)
    }
}

/// Issues monotonically increasing, role-prefixed connection IDs.
///
/// The counter starts at 1 and is advanced with a single `fetch_add`, so
/// concurrent callers never observe the same number.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first ID is number 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next ID for `role`.
    pub fn allocate(&self, role: Role) -> ConnectionId {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        ConnectionId::new(role, seq)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
