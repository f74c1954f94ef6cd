//! Creation-order identities for lattices.
//!
//! Vectors compare their owning lattice by identity, never by basis values:
//! two lattices built from the same matrix are still distinct.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a lattice: the namespace of the counter that issued it and
/// the counter value. Ids from different counters never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LatticeId {
    namespace: u64,
    value: u64,
}

impl LatticeId {
    pub fn namespace(&self) -> u64 {
        self.namespace
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

impl fmt::Display for LatticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == GLOBAL_NAMESPACE {
            write!(f, "#{}", self.value)
        } else {
            write!(f, "#{}.{}", self.namespace, self.value)
        }
    }
}

const GLOBAL_NAMESPACE: u64 = 0;

/// Namespaces handed to counters built with `IdCounter::new`; 0 is the
/// process-wide counter's.
static NAMESPACES: AtomicU64 = AtomicU64::new(GLOBAL_NAMESPACE + 1);

/// Monotonic source of [`LatticeId`]s. Values are never reused, and every
/// counter owns a distinct namespace.
#[derive(Debug)]
pub struct IdCounter {
    namespace: u64,
    next: AtomicU64,
}

impl IdCounter {
    pub fn new() -> Self {
        Self::in_namespace(NAMESPACES.fetch_add(1, Ordering::Relaxed))
    }

    const fn in_namespace(namespace: u64) -> Self {
        Self { namespace, next: AtomicU64::new(0) }
    }

    pub fn namespace(&self) -> u64 {
        self.namespace
    }

    pub fn next_id(&self) -> LatticeId {
        LatticeId { namespace: self.namespace, value: self.next.fetch_add(1, Ordering::Relaxed) }
    }

    /// The id the next call to `next_id` will hand out.
    pub fn peek(&self) -> LatticeId {
        LatticeId { namespace: self.namespace, value: self.next.load(Ordering::Relaxed) }
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}

static LATTICE_IDS: IdCounter = IdCounter::in_namespace(GLOBAL_NAMESPACE);

/// The process-wide counter used by `Lattice::new`.
pub fn lattice_ids() -> &'static IdCounter {
    &LATTICE_IDS
}
