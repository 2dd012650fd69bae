//! Advisory file-lock registry.
//!
//! The sandbox is single-threaded and cooperative, so there is nothing to
//! mutually exclude against — the registry exists to catch reentrancy bugs,
//! not to provide real locking. Contention is always reported immediately as
//! a failure, never awaited.

use std::collections::HashMap;

use crate::error::LockError;

/// How the registry treats lock operations.
///
/// The policy is an explicit configuration choice; it is never inferred from
/// caller intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPolicy {
    /// Acquisitions conflict with any held lock; releases of unheld locks
    /// fail.
    Strict,
    /// Acquire and release always succeed trivially. Used when the
    /// toolchain's locking is known to be uncontended in the sandbox and
    /// failing would be incorrect.
    Permissive,
}

/// Requested lock mode.
///
/// Recorded on the handle but never consulted for contention: any second
/// acquisition on a held identity fails, shared or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Identity of a lockable file: its name plus the host-level unique
/// descriptor of the open handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileId {
    pub name: String,
    pub descriptor: u64,
}

impl FileId {
    pub fn new(name: impl Into<String>, descriptor: u64) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }
}

/// An active lock, created on acquisition and destroyed on release.
#[derive(Debug)]
struct LockHandle {
    name: String,
    #[allow(dead_code)]
    mode: LockMode,
}

/// Process-wide mapping from file identity to lock state.
///
/// Owned by the [`Session`](crate::Session) and reset only at session
/// construction; otherwise its contents follow the sequence of acquire and
/// release calls exactly.
#[derive(Debug)]
pub struct LockRegistry {
    policy: LockPolicy,
    held: HashMap<u64, LockHandle>,
}

impl LockRegistry {
    pub fn new(policy: LockPolicy) -> Self {
        Self {
            policy,
            held: HashMap::new(),
        }
    }

    pub fn policy(&self) -> LockPolicy {
        self.policy
    }

    /// Acquire a lock on the identity.
    ///
    /// Strict mode fails with [`LockError::Conflict`] if the identity is
    /// already present, regardless of the requested or held mode.
    pub fn acquire(&mut self, id: &FileId, mode: LockMode) -> Result<(), LockError> {
        if self.policy == LockPolicy::Permissive {
            return Ok(());
        }
        if self.held.contains_key(&id.descriptor) {
            return Err(LockError::Conflict {
                name: id.name.clone(),
            });
        }
        self.held.insert(
            id.descriptor,
            LockHandle {
                name: id.name.clone(),
                mode,
            },
        );
        Ok(())
    }

    /// Release a lock on the identity.
    ///
    /// Strict mode fails with [`LockError::NotLocked`] if the identity is
    /// absent.
    pub fn release(&mut self, id: &FileId) -> Result<(), LockError> {
        if self.policy == LockPolicy::Permissive {
            return Ok(());
        }
        match self.held.remove(&id.descriptor) {
            Some(_) => Ok(()),
            None => Err(LockError::NotLocked {
                name: id.name.clone(),
            }),
        }
    }

    /// Whether the identity is currently held (always false under the
    /// permissive policy, which tracks nothing).
    pub fn is_held(&self, id: &FileId) -> bool {
        self.held.contains_key(&id.descriptor)
    }

    /// Number of held locks.
    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Drop all lock state. Called at session boundaries only.
    pub fn reset(&mut self) {
        self.held.clear();
    }

    /// Names of all held locks, for diagnostics.
    pub fn held_names(&self) -> Vec<&str> {
        self.held.values().map(|h| h.name.as_str()).collect()
    }
}
