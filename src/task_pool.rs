//! Per-color pools of unclaimed waste with exclusive, non-blocking claims.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use crate::types::{Color, RobotId, WasteId};

/// Synchronized claim table shared by every robot and any outside observer.
///
/// A live waste id is either unclaimed in its color's pool or claimed by
/// exactly one robot; every mutation happens under one lock.
pub struct TaskPools {
    inner: Mutex<PoolState>,
}

#[derive(Default)]
struct PoolState {
    unclaimed: [BTreeSet<WasteId>; 3],
    claims: HashMap<WasteId, (RobotId, Color)>,
}

impl TaskPools {
    /// Create empty pools for every color.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PoolState::default()),
        }
    }

    /// Register a newly spawned, unclaimed unit.
    pub fn insert(&self, color: Color, id: WasteId) {
        let mut guard = self.inner.lock().expect("task pool mutex poisoned");
        debug_assert!(!guard.claims.contains_key(&id), "inserting a claimed unit");
        guard.unclaimed[color.index()].insert(id);
    }

    /// Claim any unclaimed unit of `color` (the lowest id), or none if empty.
    pub fn claim(&self, color: Color, robot: RobotId) -> Option<WasteId> {
        let mut guard = self.inner.lock().expect("task pool mutex poisoned");
        let id = guard.unclaimed[color.index()].pop_first()?;
        guard.claims.insert(id, (robot, color));
        Some(id)
    }

    /// Claim one specific unit; fails if it is no longer in the pool.
    pub fn claim_target(&self, color: Color, id: WasteId, robot: RobotId) -> bool {
        let mut guard = self.inner.lock().expect("task pool mutex poisoned");
        if !guard.unclaimed[color.index()].remove(&id) {
            return false;
        }
        guard.claims.insert(id, (robot, color));
        true
    }

    /// Return a claimed unit to its pool. Only the owner may release.
    pub fn release(&self, id: WasteId, robot: RobotId) -> bool {
        let mut guard = self.inner.lock().expect("task pool mutex poisoned");
        match guard.claims.get(&id).copied() {
            Some((owner, color)) if owner == robot => {
                guard.claims.remove(&id);
                guard.unclaimed[color.index()].insert(id);
                true
            }
            Some((owner, _)) => {
                tracing::warn!(waste = id, robot, owner, "release by non-owner ignored");
                false
            }
            None => {
                tracing::warn!(waste = id, robot, "release of unclaimed unit ignored");
                false
            }
        }
    }

    /// Forget a unit that left the world (consumed or delivered).
    pub fn retire(&self, color: Color, id: WasteId) {
        let mut guard = self.inner.lock().expect("task pool mutex poisoned");
        guard.claims.remove(&id);
        guard.unclaimed[color.index()].remove(&id);
    }

    /// Snapshot of the unclaimed ids of one color, ascending.
    pub fn unclaimed(&self, color: Color) -> Vec<WasteId> {
        let guard = self.inner.lock().expect("task pool mutex poisoned");
        guard.unclaimed[color.index()].iter().copied().collect()
    }

    pub fn is_unclaimed(&self, color: Color, id: WasteId) -> bool {
        let guard = self.inner.lock().expect("task pool mutex poisoned");
        guard.unclaimed[color.index()].contains(&id)
    }

    pub fn claimant(&self, id: WasteId) -> Option<RobotId> {
        let guard = self.inner.lock().expect("task pool mutex poisoned");
        guard.claims.get(&id).map(|&(robot, _)| robot)
    }

    /// Current number of unclaimed units of a color.
    pub fn len(&self, color: Color) -> usize {
        let guard = self.inner.lock().expect("task pool mutex poisoned");
        guard.unclaimed[color.index()].len()
    }

    pub fn claimed_len(&self) -> usize {
        let guard = self.inner.lock().expect("task pool mutex poisoned");
        guard.claims.len()
    }

    /// True when no id is both unclaimed and claimed.
    pub fn is_consistent(&self) -> bool {
        let guard = self.inner.lock().expect("task pool mutex poisoned");
        guard
            .claims
            .iter()
            .all(|(id, (_, color))| !guard.unclaimed[color.index()].contains(id))
    }
}

impl Default for TaskPools {
    fn default() -> Self {
        Self::new()
    }
}
