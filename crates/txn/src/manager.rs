// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide transaction manager.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::Resource;

/// Transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxnId(Uuid);

impl TxnId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for TxnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ActiveTxn {
    tid: TxnId,
    /// Resource names in join order; prepare runs in this order.
    joined: Vec<&'static str>,
    /// Holding this keeps every other `start` waiting.
    _slot: OwnedMutexGuard<()>,
}

/// Coordinates two-phase commit over the registered resource managers.
///
/// Only one transaction is in flight per process: `start` waits for the
/// previous transaction to finish. This sidesteps deadlock between
/// modules that join transactions in different orders, and makes every
/// state transition in the process linearizable in `finish` order.
pub struct TransactionManager {
    slot: Arc<tokio::sync::Mutex<()>>,
    registry: Mutex<HashMap<&'static str, Weak<dyn Resource>>>,
    active: Mutex<Option<ActiveTxn>>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(tokio::sync::Mutex::new(())),
            registry: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
        }
    }

    /// Register a resource so transactions can reach it by name.
    ///
    /// Called once per module by the composition root, which keeps the
    /// owning `Arc`; the registry only holds weak references.
    pub fn register<R: Resource + 'static>(&self, resource: &Arc<R>) {
        let name = Resource::name(resource.as_ref());
        let weak = Arc::downgrade(resource) as Weak<dyn Resource>;
        if self.registry.lock().insert(name, weak).is_some() {
            warn!(name, "resource registered twice, replacing");
        }
    }

    /// Start a new transaction, waiting for any in-flight one to finish.
    pub async fn start(&self) -> TxnId {
        let slot = Arc::clone(&self.slot).lock_owned().await;
        let tid = TxnId::new();
        debug!(%tid, "transaction started");
        *self.active.lock() = Some(ActiveTxn { tid, joined: Vec::new(), _slot: slot });
        tid
    }

    /// Add the named resource to the transaction. Idempotent; an unknown
    /// tid is logged and ignored.
    pub fn join(&self, tid: TxnId, name: &'static str) {
        let mut active = self.active.lock();
        match active.as_mut() {
            Some(txn) if txn.tid == tid => {
                if !txn.joined.contains(&name) {
                    debug!(%tid, name, "resource joined transaction");
                    txn.joined.push(name);
                }
            }
            _ => error!(%tid, name, "join: transaction not found"),
        }
    }

    /// Run two-phase commit over the joined resources and release the
    /// transaction slot. Returns `true` iff the transaction committed.
    pub async fn finish(&self, tid: TxnId) -> bool {
        let Some(txn) = self.take_active(tid) else {
            error!(%tid, "finish: transaction not found");
            return false;
        };

        let resources = self.resolve(&txn.joined);

        // Phase 1: every joined resource votes; the first refusal decides.
        let mut can_commit = true;
        for resource in &resources {
            if !resource.prepare_to_commit(tid).await {
                can_commit = false;
                break;
            }
        }

        // Phase 2: commit or roll back every joined resource.
        if can_commit {
            for resource in &resources {
                resource.commit(tid).await;
            }
            debug!(%tid, "transaction committed");
        } else {
            for resource in &resources {
                resource.abort(tid).await;
            }
            warn!(%tid, "transaction aborted");
        }

        // The slot guard drops here, waking the next `start`.
        can_commit
    }

    fn take_active(&self, tid: TxnId) -> Option<ActiveTxn> {
        let mut active = self.active.lock();
        let matches = active.as_ref().map_or(false, |txn| txn.tid == tid);
        if matches {
            active.take()
        } else {
            None
        }
    }

    fn resolve(&self, names: &[&'static str]) -> Vec<Arc<dyn Resource>> {
        let registry = self.registry.lock();
        names
            .iter()
            .filter_map(|name| {
                let resource = registry.get(name).and_then(Weak::upgrade);
                if resource.is_none() {
                    warn!(name, "joined resource no longer registered");
                }
                resource
            })
            .collect()
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
