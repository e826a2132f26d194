// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-module transactional state holder.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{error, warn};

use crate::{TransactionManager, TxnId};

struct Frame<S> {
    tid: TxnId,
    snapshot: S,
    can_commit: bool,
}

struct Inner<S> {
    state: S,
    frame: Option<Frame<S>>,
}

/// A module's state under transactional discipline.
///
/// The first access under a tid joins the transaction and snapshots the
/// state; `commit` keeps the mutations, `abort` restores the snapshot.
/// A module marks its transaction doomed with `set_can_commit(tid,
/// false)` when an operation inside it failed (e.g. a refused packet
/// send).
pub struct StateCell<S> {
    name: &'static str,
    txm: Arc<TransactionManager>,
    inner: Mutex<Inner<S>>,
}

impl<S: Clone> StateCell<S> {
    pub fn new(name: &'static str, txm: Arc<TransactionManager>, state: S) -> Self {
        Self {
            name,
            txm,
            inner: Mutex::new(Inner { state, frame: None }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Mutate the state under `tid`, joining the transaction first.
    pub fn with<R>(&self, tid: TxnId, f: impl FnOnce(&mut S) -> R) -> R {
        let mut inner = self.inner.lock();
        self.join_locked(&mut inner, tid);
        f(&mut inner.state)
    }

    /// Read the state under `tid`. Reads join too: the snapshot the
    /// transaction may roll back to is taken at first touch.
    pub fn read<R>(&self, tid: TxnId, f: impl FnOnce(&S) -> R) -> R {
        self.with(tid, |state| f(state))
    }

    /// Read the state outside any transaction. No join, no snapshot;
    /// for diagnostics and assertions only.
    pub fn peek<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().state)
    }

    pub fn set_can_commit(&self, tid: TxnId, ok: bool) {
        let mut inner = self.inner.lock();
        self.join_locked(&mut inner, tid);
        if let Some(frame) = inner.frame.as_mut() {
            frame.can_commit = ok;
        }
    }

    pub fn can_commit(&self, tid: TxnId) -> bool {
        let mut inner = self.inner.lock();
        self.join_locked(&mut inner, tid);
        inner.frame.as_ref().map_or(true, |frame| frame.can_commit)
    }

    /// Drop the join-time snapshot, keeping the mutated state.
    pub fn commit(&self, tid: TxnId) {
        let mut inner = self.inner.lock();
        let joined = inner.frame.as_ref().map_or(false, |frame| frame.tid == tid);
        if joined {
            inner.frame = None;
        } else {
            warn!(name = self.name, %tid, "commit without matching join");
        }
    }

    /// Restore the join-time snapshot.
    pub fn abort(&self, tid: TxnId) {
        let mut inner = self.inner.lock();
        match inner.frame.take() {
            Some(frame) if frame.tid == tid => inner.state = frame.snapshot,
            other => {
                inner.frame = other;
                warn!(name = self.name, %tid, "abort without matching join");
            }
        }
    }

    /// Serialize the state for the process-pair stream.
    pub fn export(&self, tid: TxnId) -> serde_json::Value
    where
        S: Serialize,
    {
        self.read(tid, |state| match serde_json::to_value(state) {
            Ok(value) => value,
            Err(err) => {
                error!(name = self.name, %err, "state not serializable");
                serde_json::Value::Null
            }
        })
    }

    /// Replace the state from a snapshot received over the process-pair
    /// stream. A malformed snapshot is logged and leaves the state alone.
    pub fn import(&self, tid: TxnId, value: serde_json::Value)
    where
        S: DeserializeOwned,
    {
        match serde_json::from_value(value) {
            Ok(state) => self.with(tid, |current| *current = state),
            Err(err) => error!(name = self.name, %err, "refusing malformed state snapshot"),
        }
    }

    fn join_locked(&self, inner: &mut Inner<S>, tid: TxnId) {
        let joined = inner.frame.as_ref().is_some_and(|frame| frame.tid == tid);
        if !joined {
            if inner.frame.is_some() {
                // Cannot happen while the manager serializes transactions.
                warn!(name = self.name, %tid, "joining over a stale frame");
            }
            self.txm.join(tid, self.name);
            inner.frame = Some(Frame {
                tid,
                snapshot: inner.state.clone(),
                can_commit: true,
            });
        }
    }
}

#[cfg(test)]
#[path = "cell_tests.rs"]
mod tests;
