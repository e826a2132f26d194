// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The two seams every module is built against.

use async_trait::async_trait;

use crate::TxnId;

/// A participant in the two-phase-commit protocol.
///
/// Phase one asks every joined resource whether its work under the
/// transaction succeeded; phase two either commits all of them or aborts
/// all of them. `commit` is the only place a resource may touch the
/// outside world (lamps, indicators), so an abort suppresses all
/// external effects.
#[async_trait]
pub trait Resource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Vote on the transaction. Must not apply external effects.
    async fn prepare_to_commit(&self, tid: TxnId) -> bool;

    /// Make the state mutated under `tid` the new baseline and flush any
    /// queued external effects.
    async fn commit(&self, tid: TxnId);

    /// Restore the snapshot captured when the resource joined `tid`.
    async fn abort(&self, tid: TxnId);
}

/// A module whose state travels across the process-pair channel.
///
/// The primary exports every module's state in one transaction and
/// streams the map to its backup; the backup imports the map in one
/// transaction, so a promotion always observes a consistent cross-module
/// snapshot. Modules with no internal state (the network gateway) are
/// `Module` without being a [`Resource`].
#[async_trait]
pub trait Module: Send + Sync {
    fn name(&self) -> &'static str;

    /// Begin working from the current state. Called on the primary at
    /// boot and on a backup at promotion, inside a committed transaction.
    async fn start(&self, tid: TxnId);

    fn export_state(&self, tid: TxnId) -> serde_json::Value;

    fn import_state(&self, tid: TxnId, state: serde_json::Value);
}

/// Implement [`Resource`] by delegating to a module's
/// [`StateCell`](crate::StateCell) field.
///
/// Modules that queue external effects implement `Resource` by hand and
/// flush in `commit`.
#[macro_export]
macro_rules! impl_resource {
    ($ty:ty, $cell:ident) => {
        #[async_trait::async_trait]
        impl $crate::Resource for $ty {
            fn name(&self) -> &'static str {
                self.$cell.name()
            }

            async fn prepare_to_commit(&self, tid: $crate::TxnId) -> bool {
                self.$cell.can_commit(tid)
            }

            async fn commit(&self, tid: $crate::TxnId) {
                self.$cell.commit(tid);
            }

            async fn abort(&self, tid: $crate::TxnId) {
                self.$cell.abort(tid);
            }
        }
    };
}
