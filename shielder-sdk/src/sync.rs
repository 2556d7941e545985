// Copyright 2023-2024 Shielder Authors.
// This file is part of shielder-rs.
//
// shielder-rs is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// shielder-rs is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with shielder-rs.  If not, see <http://www.gnu.org/licenses/>.

//! State Synchronization
//!
//! The synchronizer walks the nullifier index of the contract forward from the local state: the
//! nullifier of the current note points to the block that spent it, and that block holds the
//! event creating the next note. The walk stops when the current note is unspent.

use crate::{
    account::{AccountState, ContractVersion, ShielderTransaction},
    chain::{Contract, NoteEvent},
    crypto::CryptoClient,
    error::Error,
    events::StateEventsFilter,
    scalar::Scalar,
    storage::{StateManager, Storage},
};
use derive_more::Display;
use futures::{lock::Mutex, stream};
use shielder_util::future::LocalBoxStreamResult;
use std::rc::Rc;
use tracing::{error, info};

/// Synchronization Inconsistency
///
/// The event feed cannot be reconciled with the local state.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum InconsistencyError {
    /// Unexpected Event Count
    ///
    /// A spent nullifier must be followed by exactly one matching event in its block.
    #[display(
        fmt = "expected exactly one matching event in block {}, found {}",
        block,
        count
    )]
    UnexpectedEventCount {
        /// Block Number
        block: u64,

        /// Number of matching events
        count: usize,
    },

    /// Invalid Transition
    #[display(fmt = "event in block {} does not continue the account state", block)]
    InvalidTransition {
        /// Block Number
        block: u64,
    },
}

impl std::error::Error for InconsistencyError {}

/// Search Key
///
/// Value whose hash marks, in the nullifier index, the block holding the next transition.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SearchKey {
    /// Account Identifier
    ///
    /// Account creation registers the hash of the identifier since there is no note to spend.
    AccountId(Scalar),

    /// Nullifier of the current note
    Nullifier(Scalar),
}

impl SearchKey {
    /// Returns the search key for `state`.
    #[inline]
    pub async fn for_state<C>(state: &AccountState, crypto: &C) -> Result<Self, Error>
    where
        C: CryptoClient + ?Sized,
    {
        match state {
            AccountState::Empty { id } => Ok(Self::AccountId(*id)),
            AccountState::Active(account) => Ok(Self::Nullifier(
                crypto
                    .derive_secrets(account.id, account.note_nonce()?)
                    .await?
                    .nullifier,
            )),
        }
    }

    /// Returns the value of the key.
    #[inline]
    pub const fn value(&self) -> Scalar {
        match self {
            Self::AccountId(value) | Self::Nullifier(value) => *value,
        }
    }
}

/// State Synchronizer
pub struct StateSynchronizer<S, C, K> {
    /// State Manager
    state_manager: Rc<StateManager<S, C>>,

    /// Contract
    contract: Rc<K>,

    /// Event Filter
    filter: StateEventsFilter<C>,

    /// Supported Contract Version
    version: ContractVersion,

    /// Synchronization Lock
    lock: Mutex<()>,
}

impl<S, C, K> StateSynchronizer<S, C, K>
where
    S: Storage,
    C: CryptoClient,
    K: Contract,
{
    /// Builds a new [`StateSynchronizer`] for the account of `state_manager`.
    #[inline]
    pub fn new(
        state_manager: Rc<StateManager<S, C>>,
        contract: Rc<K>,
        version: ContractVersion,
    ) -> Self {
        let filter = StateEventsFilter::new(state_manager.crypto().clone(), version);
        Self {
            state_manager,
            contract,
            filter,
            version,
            lock: Mutex::new(()),
        }
    }

    /// Finds the on-chain transition following `state`, returning the new state and the event
    /// that produced it, or `None` if `state` is the latest state on chain.
    #[inline]
    async fn next_transition(
        &self,
        state: &AccountState,
    ) -> Result<Option<(AccountState, NoteEvent)>, Error> {
        let crypto = self.state_manager.crypto();
        let key = SearchKey::for_state(state, &**crypto).await?;
        let nullifier_hash = crypto.hash(vec![key.value()]).await?;
        let Some(block) = self.contract.nullifier_block(nullifier_hash).await? else {
            return Ok(None);
        };
        let events = self.contract.get_note_events_from_block(block).await?;
        let mut matching = self.filter.state_changing_events(state, events).await?;
        let count = matching.len();
        let event = match (matching.pop(), count) {
            (Some(event), 1) => event,
            _ => {
                error!(block, count, nonce = state.nonce(), "unexpected number of matching events");
                return Err(InconsistencyError::UnexpectedEventCount { block, count }.into());
            }
        };
        if event.contract_version != self.version {
            return Err(Error::UnexpectedVersionInEvent {
                expected: self.version,
                found: event.contract_version,
            });
        }
        let next = self.filter.new_state_by_event(state, &event).await?;
        Ok(Some((next, event)))
    }

    /// Advances the persisted account state to the latest state on chain, calling
    /// `on_new_transaction` for every applied transition. Returns the number of applied
    /// transitions.
    ///
    /// # Note
    ///
    /// Synchronization passes are serialized: a concurrent call waits for the running pass and
    /// then continues from the state it persisted.
    #[inline]
    pub async fn sync_account_state<F>(&self, mut on_new_transaction: F) -> Result<usize, Error>
    where
        F: FnMut(&ShielderTransaction),
    {
        let _guard = self.lock.lock().await;
        let mut state = self.state_manager.account_state().await?;
        let mut applied = 0;
        while let Some((next, event)) = self.next_transition(&state).await? {
            self.state_manager.update_account_state(&next).await?;
            info!(
                nonce = next.nonce(),
                block = event.block,
                kind = %event.kind,
                "applied shielder transaction"
            );
            on_new_transaction(&ShielderTransaction::from(&event));
            state = next;
            applied += 1;
        }
        Ok(applied)
    }

    /// Replays the account history from the empty state without persisting anything.
    ///
    /// Every call returns a fresh stream starting over from the first transaction.
    #[inline]
    pub fn shielder_transactions(&self) -> LocalBoxStreamResult<'_, ShielderTransaction, Error> {
        Box::pin(stream::try_unfold(
            self.state_manager.empty_account_state(),
            move |state| async move {
                Ok::<_, Error>(
                    self.next_transition(&state)
                        .await?
                        .map(|(next, event)| (ShielderTransaction::from(&event), next)),
                )
            },
        ))
    }
}
