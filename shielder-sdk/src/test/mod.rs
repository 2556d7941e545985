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

//! Testing Framework
//!
//! Deterministic stand-ins for the external capabilities of the client: a hash-based crypto
//! client whose "proofs" are digests of their public inputs, a simulated shielder contract with
//! its relayer, and in-memory storage.

use crate::{
    account::{AccountState, ContractVersion, ShielderTransaction, TransactionKind},
    action::CalldataMetadata,
    callback::{Operation, ShielderCallbacks, Stage},
    chain::NoteEvent,
    error::Error,
    storage::{Storage, StorageError},
};
use alloy_primitives::{keccak256, B256, U256};
use core::cell::RefCell;
use shielder_util::future::LocalBoxFutureResult;
use std::{collections::HashMap, rc::Rc};

mod ledger;

pub use crypto::*;
pub use ledger::*;

/// In-Memory Storage
///
/// Clones share the same underlying map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(Rc<RefCell<HashMap<String, Vec<u8>>>>);

impl MemoryStorage {
    /// Returns a copy of the value stored under `key`.
    #[inline]
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.0.borrow().get(key).cloned()
    }

    /// Stores `value` under `key`.
    #[inline]
    pub fn insert(&self, key: &str, value: Vec<u8>) {
        self.0.borrow_mut().insert(key.into(), value);
    }

    /// Removes every stored value.
    #[inline]
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Storage for MemoryStorage {
    #[inline]
    fn get_item<'s>(
        &'s self,
        key: &'s str,
    ) -> LocalBoxFutureResult<'s, Option<Vec<u8>>, StorageError> {
        Box::pin(async move { Ok(self.get(key)) })
    }

    #[inline]
    fn set_item<'s>(
        &'s self,
        key: &'s str,
        value: Vec<u8>,
    ) -> LocalBoxFutureResult<'s, (), StorageError> {
        Box::pin(async move {
            self.insert(key, value);
            Ok(())
        })
    }
}

/// Builds the event announcing `state` as the result of a `kind` transaction of `amount`,
/// stored at `index` in `block`.
#[inline]
pub fn note_event(
    kind: TransactionKind,
    amount: U256,
    state: &AccountState,
    index: u64,
    block: u64,
) -> NoteEvent {
    NoteEvent {
        kind,
        contract_version: ContractVersion::SUPPORTED,
        amount,
        new_note: state.current_note().unwrap_or_default(),
        new_note_index: index,
        to: None,
        relayer_fee: None,
        tx_hash: transaction_hash(block, index),
        block,
    }
}

/// Returns a deterministic transaction hash for the note at `index` in `block`.
#[inline]
pub fn transaction_hash(block: u64, index: u64) -> B256 {
    let mut bytes = [0; 16];
    bytes[..8].copy_from_slice(&block.to_be_bytes());
    bytes[8..].copy_from_slice(&index.to_be_bytes());
    keccak256(bytes)
}

/// Callback Event
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallbackEvent {
    /// New Transaction
    NewTransaction(ShielderTransaction),

    /// Calldata Generated
    CalldataGenerated(CalldataMetadata, Operation),

    /// Calldata Sent
    CalldataSent(B256, Operation),

    /// Generic Error
    Error(Error, Stage, Operation),

    /// Outdated Client
    SdkOutdated(Error, Stage, Operation),

    /// Account Not on Chain
    AccountNotOnChain(Error, Stage, Operation),
}

/// Recording Callbacks
///
/// Records every callback invocation in order.
#[derive(Debug, Default)]
pub struct RecordingCallbacks(RefCell<Vec<CallbackEvent>>);

impl RecordingCallbacks {
    /// Returns the recorded events.
    #[inline]
    pub fn events(&self) -> Vec<CallbackEvent> {
        self.0.borrow().clone()
    }

    /// Returns the transactions reported through [`ShielderCallbacks::on_new_transaction`].
    #[inline]
    pub fn transactions(&self) -> Vec<ShielderTransaction> {
        self.0
            .borrow()
            .iter()
            .filter_map(|event| match event {
                CallbackEvent::NewTransaction(transaction) => Some(transaction.clone()),
                _ => None,
            })
            .collect()
    }

    /// Clears the recorded events.
    #[inline]
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Records `event`.
    #[inline]
    fn push(&self, event: CallbackEvent) {
        self.0.borrow_mut().push(event);
    }
}

impl ShielderCallbacks for RecordingCallbacks {
    #[inline]
    fn on_new_transaction(&self, transaction: &ShielderTransaction) {
        self.push(CallbackEvent::NewTransaction(transaction.clone()));
    }

    #[inline]
    fn on_calldata_generated(&self, calldata: &CalldataMetadata, operation: Operation) {
        self.push(CallbackEvent::CalldataGenerated(*calldata, operation));
    }

    #[inline]
    fn on_calldata_sent(&self, tx_hash: B256, operation: Operation) {
        self.push(CallbackEvent::CalldataSent(tx_hash, operation));
    }

    #[inline]
    fn on_error(&self, error: &Error, stage: Stage, operation: Operation) {
        self.push(CallbackEvent::Error(error.clone(), stage, operation));
    }

    #[inline]
    fn on_sdk_outdated(&self, error: &Error, stage: Stage, operation: Operation) {
        self.push(CallbackEvent::SdkOutdated(error.clone(), stage, operation));
    }

    #[inline]
    fn on_account_not_on_chain(&self, error: &Error, stage: Stage, operation: Operation) {
        self.push(CallbackEvent::AccountNotOnChain(error.clone(), stage, operation));
    }
}
