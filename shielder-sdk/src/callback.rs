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

//! Shielder Callbacks

use crate::{account::ShielderTransaction, action::CalldataMetadata, error::Error};
use alloy_primitives::B256;
use derive_more::Display;

/// Operation Stage
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Stage {
    /// Calldata Generation
    #[display(fmt = "generation")]
    Generation,

    /// Calldata Submission
    #[display(fmt = "sending")]
    Sending,

    /// State Synchronization
    #[display(fmt = "syncing")]
    Syncing,
}

/// Shielder Operation
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum Operation {
    /// Account Creation
    NewAccount,

    /// Deposit
    Deposit,

    /// Withdrawal
    Withdraw,

    /// Synchronization
    Sync,
}

/// Shielder Callbacks
///
/// Every method has an empty default so implementors only override what they observe.
pub trait ShielderCallbacks {
    /// Called once for every transaction applied by a synchronization pass.
    #[inline]
    fn on_new_transaction(&self, transaction: &ShielderTransaction) {
        let _ = transaction;
    }

    /// Called after calldata has been generated and verified.
    #[inline]
    fn on_calldata_generated(&self, calldata: &CalldataMetadata, operation: Operation) {
        let _ = (calldata, operation);
    }

    /// Called after calldata has been submitted.
    #[inline]
    fn on_calldata_sent(&self, tx_hash: B256, operation: Operation) {
        let _ = (tx_hash, operation);
    }

    /// Called for every error not handled by a more specific callback.
    #[inline]
    fn on_error(&self, error: &Error, stage: Stage, operation: Operation) {
        let _ = (error, stage, operation);
    }

    /// Called when the contract, the relayer or an event reports a protocol version this client
    /// does not support.
    #[inline]
    fn on_sdk_outdated(&self, error: &Error, stage: Stage, operation: Operation) {
        let _ = (error, stage, operation);
    }

    /// Called when an operation requires an account that is not registered on chain.
    #[inline]
    fn on_account_not_on_chain(&self, error: &Error, stage: Stage, operation: Operation) {
        let _ = (error, stage, operation);
    }
}

impl ShielderCallbacks for () {}

impl<B> ShielderCallbacks for &B
where
    B: ShielderCallbacks + ?Sized,
{
    #[inline]
    fn on_new_transaction(&self, transaction: &ShielderTransaction) {
        (**self).on_new_transaction(transaction)
    }

    #[inline]
    fn on_calldata_generated(&self, calldata: &CalldataMetadata, operation: Operation) {
        (**self).on_calldata_generated(calldata, operation)
    }

    #[inline]
    fn on_calldata_sent(&self, tx_hash: B256, operation: Operation) {
        (**self).on_calldata_sent(tx_hash, operation)
    }

    #[inline]
    fn on_error(&self, error: &Error, stage: Stage, operation: Operation) {
        (**self).on_error(error, stage, operation)
    }

    #[inline]
    fn on_sdk_outdated(&self, error: &Error, stage: Stage, operation: Operation) {
        (**self).on_sdk_outdated(error, stage, operation)
    }

    #[inline]
    fn on_account_not_on_chain(&self, error: &Error, stage: Stage, operation: Operation) {
        (**self).on_account_not_on_chain(error, stage, operation)
    }
}

/// Routes `error` to exactly one of the error callbacks of `callbacks`.
#[inline]
pub fn handle_error<B>(callbacks: &B, error: &Error, stage: Stage, operation: Operation)
where
    B: ShielderCallbacks + ?Sized,
{
    if error.is_version_mismatch() {
        callbacks.on_sdk_outdated(error, stage, operation)
    } else if matches!(error, Error::AccountNotOnChain(_)) {
        callbacks.on_account_not_on_chain(error, stage, operation)
    } else {
        callbacks.on_error(error, stage, operation)
    }
}
