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

//! Shielder Errors

use crate::{
    account::{ContractVersion, TransactionKind},
    chain::{relayer::RelayerError, ContractError},
    crypto::CryptoError,
    storage::StorageError,
    sync::InconsistencyError,
};
use alloy_primitives::U256;
use derive_more::Display;
use shielder_util::from_variant;

/// Shielder Error
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Error {
    /// Version Rejected by Contract
    ///
    /// The calldata was built for a contract version that is not deployed.
    #[display(fmt = "Version rejected by contract: {}", _0)]
    VersionRejectedByContract(String),

    /// Version Rejected by Relayer
    #[display(fmt = "Version rejected by relayer: {}", _0)]
    VersionRejectedByRelayer(String),

    /// Unexpected Version in Event
    ///
    /// A matching on-chain event was emitted by a contract version this client does not support.
    #[display(fmt = "Unexpected version in event: expected {}, found {}", expected, found)]
    UnexpectedVersionInEvent {
        /// Supported Version
        expected: ContractVersion,

        /// Version found in the event
        found: ContractVersion,
    },

    /// Account Not on Chain
    #[display(fmt = "Account not on chain: {}", _0)]
    AccountNotOnChain(String),

    /// Insufficient Funds
    #[display(fmt = "Insufficient funds: balance {} is below {}", balance, amount)]
    InsufficientFunds {
        /// Shielded Balance
        balance: U256,

        /// Requested Amount
        amount: U256,
    },

    /// Balance Overflow
    #[display(fmt = "Balance overflow: cannot add {} to {}", amount, balance)]
    BalanceOverflow {
        /// Shielded Balance
        balance: U256,

        /// Requested Amount
        amount: U256,
    },

    /// Amount Below Relayer Fee
    #[display(fmt = "Amount must be greater than the relayer fee: {}", fee)]
    AmountBelowRelayerFee {
        /// Withdrawn Amount
        amount: U256,

        /// Relayer Fee
        fee: U256,
    },

    /// Proving Failure
    #[display(fmt = "Failed to prove {}: {}", "kind.proof_name()", reason)]
    Prove {
        /// Action being proved
        kind: TransactionKind,

        /// Failure Reason
        reason: String,
    },

    /// Proof Verification Failure
    #[display(fmt = "{} proof verification failed", "_0.proof_name()")]
    ProofVerification(TransactionKind),

    /// Public Inputs Mismatch
    ///
    /// The prover returned public inputs other than the ones computed by the client.
    #[display(fmt = "{} public inputs do not match the proved statement", "_0.proof_name()")]
    PublicInputsMismatch(TransactionKind),

    /// Sending Failure
    #[display(fmt = "Failed to {}: {}", "kind.verb()", reason)]
    Send {
        /// Action being sent
        kind: TransactionKind,

        /// Failure Reason
        reason: String,
    },

    /// Wrong Merkle Path Length
    #[display(fmt = "Wrong path length: expected {}, found {}", expected, found)]
    MerklePathLength {
        /// Expected Length
        expected: usize,

        /// Length returned by the contract
        found: usize,
    },

    /// Id Hash Mismatch
    ///
    /// The stored account state belongs to a different account.
    #[display(fmt = "Stored account state belongs to a different account")]
    IdHashMismatch,

    /// Invalid Fee Basis Points
    #[display(fmt = "Invalid protocol fee: {} basis points", _0)]
    InvalidFeeBps(U256),

    /// Fee Overflow
    #[display(fmt = "Protocol fee computation overflowed")]
    FeeOverflow,

    /// Crypto Error
    #[display(fmt = "{}", _0)]
    Crypto(CryptoError),

    /// Contract Error
    #[display(fmt = "{}", _0)]
    Contract(ContractError),

    /// Relayer Error
    #[display(fmt = "{}", _0)]
    Relayer(RelayerError),

    /// Storage Error
    #[display(fmt = "{}", _0)]
    Storage(StorageError),

    /// Synchronization Inconsistency
    ///
    /// The event feed does not describe a unique continuation of the local state. This error is
    /// fatal and must not be retried blindly.
    #[display(fmt = "{}", _0)]
    Sync(InconsistencyError),
}

impl Error {
    /// Returns `true` if `self` signals that this client is outdated with respect to the deployed
    /// contract or relayer.
    #[inline]
    pub fn is_version_mismatch(&self) -> bool {
        matches!(
            self,
            Self::VersionRejectedByContract(_)
                | Self::VersionRejectedByRelayer(_)
                | Self::UnexpectedVersionInEvent { .. }
        )
    }

    /// Returns `true` if `self` is a synchronization invariant violation.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Sync(_))
    }

    /// Wraps a proving failure for `kind`. Version mismatches pass through unchanged.
    #[inline]
    pub fn proving<E>(kind: TransactionKind, err: E) -> Self
    where
        E: Into<Self>,
    {
        let err = err.into();
        if err.is_version_mismatch() {
            err
        } else {
            Self::Prove {
                kind,
                reason: err.to_string(),
            }
        }
    }

    /// Wraps a submission failure for `kind`. Version mismatches pass through unchanged.
    #[inline]
    pub fn sending<E>(kind: TransactionKind, err: E) -> Self
    where
        E: Into<Self>,
    {
        let err = err.into();
        if err.is_version_mismatch() {
            err
        } else {
            Self::Send {
                kind,
                reason: err.to_string(),
            }
        }
    }
}

impl From<ContractError> for Error {
    #[inline]
    fn from(err: ContractError) -> Self {
        match err {
            ContractError::VersionRejected(message) => Self::VersionRejectedByContract(message),
            err => Self::Contract(err),
        }
    }
}

impl From<RelayerError> for Error {
    #[inline]
    fn from(err: RelayerError) -> Self {
        match err {
            RelayerError::VersionRejected(message) => Self::VersionRejectedByRelayer(message),
            err => Self::Relayer(err),
        }
    }
}

from_variant!(Error, Crypto, CryptoError);
from_variant!(Error, Storage, StorageError);
from_variant!(Error, Sync, InconsistencyError);

impl std::error::Error for Error {}
