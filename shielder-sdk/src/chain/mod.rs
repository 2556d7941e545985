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

//! Chain Connection
//!
//! The [`Contract`] trait covers every read and calldata-encoding call the client makes against
//! the deployed shielder contract. Submitting transactions is left to a [`TransactionSender`]
//! owned by the caller.

use crate::{
    account::{ContractVersion, TransactionKind},
    crypto::{DepositPubInputs, NewAccountPubInputs, Proof, WithdrawPubInputs},
    scalar::Scalar,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use core::fmt;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use shielder_util::future::LocalBoxFutureResult;

pub mod relayer;

/// Note Event
///
/// Event emitted by the contract whenever a note is appended to the note tree.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NoteEvent {
    /// Event Kind
    pub kind: TransactionKind,

    /// Contract version that emitted the event
    pub contract_version: ContractVersion,

    /// Amount
    pub amount: U256,

    /// New Note
    #[serde(with = "shielder_util::serde::decimal")]
    pub new_note: Scalar,

    /// Index of the new note in the note tree
    pub new_note_index: u64,

    /// Withdrawal Destination
    pub to: Option<Address>,

    /// Relayer fee paid by a withdrawal
    pub relayer_fee: Option<U256>,

    /// Transaction Hash
    pub tx_hash: B256,

    /// Block Number
    pub block: u64,
}

/// Contract Error
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum ContractError {
    /// Version Rejected
    ///
    /// The expected contract version differs from the deployed one.
    #[display(fmt = "version rejected by contract: {}", _0)]
    VersionRejected(String),

    /// Call Rejected
    #[display(fmt = "call rejected by contract: {}", _0)]
    Rejected(String),

    /// Transport Error
    #[display(fmt = "rpc error: {}", _0)]
    Rpc(String),
}

impl std::error::Error for ContractError {}

/// Withdrawal Call
///
/// Everything the contract needs to encode a self-relayed withdrawal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawCall {
    /// Withdrawal Destination
    pub to: Address,

    /// Relayer Address
    pub relayer_address: Address,

    /// Relayer Fee
    pub relayer_fee: U256,

    /// Withdrawn Amount
    pub amount: U256,

    /// Public Inputs
    pub pub_inputs: WithdrawPubInputs,

    /// Proof
    pub proof: Proof,
}

/// Contract Connection
pub trait Contract {
    /// Returns the contract address.
    fn address(&self) -> Address;

    /// Returns the raw Merkle path for the leaf at `leaf_index`. The path starts with the leaf
    /// and ends with the root.
    fn get_merkle_path(&self, leaf_index: u64) -> LocalBoxFutureResult<'_, Vec<Scalar>, ContractError>;

    /// Returns the block in which the nullifier with hash `nullifier_hash` was recorded, if any.
    fn nullifier_block(
        &self,
        nullifier_hash: Scalar,
    ) -> LocalBoxFutureResult<'_, Option<u64>, ContractError>;

    /// Returns every note event emitted in `block`.
    fn get_note_events_from_block(
        &self,
        block: u64,
    ) -> LocalBoxFutureResult<'_, Vec<NoteEvent>, ContractError>;

    /// Encodes an account creation call.
    ///
    /// # Failure Conditions
    ///
    /// Returns [`ContractError::VersionRejected`] if `expected_version` is not deployed.
    fn new_account_calldata(
        &self,
        expected_version: ContractVersion,
        from: Address,
        pub_inputs: NewAccountPubInputs,
        amount: U256,
        proof: Proof,
    ) -> LocalBoxFutureResult<'_, Bytes, ContractError>;

    /// Encodes a deposit call.
    ///
    /// # Failure Conditions
    ///
    /// Returns [`ContractError::VersionRejected`] if `expected_version` is not deployed.
    fn deposit_calldata(
        &self,
        expected_version: ContractVersion,
        from: Address,
        pub_inputs: DepositPubInputs,
        amount: U256,
        proof: Proof,
    ) -> LocalBoxFutureResult<'_, Bytes, ContractError>;

    /// Encodes a withdrawal call.
    ///
    /// # Failure Conditions
    ///
    /// Returns [`ContractError::VersionRejected`] if `expected_version` is not deployed, and
    /// [`ContractError::Rejected`] if the commitment does not match the call arguments.
    fn withdraw_calldata(
        &self,
        expected_version: ContractVersion,
        from: Address,
        call: WithdrawCall,
    ) -> LocalBoxFutureResult<'_, Bytes, ContractError>;

    /// Returns the protocol deposit fee in basis points.
    fn protocol_deposit_fee_bps(&self) -> LocalBoxFutureResult<'_, U256, ContractError>;

    /// Returns the protocol withdrawal fee in basis points.
    fn protocol_withdraw_fee_bps(&self) -> LocalBoxFutureResult<'_, U256, ContractError>;
}

/// Transaction Request
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TransactionRequest {
    /// Sender
    pub from: Address,

    /// Destination Contract
    pub to: Address,

    /// Encoded Calldata
    pub data: Bytes,

    /// Attached Value
    pub value: U256,
}

/// Transaction Sender
///
/// Signs and broadcasts transactions on behalf of the account owner.
pub trait TransactionSender {
    /// Error Type
    type Error: fmt::Display;

    /// Submits `transaction`, returning its hash.
    fn send_transaction(
        &self,
        transaction: TransactionRequest,
    ) -> LocalBoxFutureResult<'_, B256, Self::Error>;
}
