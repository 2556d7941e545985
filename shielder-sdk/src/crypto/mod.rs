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

//! Cryptographic Capabilities
//!
//! The hashing, secret derivation and circuit proving used by the client all live behind the
//! [`CryptoClient`] trait. Implementations can run in-process or behind the message-passing
//! boundary in [`worker`].

use crate::scalar::Scalar;
use alloy_primitives::{Bytes, B256};
use derive_more::{Display, From};
use shielder_util::{future::LocalBoxFutureResult, message::ChannelError};

pub mod worker;

/// Proof Bytes
pub type Proof = Bytes;

/// Crypto Error
#[derive(Clone, Debug, Display, Eq, From, PartialEq)]
pub enum CryptoError {
    /// Worker Channel Error
    #[display(fmt = "crypto worker unavailable: {}", _0)]
    Channel(ChannelError),

    /// Backend Error
    #[display(fmt = "{}", _0)]
    #[from(ignore)]
    Backend(String),
}

impl std::error::Error for CryptoError {}

/// Action Secrets
///
/// Nullifier and trapdoor derived for a given `(id, nonce)` pair.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ShielderActionSecrets {
    /// Nullifier
    pub nullifier: Scalar,

    /// Trapdoor
    pub trapdoor: Scalar,
}

/// New Account Circuit Values
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewAccountValues {
    /// Account Identifier
    pub id: Scalar,

    /// Nullifier of the first note
    pub nullifier: Scalar,

    /// Trapdoor of the first note
    pub trapdoor: Scalar,

    /// Initial Deposit
    pub initial_deposit: Scalar,
}

/// New Account Public Inputs
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NewAccountPubInputs {
    /// Hash of the first note
    pub h_note: Scalar,

    /// Hash of the account identifier
    pub h_id: Scalar,

    /// Initial Deposit
    pub initial_deposit: Scalar,
}

/// Deposit Circuit Values
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DepositValues {
    /// Account Identifier
    pub id: Scalar,

    /// Nullifier of the spent note
    pub nullifier_old: Scalar,

    /// Trapdoor of the spent note
    pub trapdoor_old: Scalar,

    /// Balance committed in the spent note
    pub balance_old: Scalar,

    /// Merkle path of the spent note without the root
    pub path: Vec<u8>,

    /// Deposited Value
    pub value: Scalar,

    /// Nullifier of the new note
    pub nullifier_new: Scalar,

    /// Trapdoor of the new note
    pub trapdoor_new: Scalar,
}

/// Deposit Public Inputs
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DepositPubInputs {
    /// Merkle Root
    pub merkle_root: Scalar,

    /// Hash of the nullifier of the spent note
    pub h_nullifier_old: Scalar,

    /// Hash of the new note
    pub h_note_new: Scalar,

    /// Deposited Value
    pub value: Scalar,
}

/// Withdraw Circuit Values
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawValues {
    /// Account Identifier
    pub id: Scalar,

    /// Nullifier of the spent note
    pub nullifier_old: Scalar,

    /// Trapdoor of the spent note
    pub trapdoor_old: Scalar,

    /// Balance committed in the spent note
    pub balance_old: Scalar,

    /// Merkle path of the spent note without the root
    pub path: Vec<u8>,

    /// Withdrawn Value
    pub value: Scalar,

    /// Nullifier of the new note
    pub nullifier_new: Scalar,

    /// Trapdoor of the new note
    pub trapdoor_new: Scalar,

    /// Commitment to the destination, relayer and relayer fee
    pub commitment: Scalar,
}

/// Withdraw Public Inputs
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct WithdrawPubInputs {
    /// Merkle Root
    pub merkle_root: Scalar,

    /// Hash of the nullifier of the spent note
    pub h_nullifier_old: Scalar,

    /// Hash of the new note
    pub h_note_new: Scalar,

    /// Withdrawn Value
    pub value: Scalar,

    /// Commitment to the destination, relayer and relayer fee
    pub commitment: Scalar,
}

/// Crypto Client
///
/// # Note
///
/// Every method may suspend. Implementations are free to offload work to another execution
/// context as long as results are delivered back through the returned future.
pub trait CryptoClient {
    /// Hashes `inputs`, which must not be longer than [`arity`](Self::arity).
    fn hash(&self, inputs: Vec<Scalar>) -> LocalBoxFutureResult<'_, Scalar, CryptoError>;

    /// Returns the maximum number of inputs accepted by [`hash`](Self::hash).
    fn arity(&self) -> LocalBoxFutureResult<'_, usize, CryptoError>;

    /// Returns the height of the note tree.
    fn tree_height(&self) -> LocalBoxFutureResult<'_, usize, CryptoError>;

    /// Derives the nullifier and trapdoor for the note created at `nonce`.
    fn derive_secrets(
        &self,
        id: Scalar,
        nonce: u64,
    ) -> LocalBoxFutureResult<'_, ShielderActionSecrets, CryptoError>;

    /// Converts a signing key into a field element, reducing it modulo the field order.
    ///
    /// The core derives account identifiers with [`derive_id`](Self::derive_id) and never calls
    /// this method itself. It is part of the capability so that hosts talking to a backend
    /// through [`worker`] get the same key conversion the backend applies inside `derive_id`.
    fn private_key_to_scalar(
        &self,
        private_key: B256,
    ) -> LocalBoxFutureResult<'_, Scalar, CryptoError>;

    /// Derives the account identifier for `private_key` on the chain with `chain_id`.
    fn derive_id(
        &self,
        private_key: B256,
        chain_id: u64,
    ) -> LocalBoxFutureResult<'_, Scalar, CryptoError>;

    /// Proves account creation.
    fn prove_new_account(
        &self,
        values: NewAccountValues,
    ) -> LocalBoxFutureResult<'_, (Proof, NewAccountPubInputs), CryptoError>;

    /// Verifies an account creation proof.
    fn verify_new_account(
        &self,
        proof: Proof,
        pub_inputs: NewAccountPubInputs,
    ) -> LocalBoxFutureResult<'_, bool, CryptoError>;

    /// Proves a deposit.
    fn prove_deposit(
        &self,
        values: DepositValues,
    ) -> LocalBoxFutureResult<'_, (Proof, DepositPubInputs), CryptoError>;

    /// Verifies a deposit proof.
    fn verify_deposit(
        &self,
        proof: Proof,
        pub_inputs: DepositPubInputs,
    ) -> LocalBoxFutureResult<'_, bool, CryptoError>;

    /// Proves a withdrawal.
    fn prove_withdraw(
        &self,
        values: WithdrawValues,
    ) -> LocalBoxFutureResult<'_, (Proof, WithdrawPubInputs), CryptoError>;

    /// Verifies a withdrawal proof.
    fn verify_withdraw(
        &self,
        proof: Proof,
        pub_inputs: WithdrawPubInputs,
    ) -> LocalBoxFutureResult<'_, bool, CryptoError>;
}
