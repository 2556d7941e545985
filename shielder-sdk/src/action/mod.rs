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

//! Action Builders
//!
//! Each action computes the next account state locally ("raw" transitions) and assembles the
//! values proved by the matching circuit. The raw transitions are shared with the event filter
//! so there is a single definition of what the next note must be.

use crate::{
    account::{AccountState, ActiveAccount, ContractVersion, TransactionKind},
    chain::Contract,
    crypto::{CryptoClient, Proof, ShielderActionSecrets},
    error::Error,
    scalar::Scalar,
};
use alloy_primitives::U256;
use core::time::Duration;
use std::rc::Rc;

pub mod deposit;
pub mod new_account;
pub mod withdraw;

/// Returns the balance after applying a `kind` transaction of `amount` to `balance`, or `None`
/// if the result would be negative or overflow.
#[inline]
pub fn next_balance(kind: TransactionKind, balance: U256, amount: U256) -> Option<U256> {
    match kind {
        TransactionKind::NewAccount => Some(amount),
        TransactionKind::Deposit => balance.checked_add(amount),
        TransactionKind::Withdraw => balance.checked_sub(amount),
    }
}

/// Note Transitions
///
/// Hashing helpers common to every action.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = "C: core::fmt::Debug"))]
pub struct NoteTransitions<C> {
    /// Crypto Client
    crypto: Rc<C>,

    /// Contract Version
    version: ContractVersion,
}

impl<C> NoteTransitions<C>
where
    C: CryptoClient,
{
    /// Builds a new [`NoteTransitions`] for notes of `version`.
    #[inline]
    pub fn new(crypto: Rc<C>, version: ContractVersion) -> Self {
        Self { crypto, version }
    }

    /// Returns the crypto client.
    #[inline]
    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    /// Returns the contract version of produced notes.
    #[inline]
    pub fn version(&self) -> ContractVersion {
        self.version
    }

    /// Hashes `balance` padded with zeros to the hasher arity.
    #[inline]
    pub async fn balance_hash(&self, balance: U256) -> Result<Scalar, Error> {
        let arity = self.crypto.arity().await?;
        let mut inputs = vec![Scalar::ZERO; arity.max(1)];
        inputs[0] = Scalar::from_u256(balance);
        Ok(self.crypto.hash(inputs).await?)
    }

    /// Computes the note committing to `balance` for the account `id` with `secrets`.
    #[inline]
    pub async fn note_hash(
        &self,
        id: Scalar,
        secrets: ShielderActionSecrets,
        balance: U256,
    ) -> Result<Scalar, Error> {
        let balance_hash = self.balance_hash(balance).await?;
        Ok(self
            .crypto
            .hash(vec![
                self.version.note_version(),
                id,
                secrets.nullifier,
                secrets.trapdoor,
                balance_hash,
            ])
            .await?)
    }

    /// Hashes a single field element.
    #[inline]
    pub async fn hash_one(&self, value: Scalar) -> Result<Scalar, Error> {
        Ok(self.crypto.hash(vec![value]).await?)
    }

    /// Computes the state following `state` after a `kind` transaction of `amount`.
    ///
    /// Returns `None` without calling the crypto client if the new balance would be negative.
    /// The new state has no note index; it is only known once the note is observed on chain.
    #[inline]
    pub async fn raw_transition(
        &self,
        kind: TransactionKind,
        state: &AccountState,
        amount: U256,
    ) -> Result<Option<AccountState>, Error> {
        let Some(balance) = next_balance(kind, state.balance(), amount) else {
            return Ok(None);
        };
        let id = state.id();
        let nonce = state.nonce();
        let secrets = self.crypto.derive_secrets(id, nonce).await?;
        let current_note = self.note_hash(id, secrets, balance).await?;
        Ok(Some(AccountState::Active(ActiveAccount {
            id,
            nonce: nonce + 1,
            balance,
            current_note,
            current_note_index: None,
        })))
    }

    /// Splits a raw Merkle path into the concatenated bytes of its nodes and its root.
    ///
    /// # Failure Conditions
    ///
    /// The path must contain exactly `tree_height * arity + 1` elements, the last one being the
    /// root.
    #[inline]
    pub async fn merkle_path_and_root(
        &self,
        mut raw_path: Vec<Scalar>,
    ) -> Result<(Vec<u8>, Scalar), Error> {
        let expected = self.crypto.tree_height().await? * self.crypto.arity().await? + 1;
        if raw_path.len() != expected {
            return Err(Error::MerklePathLength {
                expected,
                found: raw_path.len(),
            });
        }
        let root = raw_path.pop().ok_or(Error::MerklePathLength {
            expected,
            found: 0,
        })?;
        let path = raw_path
            .iter()
            .flat_map(|node| node.to_bytes())
            .collect();
        Ok((path, root))
    }
}

/// Returns the active account behind `state` together with the raw Merkle path of its current
/// note, checking that the note is registered on chain.
///
/// # Failure Conditions
///
/// Returns [`Error::AccountNotOnChain`] if `state` is empty, has no note index, the path cannot
/// be fetched or the leaf of the path is not the current note.
#[inline]
pub async fn on_chain_note_path<'s, K>(
    contract: &K,
    state: &'s AccountState,
) -> Result<(&'s ActiveAccount, Vec<Scalar>), Error>
where
    K: Contract + ?Sized,
{
    let account = state
        .as_active()
        .ok_or_else(|| Error::AccountNotOnChain("account has no note".into()))?;
    let index = account.current_note_index.ok_or_else(|| {
        Error::AccountNotOnChain("current note has not been observed on chain".into())
    })?;
    let path = contract.get_merkle_path(index).await.map_err(|_| {
        Error::AccountNotOnChain(format!(
            "failed to fetch merkle path for account state with index {index}"
        ))
    })?;
    if path.first() != Some(&account.current_note) {
        return Err(Error::AccountNotOnChain(format!(
            "account state with merkle index {index} does not match on-chain data"
        )));
    }
    Ok((account, path))
}

/// Calldata
///
/// Verified proof and public inputs of an action, ready to be encoded and sent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Calldata<P> {
    /// Public Inputs
    pub pub_inputs: P,

    /// Proof
    pub proof: Proof,

    /// Amount
    pub amount: U256,

    /// Contract version the calldata was built for
    pub expected_contract_version: ContractVersion,

    /// Time spent proving and verifying
    pub proving_time: Duration,
}

impl<P> Calldata<P> {
    /// Returns the metadata of `self` for an action of `kind`.
    #[inline]
    pub fn metadata(&self, kind: TransactionKind) -> CalldataMetadata {
        CalldataMetadata {
            kind,
            amount: self.amount,
            expected_contract_version: self.expected_contract_version,
            proving_time: self.proving_time,
        }
    }
}

/// Calldata Metadata
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct CalldataMetadata {
    /// Action Kind
    pub kind: TransactionKind,

    /// Amount
    pub amount: U256,

    /// Contract version the calldata was built for
    pub expected_contract_version: ContractVersion,

    /// Time spent proving and verifying
    pub proving_time: Duration,
}
