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

//! New Account Action

use crate::{
    account::{AccountState, ContractVersion, TransactionKind},
    action::{Calldata, NoteTransitions},
    chain::{Contract, TransactionRequest, TransactionSender},
    crypto::{CryptoClient, NewAccountPubInputs, NewAccountValues},
    error::Error,
    scalar::Scalar,
};
use alloy_primitives::{Address, B256, U256};
use std::{rc::Rc, time::Instant};
use tracing::debug;

/// New Account Calldata
pub type NewAccountCalldata = Calldata<NewAccountPubInputs>;

/// New Account Action
pub struct NewAccountAction<C, K> {
    /// Note Transitions
    transitions: NoteTransitions<C>,

    /// Contract
    contract: Rc<K>,
}

impl<C, K> NewAccountAction<C, K>
where
    C: CryptoClient,
    K: Contract,
{
    /// Builds a new [`NewAccountAction`].
    #[inline]
    pub fn new(crypto: Rc<C>, contract: Rc<K>, version: ContractVersion) -> Self {
        Self {
            transitions: NoteTransitions::new(crypto, version),
            contract,
        }
    }

    /// Returns the state after creating the account with an initial deposit of `amount`. Nothing
    /// is sent to the chain.
    #[inline]
    pub async fn raw_new_account(
        &self,
        state: &AccountState,
        amount: U256,
    ) -> Result<Option<AccountState>, Error> {
        self.transitions
            .raw_transition(TransactionKind::NewAccount, state, amount)
            .await
    }

    /// Computes the public inputs of the account creation circuit.
    #[inline]
    pub async fn prepare_pub_inputs(
        &self,
        state: &AccountState,
        amount: U256,
    ) -> Result<NewAccountPubInputs, Error> {
        let h_note = self
            .raw_new_account(state, amount)
            .await?
            .and_then(|state| state.current_note())
            .ok_or(Error::BalanceOverflow {
                balance: state.balance(),
                amount,
            })?;
        Ok(NewAccountPubInputs {
            h_note,
            h_id: self.transitions.hash_one(state.id()).await?,
            initial_deposit: Scalar::from_u256(amount),
        })
    }

    /// Generates verified calldata creating the account with an initial deposit of `amount`.
    #[inline]
    pub async fn generate_calldata(
        &self,
        state: &AccountState,
        amount: U256,
        expected_contract_version: ContractVersion,
    ) -> Result<Calldata<NewAccountPubInputs>, Error> {
        let kind = TransactionKind::NewAccount;
        let crypto = self.transitions.crypto();
        let secrets = crypto.derive_secrets(state.id(), state.nonce()).await?;
        let start = Instant::now();
        let (proof, proved_inputs) = crypto
            .prove_new_account(NewAccountValues {
                id: state.id(),
                nullifier: secrets.nullifier,
                trapdoor: secrets.trapdoor,
                initial_deposit: Scalar::from_u256(amount),
            })
            .await
            .map_err(|err| Error::proving(kind, err))?;
        let pub_inputs = self.prepare_pub_inputs(state, amount).await?;
        if proved_inputs != pub_inputs {
            return Err(Error::PublicInputsMismatch(kind));
        }
        if !crypto
            .verify_new_account(proof.clone(), pub_inputs)
            .await?
        {
            return Err(Error::ProofVerification(kind));
        }
        let proving_time = start.elapsed();
        debug!(?proving_time, "generated new account calldata");
        Ok(Calldata {
            pub_inputs,
            proof,
            amount,
            expected_contract_version,
            proving_time,
        })
    }

    /// Encodes `calldata` and submits it with `sender` from the address `from`, attaching the
    /// initial deposit as value.
    #[inline]
    pub async fn send_calldata<T>(
        &self,
        calldata: &NewAccountCalldata,
        sender: &T,
        from: Address,
    ) -> Result<B256, Error>
    where
        T: TransactionSender + ?Sized,
    {
        let kind = TransactionKind::NewAccount;
        let data = self
            .contract
            .new_account_calldata(
                calldata.expected_contract_version,
                from,
                calldata.pub_inputs,
                calldata.amount,
                calldata.proof.clone(),
            )
            .await
            .map_err(|err| Error::sending(kind, err))?;
        sender
            .send_transaction(TransactionRequest {
                from,
                to: self.contract.address(),
                data,
                value: calldata.amount,
            })
            .await
            .map_err(|err| Error::Send {
                kind,
                reason: err.to_string(),
            })
    }
}
