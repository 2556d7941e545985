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

//! Deposit Action

use crate::{
    account::{AccountState, ContractVersion, TransactionKind},
    action::{on_chain_note_path, Calldata, NoteTransitions},
    chain::{Contract, TransactionRequest, TransactionSender},
    crypto::{CryptoClient, DepositPubInputs, DepositValues},
    error::Error,
    scalar::Scalar,
};
use alloy_primitives::{Address, B256, U256};
use std::{rc::Rc, time::Instant};
use tracing::debug;

/// Deposit Calldata
pub type DepositCalldata = Calldata<DepositPubInputs>;

/// Deposit Action
pub struct DepositAction<C, K> {
    /// Note Transitions
    transitions: NoteTransitions<C>,

    /// Contract
    contract: Rc<K>,
}

impl<C, K> DepositAction<C, K>
where
    C: CryptoClient,
    K: Contract,
{
    /// Builds a new [`DepositAction`].
    #[inline]
    pub fn new(crypto: Rc<C>, contract: Rc<K>, version: ContractVersion) -> Self {
        Self {
            transitions: NoteTransitions::new(crypto, version),
            contract,
        }
    }

    /// Returns the state after depositing `amount`, or `None` if the balance would overflow.
    /// Nothing is sent to the chain.
    #[inline]
    pub async fn raw_deposit(
        &self,
        state: &AccountState,
        amount: U256,
    ) -> Result<Option<AccountState>, Error> {
        self.transitions
            .raw_transition(TransactionKind::Deposit, state, amount)
            .await
    }

    /// Generates verified calldata depositing `amount` into the account.
    ///
    /// # Failure Conditions
    ///
    /// The current note of `state` must be registered on chain, see
    /// [`on_chain_note_path`](crate::action::on_chain_note_path).
    #[inline]
    pub async fn generate_calldata(
        &self,
        state: &AccountState,
        amount: U256,
        expected_contract_version: ContractVersion,
    ) -> Result<DepositCalldata, Error> {
        let kind = TransactionKind::Deposit;
        let new_state = self
            .raw_deposit(state, amount)
            .await?
            .ok_or(Error::BalanceOverflow {
                balance: state.balance(),
                amount,
            })?;
        let (account, raw_path) = on_chain_note_path(&*self.contract, state).await?;
        let (path, merkle_root) = self.transitions.merkle_path_and_root(raw_path).await?;
        let crypto = self.transitions.crypto();
        let old = crypto.derive_secrets(account.id, account.note_nonce()?).await?;
        let new = crypto.derive_secrets(account.id, account.nonce).await?;
        let start = Instant::now();
        let (proof, proved_inputs) = crypto
            .prove_deposit(DepositValues {
                id: account.id,
                nullifier_old: old.nullifier,
                trapdoor_old: old.trapdoor,
                balance_old: Scalar::from_u256(account.balance),
                path,
                value: Scalar::from_u256(amount),
                nullifier_new: new.nullifier,
                trapdoor_new: new.trapdoor,
            })
            .await
            .map_err(|err| Error::proving(kind, err))?;
        let pub_inputs = DepositPubInputs {
            merkle_root,
            h_nullifier_old: self.transitions.hash_one(old.nullifier).await?,
            h_note_new: new_state.current_note().unwrap_or(Scalar::ZERO),
            value: Scalar::from_u256(amount),
        };
        if proved_inputs != pub_inputs {
            return Err(Error::PublicInputsMismatch(kind));
        }
        if !crypto.verify_deposit(proof.clone(), pub_inputs).await? {
            return Err(Error::ProofVerification(kind));
        }
        let proving_time = start.elapsed();
        debug!(?proving_time, nonce = account.nonce, "generated deposit calldata");
        Ok(Calldata {
            pub_inputs,
            proof,
            amount,
            expected_contract_version,
            proving_time,
        })
    }

    /// Encodes `calldata` and submits it with `sender` from the address `from`, attaching the
    /// deposited amount as value.
    #[inline]
    pub async fn send_calldata<T>(
        &self,
        calldata: &DepositCalldata,
        sender: &T,
        from: Address,
    ) -> Result<B256, Error>
    where
        T: TransactionSender + ?Sized,
    {
        let kind = TransactionKind::Deposit;
        let data = self
            .contract
            .deposit_calldata(
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

/// Testing Suite
#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        account::ActiveAccount,
        test::{MockCrypto, SimulatedLedger, TestSender},
    };

    /// Checks that a deposit commits to the next note and is accepted by the contract.
    #[tokio::test]
    async fn deposit_commits_to_next_note() {
        let ledger = SimulatedLedger::default();
        let crypto = Rc::new(MockCrypto::default());
        let action = DepositAction::new(
            crypto.clone(),
            Rc::new(ledger.clone()),
            ContractVersion::SUPPORTED,
        );
        let state = ledger
            .register_account(&crypto, Scalar::from(8), U256::from(10u8))
            .await;
        let amount = U256::from(15u8);
        let next = action
            .raw_deposit(&state, amount)
            .await
            .expect("Transition should succeed.")
            .expect("Deposit should not overflow.");
        assert_eq!(next.balance(), U256::from(25u8));
        assert_eq!(next.nonce(), 2);
        let calldata = action
            .generate_calldata(&state, amount, ContractVersion::SUPPORTED)
            .await
            .expect("Calldata generation should succeed.");
        assert_eq!(Some(calldata.pub_inputs.h_note_new), next.current_note());
        assert_eq!(calldata.pub_inputs.value, Scalar::from_u256(amount));
        let sender = TestSender::new(ledger.clone());
        let from = Address::repeat_byte(0x01);
        action
            .send_calldata(&calldata, &sender, from)
            .await
            .expect("Deposit should be accepted.");
        assert!(
            action.send_calldata(&calldata, &sender, from).await.is_err(),
            "The spent nullifier cannot be used twice."
        );
    }

    /// Checks that an overflowing deposit fails before proving.
    #[tokio::test]
    async fn overflowing_deposit_is_rejected() {
        let ledger = SimulatedLedger::default();
        let crypto = Rc::new(MockCrypto::default());
        let action = DepositAction::new(
            crypto.clone(),
            Rc::new(ledger.clone()),
            ContractVersion::SUPPORTED,
        );
        let state = ledger
            .register_account(&crypto, Scalar::from(8), U256::from(10u8))
            .await;
        let calls = crypto.calls();
        assert!(matches!(
            action
                .generate_calldata(&state, U256::MAX, ContractVersion::SUPPORTED)
                .await,
            Err(Error::BalanceOverflow { .. })
        ));
        assert_eq!(crypto.calls(), calls);
    }

    /// Checks that an active state with a zero nonce is rejected instead of underflowing.
    #[tokio::test]
    async fn zero_nonce_deposit_is_rejected() {
        let ledger = SimulatedLedger::default();
        let crypto = Rc::new(MockCrypto::default());
        let action = DepositAction::new(
            crypto.clone(),
            Rc::new(ledger.clone()),
            ContractVersion::SUPPORTED,
        );
        let state = ledger
            .register_account(&crypto, Scalar::from(8), U256::from(10u8))
            .await;
        let account = state.as_active().expect("Account is active.");
        let state = AccountState::Active(ActiveAccount {
            nonce: 0,
            ..account.clone()
        });
        assert!(matches!(
            action
                .generate_calldata(&state, U256::from(1u8), ContractVersion::SUPPORTED)
                .await,
            Err(Error::AccountNotOnChain(_))
        ));
    }
}
