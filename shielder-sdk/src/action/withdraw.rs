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

//! Withdraw Action

use crate::{
    account::{AccountState, ContractVersion, TransactionKind},
    action::{on_chain_note_path, Calldata, NoteTransitions},
    chain::{
        relayer::{RelayRequest, Relayer},
        Contract, TransactionRequest, TransactionSender, WithdrawCall,
    },
    crypto::{CryptoClient, WithdrawPubInputs, WithdrawValues},
    error::Error,
    scalar::Scalar,
};
use alloy_primitives::{keccak256, Address, B256, U256};
use std::{rc::Rc, time::Instant};
use tracing::debug;

/// Computes the commitment binding a withdrawal to its destination, relayer and relayer fee.
///
/// The commitment is the Keccak-256 hash of the packed big-endian encoding
/// `version (3 bytes) || address || relayer_address || relayer_fee (32 bytes each)`, shifted
/// right by four bits to fit the scalar field.
#[inline]
pub fn calculate_commitment(
    version: ContractVersion,
    address: Address,
    relayer_address: Address,
    relayer_fee: U256,
) -> Scalar {
    let mut packed = Vec::with_capacity(3 + 3 * 32);
    packed.extend_from_slice(&version.to_bytes());
    packed.extend_from_slice(&Scalar::from_address(address).to_u256().to_be_bytes::<32>());
    packed.extend_from_slice(
        &Scalar::from_address(relayer_address)
            .to_u256()
            .to_be_bytes::<32>(),
    );
    packed.extend_from_slice(&relayer_fee.to_be_bytes::<32>());
    let hash = U256::from_be_bytes(keccak256(&packed).0);
    Scalar::from_u256(hash >> 4usize)
}

/// Withdraw Calldata
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawCalldata {
    /// Proved Calldata
    pub calldata: Calldata<WithdrawPubInputs>,

    /// Withdrawal Destination
    pub withdrawal_address: Address,

    /// Relayer Address
    pub relayer_address: Address,

    /// Relayer Fee
    pub relayer_fee: U256,
}

/// Checks that the balance of `state` covers `amount` and that `amount` covers `relayer_fee`.
///
/// Runs on local data only, so callers can reject a withdrawal before contacting the chain or a
/// relayer.
#[inline]
pub fn check_withdrawal(
    state: &AccountState,
    amount: U256,
    relayer_fee: U256,
) -> Result<(), Error> {
    if state.balance() < amount {
        return Err(Error::InsufficientFunds {
            balance: state.balance(),
            amount,
        });
    }
    if amount < relayer_fee {
        return Err(Error::AmountBelowRelayerFee {
            amount,
            fee: relayer_fee,
        });
    }
    Ok(())
}

/// Withdraw Action
pub struct WithdrawAction<C, K> {
    /// Note Transitions
    transitions: NoteTransitions<C>,

    /// Contract
    contract: Rc<K>,
}

impl<C, K> WithdrawAction<C, K>
where
    C: CryptoClient,
    K: Contract,
{
    /// Builds a new [`WithdrawAction`].
    #[inline]
    pub fn new(crypto: Rc<C>, contract: Rc<K>, version: ContractVersion) -> Self {
        Self {
            transitions: NoteTransitions::new(crypto, version),
            contract,
        }
    }

    /// Returns the state after withdrawing `amount`, or `None` if the balance is too small. The
    /// balance check happens before any call to the crypto client. Nothing is sent to the chain.
    #[inline]
    pub async fn raw_withdraw(
        &self,
        state: &AccountState,
        amount: U256,
    ) -> Result<Option<AccountState>, Error> {
        self.transitions
            .raw_transition(TransactionKind::Withdraw, state, amount)
            .await
    }

    /// Generates verified calldata withdrawing `amount` to `withdrawal_address`, of which
    /// `relayer_fee` is paid to `relayer_address`.
    ///
    /// # Failure Conditions
    ///
    /// The balance must cover `amount`, `amount` must cover `relayer_fee` and the current note
    /// of `state` must be registered on chain.
    #[inline]
    pub async fn generate_calldata(
        &self,
        state: &AccountState,
        amount: U256,
        relayer_address: Address,
        relayer_fee: U256,
        withdrawal_address: Address,
        expected_contract_version: ContractVersion,
    ) -> Result<WithdrawCalldata, Error> {
        let kind = TransactionKind::Withdraw;
        let insufficient = || Error::InsufficientFunds {
            balance: state.balance(),
            amount,
        };
        check_withdrawal(state, amount, relayer_fee)?;
        let new_state = self
            .raw_withdraw(state, amount)
            .await?
            .ok_or_else(insufficient)?;
        let (account, raw_path) = on_chain_note_path(&*self.contract, state).await?;
        let (path, merkle_root) = self.transitions.merkle_path_and_root(raw_path).await?;
        let crypto = self.transitions.crypto();
        let old = crypto.derive_secrets(account.id, account.note_nonce()?).await?;
        let new = crypto.derive_secrets(account.id, account.nonce).await?;
        let commitment = calculate_commitment(
            expected_contract_version,
            withdrawal_address,
            relayer_address,
            relayer_fee,
        );
        let start = Instant::now();
        let (proof, proved_inputs) = crypto
            .prove_withdraw(WithdrawValues {
                id: account.id,
                nullifier_old: old.nullifier,
                trapdoor_old: old.trapdoor,
                balance_old: Scalar::from_u256(account.balance),
                path,
                value: Scalar::from_u256(amount),
                nullifier_new: new.nullifier,
                trapdoor_new: new.trapdoor,
                commitment,
            })
            .await
            .map_err(|err| Error::proving(kind, err))?;
        let pub_inputs = WithdrawPubInputs {
            merkle_root,
            h_nullifier_old: self.transitions.hash_one(old.nullifier).await?,
            h_note_new: new_state.current_note().unwrap_or(Scalar::ZERO),
            value: Scalar::from_u256(amount),
            commitment,
        };
        if proved_inputs != pub_inputs {
            return Err(Error::PublicInputsMismatch(kind));
        }
        if !crypto.verify_withdraw(proof.clone(), pub_inputs).await? {
            return Err(Error::ProofVerification(kind));
        }
        let proving_time = start.elapsed();
        debug!(?proving_time, nonce = account.nonce, "generated withdraw calldata");
        Ok(WithdrawCalldata {
            calldata: Calldata {
                pub_inputs,
                proof,
                amount,
                expected_contract_version,
                proving_time,
            },
            withdrawal_address,
            relayer_address,
            relayer_fee,
        })
    }

    /// Submits `calldata` through `relayer`, which pays the gas and collects the relayer fee.
    #[inline]
    pub async fn send_calldata_with_relayer<R>(
        &self,
        calldata: &WithdrawCalldata,
        relayer: &R,
    ) -> Result<B256, Error>
    where
        R: Relayer + ?Sized,
    {
        let WithdrawCalldata {
            calldata: inner,
            withdrawal_address,
            relayer_fee,
            ..
        } = calldata;
        relayer
            .withdraw(RelayRequest {
                expected_contract_version: inner.expected_contract_version,
                amount: inner.amount,
                withdraw_address: *withdrawal_address,
                merkle_root: inner.pub_inputs.merkle_root,
                nullifier_hash: inner.pub_inputs.h_nullifier_old,
                new_note: inner.pub_inputs.h_note_new,
                fee_amount: *relayer_fee,
                proof: inner.proof.to_vec(),
            })
            .await
            .map_err(|err| Error::sending(TransactionKind::Withdraw, err))
    }

    /// Encodes `calldata` and submits it with `sender` from the address `from`.
    #[inline]
    pub async fn send_calldata<T>(
        &self,
        calldata: &WithdrawCalldata,
        sender: &T,
        from: Address,
    ) -> Result<B256, Error>
    where
        T: TransactionSender + ?Sized,
    {
        let kind = TransactionKind::Withdraw;
        let data = self
            .contract
            .withdraw_calldata(
                calldata.calldata.expected_contract_version,
                from,
                WithdrawCall {
                    to: calldata.withdrawal_address,
                    relayer_address: calldata.relayer_address,
                    relayer_fee: calldata.relayer_fee,
                    amount: calldata.calldata.amount,
                    pub_inputs: calldata.calldata.pub_inputs,
                    proof: calldata.calldata.proof.clone(),
                },
            )
            .await
            .map_err(|err| Error::sending(kind, err))?;
        sender
            .send_transaction(TransactionRequest {
                from,
                to: self.contract.address(),
                data,
                value: U256::ZERO,
            })
            .await
            .map_err(|err| Error::Send {
                kind,
                reason: err.to_string(),
            })
    }
}
