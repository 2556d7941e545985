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

//! Shielder Client
//!
//! Facade tying the account state, the action builders, the synchronizer and the fee
//! calculator to a single account. Every operation reports its failures to the registered
//! [`ShielderCallbacks`] with the stage and operation in progress before returning them.

use crate::{
    account::{AccountState, ShielderTransaction, TransactionKind},
    action::{
        deposit::DepositAction,
        new_account::NewAccountAction,
        withdraw::{check_withdrawal, WithdrawAction},
        CalldataMetadata,
    },
    callback::{handle_error, Operation, ShielderCallbacks, Stage},
    chain::{
        relayer::{QuotedFees, Relayer},
        Contract, TransactionSender,
    },
    config::ShielderConfig,
    crypto::CryptoClient,
    error::Error,
    fees::ProtocolFees,
    scalar::Scalar,
    storage::{StateManager, Storage},
    sync::StateSynchronizer,
};
use alloy_primitives::{Address, B256, U256};
use futures::TryStreamExt;
use shielder_util::future::LocalBoxStreamResult;
use std::rc::Rc;

/// Shielder Client
pub struct ShielderClient<S, C, K, R, B = ()> {
    /// Client Configuration
    config: ShielderConfig,

    /// Account State Manager
    state_manager: Rc<StateManager<S, C>>,

    /// New Account Action
    new_account: NewAccountAction<C, K>,

    /// Deposit Action
    deposit: DepositAction<C, K>,

    /// Withdraw Action
    withdraw: WithdrawAction<C, K>,

    /// State Synchronizer
    synchronizer: StateSynchronizer<S, C, K>,

    /// Protocol Fees
    protocol_fees: ProtocolFees<K>,

    /// Relayer
    relayer: R,

    /// Callbacks
    callbacks: B,
}

impl<S, C, K, R, B> ShielderClient<S, C, K, R, B>
where
    S: Storage,
    C: CryptoClient,
    K: Contract,
    R: Relayer,
    B: ShielderCallbacks,
{
    /// Builds a new [`ShielderClient`] for the account owned by `private_key`.
    #[inline]
    pub async fn new(
        config: ShielderConfig,
        private_key: B256,
        storage: S,
        crypto: Rc<C>,
        contract: Rc<K>,
        relayer: R,
        callbacks: B,
    ) -> Result<Self, Error> {
        let version = config.contract_version;
        let state_manager = Rc::new(
            StateManager::new(
                private_key,
                config.chain_id,
                storage,
                crypto.clone(),
                config.storage_key.clone(),
            )
            .await?,
        );
        Ok(Self {
            new_account: NewAccountAction::new(crypto.clone(), contract.clone(), version),
            deposit: DepositAction::new(crypto.clone(), contract.clone(), version),
            withdraw: WithdrawAction::new(crypto, contract.clone(), version),
            synchronizer: StateSynchronizer::new(state_manager.clone(), contract.clone(), version),
            protocol_fees: ProtocolFees::new(contract),
            state_manager,
            relayer,
            callbacks,
            config,
        })
    }

    /// Returns the client configuration.
    #[inline]
    pub fn config(&self) -> &ShielderConfig {
        &self.config
    }

    /// Returns the account identifier.
    #[inline]
    pub fn id(&self) -> Scalar {
        self.state_manager.id()
    }

    /// Returns the registered callbacks.
    #[inline]
    pub fn callbacks(&self) -> &B {
        &self.callbacks
    }

    /// Returns the relayer.
    #[inline]
    pub fn relayer(&self) -> &R {
        &self.relayer
    }

    /// Returns the protocol fee calculator.
    #[inline]
    pub fn protocol_fees(&self) -> &ProtocolFees<K> {
        &self.protocol_fees
    }

    /// Reports a failed `result` to the callbacks.
    #[inline]
    fn report<T>(
        &self,
        result: Result<T, Error>,
        stage: Stage,
        operation: Operation,
    ) -> Result<T, Error> {
        if let Err(err) = &result {
            handle_error(&self.callbacks, err, stage, operation);
        }
        result
    }

    /// Reports generated calldata.
    #[inline]
    fn generated(&self, metadata: CalldataMetadata, operation: Operation) {
        self.callbacks.on_calldata_generated(&metadata, operation);
    }

    /// Reports a sent transaction.
    #[inline]
    fn sent(&self, tx_hash: B256, operation: Operation) -> B256 {
        self.callbacks.on_calldata_sent(tx_hash, operation);
        tx_hash
    }

    /// Returns the persisted account state.
    #[inline]
    pub async fn account_state(&self) -> Result<AccountState, Error> {
        self.state_manager.account_state().await
    }

    /// Returns the relayer fee quote for withdrawals.
    #[inline]
    pub async fn withdraw_fees(&self) -> Result<QuotedFees, Error> {
        Ok(self.relayer.quote_fees().await?)
    }

    /// Advances the account state to the latest state on chain, calling
    /// [`ShielderCallbacks::on_new_transaction`] for every applied transaction. Returns the
    /// number of applied transactions.
    #[inline]
    pub async fn sync_shielder(&self) -> Result<usize, Error> {
        let result = self
            .synchronizer
            .sync_account_state(|transaction| self.callbacks.on_new_transaction(transaction))
            .await;
        self.report(result, Stage::Syncing, Operation::Sync)
    }

    /// Returns the full transaction history of the account, rebuilt from the chain without
    /// touching the persisted state.
    #[inline]
    pub fn shielder_transactions(
        &self,
    ) -> LocalBoxStreamResult<'_, ShielderTransaction, Error> {
        Box::pin(
            self.synchronizer
                .shielder_transactions()
                .inspect_err(move |err| {
                    handle_error(&self.callbacks, err, Stage::Syncing, Operation::Sync)
                }),
        )
    }

    /// Shields `amount`, creating the account if it has no note yet and depositing otherwise.
    /// The transaction is sent with `sender` from `from`, which pays `amount`.
    ///
    /// The local state only advances once [`sync_shielder`](Self::sync_shielder) observes the
    /// transaction on chain.
    #[inline]
    pub async fn shield<T>(&self, amount: U256, sender: &T, from: Address) -> Result<B256, Error>
    where
        T: TransactionSender + ?Sized,
    {
        let version = self.config.contract_version;
        let state = self.account_state().await;
        match state {
            Ok(state) if state.nonce() != 0 => {
                let operation = Operation::Deposit;
                let calldata = self.report(
                    self.deposit.generate_calldata(&state, amount, version).await,
                    Stage::Generation,
                    operation,
                )?;
                self.generated(calldata.metadata(TransactionKind::Deposit), operation);
                let tx_hash = self.report(
                    self.deposit.send_calldata(&calldata, sender, from).await,
                    Stage::Sending,
                    operation,
                )?;
                Ok(self.sent(tx_hash, operation))
            }
            state => {
                let operation = Operation::NewAccount;
                let state = self.report(state, Stage::Generation, operation)?;
                let calldata = self.report(
                    self.new_account
                        .generate_calldata(&state, amount, version)
                        .await,
                    Stage::Generation,
                    operation,
                )?;
                self.generated(calldata.metadata(TransactionKind::NewAccount), operation);
                let tx_hash = self.report(
                    self.new_account.send_calldata(&calldata, sender, from).await,
                    Stage::Sending,
                    operation,
                )?;
                Ok(self.sent(tx_hash, operation))
            }
        }
    }

    /// Withdraws `amount` to `to` through the relayer, which receives `total_fee` out of
    /// `amount`.
    #[inline]
    pub async fn withdraw(
        &self,
        amount: U256,
        total_fee: U256,
        to: Address,
    ) -> Result<B256, Error> {
        let operation = Operation::Withdraw;
        let generation = async {
            let state = self.account_state().await?;
            check_withdrawal(&state, amount, total_fee)?;
            let relayer_address = self.relayer.address().await?;
            self.withdraw
                .generate_calldata(
                    &state,
                    amount,
                    relayer_address,
                    total_fee,
                    to,
                    self.config.contract_version,
                )
                .await
        };
        let calldata = self.report(generation.await, Stage::Generation, operation)?;
        self.generated(calldata.calldata.metadata(TransactionKind::Withdraw), operation);
        let tx_hash = self.report(
            self.withdraw
                .send_calldata_with_relayer(&calldata, &self.relayer)
                .await,
            Stage::Sending,
            operation,
        )?;
        Ok(self.sent(tx_hash, operation))
    }

    /// Withdraws `amount` to `to` without a relayer. The transaction is sent with `sender` from
    /// `from`, which pays the gas and is committed as the relayer with a zero fee.
    #[inline]
    pub async fn withdraw_manual<T>(
        &self,
        amount: U256,
        to: Address,
        sender: &T,
        from: Address,
    ) -> Result<B256, Error>
    where
        T: TransactionSender + ?Sized,
    {
        let operation = Operation::Withdraw;
        let generation = async {
            let state = self.account_state().await?;
            self.withdraw
                .generate_calldata(
                    &state,
                    amount,
                    from,
                    U256::ZERO,
                    to,
                    self.config.contract_version,
                )
                .await
        };
        let calldata = self.report(generation.await, Stage::Generation, operation)?;
        self.generated(calldata.calldata.metadata(TransactionKind::Withdraw), operation);
        let tx_hash = self.report(
            self.withdraw.send_calldata(&calldata, sender, from).await,
            Stage::Sending,
            operation,
        )?;
        Ok(self.sent(tx_hash, operation))
    }
}
