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

//! Simulated Shielder Contract

use crate::{
    account::{AccountState, ContractVersion, TransactionKind},
    action::{withdraw::calculate_commitment, NoteTransitions},
    chain::{
        relayer::{QuotedFees, RelayRequest, Relayer, RelayerError},
        Contract, ContractError, NoteEvent, TransactionRequest, TransactionSender, WithdrawCall,
    },
    crypto::{DepositPubInputs, NewAccountPubInputs, Proof, WithdrawPubInputs},
    scalar::Scalar,
    test::{
        deposit_proof, digest, merkle_root, new_account_proof, transaction_hash, withdraw_proof,
        MockCrypto, MOCK_ARITY, MOCK_TREE_HEIGHT,
    },
};
use alloy_primitives::{Address, Bytes, B256, U256};
use core::cell::Cell;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use shielder_util::future::LocalBoxFutureResult;
use std::{collections::BTreeMap, rc::Rc, sync::Arc};

/// Number of nodes in a Merkle path, excluding the root
const PATH_NODES: usize = MOCK_TREE_HEIGHT * MOCK_ARITY;

/// Verified call waiting to be executed
#[derive(Clone, Debug)]
enum PendingCall {
    /// Account Creation
    NewAccount {
        /// Public Inputs
        pub_inputs: NewAccountPubInputs,

        /// Deposited Amount
        amount: U256,
    },

    /// Deposit
    Deposit {
        /// Public Inputs
        pub_inputs: DepositPubInputs,

        /// Deposited Amount
        amount: U256,
    },

    /// Withdrawal
    Withdraw {
        /// Public Inputs with the recomputed commitment
        pub_inputs: WithdrawPubInputs,

        /// Call Arguments
        call: WithdrawCall,
    },
}

/// Ledger State
#[derive(Debug)]
struct LedgerState {
    /// Contract Address
    address: Address,

    /// Deployed Version
    version: ContractVersion,

    /// Note Tree Leaves
    leaves: Vec<Scalar>,

    /// Block of every spent nullifier hash and registered identifier hash
    nullifiers: IndexMap<Scalar, u64>,

    /// Roots handed out with Merkle paths
    roots: IndexSet<Scalar>,

    /// Note events by block
    events: BTreeMap<u64, Vec<NoteEvent>>,

    /// Latest Block Number
    block: u64,

    /// Protocol deposit fee in basis points
    deposit_fee_bps: U256,

    /// Protocol withdrawal fee in basis points
    withdraw_fee_bps: U256,

    /// Encoded calls, addressed by their position
    pending: Vec<Option<PendingCall>>,

    /// Number of contract calls served
    calls: usize,

    /// Whether index lookups yield to the executor before answering
    yielding: bool,
}

impl Default for LedgerState {
    #[inline]
    fn default() -> Self {
        Self {
            address: Address::repeat_byte(0x5e),
            version: ContractVersion::SUPPORTED,
            leaves: Default::default(),
            nullifiers: Default::default(),
            roots: Default::default(),
            events: Default::default(),
            block: 0,
            deposit_fee_bps: U256::ZERO,
            withdraw_fee_bps: U256::ZERO,
            pending: Default::default(),
            calls: 0,
            yielding: false,
        }
    }
}

impl LedgerState {
    /// Returns the raw Merkle path of the leaf at `index`.
    #[inline]
    fn path(&mut self, index: u64) -> Option<Vec<Scalar>> {
        let leaf = *self.leaves.get(usize::try_from(index).ok()?)?;
        let mut path = Vec::with_capacity(PATH_NODES + 1);
        path.push(leaf);
        path.extend((1..PATH_NODES as u64).map(|position| {
            let mut seed = [0; 16];
            seed[..8].copy_from_slice(&index.to_le_bytes());
            seed[8..].copy_from_slice(&position.to_le_bytes());
            digest("sibling", &[], &seed)
        }));
        let root = merkle_root(&path);
        self.roots.insert(root);
        path.push(root);
        Some(path)
    }

    /// Checks `expected_version` against the deployed version.
    #[inline]
    fn check_version(&self, expected_version: ContractVersion) -> Result<(), ContractError> {
        if expected_version != self.version {
            return Err(ContractError::VersionRejected(format!(
                "expected {expected_version}, deployed {}",
                self.version
            )));
        }
        Ok(())
    }

    /// Stores `call` and returns its encoding.
    #[inline]
    fn encode(&mut self, call: PendingCall) -> Bytes {
        let position = self.pending.len() as u64;
        self.pending.push(Some(call));
        Bytes::copy_from_slice(&position.to_be_bytes())
    }

    /// Takes the pending call encoded by `data`.
    #[inline]
    fn decode(&mut self, data: &Bytes) -> Result<PendingCall, String> {
        let position = <[u8; 8]>::try_from(data.as_ref())
            .map(u64::from_be_bytes)
            .map_err(|_| String::from("malformed calldata"))?;
        usize::try_from(position)
            .ok()
            .and_then(|position| self.pending.get_mut(position))
            .and_then(Option::take)
            .ok_or_else(|| String::from("unknown or already executed calldata"))
    }

    /// Appends `note` to the tree, marks `nullifier_hash` as spent and emits the note event.
    #[allow(clippy::too_many_arguments)]
    #[inline]
    fn append(
        &mut self,
        kind: TransactionKind,
        amount: U256,
        note: Scalar,
        nullifier_hash: Scalar,
        to: Option<Address>,
        relayer_fee: Option<U256>,
    ) -> Result<B256, String> {
        if self.nullifiers.contains_key(&nullifier_hash) {
            return Err(String::from("nullifier already spent"));
        }
        self.block += 1;
        let block = self.block;
        let index = self.leaves.len() as u64;
        self.leaves.push(note);
        self.nullifiers.insert(nullifier_hash, block);
        let tx_hash = transaction_hash(block, index);
        self.events.entry(block).or_default().push(NoteEvent {
            kind,
            contract_version: self.version,
            amount,
            new_note: note,
            new_note_index: index,
            to,
            relayer_fee,
            tx_hash,
            block,
        });
        Ok(tx_hash)
    }

    /// Checks that `root` was handed out with a Merkle path.
    #[inline]
    fn check_root(&self, root: Scalar) -> Result<(), String> {
        if !self.roots.contains(&root) {
            return Err(String::from("unknown merkle root"));
        }
        Ok(())
    }
}

/// Simulated Ledger
///
/// In-memory shielder contract. Clones share the same state, like connections to a single
/// chain. Calldata encoding checks the version and proof, and [`execute`](Self::execute)
/// applies an encoded call in a fresh block.
#[derive(Clone, Debug, Default)]
pub struct SimulatedLedger(Arc<RwLock<LedgerState>>);

impl SimulatedLedger {
    /// Returns the number of contract calls served so far.
    #[inline]
    pub fn calls(&self) -> usize {
        self.0.read().calls
    }

    /// Returns the latest block number.
    #[inline]
    pub fn block_number(&self) -> u64 {
        self.0.read().block
    }

    /// Sets the protocol fees in basis points.
    #[inline]
    pub fn set_fee_bps(&self, deposit: U256, withdraw: U256) {
        let mut state = self.0.write();
        state.deposit_fee_bps = deposit;
        state.withdraw_fee_bps = withdraw;
    }

    /// Deploys `version`, which is then required by calldata encoding and stamped on events.
    #[inline]
    pub fn set_version(&self, version: ContractVersion) {
        self.0.write().version = version;
    }

    /// Appends `note` to the note tree without emitting an event, returning its index.
    #[inline]
    pub fn push_leaf(&self, note: Scalar) -> u64 {
        let mut state = self.0.write();
        state.leaves.push(note);
        state.leaves.len() as u64 - 1
    }

    /// Makes index lookups yield to the executor once before answering, so that concurrent
    /// tasks interleave at every lookup.
    #[inline]
    pub fn set_yielding(&self, yielding: bool) {
        self.0.write().yielding = yielding;
    }

    /// Yields to the executor if lookups are set to yield.
    #[inline]
    async fn pause(&self) {
        let yielding = self.0.read().yielding;
        if yielding {
            tokio::task::yield_now().await;
        }
    }

    /// Emits a copy of the latest event in the same block.
    #[inline]
    pub fn duplicate_last_event(&self) {
        let mut state = self.0.write();
        if let Some(events) = state.events.values_mut().next_back() {
            if let Some(event) = events.last().cloned() {
                events.push(event);
            }
        }
    }

    /// Executes the call encoded in `transaction`.
    ///
    /// # Failure Conditions
    ///
    /// The calldata must come from this ledger and not be executed yet, the attached value must
    /// match, nullifiers must be fresh and Merkle roots must be known.
    #[inline]
    pub fn execute(&self, transaction: &TransactionRequest) -> Result<B256, String> {
        let mut state = self.0.write();
        if transaction.to != state.address {
            return Err(String::from("transaction is not addressed to the shielder"));
        }
        let call = state.decode(&transaction.data)?;
        let expected_value = match &call {
            PendingCall::NewAccount { amount, .. } | PendingCall::Deposit { amount, .. } => *amount,
            PendingCall::Withdraw { .. } => U256::ZERO,
        };
        if transaction.value != expected_value {
            return Err(format!(
                "attached value {} does not match {expected_value}",
                transaction.value
            ));
        }
        match call {
            PendingCall::NewAccount { pub_inputs, amount } => state.append(
                TransactionKind::NewAccount,
                amount,
                pub_inputs.h_note,
                pub_inputs.h_id,
                None,
                None,
            ),
            PendingCall::Deposit { pub_inputs, amount } => {
                state.check_root(pub_inputs.merkle_root)?;
                state.append(
                    TransactionKind::Deposit,
                    amount,
                    pub_inputs.h_note_new,
                    pub_inputs.h_nullifier_old,
                    None,
                    None,
                )
            }
            PendingCall::Withdraw { pub_inputs, call } => {
                state.check_root(pub_inputs.merkle_root)?;
                state.append(
                    TransactionKind::Withdraw,
                    call.amount,
                    pub_inputs.h_note_new,
                    pub_inputs.h_nullifier_old,
                    Some(call.to),
                    Some(call.relayer_fee),
                )
            }
        }
    }

    /// Registers a new account of `id` with `amount` directly on the ledger, returning its
    /// indexed state.
    #[inline]
    pub async fn register_account(
        &self,
        crypto: &Rc<MockCrypto>,
        id: Scalar,
        amount: U256,
    ) -> AccountState {
        let transitions = NoteTransitions::new(crypto.clone(), ContractVersion::SUPPORTED);
        let empty = AccountState::empty(id);
        let state = transitions
            .raw_transition(TransactionKind::NewAccount, &empty, amount)
            .await
            .expect("Transition should succeed.")
            .expect("New account cannot be insolvent.");
        let h_id = transitions
            .hash_one(id)
            .await
            .expect("Hashing should succeed.");
        let note = state
            .current_note()
            .expect("Active states always have a note.");
        let mut ledger = self.0.write();
        ledger
            .append(
                TransactionKind::NewAccount,
                amount,
                note,
                h_id,
                None,
                None,
            )
            .expect("Account should not be registered yet.");
        state.with_note_index(ledger.leaves.len() as u64 - 1)
    }
}

impl Contract for SimulatedLedger {
    #[inline]
    fn address(&self) -> Address {
        self.0.read().address
    }

    #[inline]
    fn get_merkle_path(
        &self,
        leaf_index: u64,
    ) -> LocalBoxFutureResult<'_, Vec<Scalar>, ContractError> {
        Box::pin(async move {
            let mut state = self.0.write();
            state.calls += 1;
            state
                .path(leaf_index)
                .ok_or_else(|| ContractError::Rpc(format!("no leaf at index {leaf_index}")))
        })
    }

    #[inline]
    fn nullifier_block(
        &self,
        nullifier_hash: Scalar,
    ) -> LocalBoxFutureResult<'_, Option<u64>, ContractError> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.0.write();
            state.calls += 1;
            Ok(state.nullifiers.get(&nullifier_hash).copied())
        })
    }

    #[inline]
    fn get_note_events_from_block(
        &self,
        block: u64,
    ) -> LocalBoxFutureResult<'_, Vec<NoteEvent>, ContractError> {
        Box::pin(async move {
            self.pause().await;
            let mut state = self.0.write();
            state.calls += 1;
            Ok(state.events.get(&block).cloned().unwrap_or_default())
        })
    }

    #[inline]
    fn new_account_calldata(
        &self,
        expected_version: ContractVersion,
        from: Address,
        pub_inputs: NewAccountPubInputs,
        amount: U256,
        proof: Proof,
    ) -> LocalBoxFutureResult<'_, Bytes, ContractError> {
        let _ = from;
        Box::pin(async move {
            let mut state = self.0.write();
            state.calls += 1;
            state.check_version(expected_version)?;
            if pub_inputs.initial_deposit != Scalar::from_u256(amount)
                || proof != new_account_proof(&pub_inputs)
            {
                return Err(ContractError::Rejected("invalid proof".into()));
            }
            Ok(state.encode(PendingCall::NewAccount { pub_inputs, amount }))
        })
    }

    #[inline]
    fn deposit_calldata(
        &self,
        expected_version: ContractVersion,
        from: Address,
        pub_inputs: DepositPubInputs,
        amount: U256,
        proof: Proof,
    ) -> LocalBoxFutureResult<'_, Bytes, ContractError> {
        let _ = from;
        Box::pin(async move {
            let mut state = self.0.write();
            state.calls += 1;
            state.check_version(expected_version)?;
            if pub_inputs.value != Scalar::from_u256(amount) || proof != deposit_proof(&pub_inputs)
            {
                return Err(ContractError::Rejected("invalid proof".into()));
            }
            Ok(state.encode(PendingCall::Deposit { pub_inputs, amount }))
        })
    }

    #[inline]
    fn withdraw_calldata(
        &self,
        expected_version: ContractVersion,
        from: Address,
        call: WithdrawCall,
    ) -> LocalBoxFutureResult<'_, Bytes, ContractError> {
        let _ = from;
        Box::pin(async move {
            let mut state = self.0.write();
            state.calls += 1;
            state.check_version(expected_version)?;
            if call.relayer_fee > call.amount {
                return Err(ContractError::Rejected("relayer fee exceeds amount".into()));
            }
            let pub_inputs = WithdrawPubInputs {
                value: Scalar::from_u256(call.amount),
                commitment: calculate_commitment(
                    expected_version,
                    call.to,
                    call.relayer_address,
                    call.relayer_fee,
                ),
                ..call.pub_inputs
            };
            if call.proof != withdraw_proof(&pub_inputs) {
                return Err(ContractError::Rejected("invalid proof".into()));
            }
            Ok(state.encode(PendingCall::Withdraw { pub_inputs, call }))
        })
    }

    #[inline]
    fn protocol_deposit_fee_bps(&self) -> LocalBoxFutureResult<'_, U256, ContractError> {
        Box::pin(async move {
            let mut state = self.0.write();
            state.calls += 1;
            Ok(state.deposit_fee_bps)
        })
    }

    #[inline]
    fn protocol_withdraw_fee_bps(&self) -> LocalBoxFutureResult<'_, U256, ContractError> {
        Box::pin(async move {
            let mut state = self.0.write();
            state.calls += 1;
            Ok(state.withdraw_fee_bps)
        })
    }
}

/// Test Transaction Sender
///
/// Executes transactions directly on a [`SimulatedLedger`].
#[derive(Clone, Debug)]
pub struct TestSender {
    /// Ledger
    ledger: SimulatedLedger,

    /// Number of accepted transactions
    sent: Cell<usize>,
}

impl TestSender {
    /// Builds a new [`TestSender`] for `ledger`.
    #[inline]
    pub fn new(ledger: SimulatedLedger) -> Self {
        Self {
            ledger,
            sent: Default::default(),
        }
    }

    /// Returns the number of accepted transactions.
    #[inline]
    pub fn sent(&self) -> usize {
        self.sent.get()
    }
}

impl TransactionSender for TestSender {
    type Error = String;

    #[inline]
    fn send_transaction(
        &self,
        transaction: TransactionRequest,
    ) -> LocalBoxFutureResult<'_, B256, Self::Error> {
        Box::pin(async move {
            let tx_hash = self.ledger.execute(&transaction)?;
            self.sent.set(self.sent.get() + 1);
            Ok(tx_hash)
        })
    }
}

/// Mock Relayer
///
/// Submits withdrawals to a [`SimulatedLedger`] with its own address as the relayer.
#[derive(Clone, Debug)]
pub struct MockRelayer {
    /// Ledger
    ledger: SimulatedLedger,

    /// Fee Recipient
    address: Address,

    /// Fee Quote
    fees: QuotedFees,

    /// Number of relayer requests served
    calls: Rc<Cell<usize>>,
}

impl MockRelayer {
    /// Builds a new [`MockRelayer`] for `ledger` quoting `total_fee`.
    #[inline]
    pub fn new(ledger: SimulatedLedger, total_fee: U256) -> Self {
        Self {
            ledger,
            address: Address::repeat_byte(0x7e),
            fees: QuotedFees {
                base_fee: total_fee,
                relay_fee: U256::ZERO,
                total_fee,
            },
            calls: Default::default(),
        }
    }

    /// Returns the number of relayer requests served so far.
    #[inline]
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Counts a served request.
    #[inline]
    fn serve(&self) {
        self.calls.set(self.calls.get() + 1);
    }
}

impl Relayer for MockRelayer {
    #[inline]
    fn address(&self) -> LocalBoxFutureResult<'_, Address, RelayerError> {
        Box::pin(async move {
            self.serve();
            Ok(self.address)
        })
    }

    #[inline]
    fn withdraw(&self, request: RelayRequest) -> LocalBoxFutureResult<'_, B256, RelayerError> {
        Box::pin(async move {
            self.serve();
            let call = WithdrawCall {
                to: request.withdraw_address,
                relayer_address: self.address,
                relayer_fee: request.fee_amount,
                amount: request.amount,
                pub_inputs: WithdrawPubInputs {
                    merkle_root: request.merkle_root,
                    h_nullifier_old: request.nullifier_hash,
                    h_note_new: request.new_note,
                    value: Scalar::from_u256(request.amount),
                    commitment: Scalar::ZERO,
                },
                proof: Bytes::from(request.proof),
            };
            let data = self
                .ledger
                .withdraw_calldata(request.expected_contract_version, self.address, call)
                .await
                .map_err(|err| match err {
                    ContractError::VersionRejected(reason) => {
                        RelayerError::VersionRejected(format!("\"Version mismatch: {reason}\""))
                    }
                    err => RelayerError::Response(err.to_string()),
                })?;
            self.ledger
                .execute(&TransactionRequest {
                    from: self.address,
                    to: self.ledger.address(),
                    data,
                    value: U256::ZERO,
                })
                .map_err(RelayerError::Response)
        })
    }

    #[inline]
    fn quote_fees(&self) -> LocalBoxFutureResult<'_, QuotedFees, RelayerError> {
        Box::pin(async move {
            self.serve();
            Ok(self.fees)
        })
    }
}
