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

//! Crypto Worker Boundary
//!
//! Exposes a [`CryptoClient`] across a typed request channel: one [`CryptoRequest`] variant per
//! capability method, each carrying the [`Responder`] for its own result type. The
//! [`WorkerClient`] half implements [`CryptoClient`] by sending requests, and [`serve`] drives any
//! concrete backend on the other half until every client is dropped.

use crate::{
    crypto::{
        CryptoClient, CryptoError, DepositPubInputs, DepositValues, NewAccountPubInputs,
        NewAccountValues, Proof, ShielderActionSecrets, WithdrawPubInputs, WithdrawValues,
    },
    scalar::Scalar,
};
use alloy_primitives::B256;
use shielder_util::{
    future::LocalBoxFutureResult,
    message::{Listener, Requester, Responder},
};
use tracing::debug;

/// Crypto Result Type
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Crypto Worker Request
#[derive(Debug)]
pub enum CryptoRequest {
    /// [`CryptoClient::hash`] Request
    Hash {
        /// Inputs
        inputs: Vec<Scalar>,

        /// Responder
        responder: Responder<CryptoResult<Scalar>>,
    },

    /// [`CryptoClient::arity`] Request
    Arity(Responder<CryptoResult<usize>>),

    /// [`CryptoClient::tree_height`] Request
    TreeHeight(Responder<CryptoResult<usize>>),

    /// [`CryptoClient::derive_secrets`] Request
    DeriveSecrets {
        /// Account Identifier
        id: Scalar,

        /// Nonce
        nonce: u64,

        /// Responder
        responder: Responder<CryptoResult<ShielderActionSecrets>>,
    },

    /// [`CryptoClient::private_key_to_scalar`] Request
    PrivateKeyToScalar {
        /// Private Key
        private_key: B256,

        /// Responder
        responder: Responder<CryptoResult<Scalar>>,
    },

    /// [`CryptoClient::derive_id`] Request
    DeriveId {
        /// Private Key
        private_key: B256,

        /// Chain Identifier
        chain_id: u64,

        /// Responder
        responder: Responder<CryptoResult<Scalar>>,
    },

    /// [`CryptoClient::prove_new_account`] Request
    ProveNewAccount {
        /// Circuit Values
        values: NewAccountValues,

        /// Responder
        responder: Responder<CryptoResult<(Proof, NewAccountPubInputs)>>,
    },

    /// [`CryptoClient::verify_new_account`] Request
    VerifyNewAccount {
        /// Proof
        proof: Proof,

        /// Public Inputs
        pub_inputs: NewAccountPubInputs,

        /// Responder
        responder: Responder<CryptoResult<bool>>,
    },

    /// [`CryptoClient::prove_deposit`] Request
    ProveDeposit {
        /// Circuit Values
        values: DepositValues,

        /// Responder
        responder: Responder<CryptoResult<(Proof, DepositPubInputs)>>,
    },

    /// [`CryptoClient::verify_deposit`] Request
    VerifyDeposit {
        /// Proof
        proof: Proof,

        /// Public Inputs
        pub_inputs: DepositPubInputs,

        /// Responder
        responder: Responder<CryptoResult<bool>>,
    },

    /// [`CryptoClient::prove_withdraw`] Request
    ProveWithdraw {
        /// Circuit Values
        values: WithdrawValues,

        /// Responder
        responder: Responder<CryptoResult<(Proof, WithdrawPubInputs)>>,
    },

    /// [`CryptoClient::verify_withdraw`] Request
    VerifyWithdraw {
        /// Proof
        proof: Proof,

        /// Public Inputs
        pub_inputs: WithdrawPubInputs,

        /// Responder
        responder: Responder<CryptoResult<bool>>,
    },
}

/// Builds a new worker channel, returning the client half and the listener to pass to [`serve`].
#[inline]
pub fn channel() -> (WorkerClient, Listener<CryptoRequest>) {
    let (requester, listener) = Requester::channel();
    (WorkerClient { requester }, listener)
}

/// Worker Client
#[derive(Clone, Debug)]
pub struct WorkerClient {
    /// Request Sender
    requester: Requester<CryptoRequest>,
}

impl WorkerClient {
    /// Sends the request built by `message` and waits for the worker's result.
    #[inline]
    fn call<T, F>(&self, message: F) -> LocalBoxFutureResult<'_, T, CryptoError>
    where
        T: 'static,
        F: 'static + FnOnce(Responder<CryptoResult<T>>) -> CryptoRequest,
    {
        Box::pin(async move { self.requester.request(message).await? })
    }
}

impl CryptoClient for WorkerClient {
    #[inline]
    fn hash(&self, inputs: Vec<Scalar>) -> LocalBoxFutureResult<'_, Scalar, CryptoError> {
        self.call(move |responder| CryptoRequest::Hash { inputs, responder })
    }

    #[inline]
    fn arity(&self) -> LocalBoxFutureResult<'_, usize, CryptoError> {
        self.call(CryptoRequest::Arity)
    }

    #[inline]
    fn tree_height(&self) -> LocalBoxFutureResult<'_, usize, CryptoError> {
        self.call(CryptoRequest::TreeHeight)
    }

    #[inline]
    fn derive_secrets(
        &self,
        id: Scalar,
        nonce: u64,
    ) -> LocalBoxFutureResult<'_, ShielderActionSecrets, CryptoError> {
        self.call(move |responder| CryptoRequest::DeriveSecrets {
            id,
            nonce,
            responder,
        })
    }

    #[inline]
    fn private_key_to_scalar(
        &self,
        private_key: B256,
    ) -> LocalBoxFutureResult<'_, Scalar, CryptoError> {
        self.call(move |responder| CryptoRequest::PrivateKeyToScalar {
            private_key,
            responder,
        })
    }

    #[inline]
    fn derive_id(
        &self,
        private_key: B256,
        chain_id: u64,
    ) -> LocalBoxFutureResult<'_, Scalar, CryptoError> {
        self.call(move |responder| CryptoRequest::DeriveId {
            private_key,
            chain_id,
            responder,
        })
    }

    #[inline]
    fn prove_new_account(
        &self,
        values: NewAccountValues,
    ) -> LocalBoxFutureResult<'_, (Proof, NewAccountPubInputs), CryptoError> {
        self.call(move |responder| CryptoRequest::ProveNewAccount { values, responder })
    }

    #[inline]
    fn verify_new_account(
        &self,
        proof: Proof,
        pub_inputs: NewAccountPubInputs,
    ) -> LocalBoxFutureResult<'_, bool, CryptoError> {
        self.call(move |responder| CryptoRequest::VerifyNewAccount {
            proof,
            pub_inputs,
            responder,
        })
    }

    #[inline]
    fn prove_deposit(
        &self,
        values: DepositValues,
    ) -> LocalBoxFutureResult<'_, (Proof, DepositPubInputs), CryptoError> {
        self.call(move |responder| CryptoRequest::ProveDeposit { values, responder })
    }

    #[inline]
    fn verify_deposit(
        &self,
        proof: Proof,
        pub_inputs: DepositPubInputs,
    ) -> LocalBoxFutureResult<'_, bool, CryptoError> {
        self.call(move |responder| CryptoRequest::VerifyDeposit {
            proof,
            pub_inputs,
            responder,
        })
    }

    #[inline]
    fn prove_withdraw(
        &self,
        values: WithdrawValues,
    ) -> LocalBoxFutureResult<'_, (Proof, WithdrawPubInputs), CryptoError> {
        self.call(move |responder| CryptoRequest::ProveWithdraw { values, responder })
    }

    #[inline]
    fn verify_withdraw(
        &self,
        proof: Proof,
        pub_inputs: WithdrawPubInputs,
    ) -> LocalBoxFutureResult<'_, bool, CryptoError> {
        self.call(move |responder| CryptoRequest::VerifyWithdraw {
            proof,
            pub_inputs,
            responder,
        })
    }
}

/// Answers `responder` with `result`, logging if the requester has stopped waiting.
#[inline]
fn reply<T>(method: &'static str, responder: Responder<CryptoResult<T>>, result: CryptoResult<T>) {
    if !responder.respond(result) {
        debug!(method, "crypto request was abandoned before its response");
    }
}

/// Serves requests arriving on `listener` with `backend` until every [`WorkerClient`] attached to
/// the channel has been dropped. Requests are processed one at a time, in arrival order.
pub async fn serve<C>(backend: &C, mut listener: Listener<CryptoRequest>)
where
    C: CryptoClient + ?Sized,
{
    while let Some(request) = listener.next().await {
        match request {
            CryptoRequest::Hash { inputs, responder } => {
                reply("hash", responder, backend.hash(inputs).await)
            }
            CryptoRequest::Arity(responder) => reply("arity", responder, backend.arity().await),
            CryptoRequest::TreeHeight(responder) => {
                reply("tree_height", responder, backend.tree_height().await)
            }
            CryptoRequest::DeriveSecrets {
                id,
                nonce,
                responder,
            } => reply(
                "derive_secrets",
                responder,
                backend.derive_secrets(id, nonce).await,
            ),
            CryptoRequest::PrivateKeyToScalar {
                private_key,
                responder,
            } => reply(
                "private_key_to_scalar",
                responder,
                backend.private_key_to_scalar(private_key).await,
            ),
            CryptoRequest::DeriveId {
                private_key,
                chain_id,
                responder,
            } => reply(
                "derive_id",
                responder,
                backend.derive_id(private_key, chain_id).await,
            ),
            CryptoRequest::ProveNewAccount { values, responder } => reply(
                "prove_new_account",
                responder,
                backend.prove_new_account(values).await,
            ),
            CryptoRequest::VerifyNewAccount {
                proof,
                pub_inputs,
                responder,
            } => reply(
                "verify_new_account",
                responder,
                backend.verify_new_account(proof, pub_inputs).await,
            ),
            CryptoRequest::ProveDeposit { values, responder } => reply(
                "prove_deposit",
                responder,
                backend.prove_deposit(values).await,
            ),
            CryptoRequest::VerifyDeposit {
                proof,
                pub_inputs,
                responder,
            } => reply(
                "verify_deposit",
                responder,
                backend.verify_deposit(proof, pub_inputs).await,
            ),
            CryptoRequest::ProveWithdraw { values, responder } => reply(
                "prove_withdraw",
                responder,
                backend.prove_withdraw(values).await,
            ),
            CryptoRequest::VerifyWithdraw {
                proof,
                pub_inputs,
                responder,
            } => reply(
                "verify_withdraw",
                responder,
                backend.verify_withdraw(proof, pub_inputs).await,
            ),
        }
    }
}
