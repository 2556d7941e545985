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

//! Relayer Connection

use crate::{account::ContractVersion, scalar::Scalar};
use alloy_primitives::{Address, B256, U256};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use shielder_util::{future::LocalBoxFutureResult, serde::decimal};

#[cfg(feature = "http")]
#[cfg_attr(doc_cfg, doc(cfg(feature = "http")))]
pub mod http;

/// Prefix of relayer responses rejecting the expected contract version
pub const VERSION_MISMATCH_PREFIX: &str = "\"Version mismatch:";

/// Relayer Error
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum RelayerError {
    /// Version Rejected
    #[display(fmt = "version rejected by relayer: {}", _0)]
    VersionRejected(String),

    /// Request Error
    ///
    /// The request could not be delivered.
    #[display(fmt = "{}", _0)]
    Request(String),

    /// Response Error
    ///
    /// The relayer refused the request or returned a malformed response.
    #[display(fmt = "{}", _0)]
    Response(String),
}

impl RelayerError {
    /// Classifies the body of a failed relayer response.
    #[inline]
    pub fn from_response_text(text: String) -> Self {
        if text.starts_with(VERSION_MISMATCH_PREFIX) {
            Self::VersionRejected(text)
        } else {
            Self::Response(text)
        }
    }
}

impl std::error::Error for RelayerError {}

/// Relay Request
///
/// Body of a fee-sponsored withdrawal. The relayer submits the withdrawal with itself as the
/// relayer address and `fee_amount` as the relayer fee.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayRequest {
    /// Expected Contract Version
    pub expected_contract_version: ContractVersion,

    /// Withdrawn Amount
    #[serde(with = "decimal")]
    pub amount: U256,

    /// Withdrawal Destination
    pub withdraw_address: Address,

    /// Merkle Root
    #[serde(with = "decimal")]
    pub merkle_root: Scalar,

    /// Hash of the spent nullifier
    #[serde(with = "decimal")]
    pub nullifier_hash: Scalar,

    /// New Note
    #[serde(with = "decimal")]
    pub new_note: Scalar,

    /// Relayer Fee
    #[serde(with = "decimal")]
    pub fee_amount: U256,

    /// Proof
    pub proof: Vec<u8>,
}

/// Relay Response
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct RelayResponse {
    /// Transaction Hash
    pub tx_hash: B256,
}

/// Quoted Relayer Fees
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub struct QuotedFees {
    /// Base Fee
    #[serde(with = "decimal")]
    pub base_fee: U256,

    /// Relay Fee
    #[serde(with = "decimal")]
    pub relay_fee: U256,

    /// Total Fee
    #[serde(with = "decimal")]
    pub total_fee: U256,
}

/// Relayer Connection
pub trait Relayer {
    /// Returns the address the relayer uses as the fee recipient.
    fn address(&self) -> LocalBoxFutureResult<'_, Address, RelayerError>;

    /// Submits a fee-sponsored withdrawal, returning its transaction hash.
    ///
    /// # Failure Conditions
    ///
    /// Returns [`RelayerError::VersionRejected`] if the relayer does not serve the expected
    /// contract version.
    fn withdraw(&self, request: RelayRequest) -> LocalBoxFutureResult<'_, B256, RelayerError>;

    /// Returns the current fee quote.
    fn quote_fees(&self) -> LocalBoxFutureResult<'_, QuotedFees, RelayerError>;
}
