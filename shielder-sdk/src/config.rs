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

//! Client Configuration

use crate::account::ContractVersion;
use serde::{Deserialize, Serialize};

#[cfg(feature = "http")]
use crate::chain::relayer;

#[cfg(feature = "http")]
use shielder_util::http;

/// Default storage key of the persisted account state
pub const DEFAULT_STORAGE_KEY: &str = "accountState";

/// Shielder Client Configuration
#[cfg_attr(feature = "clap", derive(clap::Parser))]
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShielderConfig {
    /// Chain Identifier
    #[cfg_attr(feature = "clap", clap(long))]
    pub chain_id: u64,

    /// Contract version the client builds calldata for
    #[cfg_attr(feature = "clap", clap(long, default_value_t = ContractVersion::SUPPORTED))]
    #[serde(default)]
    pub contract_version: ContractVersion,

    /// Storage key of the persisted account state
    #[cfg_attr(feature = "clap", clap(long, default_value = DEFAULT_STORAGE_KEY))]
    #[serde(default = "ShielderConfig::default_storage_key")]
    pub storage_key: String,

    /// Relayer URL for fee-sponsored withdrawals
    #[cfg_attr(feature = "clap", clap(long))]
    #[serde(default)]
    pub relayer_url: Option<String>,
}

impl ShielderConfig {
    /// Builds a new configuration for `chain_id` with default settings.
    #[inline]
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            contract_version: ContractVersion::SUPPORTED,
            storage_key: Self::default_storage_key(),
            relayer_url: None,
        }
    }

    /// Builds the HTTP relayer client for [`relayer_url`](Self::relayer_url), returning `None`
    /// when no relayer is configured.
    #[cfg(feature = "http")]
    #[cfg_attr(doc_cfg, doc(cfg(feature = "http")))]
    #[inline]
    pub fn relayer_client(&self) -> Result<Option<relayer::http::Client>, http::Error> {
        self.relayer_url
            .as_deref()
            .map(relayer::http::Client::new)
            .transpose()
    }

    /// Returns the default storage key.
    #[inline]
    fn default_storage_key() -> String {
        DEFAULT_STORAGE_KEY.into()
    }
}
