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

//! HTTP Relayer Client

use crate::chain::relayer::{QuotedFees, RelayRequest, RelayResponse, Relayer, RelayerError};
use alloy_primitives::{Address, B256};
use shielder_util::{
    future::LocalBoxFutureResult,
    http::{self, IntoUrl, KnownUrlClient, Url},
};

/// Relay Route
pub const RELAY_PATH: &str = "relay";

/// Fee Quote Route
pub const QUOTE_FEES_PATH: &str = "quote_fees";

/// Fee Address Route
pub const FEE_ADDRESS_PATH: &str = "fee_address";

/// Converts a transport error into a [`RelayerError`].
#[inline]
fn request_error(err: http::Error) -> RelayerError {
    RelayerError::Request(err.to_string())
}

/// HTTP Relayer Client
#[derive(Clone, Debug)]
pub struct Client(KnownUrlClient);

impl Client {
    /// Builds a new HTTP [`Client`] that connects to `server_url`.
    #[inline]
    pub fn new<U>(server_url: U) -> Result<Self, http::Error>
    where
        U: IntoUrl,
    {
        Ok(Self(KnownUrlClient::new(server_url)?))
    }

    /// Returns the relayer URL.
    #[inline]
    pub fn server_url(&self) -> &Url {
        self.0.server_url()
    }

    /// Sends a `GET` request for `command`, returning the body text of a successful response.
    #[inline]
    async fn get_text(&self, command: &str) -> Result<String, RelayerError> {
        let response = self.0.get_raw(command).await.map_err(request_error)?;
        let success = response.status().is_success();
        let text = response.text().await.map_err(request_error)?;
        if success {
            Ok(text)
        } else {
            Err(RelayerError::from_response_text(text))
        }
    }
}

impl Relayer for Client {
    #[inline]
    fn address(&self) -> LocalBoxFutureResult<'_, Address, RelayerError> {
        Box::pin(async move {
            let text = self.get_text(FEE_ADDRESS_PATH).await?;
            text.trim()
                .trim_matches('"')
                .parse()
                .map_err(|err| RelayerError::Response(format!("invalid fee address: {err}")))
        })
    }

    #[inline]
    fn withdraw(&self, request: RelayRequest) -> LocalBoxFutureResult<'_, B256, RelayerError> {
        Box::pin(async move {
            let response = self
                .0
                .post_raw(RELAY_PATH, &request)
                .await
                .map_err(request_error)?;
            if !response.status().is_success() {
                let text = response.text().await.map_err(request_error)?;
                return Err(RelayerError::from_response_text(text));
            }
            let RelayResponse { tx_hash } = response
                .json()
                .await
                .map_err(|err| RelayerError::Response(err.to_string()))?;
            Ok(tx_hash)
        })
    }

    #[inline]
    fn quote_fees(&self) -> LocalBoxFutureResult<'_, QuotedFees, RelayerError> {
        Box::pin(async move {
            let text = self.get_text(QUOTE_FEES_PATH).await?;
            serde_json::from_str(&text).map_err(|err| RelayerError::Response(err.to_string()))
        })
    }
}
