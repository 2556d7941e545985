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

//! Account State Storage

use crate::{
    account::{AccountState, ActiveAccount},
    crypto::CryptoClient,
    error::Error,
    scalar::Scalar,
};
use alloy_primitives::{B256, U256};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use shielder_util::{future::LocalBoxFutureResult, serde::decimal};
use std::rc::Rc;
use tracing::{debug, warn};

/// Version of the persisted account state record
pub const STORAGE_SCHEMA_VERSION: u32 = 1;

/// Storage Error
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum StorageError {
    /// Backend Error
    #[display(fmt = "storage backend error: {}", _0)]
    Backend(String),

    /// Serialization Error
    #[display(fmt = "failed to serialize account state: {}", _0)]
    Serialization(String),
}

impl std::error::Error for StorageError {}

/// Key-Value Storage
pub trait Storage {
    /// Returns the bytes stored under `key`, if any.
    fn get_item<'s>(&'s self, key: &'s str)
        -> LocalBoxFutureResult<'s, Option<Vec<u8>>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_item<'s>(
        &'s self,
        key: &'s str,
        value: Vec<u8>,
    ) -> LocalBoxFutureResult<'s, (), StorageError>;
}

/// Persisted Account State Record
///
/// Big integers are stored as decimal strings. Empty accounts are stored with a zero nonce.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccountStateRecord {
    /// Account Nonce
    #[serde(with = "decimal")]
    pub nonce: u64,

    /// Shielded Balance
    #[serde(with = "decimal")]
    pub balance: U256,

    /// Hash of the account identifier
    #[serde(with = "decimal")]
    pub id_hash: Scalar,

    /// Current Note
    #[serde(with = "decimal")]
    pub current_note: Scalar,

    /// Current Note Index
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "decimal::option"
    )]
    pub current_note_index: Option<u64>,

    /// Record Schema Version
    pub storage_schema_version: u32,
}

/// Account State Manager
///
/// Owns the identity of the account and reads and writes its persisted state.
pub struct StateManager<S, C> {
    /// Storage Backend
    storage: S,

    /// Crypto Client
    crypto: Rc<C>,

    /// Storage Key
    key: String,

    /// Account Identifier
    id: Scalar,

    /// Hash of the account identifier
    id_hash: Scalar,
}

impl<S, C> StateManager<S, C>
where
    S: Storage,
    C: CryptoClient,
{
    /// Builds a new [`StateManager`] for the account owned by `private_key` on `chain_id`,
    /// persisting under `key` in `storage`.
    #[inline]
    pub async fn new(
        private_key: B256,
        chain_id: u64,
        storage: S,
        crypto: Rc<C>,
        key: String,
    ) -> Result<Self, Error> {
        let id = crypto.derive_id(private_key, chain_id).await?;
        let id_hash = crypto.hash(vec![id]).await?;
        Ok(Self {
            storage,
            crypto,
            key,
            id,
            id_hash,
        })
    }

    /// Returns the account identifier.
    #[inline]
    pub fn id(&self) -> Scalar {
        self.id
    }

    /// Returns the crypto client.
    #[inline]
    pub fn crypto(&self) -> &Rc<C> {
        &self.crypto
    }

    /// Returns a shared reference to the storage backend.
    #[inline]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Returns the empty state of this account.
    #[inline]
    pub fn empty_account_state(&self) -> AccountState {
        AccountState::empty(self.id)
    }

    /// Reads the persisted account state, defaulting to [`empty_account_state`] when nothing
    /// usable is stored.
    ///
    /// # Failure Conditions
    ///
    /// A record written for another account is rejected with [`Error::IdHashMismatch`].
    ///
    /// [`empty_account_state`]: Self::empty_account_state
    #[inline]
    pub async fn account_state(&self) -> Result<AccountState, Error> {
        let Some(bytes) = self.storage.get_item(&self.key).await? else {
            return Ok(self.empty_account_state());
        };
        let record = match serde_json::from_slice::<AccountStateRecord>(&bytes) {
            Ok(record) if record.storage_schema_version == STORAGE_SCHEMA_VERSION => record,
            Ok(record) => {
                warn!(
                    version = record.storage_schema_version,
                    "ignoring account state with unknown schema version"
                );
                return Ok(self.empty_account_state());
            }
            Err(err) => {
                warn!(%err, "ignoring unparsable account state");
                return Ok(self.empty_account_state());
            }
        };
        if record.id_hash != self.id_hash {
            return Err(Error::IdHashMismatch);
        }
        debug!(nonce = record.nonce, "loaded account state");
        if record.nonce == 0 {
            return Ok(self.empty_account_state());
        }
        Ok(AccountState::Active(ActiveAccount {
            id: self.id,
            nonce: record.nonce,
            balance: record.balance,
            current_note: record.current_note,
            current_note_index: record.current_note_index,
        }))
    }

    /// Overwrites the persisted account state with `state`.
    #[inline]
    pub async fn update_account_state(&self, state: &AccountState) -> Result<(), Error> {
        if state.id() != self.id {
            return Err(Error::IdHashMismatch);
        }
        let record = AccountStateRecord {
            nonce: state.nonce(),
            balance: state.balance(),
            id_hash: self.id_hash,
            current_note: state.current_note().unwrap_or(Scalar::ZERO),
            current_note_index: state.current_note_index(),
            storage_schema_version: STORAGE_SCHEMA_VERSION,
        };
        let bytes = serde_json::to_vec(&record)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.storage.set_item(&self.key, bytes).await?;
        debug!(nonce = record.nonce, "persisted account state");
        Ok(())
    }
}
