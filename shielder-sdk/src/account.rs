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

//! Account State

use crate::{chain::NoteEvent, error::Error, scalar::Scalar};
use alloy_primitives::{hex, Address, B256, U256};
use core::{fmt, str::FromStr};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Contract Version
///
/// Three byte tag of the deployed protocol version. Calldata built against one version is
/// rejected by contracts and relayers running another.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContractVersion([u8; 3]);

impl ContractVersion {
    /// Version supported by this client
    pub const SUPPORTED: Self = Self([0x00, 0x00, 0x01]);

    /// Builds a new [`ContractVersion`] from its big-endian `bytes`.
    #[inline]
    pub const fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Returns the big-endian bytes of `self`.
    #[inline]
    pub const fn to_bytes(self) -> [u8; 3] {
        self.0
    }

    /// Returns the version as an integer.
    #[inline]
    pub const fn to_u32(self) -> u32 {
        ((self.0[0] as u32) << 16) | ((self.0[1] as u32) << 8) | self.0[2] as u32
    }

    /// Returns the note version, which is the top byte of the contract version.
    #[inline]
    pub fn note_version(self) -> Scalar {
        Scalar::from(u64::from(self.to_u32() >> 16))
    }
}

impl Default for ContractVersion {
    #[inline]
    fn default() -> Self {
        Self::SUPPORTED
    }
}

impl fmt::Display for ContractVersion {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Contract Version Parsing Error
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "invalid contract version `{}`: expected `0x` followed by six hex digits", _0)]
pub struct ParseContractVersionError(String);

impl std::error::Error for ParseContractVersionError {}

impl FromStr for ContractVersion {
    type Err = ParseContractVersionError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .ok_or_else(|| ParseContractVersionError(s.into()))?;
        let mut bytes = [0; 3];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| ParseContractVersionError(s.into()))?;
        Ok(Self(bytes))
    }
}

impl From<ContractVersion> for String {
    #[inline]
    fn from(version: ContractVersion) -> Self {
        version.to_string()
    }
}

impl TryFrom<String> for ContractVersion {
    type Error = ParseContractVersionError;

    #[inline]
    fn try_from(string: String) -> Result<Self, Self::Error> {
        string.parse()
    }
}

/// Active Account
///
/// An account with at least one note on chain. The note commits to
/// `(note_version, id, nullifier, trapdoor, hash(balance))` where the nullifier and trapdoor are
/// derived from `id` and `nonce - 1` and are never stored.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ActiveAccount {
    /// Account Identifier
    pub id: Scalar,

    /// Number of notes created by this account, at least one
    pub nonce: u64,

    /// Shielded Balance
    pub balance: U256,

    /// Current Note
    pub current_note: Scalar,

    /// Position of the current note in the on-chain Merkle tree, when it has been observed
    pub current_note_index: Option<u64>,
}

impl ActiveAccount {
    /// Returns the nonce the secrets of the current note are derived at.
    ///
    /// # Failure Conditions
    ///
    /// Returns [`Error::AccountNotOnChain`] for a zero nonce, since no note is created at it.
    #[inline]
    pub fn note_nonce(&self) -> Result<u64, Error> {
        self.nonce
            .checked_sub(1)
            .ok_or_else(|| Error::AccountNotOnChain("active account with zero nonce".into()))
    }
}

/// Account State
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum AccountState {
    /// Account without any note
    Empty {
        /// Account Identifier
        id: Scalar,
    },

    /// Account with a current note
    Active(ActiveAccount),
}

impl AccountState {
    /// Builds the [`Empty`](Self::Empty) state for the account with the given `id`.
    #[inline]
    pub const fn empty(id: Scalar) -> Self {
        Self::Empty { id }
    }

    /// Returns the account identifier.
    #[inline]
    pub const fn id(&self) -> Scalar {
        match self {
            Self::Empty { id } => *id,
            Self::Active(account) => account.id,
        }
    }

    /// Returns the account nonce, which is `0` for empty accounts.
    #[inline]
    pub const fn nonce(&self) -> u64 {
        match self {
            Self::Empty { .. } => 0,
            Self::Active(account) => account.nonce,
        }
    }

    /// Returns the shielded balance, which is `0` for empty accounts.
    #[inline]
    pub fn balance(&self) -> U256 {
        match self {
            Self::Empty { .. } => U256::ZERO,
            Self::Active(account) => account.balance,
        }
    }

    /// Returns the current note if the account is active.
    #[inline]
    pub fn current_note(&self) -> Option<Scalar> {
        self.as_active().map(|account| account.current_note)
    }

    /// Returns the on-chain index of the current note if it is known.
    #[inline]
    pub fn current_note_index(&self) -> Option<u64> {
        self.as_active().and_then(|account| account.current_note_index)
    }

    /// Returns a shared reference to the active account if `self` is not empty.
    #[inline]
    pub fn as_active(&self) -> Option<&ActiveAccount> {
        match self {
            Self::Empty { .. } => None,
            Self::Active(account) => Some(account),
        }
    }

    /// Returns `true` if `self` is [`Empty`](Self::Empty).
    #[inline]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// Returns a copy of `self` with the current note index set to `index`. Empty states are
    /// returned unchanged.
    #[inline]
    pub fn with_note_index(self, index: u64) -> Self {
        match self {
            Self::Active(account) => Self::Active(ActiveAccount {
                current_note_index: Some(index),
                ..account
            }),
            empty => empty,
        }
    }
}

impl From<ActiveAccount> for AccountState {
    #[inline]
    fn from(account: ActiveAccount) -> Self {
        Self::Active(account)
    }
}

/// Transaction Kind
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq, Deserialize, Serialize)]
pub enum TransactionKind {
    /// Account Creation with an initial deposit
    NewAccount,

    /// Deposit into an existing account
    Deposit,

    /// Withdrawal from an existing account
    Withdraw,
}

impl TransactionKind {
    /// Returns the noun used when reporting proving failures.
    #[inline]
    pub const fn proof_name(self) -> &'static str {
        match self {
            Self::NewAccount => "new account",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdrawal",
        }
    }

    /// Returns the verb used when reporting submission failures.
    #[inline]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::NewAccount => "create new account",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }

    /// Returns `true` if transactions of this kind can be applied to `state`.
    #[inline]
    pub const fn applies_to(self, state: &AccountState) -> bool {
        match self {
            Self::NewAccount => state.is_empty(),
            Self::Deposit | Self::Withdraw => !state.is_empty(),
        }
    }
}

/// Shielder Transaction
///
/// Normalized record of an on-chain event that advanced the account.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ShielderTransaction {
    /// Transaction Kind
    pub kind: TransactionKind,

    /// Amount moved by the transaction
    pub amount: U256,

    /// Withdrawal Destination
    pub to: Option<Address>,

    /// Fee paid to the relayer of a withdrawal
    pub relayer_fee: Option<U256>,

    /// Note created by the transaction
    #[serde(with = "shielder_util::serde::decimal")]
    pub new_note: Scalar,

    /// Transaction Hash
    pub tx_hash: B256,

    /// Block Number
    pub block: u64,
}

impl From<&NoteEvent> for ShielderTransaction {
    #[inline]
    fn from(event: &NoteEvent) -> Self {
        Self {
            kind: event.kind,
            amount: event.amount,
            to: event.to,
            relayer_fee: event.relayer_fee,
            new_note: event.new_note,
            tx_hash: event.tx_hash,
            block: event.block,
        }
    }
}

/// Testing Suite
#[cfg(test)]
mod test {
    use super::*;

    /// Checks the text encoding of contract versions and the derived note version.
    #[test]
    fn contract_version_encoding() {
        let version: ContractVersion = "0x000001".parse().expect("Version should parse.");
        assert_eq!(version, ContractVersion::SUPPORTED);
        assert_eq!(version.to_string(), "0x000001");
        assert_eq!(version.note_version(), Scalar::ZERO);
        assert_eq!(
            ContractVersion::new([0x02, 0x00, 0x07]).note_version(),
            Scalar::from(2),
            "Note version is the top byte."
        );
        assert!("000001".parse::<ContractVersion>().is_err());
        assert!("0x0001".parse::<ContractVersion>().is_err());
    }

    /// Checks lifecycle accessors and kind applicability.
    #[test]
    fn lifecycle_accessors() {
        let empty = AccountState::empty(Scalar::from(9));
        assert_eq!(empty.nonce(), 0);
        assert_eq!(empty.balance(), U256::ZERO);
        assert_eq!(empty.current_note_index(), None);
        assert!(TransactionKind::NewAccount.applies_to(&empty));
        assert!(!TransactionKind::Deposit.applies_to(&empty));
        let active = AccountState::from(ActiveAccount {
            id: Scalar::from(9),
            nonce: 1,
            balance: U256::from(5u8),
            current_note: Scalar::from(77),
            current_note_index: None,
        })
        .with_note_index(4);
        assert_eq!(active.current_note_index(), Some(4));
        assert_eq!(active.id(), empty.id());
        assert!(TransactionKind::Withdraw.applies_to(&active));
        assert!(!TransactionKind::NewAccount.applies_to(&active));
    }

    /// Checks that a zero nonce has no note to derive secrets for.
    #[test]
    fn zero_nonce_has_no_note() {
        let mut account = ActiveAccount {
            id: Scalar::from(9),
            nonce: 3,
            balance: U256::ZERO,
            current_note: Scalar::from(77),
            current_note_index: Some(2),
        };
        assert_eq!(account.note_nonce(), Ok(2));
        account.nonce = 0;
        assert!(matches!(account.note_nonce(), Err(Error::AccountNotOnChain(_))));
    }
}
