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

//! Field Elements

use alloy_primitives::{Address, U256};
use core::{fmt, str::FromStr};
use derive_more::Display;

/// Modulus of the BN254 Scalar Field
pub const FIELD_MODULUS: U256 = U256::from_limbs([
    0x43e1f593f0000001,
    0x2833e84879b97091,
    0xb85045b68181585d,
    0x30644e72e131a029,
]);

/// Field Element
///
/// Canonical little-endian encoding of an element of the BN254 scalar field. Arithmetic on
/// scalars belongs to the [`CryptoClient`](crate::crypto::CryptoClient); this type only moves
/// values across its boundary and converts them to and from [`U256`].
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Scalar([u8; 32]);

impl Scalar {
    /// Zero Element
    pub const ZERO: Self = Self([0; 32]);

    /// Builds a scalar from `value` reduced modulo [`FIELD_MODULUS`].
    #[inline]
    pub fn from_u256(value: U256) -> Self {
        Self((value % FIELD_MODULUS).to_le_bytes::<32>())
    }

    /// Builds a scalar from `value` if it is already a canonical field element.
    #[inline]
    pub fn from_canonical_u256(value: U256) -> Option<Self> {
        (value < FIELD_MODULUS).then(|| Self(value.to_le_bytes::<32>()))
    }

    /// Builds a scalar from canonical little-endian `bytes`.
    #[inline]
    pub fn from_bytes(bytes: [u8; 32]) -> Option<Self> {
        Self::from_canonical_u256(U256::from_le_bytes(bytes))
    }

    /// Embeds `address` as an unsigned integer, which always fits in the field.
    #[inline]
    pub fn from_address(address: Address) -> Self {
        Self::from_u256(U256::from_be_slice(address.as_slice()))
    }

    /// Returns the value of `self` as an unsigned integer.
    #[inline]
    pub fn to_u256(&self) -> U256 {
        U256::from_le_bytes(self.0)
    }

    /// Returns the little-endian encoding of `self`.
    #[inline]
    pub const fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Returns a shared reference to the little-endian encoding of `self`.
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<u64> for Scalar {
    #[inline]
    fn from(value: u64) -> Self {
        Self::from_u256(U256::from(value))
    }
}

impl From<Scalar> for U256 {
    #[inline]
    fn from(scalar: Scalar) -> Self {
        scalar.to_u256()
    }
}

impl fmt::Debug for Scalar {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Scalar({})", self.to_u256())
    }
}

impl fmt::Display for Scalar {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.to_u256(), f)
    }
}

/// Scalar Parsing Error
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum ParseScalarError {
    /// Invalid Integer
    #[display(fmt = "invalid integer")]
    InvalidInteger,

    /// Value is not below the field modulus
    #[display(fmt = "value is not a canonical field element")]
    NonCanonical,
}

impl std::error::Error for ParseScalarError {}

impl FromStr for Scalar {
    type Err = ParseScalarError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = U256::from_str(s).map_err(|_| ParseScalarError::InvalidInteger)?;
        Self::from_canonical_u256(value).ok_or(ParseScalarError::NonCanonical)
    }
}
