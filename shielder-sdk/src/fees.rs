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

//! Protocol Fees
//!
//! Fees are charged in basis points of the moved amount and always rounded up, matching the
//! contract's integer arithmetic.

use crate::{chain::Contract, error::Error};
use alloy_primitives::U256;
use core::cell::Cell;
use std::rc::Rc;
use tracing::debug;

/// Basis Points Denominator
pub const MAX_BPS: U256 = U256::from_limbs([10_000, 0, 0, 0]);

/// Protocol Fee Quote
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ProtocolFeeQuote {
    /// Total amount moved, including the protocol fee
    pub amount: U256,

    /// Protocol Fee
    pub protocol_fee: U256,
}

/// Returns `ceil(numerator / denominator)`.
#[inline]
fn div_ceil(numerator: U256, denominator: U256) -> U256 {
    let quotient = numerator / denominator;
    if (numerator % denominator).is_zero() {
        quotient
    } else {
        quotient + U256::from(1u8)
    }
}

/// Computes the protocol fee contained in `amount`, i.e. `ceil(amount * bps / MAX_BPS)`.
///
/// # Note
///
/// The product is split over the quotient and remainder of `amount` by [`MAX_BPS`], so this never
/// overflows for `bps <= MAX_BPS`.
#[inline]
pub fn fee_from_gross(amount: U256, bps: U256) -> ProtocolFeeQuote {
    let quotient = amount / MAX_BPS;
    let remainder = amount % MAX_BPS;
    ProtocolFeeQuote {
        amount,
        protocol_fee: quotient * bps + div_ceil(remainder * bps, MAX_BPS),
    }
}

/// Computes the fee to add on top of `amount` so that the fee on the total is
/// `ceil(amount * bps / (MAX_BPS - bps))`.
///
/// Returns `None` if `bps` is [`MAX_BPS`] or the computation overflows.
#[inline]
pub fn fee_from_net(amount: U256, bps: U256) -> Option<ProtocolFeeQuote> {
    let denominator = MAX_BPS.checked_sub(bps).filter(|d| !d.is_zero())?;
    let protocol_fee = div_ceil(amount.checked_mul(bps)?, denominator);
    Some(ProtocolFeeQuote {
        amount: amount.checked_add(protocol_fee)?,
        protocol_fee,
    })
}

/// Protocol Fee Calculator
///
/// Caches the basis points reported by the contract. They are fetched on first use and can be
/// refreshed explicitly.
pub struct ProtocolFees<K> {
    /// Contract
    contract: Rc<K>,

    /// Cached Deposit Fee
    deposit_fee_bps: Cell<Option<U256>>,

    /// Cached Withdraw Fee
    withdraw_fee_bps: Cell<Option<U256>>,
}

impl<K> ProtocolFees<K>
where
    K: Contract,
{
    /// Builds a new [`ProtocolFees`] calculator reading from `contract`.
    #[inline]
    pub fn new(contract: Rc<K>) -> Self {
        Self {
            contract,
            deposit_fee_bps: Cell::new(None),
            withdraw_fee_bps: Cell::new(None),
        }
    }

    /// Validates fee basis points read from the contract.
    #[inline]
    fn check_bps(bps: U256) -> Result<U256, Error> {
        if bps > MAX_BPS {
            Err(Error::InvalidFeeBps(bps))
        } else {
            Ok(bps)
        }
    }

    /// Fetches the deposit fee from the contract and caches it.
    #[inline]
    pub async fn sync_protocol_deposit_fee_bps(&self) -> Result<U256, Error> {
        let bps = Self::check_bps(self.contract.protocol_deposit_fee_bps().await?)?;
        debug!(%bps, "refreshed protocol deposit fee");
        self.deposit_fee_bps.set(Some(bps));
        Ok(bps)
    }

    /// Fetches the withdrawal fee from the contract and caches it.
    #[inline]
    pub async fn sync_protocol_withdraw_fee_bps(&self) -> Result<U256, Error> {
        let bps = Self::check_bps(self.contract.protocol_withdraw_fee_bps().await?)?;
        debug!(%bps, "refreshed protocol withdraw fee");
        self.withdraw_fee_bps.set(Some(bps));
        Ok(bps)
    }

    /// Computes the protocol fee for depositing `amount`. When `fee_included` is `true` the fee
    /// is taken out of `amount`, otherwise it is added on top.
    #[inline]
    pub async fn deposit_fee(
        &self,
        amount: U256,
        fee_included: bool,
    ) -> Result<ProtocolFeeQuote, Error> {
        let bps = match self.deposit_fee_bps.get() {
            Some(bps) => bps,
            None => self.sync_protocol_deposit_fee_bps().await?,
        };
        Self::quote(amount, bps, fee_included)
    }

    /// Computes the protocol fee for withdrawing `amount`. When `fee_included` is `true` the fee
    /// is taken out of `amount`, otherwise it is added on top.
    #[inline]
    pub async fn withdraw_fee(
        &self,
        amount: U256,
        fee_included: bool,
    ) -> Result<ProtocolFeeQuote, Error> {
        let bps = match self.withdraw_fee_bps.get() {
            Some(bps) => bps,
            None => self.sync_protocol_withdraw_fee_bps().await?,
        };
        Self::quote(amount, bps, fee_included)
    }

    /// Quotes the fee for `amount` at `bps`.
    #[inline]
    fn quote(amount: U256, bps: U256, fee_included: bool) -> Result<ProtocolFeeQuote, Error> {
        if fee_included {
            Ok(fee_from_gross(amount, bps))
        } else {
            fee_from_net(amount, bps).ok_or(Error::FeeOverflow)
        }
    }
}
