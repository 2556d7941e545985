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

//! Shielder Client Core
//!
//! Client-side state machine of a shielded-token account: the account state and its note chain,
//! the builders of the three shielder actions, the synchronization of the local state against
//! the on-chain event feed and the protocol fee arithmetic. Proving, chain access, relaying and
//! persistence are external capabilities injected as trait objects or generic parameters.

#![cfg_attr(doc_cfg, feature(doc_cfg))]
#![forbid(rustdoc::broken_intra_doc_links)]
#![forbid(missing_docs)]

extern crate derive_more;

pub mod account;
pub mod action;
pub mod callback;
pub mod chain;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod fees;
pub mod scalar;
pub mod storage;
pub mod sync;

#[cfg(any(feature = "test", test))]
#[cfg_attr(doc_cfg, doc(cfg(feature = "test")))]
pub mod test;

pub use error::Error;
