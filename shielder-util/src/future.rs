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

//! Futures Utilities

use core::{future::Future, pin::Pin};
use futures::stream::Stream;

/// Local Box Future
///
/// Futures of this type are not required to be [`Send`] and are meant to be driven on a single
/// thread of execution.
pub type LocalBoxFuture<'f, T = ()> = Pin<Box<dyn 'f + Future<Output = T>>>;

/// Local Box Future Result
pub type LocalBoxFutureResult<'f, T = (), E = ()> = LocalBoxFuture<'f, Result<T, E>>;

/// Local Box Stream
pub type LocalBoxStream<'s, T> = Pin<Box<dyn 's + Stream<Item = T>>>;

/// Local Box Stream over Results
pub type LocalBoxStreamResult<'s, T, E> = LocalBoxStream<'s, Result<T, E>>;
