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

//! Chain Event Filter

use crate::{
    account::{AccountState, ContractVersion},
    action::NoteTransitions,
    chain::NoteEvent,
    crypto::CryptoClient,
    error::Error,
    sync::InconsistencyError,
};
use std::rc::Rc;

/// State Events Filter
///
/// Selects the on-chain events that legitimately continue a given account state by recomputing
/// the transition each event claims and comparing the resulting note with the event's note.
#[derive(derivative::Derivative)]
#[derivative(Clone(bound = ""), Debug(bound = "C: core::fmt::Debug"))]
pub struct StateEventsFilter<C> {
    /// Note Transitions
    transitions: NoteTransitions<C>,
}

impl<C> StateEventsFilter<C>
where
    C: CryptoClient,
{
    /// Builds a new [`StateEventsFilter`].
    #[inline]
    pub fn new(crypto: Rc<C>, version: ContractVersion) -> Self {
        Self {
            transitions: NoteTransitions::new(crypto, version),
        }
    }

    /// Computes the state `event` would produce from `state`, without the note index.
    #[inline]
    async fn transition(
        &self,
        state: &AccountState,
        event: &NoteEvent,
    ) -> Result<Option<AccountState>, Error> {
        if !event.kind.applies_to(state) {
            return Ok(None);
        }
        self.transitions
            .raw_transition(event.kind, state, event.amount)
            .await
    }

    /// Returns the events among `events` whose note is the one `state` would produce for the
    /// event's kind and amount.
    #[inline]
    pub async fn state_changing_events<I>(
        &self,
        state: &AccountState,
        events: I,
    ) -> Result<Vec<NoteEvent>, Error>
    where
        I: IntoIterator<Item = NoteEvent>,
    {
        let mut matching = Vec::new();
        for event in events {
            let next = self.transition(state, &event).await?;
            if next.and_then(|next| next.current_note()) == Some(event.new_note) {
                matching.push(event);
            }
        }
        Ok(matching)
    }

    /// Applies `event` to `state`, stamping the note index carried by the event.
    ///
    /// # Failure Conditions
    ///
    /// Fails with [`InconsistencyError::InvalidTransition`] if `event` does not continue `state`.
    #[inline]
    pub async fn new_state_by_event(
        &self,
        state: &AccountState,
        event: &NoteEvent,
    ) -> Result<AccountState, Error> {
        match self.transition(state, event).await? {
            Some(next) if next.current_note() == Some(event.new_note) => {
                Ok(next.with_note_index(event.new_note_index))
            }
            _ => Err(InconsistencyError::InvalidTransition { block: event.block }.into()),
        }
    }
}
