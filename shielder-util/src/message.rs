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

//! Message-Passing Utilities
//!
//! Request/response pairs over an asynchronous queue. Every request message carries its own
//! [`Responder`], so the reply type is fixed by the request variant that was sent.

use core::fmt;
use futures::{
    channel::{mpsc, oneshot},
    stream::StreamExt,
};

/// Channel Error
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ChannelError {
    /// Write Error
    ///
    /// The receiving end of the request queue was dropped before the request could be sent.
    Write,

    /// Read Error
    ///
    /// The [`Responder`] attached to the request was dropped without a reply.
    Read,
}

impl fmt::Display for ChannelError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Write => write!(f, "request channel is closed"),
            Self::Read => write!(f, "request was dropped without a response"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Response Handle
#[derive(Debug)]
pub struct Responder<T>(oneshot::Sender<T>);

impl<T> Responder<T> {
    /// Sends `response` back to the requester, returning `false` if the requester is no longer
    /// waiting for it.
    #[inline]
    pub fn respond(self, response: T) -> bool {
        self.0.send(response).is_ok()
    }
}

/// Request Sender
#[derive(Debug)]
pub struct Requester<M>(mpsc::UnboundedSender<M>);

impl<M> Requester<M> {
    /// Builds a new request channel, returning the [`Requester`] half and the [`Listener`] half.
    #[inline]
    pub fn channel() -> (Self, Listener<M>) {
        let (sender, receiver) = mpsc::unbounded();
        (Self(sender), Listener(receiver))
    }

    /// Sends the message built by `message` from a fresh [`Responder`] and waits for the reply.
    #[inline]
    pub async fn request<T, F>(&self, message: F) -> Result<T, ChannelError>
    where
        F: FnOnce(Responder<T>) -> M,
    {
        let (sender, receiver) = oneshot::channel();
        self.0
            .unbounded_send(message(Responder(sender)))
            .map_err(|_| ChannelError::Write)?;
        receiver.await.map_err(|_| ChannelError::Read)
    }

    /// Returns `true` if the [`Listener`] half has been dropped.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

impl<M> Clone for Requester<M> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Request Listener
#[derive(Debug)]
pub struct Listener<M>(mpsc::UnboundedReceiver<M>);

impl<M> Listener<M> {
    /// Waits for the next request, returning `None` once every [`Requester`] has been dropped.
    #[inline]
    pub async fn next(&mut self) -> Option<M> {
        self.0.next().await
    }
}

/// Testing Suite
#[cfg(test)]
mod test {
    use super::*;
    use futures::join;

    /// Doubling Service Message
    enum Message {
        Double(u64, Responder<u64>),
    }

    /// Serves double requests until the requesters are gone.
    async fn serve(mut listener: Listener<Message>) -> usize {
        let mut served = 0;
        while let Some(Message::Double(value, responder)) = listener.next().await {
            responder.respond(2 * value);
            served += 1;
        }
        served
    }

    /// Checks that requests are answered through their own responder.
    #[tokio::test]
    async fn requests_are_answered_in_order() {
        let (requester, listener) = Requester::channel();
        let client = async move {
            let a = requester.request(|r| Message::Double(3, r)).await;
            let b = requester.clone().request(|r| Message::Double(21, r)).await;
            (a, b)
        };
        let ((a, b), served) = join!(client, serve(listener));
        assert_eq!(a, Ok(6), "First request should be doubled.");
        assert_eq!(b, Ok(42), "Second request should be doubled.");
        assert_eq!(served, 2, "Listener should have served both requests.");
    }

    /// Checks that a closed listener is reported as a write error.
    #[tokio::test]
    async fn closed_listener_is_write_error() {
        let (requester, listener) = Requester::<Message>::channel();
        drop(listener);
        assert!(requester.is_closed());
        assert_eq!(
            requester.request(|r| Message::Double(1, r)).await,
            Err(ChannelError::Write),
            "Sending to a dropped listener must fail on write."
        );
    }

    /// Checks that a dropped responder is reported as a read error.
    #[tokio::test]
    async fn dropped_responder_is_read_error() {
        let (requester, mut listener) = Requester::<Message>::channel();
        let server = async move {
            if let Some(Message::Double(_, responder)) = listener.next().await {
                drop(responder);
            }
        };
        let (result, _) = join!(requester.request(|r| Message::Double(1, r)), server);
        assert_eq!(result, Err(ChannelError::Read));
    }
}
