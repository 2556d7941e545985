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

//! HTTP Utilities

use serde::Serialize;

#[doc(inline)]
pub use reqwest::{self, Error, IntoUrl, Method, Response, StatusCode, Url};

/// HTTP Client with a Known Server URL
///
/// Every request is sent to `server_url` joined with the command name.
#[derive(Clone, Debug)]
pub struct KnownUrlClient {
    /// Server URL
    server_url: Url,

    /// Base HTTP Client
    client: reqwest::Client,
}

impl KnownUrlClient {
    /// Builds a new client connected to `server_url`.
    #[inline]
    pub fn new<U>(server_url: U) -> Result<Self, Error>
    where
        U: IntoUrl,
    {
        Ok(Self {
            server_url: server_url.into_url()?,
            client: reqwest::Client::new(),
        })
    }

    /// Returns the server URL for `self`.
    #[inline]
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Builds the full URL for `command`.
    #[inline]
    fn url(&self, command: &str) -> String {
        format!(
            "{}/{}",
            self.server_url.as_str().trim_end_matches('/'),
            command.trim_start_matches('/')
        )
    }

    /// Sends a `GET` request for `command` and returns the raw [`Response`].
    #[inline]
    pub async fn get_raw(&self, command: &str) -> Result<Response, Error> {
        self.client.get(self.url(command)).send().await
    }

    /// Sends a `POST` request with a JSON `request` body for `command` and returns the raw
    /// [`Response`].
    #[inline]
    pub async fn post_raw<T>(&self, command: &str, request: &T) -> Result<Response, Error>
    where
        T: Serialize + ?Sized,
    {
        self.client
            .post(self.url(command))
            .json(request)
            .send()
            .await
    }
}
