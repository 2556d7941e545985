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

//! Serde Utilities

/// Decimal String Encoding
///
/// Serializes values through their [`Display`](core::fmt::Display) implementation and parses them
/// back with [`FromStr`](core::str::FromStr). Use it with `#[serde(with = "decimal")]` for big
/// integers which would otherwise lose precision in formats like JSON.
pub mod decimal {
    use core::{fmt::Display, str::FromStr};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serializes `value` as a decimal string.
    #[inline]
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    /// Deserializes a value from a decimal string.
    #[inline]
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(de::Error::custom)
    }

    /// Optional Decimal String Encoding
    pub mod option {
        use core::{fmt::Display, str::FromStr};
        use serde::{de, Deserialize, Deserializer, Serializer};

        /// Serializes `value` as an optional decimal string.
        #[inline]
        pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
        where
            T: Display,
            S: Serializer,
        {
            match value {
                Some(value) => serializer.collect_str(value),
                None => serializer.serialize_none(),
            }
        }

        /// Deserializes an optional value from a decimal string.
        #[inline]
        pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
        where
            T: FromStr,
            T::Err: Display,
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|string| string.parse().map_err(de::Error::custom))
                .transpose()
        }
    }
}
