// 32-byte opaque identifiers, hex-encoded at the edges.
//
// Modeled on tos_common::crypto::hash::Hash: a fixed-size byte array with
// hex Display/FromStr and serde support, but these ids are assigned by
// callers (not derived by hashing content).

use serde::{de::Error as SerdeError, Deserialize, Deserializer, Serialize, Serializer};
use std::{
    convert::TryInto,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

pub const ID_SIZE: usize = 32;

macro_rules! hex_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; ID_SIZE]);

        impl $name {
            pub const fn new(bytes: [u8; ID_SIZE]) -> Self {
                $name(bytes)
            }

            pub const fn zero() -> Self {
                $name([0u8; ID_SIZE])
            }

            pub fn as_bytes(&self) -> &[u8; ID_SIZE] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Derive an id deterministically from arbitrary bytes, e.g. a
            /// caller-supplied idempotency key. Not a cryptographic
            /// commitment — just a stable, collision-resistant-enough map
            /// into the id space for tests and adapters that don't already
            /// have a 32-byte handle.
            pub fn from_bytes_lossy(data: &[u8]) -> Self {
                let mut out = [0u8; ID_SIZE];
                for (i, chunk) in data.chunks(ID_SIZE).enumerate() {
                    for (j, b) in chunk.iter().enumerate() {
                        out[j] ^= b.wrapping_add(i as u8);
                    }
                }
                $name(out)
            }
        }

        impl FromStr for $name {
            type Err = &'static str;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|_| "invalid hex string")?;
                let bytes: [u8; ID_SIZE] = bytes.try_into().map_err(|_| "wrong id length")?;
                Ok($name(bytes))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                $name::from_str(&s).map_err(D::Error::custom)
            }
        }
    };
}

hex_id!(UserId);
hex_id!(EventId);
