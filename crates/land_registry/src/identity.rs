//! Account identities used for callers, owners and the registry authority.
//!
//! Text form is `i` followed by the 64 lowercase hex digits of the raw key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const PREFIX: char = 'i';

/// Raw identity width.
pub const IDENTITY_BYTES: usize = 32;
/// Length of the text form.
pub const IDENTITY_STRING_LENGTH: usize = 1 + IDENTITY_BYTES * 2;

/// Reasons an identity string fails to parse.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity must begin with 'i'")]
    MissingPrefix,
    #[error("identity must be 65 characters, got {0}")]
    WrongLength(usize),
    #[error("identity payload is not hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// A caller, owner or authority identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(pub [u8; IDENTITY_BYTES]);

impl Identity {
    /// The all-zero identity. Carries no special meaning inside the registry.
    pub const ZERO: Identity = Identity([0u8; IDENTITY_BYTES]);

    pub fn new(bytes: [u8; IDENTITY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl From<[u8; IDENTITY_BYTES]> for Identity {
    fn from(value: [u8; IDENTITY_BYTES]) -> Self {
        Identity(value)
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s.strip_prefix(PREFIX).ok_or(IdentityError::MissingPrefix)?;
        if s.len() != IDENTITY_STRING_LENGTH {
            return Err(IdentityError::WrongLength(s.len()));
        }

        let mut bytes = [0u8; IDENTITY_BYTES];
        hex::decode_to_slice(payload, &mut bytes)?;
        Ok(Identity(bytes))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PREFIX}{}", hex::encode(self.0))
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
