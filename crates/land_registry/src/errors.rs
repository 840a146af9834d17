//! Error types for the land registry

use crate::identity::Identity;
use crate::types::ParcelId;
use thiserror::Error;

/// Rejection message for registration attempts by anyone but the authority.
pub const ONLY_AUTHORITY: &str = "Only registry authority can perform this action";
/// Rejection message for transfers attempted by anyone but the current owner.
pub const ONLY_CURRENT_OWNER: &str = "Only current owner can transfer ownership";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Registry authority address already set: {authority}")]
    AlreadySet { authority: Identity },

    #[error("{action} (caller {caller})")]
    Unauthorized {
        caller: Identity,
        action: &'static str,
    },

    #[error("Land does not exist: {parcel_id}")]
    NotFound { parcel_id: ParcelId },

    #[error("Corrupt snapshot: parcel at position {position} carries id {found}")]
    CorruptSnapshot { position: usize, found: u64 },

    #[error("Registry storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    /// True for the state-machine rejections, false for persistence failures.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RegistryError::AlreadySet { .. }
                | RegistryError::Unauthorized { .. }
                | RegistryError::NotFound { .. }
        )
    }
}

impl From<sled::Error> for RegistryError {
    fn from(err: sled::Error) -> Self {
        RegistryError::Storage(err.into())
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
