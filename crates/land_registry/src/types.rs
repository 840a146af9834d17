//! Types for the land registry

use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// External, 1-based parcel number.
///
/// Storage is 0-based; every id handed to or returned from the registry
/// surface is offset by one from the storage index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(pub u64);

impl ParcelId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// External id for the parcel stored at `index`.
    pub fn from_index(index: usize) -> Self {
        Self(index as u64 + 1)
    }

    /// Storage index, or `None` for the never-valid id 0.
    pub fn to_index(self) -> Option<usize> {
        self.0
            .checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered land parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// 0-based creation sequence number (equals the storage index)
    pub id: u64,
    /// Free-text location description
    pub location: String,
    /// Area measure
    pub area: u64,
    /// Party currently holding the parcel
    pub current_owner: Identity,
    /// External property reference, not checked for uniqueness
    pub property_id: String,
    /// Set at creation; parcels are never removed
    pub is_registered: bool,
}

impl Parcel {
    pub fn external_id(&self) -> ParcelId {
        ParcelId(self.id + 1)
    }
}

/// Land registration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandRegistration {
    pub location: String,
    pub area: u64,
    pub owner: Identity,
    pub property_id: String,
}

impl LandRegistration {
    pub fn new(
        location: impl Into<String>,
        area: u64,
        owner: Identity,
        property_id: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            area,
            owner,
            property_id: property_id.into(),
        }
    }
}

/// Coarse registry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryPhase {
    /// No authority bound yet; only authority binding can succeed
    Unbound,
    /// Authority bound; registration and transfer are live
    Bound,
}

/// Complete registry state, as persisted by a [`crate::storage::RegistryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub authority: Option<Identity>,
    pub parcels: Vec<Parcel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parcel_id_offsets_storage_index() {
        assert_eq!(ParcelId::from_index(0), ParcelId(1));
        assert_eq!(ParcelId(1).to_index(), Some(0));
        assert_eq!(ParcelId(42).to_index(), Some(41));
        assert_eq!(ParcelId(0).to_index(), None);
    }

    #[test]
    fn external_id_follows_sequence() {
        let parcel = Parcel {
            id: 4,
            location: "Location A".into(),
            area: 100,
            current_owner: Identity::ZERO,
            property_id: "PROP123".into(),
            is_registered: true,
        };
        assert_eq!(parcel.external_id(), ParcelId(5));
    }
}
