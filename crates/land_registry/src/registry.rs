//! Land registry implementation
//!
//! A single authority registers parcels; the current owner of a parcel may
//! hand it to someone else; anyone may read.

use crate::errors::*;
use crate::events::{EventJournal, EventRecord, RegistryEvent};
use crate::identity::Identity;
use crate::types::*;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Debug)]
struct RegistryState {
    /// Bound once, never changed afterwards
    authority: Option<Identity>,
    /// Append-only; index == `Parcel::id`
    parcels: Vec<Parcel>,
    journal: EventJournal,
}

impl RegistryState {
    fn parcel_index(&self, parcel_id: ParcelId) -> Result<usize> {
        parcel_id
            .to_index()
            .filter(|index| *index < self.parcels.len())
            .ok_or(RegistryError::NotFound { parcel_id })
    }
}

/// Land Registry
///
/// Writers are serialized behind one lock; readers see only committed state.
/// Cloning yields another handle onto the same registry.
#[derive(Debug, Clone)]
pub struct LandRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl LandRegistry {
    /// Create an empty, unbound registry
    pub fn new() -> Self {
        Self::with_state(None, Vec::new())
    }

    /// Rebuild a registry from persisted state. The event journal starts empty.
    ///
    /// Every parcel's `id` must equal its position in `parcels`.
    pub fn from_snapshot(snapshot: RegistrySnapshot) -> Result<Self> {
        if let Some((position, parcel)) = snapshot
            .parcels
            .iter()
            .enumerate()
            .find(|(position, parcel)| parcel.id != *position as u64)
        {
            warn!(
                "Refusing snapshot: parcel at position {} carries id {}",
                position, parcel.id
            );
            return Err(RegistryError::CorruptSnapshot {
                position,
                found: parcel.id,
            });
        }

        Ok(Self::with_state(snapshot.authority, snapshot.parcels))
    }

    fn with_state(authority: Option<Identity>, parcels: Vec<Parcel>) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                authority,
                parcels,
                journal: EventJournal::new(),
            })),
        }
    }

    /// Bind the registry authority.
    ///
    /// Any caller may perform the first binding; whoever gets there first
    /// holds the role for the lifetime of the registry.
    pub fn set_authority(&self, identity: Identity) -> Result<()> {
        let mut state = self.state.write();

        if let Some(authority) = state.authority {
            warn!("Rejected authority rebinding to {}: already {}", identity, authority);
            return Err(RegistryError::AlreadySet { authority });
        }

        state.authority = Some(identity);
        state
            .journal
            .emit(RegistryEvent::AuthoritySet { authority: identity });

        info!("Registry authority bound to {}", identity);
        Ok(())
    }

    /// Register a new parcel. Only the bound authority may call this.
    ///
    /// Returns the external (1-based) id of the new parcel.
    pub fn register_land(
        &self,
        caller: &Identity,
        registration: LandRegistration,
    ) -> Result<ParcelId> {
        let mut state = self.state.write();

        if state.authority.as_ref() != Some(caller) {
            warn!("Rejected land registration by non-authority {}", caller);
            return Err(RegistryError::Unauthorized {
                caller: *caller,
                action: ONLY_AUTHORITY,
            });
        }

        let index = state.parcels.len();
        let parcel_id = ParcelId::from_index(index);

        let LandRegistration {
            location,
            area,
            owner,
            property_id,
        } = registration;

        state.parcels.push(Parcel {
            id: index as u64,
            location: location.clone(),
            area,
            current_owner: owner,
            property_id: property_id.clone(),
            is_registered: true,
        });

        state.journal.emit(RegistryEvent::LandRegistered {
            parcel_id,
            location,
            area,
            owner,
            property_id,
        });

        info!("Land registered: parcel {} owned by {}", parcel_id, owner);
        Ok(parcel_id)
    }

    /// Hand a parcel to `new_owner`. Only the current owner may call this.
    ///
    /// The id is resolved before the owner check, so an unknown id always
    /// fails with `NotFound`. Transferring to oneself succeeds and still
    /// emits an event.
    pub fn transfer_ownership(
        &self,
        caller: &Identity,
        parcel_id: ParcelId,
        new_owner: Identity,
    ) -> Result<()> {
        let mut state = self.state.write();

        let index = match state.parcel_index(parcel_id) {
            Ok(index) => index,
            Err(err) => {
                warn!("Rejected transfer of unknown parcel {}", parcel_id);
                return Err(err);
            }
        };

        let parcel = &mut state.parcels[index];
        if parcel.current_owner != *caller {
            warn!("Rejected transfer of parcel {} by non-owner {}", parcel_id, caller);
            return Err(RegistryError::Unauthorized {
                caller: *caller,
                action: ONLY_CURRENT_OWNER,
            });
        }

        parcel.current_owner = new_owner;
        state.journal.emit(RegistryEvent::OwnershipTransferred {
            parcel_id,
            new_owner,
        });

        info!("Parcel {} transferred from {} to {}", parcel_id, caller, new_owner);
        Ok(())
    }

    /// Look up a parcel by external id
    pub fn verify_land(&self, parcel_id: ParcelId) -> Result<Parcel> {
        let state = self.state.read();
        match state.parcel_index(parcel_id) {
            Ok(index) => Ok(state.parcels[index].clone()),
            Err(err) => {
                warn!("Rejected lookup of unknown parcel {}", parcel_id);
                Err(err)
            }
        }
    }

    /// All parcels in creation order
    pub fn registered_lands(&self) -> Vec<Parcel> {
        self.state.read().parcels.clone()
    }

    /// Parcel at a raw 0-based storage index
    pub fn land_at(&self, index: usize) -> Option<Parcel> {
        self.state.read().parcels.get(index).cloned()
    }

    /// Parcels currently held by `owner`, in creation order
    pub fn lands_owned_by(&self, owner: &Identity) -> Vec<Parcel> {
        self.state
            .read()
            .parcels
            .iter()
            .filter(|parcel| parcel.current_owner == *owner)
            .cloned()
            .collect()
    }

    pub fn land_count(&self) -> usize {
        self.state.read().parcels.len()
    }

    /// The bound authority, if any
    pub fn authority(&self) -> Option<Identity> {
        self.state.read().authority
    }

    pub fn phase(&self) -> RegistryPhase {
        match self.state.read().authority {
            Some(_) => RegistryPhase::Bound,
            None => RegistryPhase::Unbound,
        }
    }

    /// Copy of the full registry state
    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read();
        RegistrySnapshot {
            authority: state.authority,
            parcels: state.parcels.clone(),
        }
    }

    /// Every event emitted by this instance, in commit order
    pub fn events(&self) -> Vec<EventRecord> {
        self.state.read().journal.records().to_vec()
    }

    /// Events with `sequence >= from`
    pub fn events_since(&self, from: u64) -> Vec<EventRecord> {
        self.state.read().journal.since(from)
    }

    /// Live feed of events committed after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.state.read().journal.subscribe()
    }
}

impl Default for LandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> Identity {
        Identity::new([byte; 32])
    }

    fn bound_registry(authority: Identity) -> LandRegistry {
        let registry = LandRegistry::new();
        registry.set_authority(authority).unwrap();
        registry
    }

    #[test]
    fn test_set_authority_once() {
        let registry = LandRegistry::new();
        assert_eq!(registry.phase(), RegistryPhase::Unbound);
        assert_eq!(registry.authority(), None);

        registry.set_authority(id(1)).unwrap();
        assert_eq!(registry.authority(), Some(id(1)));
        assert_eq!(registry.phase(), RegistryPhase::Bound);

        let err = registry.set_authority(id(2)).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadySet { authority } if authority == id(1)));
        assert_eq!(registry.authority(), Some(id(1)));
    }

    #[test]
    fn test_rebinding_same_identity_still_fails() {
        let registry = bound_registry(id(1));
        assert!(matches!(
            registry.set_authority(id(1)),
            Err(RegistryError::AlreadySet { .. })
        ));
    }

    #[test]
    fn test_zero_identity_binds_permanently() {
        let registry = bound_registry(Identity::ZERO);
        assert_eq!(registry.phase(), RegistryPhase::Bound);
        assert!(registry.set_authority(id(1)).is_err());
    }

    #[test]
    fn test_registration_requires_bound_authority() {
        let registry = LandRegistry::new();
        let err = registry
            .register_land(&id(1), LandRegistration::new("Location A", 100, id(2), "PROP123"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { action, .. } if action == ONLY_AUTHORITY));
        assert_eq!(registry.land_count(), 0);
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let registry = bound_registry(id(1));
        let first = registry
            .register_land(&id(1), LandRegistration::new("Location A", 100, id(2), "PROP123"))
            .unwrap();
        let second = registry
            .register_land(&id(1), LandRegistration::new("Location B", 200, id(3), "PROP456"))
            .unwrap();

        assert_eq!(first, ParcelId(1));
        assert_eq!(second, ParcelId(2));

        let stored = registry.land_at(0).unwrap();
        assert_eq!(stored.id, 0);
        assert_eq!(stored.location, "Location A");
        assert!(stored.is_registered);
        assert_eq!(registry.land_at(2), None);
    }

    #[test]
    fn test_transfer_unknown_parcel_is_not_found() {
        let registry = bound_registry(id(1));
        registry
            .register_land(&id(1), LandRegistration::new("Location A", 100, id(2), "PROP123"))
            .unwrap();

        // A stranger asking for a parcel that does not exist sees NotFound, not Unauthorized.
        for parcel_id in [ParcelId(0), ParcelId(2), ParcelId(u64::MAX)] {
            let err = registry
                .transfer_ownership(&id(9), parcel_id, id(9))
                .unwrap_err();
            assert!(matches!(err, RegistryError::NotFound { .. }));
        }
    }

    #[test]
    fn test_transfer_to_self_emits_event() {
        let registry = bound_registry(id(1));
        let parcel_id = registry
            .register_land(&id(1), LandRegistration::new("Location A", 100, id(2), "PROP123"))
            .unwrap();

        registry.transfer_ownership(&id(2), parcel_id, id(2)).unwrap();

        assert_eq!(registry.verify_land(parcel_id).unwrap().current_owner, id(2));
        let last = registry.events().pop().unwrap();
        assert_eq!(
            last.event,
            RegistryEvent::OwnershipTransferred {
                parcel_id,
                new_owner: id(2)
            }
        );
    }

    #[test]
    fn test_authority_cannot_transfer_parcels_it_does_not_own() {
        let registry = bound_registry(id(1));
        let parcel_id = registry
            .register_land(&id(1), LandRegistration::new("Location A", 100, id(2), "PROP123"))
            .unwrap();

        let err = registry
            .transfer_ownership(&id(1), parcel_id, id(1))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unauthorized { action, .. } if action == ONLY_CURRENT_OWNER));
        assert_eq!(registry.verify_land(parcel_id).unwrap().current_owner, id(2));
    }

    #[test]
    fn test_rejections_emit_no_events() {
        let registry = bound_registry(id(1));
        let _ = registry.set_authority(id(2));
        let _ = registry.register_land(&id(2), LandRegistration::new("X", 1, id(2), "P"));
        let _ = registry.transfer_ownership(&id(2), ParcelId(1), id(2));
        assert_eq!(registry.events().len(), 1);
    }

    #[test]
    fn test_lands_owned_by_tracks_transfers() {
        let registry = bound_registry(id(1));
        for (location, owner) in [("A", id(2)), ("B", id(3)), ("C", id(2))] {
            registry
                .register_land(&id(1), LandRegistration::new(location, 10, owner, "P"))
                .unwrap();
        }
        registry.transfer_ownership(&id(2), ParcelId(1), id(3)).unwrap();

        let owned: Vec<_> = registry
            .lands_owned_by(&id(3))
            .into_iter()
            .map(|parcel| parcel.location)
            .collect();
        assert_eq!(owned, vec!["A", "B"]);
        assert_eq!(registry.lands_owned_by(&id(2)).len(), 1);
    }

    #[test]
    fn test_snapshot_restores_state() {
        let registry = bound_registry(id(1));
        registry
            .register_land(&id(1), LandRegistration::new("Location A", 100, id(2), "PROP123"))
            .unwrap();

        let restored = LandRegistry::from_snapshot(registry.snapshot()).unwrap();
        assert_eq!(restored.authority(), Some(id(1)));
        assert_eq!(restored.registered_lands(), registry.registered_lands());
        assert!(restored.events().is_empty());

        let next = restored
            .register_land(&id(1), LandRegistration::new("Location B", 200, id(3), "PROP456"))
            .unwrap();
        assert_eq!(next, ParcelId(2));
    }

    #[test]
    fn test_snapshot_with_misnumbered_parcels_is_refused() {
        let registry = bound_registry(id(1));
        for location in ["Location A", "Location B"] {
            registry
                .register_land(&id(1), LandRegistration::new(location, 100, id(2), "P"))
                .unwrap();
        }

        let mut snapshot = registry.snapshot();
        snapshot.parcels[1].id = u64::MAX;
        let err = LandRegistry::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::CorruptSnapshot { position: 1, found: u64::MAX }
        ));
        assert!(!err.is_rejection());

        let mut reordered = registry.snapshot();
        reordered.parcels.swap(0, 1);
        assert!(LandRegistry::from_snapshot(reordered).is_err());
    }

    #[test]
    fn test_verify_unknown_parcel_leaves_state_untouched() {
        let registry = bound_registry(id(1));
        let before = registry.snapshot();
        assert!(matches!(
            registry.verify_land(ParcelId(1)),
            Err(RegistryError::NotFound { parcel_id: ParcelId(1) })
        ));
        assert_eq!(registry.snapshot(), before);
        assert_eq!(registry.events().len(), 1);
    }

    #[tokio::test]
    async fn test_subscribers_receive_committed_events() {
        let registry = bound_registry(id(1));
        let mut rx = registry.subscribe();

        registry
            .register_land(&id(1), LandRegistration::new("Location A", 100, id(2), "PROP123"))
            .unwrap();

        let record = rx.recv().await.unwrap();
        assert_eq!(record.sequence, 1);
        assert!(matches!(
            record.event,
            RegistryEvent::LandRegistered { parcel_id: ParcelId(1), .. }
        ));
    }
}
