//! Registry notifications
//!
//! Every committed state transition produces exactly one event. Events are
//! appended to an in-memory journal in commit order and fanned out to live
//! subscribers.

use crate::identity::Identity;
use crate::types::ParcelId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the live subscriber channel. Slow subscribers observe
/// `RecvError::Lagged` and can catch up from the journal.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum RegistryEvent {
    AuthoritySet {
        authority: Identity,
    },
    LandRegistered {
        parcel_id: ParcelId,
        location: String,
        area: u64,
        owner: Identity,
        property_id: String,
    },
    OwnershipTransferred {
        parcel_id: ParcelId,
        new_owner: Identity,
    },
}

/// An event together with its position in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    #[serde(flatten)]
    pub event: RegistryEvent,
}

/// Ordered event journal plus broadcast fan-out.
#[derive(Debug)]
pub(crate) struct EventJournal {
    records: Vec<EventRecord>,
    sender: broadcast::Sender<EventRecord>,
}

impl EventJournal {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: Vec::new(),
            sender,
        }
    }

    pub(crate) fn emit(&mut self, event: RegistryEvent) -> EventRecord {
        let record = EventRecord {
            sequence: self.records.len() as u64,
            event,
        };
        self.records.push(record.clone());
        // No receivers is fine; the journal keeps the record.
        let _ = self.sender.send(record.clone());
        record
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    pub(crate) fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub(crate) fn since(&self, sequence: u64) -> Vec<EventRecord> {
        let start = usize::try_from(sequence).unwrap_or(usize::MAX);
        self.records.get(start..).map(<[_]>::to_vec).unwrap_or_default()
    }
}
