//! Land Title Registry
//!
//! A single registry authority records land parcels and assigns their first
//! owner. Owners hand parcels on to others, and anyone may verify a parcel's
//! current owner and metadata. Parcel ids exposed by this crate are 1-based.

pub mod errors;
pub mod events;
pub mod identity;
pub mod operation;
pub mod registry;
pub mod storage;
pub mod types;

pub use errors::*;
pub use events::{EventRecord, RegistryEvent};
pub use identity::*;
pub use operation::{Operation, Outcome};
pub use registry::LandRegistry;
pub use storage::{MemoryRegistryStore, RegistryStore, SledRegistryStore};
pub use types::*;
