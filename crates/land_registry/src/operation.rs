//! Ordered operation log
//!
//! The registry treats its input as an already-ordered sequence of
//! operations. Each one is committed or rejected in full before the next.

use crate::errors::Result;
use crate::identity::Identity;
use crate::registry::LandRegistry;
use crate::types::{LandRegistration, ParcelId};
use serde::{Deserialize, Serialize};

/// A state-changing registry operation together with its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    SetAuthority {
        identity: Identity,
    },
    RegisterLand {
        caller: Identity,
        registration: LandRegistration,
    },
    TransferOwnership {
        caller: Identity,
        parcel_id: ParcelId,
        new_owner: Identity,
    },
}

/// Result of a committed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    AuthoritySet,
    Registered(ParcelId),
    Transferred,
}

impl LandRegistry {
    /// Apply a single operation
    pub fn apply(&self, operation: &Operation) -> Result<Outcome> {
        match operation {
            Operation::SetAuthority { identity } => {
                self.set_authority(*identity).map(|_| Outcome::AuthoritySet)
            }
            Operation::RegisterLand {
                caller,
                registration,
            } => self
                .register_land(caller, registration.clone())
                .map(Outcome::Registered),
            Operation::TransferOwnership {
                caller,
                parcel_id,
                new_owner,
            } => self
                .transfer_ownership(caller, *parcel_id, *new_owner)
                .map(|_| Outcome::Transferred),
        }
    }

    /// Build a fresh registry by applying `operations` in order.
    ///
    /// Rejected operations leave no trace in the state; their errors are
    /// returned positionally alongside the successful outcomes.
    pub fn replay<'a, I>(operations: I) -> (LandRegistry, Vec<Result<Outcome>>)
    where
        I: IntoIterator<Item = &'a Operation>,
    {
        let registry = LandRegistry::new();
        let results = operations
            .into_iter()
            .map(|operation| registry.apply(operation))
            .collect();
        (registry, results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RegistryError;

    fn id(byte: u8) -> Identity {
        Identity::new([byte; 32])
    }

    fn script() -> Vec<Operation> {
        vec![
            Operation::SetAuthority { identity: id(1) },
            Operation::RegisterLand {
                caller: id(1),
                registration: LandRegistration::new("Location A", 100, id(2), "PROP123"),
            },
            Operation::SetAuthority { identity: id(4) },
            Operation::TransferOwnership {
                caller: id(2),
                parcel_id: ParcelId(1),
                new_owner: id(3),
            },
        ]
    }

    #[test]
    fn test_replay_reports_each_result() {
        let ops = script();
        let (registry, results) = LandRegistry::replay(&ops);

        assert!(matches!(results[0], Ok(Outcome::AuthoritySet)));
        assert!(matches!(results[1], Ok(Outcome::Registered(ParcelId(1)))));
        assert!(matches!(results[2], Err(RegistryError::AlreadySet { .. })));
        assert!(matches!(results[3], Ok(Outcome::Transferred)));
        assert_eq!(registry.verify_land(ParcelId(1)).unwrap().current_owner, id(3));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let ops = script();
        let (first, _) = LandRegistry::replay(&ops);
        let (second, _) = LandRegistry::replay(&ops);
        assert_eq!(first.snapshot(), second.snapshot());
        assert_eq!(first.events(), second.events());
    }

    #[test]
    fn test_operation_json_shape() {
        let op = Operation::TransferOwnership {
            caller: id(2),
            parcel_id: ParcelId(1),
            new_owner: id(3),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["op"], "transfer_ownership");
        assert_eq!(json["parcel_id"], 1);
        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }
}
