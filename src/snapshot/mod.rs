//! Introspection snapshots of a running machine.
//!
//! A snapshot records what is active, what happened and which clients and
//! global keys exist. It carries no handlers or behaviors, so it is meant
//! for diagnostics and replay analysis rather than resuming a machine.

use crate::core::{State, StateHistory};
use crate::runtime::{ActiveState, MachineStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::SnapshotError;

/// Version identifier for the snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable view of a state machine at one point in time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct MachineSnapshot<S: State> {
    /// Snapshot format version
    pub version: u32,

    /// Identifier of the machine instance
    pub machine_id: Uuid,

    /// Configured machine name
    pub name: String,

    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,

    /// When the machine was started, if it was
    pub started_at: Option<DateTime<Utc>>,

    /// Active states, parents before children
    pub active: Vec<ActiveState<S>>,

    /// Recent state entries
    pub history: StateHistory<S>,

    /// Names of the created clients, in creation order
    pub clients: Vec<String>,

    /// Keys present in the global data store
    pub global_keys: Vec<String>,

    pub stats: MachineStats,
}

impl<S: State> MachineSnapshot<S> {
    /// Active leaf states.
    pub fn active_leaves(&self) -> Vec<&S> {
        self.active
            .iter()
            .filter(|active| active.leaf)
            .map(|active| &active.state)
            .collect()
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let snapshot: Self = bincode::deserialize(bytes)
            .map_err(|e| SnapshotError::DeserializationFailed(e.to_string()))?;
        snapshot.check_version()
    }

    fn check_version(self) -> Result<Self, SnapshotError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EventKind, StateTransition};

    crate::state_enum! {
        enum Probe {
            Survey,
            Sample,
        }
    }

    fn snapshot() -> MachineSnapshot<Probe> {
        let mut history = StateHistory::with_limit(8);
        history.record(StateTransition {
            region: "main".to_string(),
            from: None,
            to: Probe::Survey,
            event: None,
            tag: None,
            timestamp: Utc::now(),
        });
        history.record(StateTransition {
            region: "main".to_string(),
            from: Some(Probe::Survey),
            to: Probe::Sample,
            event: Some(EventKind::new("found")),
            tag: Some("SUCCESS".to_string()),
            timestamp: Utc::now(),
        });

        MachineSnapshot {
            version: SNAPSHOT_VERSION,
            machine_id: Uuid::new_v4(),
            name: "probe".to_string(),
            taken_at: Utc::now(),
            started_at: Some(Utc::now()),
            active: vec![ActiveState {
                region: "main".to_string(),
                state: Probe::Sample,
                depth: 0,
                leaf: true,
                terminated: false,
            }],
            history,
            clients: vec!["timer".to_string()],
            global_keys: vec!["site".to_string()],
            stats: MachineStats {
                transitions: 1,
                ..MachineStats::default()
            },
        }
    }

    #[test]
    fn json_keeps_active_states_and_history() {
        let original = snapshot();
        let json = original.to_json().unwrap();
        assert!(json.contains("\"Sample\""));

        let restored = MachineSnapshot::<Probe>::from_json(&json).unwrap();
        assert_eq!(restored.machine_id, original.machine_id);
        assert_eq!(restored.active_leaves(), vec![&Probe::Sample]);
        assert_eq!(restored.history.get_path(), vec![&Probe::Survey, &Probe::Sample]);
        assert_eq!(restored.stats.transitions, 1);
    }

    #[test]
    fn binary_encoding_is_decodable() {
        let original = snapshot();
        let bytes = original.to_bytes().unwrap();

        let restored = MachineSnapshot::<Probe>::from_bytes(&bytes).unwrap();
        assert_eq!(restored.name, "probe");
        assert_eq!(restored.clients, vec!["timer".to_string()]);
        assert_eq!(restored.history.len(), 2);
    }

    #[test]
    fn other_versions_are_rejected() {
        let mut newer = snapshot();
        newer.version = SNAPSHOT_VERSION + 1;
        let json = newer.to_json().unwrap();

        assert!(matches!(
            MachineSnapshot::<Probe>::from_json(&json),
            Err(SnapshotError::UnsupportedVersion { found: 2, supported: 1 })
        ));
    }

    #[test]
    fn garbage_is_a_deserialization_error() {
        assert!(matches!(
            MachineSnapshot::<Probe>::from_json("{ not json"),
            Err(SnapshotError::DeserializationFailed(_))
        ));
    }
}
