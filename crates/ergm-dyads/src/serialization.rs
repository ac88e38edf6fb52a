use ergm_core::errors::ErgmError;
use ergm_core::provenance::SchemaVersion;
use serde::{Deserialize, Serialize};

use crate::rle::{FreeDyadMap, Run};
use crate::space::DyadSpace;

const MAP_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Serializes the map to a compact binary representation using `bincode`.
pub fn map_to_bytes(map: &FreeDyadMap) -> Result<Vec<u8>, ErgmError> {
    bincode::serialize(&SerializableMap::from_map(map))
        .map_err(|err| ErgmError::serde("serialize-bytes", err))
}

/// Restores a map from its binary representation.
pub fn map_from_bytes(bytes: &[u8]) -> Result<FreeDyadMap, ErgmError> {
    let serializable: SerializableMap =
        bincode::deserialize(bytes).map_err(|err| ErgmError::serde("deserialize-bytes", err))?;
    serializable.into_map()
}

/// Serializes the map to a JSON string.
pub fn map_to_json(map: &FreeDyadMap) -> Result<String, ErgmError> {
    serde_json::to_string_pretty(&SerializableMap::from_map(map))
        .map_err(|err| ErgmError::serde("serialize-json", err))
}

/// Restores a map from a JSON string.
pub fn map_from_json(json: &str) -> Result<FreeDyadMap, ErgmError> {
    let serializable: SerializableMap =
        serde_json::from_str(json).map_err(|err| ErgmError::serde("deserialize-json", err))?;
    serializable.into_map()
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializableMap {
    schema_version: SchemaVersion,
    space: DyadSpace,
    /// `(length, value)` pairs in canonical traversal order.
    runs: Vec<(u64, bool)>,
}

impl SerializableMap {
    fn from_map(map: &FreeDyadMap) -> Self {
        Self {
            schema_version: MAP_SCHEMA,
            space: *map.space(),
            runs: map.runs().iter().map(|run| (run.len, run.value)).collect(),
        }
    }

    fn into_map(self) -> Result<FreeDyadMap, ErgmError> {
        let space = DyadSpace::new(
            self.space.n(),
            self.space.is_directed(),
            self.space.b1(),
            self.space.has_loops(),
        )?;
        let runs = self
            .runs
            .into_iter()
            .map(|(len, value)| Run::new(len, value))
            .collect();
        FreeDyadMap::from_runs(space, runs)
    }
}
