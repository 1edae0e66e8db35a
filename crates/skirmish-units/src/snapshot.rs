//! Serializable store snapshots and state hashing.
//!
//! A [`StoreSnapshot`] lists every active unit in index order together with
//! the slot allocator's free-list, so two stores with the same snapshot will
//! also assign the same indices to future spawns. The BLAKE3 digest of its
//! canonical JSON encoding is the determinism fingerprint.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::meta::UnitMeta;
use crate::slot::UnitIndex;
use crate::store::UnitStore;
use crate::team::{Perdurance, Team, UnitState};

/// One active unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub index: UnitIndex,
    pub id: String,
    pub pos: Vec2,
    pub hp: f64,
    pub max_hp: f64,
    pub team: Team,
    pub state: UnitState,
    pub perdurance: Perdurance,
    pub speed: f64,
    pub abilities: Vec<String>,
    pub tags: BTreeSet<String>,
    pub meta: UnitMeta,
}

/// The full observable store state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub capacity: usize,
    /// Free slots in reuse order.
    pub free_slots: Vec<UnitIndex>,
    /// Slots removed this tick and not yet recyclable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retired_slots: Vec<UnitIndex>,
    /// Active units in ascending index order.
    pub units: Vec<UnitSnapshot>,
}

impl StoreSnapshot {
    /// BLAKE3 hex digest of the canonical JSON encoding.
    pub fn hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        if let Err(e) = serde_json::to_writer(&mut hasher, self) {
            tracing::warn!(error = %e, "store snapshot failed to serialize; hash is partial");
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl UnitStore {
    /// Capture every active unit in index order.
    pub fn snapshot(&self) -> StoreSnapshot {
        let units = self
            .active()
            .map(|index| UnitSnapshot {
                index,
                id: self.id(index).to_owned(),
                pos: self.pos(index),
                hp: self.hp(index),
                max_hp: self.max_hp(index),
                team: self.team(index),
                state: self.state(index),
                perdurance: self.perdurance(index),
                speed: self.speed(index),
                abilities: self.abilities(index).to_vec(),
                tags: self.tags(index).clone(),
                meta: self.meta(index).clone(),
            })
            .collect();
        StoreSnapshot {
            capacity: self.capacity(),
            free_slots: self.slots().free_slots().collect(),
            retired_slots: self.slots().retired_slots().collect(),
            units,
        }
    }
}
