//! Columnar unit storage.
//!
//! The [`UnitStore`] keeps one `Vec` per unit attribute (Structure-of-Arrays)
//! indexed by [`UnitIndex`]. Field access by index is a single bounds-checked
//! load; adding a unit never allocates per field beyond the unit's own
//! ability/tag lists. A `HashMap` maps string ids to indices.
//!
//! # Single writer
//!
//! Outside of initial setup ([`UnitStore::add_unit`]) and end-of-tick pruning
//! ([`UnitStore::prune_dead`]), the store is only mutated by applying
//! [`Command`](crate::command::Command)s. The mutating accessors are
//! crate-private so rules physically cannot bypass the command queue.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;
use crate::meta::{MetaValue, UnitMeta};
use crate::slot::{SlotAllocator, UnitIndex};
use crate::team::{Perdurance, Team, UnitState};
use crate::StoreError;

// ---------------------------------------------------------------------------
// UnitSpec
// ---------------------------------------------------------------------------

/// The structural record accepted by [`UnitStore::add_unit`].
///
/// `hp` is mandatory; a record without it fails to deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub id: String,
    pub pos: Vec2,
    pub team: Team,
    pub hp: f64,
    /// Defaults to `hp`.
    #[serde(default, alias = "maxHp", skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<f64>,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub perdurance: Perdurance,
    /// World units per tick; zero for stationary units.
    #[serde(default)]
    pub speed: f64,
    /// Initial metadata flags.
    #[serde(default)]
    pub flags: BTreeMap<String, MetaValue>,
}

impl UnitSpec {
    /// A minimal spec: no abilities, no tags, stationary.
    pub fn new(id: impl Into<String>, pos: Vec2, team: Team, hp: f64) -> Self {
        Self {
            id: id.into(),
            pos,
            team,
            hp,
            max_hp: None,
            abilities: Vec::new(),
            tags: BTreeSet::new(),
            perdurance: Perdurance::None,
            speed: 0.0,
            flags: BTreeMap::new(),
        }
    }

    /// Builder: attach abilities.
    pub fn with_abilities<I, S>(mut self, abilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.abilities = abilities.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the perdurance policy.
    pub fn with_perdurance(mut self, perdurance: Perdurance) -> Self {
        self.perdurance = perdurance;
        self
    }

    /// Builder: set the movement speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Builder: set max hp independently of current hp.
    pub fn with_max_hp(mut self, max_hp: f64) -> Self {
        self.max_hp = Some(max_hp);
        self
    }

    /// Builder: add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    fn validate(&self) -> Result<(), StoreError> {
        let invalid = |reason: &str| StoreError::InvalidSpec {
            id: self.id.clone(),
            reason: reason.to_owned(),
        };
        if self.id.is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if !self.hp.is_finite() {
            return Err(invalid("hp must be finite"));
        }
        let max_hp = self.max_hp.unwrap_or(self.hp);
        if !(max_hp.is_finite() && max_hp > 0.0) {
            return Err(invalid("max hp must be positive and finite"));
        }
        if !self.pos.is_finite() {
            return Err(invalid("position must be finite"));
        }
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(invalid("speed must be non-negative and finite"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CapacityPolicy
// ---------------------------------------------------------------------------

/// What [`UnitStore::add_unit`] does when every slot is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityPolicy {
    /// Return [`StoreError::Capacity`].
    #[default]
    Reject,
    /// Double the capacity and continue.
    Grow,
}

// ---------------------------------------------------------------------------
// UnitStore
// ---------------------------------------------------------------------------

/// Structure-of-arrays storage for all units.
#[derive(Debug, Clone)]
pub struct UnitStore {
    ids: Vec<String>,
    pos: Vec<Vec2>,
    hp: Vec<f64>,
    max_hp: Vec<f64>,
    team: Vec<Team>,
    state: Vec<UnitState>,
    perdurance: Vec<Perdurance>,
    speed: Vec<f64>,
    abilities: Vec<Vec<String>>,
    tags: Vec<BTreeSet<String>>,
    meta: Vec<UnitMeta>,
    lookup: HashMap<String, UnitIndex>,
    slots: SlotAllocator,
    policy: CapacityPolicy,
}

impl UnitStore {
    /// Create an empty store.
    pub fn new(capacity: usize, policy: CapacityPolicy) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            pos: Vec::with_capacity(capacity),
            hp: Vec::with_capacity(capacity),
            max_hp: Vec::with_capacity(capacity),
            team: Vec::with_capacity(capacity),
            state: Vec::with_capacity(capacity),
            perdurance: Vec::with_capacity(capacity),
            speed: Vec::with_capacity(capacity),
            abilities: Vec::with_capacity(capacity),
            tags: Vec::with_capacity(capacity),
            meta: Vec::with_capacity(capacity),
            lookup: HashMap::with_capacity(capacity),
            slots: SlotAllocator::with_capacity(capacity),
            policy,
        }
    }

    /// Add a unit and return its index.
    ///
    /// The record is fully validated before a slot is taken, so a failed call
    /// leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidSpec`] for a malformed record.
    /// - [`StoreError::DuplicateId`] if the id is already in use.
    /// - [`StoreError::Capacity`] if the store is full under
    ///   [`CapacityPolicy::Reject`].
    pub fn add_unit(&mut self, spec: UnitSpec) -> Result<UnitIndex, StoreError> {
        spec.validate()?;
        if self.lookup.contains_key(&spec.id) {
            return Err(StoreError::DuplicateId { id: spec.id });
        }
        let index = match self.slots.allocate() {
            Some(index) => index,
            None => match self.policy {
                CapacityPolicy::Reject => {
                    return Err(StoreError::Capacity {
                        capacity: self.slots.capacity(),
                    })
                }
                CapacityPolicy::Grow => {
                    let grown = (self.slots.capacity() * 2).max(1);
                    tracing::debug!(from = self.slots.capacity(), to = grown, "growing unit store");
                    self.slots.grow(grown);
                    self.slots.allocate().ok_or(StoreError::Capacity { capacity: grown })?
                }
            },
        };

        let max_hp = spec.max_hp.unwrap_or(spec.hp);
        let state = if spec.hp <= 0.0 {
            UnitState::Dead
        } else {
            UnitState::Idle
        };
        let meta = UnitMeta {
            flags: spec.flags,
            ..UnitMeta::default()
        };
        self.lookup.insert(spec.id.clone(), index);

        let slot = index.slot();
        if slot == self.ids.len() {
            self.ids.push(spec.id);
            self.pos.push(spec.pos);
            self.hp.push(spec.hp);
            self.max_hp.push(max_hp);
            self.team.push(spec.team);
            self.state.push(state);
            self.perdurance.push(spec.perdurance);
            self.speed.push(spec.speed);
            self.abilities.push(spec.abilities);
            self.tags.push(spec.tags);
            self.meta.push(meta);
        } else {
            self.ids[slot] = spec.id;
            self.pos[slot] = spec.pos;
            self.hp[slot] = spec.hp;
            self.max_hp[slot] = max_hp;
            self.team[slot] = spec.team;
            self.state[slot] = state;
            self.perdurance[slot] = spec.perdurance;
            self.speed[slot] = spec.speed;
            self.abilities[slot] = spec.abilities;
            self.tags[slot] = spec.tags;
            self.meta[slot] = meta;
        }
        Ok(index)
    }

    /// Free a unit's slot for immediate reuse.
    ///
    /// # Errors
    ///
    /// [`StoreError::InactiveUnit`] if the slot is not active.
    pub fn remove(&mut self, index: UnitIndex) -> Result<(), StoreError> {
        if !self.slots.release(index) {
            return Err(StoreError::InactiveUnit { index });
        }
        self.clear_slot(index);
        Ok(())
    }

    /// Take a unit out of the store mid-tick. Its id is released at once,
    /// but the slot is not reused until [`recycle_retired`](Self::recycle_retired),
    /// so stale indices held by queued commands never reach a newer unit.
    ///
    /// # Errors
    ///
    /// [`StoreError::InactiveUnit`] if the slot is not active.
    pub fn retire(&mut self, index: UnitIndex) -> Result<(), StoreError> {
        if !self.slots.retire(index) {
            return Err(StoreError::InactiveUnit { index });
        }
        tracing::trace!(unit = %self.ids[index.slot()], %index, "unit retired");
        self.clear_slot(index);
        Ok(())
    }

    /// Make retired slots available to later spawns. Call between ticks.
    pub fn recycle_retired(&mut self) -> usize {
        self.slots.recycle()
    }

    fn clear_slot(&mut self, index: UnitIndex) {
        let slot = index.slot();
        let id = std::mem::take(&mut self.ids[slot]);
        self.lookup.remove(&id);
        self.abilities[slot].clear();
        self.tags[slot].clear();
        self.meta[slot] = UnitMeta::default();
    }

    /// Free the slots of every dead unit. Returns the freed indices in
    /// ascending order.
    pub fn prune_dead(&mut self) -> Vec<UnitIndex> {
        let dead: Vec<UnitIndex> = self
            .slots
            .iter_active()
            .filter(|i| self.state[i.slot()] == UnitState::Dead)
            .collect();
        for &index in &dead {
            // Only active slots were collected above, so release succeeds.
            let _ = self.remove(index);
        }
        dead
    }

    // -- queries ------------------------------------------------------------

    /// Borrowed view of an active unit.
    pub fn get(&self, index: UnitIndex) -> Option<UnitView<'_>> {
        self.slots
            .is_active(index)
            .then_some(UnitView { store: self, index })
    }

    /// Index of the unit with the given id.
    pub fn index_of(&self, id: &str) -> Option<UnitIndex> {
        self.lookup.get(id).copied()
    }

    /// Whether the slot holds an active unit (dead or alive).
    pub fn is_active(&self, index: UnitIndex) -> bool {
        self.slots.is_active(index)
    }

    /// Whether the slot holds an active unit that is not dead.
    pub fn is_alive(&self, index: UnitIndex) -> bool {
        self.slots.is_active(index) && self.state[index.slot()] != UnitState::Dead
    }

    /// Active indices in ascending order.
    pub fn active(&self) -> impl Iterator<Item = UnitIndex> + '_ {
        self.slots.iter_active()
    }

    /// Living indices in ascending order.
    pub fn living(&self) -> impl Iterator<Item = UnitIndex> + '_ {
        self.slots
            .iter_active()
            .filter(|i| self.state[i.slot()] != UnitState::Dead)
    }

    /// Number of active units.
    pub fn len(&self) -> usize {
        self.slots.active_count()
    }

    /// Whether no unit is active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current slot capacity.
    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    pub(crate) fn slots(&self) -> &SlotAllocator {
        &self.slots
    }

    // -- column reads (index must be active; callers check via `get`) --------

    #[inline]
    pub fn id(&self, index: UnitIndex) -> &str {
        &self.ids[index.slot()]
    }

    #[inline]
    pub fn pos(&self, index: UnitIndex) -> Vec2 {
        self.pos[index.slot()]
    }

    #[inline]
    pub fn hp(&self, index: UnitIndex) -> f64 {
        self.hp[index.slot()]
    }

    #[inline]
    pub fn max_hp(&self, index: UnitIndex) -> f64 {
        self.max_hp[index.slot()]
    }

    #[inline]
    pub fn team(&self, index: UnitIndex) -> Team {
        self.team[index.slot()]
    }

    #[inline]
    pub fn state(&self, index: UnitIndex) -> UnitState {
        self.state[index.slot()]
    }

    #[inline]
    pub fn perdurance(&self, index: UnitIndex) -> Perdurance {
        self.perdurance[index.slot()]
    }

    #[inline]
    pub fn speed(&self, index: UnitIndex) -> f64 {
        self.speed[index.slot()]
    }

    #[inline]
    pub fn abilities(&self, index: UnitIndex) -> &[String] {
        &self.abilities[index.slot()]
    }

    #[inline]
    pub fn tags(&self, index: UnitIndex) -> &BTreeSet<String> {
        &self.tags[index.slot()]
    }

    #[inline]
    pub fn meta(&self, index: UnitIndex) -> &UnitMeta {
        &self.meta[index.slot()]
    }

    // -- crate-private writes (command application only) --------------------

    pub(crate) fn set_pos(&mut self, index: UnitIndex, pos: Vec2) {
        self.pos[index.slot()] = pos;
    }

    pub(crate) fn set_hp(&mut self, index: UnitIndex, hp: f64) {
        self.hp[index.slot()] = hp;
    }

    pub(crate) fn set_state(&mut self, index: UnitIndex, state: UnitState) {
        self.state[index.slot()] = state;
    }

    pub(crate) fn meta_mut(&mut self, index: UnitIndex) -> &mut UnitMeta {
        &mut self.meta[index.slot()]
    }

    /// Validate a spawn without performing it.
    pub(crate) fn check_spawn(&self, spec: &UnitSpec) -> Result<(), StoreError> {
        spec.validate()?;
        if self.lookup.contains_key(&spec.id) {
            return Err(StoreError::DuplicateId {
                id: spec.id.clone(),
            });
        }
        if !self.slots.has_room() && self.policy == CapacityPolicy::Reject {
            return Err(StoreError::Capacity {
                capacity: self.slots.capacity(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UnitView
// ---------------------------------------------------------------------------

/// A lightweight borrowed handle to one active unit.
///
/// Views copy nothing; each accessor reads straight from the store's columns.
#[derive(Clone, Copy)]
pub struct UnitView<'a> {
    store: &'a UnitStore,
    index: UnitIndex,
}

impl<'a> UnitView<'a> {
    pub fn index(&self) -> UnitIndex {
        self.index
    }

    pub fn id(&self) -> &'a str {
        self.store.id(self.index)
    }

    pub fn pos(&self) -> Vec2 {
        self.store.pos(self.index)
    }

    pub fn hp(&self) -> f64 {
        self.store.hp(self.index)
    }

    pub fn max_hp(&self) -> f64 {
        self.store.max_hp(self.index)
    }

    pub fn team(&self) -> Team {
        self.store.team(self.index)
    }

    pub fn state(&self) -> UnitState {
        self.store.state(self.index)
    }

    pub fn perdurance(&self) -> Perdurance {
        self.store.perdurance(self.index)
    }

    pub fn speed(&self) -> f64 {
        self.store.speed(self.index)
    }

    pub fn abilities(&self) -> &'a [String] {
        self.store.abilities(self.index)
    }

    pub fn tags(&self) -> &'a BTreeSet<String> {
        self.store.tags(self.index)
    }

    pub fn meta(&self) -> &'a UnitMeta {
        self.store.meta(self.index)
    }

    pub fn is_alive(&self) -> bool {
        self.state() != UnitState::Dead
    }
}

impl std::fmt::Debug for UnitView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitView")
            .field("index", &self.index)
            .field("id", &self.id())
            .field("hp", &self.hp())
            .field("team", &self.team())
            .field("state", &self.state())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: &str, hp: f64) -> UnitSpec {
        UnitSpec::new(id, Vec2::new(1.0, 2.0), Team::Friendly, hp)
    }

    #[test]
    fn add_and_read_back() {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        let i = store
            .add_unit(spec("knight", 20.0).with_abilities(["slash"]))
            .unwrap();
        let view = store.get(i).unwrap();
        assert_eq!(view.id(), "knight");
        assert_eq!(view.hp(), 20.0);
        assert_eq!(view.max_hp(), 20.0);
        assert_eq!(view.pos(), Vec2::new(1.0, 2.0));
        assert_eq!(view.abilities(), ["slash".to_owned()]);
        assert_eq!(view.state(), UnitState::Idle);
        assert_eq!(store.index_of("knight"), Some(i));
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        store.add_unit(spec("a", 1.0)).unwrap();
        let err = store.add_unit(spec("a", 1.0)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn non_finite_hp_rejected() {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        let err = store.add_unit(spec("a", f64::NAN)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidSpec { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn reject_policy_returns_capacity_error() {
        let mut store = UnitStore::new(1, CapacityPolicy::Reject);
        store.add_unit(spec("a", 1.0)).unwrap();
        let err = store.add_unit(spec("b", 1.0)).unwrap_err();
        assert!(matches!(err, StoreError::Capacity { capacity: 1 }));
        assert_eq!(store.index_of("b"), None);
    }

    #[test]
    fn grow_policy_doubles_capacity() {
        let mut store = UnitStore::new(2, CapacityPolicy::Grow);
        for i in 0..5 {
            store.add_unit(spec(&format!("u{i}"), 1.0)).unwrap();
        }
        assert_eq!(store.len(), 5);
        assert_eq!(store.capacity(), 8);
    }

    #[test]
    fn removed_slot_is_reused_and_lookup_updated() {
        let mut store = UnitStore::new(2, CapacityPolicy::Reject);
        let a = store.add_unit(spec("a", 1.0)).unwrap();
        let _b = store.add_unit(spec("b", 1.0)).unwrap();
        store.remove(a).unwrap();
        assert_eq!(store.index_of("a"), None);
        assert!(store.get(a).is_none());
        let c = store.add_unit(spec("c", 3.0)).unwrap();
        assert_eq!(c, a);
        assert_eq!(store.get(c).unwrap().id(), "c");
        assert_eq!(store.get(c).unwrap().hp(), 3.0);
    }

    #[test]
    fn retired_slot_is_held_until_recycled() {
        let mut store = UnitStore::new(2, CapacityPolicy::Reject);
        let a = store.add_unit(spec("a", 1.0)).unwrap();
        store.add_unit(spec("b", 1.0)).unwrap();
        store.retire(a).unwrap();
        assert_eq!(store.index_of("a"), None);
        assert!(store.get(a).is_none());
        assert_eq!(store.len(), 1);
        assert!(matches!(
            store.add_unit(spec("c", 1.0)),
            Err(StoreError::Capacity { capacity: 2 })
        ));

        assert_eq!(store.recycle_retired(), 1);
        assert_eq!(store.add_unit(spec("a", 2.0)).unwrap(), a);
    }

    #[test]
    fn prune_dead_frees_only_dead_units() {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        let a = store.add_unit(spec("a", 5.0)).unwrap();
        let b = store.add_unit(spec("b", 5.0)).unwrap();
        store.set_state(b, UnitState::Dead);
        assert_eq!(store.living().collect::<Vec<_>>(), vec![a]);
        assert_eq!(store.prune_dead(), vec![b]);
        assert_eq!(store.len(), 1);
        assert!(store.is_alive(a));
    }

    #[test]
    fn unit_with_no_hp_starts_dead() {
        let mut store = UnitStore::new(1, CapacityPolicy::Reject);
        let a = store.add_unit(spec("husk", 0.0).with_max_hp(10.0)).unwrap();
        assert_eq!(store.state(a), UnitState::Dead);
        assert!(!store.is_alive(a));
    }

    #[test]
    fn spec_without_hp_fails_to_deserialize() {
        let json = r#"{"id":"x","pos":{"x":0,"y":0},"team":"hostile"}"#;
        assert!(serde_json::from_str::<UnitSpec>(json).is_err());
        let json = r#"{"id":"x","pos":{"x":0,"y":0},"team":"hostile","hp":3,"maxHp":9}"#;
        let spec: UnitSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.max_hp, Some(9.0));
    }
}
