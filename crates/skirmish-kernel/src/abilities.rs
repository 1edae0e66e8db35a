//! Declarative ability content.
//!
//! An ability is data: a cooldown, two trigger expressions and an ordered
//! effect list. The [`AbilityBook`] maps ability ids to definitions and is
//! loaded once per simulation. Interpretation lives in
//! [`rules::ability`](crate::rules::ability).
//!
//! ```
//! use skirmish_kernel::abilities::{AbilityBook, Effect};
//!
//! let book = AbilityBook::from_json(r#"{
//!     "slash": {
//!         "cooldown": 2,
//!         "trigger": "distance(closest.enemy()) <= 1.5",
//!         "effects": [{ "type": "damage", "amount": [2, 4] }]
//!     }
//! }"#).unwrap();
//! let slash = book.get("slash").unwrap();
//! assert_eq!(slash.name, "slash");
//! assert_eq!(slash.target, "closest.enemy()");
//! assert!(matches!(slash.effects[0], Effect::Damage { .. }));
//! ```

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use skirmish_units::meta::StatusKind;

use crate::SimError;

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A fixed number or an inclusive `[min, max]` range rolled per use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Fixed(f64),
    Range([f64; 2]),
}

impl Amount {
    /// Resolve to a number, drawing from `rng` for ranges.
    ///
    /// A degenerate or reversed range yields its first bound without
    /// consuming randomness.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match *self {
            Amount::Fixed(v) => v,
            Amount::Range([lo, hi]) if lo < hi && lo.is_finite() && hi.is_finite() => {
                rng.gen_range(lo..=hi)
            }
            Amount::Range([lo, _]) => lo,
        }
    }
}

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

fn physical() -> String {
    "physical".to_owned()
}

fn one() -> u32 {
    1
}

/// One step of an ability. Each variant is interpreted independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Hit the target.
    Damage {
        amount: Amount,
        #[serde(default = "physical")]
        aspect: String,
    },
    /// Heal the target.
    Heal { amount: Amount },
    /// Hit every enemy of the caster within `radius` of the target.
    Aoe {
        radius: f64,
        amount: Amount,
        #[serde(default = "physical")]
        aspect: String,
    },
    /// Launch a hit that lands after travelling at `speed` units per tick.
    Projectile {
        amount: Amount,
        #[serde(default = "physical")]
        aspect: String,
        speed: f64,
    },
    /// Create `count` allies next to the caster.
    Summon {
        unit: String,
        hp: f64,
        #[serde(default = "one")]
        count: u32,
        #[serde(default)]
        abilities: Vec<String>,
        #[serde(default)]
        speed: f64,
    },
    /// Inflict a status on the target for `duration` ticks.
    Status {
        status: StatusKind,
        duration: u64,
        #[serde(default)]
        magnitude: f64,
    },
    /// Presentation only.
    Weather {
        kind: String,
        #[serde(default)]
        duration: u64,
    },
    /// Presentation only.
    Particles { kind: String },
    /// Any effect type this kernel does not know. Skipped with a warning.
    #[serde(other)]
    Unknown,
}

impl Effect {
    /// Whether the effect needs a unit (not just a point) as its target.
    pub fn needs_unit(&self) -> bool {
        matches!(
            self,
            Effect::Damage { .. } | Effect::Heal { .. } | Effect::Projectile { .. } | Effect::Status { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// AbilityDef
// ---------------------------------------------------------------------------

fn always() -> String {
    "true".to_owned()
}

fn closest_enemy() -> String {
    "closest.enemy()".to_owned()
}

/// A declarative ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDef {
    /// Filled from the book key when loading.
    #[serde(default)]
    pub name: String,
    /// Ticks between uses. Zero means every tick.
    #[serde(default)]
    pub cooldown: u64,
    /// Boolean expression deciding whether the ability fires.
    #[serde(default = "always")]
    pub trigger: String,
    /// Expression yielding the target unit or point.
    #[serde(default = "closest_enemy")]
    pub target: String,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl AbilityDef {
    pub fn new(name: impl Into<String>, cooldown: u64, trigger: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cooldown,
            trigger: trigger.into(),
            target: closest_enemy(),
            effects: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// Whether the ability is still cooling down at `tick`, given the tick it
    /// was last used on.
    pub fn cooling_down(&self, last_used: Option<u64>, tick: u64) -> bool {
        last_used.is_some_and(|last| tick < last.saturating_add(self.cooldown))
    }
}

// ---------------------------------------------------------------------------
// AbilityBook
// ---------------------------------------------------------------------------

/// Ability definitions by id. Immutable once the simulation starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityBook {
    abilities: BTreeMap<String, AbilityDef>,
}

impl AbilityBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `id -> definition`.
    ///
    /// # Errors
    ///
    /// [`SimError::Content`] if the text is not a valid ability map. Unknown
    /// effect types are not an error; they load as [`Effect::Unknown`].
    pub fn from_json(text: &str) -> Result<Self, SimError> {
        let mut book: AbilityBook = serde_json::from_str(text)?;
        for (id, def) in &mut book.abilities {
            if def.name.is_empty() {
                def.name = id.clone();
            }
        }
        Ok(book)
    }

    /// Add or replace a definition under `def.name`.
    pub fn insert(&mut self, def: AbilityDef) {
        self.abilities.insert(def.name.clone(), def);
    }

    pub fn with(mut self, def: AbilityDef) -> Self {
        self.insert(def);
        self
    }

    pub fn get(&self, id: &str) -> Option<&AbilityDef> {
        self.abilities.get(id)
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AbilityDef)> {
        self.abilities.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every trigger and target expression, for cache warm-up.
    pub fn expressions(&self) -> impl Iterator<Item = &str> {
        self.abilities
            .values()
            .flat_map(|d| [d.trigger.as_str(), d.target.as_str()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn unknown_effect_type_loads_as_unknown() {
        let book = AbilityBook::from_json(
            r#"{ "odd": { "effects": [{ "type": "teleport_home" }, { "type": "heal", "amount": 3 }] } }"#,
        )
        .unwrap();
        let odd = book.get("odd").unwrap();
        assert_eq!(odd.effects[0], Effect::Unknown);
        assert_eq!(odd.effects[1], Effect::Heal { amount: Amount::Fixed(3.0) });
        assert_eq!(odd.trigger, "true");
    }

    #[test]
    fn malformed_content_is_an_error() {
        assert!(matches!(
            AbilityBook::from_json(r#"{ "x": { "cooldown": "soon" } }"#),
            Err(SimError::Content(_))
        ));
    }

    #[test]
    fn ranges_roll_within_bounds() {
        let mut rng = Pcg32::seed_from_u64(3);
        let amount = Amount::Range([5.0, 15.0]);
        for _ in 0..100 {
            let v = amount.roll(&mut rng);
            assert!((5.0..=15.0).contains(&v));
        }
        assert_eq!(Amount::Range([4.0, 4.0]).roll(&mut rng), 4.0);
        assert_eq!(Amount::Range([9.0, 1.0]).roll(&mut rng), 9.0);
    }

    #[test]
    fn cooldown_window() {
        let def = AbilityDef::new("zap", 3, "true");
        assert!(!def.cooling_down(None, 0));
        assert!(def.cooling_down(Some(5), 5));
        assert!(def.cooling_down(Some(5), 7));
        assert!(!def.cooling_down(Some(5), 8));
    }

    #[test]
    fn expressions_cover_triggers_and_targets() {
        let book = AbilityBook::new()
            .with(AbilityDef::new("a", 0, "tick > 1"))
            .with(AbilityDef::new("b", 0, "true").with_target("self"));
        let exprs: Vec<&str> = book.expressions().collect();
        assert_eq!(exprs, vec!["tick > 1", "closest.enemy()", "true", "self"]);
    }
}
