//! The [`Rule`] trait and the fixed, ordered [`RuleSet`].
//!
//! A rule is one unit of per-tick logic. It reads the [`TickContext`] and
//! queues commands and events; it never mutates the store. Rules hold no
//! state across ticks: anything that must persist (cooldowns, statuses,
//! projectiles in flight) lives in unit metadata and is written through
//! `ApplyMeta` commands.

use crate::context::TickContext;
use crate::rules::{AbilityRule, FireSpreadRule, ProjectileRule, PursuitRule, StatusEffectRule};

/// One unit of per-tick logic.
pub trait Rule {
    /// Stable name, used as `issued_by` on queued commands and in journals.
    fn name(&self) -> &str;

    /// Run once for the current tick.
    fn execute(&self, ctx: &mut TickContext<'_>);
}

/// Rules in execution order. The order never depends on simulation data.
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Status effects, fire spread, projectiles, abilities, pursuit.
    pub fn standard() -> Self {
        Self::new()
            .with(StatusEffectRule)
            .with(FireSpreadRule::default())
            .with(ProjectileRule)
            .with(AbilityRule)
            .with(PursuitRule::default())
    }

    /// Append a rule to run after every rule already in the set.
    ///
    /// # Panics
    ///
    /// If a rule with the same name is already present.
    pub fn with(mut self, rule: impl Rule + 'static) -> Self {
        self.push(Box::new(rule));
        self
    }

    /// See [`with`](Self::with).
    pub fn push(&mut self, rule: Box<dyn Rule>) {
        assert!(
            !self.rules.iter().any(|r| r.name() == rule.name()),
            "duplicate rule name: {:?}",
            rule.name()
        );
        self.rules.push(rule);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Rule names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for RuleSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Rule for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn execute(&self, _ctx: &mut TickContext<'_>) {}
    }

    #[test]
    fn standard_order_is_fixed() {
        assert_eq!(
            RuleSet::standard().names(),
            vec!["status_effects", "fire_spread", "projectiles", "abilities", "pursuit"]
        );
    }

    #[test]
    fn custom_rules_keep_insertion_order() {
        let set = RuleSet::new().with(Named("b")).with(Named("a"));
        assert_eq!(set.names(), vec!["b", "a"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate rule name")]
    fn duplicate_names_panic() {
        let _ = RuleSet::new().with(Named("x")).with(Named("x"));
    }
}
