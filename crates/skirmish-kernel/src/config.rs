//! Simulation configuration.

use serde::{Deserialize, Serialize};

use skirmish_units::store::CapacityPolicy;

use crate::SimError;

/// Settings fixed for the lifetime of a [`Simulation`](crate::Simulation).
///
/// Every field has a default, so a partial JSON object is a valid config:
///
/// ```
/// use skirmish_kernel::config::SimConfig;
///
/// let config: SimConfig = serde_json::from_str(r#"{ "seed": 7 }"#).unwrap();
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.max_resolver_iterations, 10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for the per-tick random streams.
    pub seed: u64,
    /// Fixpoint resolver passes per tick before queued items are dropped.
    /// Must be at least 1.
    pub max_resolver_iterations: u32,
    /// Initial unit store capacity.
    pub store_capacity: usize,
    pub capacity_policy: CapacityPolicy,
    /// Side length of a spatial grid cell. Must be positive and finite.
    pub spatial_cell_size: f64,
    /// Free dead units' slots at the end of every tick.
    pub prune_dead: bool,
    /// Tick records retained by the journal.
    pub journal_depth: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            max_resolver_iterations: 10,
            store_capacity: 1024,
            capacity_policy: CapacityPolicy::Reject,
            spatial_cell_size: 4.0,
            prune_dead: true,
            journal_depth: 256,
        }
    }
}

impl SimConfig {
    /// Check the invariants documented on each field.
    ///
    /// # Errors
    ///
    /// [`SimError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.max_resolver_iterations == 0 {
            return Err(SimError::Config {
                reason: "max_resolver_iterations must be at least 1".to_owned(),
            });
        }
        if !(self.spatial_cell_size.is_finite() && self.spatial_cell_size > 0.0) {
            return Err(SimError::Config {
                reason: format!(
                    "spatial_cell_size must be positive and finite, got {}",
                    self.spatial_cell_size
                ),
            });
        }
        Ok(())
    }
}
