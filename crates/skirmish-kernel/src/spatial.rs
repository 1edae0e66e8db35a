//! Uniform grid over living unit positions.
//!
//! Rebuilt once at the start of every tick from the living-unit buffer, then
//! read-only while rules run. Bucket vectors are cleared rather than dropped
//! between ticks so steady-state rebuilds do not allocate; a bucket that
//! stayed empty for a whole tick is dropped.

use std::collections::HashMap;

use skirmish_units::geometry::Vec2;
use skirmish_units::slot::UnitIndex;
use skirmish_units::store::UnitStore;

type CellKey = (i64, i64);

/// Past this many cells per axis a query scans every bucket instead.
const MAX_SPAN: i64 = 1 << 16;

#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell: f64,
    buckets: HashMap<CellKey, Vec<UnitIndex>>,
    occupied: usize,
}

impl SpatialGrid {
    /// `cell` must be positive and finite (checked by
    /// [`SimConfig::validate`](crate::config::SimConfig::validate)).
    pub fn new(cell: f64) -> Self {
        Self {
            cell,
            buckets: HashMap::new(),
            occupied: 0,
        }
    }

    fn key(&self, p: Vec2) -> CellKey {
        ((p.x / self.cell).floor() as i64, (p.y / self.cell).floor() as i64)
    }

    /// Index the positions of `units`.
    pub fn rebuild(&mut self, store: &UnitStore, units: &[UnitIndex]) {
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
        for &index in units {
            let key = self.key(store.pos(index));
            self.buckets.entry(key).or_default().push(index);
        }
        self.occupied = self.buckets.values().filter(|b| !b.is_empty()).count();
    }

    /// Call `visit` on every indexed unit in a cell that overlaps the circle,
    /// stopping at the first `true`. Candidates may lie outside the circle;
    /// callers filter by exact distance.
    pub fn visit(
        &self,
        center: Vec2,
        radius: f64,
        visit: &mut dyn FnMut(UnitIndex) -> bool,
    ) -> bool {
        if !(radius >= 0.0) {
            return false;
        }
        if !radius.is_finite() || radius / self.cell > MAX_SPAN as f64 {
            return self.scan_all(visit);
        }
        let Some((x0, y0, x1, y1)) = self.cell_range(center, radius) else {
            return self.scan_all(visit);
        };
        let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);
        if w > MAX_SPAN || h > MAX_SPAN || (w * h) as usize > self.occupied {
            return self.scan_all(visit);
        }
        for cx in x0..=x1 {
            for cy in y0..=y1 {
                if let Some(bucket) = self.buckets.get(&(cx, cy)) {
                    if bucket.iter().any(|&i| visit(i)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Cell bounds of the circle's box plus one cell of padding, which
    /// absorbs rounding at cell borders. `None` when a bound leaves the key
    /// range; keys saturate far from the origin.
    fn cell_range(&self, center: Vec2, radius: f64) -> Option<(i64, i64, i64, i64)> {
        let (x0, y0) = self.key(Vec2::new(center.x - radius, center.y - radius));
        let (x1, y1) = self.key(Vec2::new(center.x + radius, center.y + radius));
        let (x0, y0) = (x0.checked_sub(1)?, y0.checked_sub(1)?);
        let (x1, y1) = (x1.checked_add(1)?, y1.checked_add(1)?);
        // Spans wider than the key range cannot be counted in i64 either.
        x1.checked_sub(x0)?.checked_add(1)?;
        y1.checked_sub(y0)?.checked_add(1)?;
        Some((x0, y0, x1, y1))
    }

    fn scan_all(&self, visit: &mut dyn FnMut(UnitIndex) -> bool) -> bool {
        self.buckets
            .values()
            .flat_map(|b| b.iter().copied())
            .any(|i| visit(i))
    }

    /// Indexed units within exactly `radius` of `center`, ascending.
    pub fn within(&self, store: &UnitStore, center: Vec2, radius: f64, out: &mut Vec<UnitIndex>) {
        out.clear();
        self.visit(center, radius, &mut |i| {
            if store.pos(i).distance(center) <= radius {
                out.push(i);
            }
            false
        });
        out.sort_unstable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_units::prelude::*;

    fn scattered() -> (UnitStore, Vec<UnitIndex>) {
        let mut store = UnitStore::new(64, CapacityPolicy::Reject);
        for i in 0..40 {
            let x = (i * 7 % 23) as f64 - 11.0;
            let y = (i * 5 % 17) as f64 * 1.5 - 12.0;
            store
                .add_unit(UnitSpec::new(format!("u{i}"), Vec2::new(x, y), Team::Hostile, 1.0))
                .unwrap();
        }
        let living = store.living().collect();
        (store, living)
    }

    #[test]
    fn within_matches_linear_scan() {
        let (store, living) = scattered();
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&store, &living);
        let mut found = Vec::new();
        for &(cx, cy, r) in &[(0.0, 0.0, 3.0), (-8.0, 4.0, 6.5), (5.0, -5.0, 0.0), (0.0, 0.0, 100.0)] {
            let center = Vec2::new(cx, cy);
            grid.within(&store, center, r, &mut found);
            let expected: Vec<UnitIndex> = living
                .iter()
                .copied()
                .filter(|&i| store.pos(i).distance(center) <= r)
                .collect();
            assert_eq!(found, expected, "center {center:?} radius {r}");
        }
    }

    #[test]
    fn infinite_and_invalid_radii() {
        let (store, living) = scattered();
        let mut grid = SpatialGrid::new(2.0);
        grid.rebuild(&store, &living);
        let mut count = 0;
        grid.visit(Vec2::ZERO, f64::INFINITY, &mut |_| {
            count += 1;
            false
        });
        assert_eq!(count, living.len());
        assert!(!grid.visit(Vec2::ZERO, f64::NAN, &mut |_| true));
        assert!(!grid.visit(Vec2::ZERO, -1.0, &mut |_| true));
    }

    #[test]
    fn rebuild_forgets_previous_positions() {
        let (store, living) = scattered();
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&store, &living);
        grid.rebuild(&store, &living[..1]);
        let mut found = Vec::new();
        grid.within(&store, Vec2::ZERO, 1000.0, &mut found);
        assert_eq!(found, vec![living[0]]);
    }

    #[test]
    fn huge_radius_scans_everything() {
        let (store, living) = scattered();
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&store, &living);
        let mut found = Vec::new();
        grid.within(&store, Vec2::new(3.0, -2.0), 1e300, &mut found);
        assert_eq!(found, living);
        grid.within(&store, Vec2::ZERO, f64::MAX, &mut found);
        assert_eq!(found, living);
    }

    #[test]
    fn far_away_units_are_still_found() {
        let mut store = UnitStore::new(4, CapacityPolicy::Reject);
        for (id, x, y) in [("a", 1e30, 0.0), ("b", 1e30, 3.0), ("c", -1e30, -1e30), ("d", 0.0, 0.0)] {
            store
                .add_unit(UnitSpec::new(id, Vec2::new(x, y), Team::Hostile, 1.0))
                .unwrap();
        }
        let living: Vec<UnitIndex> = store.living().collect();
        let mut grid = SpatialGrid::new(4.0);
        grid.rebuild(&store, &living);
        let mut found = Vec::new();
        grid.within(&store, Vec2::new(1e30, 0.0), 5.0, &mut found);
        assert_eq!(found, vec![UnitIndex(0), UnitIndex(1)]);
        grid.within(&store, Vec2::new(-1e30, -1e30), 1.0, &mut found);
        assert_eq!(found, vec![UnitIndex(2)]);
    }

    #[test]
    fn buckets_do_not_pile_up_behind_a_moving_unit() {
        let mut store = UnitStore::new(1, CapacityPolicy::Reject);
        let walker = store
            .add_unit(UnitSpec::new("walker", Vec2::ZERO, Team::Neutral, 1.0))
            .unwrap();
        let mut commands = CommandQueue::new();
        let mut grid = SpatialGrid::new(1.0);
        for step in 0..200 {
            commands.move_to(walker, Vec2::new(step as f64 * 3.0, 0.0), true, "test", CausalReason::Setup);
            commands.apply(&mut store, &mut EventQueue::new());
            grid.rebuild(&store, &[walker]);
            assert!(grid.buckets.len() <= 2, "{} buckets at step {step}", grid.buckets.len());
        }
    }
}
