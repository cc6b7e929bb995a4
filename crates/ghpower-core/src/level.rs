//! Power-level curve.
//!
//! Level `n` (0-based) costs `100 + 20n + 3n²` points, so the first levels
//! cost 100, 123, 152, 187, … Reaching level `L` costs the sum of the first
//! `L` level costs.

use serde::{Deserialize, Serialize};

/// Hard ceiling so absurd point totals cannot spin the walk loop.
pub const MAX_LEVEL: u32 = 10_000;

/// Where a point total sits on the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelProgress {
    pub level: u32,
    /// Points accumulated past the start of `level`.
    pub points_into_level: u64,
    /// Cost of advancing from `level` to `level + 1`.
    pub next_level_cost: u64,
    pub points_to_next: u64,
    /// `floor(points_into_level / next_level_cost * 100)`, clamped to 0..=100.
    pub progress_percent: u8,
}

/// Cost of advancing from level `n` to `n + 1`.
pub fn level_cost(n: u32) -> u64 {
    let n = u64::from(n);
    100 + 20 * n + 3 * n * n
}

/// Total points needed to reach `level` from zero.
pub fn cumulative_cost(level: u32) -> u64 {
    (0..level.min(MAX_LEVEL)).map(level_cost).sum()
}

pub fn level_from_points(points: u64) -> u32 {
    walk(points).0
}

pub fn progress_from_points(points: u64) -> LevelProgress {
    let (level, points_into_level) = walk(points);
    let next_level_cost = level_cost(level);
    let percent = points_into_level.saturating_mul(100) / next_level_cost;
    LevelProgress {
        level,
        points_into_level,
        next_level_cost,
        points_to_next: next_level_cost.saturating_sub(points_into_level),
        progress_percent: percent.min(100) as u8,
    }
}

/// Shared by both public entry points so they always agree on the level.
/// Returns `(level, points left over inside that level)`.
fn walk(points: u64) -> (u32, u64) {
    let mut level = 0;
    let mut remaining = points;
    while level < MAX_LEVEL {
        let cost = level_cost(level);
        if cost > remaining {
            break;
        }
        remaining -= cost;
        level += 1;
    }
    (level, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_points_is_level_zero() {
        assert_eq!(level_from_points(0), 0);
        let p = progress_from_points(0);
        assert_eq!(p.points_into_level, 0);
        assert_eq!(p.next_level_cost, 100);
        assert_eq!(p.progress_percent, 0);
    }

    #[test]
    fn exactly_first_cost_reaches_level_one() {
        let p = progress_from_points(100);
        assert_eq!(p.level, 1);
        assert_eq!(p.points_into_level, 0);
        assert_eq!(p.next_level_cost, 123);
        assert_eq!(p.points_to_next, 123);
    }

    #[test]
    fn halfway_through_level_zero() {
        let p = progress_from_points(50);
        assert_eq!(p.level, 0);
        assert_eq!(p.points_into_level, 50);
        assert_eq!(p.points_to_next, 50);
        assert_eq!(p.progress_percent, 50);
    }

    #[test]
    fn one_point_short_of_a_level() {
        let p = progress_from_points(cumulative_cost(3) - 1);
        assert_eq!(p.level, 2);
        assert_eq!(p.points_to_next, 1);
        assert_eq!(p.progress_percent, 99);
    }

    #[test]
    fn cost_curve_is_strictly_increasing() {
        assert_eq!(level_cost(0), 100);
        assert_eq!(level_cost(1), 123);
        assert_eq!(level_cost(2), 152);
        for n in 0..500 {
            assert!(level_cost(n + 1) > level_cost(n));
        }
    }

    #[test]
    fn cumulative_cost_lands_on_level_boundary() {
        for level in [1, 2, 5, 17, 250] {
            let p = progress_from_points(cumulative_cost(level));
            assert_eq!(p.level, level);
            assert_eq!(p.points_into_level, 0);
        }
    }

    #[test]
    fn both_functions_agree_and_percent_is_bounded() {
        let mut points = 0u64;
        while points < 2_000_000 {
            let p = progress_from_points(points);
            assert_eq!(level_from_points(points), p.level, "points = {points}");
            assert!(p.progress_percent <= 100);
            assert!(p.points_into_level < p.next_level_cost);
            points = points * 3 / 2 + 7;
        }
    }

    #[test]
    fn level_is_monotonic_in_points() {
        let mut previous = 0;
        for points in (0..200_000).step_by(97) {
            let level = level_from_points(points);
            assert!(level >= previous, "level dropped at {points}");
            previous = level;
        }
    }

    #[test]
    fn huge_totals_are_capped() {
        assert_eq!(level_from_points(u64::MAX), MAX_LEVEL);
        let p = progress_from_points(u64::MAX);
        assert_eq!(p.level, MAX_LEVEL);
        assert_eq!(p.progress_percent, 100);
        assert_eq!(p.points_to_next, 0);
    }
}
