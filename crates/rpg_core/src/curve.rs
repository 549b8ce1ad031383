//! The experience curve.
//!
//! `xp_for_level(L) = floor(sum_{i=1}^{L-1} floor(i + 300 * 2^(i/7)) / 4)`

use std::sync::LazyLock;

pub const MAX_LEVEL: u32 = 126;

/// Cumulative XP thresholds indexed by level, `0..=MAX_LEVEL + 1`.
static THRESHOLDS: LazyLock<Vec<u64>> = LazyLock::new(|| {
    let mut table = Vec::with_capacity(MAX_LEVEL as usize + 2);
    table.push(0);
    let mut points = 0.0_f64;
    for level in 1..=MAX_LEVEL + 1 {
        if level > 1 {
            let i = f64::from(level - 1);
            points += (i + 300.0 * 2f64.powf(i / 7.0)).floor();
        }
        table.push((points / 4.0).floor() as u64);
    }
    table
});

/// Minimum cumulative XP for `level`. Levels at or below 1 cost nothing;
/// levels past `MAX_LEVEL + 1` are clamped.
pub fn xp_for_level(level: u32) -> u64 {
    let idx = level.min(MAX_LEVEL + 1) as usize;
    THRESHOLDS[idx]
}

/// Largest level in `1..=MAX_LEVEL` whose threshold `xp` meets.
pub fn level_from_xp(xp: u64) -> u32 {
    // thresholds[1..=MAX_LEVEL] is strictly increasing; count the ones reached.
    let reached = THRESHOLDS[1..=MAX_LEVEL as usize].partition_point(|&t| t <= xp);
    (reached as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_one_and_two_thresholds() {
        assert_eq!(xp_for_level(1), 0);
        assert_eq!(xp_for_level(2), 83);
        assert_eq!(xp_for_level(3), 174);
    }

    #[test]
    fn thresholds_strictly_increase() {
        for level in 2..=MAX_LEVEL + 1 {
            assert!(
                xp_for_level(level) > xp_for_level(level - 1),
                "curve flat at level {level}"
            );
        }
    }

    #[test]
    fn every_threshold_is_a_level_boundary() {
        for level in 1..=MAX_LEVEL {
            let xp = xp_for_level(level);
            assert_eq!(level_from_xp(xp), level);
            if level > 1 {
                assert_eq!(level_from_xp(xp - 1), level - 1);
            }
        }
    }

    #[test]
    fn level_is_capped() {
        assert_eq!(level_from_xp(u64::MAX), MAX_LEVEL);
        assert_eq!(level_from_xp(xp_for_level(MAX_LEVEL + 1)), MAX_LEVEL);
    }

    #[test]
    fn zero_xp_is_level_one() {
        assert_eq!(level_from_xp(0), 1);
    }
}
