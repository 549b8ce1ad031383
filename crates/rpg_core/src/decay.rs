//! Time-based skill decay, tracked as debt against raw XP.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{DecayLedger, GameContent, SkillId, Timestamp, MS_PER_HOUR};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayLoss {
    pub skill_id: SkillId,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayOutcome {
    pub ledger: DecayLedger,
    pub losses: Vec<DecayLoss>,
}

/// Per-skill XP loss per hour, scaled by `reduction` (1.0 = none).
pub fn decay_rates(content: &GameContent, reduction: f64) -> BTreeMap<SkillId, f64> {
    content
        .skills
        .iter()
        .map(|skill| {
            let base = skill
                .decay_rate_per_hour
                .unwrap_or(content.constants.default_decay_rate_per_hour);
            (skill.id.clone(), (base * reduction).max(0.0))
        })
        .collect()
}

/// Advances the ledger to `now`.
///
/// A skill decays once more than an hour has passed since it was last
/// touched. The clock only resets when at least one XP is lost, so slow
/// decayers accumulate fractional hours until a whole point is due. Debt is
/// capped at raw XP; a skill seen for the first time starts its clock now.
pub fn apply_decay(
    raw_xp: &BTreeMap<SkillId, u64>,
    ledger: &DecayLedger,
    rates: &BTreeMap<SkillId, f64>,
    now: Timestamp,
) -> DecayOutcome {
    let mut next = DecayLedger::default();
    let mut losses = Vec::new();

    for (skill_id, &raw) in raw_xp {
        let mut debt = ledger.debt.get(skill_id).copied().unwrap_or(0).min(raw);
        let mut touched = ledger.last_touched.get(skill_id).copied().unwrap_or(now);

        let hours = (now - touched) as f64 / MS_PER_HOUR as f64;
        if hours > 1.0 {
            let rate = rates.get(skill_id).copied().unwrap_or(0.0);
            let loss = (rate * hours).floor() as u64;
            if loss > 0 {
                let capped = debt.saturating_add(loss).min(raw);
                if capped > debt {
                    losses.push(DecayLoss {
                        skill_id: skill_id.clone(),
                        amount: capped - debt,
                    });
                }
                debt = capped;
                touched = now;
            }
        }

        if debt > 0 {
            next.debt.insert(skill_id.clone(), debt);
        }
        next.last_touched.insert(skill_id.clone(), touched);
    }

    DecayOutcome {
        ledger: next,
        losses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: i64 = MS_PER_HOUR;

    fn strength() -> SkillId {
        SkillId("strength".to_string())
    }

    fn one_skill(raw: u64, rate: f64) -> (BTreeMap<SkillId, u64>, BTreeMap<SkillId, f64>) {
        (
            BTreeMap::from([(strength(), raw)]),
            BTreeMap::from([(strength(), rate)]),
        )
    }

    #[test]
    fn five_idle_hours_cost_fifty() {
        let (raw, rates) = one_skill(1000, 10.0);
        let mut ledger = DecayLedger::default();
        ledger.last_touched.insert(strength(), 0);

        let out = apply_decay(&raw, &ledger, &rates, 5 * HOUR);
        assert_eq!(out.ledger.debt[&strength()], 50);
        assert_eq!(out.ledger.last_touched[&strength()], 5 * HOUR);
        assert_eq!(out.losses, vec![DecayLoss { skill_id: strength(), amount: 50 }]);
    }

    #[test]
    fn first_sight_starts_the_clock() {
        let (raw, rates) = one_skill(1000, 10.0);
        let out = apply_decay(&raw, &DecayLedger::default(), &rates, 42 * HOUR);
        assert!(out.ledger.debt.is_empty());
        assert_eq!(out.ledger.last_touched[&strength()], 42 * HOUR);
        assert!(out.losses.is_empty());
    }

    #[test]
    fn under_an_hour_does_nothing() {
        let (raw, rates) = one_skill(1000, 10.0);
        let mut ledger = DecayLedger::default();
        ledger.last_touched.insert(strength(), 0);
        let out = apply_decay(&raw, &ledger, &rates, HOUR);
        assert!(out.losses.is_empty());
        assert_eq!(out.ledger.last_touched[&strength()], 0);
    }

    #[test]
    fn slow_decay_waits_for_a_whole_point() {
        let (raw, rates) = one_skill(1000, 0.1);
        let mut ledger = DecayLedger::default();
        ledger.last_touched.insert(strength(), 0);

        let early = apply_decay(&raw, &ledger, &rates, 5 * HOUR);
        assert!(early.losses.is_empty());
        assert_eq!(early.ledger.last_touched[&strength()], 0);

        let later = apply_decay(&raw, &early.ledger, &rates, 10 * HOUR);
        assert_eq!(later.ledger.debt[&strength()], 1);
    }

    #[test]
    fn debt_never_exceeds_raw() {
        let (raw, rates) = one_skill(30, 10.0);
        let mut ledger = DecayLedger::default();
        ledger.last_touched.insert(strength(), 0);
        let out = apply_decay(&raw, &ledger, &rates, 100 * HOUR);
        assert_eq!(out.ledger.debt[&strength()], 30);
    }

    #[test]
    fn stale_debt_is_clamped_when_raw_shrinks() {
        let (raw, rates) = one_skill(10, 10.0);
        let mut ledger = DecayLedger::default();
        ledger.debt.insert(strength(), 500);
        ledger.last_touched.insert(strength(), 0);
        let out = apply_decay(&raw, &ledger, &rates, 0);
        assert_eq!(out.ledger.debt[&strength()], 10);
    }
}
