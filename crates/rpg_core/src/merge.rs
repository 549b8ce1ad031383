//! Progression merge: parsed vault + persisted save -> `GameState`.
//!
//! Pure and idempotent. Same `(parsed, save, now)` in, same output out.

use std::collections::BTreeMap;

use crate::decay::{apply_decay, decay_rates, DecayLoss};
use crate::derived::{active_perks, buff_multiplier, combat_level, perk_multiplier, town_stats};
use crate::quests::overlay_progress;
use crate::{
    level_from_xp, xp_for_level, GameContent, GameState, ParsedState, PerkEffect, SaveData, Skill,
    SkillId, Task, TaskId, Timestamp,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub state: GameState,
    /// `save` with the advanced decay ledger, bootstrap gold, and pruned
    /// task overrides. Persist this.
    pub save: SaveData,
    pub decay_losses: Vec<DecayLoss>,
}

/// Raw XP per registry skill: parsed notes, action bonuses, and the XP
/// delta of any task whose completion the player toggled by hand.
fn raw_xp(
    parsed: &ParsedState,
    save: &SaveData,
    content: &GameContent,
) -> BTreeMap<SkillId, u64> {
    let mut raw: BTreeMap<SkillId, i64> = content
        .skills
        .iter()
        .map(|def| {
            let parsed_xp = parsed.skill_xp.get(&def.id).copied().unwrap_or(0);
            let bonus = save.bonus_xp.get(&def.id).copied().unwrap_or(0);
            (def.id.clone(), parsed_xp.saturating_add(bonus) as i64)
        })
        .collect();

    for task in &parsed.tasks {
        let Some(&overridden) = save.task_overrides.get(&task.id) else {
            continue;
        };
        if overridden == task.completed {
            continue;
        }
        let Some(skill) = task.skill_id.as_ref().and_then(|id| raw.get_mut(id)) else {
            continue;
        };
        let delta = task.xp_reward as i64;
        *skill += if overridden { delta } else { -delta };
    }

    raw.into_iter()
        .map(|(id, xp)| (id, xp.max(0) as u64))
        .collect()
}

fn build_skills(
    content: &GameContent,
    raw: &BTreeMap<SkillId, u64>,
    debt: &BTreeMap<SkillId, u64>,
) -> Vec<Skill> {
    content
        .skills
        .iter()
        .map(|def| {
            let raw_xp = raw.get(&def.id).copied().unwrap_or(0);
            let decay_debt = debt.get(&def.id).copied().unwrap_or(0).min(raw_xp);
            let current_xp = raw_xp - decay_debt;
            let level = level_from_xp(current_xp);
            Skill {
                id: def.id.clone(),
                name: def.name.clone(),
                icon: def.icon.clone(),
                color: def.color.clone(),
                perk: def.perk.clone(),
                raw_xp,
                decay_debt,
                current_xp,
                level,
                xp_for_next_level: xp_for_level(level + 1),
            }
        })
        .collect()
}

pub fn merge(
    parsed: &ParsedState,
    save: &SaveData,
    content: &GameContent,
    now: Timestamp,
) -> MergeOutcome {
    let mut next_save = save.clone();

    // An override lives only while its task exists and disagrees with the note.
    let parsed_done: BTreeMap<&TaskId, bool> =
        parsed.tasks.iter().map(|t| (&t.id, t.completed)).collect();
    next_save
        .task_overrides
        .retain(|id, completed| parsed_done.get(id).is_some_and(|done| done != completed));

    let raw = raw_xp(parsed, &next_save, content);

    // Decay-reduction perks are judged on raw levels so decay cannot switch
    // off its own discount.
    let raw_skills = build_skills(content, &raw, &BTreeMap::new());
    let reduction =
        perk_multiplier(&active_perks(&raw_skills, content), PerkEffect::DecayReduction);
    let decay = apply_decay(&raw, &save.decay, &decay_rates(content, reduction), now);
    next_save.decay = decay.ledger;

    let skills = build_skills(content, &raw, &next_save.decay.debt);
    let total_xp: u64 = skills.iter().map(|s| s.current_xp).sum();
    let total_level: u32 = skills.iter().map(|s| s.level).sum();

    if !next_save.bootstrap_applied
        && next_save.gold == 0
        && total_xp > content.constants.bootstrap_min_total_xp
    {
        next_save.gold = total_xp;
        next_save.bootstrap_applied = true;
    }

    let tasks: Vec<Task> = parsed
        .tasks
        .iter()
        .map(|task| {
            let mut task = task.clone();
            if let Some(&completed) = next_save.task_overrides.get(&task.id) {
                task.completed = completed;
            }
            task
        })
        .collect();

    let unlocked_buffs = tasks
        .iter()
        .filter(|t| t.completed)
        .flat_map(|t| t.buffs.iter().cloned())
        .collect();

    let base_layout = if next_save.base_layout.is_empty() {
        content.starter_layout.clone()
    } else {
        next_save.base_layout.clone()
    };

    let perks = active_perks(&skills, content);
    let xp_multiplier = buff_multiplier(&next_save.active_buffs, content)
        * perk_multiplier(&perks, PerkEffect::XpBoost);
    let gold_multiplier =
        next_save.settings.gold_multiplier * perk_multiplier(&perks, PerkEffect::GoldBoost);

    let state = GameState {
        combat: combat_level(&skills, &content.combat),
        town: town_stats(&base_layout, content),
        quests: overlay_progress(&parsed.quests, &next_save.quests),
        gold: next_save.gold,
        active_buffs: next_save.active_buffs.clone(),
        unknown_sources: parsed.unknown_sources.clone(),
        history: parsed.history.clone(),
        inventory: next_save.inventory.clone(),
        unlocks: next_save.unlocks.clone(),
        skills,
        tasks,
        base_layout,
        unlocked_buffs,
        total_xp,
        total_level,
        xp_multiplier,
        gold_multiplier,
        active_perks: perks,
        last_update: now,
    };

    MergeOutcome {
        state,
        save: next_save,
        decay_losses: decay.losses,
    }
}
