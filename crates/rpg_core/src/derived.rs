//! Values computed from skill levels and the town layout.

use std::collections::BTreeSet;

use crate::{
    ActivePerk, Archetype, BuffId, CombatDef, CombatLevel, GameContent, PerkEffect,
    PlacedStructure, Skill, SkillId, TownStats,
};

fn level_of(skills: &[Skill], id: &SkillId) -> u32 {
    skills.iter().find(|s| &s.id == id).map_or(1, |s| s.level)
}

/// `floor(base + 0.325 * max(melee, mage, range))`. Ties go Warrior, Mage, Ranger.
pub fn combat_level(skills: &[Skill], def: &CombatDef) -> CombatLevel {
    let lifestyle: u32 = def.lifestyle.iter().map(|id| level_of(skills, id)).sum();
    let life_score = if def.lifestyle.is_empty() {
        0
    } else {
        lifestyle / def.lifestyle.len() as u32
    };

    let base = f64::from(
        level_of(skills, &def.health) + level_of(skills, &def.social) + life_score / 2,
    ) / 4.0;
    let melee = f64::from(level_of(skills, &def.melee)) * 2.0;
    let mage = f64::from(level_of(skills, &def.magic)) * 1.5;
    let range = f64::from(level_of(skills, &def.ranged)) * 1.5;

    let (archetype, best) = if melee >= mage && melee >= range {
        (Archetype::Warrior, melee)
    } else if mage >= range {
        (Archetype::Mage, mage)
    } else {
        (Archetype::Ranger, range)
    };

    CombatLevel {
        level: (base + 0.325 * best).floor() as u32,
        archetype,
    }
}

/// Summed tax and defense. Decorative and damaged structures contribute nothing.
pub fn town_stats(layout: &[PlacedStructure], content: &GameContent) -> TownStats {
    let mut stats = TownStats::default();
    for placed in layout.iter().filter(|p| !p.damaged) {
        let Some(def) = content.building(&placed.building_id) else {
            continue;
        };
        if def.decorative {
            continue;
        }
        stats.tax += def.tax_value;
        stats.defense += def.defense_value;
    }
    stats
}

/// Product of active buff multipliers; unknown ids count as 1.
pub fn buff_multiplier(active: &BTreeSet<BuffId>, content: &GameContent) -> f64 {
    active
        .iter()
        .filter_map(|id| content.buff(id))
        .map(|b| b.multiplier)
        .product()
}

pub fn active_perks(skills: &[Skill], content: &GameContent) -> Vec<ActivePerk> {
    content
        .perks
        .iter()
        .filter_map(|perk| {
            let skill = skills.iter().find(|s| s.id == perk.skill_id)?;
            (skill.level >= perk.level).then(|| ActivePerk {
                id: perk.id.clone(),
                name: perk.name.clone(),
                description: perk.description.clone(),
                effect: perk.effect,
                value: perk.value,
                source: format!("Lvl {} {}", perk.level, skill.name),
            })
        })
        .collect()
}

pub fn perk_multiplier(perks: &[ActivePerk], effect: PerkEffect) -> f64 {
    perks
        .iter()
        .filter(|p| p.effect == effect)
        .map(|p| p.value)
        .product()
}
