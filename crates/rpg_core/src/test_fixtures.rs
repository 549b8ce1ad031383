//! Shared test fixtures for `rpg_core` and downstream crates.
//!
//! `base_content()` mirrors the shipped content closely enough for
//! end-to-end scenarios: all fifteen skills, the full habit registry, a
//! trimmed building list, three buffs, and two content quests.

use crate::{
    Aggregation, BuffDef, BuffId, BuildingDef, BuildingId, CombatDef, Constants, GameContent,
    ItemDef, ItemId, PerkDef, PerkEffect, PlacedStructure, Quest, QuestDifficulty, QuestId,
    QuestKeyword, QuestReward, QuestStatus, QuestStep, SaveData, SignalMapping, Skill, SkillDef,
    SkillId, StepId, StructureId, Timestamp, VaultFile,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::smallvec;

/// 2024-01-01T00:00:00Z.
pub const NOW: Timestamp = 1_704_067_200_000;

fn skill(id: &str, name: &str, decay: f64) -> SkillDef {
    SkillDef {
        id: SkillId(id.to_string()),
        name: name.to_string(),
        icon: format!("fa-{id}"),
        color: "text-zinc-400".to_string(),
        description: String::new(),
        perk: None,
        decay_rate_per_hour: Some(decay),
    }
}

fn signal(key: &str, skill: &str, xp_per_unit: f64, target: f64, unit: &str) -> SignalMapping {
    SignalMapping {
        key: key.to_string(),
        skill_id: SkillId(skill.to_string()),
        xp_per_unit,
        aggregation: Aggregation::Count,
        target: Some(target),
        unit: Some(unit.to_string()),
        label: None,
    }
}

fn building(id: &str, cost: u64, tax_value: i64, defense_value: i64) -> BuildingDef {
    BuildingDef {
        id: BuildingId(id.to_string()),
        name: id.replace('_', " "),
        cost,
        tax_value,
        defense_value,
        decorative: false,
        hidden: false,
        upgrade_to: None,
    }
}

fn item(id: &str, value: u64, weight: u32) -> ItemDef {
    ItemDef {
        id: ItemId(id.to_string()),
        name: id.replace('_', " "),
        description: String::new(),
        value,
        weight,
    }
}

fn keyword(keyword: &str, skill: &str) -> QuestKeyword {
    QuestKeyword {
        keyword: keyword.to_string(),
        skill_id: SkillId(skill.to_string()),
    }
}

pub fn placed(id: &str, building_id: &str, x: i32, y: i32) -> PlacedStructure {
    PlacedStructure {
        id: StructureId(id.to_string()),
        x,
        y,
        building_id: BuildingId(building_id.to_string()),
        damaged: false,
    }
}

pub fn base_content() -> GameContent {
    let mut scout_tongue = signal("Scout_Tongue", "scout", 15.0, 1.0, "bonus");
    scout_tongue.aggregation = Aggregation::Completion;

    let mut path = building("path_dirt", 10, 0, 0);
    path.decorative = true;
    let mut stone_wall = building("stone_wall", 150, 15, 2);
    stone_wall.hidden = true;
    let mut wood_wall = building("wood_wall", 25, 5, 1);
    wood_wall.upgrade_to = Some(stone_wall.id.clone());

    GameContent {
        content_version: "test".to_string(),
        skills: vec![
            skill("strength", "Strength", 10.0),
            skill("hitpoints", "Hitpoints", 5.0),
            skill("defense", "Defense", 3.0),
            skill("dungeoneering", "Dungeoneering", 0.5),
            skill("crafting", "Crafting", 2.0),
            skill("scout", "Scout", 5.0),
            skill("farming", "Farming", 5.0),
            skill("cooking", "Cooking", 2.0),
            skill("knowledge", "Knowledge", 0.1),
            skill("research", "Research", 0.2),
            skill("social", "Social", 4.0),
            skill("writing", "Writing", 1.0),
            skill("art", "Art", 1.0),
            skill("music", "Music", 3.0),
            skill("language", "Language", 3.0),
        ],
        signals: vec![
            signal("Brush_Teeth", "hitpoints", 10.0, 2.0, "times"),
            signal("Meditation", "hitpoints", 2.0, 10.0, "mins"),
            signal("Dog_Walk", "scout", 10.0, 2.0, "km"),
            scout_tongue,
            signal("Coding", "dungeoneering", 2.0, 30.0, "mins"),
            signal("Exercise", "strength", 2.0, 30.0, "mins"),
            signal("Study", "knowledge", 1.0, 30.0, "mins"),
            signal("Call_loved_one", "social", 50.0, 1.0, "call"),
            signal("Cooking_Prep", "cooking", 20.0, 1.0, "meal"),
            signal("Journaling", "writing", 20.0, 1.0, "entry"),
        ],
        buildings: vec![
            path,
            wood_wall,
            stone_wall,
            building("tree_pine", 20, 2, 0),
            building("well", 150, 10, 0),
            building("house_cottage", 500, 15, 0),
            building("guard_dog", 250, -5, 6),
        ],
        buffs: vec![
            BuffDef {
                id: BuffId("morning_momentum".to_string()),
                name: "Morning Momentum".to_string(),
                multiplier: 1.15,
                description: "+15% XP".to_string(),
            },
            BuffDef {
                id: BuffId("workout_boost".to_string()),
                name: "Endorphin Rush".to_string(),
                multiplier: 1.1,
                description: "+10% XP".to_string(),
            },
            BuffDef {
                id: BuffId("potion_focus".to_string()),
                name: "Potion of Focus".to_string(),
                multiplier: 1.2,
                description: "+20% XP".to_string(),
            },
        ],
        perks: vec![
            PerkDef {
                id: crate::PerkId("perk_knowledge_10".to_string()),
                skill_id: SkillId("knowledge".to_string()),
                level: 10,
                name: "Efficiency".to_string(),
                description: "+10% XP gain".to_string(),
                effect: PerkEffect::XpBoost,
                value: 1.1,
            },
            PerkDef {
                id: crate::PerkId("perk_hitpoints_10".to_string()),
                skill_id: SkillId("hitpoints".to_string()),
                level: 10,
                name: "Inner Peace".to_string(),
                description: "Decay reduced by 10%".to_string(),
                effect: PerkEffect::DecayReduction,
                value: 0.9,
            },
        ],
        items: vec![
            item("herb_green", 5, 50),
            item("ore_copper", 5, 30),
            item("ore_iron", 15, 15),
            item("geode", 50, 5),
            item("potion_energy", 20, 0),
        ],
        quests: vec![
            Quest {
                id: QuestId("quest_first_steps".to_string()),
                name: "First Steps".to_string(),
                difficulty: QuestDifficulty::Novice,
                description: "Get moving.".to_string(),
                steps: smallvec![
                    QuestStep {
                        id: StepId("walk".to_string()),
                        description: "Take a walk".to_string(),
                        completed: false,
                    },
                    QuestStep {
                        id: StepId("stretch".to_string()),
                        description: "Stretch".to_string(),
                        completed: false,
                    },
                ],
                rewards: smallvec![QuestReward {
                    xp: 100,
                    skill_id: Some(SkillId("strength".to_string())),
                    gold: 50,
                    item: Some("Cape of Accomplishment".to_string()),
                }],
                status: QuestStatus::NotStarted,
                prereq_quest_id: None,
            },
            Quest {
                id: QuestId("quest_second_wind".to_string()),
                name: "Second Wind".to_string(),
                difficulty: QuestDifficulty::Intermediate,
                description: "Keep going.".to_string(),
                steps: smallvec![QuestStep {
                    id: StepId("run".to_string()),
                    description: "Run a mile".to_string(),
                    completed: false,
                }],
                rewards: smallvec![QuestReward {
                    xp: 0,
                    skill_id: None,
                    gold: 25,
                    item: None,
                }],
                status: QuestStatus::NotStarted,
                prereq_quest_id: Some(QuestId("quest_first_steps".to_string())),
            },
        ],
        quest_keywords: vec![
            keyword("meal", "cooking"),
            keyword("recipe", "cooking"),
            keyword("grant", "knowledge"),
            keyword("dragon", "knowledge"),
            keyword("email", "social"),
            keyword("vacation", "social"),
        ],
        starter_layout: vec![
            placed("starter_house", "house_cottage", 12, 12),
            placed("p1", "path_dirt", 11, 12),
            placed("t1", "tree_pine", 13, 12),
        ],
        combat: CombatDef {
            health: SkillId("hitpoints".to_string()),
            social: SkillId("social".to_string()),
            melee: SkillId("strength".to_string()),
            magic: SkillId("dungeoneering".to_string()),
            ranged: SkillId("knowledge".to_string()),
            lifestyle: [
                "cooking", "farming", "crafting", "scout", "writing", "art", "music", "language",
                "research",
            ]
            .iter()
            .map(|id| SkillId((*id).to_string()))
            .collect(),
        },
        constants: Constants {
            default_decay_rate_per_hour: 1.0,
            writing_skill: SkillId("writing".to_string()),
            writing_chars_per_xp: 100,
            bootstrap_min_total_xp: 50,
            quest_reward_xp: 250,
            quest_reward_gold: 100,
            loot_chance: 0.10,
            focus_xp_per_minute: 2.0,
            focus_bonus_minutes: 20.0,
            focus_bonus_multiplier: 1.2,
            focus_min_seconds: 5,
            tax_cycle_ms: crate::MS_PER_HOUR,
            grid_size: 24,
            repair_cost: 10,
            ignored_keys: ["tags", "cssclasses", "date", "aliases", "position"]
                .iter()
                .map(|k| (*k).to_string())
                .collect(),
            quests_file_stem: "QUESTS".to_string(),
        },
    }
}

/// Fresh save as a first run would write it.
pub fn base_save(content: &GameContent) -> SaveData {
    SaveData::new_game(content)
}

pub fn vault_file(path: &str, content: &str) -> VaultFile {
    VaultFile {
        path: path.to_string(),
        content: content.to_string(),
    }
}

/// Single-step quest with the given status and optional prerequisite.
pub fn quest(id: &str, status: QuestStatus, prereq: Option<&str>) -> Quest {
    Quest {
        id: QuestId(id.to_string()),
        name: id.to_string(),
        difficulty: QuestDifficulty::Novice,
        description: String::new(),
        steps: smallvec![QuestStep {
            id: StepId(format!("{id}_step_1")),
            description: String::new(),
            completed: status == QuestStatus::Completed,
        }],
        rewards: smallvec![],
        status,
        prereq_quest_id: prereq.map(|p| QuestId(p.to_string())),
    }
}

/// A skill sitting exactly at the start of `level`.
pub fn skill_at_level(def: &SkillDef, level: u32) -> Skill {
    let xp = crate::xp_for_level(level);
    Skill {
        id: def.id.clone(),
        name: def.name.clone(),
        icon: def.icon.clone(),
        color: def.color.clone(),
        perk: def.perk.clone(),
        raw_xp: xp,
        decay_debt: 0,
        current_xp: xp,
        level,
        xp_for_next_level: crate::xp_for_level(level + 1),
    }
}

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
