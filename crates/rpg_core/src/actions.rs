//! Player actions. Each one validates against the current `GameState` and,
//! on success, mutates only the `SaveData`. The caller re-merges afterwards.

use rand::Rng;

use crate::id::structure_id;
use crate::loot::roll_loot;
use crate::quests::{all_steps_complete, prerequisite_met};
use crate::{
    Action, Aggregation, BuffId, BuildingId, Constants, CustomMapping, Event, GameContent,
    GameState, PlacedStructure, QuestId, QuestProgress, QuestStatus, Rejection, SaveData,
    Settings, SkillId, StepId, TaskId, Timestamp,
};

/// XP and gold for a focus session of `seconds`.
pub fn focus_reward(seconds: u64, gold_multiplier: f64, constants: &Constants) -> (u64, u64) {
    let minutes = seconds as f64 / 60.0;
    let bonus = if minutes >= constants.focus_bonus_minutes {
        constants.focus_bonus_multiplier
    } else {
        1.0
    };
    let xp = (minutes * constants.focus_xp_per_minute * bonus).floor().max(0.0);
    let gold = (xp * gold_multiplier).floor().max(0.0);
    (xp as u64, gold as u64)
}

pub fn apply_action(
    save: &mut SaveData,
    state: &GameState,
    action: &Action,
    content: &GameContent,
    rng: &mut impl Rng,
    now: Timestamp,
) -> Result<Vec<Event>, Rejection> {
    match action {
        Action::ToggleTask { task_id } => handle_toggle_task(save, state, task_id, content, rng),
        Action::StartQuest { quest_id } => handle_start_quest(save, state, quest_id),
        Action::ToggleQuestStep { quest_id, step_id } => {
            handle_toggle_quest_step(save, state, quest_id, step_id)
        }
        Action::CompleteQuest { quest_id } => handle_complete_quest(save, state, quest_id),
        Action::PlaceBuilding { building_id, x, y } => {
            handle_place_building(save, state, building_id, (*x, *y), content, rng)
        }
        Action::RemoveBuilding { x, y } => handle_remove_building(save, state, (*x, *y)),
        Action::SetStructureDamaged { x, y, damaged } => {
            handle_set_damaged(save, state, (*x, *y), *damaged, content)
        }
        Action::AdjustGold { delta } => Ok(vec![adjust_gold(save, *delta)]),
        Action::CollectTaxes => handle_collect_taxes(save, state, content, now),
        Action::ToggleBuff { buff_id } => handle_toggle_buff(save, buff_id, content),
        Action::SaveSettings { settings } => Ok(handle_save_settings(save, settings)),
        Action::MapSource {
            key,
            skill_id,
            xp_per_unit,
            aggregation,
        } => handle_map_source(save, key, skill_id, *xp_per_unit, *aggregation, content),
        Action::IgnoreSource { key } => handle_ignore_source(save, key),
        Action::CompleteFocusSession { skill_id, seconds } => {
            handle_focus_session(save, state, skill_id, *seconds, content)
        }
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

fn handle_toggle_task(
    save: &mut SaveData,
    state: &GameState,
    task_id: &TaskId,
    content: &GameContent,
    rng: &mut impl Rng,
) -> Result<Vec<Event>, Rejection> {
    let task = state
        .task(task_id)
        .ok_or_else(|| Rejection::UnknownTask(task_id.clone()))?;
    let completed = !task.completed;
    save.task_overrides.insert(task_id.clone(), completed);

    let mut events = vec![Event::TaskToggled {
        task_id: task_id.clone(),
        completed,
    }];
    if completed {
        for buff_id in &task.buffs {
            if content.buff(buff_id).is_some() && save.active_buffs.insert(buff_id.clone()) {
                events.push(Event::BuffActivated {
                    buff_id: buff_id.clone(),
                });
            }
        }
        if let Some(item_id) = roll_loot(content, rng) {
            *save.inventory.entry(item_id.clone()).or_insert(0) += 1;
            events.push(Event::LootDropped { item_id });
        }
    }
    Ok(events)
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

fn handle_start_quest(
    save: &mut SaveData,
    state: &GameState,
    quest_id: &QuestId,
) -> Result<Vec<Event>, Rejection> {
    let quest = state
        .quest(quest_id)
        .ok_or_else(|| Rejection::UnknownQuest(quest_id.clone()))?;
    if quest.status != QuestStatus::NotStarted {
        return Err(Rejection::QuestNotStartable {
            quest_id: quest_id.clone(),
            status: quest.status,
        });
    }
    if !prerequisite_met(quest, &state.quests) {
        return Err(Rejection::PrerequisiteUnmet {
            quest_id: quest_id.clone(),
            prereq: quest.prereq_quest_id.clone().unwrap_or_else(|| quest_id.clone()),
        });
    }
    save.quests.entry(quest_id.clone()).or_default().status = QuestStatus::InProgress;
    Ok(vec![Event::QuestStarted {
        quest_id: quest_id.clone(),
    }])
}

fn handle_toggle_quest_step(
    save: &mut SaveData,
    state: &GameState,
    quest_id: &QuestId,
    step_id: &StepId,
) -> Result<Vec<Event>, Rejection> {
    let quest = state
        .quest(quest_id)
        .ok_or_else(|| Rejection::UnknownQuest(quest_id.clone()))?;
    if quest.status != QuestStatus::InProgress {
        return Err(Rejection::QuestNotInProgress {
            quest_id: quest_id.clone(),
            status: quest.status,
        });
    }
    let step = quest
        .steps
        .iter()
        .find(|s| &s.id == step_id)
        .ok_or_else(|| Rejection::UnknownStep {
            quest_id: quest_id.clone(),
            step_id: step_id.clone(),
        })?;

    let completed = !step.completed;
    let progress = save
        .quests
        .entry(quest_id.clone())
        .or_insert_with(|| QuestProgress {
            status: quest.status,
            ..QuestProgress::default()
        });
    progress.steps.insert(step_id.clone(), completed);
    Ok(vec![Event::QuestStepToggled {
        quest_id: quest_id.clone(),
        step_id: step_id.clone(),
        completed,
    }])
}

/// Rewards land exactly once: a second call on a completed quest is a no-op.
fn handle_complete_quest(
    save: &mut SaveData,
    state: &GameState,
    quest_id: &QuestId,
) -> Result<Vec<Event>, Rejection> {
    let quest = state
        .quest(quest_id)
        .ok_or_else(|| Rejection::UnknownQuest(quest_id.clone()))?;
    let rewarded = save.quests.get(quest_id).is_some_and(|p| p.rewarded);
    if quest.status == QuestStatus::Completed || rewarded {
        return Ok(Vec::new());
    }
    if quest.status != QuestStatus::InProgress {
        return Err(Rejection::QuestNotInProgress {
            quest_id: quest_id.clone(),
            status: quest.status,
        });
    }
    if !all_steps_complete(quest) {
        return Err(Rejection::StepsIncomplete(quest_id.clone()));
    }

    let mut xp = Vec::new();
    let mut base_gold = 0;
    let mut unlocks = Vec::new();
    for reward in &quest.rewards {
        if let Some(skill_id) = reward.skill_id.as_ref().filter(|_| reward.xp > 0) {
            *save.bonus_xp.entry(skill_id.clone()).or_insert(0) += reward.xp;
            xp.push((skill_id.clone(), reward.xp));
        }
        base_gold += reward.gold;
        if let Some(item) = &reward.item {
            save.unlocks.insert(item.clone());
            unlocks.push(item.clone());
        }
    }
    let gold = (base_gold as f64 * state.gold_multiplier).floor() as u64;
    save.gold = save.gold.saturating_add(gold);

    let progress = save.quests.entry(quest_id.clone()).or_default();
    progress.status = QuestStatus::Completed;
    progress.rewarded = true;
    for step in &quest.steps {
        progress.steps.insert(step.id.clone(), true);
    }

    Ok(vec![Event::QuestCompleted {
        quest_id: quest_id.clone(),
        xp,
        gold,
        unlocks,
    }])
}

// ---------------------------------------------------------------------------
// Town
// ---------------------------------------------------------------------------

/// The layout actions edit: the saved one, or the starter layout on first edit.
fn editable_layout<'a>(save: &'a mut SaveData, state: &GameState) -> &'a mut Vec<PlacedStructure> {
    if save.base_layout.is_empty() {
        save.base_layout.clone_from(&state.base_layout);
    }
    &mut save.base_layout
}

fn handle_place_building(
    save: &mut SaveData,
    state: &GameState,
    building_id: &BuildingId,
    (x, y): (i32, i32),
    content: &GameContent,
    rng: &mut impl Rng,
) -> Result<Vec<Event>, Rejection> {
    let def = content
        .building(building_id)
        .ok_or_else(|| Rejection::UnknownBuilding(building_id.clone()))?;
    if def.hidden {
        return Err(Rejection::NotPurchasable(building_id.clone()));
    }
    let size = content.constants.grid_size;
    if !(0..size).contains(&x) || !(0..size).contains(&y) {
        return Err(Rejection::OutOfBounds { x, y, size });
    }
    if state.structure_at(x, y).is_some() {
        return Err(Rejection::CellOccupied { x, y });
    }
    if save.gold < def.cost {
        return Err(Rejection::InsufficientGold {
            needed: def.cost,
            available: save.gold,
        });
    }

    let before = save.gold;
    save.gold -= def.cost;
    let id = structure_id(rng);
    editable_layout(save, state).push(PlacedStructure {
        id: id.clone(),
        x,
        y,
        building_id: building_id.clone(),
        damaged: false,
    });
    Ok(vec![
        Event::StructurePlaced {
            structure_id: id,
            building_id: building_id.clone(),
            x,
            y,
            cost: def.cost,
        },
        Event::GoldChanged {
            before,
            after: save.gold,
        },
    ])
}

fn handle_remove_building(
    save: &mut SaveData,
    state: &GameState,
    (x, y): (i32, i32),
) -> Result<Vec<Event>, Rejection> {
    let placed = state
        .structure_at(x, y)
        .ok_or(Rejection::NoStructureAt { x, y })?;
    let structure_id = placed.id.clone();
    editable_layout(save, state).retain(|s| !(s.x == x && s.y == y));
    Ok(vec![Event::StructureRemoved { structure_id }])
}

/// Clearing damage is a repair and costs `repair_cost` gold.
fn handle_set_damaged(
    save: &mut SaveData,
    state: &GameState,
    (x, y): (i32, i32),
    damaged: bool,
    content: &GameContent,
) -> Result<Vec<Event>, Rejection> {
    let current = state
        .structure_at(x, y)
        .ok_or(Rejection::NoStructureAt { x, y })?;
    let repair = current.damaged && !damaged;
    let cost = if repair { content.constants.repair_cost } else { 0 };
    if save.gold < cost {
        return Err(Rejection::InsufficientGold {
            needed: cost,
            available: save.gold,
        });
    }

    let before = save.gold;
    save.gold -= cost;
    let layout = editable_layout(save, state);
    let Some(placed) = layout.iter_mut().find(|s| s.x == x && s.y == y) else {
        return Err(Rejection::NoStructureAt { x, y });
    };
    placed.damaged = damaged;
    let mut events = vec![Event::StructureDamageChanged {
        structure_id: placed.id.clone(),
        damaged,
    }];
    if cost > 0 {
        events.push(Event::GoldChanged {
            before,
            after: save.gold,
        });
    }
    Ok(events)
}

/// Gold never goes below zero.
fn adjust_gold(save: &mut SaveData, delta: i64) -> Event {
    let before = save.gold;
    save.gold = if delta >= 0 {
        before.saturating_add(delta.unsigned_abs())
    } else {
        before.saturating_sub(delta.unsigned_abs())
    };
    Event::GoldChanged {
        before,
        after: save.gold,
    }
}

fn handle_collect_taxes(
    save: &mut SaveData,
    state: &GameState,
    content: &GameContent,
    now: Timestamp,
) -> Result<Vec<Event>, Rejection> {
    if let Some(last) = save.last_tax_collected {
        let ready_at = last + content.constants.tax_cycle_ms;
        if now < ready_at {
            return Err(Rejection::TaxNotReady { ready_at });
        }
    }
    let amount = (state.town.tax.max(0) as f64 * state.gold_multiplier).floor() as u64;
    if amount == 0 {
        return Err(Rejection::NoTaxDue);
    }
    save.gold = save.gold.saturating_add(amount);
    save.last_tax_collected = Some(now);
    Ok(vec![Event::TaxesCollected { amount }])
}

// ---------------------------------------------------------------------------
// Buffs, settings, review queue
// ---------------------------------------------------------------------------

fn handle_toggle_buff(
    save: &mut SaveData,
    buff_id: &BuffId,
    content: &GameContent,
) -> Result<Vec<Event>, Rejection> {
    if content.buff(buff_id).is_none() {
        return Err(Rejection::UnknownBuff(buff_id.clone()));
    }
    let event = if save.active_buffs.remove(buff_id) {
        Event::BuffDeactivated {
            buff_id: buff_id.clone(),
        }
    } else {
        save.active_buffs.insert(buff_id.clone());
        Event::BuffActivated {
            buff_id: buff_id.clone(),
        }
    };
    Ok(vec![event])
}

/// Mappings are edited through the review queue, never replaced wholesale here.
fn handle_save_settings(save: &mut SaveData, settings: &Settings) -> Vec<Event> {
    let custom_mappings = std::mem::take(&mut save.settings.custom_mappings);
    save.settings = Settings {
        custom_mappings,
        ..settings.clone()
    }
    .sanitized();
    vec![Event::SettingsSaved]
}

fn handle_map_source(
    save: &mut SaveData,
    key: &str,
    skill_id: &SkillId,
    xp_per_unit: f64,
    aggregation: Aggregation,
    content: &GameContent,
) -> Result<Vec<Event>, Rejection> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Rejection::InvalidMapping("empty source key".to_string()));
    }
    if content.skill(skill_id).is_none() {
        return Err(Rejection::UnknownSkill(skill_id.clone()));
    }
    if !xp_per_unit.is_finite() || xp_per_unit <= 0.0 {
        return Err(Rejection::InvalidMapping(format!(
            "rate for '{key}' must be positive, got {xp_per_unit}"
        )));
    }
    save.settings.custom_mappings.insert(
        key.to_string(),
        CustomMapping {
            skill_id: skill_id.clone(),
            xp_per_unit,
            aggregation,
        },
    );
    Ok(vec![Event::SourceMapped {
        key: key.to_string(),
        skill_id: skill_id.clone(),
    }])
}

fn handle_ignore_source(save: &mut SaveData, key: &str) -> Result<Vec<Event>, Rejection> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Rejection::InvalidMapping("empty source key".to_string()));
    }
    save.settings
        .custom_mappings
        .insert(key.to_string(), CustomMapping::ignore());
    Ok(vec![Event::SourceIgnored {
        key: key.to_string(),
    }])
}

fn handle_focus_session(
    save: &mut SaveData,
    state: &GameState,
    skill_id: &SkillId,
    seconds: u64,
    content: &GameContent,
) -> Result<Vec<Event>, Rejection> {
    if seconds <= content.constants.focus_min_seconds {
        return Err(Rejection::SessionTooShort { seconds });
    }
    if content.skill(skill_id).is_none() {
        return Err(Rejection::UnknownSkill(skill_id.clone()));
    }
    let (xp, gold) = focus_reward(seconds, state.gold_multiplier, &content.constants);
    if xp > 0 {
        *save.bonus_xp.entry(skill_id.clone()).or_insert(0) += xp;
    }
    save.gold = save.gold.saturating_add(gold);
    Ok(vec![Event::FocusSessionCompleted {
        skill_id: skill_id.clone(),
        xp,
        gold,
    }])
}
