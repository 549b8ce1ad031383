//! Integration test: a week of notes → parse → merge → actions → re-merge.

use rpg_core::test_fixtures::{base_content, base_save, make_rng, vault_file, NOW};
use rpg_core::*;

const HOUR: i64 = MS_PER_HOUR;
const DAY: i64 = 24 * HOUR;

fn week() -> Vec<VaultFile> {
    (1..=7)
        .map(|d| {
            let body = format!(
                "---\nExercise: {}\n---\nCoding:: 20\n- [x] Dog walk Dog_Walk:: 2 #habit #scout\n- [ ] Tidy desk #crafting\n",
                10 * d
            );
            vault_file(&format!("Daily/2024-01-0{d}.md"), &body)
        })
        .collect()
}

fn cycle(
    files: &[VaultFile],
    save: &SaveData,
    content: &GameContent,
    now: Timestamp,
) -> MergeOutcome {
    let inference = KeywordInference::from_content(content);
    let parsed = parse_vault(files, content, &save.settings, &inference);
    merge(&parsed, save, content, now)
}

#[test]
fn week_of_notes_then_a_quiet_weekend() {
    let content = base_content();
    let files = week();

    let first = cycle(&files, &base_save(&content), &content, NOW);
    let state = &first.state;

    // Exercise 10+20+...+70 = 280 min at 2 XP/min
    assert_eq!(state.skill(&SkillId("strength".into())).map(|s| s.current_xp), Some(560));
    // 7 * 20 min at 2 XP/min
    assert_eq!(state.skill(&SkillId("dungeoneering".into())).map(|s| s.current_xp), Some(280));
    // 7 completed habit tasks at the default 5 XP
    assert_eq!(state.skill(&SkillId("scout".into())).map(|s| s.current_xp), Some(35));
    assert_eq!(state.tasks.len(), 14);
    assert_eq!(state.history.len(), 7);
    assert!(state.history.iter().all(|d| d.tasks_completed == 1));
    assert_eq!(first.save.gold, state.total_xp);

    let habit = state.tasks.iter().find(|t| t.is_habit).expect("habit task");
    assert_eq!(habit.target_value, Some(2.0));
    assert_eq!(habit.unit.as_deref(), Some("km"));

    // Two idle days later, fast decayers have lost ground and slow ones have not.
    let later = cycle(&files, &first.save, &content, NOW + 2 * DAY);
    let strength = later.state.skill(&SkillId("strength".into())).expect("strength");
    assert_eq!(strength.decay_debt, 480);
    assert_eq!(strength.current_xp, 80);
    let coding = later.state.skill(&SkillId("dungeoneering".into())).expect("dungeoneering");
    assert_eq!(coding.decay_debt, 24);
    assert!(later.decay_losses.iter().any(|l| l.skill_id.as_str() == "strength"));
}

#[test]
fn invariants_hold_across_many_cycles() {
    let content = base_content();
    let files = week();
    let mut save = base_save(&content);
    let mut rng = make_rng();

    for step in 0..48 {
        let now = NOW + step * 3 * HOUR;
        let out = cycle(&files, &save, &content, now);
        for skill in &out.state.skills {
            assert!(skill.decay_debt <= skill.raw_xp, "{} over-decayed", skill.id);
            assert_eq!(skill.level, level_from_xp(skill.current_xp));
        }
        for quest in &out.state.quests {
            if quest.status != QuestStatus::NotStarted {
                assert!(prerequisite_met(quest, &out.state.quests), "{} ungated", quest.id);
            }
        }
        save = out.save;

        // Poke at the economy between cycles; rejections are fine.
        let action = match step % 4 {
            0 => Action::CollectTaxes,
            1 => Action::StartQuest { quest_id: QuestId("quest_second_wind".into()) },
            2 => Action::PlaceBuilding {
                building_id: BuildingId("tree_pine".into()),
                x: step as i32,
                y: 0,
            },
            _ => Action::ToggleTask { task_id: out.state.tasks[0].id.clone() },
        };
        let _ = apply_action(&mut save, &out.state, &action, &content, &mut rng, now);
    }
}

#[test]
fn partial_save_documents_fill_defaults() {
    let save: SaveData = serde_json::from_str(r#"{"gold": 42, "settings": {"default_xp": 9}}"#)
        .expect("partial save parses");
    assert_eq!(save.gold, 42);
    assert_eq!(save.settings.default_xp, 9);
    assert_eq!(save.version, 1);
    assert!(save.settings.sound_enabled);
    assert_eq!(save.settings.tracked_folders, vec!["Daily".to_string()]);
    assert!(save.base_layout.is_empty());
}

#[test]
fn state_serializes_for_views() {
    let content = base_content();
    let out = cycle(&week(), &base_save(&content), &content, NOW);
    let json = serde_json::to_value(&out.state).expect("serialize state");
    assert_eq!(json["skills"].as_array().map(Vec::len), Some(content.skills.len()));
    assert_eq!(json["quests"][0]["status"], "NOT_STARTED");
    assert_eq!(json["combat"]["archetype"], "Warrior");
}
