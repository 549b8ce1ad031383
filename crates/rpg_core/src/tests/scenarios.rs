//! Whole-cycle scenarios: notes in, merged state out.

use super::*;

#[test]
fn exercise_and_call_scenario() {
    let content = test_content();
    let files = vec![daily(
        "2024-01-01",
        "Exercise:: 60\n- [x] Call mom (+50 XP) #social\n",
    )];
    let out = run_cycle(&files, &base_save(&content), &content, NOW);

    assert_eq!(skill_xp(&out.state, "strength"), 120);
    assert_eq!(skill_xp(&out.state, "social"), 50);
    assert_eq!(out.state.tasks.iter().filter(|t| t.completed).count(), 1);
    assert_eq!(out.state.gold, 170);
}

#[test]
fn buff_stack_multiplies() {
    let content = test_content();
    let mut save = base_save(&content);
    save.active_buffs.insert(BuffId("morning_momentum".to_string()));
    save.active_buffs.insert(BuffId("potion_focus".to_string()));
    let out = run_cycle(&[], &save, &content, NOW);
    assert!((out.state.xp_multiplier - 1.38).abs() < 1e-9);
    assert!(!out.state.active_buffs.contains(&BuffId("workout_boost".to_string())));
}

#[test]
fn decay_then_immediate_repeat() {
    let content = test_content();
    // 500 min of exercise = 1000 raw strength XP
    let files = vec![daily("2024-01-01", "Exercise:: 500\n")];
    let mut save = base_save(&content);
    save.bootstrap_applied = true;
    save.decay.last_touched.insert(SkillId("strength".to_string()), NOW - 5 * HOUR);

    let first = run_cycle(&files, &save, &content, NOW);
    assert_eq!(skill_xp(&first.state, "strength"), 950);

    let second = run_cycle(&files, &first.save, &content, NOW + 1_000);
    assert_eq!(skill_xp(&second.state, "strength"), 950);
    assert!(second.decay_losses.is_empty());
}

#[test]
fn long_absence_floors_at_zero() {
    let content = test_content();
    let files = vec![daily("2024-01-01", "Exercise:: 50\n")];
    let mut save = base_save(&content);
    save.decay.last_touched.insert(SkillId("strength".to_string()), NOW - 1_000 * HOUR);
    let out = run_cycle(&files, &save, &content, NOW);
    let strength = out.state.skill(&SkillId("strength".to_string())).expect("strength");
    assert_eq!(strength.current_xp, 0);
    assert_eq!(strength.decay_debt, strength.raw_xp);
    assert_eq!(strength.level, 1);
}

#[test]
fn new_xp_after_decay_shows_through() {
    let content = test_content();
    let mut save = base_save(&content);
    save.bootstrap_applied = true;
    save.decay.last_touched.insert(SkillId("strength".to_string()), NOW - 5 * HOUR);
    let before = vec![daily("2024-01-01", "Exercise:: 500\n")];
    let decayed = run_cycle(&before, &save, &content, NOW);

    let after = vec![
        daily("2024-01-01", "Exercise:: 500\n"),
        daily("2024-01-02", "Exercise:: 30\n"),
    ];
    let out = run_cycle(&after, &decayed.save, &content, NOW + 1_000);
    assert_eq!(skill_xp(&out.state, "strength"), 1010);
}

#[test]
fn daily_note_mock_vault() {
    let content = test_content();
    let files = vec![
        vault_file(
            "QUESTS.md",
            "# Quests\nRecipe for Disaster: [ ] Meal prep 4 weeks in a row.\nDragon Slayer: [ ] Submit the NIDA Grant.\n",
        ),
        vault_file(
            "Daily/2023-10-27.md",
            "---\ntags: #Daily\ndate: 2023-10-27\n---\n# Daily Log 2023-10-27\n[!NOTE]- Habits\nBrush_Teeth:: 2\nCoding:: 30\nExercise:: 45\nCall_loved_one:: 1\nStudy:: 30\n",
        ),
        vault_file("Skills/Strength.md", "---\ntags: skill\nskill_name: Strength\nlevel: 5\n---"),
    ];
    let out = run_cycle(&files, &base_save(&content), &content, NOW);
    assert_eq!(skill_xp(&out.state, "hitpoints"), 20);
    assert_eq!(skill_xp(&out.state, "dungeoneering"), 60);
    assert_eq!(skill_xp(&out.state, "strength"), 90);
    assert_eq!(skill_xp(&out.state, "social"), 50);
    assert_eq!(skill_xp(&out.state, "knowledge"), 30);
    // 149 characters of note text
    assert_eq!(skill_xp(&out.state, "writing"), 1);
    assert!(out.state.unknown_sources.is_empty());
    assert_eq!(out.state.quests.len(), 2);
    assert!(out
        .state
        .quests
        .iter()
        .all(|q| q.status == QuestStatus::InProgress));
}
