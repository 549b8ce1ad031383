use super::*;

#[test]
fn frontmatter_and_inline_fields_award_xp() {
    let content = test_content();
    let files = vec![daily(
        "2024-01-01",
        "---\nStudy: 30\n---\nBrush_Teeth:: 2\n",
    )];
    let parsed = parse(&files, &content, &Settings::default());
    assert_eq!(parsed.skill_xp[&SkillId("knowledge".to_string())], 30);
    assert_eq!(parsed.skill_xp[&SkillId("hitpoints".to_string())], 20);
}

#[test]
fn inline_value_beats_frontmatter_for_same_key() {
    let content = test_content();
    let files = vec![daily("2024-01-01", "---\nExercise: 10\n---\nExercise:: 60\n")];
    let parsed = parse(&files, &content, &Settings::default());
    assert_eq!(parsed.skill_xp[&SkillId("strength".to_string())], 120);
}

#[test]
fn fractional_xp_floors_at_skill_total_not_per_source() {
    let content = test_content();
    // 0.5 * 1 XP/min, twice, across two notes: 1.0, not 0.
    let files = vec![
        daily("2024-01-01", "Study:: 0.5\n"),
        daily("2024-01-02", "Study:: 0.5\n"),
    ];
    let parsed = parse(&files, &content, &Settings::default());
    assert_eq!(parsed.skill_xp[&SkillId("knowledge".to_string())], 1);
}

#[test]
fn unknown_key_counted_once_per_file() {
    let content = test_content();
    let files = vec![
        daily("2024-01-01", "Foo:: 1\n"),
        daily("2024-01-02", "---\nFoo: 2\n---\n"),
        daily("2024-01-03", "[Foo:: 3]\n"),
    ];
    let parsed = parse(&files, &content, &Settings::default());
    assert_eq!(parsed.unknown_sources.get("Foo"), Some(&3));
    assert!(parsed.skill_xp.values().all(|&xp| xp == 0));
}

#[test]
fn metadata_keys_are_neither_xp_nor_unknown() {
    let content = test_content();
    let files = vec![daily(
        "2024-01-01",
        "---\ndate: 2024-01-01\ncssclasses: wide\n---\n",
    )];
    let parsed = parse(&files, &content, &Settings::default());
    assert!(parsed.unknown_sources.is_empty());
}

#[test]
fn ignored_source_is_silent() {
    let content = test_content();
    let mut settings = Settings::default();
    settings
        .custom_mappings
        .insert("Foo".to_string(), CustomMapping::ignore());
    let parsed = parse(&[daily("2024-01-01", "Foo:: 3\n")], &content, &settings);
    assert!(parsed.unknown_sources.is_empty());
}

#[test]
fn custom_mapping_assigns_xp() {
    let content = test_content();
    let mut settings = Settings::default();
    settings.custom_mappings.insert(
        "Pushups".to_string(),
        CustomMapping {
            skill_id: SkillId("strength".to_string()),
            xp_per_unit: 1.5,
            aggregation: Aggregation::Count,
        },
    );
    let parsed = parse(&[daily("2024-01-01", "Pushups:: 20\n")], &content, &settings);
    assert_eq!(parsed.skill_xp[&SkillId("strength".to_string())], 30);
}

#[test]
fn malformed_values_skip_only_that_field() {
    let content = test_content();
    let files = vec![daily(
        "2024-01-01",
        "---\nbad: [unclosed\nStudy: 10\n---\nExercise:: lots\nCoding:: 15\n",
    )];
    let parsed = parse(&files, &content, &Settings::default());
    assert_eq!(parsed.skill_xp[&SkillId("knowledge".to_string())], 10);
    assert_eq!(parsed.skill_xp[&SkillId("dungeoneering".to_string())], 30);
    assert!(!parsed.skill_xp.contains_key(&SkillId("strength".to_string())));
}

#[test]
fn untracked_notes_are_ignored() {
    let content = test_content();
    let files = vec![vault_file("Skills/Strength.md", "---\nlevel: 5\ncurrent_xp: 400\n---\nExercise:: 60\n")];
    let parsed = parse(&files, &content, &Settings::default());
    assert!(parsed.skill_xp.is_empty());
    assert!(parsed.unknown_sources.is_empty());
}

#[test]
fn tracked_folders_follow_settings() {
    let content = test_content();
    let settings = Settings {
        tracked_folders: vec!["Journal".to_string()],
        ..Settings::default()
    };
    let files = vec![
        vault_file("Journal/monday.md", "Exercise:: 10\n"),
        vault_file("Daily/monday.md", "Exercise:: 10\n"),
    ];
    let parsed = parse(&files, &content, &settings);
    assert_eq!(parsed.skill_xp[&SkillId("strength".to_string())], 20);
}

#[test]
fn long_notes_earn_writing_xp() {
    let content = test_content();
    let body = "a".repeat(250);
    let parsed = parse(&[daily("2024-01-01", &body)], &content, &Settings::default());
    assert_eq!(parsed.skill_xp[&SkillId("writing".to_string())], 2);
}

#[test]
fn reparse_is_stable() {
    let content = test_content();
    let files = vec![
        daily("2024-01-02", "Exercise:: 30\n- [x] Stretch #strength\n- [ ] Read #knowledge\n"),
        daily("2024-01-01", "Coding:: 20\n"),
    ];
    let first = parse(&files, &content, &Settings::default());
    let reversed: Vec<VaultFile> = files.iter().rev().cloned().collect();
    let second = parse(&reversed, &content, &Settings::default());
    assert_eq!(first, second);
    let ids: Vec<&str> = first.tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["Daily/2024-01-02:2", "Daily/2024-01-02:3"]);
}

#[test]
fn history_groups_by_date() {
    let content = test_content();
    let files = vec![
        daily("2024-01-01", "Exercise:: 10\n- [x] Call mom (+50 XP) #social\n"),
        vault_file("Daily/Archive/2024-01-01 evening.md", "Exercise:: 5\n"),
        daily("2024-01-02", "Study:: 5\n"),
    ];
    let parsed = parse(&files, &content, &Settings::default());
    assert_eq!(parsed.history.len(), 2);
    let first = &parsed.history[0];
    assert_eq!(first.date, "2024-01-01");
    assert_eq!(first.total_xp, 80);
    assert_eq!(first.tasks_completed, 1);
    assert_eq!(first.primary_skill, Some(SkillId("social".to_string())));
    assert_eq!(parsed.history[1].primary_skill, Some(SkillId("knowledge".to_string())));
}

#[test]
fn completed_buff_task_unlocks_buff() {
    let content = test_content();
    let files = vec![daily(
        "2024-01-01",
        "- [x] Dawn run buff:morning_momentum\n- [ ] Lab day buff:potion_focus\n",
    )];
    let state = run_cycle(&files, &base_save(&content), &content, NOW).state;
    assert_eq!(
        state.unlocked_buffs.iter().map(BuffId::as_str).collect::<Vec<_>>(),
        vec!["morning_momentum"]
    );
}

#[test]
fn quests_file_replaces_content_quests() {
    let content = test_content();
    let without = parse(&[], &content, &Settings::default());
    assert_eq!(without.quests.len(), content.quests.len());

    let files = vec![vault_file(
        "QUESTS.md",
        "# Quests\nDragon Slayer: [ ] Submit the grant.\nLegends: [ ] Write it up (requires: Dragon Slayer)\n",
    )];
    let with = parse(&files, &content, &Settings::default());
    assert_eq!(with.quests.len(), 2);
    assert_eq!(with.quests[0].status, QuestStatus::InProgress);
    assert_eq!(with.quests[1].status, QuestStatus::InProgress);
    assert!(with.quests[1].prereq_quest_id.is_some());
}

// Keyword inference is a best-effort default; these pin the shipped table,
// not a contract.
#[test]
fn quest_skill_inference_reasonable_defaults() {
    let content = test_content();
    let inference = KeywordInference::from_content(&content);
    assert_eq!(
        inference.infer("One Small Favour", "Clear the entire email inbox."),
        Some(SkillId("social".to_string()))
    );
    assert_eq!(inference.infer("Mystery", "Nothing matches"), None);
}

#[test]
fn quest_inference_is_swappable() {
    struct Always;
    impl QuestSkillInference for Always {
        fn infer(&self, _: &str, _: &str) -> Option<SkillId> {
            Some(SkillId("art".to_string()))
        }
    }
    let content = test_content();
    let files = vec![vault_file("QUESTS.md", "Paint: [ ] A landscape\n")];
    let parsed = parse_vault(&files, &content, &Settings::default(), &Always);
    assert_eq!(
        parsed.quests[0].rewards[0].skill_id,
        Some(SkillId("art".to_string()))
    );
}
