//! Vault parser: notes in, `ParsedState` out.
//!
//! Pure over its inputs. Files are visited in path order so the same vault
//! always yields the same state, whatever order the scan produced.

mod fields;
mod quests;
mod tasks;

pub use quests::{KeywordInference, QuestSkillInference};

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::registry::{xp_for_value, Resolution, SourceRegistry};
use crate::{Constants, DailyStats, GameContent, ParsedState, Settings, SkillId, Task, VaultFile};

static DATE_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Daily,
    Quests,
    Skip,
}

pub(crate) fn file_stem(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    name.strip_suffix(".md").unwrap_or(name)
}

fn classify(path: &str, settings: &Settings, constants: &Constants) -> FileKind {
    let stem = file_stem(path);
    if stem.eq_ignore_ascii_case(&constants.quests_file_stem) {
        return FileKind::Quests;
    }
    if NaiveDate::parse_from_str(stem, "%Y-%m-%d").is_ok() {
        return FileKind::Daily;
    }
    let mut dirs: Vec<&str> = path.split(['/', '\\']).collect();
    dirs.pop();
    let tracked = dirs.iter().any(|dir| {
        settings
            .tracked_folders
            .iter()
            .any(|folder| !folder.is_empty() && dir.eq_ignore_ascii_case(folder))
    });
    if tracked {
        FileKind::Daily
    } else {
        FileKind::Skip
    }
}

fn note_date(stem: &str) -> Option<String> {
    let found = DATE_IN_NAME.find(stem)?;
    NaiveDate::parse_from_str(found.as_str(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// What one tracked note contributes.
#[derive(Debug, Default)]
struct NoteYield {
    gained: BTreeMap<SkillId, f64>,
    unknown: Vec<String>,
    tasks: Vec<Task>,
    tasks_completed: u32,
}

fn parse_note(
    file: &VaultFile,
    content: &GameContent,
    settings: &Settings,
    registry: &SourceRegistry,
) -> NoteYield {
    let mut out = NoteYield::default();

    let (front, body) = fields::split_frontmatter(&file.content);
    for (key, value) in fields::collect_fields(front, body) {
        if registry.is_internal(&key) {
            continue;
        }
        match registry.resolve(&key) {
            Resolution::Mapped(mapping) => {
                let Some(xp) = xp_for_value(mapping, &value) else {
                    continue;
                };
                if xp > 0.0 {
                    *out.gained.entry(mapping.skill_id.clone()).or_default() += xp;
                }
            }
            Resolution::Ignored => {}
            Resolution::NotFound => out.unknown.push(key),
        }
    }

    out.tasks = tasks::parse_tasks(file, content, settings.default_xp, registry);
    for task in out.tasks.iter().filter(|t| t.completed) {
        out.tasks_completed += 1;
        if let Some(skill) = &task.skill_id {
            *out.gained.entry(skill.clone()).or_default() += task.xp_reward as f64;
        }
    }

    let per_xp = content.constants.writing_chars_per_xp;
    if per_xp > 0 && content.skill(&content.constants.writing_skill).is_some() {
        let writing = file.content.chars().count() / per_xp as usize;
        if writing > 0 {
            *out.gained
                .entry(content.constants.writing_skill.clone())
                .or_default() += writing as f64;
        }
    }

    out
}

#[derive(Debug, Default)]
struct DayTotals {
    per_skill: BTreeMap<SkillId, f64>,
    tasks_completed: u32,
}

impl DayTotals {
    fn into_stats(self, date: String) -> DailyStats {
        let total: f64 = self.per_skill.values().sum();
        let mut primary: Option<(&SkillId, f64)> = None;
        for (skill, &xp) in &self.per_skill {
            if xp > 0.0 && primary.is_none_or(|(_, best)| xp > best) {
                primary = Some((skill, xp));
            }
        }
        DailyStats {
            date,
            total_xp: total.floor() as u64,
            tasks_completed: self.tasks_completed,
            primary_skill: primary.map(|(s, _)| s.clone()),
        }
    }
}

/// Parses every note. Malformed input is skipped, never fatal.
pub fn parse_vault(
    files: &[VaultFile],
    content: &GameContent,
    settings: &Settings,
    inference: &dyn QuestSkillInference,
) -> ParsedState {
    let registry = SourceRegistry::new(content, &settings.custom_mappings);
    let mut sorted: Vec<&VaultFile> = files.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut skill_xp: BTreeMap<SkillId, f64> = BTreeMap::new();
    let mut parsed = ParsedState::default();
    let mut days: BTreeMap<String, DayTotals> = BTreeMap::new();
    let mut quests = Vec::new();
    let mut saw_quest_file = false;

    for file in sorted {
        match classify(&file.path, settings, &content.constants) {
            FileKind::Quests => {
                saw_quest_file = true;
                quests::parse_quest_file(&file.content, content, inference, &mut quests);
            }
            FileKind::Daily => {
                let note = parse_note(file, content, settings, &registry);
                for key in note.unknown {
                    *parsed.unknown_sources.entry(key).or_insert(0) += 1;
                }
                if let Some(date) = note_date(file_stem(&file.path)) {
                    let day = days.entry(date).or_default();
                    day.tasks_completed += note.tasks_completed;
                    for (skill, xp) in &note.gained {
                        *day.per_skill.entry(skill.clone()).or_default() += xp;
                    }
                }
                for (skill, xp) in note.gained {
                    *skill_xp.entry(skill).or_default() += xp;
                }
                parsed.tasks.extend(note.tasks);
            }
            FileKind::Skip => {}
        }
    }

    parsed.skill_xp = skill_xp
        .into_iter()
        .map(|(skill, xp)| (skill, xp.floor() as u64))
        .collect();
    parsed.history = days
        .into_iter()
        .map(|(date, totals)| totals.into_stats(date))
        .collect();
    // Gating happens at merge, once saved progress is known.
    parsed.quests = if saw_quest_file {
        quests
    } else {
        content.quests.clone()
    };
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_name_and_folder() {
        let settings = Settings::default();
        let constants = crate::test_fixtures::base_content().constants;
        assert_eq!(classify("2024-03-01.md", &settings, &constants), FileKind::Daily);
        assert_eq!(classify("Journal/daily/log.md", &settings, &constants), FileKind::Daily);
        assert_eq!(classify("NotDaily/log.md", &settings, &constants), FileKind::Skip);
        assert_eq!(classify("Dailyish/log.md", &settings, &constants), FileKind::Skip);
        assert_eq!(classify("QUESTS.md", &settings, &constants), FileKind::Quests);
        assert_eq!(classify("Skills/Strength.md", &settings, &constants), FileKind::Skip);
        assert_eq!(classify("Daily.md", &settings, &constants), FileKind::Skip);
    }

    #[test]
    fn date_is_read_from_stem() {
        assert_eq!(note_date("2024-03-01"), Some("2024-03-01".to_string()));
        assert_eq!(note_date("log 2024-02-30"), None);
        assert_eq!(note_date("log"), None);
    }
}
