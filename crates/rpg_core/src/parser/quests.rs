//! QUESTS file lines: `Name: [ ] Description (requires: Other Quest)`.

use std::sync::LazyLock;

use regex::Regex;
use smallvec::smallvec;

use crate::{
    GameContent, Quest, QuestDifficulty, QuestId, QuestReward, QuestStatus, QuestStep, SkillId,
    StepId,
};

static QUEST_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?([^:\[\]#]+?)\s*:\s*\[([ xX])\]\s*(.*?)\s*$")
        .expect("valid regex")
});

static REQUIRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\(\s*requires:\s*([^)]+?)\s*\)\s*$").expect("valid regex")
});

/// Picks the skill a free-form quest rewards.
pub trait QuestSkillInference {
    fn infer(&self, name: &str, description: &str) -> Option<SkillId>;
}

/// First keyword found in the name, then in the description, wins.
#[derive(Debug, Clone, Default)]
pub struct KeywordInference {
    table: Vec<(String, SkillId)>,
}

impl KeywordInference {
    pub fn from_content(content: &GameContent) -> Self {
        Self {
            table: content
                .quest_keywords
                .iter()
                .map(|k| (k.keyword.to_lowercase(), k.skill_id.clone()))
                .collect(),
        }
    }

    fn lookup(&self, text: &str) -> Option<SkillId> {
        let text = text.to_lowercase();
        self.table
            .iter()
            .find(|(keyword, _)| text.contains(keyword.as_str()))
            .map(|(_, skill)| skill.clone())
    }
}

impl QuestSkillInference for KeywordInference {
    fn infer(&self, name: &str, description: &str) -> Option<SkillId> {
        self.lookup(name).or_else(|| self.lookup(description))
    }
}

pub(crate) fn quest_id_for(name: &str) -> QuestId {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    QuestId(format!("quest_{slug}"))
}

/// One single-step quest per matching line. Later duplicates of a name are dropped.
pub(super) fn parse_quest_file(
    text: &str,
    content: &GameContent,
    inference: &dyn QuestSkillInference,
    out: &mut Vec<Quest>,
) {
    for line in text.lines() {
        let Some(caps) = QUEST_LINE.captures(line) else {
            continue;
        };
        let name = caps[1].trim().to_string();
        let completed = caps[2].eq_ignore_ascii_case("x");
        let raw = &caps[3];
        let (description, prereq_quest_id) = match REQUIRES.captures(raw) {
            Some(r) => {
                let cut = r.get(0).map_or(raw.len(), |m| m.start());
                (raw[..cut].trim().to_string(), Some(quest_id_for(&r[1])))
            }
            None => (raw.trim().to_string(), None),
        };

        let id = quest_id_for(&name);
        if out.iter().any(|q| q.id == id) {
            continue;
        }
        let skill_id = inference.infer(&name, &description);
        let xp = if skill_id.is_some() {
            content.constants.quest_reward_xp
        } else {
            0
        };

        out.push(Quest {
            steps: smallvec![QuestStep {
                id: StepId(format!("{}_step_1", id.0)),
                description: description.clone(),
                completed,
            }],
            rewards: smallvec![QuestReward {
                xp,
                skill_id,
                gold: content.constants.quest_reward_gold,
                item: None,
            }],
            status: if completed {
                QuestStatus::Completed
            } else {
                QuestStatus::InProgress
            },
            difficulty: QuestDifficulty::Novice,
            id,
            name,
            description,
            prereq_quest_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_content;

    fn parse(text: &str) -> Vec<Quest> {
        let content = base_content();
        let inference = KeywordInference::from_content(&content);
        let mut out = Vec::new();
        parse_quest_file(text, &content, &inference, &mut out);
        out
    }

    #[test]
    fn slug_ids_are_stable() {
        assert_eq!(quest_id_for("Dragon Slayer").0, "quest_dragon_slayer");
        assert_eq!(quest_id_for("  One Small Favour! ").0, "quest_one_small_favour");
    }

    #[test]
    fn parses_open_and_done_quests() {
        let quests = parse(
            "# Quests\nRecipe for Disaster: [ ] Meal prep 4 weeks in a row.\nDragon Slayer: [x] Submit the grant.\n",
        );
        assert_eq!(quests.len(), 2);
        assert_eq!(quests[0].status, QuestStatus::InProgress);
        assert_eq!(quests[1].status, QuestStatus::Completed);
        assert!(quests[1].steps[0].completed);
        assert_eq!(
            quests[0].rewards[0].skill_id.as_ref().map(SkillId::as_str),
            Some("cooking")
        );
    }

    #[test]
    fn requires_suffix_becomes_prereq() {
        let quests = parse("Legends Quest: [ ] Finish the thesis (requires: Dragon Slayer)\n");
        assert_eq!(
            quests[0].prereq_quest_id,
            Some(QuestId("quest_dragon_slayer".to_string()))
        );
        assert_eq!(quests[0].description, "Finish the thesis");
    }

    #[test]
    fn headings_and_prose_are_not_quests() {
        assert!(parse("# Quests\nSome notes: nothing here\n").is_empty());
    }
}
