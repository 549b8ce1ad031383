//! Quest lifecycle: gating, saved-progress overlay.

use std::collections::BTreeMap;

use crate::{Quest, QuestId, QuestProgress, QuestStatus};

/// No prerequisite, or the prerequisite is present and completed.
pub fn prerequisite_met(quest: &Quest, quests: &[Quest]) -> bool {
    let Some(prereq) = &quest.prereq_quest_id else {
        return true;
    };
    quests
        .iter()
        .any(|q| &q.id == prereq && q.status == QuestStatus::Completed)
}

pub fn all_steps_complete(quest: &Quest) -> bool {
    quest.steps.iter().all(|s| s.completed)
}

/// Demotes in-progress quests whose prerequisite is not completed.
pub(crate) fn enforce_gating(quests: &mut [Quest]) {
    let blocked: Vec<QuestId> = quests
        .iter()
        .filter(|q| q.status == QuestStatus::InProgress && !prerequisite_met(q, quests))
        .map(|q| q.id.clone())
        .collect();
    for quest in quests.iter_mut().filter(|q| blocked.contains(&q.id)) {
        quest.status = QuestStatus::NotStarted;
    }
}

/// Source quests with saved progress laid over them. Status never moves
/// backwards past what the vault says; step flags OR together.
pub(crate) fn overlay_progress(
    source: &[Quest],
    saved: &BTreeMap<QuestId, QuestProgress>,
) -> Vec<Quest> {
    let mut quests: Vec<Quest> = source
        .iter()
        .map(|quest| {
            let mut quest = quest.clone();
            if let Some(progress) = saved.get(&quest.id) {
                quest.status = quest.status.max(progress.status);
                for step in &mut quest.steps {
                    if progress.steps.get(&step.id).copied().unwrap_or(false) {
                        step.completed = true;
                    }
                }
            }
            if quest.status == QuestStatus::Completed {
                for step in &mut quest.steps {
                    step.completed = true;
                }
            }
            quest
        })
        .collect();
    enforce_gating(&mut quests);
    quests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::quest;

    #[test]
    fn unmet_prereq_demotes_in_progress() {
        let mut quests = vec![
            quest("quest_a", QuestStatus::InProgress, None),
            quest("quest_b", QuestStatus::InProgress, Some("quest_a")),
        ];
        enforce_gating(&mut quests);
        assert_eq!(quests[0].status, QuestStatus::InProgress);
        assert_eq!(quests[1].status, QuestStatus::NotStarted);
    }

    #[test]
    fn missing_prereq_counts_as_unmet() {
        let quests = vec![quest("quest_b", QuestStatus::InProgress, Some("quest_ghost"))];
        assert!(!prerequisite_met(&quests[0], &quests));
    }

    #[test]
    fn saved_completion_survives_overlay() {
        let source = vec![quest("quest_a", QuestStatus::InProgress, None)];
        let mut saved = BTreeMap::new();
        saved.insert(
            QuestId("quest_a".to_string()),
            QuestProgress {
                status: QuestStatus::Completed,
                ..QuestProgress::default()
            },
        );
        let merged = overlay_progress(&source, &saved);
        assert_eq!(merged[0].status, QuestStatus::Completed);
        assert!(all_steps_complete(&merged[0]));
    }

    #[test]
    fn vault_completion_beats_stale_save() {
        let source = vec![quest("quest_a", QuestStatus::Completed, None)];
        let mut saved = BTreeMap::new();
        saved.insert(
            QuestId("quest_a".to_string()),
            QuestProgress {
                status: QuestStatus::InProgress,
                ..QuestProgress::default()
            },
        );
        assert_eq!(overlay_progress(&source, &saved)[0].status, QuestStatus::Completed);
    }

    #[test]
    fn completing_prereq_unblocks_dependent() {
        let source = vec![
            quest("quest_a", QuestStatus::InProgress, None),
            quest("quest_b", QuestStatus::InProgress, Some("quest_a")),
        ];
        let blocked = overlay_progress(&source, &BTreeMap::new());
        assert_eq!(blocked[1].status, QuestStatus::NotStarted);

        let mut saved = BTreeMap::new();
        saved.insert(
            QuestId("quest_a".to_string()),
            QuestProgress {
                status: QuestStatus::Completed,
                ..QuestProgress::default()
            },
        );
        let open = overlay_progress(&source, &saved);
        assert_eq!(open[1].status, QuestStatus::InProgress);
    }
}
