//! Checkbox tasks and habit progress.

use std::sync::LazyLock;

use regex::Regex;

use crate::registry::{numeric, Resolution, SourceRegistry};
use crate::{BuffId, FieldValue, GameContent, Task, TaskId, VaultFile};

static TASK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s*\[([ xX])\]\s*(.*)$").expect("valid regex"));

static XP_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(\+\s*(\d+)\s*XP\)").expect("valid regex"));

static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)#([A-Za-z0-9_\-]+)").expect("valid regex"));

static BUFF_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bbuff:([A-Za-z0-9_\-]+)").expect("valid regex"));

static INLINE_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_][\w\-]*)::\s*(\d+(?:\.\d+)?)").expect("valid regex")
});

static RATIO_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)\s*([A-Za-z]+)?").expect("valid regex")
});

const HABIT_TAG: &str = "habit";
const GENERAL_TAG: &str = "general";

/// Every checkbox line in `file`, in line order.
pub(super) fn parse_tasks(
    file: &VaultFile,
    content: &GameContent,
    default_xp: u64,
    registry: &SourceRegistry,
) -> Vec<Task> {
    let id_prefix = file.path.strip_suffix(".md").unwrap_or(&file.path);
    let filename = super::file_stem(&file.path).to_string();

    file.content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let caps = TASK_LINE.captures(line)?;
            let completed = caps[1].eq_ignore_ascii_case("x");
            let description = caps[2].trim().to_string();
            Some(build_task(
                TaskId(format!("{id_prefix}:{}", idx + 1)),
                description,
                completed,
                filename.clone(),
                content,
                default_xp,
                registry,
            ))
        })
        .collect()
}

fn build_task(
    id: TaskId,
    description: String,
    completed: bool,
    filename: String,
    content: &GameContent,
    default_xp: u64,
    registry: &SourceRegistry,
) -> Task {
    let xp_reward = XP_ANNOTATION
        .captures(&description)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(default_xp);

    let tags: Vec<&str> = HASHTAG
        .captures_iter(&description)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let is_habit = tags.iter().any(|t| t.eq_ignore_ascii_case(HABIT_TAG));
    let skill_tag = tags
        .iter()
        .find(|t| !t.eq_ignore_ascii_case(HABIT_TAG))
        .map_or_else(|| GENERAL_TAG.to_string(), |t| (*t).to_string());
    let skill_id = content.skill_by_label(&skill_tag).map(|s| s.id.clone());

    let buffs = BUFF_TAG
        .captures_iter(&description)
        .map(|c| BuffId(c[1].to_string()))
        .filter(|id| content.buff(id).is_some())
        .collect();

    let (current_value, target_value, unit) = if is_habit {
        habit_progress(&description, registry)
    } else {
        (None, None, None)
    };

    Task {
        id,
        description,
        filename,
        skill_tag,
        skill_id,
        xp_reward,
        completed,
        is_habit,
        current_value,
        target_value,
        unit,
        buffs,
    }
}

/// A registered `Key:: N` takes its target and unit from the registry;
/// otherwise `N/M unit` is read literally.
fn habit_progress(
    description: &str,
    registry: &SourceRegistry,
) -> (Option<f64>, Option<f64>, Option<String>) {
    for caps in INLINE_PROGRESS.captures_iter(description) {
        if let Resolution::Mapped(mapping) = registry.resolve(&caps[1]) {
            let current = numeric(&FieldValue::Text(caps[2].to_string()));
            return (current, mapping.target, mapping.unit.clone());
        }
    }
    if let Some(caps) = RATIO_PROGRESS.captures(description) {
        return (
            caps[1].parse().ok(),
            caps[2].parse().ok(),
            caps.get(3).map(|m| m.as_str().to_string()),
        );
    }
    (None, None, None)
}
