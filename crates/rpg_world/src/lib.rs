//! Filesystem side of the game, shared between rpg_cli and rpg_daemon:
//! content loading, vault scanning, and the JSON save file.

use anyhow::{Context, Result};
use rpg_control::{SaveStore, StoreError};
use rpg_core::{
    BuffDef, BuildingDef, CombatDef, Constants, GameContent, ItemDef, PerkDef, PlacedStructure,
    Quest, QuestKeyword, SignalMapping, SkillDef, SkillId, Timestamp, VaultFile,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

#[derive(Deserialize)]
struct SkillsFile {
    content_version: String,
    skills: Vec<SkillDef>,
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

fn assert_unique<'a>(kind: &str, ids: impl Iterator<Item = &'a str>) {
    let mut seen = HashSet::new();
    for id in ids {
        assert!(seen.insert(id), "duplicate {kind} id '{id}'");
    }
}

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like a signal feeding a skill that does not exist, an
/// upgrade pointing at an unknown building, or a quest prerequisite typo.
pub fn validate_content(content: &GameContent) {
    let skill_ids: HashSet<&SkillId> = content.skills.iter().map(|s| &s.id).collect();
    let known_skill = |id: &SkillId, context: &str| {
        assert!(
            skill_ids.contains(id),
            "{context} references unknown skill '{id}'"
        );
    };

    assert_unique("skill", content.skills.iter().map(|s| s.id.as_str()));
    assert_unique("signal", content.signals.iter().map(|s| s.key.as_str()));
    assert_unique("building", content.buildings.iter().map(|b| b.id.as_str()));
    assert_unique("buff", content.buffs.iter().map(|b| b.id.as_str()));
    assert_unique("item", content.items.iter().map(|i| i.id.as_str()));
    assert_unique("quest", content.quests.iter().map(|q| q.id.as_str()));

    for signal in &content.signals {
        known_skill(&signal.skill_id, &format!("signal '{}'", signal.key));
        assert!(
            signal.xp_per_unit > 0.0,
            "signal '{}' has non-positive xp_per_unit",
            signal.key
        );
    }
    for perk in &content.perks {
        known_skill(&perk.skill_id, &format!("perk '{}'", perk.id));
    }
    for keyword in &content.quest_keywords {
        known_skill(&keyword.skill_id, &format!("quest keyword '{}'", keyword.keyword));
    }

    let combat = &content.combat;
    for id in [
        &combat.health,
        &combat.social,
        &combat.melee,
        &combat.magic,
        &combat.ranged,
    ]
    .into_iter()
    .chain(&combat.lifestyle)
    {
        known_skill(id, "combat formula");
    }
    known_skill(&content.constants.writing_skill, "constants.writing_skill");

    for building in &content.buildings {
        if let Some(next) = &building.upgrade_to {
            assert!(
                content.building(next).is_some(),
                "building '{}' upgrades to unknown building '{next}'",
                building.id
            );
        }
    }
    let size = content.constants.grid_size;
    assert!(size > 0, "constants.grid_size must be positive");
    for placed in &content.starter_layout {
        assert!(
            content.building(&placed.building_id).is_some(),
            "starter layout places unknown building '{}'",
            placed.building_id
        );
        assert!(
            (0..size).contains(&placed.x) && (0..size).contains(&placed.y),
            "starter structure '{}' is outside the {size}x{size} grid",
            placed.id
        );
    }

    for quest in &content.quests {
        if let Some(prereq) = &quest.prereq_quest_id {
            assert!(
                content.quests.iter().any(|q| &q.id == prereq),
                "quest '{}' prereq '{prereq}' is not a known quest",
                quest.id
            );
        }
        for reward in &quest.rewards {
            if let Some(skill) = &reward.skill_id {
                known_skill(skill, &format!("quest '{}' reward", quest.id));
            }
        }
    }

    assert!(
        content.items.is_empty() || content.items.iter().any(|i| i.weight > 0),
        "loot table has items but no positive weights"
    );
}

fn read_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Result<T> {
    let text =
        std::fs::read_to_string(dir.join(name)).with_context(|| format!("reading {name}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {name}"))
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let skills_file: SkillsFile = read_json(dir, "skills.json")?;
    let signals: Vec<SignalMapping> = read_json(dir, "signals.json")?;
    let buildings: Vec<BuildingDef> = read_json(dir, "buildings.json")?;
    let buffs: Vec<BuffDef> = read_json(dir, "buffs.json")?;
    let perks: Vec<PerkDef> = read_json(dir, "perks.json")?;
    let items: Vec<ItemDef> = read_json(dir, "items.json")?;
    let quests: Vec<Quest> = read_json(dir, "quests.json")?;
    let quest_keywords: Vec<QuestKeyword> = read_json(dir, "quest_keywords.json")?;
    let starter_layout: Vec<PlacedStructure> = read_json(dir, "starter_layout.json")?;
    let combat: CombatDef = read_json(dir, "combat.json")?;
    let constants: Constants = read_json(dir, "constants.json")?;

    let content = GameContent {
        content_version: skills_file.content_version,
        skills: skills_file.skills,
        signals,
        buildings,
        buffs,
        perks,
        items,
        quests,
        quest_keywords,
        starter_layout,
        combat,
        constants,
    };
    validate_content(&content);
    tracing::debug!(
        version = %content.content_version,
        skills = content.skills.len(),
        signals = content.signals.len(),
        "content loaded"
    );
    Ok(content)
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}

fn vault_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Reads every `.md` file under `root`, skipping hidden entries such as
/// `.obsidian/` and `.trash/`. Paths are vault-relative with `/` separators.
///
/// Symlinks are not followed. Entries that cannot be listed or read are
/// logged and skipped; only a missing or unreadable root is an error.
pub fn read_vault(root: &Path) -> Result<Vec<VaultFile>> {
    std::fs::read_dir(root).with_context(|| format!("listing {}", root.display()))?;

    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("skipping vault entry: {err}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("md")
        {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(path) else {
            tracing::warn!(path = %path.display(), "skipping unreadable note");
            continue;
        };
        let Some(relative) = vault_path(root, path) else {
            continue;
        };
        files.push(VaultFile {
            path: relative,
            content: text,
        });
    }
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

// ---------------------------------------------------------------------------
// Save file
// ---------------------------------------------------------------------------

/// Save document on disk. Writes go to a sibling temp file that is then
/// renamed over the target, so a crash never leaves half a document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveStore for JsonFileStore {
    fn read(&mut self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&mut self, document: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, document)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpg_core::test_fixtures::base_content;
    use rpg_core::{BuildingId, QuestId};

    #[test]
    fn test_valid_content_passes_validation() {
        validate_content(&base_content());
    }

    #[test]
    #[should_panic(expected = "references unknown skill")]
    fn test_signal_unknown_skill_panics() {
        let mut content = base_content();
        content.signals[0].skill_id = SkillId("juggling".to_string());
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "duplicate signal id")]
    fn test_duplicate_signal_panics() {
        let mut content = base_content();
        let dup = content.signals[0].clone();
        content.signals.push(dup);
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "upgrades to unknown building")]
    fn test_unknown_upgrade_panics() {
        let mut content = base_content();
        content.buildings[0].upgrade_to = Some(BuildingId("castle_in_the_sky".to_string()));
        validate_content(&content);
    }

    #[test]
    #[should_panic(expected = "is not a known quest")]
    fn test_quest_prereq_unknown_panics() {
        let mut content = base_content();
        content.quests[0].prereq_quest_id = Some(QuestId("quest_missing".to_string()));
        validate_content(&content);
    }

    #[test]
    fn vault_scan_skips_hidden_and_non_markdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("Daily/2024")).expect("mkdir");
        std::fs::create_dir_all(root.join(".obsidian")).expect("mkdir");
        std::fs::write(root.join("Daily/2024/2024-01-01.md"), "Exercise:: 30\n").expect("write");
        std::fs::write(root.join("QUESTS.md"), "# Quests\n").expect("write");
        std::fs::write(root.join(".obsidian/workspace.md"), "ignored").expect("write");
        std::fs::write(root.join("Daily/image.png"), [0u8, 1, 2]).expect("write");

        let files = read_vault(root).expect("read vault");
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Daily/2024/2024-01-01.md", "QUESTS.md"]);
        assert_eq!(files[0].content, "Exercise:: 30\n");
    }

    #[cfg(unix)]
    #[test]
    fn vault_scan_does_not_follow_symlinked_folders() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("Daily")).expect("mkdir");
        std::fs::write(root.join("Daily/2024-01-01.md"), "Exercise:: 30\n").expect("write");
        std::os::unix::fs::symlink(root, root.join("Daily/loop")).expect("symlink");

        let files = read_vault(root).expect("read vault");
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["Daily/2024-01-01.md"]);
    }

    #[test]
    fn missing_vault_root_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(read_vault(&dir.path().join("nowhere")).is_err());
    }

    #[test]
    fn json_store_round_trips_and_reports_absence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = JsonFileStore::new(dir.path().join("saves/player.json"));
        assert!(store.read().expect("read").is_none());

        store.write("{\"gold\": 5}").expect("write");
        assert_eq!(store.read().expect("read").as_deref(), Some("{\"gold\": 5}"));
        assert!(!dir.path().join("saves/player.json.tmp").exists());
    }
}
