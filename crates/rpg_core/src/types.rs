//! Type definitions for `rpg_core`.
//!
//! Static content, parsed vault state, persisted save data, the merged
//! `GameState` snapshot, and the action/event vocabulary.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

pub const MS_PER_HOUR: i64 = 3_600_000;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(SkillId);
string_id!(TaskId);
string_id!(QuestId);
string_id!(StepId);
string_id!(BuffId);
string_id!(BuildingId);
string_id!(StructureId);
string_id!(ItemId);
string_id!(PerkId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

/// How a signal value turns into XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    #[default]
    Count,
    Duration,
    /// Same math as `Count`; bounded scale is a presentation concern.
    Rating,
    #[serde(alias = "BINARY")]
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestDifficulty {
    #[default]
    Novice,
    Intermediate,
    Experienced,
    Master,
    Grandmaster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerkEffect {
    XpBoost,
    GoldBoost,
    DecayReduction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Warrior,
    Mage,
    Ranger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThemeMode {
    #[default]
    Manual,
    Smart,
    Random,
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub skills: Vec<SkillDef>,
    pub signals: Vec<SignalMapping>,
    pub buildings: Vec<BuildingDef>,
    pub buffs: Vec<BuffDef>,
    pub perks: Vec<PerkDef>,
    pub items: Vec<ItemDef>,
    /// Used when the vault has no QUESTS file.
    pub quests: Vec<Quest>,
    pub quest_keywords: Vec<QuestKeyword>,
    pub starter_layout: Vec<PlacedStructure>,
    pub combat: CombatDef,
    pub constants: Constants,
}

impl GameContent {
    pub fn skill(&self, id: &SkillId) -> Option<&SkillDef> {
        self.skills.iter().find(|s| &s.id == id)
    }

    pub fn building(&self, id: &BuildingId) -> Option<&BuildingDef> {
        self.buildings.iter().find(|b| &b.id == id)
    }

    pub fn buff(&self, id: &BuffId) -> Option<&BuffDef> {
        self.buffs.iter().find(|b| &b.id == id)
    }

    /// Matches a hashtag or free-form label against skill ids and names, ignoring case.
    pub fn skill_by_label(&self, label: &str) -> Option<&SkillDef> {
        self.skills
            .iter()
            .find(|s| s.id.0.eq_ignore_ascii_case(label) || s.name.eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: SkillId,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub description: String,
    #[serde(default)]
    pub perk: Option<String>,
    /// XP lost per idle hour. `None` falls back to `Constants::default_decay_rate_per_hour`.
    #[serde(default)]
    pub decay_rate_per_hour: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalMapping {
    pub key: String,
    pub skill_id: SkillId,
    pub xp_per_unit: f64,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingDef {
    pub id: BuildingId,
    pub name: String,
    pub cost: u64,
    #[serde(default)]
    pub tax_value: i64,
    #[serde(default)]
    pub defense_value: i64,
    /// Paths and similar decor never pay tax or add defense.
    #[serde(default)]
    pub decorative: bool,
    /// Not purchasable from the build menu (upgrades, event props).
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub upgrade_to: Option<BuildingId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuffDef {
    pub id: BuffId,
    pub name: String,
    pub multiplier: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerkDef {
    pub id: PerkId,
    pub skill_id: SkillId,
    pub level: u32,
    pub name: String,
    pub description: String,
    pub effect: PerkEffect,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub value: u64,
    /// Relative weight inside the loot table.
    pub weight: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestKeyword {
    pub keyword: String,
    pub skill_id: SkillId,
}

/// Skills feeding the combat level formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatDef {
    pub health: SkillId,
    pub social: SkillId,
    pub melee: SkillId,
    pub magic: SkillId,
    pub ranged: SkillId,
    pub lifestyle: Vec<SkillId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    pub default_decay_rate_per_hour: f64,
    pub writing_skill: SkillId,
    /// One writing XP per this many characters of a tracked note.
    pub writing_chars_per_xp: u32,
    pub bootstrap_min_total_xp: u64,
    pub quest_reward_xp: u64,
    pub quest_reward_gold: u64,
    pub loot_chance: f64,
    pub focus_xp_per_minute: f64,
    pub focus_bonus_minutes: f64,
    pub focus_bonus_multiplier: f64,
    pub focus_min_seconds: u64,
    pub tax_cycle_ms: i64,
    /// Town cells run `0..grid_size` on both axes.
    pub grid_size: i32,
    /// Gold charged to clear a structure's damage.
    pub repair_cost: u64,
    /// Frontmatter keys that are note metadata, never habit signals.
    pub ignored_keys: Vec<String>,
    pub quests_file_stem: String,
}

// ---------------------------------------------------------------------------
// Vault input and parsed state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// `<path without .md>:<line>`; stable across re-parses of an unchanged file.
    pub id: TaskId,
    pub description: String,
    pub filename: String,
    pub skill_tag: String,
    pub skill_id: Option<SkillId>,
    pub xp_reward: u64,
    pub completed: bool,
    pub is_habit: bool,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub buffs: Vec<BuffId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestStep {
    pub id: StepId,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestReward {
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub skill_id: Option<SkillId>,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub item: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub name: String,
    #[serde(default)]
    pub difficulty: QuestDifficulty,
    #[serde(default)]
    pub description: String,
    pub steps: SmallVec<[QuestStep; 4]>,
    #[serde(default)]
    pub rewards: SmallVec<[QuestReward; 2]>,
    #[serde(default)]
    pub status: QuestStatus,
    #[serde(default)]
    pub prereq_quest_id: Option<QuestId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub total_xp: u64,
    pub tasks_completed: u32,
    pub primary_skill: Option<SkillId>,
}

/// Transient output of one vault parse. Raw XP is cumulative over every
/// file scanned, not a delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedState {
    pub skill_xp: BTreeMap<SkillId, u64>,
    pub tasks: Vec<Task>,
    pub quests: Vec<Quest>,
    pub unknown_sources: BTreeMap<String, u32>,
    pub history: Vec<DailyStats>,
}

// ---------------------------------------------------------------------------
// Persisted save
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedStructure {
    pub id: StructureId,
    pub x: i32,
    pub y: i32,
    pub building_id: BuildingId,
    #[serde(default)]
    pub damaged: bool,
}

/// Unrealized XP loss per skill. Subtracted from raw XP at read time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecayLedger {
    #[serde(default)]
    pub debt: BTreeMap<SkillId, u64>,
    #[serde(default)]
    pub last_touched: BTreeMap<SkillId, Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestProgress {
    pub status: QuestStatus,
    #[serde(default)]
    pub steps: BTreeMap<StepId, bool>,
    #[serde(default)]
    pub rewarded: bool,
}

/// A user-defined signal mapping. A `skill_id` of [`CustomMapping::IGNORE`]
/// silences the key without awarding XP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMapping {
    pub skill_id: SkillId,
    #[serde(default)]
    pub xp_per_unit: f64,
    #[serde(default, rename = "type")]
    pub aggregation: Aggregation,
}

impl CustomMapping {
    pub const IGNORE: &'static str = "__ignore__";

    pub fn ignore() -> Self {
        Self {
            skill_id: SkillId(Self::IGNORE.to_string()),
            xp_per_unit: 0.0,
            aggregation: Aggregation::Count,
        }
    }

    pub fn is_ignore(&self) -> bool {
        self.skill_id.0 == Self::IGNORE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_xp: u64,
    pub gold_multiplier: f64,
    pub sound_enabled: bool,
    pub theme_mode: ThemeMode,
    pub manual_theme_id: String,
    pub debounce_ms: u64,
    /// A note is tracked when any folder on its path contains one of these.
    pub tracked_folders: Vec<String>,
    pub custom_mappings: BTreeMap<String, CustomMapping>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_xp: 5,
            gold_multiplier: 1.0,
            sound_enabled: true,
            theme_mode: ThemeMode::Manual,
            manual_theme_id: "classic".to_string(),
            debounce_ms: 500,
            tracked_folders: vec!["Daily".to_string()],
            custom_mappings: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Clamps values into their valid ranges: task XP at least 1, a positive
    /// finite gold multiplier.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.default_xp = self.default_xp.max(1);
        if !self.gold_multiplier.is_finite() || self.gold_multiplier <= 0.0 {
            self.gold_multiplier = 1.0;
        }
        self
    }
}

fn default_save_version() -> u32 {
    1
}

/// Everything that cannot be re-derived from the vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveData {
    #[serde(default = "default_save_version")]
    pub version: u32,
    pub gold: u64,
    /// Set once the one-time starting gold has been granted.
    pub bootstrap_applied: bool,
    pub base_layout: Vec<PlacedStructure>,
    pub active_buffs: BTreeSet<BuffId>,
    pub decay: DecayLedger,
    pub quests: BTreeMap<QuestId, QuestProgress>,
    pub task_overrides: BTreeMap<TaskId, bool>,
    /// XP granted by actions rather than notes.
    pub bonus_xp: BTreeMap<SkillId, u64>,
    pub inventory: BTreeMap<ItemId, u32>,
    pub unlocks: BTreeSet<String>,
    pub last_tax_collected: Option<Timestamp>,
    pub settings: Settings,
}

impl Default for SaveData {
    fn default() -> Self {
        Self {
            version: default_save_version(),
            gold: 0,
            bootstrap_applied: false,
            base_layout: Vec::new(),
            active_buffs: BTreeSet::new(),
            decay: DecayLedger::default(),
            quests: BTreeMap::new(),
            task_overrides: BTreeMap::new(),
            bonus_xp: BTreeMap::new(),
            inventory: BTreeMap::new(),
            unlocks: BTreeSet::new(),
            last_tax_collected: None,
            settings: Settings::default(),
        }
    }
}

impl SaveData {
    /// A complete first-run save: defaults plus the starter layout.
    pub fn new_game(content: &GameContent) -> Self {
        Self {
            base_layout: content.starter_layout.clone(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Merged state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub perk: Option<String>,
    pub raw_xp: u64,
    pub decay_debt: u64,
    /// `raw_xp - decay_debt`, floored at zero.
    pub current_xp: u64,
    pub level: u32,
    pub xp_for_next_level: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatLevel {
    pub level: u32,
    pub archetype: Archetype,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TownStats {
    pub tax: i64,
    pub defense: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePerk {
    pub id: PerkId,
    pub name: String,
    pub description: String,
    pub effect: PerkEffect,
    pub value: f64,
    pub source: String,
}

/// The snapshot every view consumes. Rebuilt in full each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub skills: Vec<Skill>,
    pub tasks: Vec<Task>,
    pub quests: Vec<Quest>,
    pub gold: u64,
    pub base_layout: Vec<PlacedStructure>,
    pub active_buffs: BTreeSet<BuffId>,
    pub unlocked_buffs: BTreeSet<BuffId>,
    pub unknown_sources: BTreeMap<String, u32>,
    pub history: Vec<DailyStats>,
    pub inventory: BTreeMap<ItemId, u32>,
    pub unlocks: BTreeSet<String>,
    pub total_xp: u64,
    pub total_level: u32,
    pub combat: CombatLevel,
    pub town: TownStats,
    pub xp_multiplier: f64,
    pub gold_multiplier: f64,
    pub active_perks: Vec<ActivePerk>,
    pub last_update: Timestamp,
}

impl GameState {
    pub fn skill(&self, id: &SkillId) -> Option<&Skill> {
        self.skills.iter().find(|s| &s.id == id)
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    pub fn quest(&self, id: &QuestId) -> Option<&Quest> {
        self.quests.iter().find(|q| &q.id == id)
    }

    pub fn structure_at(&self, x: i32, y: i32) -> Option<&PlacedStructure> {
        self.base_layout.iter().find(|s| s.x == x && s.y == y)
    }
}

// ---------------------------------------------------------------------------
// Actions and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ToggleTask {
        task_id: TaskId,
    },
    StartQuest {
        quest_id: QuestId,
    },
    ToggleQuestStep {
        quest_id: QuestId,
        step_id: StepId,
    },
    CompleteQuest {
        quest_id: QuestId,
    },
    PlaceBuilding {
        building_id: BuildingId,
        x: i32,
        y: i32,
    },
    RemoveBuilding {
        x: i32,
        y: i32,
    },
    SetStructureDamaged {
        x: i32,
        y: i32,
        damaged: bool,
    },
    AdjustGold {
        delta: i64,
    },
    CollectTaxes,
    ToggleBuff {
        buff_id: BuffId,
    },
    SaveSettings {
        settings: Box<Settings>,
    },
    MapSource {
        key: String,
        skill_id: SkillId,
        xp_per_unit: f64,
        #[serde(default)]
        aggregation: Aggregation,
    },
    IgnoreSource {
        key: String,
    },
    CompleteFocusSession {
        skill_id: SkillId,
        seconds: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    TaskToggled {
        task_id: TaskId,
        completed: bool,
    },
    BuffActivated {
        buff_id: BuffId,
    },
    BuffDeactivated {
        buff_id: BuffId,
    },
    LootDropped {
        item_id: ItemId,
    },
    QuestStarted {
        quest_id: QuestId,
    },
    QuestStepToggled {
        quest_id: QuestId,
        step_id: StepId,
        completed: bool,
    },
    QuestCompleted {
        quest_id: QuestId,
        xp: Vec<(SkillId, u64)>,
        gold: u64,
        unlocks: Vec<String>,
    },
    StructurePlaced {
        structure_id: StructureId,
        building_id: BuildingId,
        x: i32,
        y: i32,
        cost: u64,
    },
    StructureRemoved {
        structure_id: StructureId,
    },
    StructureDamageChanged {
        structure_id: StructureId,
        damaged: bool,
    },
    GoldChanged {
        before: u64,
        after: u64,
    },
    TaxesCollected {
        amount: u64,
    },
    SettingsSaved,
    SourceMapped {
        key: String,
        skill_id: SkillId,
    },
    SourceIgnored {
        key: String,
    },
    FocusSessionCompleted {
        skill_id: SkillId,
        xp: u64,
        gold: u64,
    },
    SkillDecayed {
        skill_id: SkillId,
        amount: u64,
    },
}

/// Why an action left the save untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Rejection {
    #[error("unknown task '{0}'")]
    UnknownTask(TaskId),
    #[error("unknown quest '{0}'")]
    UnknownQuest(QuestId),
    #[error("quest '{quest_id}' has no step '{step_id}'")]
    UnknownStep { quest_id: QuestId, step_id: StepId },
    #[error("quest '{quest_id}' cannot start from {status:?}")]
    QuestNotStartable { quest_id: QuestId, status: QuestStatus },
    #[error("quest '{quest_id}' requires '{prereq}' to be completed first")]
    PrerequisiteUnmet { quest_id: QuestId, prereq: QuestId },
    #[error("quest '{quest_id}' is {status:?}, not in progress")]
    QuestNotInProgress { quest_id: QuestId, status: QuestStatus },
    #[error("quest '{0}' still has open steps")]
    StepsIncomplete(QuestId),
    #[error("unknown building '{0}'")]
    UnknownBuilding(BuildingId),
    #[error("building '{0}' cannot be built directly")]
    NotPurchasable(BuildingId),
    #[error("not enough gold: need {needed}gp, have {available}gp")]
    InsufficientGold { needed: u64, available: u64 },
    #[error("cell ({x}, {y}) is outside the {size}x{size} grid")]
    OutOfBounds { x: i32, y: i32, size: i32 },
    #[error("cell ({x}, {y}) is occupied")]
    CellOccupied { x: i32, y: i32 },
    #[error("nothing built at ({x}, {y})")]
    NoStructureAt { x: i32, y: i32 },
    #[error("unknown buff '{0}'")]
    UnknownBuff(BuffId),
    #[error("unknown skill '{0}'")]
    UnknownSkill(SkillId),
    #[error("taxes not ready until {ready_at}")]
    TaxNotReady { ready_at: Timestamp },
    #[error("town produces no tax")]
    NoTaxDue,
    #[error("focus session of {seconds}s is too short to count")]
    SessionTooShort { seconds: u64 },
    #[error("invalid mapping: {0}")]
    InvalidMapping(String),
}
