//! `rpg_control` — the session that owns a player's progression.
//!
//! A [`Session`] holds the only mutable copy of the save, the last vault
//! snapshot, and the merged [`GameState`]. Every change goes through
//! [`Session::refresh`] or [`Session::apply`]; both end with a merge and a
//! write through the [`SaveStore`] seam.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rpg_core::{
    apply_action, merge, parse_vault, Action, DecayLoss, Event, GameContent, GameState,
    KeywordInference, ParsedState, QuestSkillInference, Rejection, SaveData, Timestamp,
    VaultFile,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Persistence seam
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("save file io: {0}")]
    Io(#[from] std::io::Error),
    #[error("save document is not valid: {0}")]
    Format(#[from] serde_json::Error),
    #[error("save store unavailable: {0}")]
    Unavailable(String),
}

/// Where the save document lives. One writer, whole-document reads and writes.
pub trait SaveStore: Send {
    /// `Ok(None)` when no save exists yet.
    fn read(&mut self) -> Result<Option<String>, StoreError>;
    fn write(&mut self, document: &str) -> Result<(), StoreError>;
}

/// In-memory store. `fail_writes` simulates an unwritable save file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub document: Option<String>,
    pub fail_writes: bool,
    pub writes: usize,
}

impl MemoryStore {
    pub fn with_document(document: impl Into<String>) -> Self {
        Self {
            document: Some(document.into()),
            ..Self::default()
        }
    }
}

impl SaveStore for MemoryStore {
    fn read(&mut self) -> Result<Option<String>, StoreError> {
        Ok(self.document.clone())
    }

    fn write(&mut self, document: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.document = Some(document.to_string());
        self.writes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Decay,
    Persistence,
    Reward,
}

/// A soft, dismissible message for the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

/// Skills losing this much or less are left out of the summary.
const DECAY_NOTICE_MIN_LOSS: u64 = 5;
/// More named skills than this collapse into a single total.
const DECAY_NOTICE_MAX_NAMED: usize = 2;

/// One-line summary of a decay pass, `None` when nothing worth telling
/// the player was lost.
pub fn decay_notice(losses: &[DecayLoss], content: &GameContent) -> Option<String> {
    let total: u64 = losses.iter().map(|l| l.amount).sum();
    let parts: Vec<String> = losses
        .iter()
        .filter(|l| l.amount > DECAY_NOTICE_MIN_LOSS)
        .map(|l| {
            let name = content
                .skill(&l.skill_id)
                .map_or(l.skill_id.as_str(), |s| s.name.as_str());
            format!("{name} -{}", l.amount)
        })
        .collect();
    match parts.len() {
        0 => None,
        n if n > DECAY_NOTICE_MAX_NAMED => {
            Some(format!("Entropy set in... You lost {total} XP."))
        }
        _ => Some(format!("Atrophy: {} XP", parts.join(", "))),
    }
}

fn reward_notice(event: &Event, state: &GameState, content: &GameContent) -> Option<String> {
    match event {
        Event::LootDropped { item_id } => {
            let name = content
                .items
                .iter()
                .find(|i| &i.id == item_id)
                .map_or(item_id.as_str(), |i| i.name.as_str());
            Some(format!("Loot! Found {name}"))
        }
        Event::QuestCompleted { quest_id, gold, .. } => {
            let name = state
                .quest(quest_id)
                .map_or(quest_id.as_str(), |q| q.name.as_str());
            Some(format!("Quest complete: {name} (+{gold}gp)"))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Handed out by [`Session::begin_refresh`]. Only the newest ticket may
/// finish; older ones are discarded whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    Stale,
}

pub struct Session<S: SaveStore> {
    content: GameContent,
    store: S,
    inference: Box<dyn QuestSkillInference + Send>,
    save: SaveData,
    files: Vec<VaultFile>,
    parsed: ParsedState,
    state: GameState,
    rng: ChaCha8Rng,
    notices: Vec<Notice>,
    next_notice_id: u64,
    generation: u64,
}

impl<S: SaveStore> Session<S> {
    /// Loads the save and runs the first parse + merge over `files`.
    ///
    /// A missing save is replaced by a complete new-game document and
    /// written straight away. An unreadable one falls back to defaults and
    /// leaves a notice.
    pub fn open(
        content: GameContent,
        mut store: S,
        files: Vec<VaultFile>,
        seed: u64,
        now: Timestamp,
    ) -> Self {
        let mut notices = Vec::new();
        let (save, fresh) = match load_save(&mut store) {
            Ok(Some(save)) => (save, false),
            Ok(None) => {
                tracing::info!("no save found, starting a new game");
                (SaveData::new_game(&content), true)
            }
            Err(err) => {
                tracing::warn!("could not load save, using defaults: {err}");
                notices.push(Notice {
                    id: 0,
                    kind: NoticeKind::Persistence,
                    message: format!("Could not load your save ({err}). Playing on defaults."),
                });
                (SaveData::new_game(&content), false)
            }
        };

        let inference = Box::new(KeywordInference::from_content(&content));
        let parsed = parse_vault(&files, &content, &save.settings, inference.as_ref());
        let first = merge(&parsed, &save, &content, now);
        let next_notice_id = notices.len() as u64;
        let mut session = Self {
            content,
            store,
            inference,
            save,
            files,
            parsed,
            state: first.state,
            rng: ChaCha8Rng::seed_from_u64(seed),
            notices,
            next_notice_id,
            generation: 0,
        };
        session.commit(first.save, &first.decay_losses, fresh);
        session
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn save(&self) -> &SaveData {
        &self.save
    }

    pub fn content(&self) -> &GameContent {
        &self.content
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns whether a notice with `id` was queued.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// Swaps the quest-skill heuristic and re-parses the cached vault.
    pub fn set_quest_inference(
        &mut self,
        inference: Box<dyn QuestSkillInference + Send>,
        now: Timestamp,
    ) {
        self.inference = inference;
        self.reparse();
        self.remerge(now, false);
    }

    // --- Refresh -----------------------------------------------------------

    /// Starts a refresh. Any ticket handed out earlier becomes stale.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.generation += 1;
        RefreshTicket {
            generation: self.generation,
        }
    }

    /// Completes a refresh with the vault snapshot read for `ticket`.
    pub fn finish_refresh(
        &mut self,
        ticket: RefreshTicket,
        files: Vec<VaultFile>,
        now: Timestamp,
    ) -> RefreshOutcome {
        if ticket.generation != self.generation {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale refresh"
            );
            return RefreshOutcome::Stale;
        }
        self.files = files;
        self.reparse();
        self.remerge(now, false);
        RefreshOutcome::Applied
    }

    pub fn refresh(&mut self, files: Vec<VaultFile>, now: Timestamp) -> RefreshOutcome {
        let ticket = self.begin_refresh();
        self.finish_refresh(ticket, files, now)
    }

    // --- Actions -----------------------------------------------------------

    /// Validates and applies `action`, then re-merges and persists.
    /// A rejected action leaves the session untouched.
    pub fn apply(&mut self, action: &Action, now: Timestamp) -> Result<Vec<Event>, Rejection> {
        let mut next = self.save.clone();
        let events = apply_action(
            &mut next,
            &self.state,
            action,
            &self.content,
            &mut self.rng,
            now,
        )?;

        let settings_changed = next.settings != self.save.settings;
        self.save = next;
        if settings_changed {
            self.reparse();
        }
        for event in &events {
            if let Some(message) = reward_notice(event, &self.state, &self.content) {
                self.push_notice(NoticeKind::Reward, message);
            }
        }
        self.remerge(now, true);
        Ok(events)
    }

    // --- Internals ---------------------------------------------------------

    fn reparse(&mut self) {
        self.parsed = parse_vault(
            &self.files,
            &self.content,
            &self.save.settings,
            self.inference.as_ref(),
        );
    }

    fn remerge(&mut self, now: Timestamp, force_write: bool) {
        let out = merge(&self.parsed, &self.save, &self.content, now);
        self.state = out.state;
        self.commit(out.save, &out.decay_losses, force_write);
    }

    fn commit(&mut self, save: SaveData, losses: &[DecayLoss], force_write: bool) {
        for loss in losses {
            tracing::info!(skill = %loss.skill_id, amount = loss.amount, "skill decayed");
        }
        if let Some(message) = decay_notice(losses, &self.content) {
            self.push_notice(NoticeKind::Decay, message);
        }
        let changed = save != self.save;
        self.save = save;
        if changed || force_write {
            self.persist();
        }
    }

    fn persist(&mut self) {
        let result = serde_json::to_string_pretty(&self.save)
            .map_err(StoreError::from)
            .and_then(|doc| self.store.write(&doc));
        if let Err(err) = result {
            tracing::warn!("could not write save: {err}");
            // One outstanding persistence notice is enough.
            if !self
                .notices
                .iter()
                .any(|n| n.kind == NoticeKind::Persistence)
            {
                self.push_notice(
                    NoticeKind::Persistence,
                    format!("Progress could not be saved ({err}). Will retry on the next change."),
                );
            }
        }
    }

    fn push_notice(&mut self, kind: NoticeKind, message: String) {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notices.push(Notice { id, kind, message });
    }
}

fn load_save(store: &mut impl SaveStore) -> Result<Option<SaveData>, StoreError> {
    match store.read()? {
        Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
        None => Ok(None),
    }
}
