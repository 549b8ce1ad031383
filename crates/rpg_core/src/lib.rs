//! `rpg_core` — deterministic progression engine.
//!
//! No IO, no clock. Time arrives as a `Timestamp` argument and all
//! randomness via the passed-in Rng.

mod actions;
mod curve;
mod decay;
mod derived;
mod id;
mod loot;
mod merge;
mod parser;
mod quests;
mod registry;
mod types;

pub use actions::{apply_action, focus_reward};
pub use curve::{level_from_xp, xp_for_level, MAX_LEVEL};
pub use decay::{apply_decay, decay_rates, DecayLoss, DecayOutcome};
pub use derived::{active_perks, buff_multiplier, combat_level, perk_multiplier, town_stats};
pub use id::{generate_uuid, structure_id};
pub use loot::roll_loot;
pub use merge::{merge, MergeOutcome};
pub use parser::{parse_vault, KeywordInference, QuestSkillInference};
pub use quests::{all_steps_complete, prerequisite_met};
pub use registry::{Resolution, SourceRegistry};
pub use types::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;
