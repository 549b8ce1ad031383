use super::*;
use crate::test_fixtures::{base_content, base_save, make_rng, vault_file, NOW};

mod parser;
mod scenarios;

// --- Shared test helpers ------------------------------------------------

const HOUR: i64 = MS_PER_HOUR;

fn test_content() -> GameContent {
    base_content()
}

fn parse(files: &[VaultFile], content: &GameContent, settings: &Settings) -> ParsedState {
    let inference = KeywordInference::from_content(content);
    parse_vault(files, content, settings, &inference)
}

/// One parse + merge cycle against `save`.
fn run_cycle(
    files: &[VaultFile],
    save: &SaveData,
    content: &GameContent,
    now: Timestamp,
) -> MergeOutcome {
    let parsed = parse(files, content, &save.settings);
    merge(&parsed, save, content, now)
}

fn skill_xp(state: &GameState, id: &str) -> u64 {
    state
        .skill(&SkillId(id.to_string()))
        .map_or(0, |s| s.current_xp)
}

fn daily(date: &str, body: &str) -> VaultFile {
    vault_file(&format!("Daily/{date}.md"), body)
}
