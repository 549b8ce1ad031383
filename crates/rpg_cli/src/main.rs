use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rpg_control::Session;
use rpg_core::{
    Action, Aggregation, BuffId, BuildingId, Event, GameState, QuestId, QuestStatus, SkillId,
    StepId, TaskId,
};
use rpg_world::{load_content, now_ms, read_vault, JsonFileStore};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "rpg_cli", about = "Vault RPG command line")]
struct Cli {
    /// Root of the markdown vault.
    #[arg(long, default_value = ".")]
    vault: PathBuf,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Save file. Defaults to `<vault>/.rpg/save.json`.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Seed for loot rolls and structure ids. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Skills, gold, town, and active quests.
    Status,
    /// Unmapped habit keys seen in the vault, most frequent first.
    Review,
    /// Daily history, oldest first.
    History,
    /// Map an unknown key to a skill.
    Map {
        key: String,
        skill: String,
        #[arg(long, default_value_t = 1.0)]
        rate: f64,
        #[arg(long, value_enum, default_value_t = AggregationArg::Count)]
        aggregation: AggregationArg,
    },
    /// Stop reporting a key in the review queue.
    Ignore { key: String },
    /// Flip a task's completion.
    Toggle { task_id: String },
    StartQuest { quest_id: String },
    Step { quest_id: String, step_id: String },
    CompleteQuest { quest_id: String },
    /// Place a building at a grid cell.
    Build { building: String, x: i32, y: i32 },
    Demolish { x: i32, y: i32 },
    /// Clear damage from a structure for the repair fee.
    Repair { x: i32, y: i32 },
    Taxes,
    Buff { buff_id: String },
    /// Add (or with a negative value, spend) gold.
    Gold {
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Claim a finished focus session.
    Focus { skill: String, minutes: f64 },
}

/// How a mapped value turns into XP.
#[derive(Clone, Copy, ValueEnum)]
enum AggregationArg {
    Count,
    Duration,
    Rating,
    Completion,
}

impl From<AggregationArg> for Aggregation {
    fn from(arg: AggregationArg) -> Self {
        match arg {
            AggregationArg::Count => Aggregation::Count,
            AggregationArg::Duration => Aggregation::Duration,
            AggregationArg::Rating => Aggregation::Rating,
            AggregationArg::Completion => Aggregation::Completion,
        }
    }
}

/// `None` for read-only commands.
fn to_action(command: Commands) -> Option<Action> {
    let action = match command {
        Commands::Status | Commands::Review | Commands::History => return None,
        Commands::Map {
            key,
            skill,
            rate,
            aggregation,
        } => Action::MapSource {
            key,
            skill_id: SkillId(skill),
            xp_per_unit: rate,
            aggregation: aggregation.into(),
        },
        Commands::Ignore { key } => Action::IgnoreSource { key },
        Commands::Toggle { task_id } => Action::ToggleTask {
            task_id: TaskId(task_id),
        },
        Commands::StartQuest { quest_id } => Action::StartQuest {
            quest_id: QuestId(quest_id),
        },
        Commands::Step { quest_id, step_id } => Action::ToggleQuestStep {
            quest_id: QuestId(quest_id),
            step_id: StepId(step_id),
        },
        Commands::CompleteQuest { quest_id } => Action::CompleteQuest {
            quest_id: QuestId(quest_id),
        },
        Commands::Build { building, x, y } => Action::PlaceBuilding {
            building_id: BuildingId(building),
            x,
            y,
        },
        Commands::Demolish { x, y } => Action::RemoveBuilding { x, y },
        Commands::Repair { x, y } => Action::SetStructureDamaged {
            x,
            y,
            damaged: false,
        },
        Commands::Taxes => Action::CollectTaxes,
        Commands::Buff { buff_id } => Action::ToggleBuff {
            buff_id: BuffId(buff_id),
        },
        Commands::Gold { delta } => Action::AdjustGold { delta },
        Commands::Focus { skill, minutes } => Action::CompleteFocusSession {
            skill_id: SkillId(skill),
            seconds: (minutes.max(0.0) * 60.0).round() as u64,
        },
    };
    Some(action)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_status(state: &GameState) {
    println!(
        "gold={}gp  total_xp={}  total_level={}  combat={} ({:?})  tax={}  defense={}",
        state.gold,
        state.total_xp,
        state.total_level,
        state.combat.level,
        state.combat.archetype,
        state.town.tax,
        state.town.defense,
    );
    println!(
        "xp_multiplier={:.2}  gold_multiplier={:.2}",
        state.xp_multiplier, state.gold_multiplier
    );
    println!("{}", "-".repeat(60));
    for skill in &state.skills {
        let decay = if skill.decay_debt > 0 {
            format!("  (-{} decay)", skill.decay_debt)
        } else {
            String::new()
        };
        println!(
            "{:<14} lvl {:>3}  {:>9} xp  next {:>9}{decay}",
            skill.name, skill.level, skill.current_xp, skill.xp_for_next_level
        );
    }
    for perk in &state.active_perks {
        println!("perk: {} ({}) from {}", perk.name, perk.description, perk.source);
    }
    let open: Vec<_> = state
        .quests
        .iter()
        .filter(|q| q.status != QuestStatus::Completed)
        .collect();
    if !open.is_empty() {
        println!("{}", "-".repeat(60));
        for quest in open {
            let done = quest.steps.iter().filter(|s| s.completed).count();
            println!(
                "[{:?}] {} ({}) {done}/{} steps",
                quest.status,
                quest.name,
                quest.id,
                quest.steps.len()
            );
        }
    }
}

fn print_review(state: &GameState) {
    if state.unknown_sources.is_empty() {
        println!("Review queue is empty.");
        return;
    }
    let mut queue: Vec<(&String, &u32)> = state.unknown_sources.iter().collect();
    queue.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (key, count) in queue {
        println!("{count:>5}  {key}");
    }
}

fn print_history(state: &GameState) {
    for day in &state.history {
        let primary = day.primary_skill.as_ref().map_or("-", |s| s.as_str());
        println!(
            "{}  {:>6} xp  {:>3} tasks  {primary}",
            day.date, day.total_xp, day.tasks_completed
        );
    }
}

fn print_events(events: &[Event]) -> Result<()> {
    for event in events {
        println!(
            "{}",
            serde_json::to_string(event).context("serializing event")?
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let content = load_content(&cli.content_dir)?;
    let files = read_vault(&cli.vault)
        .with_context(|| format!("reading vault {}", cli.vault.display()))?;
    let save_path = cli
        .save
        .unwrap_or_else(|| cli.vault.join(".rpg").join("save.json"));
    let seed = cli.seed.unwrap_or_else(rand::random);
    tracing::debug!(
        notes = files.len(),
        save = %save_path.display(),
        seed,
        "opening session"
    );

    let mut session = Session::open(content, JsonFileStore::new(save_path), files, seed, now_ms());

    match cli.command {
        Commands::Status => print_status(session.state()),
        Commands::Review => print_review(session.state()),
        Commands::History => print_history(session.state()),
        command => {
            if let Some(action) = to_action(command) {
                let events = session.apply(&action, now_ms())?;
                tracing::debug!(events = events.len(), "action applied");
                if events.is_empty() {
                    println!("Nothing to do.");
                }
                print_events(&events)?;
            }
        }
    }

    for notice in session.notices() {
        eprintln!("[{:?}] {}", notice.kind, notice.message);
    }
    Ok(())
}
