use parking_lot::Mutex;
use rpg_control::{Notice, Session};
use rpg_core::{Event, Timestamp};
use rpg_world::JsonFileStore;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

pub type SharedSession = Arc<Mutex<Session<JsonFileStore>>>;
pub type EventTx = broadcast::Sender<StreamMessage>;
pub type RefreshTx = mpsc::Sender<()>;

/// What the SSE stream carries.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Events { events: Vec<Event> },
    StateChanged { last_update: Timestamp },
    Notices { notices: Vec<Notice> },
}

#[derive(Clone)]
pub struct AppState {
    pub session: SharedSession,
    pub event_tx: EventTx,
    pub refresh_tx: RefreshTx,
    pub vault: Arc<PathBuf>,
}
