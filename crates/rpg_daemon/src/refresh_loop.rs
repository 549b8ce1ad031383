use crate::state::{EventTx, SharedSession, StreamMessage};
use rpg_control::RefreshOutcome;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Re-reads the vault and merges it. The ticket is taken before the read so
/// a newer refresh started meanwhile wins and this one is dropped.
pub async fn refresh_once(session: SharedSession, vault: Arc<PathBuf>, event_tx: EventTx) {
    let ticket = session.lock().begin_refresh();
    let root = Arc::clone(&vault);
    let files = match tokio::task::spawn_blocking(move || rpg_world::read_vault(&root)).await {
        Ok(Ok(files)) => files,
        Ok(Err(err)) => {
            tracing::warn!("vault read failed, keeping previous state: {err:#}");
            return;
        }
        Err(err) => {
            tracing::warn!("vault read task failed: {err}");
            return;
        }
    };

    let message = {
        let mut guard = session.lock();
        let notices_before = guard.notices().len();
        match guard.finish_refresh(ticket, files, rpg_world::now_ms()) {
            RefreshOutcome::Stale => None,
            RefreshOutcome::Applied => {
                let fresh = guard.notices()[notices_before.min(guard.notices().len())..].to_vec();
                Some((guard.state().last_update, fresh))
            }
        }
    };

    if let Some((last_update, notices)) = message {
        let _ = event_tx.send(StreamMessage::StateChanged { last_update });
        if !notices.is_empty() {
            let _ = event_tx.send(StreamMessage::Notices { notices });
        }
    }
}

/// Coalesces change notifications. Each burst waits until the vault has
/// been quiet for the save's `debounce_ms`, then starts one refresh.
pub async fn run_refresh_loop(
    session: SharedSession,
    vault: Arc<PathBuf>,
    event_tx: EventTx,
    mut rx: mpsc::Receiver<()>,
) {
    while rx.recv().await.is_some() {
        let debounce = Duration::from_millis(session.lock().save().settings.debounce_ms);
        let mut closed = false;
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(())) => {}
                Ok(None) => {
                    closed = true;
                    break;
                }
                Err(_) => break,
            }
        }

        tokio::spawn(refresh_once(
            Arc::clone(&session),
            Arc::clone(&vault),
            event_tx.clone(),
        ));
        if closed {
            break;
        }
    }
    tracing::debug!("refresh channel closed, loop exiting");
}
