//! Session and turn lifecycle.
//!
//! A session is a manifest at `/sessions/{id}/session.json` plus whatever
//! artifacts live under its directory. Each new turn is anchored to a
//! checkpoint taken just before the turn is appended, so the session can be
//! rewound to any turn that has one.

use vellum_core::ids::{new_session_id, now_rfc3339};
use vellum_core::namespace::{
    session_dir, session_manifest_path, turn_bundle_path, BundleKind, SESSION_PREFIX,
};
use vellum_core::{Result, Session, SessionStatus, Turn, TurnStatus, VellumError};
use vellum_store::checkpoint;
use vellum_store::ArtifactStore;

pub const SESSION_KIND: &str = "session";

const MANIFEST_FILE: &str = "session.json";

fn write_manifest(store: &mut ArtifactStore, session: &Session) -> Result<()> {
    let path = session_manifest_path(&session.id);
    let bytes = serde_json::to_vec_pretty(session).map_err(|e| VellumError::serde(&path, e))?;
    store.put_record(&path, SESSION_KIND, &bytes, &session.goal)?;
    Ok(())
}

fn require_active(session: &Session) -> Result<()> {
    if session.is_active() {
        Ok(())
    } else {
        Err(VellumError::SessionArchived {
            id: session.id.clone(),
        })
    }
}

pub fn create_session(store: &mut ArtifactStore, goal: &str) -> Result<Session> {
    let session = Session {
        id: new_session_id(),
        goal: goal.to_string(),
        status: SessionStatus::Active,
        start_time: now_rfc3339(),
        end_time: None,
        turns: Vec::new(),
    };
    write_manifest(store, &session)?;
    tracing::info!(session = %session.id, goal, "session created");
    Ok(session)
}

pub fn get_session(store: &ArtifactStore, id: &str) -> Result<Session> {
    let path = session_manifest_path(id);
    let bytes = store
        .get_artifact_content(&path)?
        .ok_or_else(|| VellumError::not_found("session", id))?;
    serde_json::from_slice(&bytes).map_err(|e| VellumError::serde(&path, e))
}

/// Every session with a manifest, oldest first.
pub fn list_sessions(store: &ArtifactStore) -> Result<Vec<Session>> {
    let mut sessions = Vec::new();
    for path in store.list_paths(SESSION_PREFIX)? {
        let Some(rest) = path.strip_prefix(SESSION_PREFIX) else {
            continue;
        };
        let Some((id, file)) = rest.split_once('/') else {
            continue;
        };
        if file != MANIFEST_FILE {
            continue;
        }
        sessions.push(get_session(store, id)?);
    }
    sessions.sort_by(|a, b| (&a.start_time, &a.id).cmp(&(&b.start_time, &b.id)));
    Ok(sessions)
}

pub fn list_turns(store: &ArtifactStore, id: &str) -> Result<Vec<Turn>> {
    Ok(get_session(store, id)?.turns)
}

/// Append the next turn, checkpointing first.
///
/// A failed checkpoint does not stop the turn; it is created without one and
/// cannot be rewound to.
pub fn create_turn(store: &mut ArtifactStore, id: &str) -> Result<Turn> {
    let mut session = get_session(store, id)?;
    require_active(&session)?;
    let index = session.next_turn_index();

    let checkpoint_id = match checkpoint::create(store, &format!("session {id} turn {index}")) {
        Ok(cp) => Some(cp.id),
        Err(e) => {
            tracing::warn!(session = %id, turn = index, error = %e, "turn checkpoint failed, continuing without one");
            None
        }
    };

    let turn = Turn {
        index,
        context_bundle_path: turn_bundle_path(id, index, BundleKind::Context),
        proposal_bundle_path: turn_bundle_path(id, index, BundleKind::Proposal),
        status: TurnStatus::Pending,
        checkpoint_id,
        created_at: now_rfc3339(),
    };
    session.turns.push(turn.clone());
    write_manifest(store, &session)?;
    tracing::info!(session = %id, turn = index, "turn created");
    Ok(turn)
}

pub fn set_turn_status(
    store: &mut ArtifactStore,
    id: &str,
    index: usize,
    status: TurnStatus,
) -> Result<Turn> {
    let mut session = get_session(store, id)?;
    require_active(&session)?;
    let turn = session
        .turn_mut(index)
        .ok_or_else(|| VellumError::not_found("turn", format!("{id}#{index}")))?;
    turn.status = status;
    let updated = turn.clone();
    write_manifest(store, &session)?;
    Ok(updated)
}

/// Restore turn `index`'s checkpoint and drop every later turn.
pub fn rewind_to_turn(store: &mut ArtifactStore, id: &str, index: usize) -> Result<Session> {
    let mut session = get_session(store, id)?;
    require_active(&session)?;
    let turn = session
        .turn(index)
        .ok_or_else(|| VellumError::not_found("turn", format!("{id}#{index}")))?;
    let checkpoint_id = turn
        .checkpoint_id
        .clone()
        .ok_or_else(|| VellumError::NoCheckpoint {
            session: id.to_string(),
            turn: index,
        })?;

    checkpoint::restore(store, &checkpoint_id)?;
    session.truncate_after(index);
    write_manifest(store, &session)?;
    tracing::info!(session = %id, turn = index, checkpoint = %checkpoint_id, "session rewound");
    Ok(session)
}

pub fn archive_session(store: &mut ArtifactStore, id: &str) -> Result<Session> {
    let mut session = get_session(store, id)?;
    require_active(&session)?;
    session.status = SessionStatus::Archived;
    session.end_time = Some(now_rfc3339());
    write_manifest(store, &session)?;
    tracing::info!(session = %id, "session archived");
    Ok(session)
}

/// Delete the session and every artifact under its directory. Returns the
/// removed paths.
pub fn delete_session(store: &mut ArtifactStore, id: &str) -> Result<Vec<String>> {
    get_session(store, id)?;
    let dir = session_dir(id);
    let mut paths: Vec<String> = store
        .state()?
        .paths_with_prefix(&dir)
        .cloned()
        .collect();
    paths.extend(store.list_paths(&dir)?);
    paths.sort();
    paths.dedup();

    for path in &paths {
        store.delete_artifact(path)?;
    }
    tracing::info!(session = %id, removed = paths.len(), "session deleted");
    Ok(paths)
}
