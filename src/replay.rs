//! Session log replay.
//!
//! Rebuilds engine state from the backend's persisted log. A replay is
//! either full (reset everything, dispatch every entry) or incremental
//! (dispatch only the entries past the cursor). Both end with the cursor at
//! the log's event count, so repeating a replay of an unchanged log is a
//! no-op and replaying after a reset always lands on the same state.
//!
//! A cursor of zero or one past the end of the log means local state cannot
//! be trusted, and the replay falls back to a full one.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::client::{DebugApiClient, SessionLog};
use crate::engine::{DebugContext, SessionStatus};
use crate::error::ReplayError;
use crate::events::{decode_stored, DecodeOptions};

/// How a log is applied to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayMode {
    /// Reset and dispatch every entry
    Full,
    /// Dispatch entries from this index on
    Incremental { from: usize },
}

impl ReplayMode {
    /// Pick a mode from the local cursor and the log length.
    pub fn plan(cursor: usize, len: usize) -> Self {
        if cursor > 0 && cursor <= len {
            ReplayMode::Incremental { from: cursor }
        } else {
            ReplayMode::Full
        }
    }
}

/// What one replay did.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    pub mode: ReplayMode,
    pub dispatched: usize,
    /// Entries that failed to decode
    pub skipped: usize,
    pub cursor: usize,
    pub status: SessionStatus,
}

/// Apply a log, choosing full or incremental from the context's cursor.
pub fn apply_log(ctx: &mut DebugContext, log: &SessionLog) -> ReplayOutcome {
    let mode = ReplayMode::plan(ctx.session().event_cursor, log.events.len());
    apply_log_with(ctx, log, mode)
}

/// Reset the context and dispatch the whole log.
pub fn apply_full_log(ctx: &mut DebugContext, log: &SessionLog) -> ReplayOutcome {
    apply_log_with(ctx, log, ReplayMode::Full)
}

fn apply_log_with(ctx: &mut DebugContext, log: &SessionLog, mode: ReplayMode) -> ReplayOutcome {
    // Entries without a timestamp inherit the latest one seen
    let (from, mut last_ts) = match mode {
        ReplayMode::Full => {
            ctx.reset_engine();
            (0, None)
        }
        ReplayMode::Incremental { from } => (from, ctx.stats().last_event_at),
    };

    if ctx.session_id().is_none() {
        if let Some(id) = log.session.session_id.as_deref() {
            ctx.adopt_session_id(id);
        }
    }

    let mut dispatched = 0;
    let mut skipped = 0;
    for entry in log.events.iter().skip(from) {
        let options = DecodeOptions {
            timestamp: None,
            now: last_ts,
        };
        match decode_stored(entry, &options) {
            Ok(record) => {
                last_ts = Some(record.timestamp);
                ctx.dispatch(record);
                dispatched += 1;
            }
            Err(err) => {
                ctx.report_parse_error(&err, last_ts.unwrap_or_else(Utc::now));
                skipped += 1;
            }
        }
    }

    let cursor = log.events.len();
    let session = ctx.session_mut();
    session.event_cursor = cursor;
    session.restored = true;
    session.status = log.session.status;

    debug!(?mode, dispatched, skipped, cursor, "Applied session log");
    ReplayOutcome {
        mode,
        dispatched,
        skipped,
        cursor,
        status: log.session.status,
    }
}

/// Fetches session logs and reconciles them into a [`DebugContext`].
#[derive(Debug, Clone)]
pub struct SessionReplayManager {
    client: DebugApiClient,
}

impl SessionReplayManager {
    pub fn new(client: DebugApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &DebugApiClient {
        &self.client
    }

    /// Fetch the active session's log.
    ///
    /// A 404 drops the session id from the context and the store. Any other
    /// failure leaves the context untouched.
    pub async fn fetch(&self, ctx: &mut DebugContext) -> Result<SessionLog, ReplayError> {
        let session_id = ctx
            .session_id()
            .map(str::to_string)
            .ok_or(ReplayError::NoSession)?;

        match self.client.fetch_session_log(&session_id).await {
            Ok(log) => Ok(log),
            Err(err) => {
                let err = err.to_replay_error(&session_id);
                if err.is_not_found() {
                    info!(session_id = %session_id, "Session not found, dropping cached id");
                    ctx.forget_session();
                    ctx.session_mut().status = SessionStatus::Idle;
                } else {
                    warn!(session_id = %session_id, error = %err, "Session log fetch failed");
                }
                Err(err)
            }
        }
    }

    /// Full or incremental replay, depending on the cursor.
    pub async fn replay(&self, ctx: &mut DebugContext) -> Result<ReplayOutcome, ReplayError> {
        let log = self.fetch(ctx).await?;
        let outcome = apply_log(ctx, &log);
        info!(
            mode = ?outcome.mode,
            dispatched = outcome.dispatched,
            status = %outcome.status,
            "Replayed session log"
        );
        Ok(outcome)
    }

    /// Reset and replay the whole log.
    pub async fn full_replay(&self, ctx: &mut DebugContext) -> Result<ReplayOutcome, ReplayError> {
        let log = self.fetch(ctx).await?;
        let outcome = apply_full_log(ctx, &log);
        info!(dispatched = outcome.dispatched, "Replayed full session log");
        Ok(outcome)
    }

    /// Advance the cursor to the log's event count without dispatching.
    ///
    /// Used after a live stream already rendered the events.
    pub async fn sync_cursor(&self, ctx: &mut DebugContext) -> Result<usize, ReplayError> {
        let log = self.fetch(ctx).await?;
        let session = ctx.session_mut();
        session.event_cursor = log.events.len();
        session.status = log.session.status;
        debug!(cursor = session.event_cursor, "Synced event cursor");
        Ok(session.event_cursor)
    }
}
