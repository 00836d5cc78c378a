//! Live run streaming
//!
//! [`StreamController`] owns the live `/wunder` connection: it opens the SSE
//! body, feeds chunks through the frame parser and decoder, and dispatches
//! each record into the [`DebugContext`] before reading the next chunk. It
//! also owns the poll scheduler, which stays disarmed while a stream is open.
//!
//! Every operation borrows the context mutably, so a live stream and a
//! poll-driven replay can never touch the same context at the same time.
//!
//! # Module structure
//! - `poll` - Poll scheduler (PollScheduler)

mod poll;

pub use poll::{PollScheduler, DEFAULT_POLL_INTERVAL};

use chrono::Utc;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{DebugApiClient, StreamRequest};
use crate::engine::{DebugContext, SessionStatus};
use crate::error::{DebugError, DebugResult, ReplayError, StreamError};
use crate::events::{decode_frame, decode_stored, DecodeOptions};
use crate::replay::SessionReplayManager;
use crate::sse::{SseFrame, SseFrameParser};

pub const DEFAULT_SETTLE_STEP: Duration = Duration::from_millis(120);
pub const DEFAULT_SETTLE_CAP: Duration = Duration::from_millis(3000);

/// Timing knobs for the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    pub poll_interval: Duration,
    /// Delay between status checks while a cancel settles
    pub settle_step: Duration,
    /// Give up waiting for a cancel to settle after this long
    pub settle_cap: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_step: DEFAULT_SETTLE_STEP,
            settle_cap: DEFAULT_SETTLE_CAP,
        }
    }
}

/// How a live stream ended without a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Body ended. `final_seen` tells whether a `final` event arrived.
    Completed { final_seen: bool },
    /// The cancellation token fired
    Cancelled,
}

/// Why [`StreamController::poll`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStop {
    /// Session reached a non-active status
    Inactive,
    /// Scheduler was disarmed
    Disarmed,
    /// Stop token fired
    Stopped,
}

#[derive(Debug)]
pub struct StreamController {
    client: DebugApiClient,
    replay: SessionReplayManager,
    scheduler: PollScheduler,
    settings: StreamSettings,
}

impl StreamController {
    pub fn new(client: DebugApiClient, settings: StreamSettings) -> Self {
        Self {
            replay: SessionReplayManager::new(client.clone()),
            client,
            scheduler: PollScheduler::new(settings.poll_interval),
            settings,
        }
    }

    pub fn client(&self) -> &DebugApiClient {
        &self.client
    }

    pub fn replay_manager(&self) -> &SessionReplayManager {
        &self.replay
    }

    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut PollScheduler {
        &mut self.scheduler
    }

    /// Run one live stream to completion, failure or cancellation.
    ///
    /// Pending requests are flushed as failed when the body ends without a
    /// `final` event or the transport fails, but not on cancellation: the
    /// backend emits its own terminal events for a cancelled run.
    pub async fn start(
        &mut self,
        ctx: &mut DebugContext,
        request: &StreamRequest,
        cancel: CancellationToken,
    ) -> Result<StreamOutcome, StreamError> {
        if ctx.session().streaming {
            return Err(StreamError::AlreadyStreaming);
        }

        self.scheduler.disarm();
        let mut request = request.clone();
        if request.session_id.is_none() {
            request.session_id = ctx.session_id().map(str::to_string);
        }
        {
            let session = ctx.session_mut();
            session.streaming = true;
            session.status = SessionStatus::Running;
            session.final_seen = false;
        }
        info!(session_id = ?request.session_id, "Opening live stream");

        let result = self.read_stream(ctx, &request, &cancel).await;
        ctx.session_mut().streaming = false;

        match &result {
            Ok(StreamOutcome::Completed { final_seen: true }) => {
                info!("Stream finished");
                ctx.session_mut().status = SessionStatus::Finished;
            }
            Ok(StreamOutcome::Completed { final_seen: false }) => {
                warn!("Stream ended without a final event");
                ctx.flush_pending(None, Utc::now());
                ctx.session_mut().status = SessionStatus::Error;
            }
            Ok(StreamOutcome::Cancelled) => {
                info!("Stream cancelled");
                ctx.session_mut().status = SessionStatus::Cancelling;
            }
            Err(err) => {
                warn!(error = %err, "Stream failed");
                ctx.flush_pending(Some(&err.to_string()), Utc::now());
                ctx.session_mut().status = SessionStatus::Error;
            }
        }

        self.reconcile(ctx).await;
        self.scheduler.arm();
        result
    }

    async fn read_stream(
        &self,
        ctx: &mut DebugContext,
        request: &StreamRequest,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome, StreamError> {
        let mut body = tokio::select! {
            _ = cancel.cancelled() => return Ok(StreamOutcome::Cancelled),
            opened = self.client.open_stream(request) => {
                opened.map_err(|e| e.to_stream_error())?
            }
        };

        let mut parser = SseFrameParser::new();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Dropping the body closes the connection
                    return Ok(StreamOutcome::Cancelled);
                }
                chunk = body.next() => chunk,
            };

            match chunk {
                Some(Ok(bytes)) => {
                    for frame in parser.push_bytes(&bytes) {
                        dispatch_frame(ctx, &frame);
                    }
                }
                Some(Err(e)) => {
                    return Err(StreamError::ConnectionLost {
                        message: e.to_string(),
                    });
                }
                None => break,
            }
        }

        if let Some(frame) = parser.finish() {
            dispatch_frame(ctx, &frame);
        }
        Ok(StreamOutcome::Completed {
            final_seen: ctx.session().final_seen,
        })
    }

    /// One reconciliation poll after a stream on a restored session.
    async fn reconcile(&self, ctx: &mut DebugContext) {
        if !ctx.session().restored || ctx.session_id().is_none() {
            return;
        }
        let result = if ctx.session().final_seen {
            self.replay.sync_cursor(ctx).await.map(|_| ())
        } else {
            debug!("No final event seen, replaying full log");
            self.replay.full_replay(ctx).await.map(|_| ())
        };
        if let Err(err) = result {
            debug!(error = %err, "Post-stream reconciliation failed");
        }
    }

    /// Single-shot run. The answer is dispatched as a `final` event, so its
    /// usage is merged as a snapshot.
    pub async fn send_once(
        &mut self,
        ctx: &mut DebugContext,
        request: &StreamRequest,
    ) -> Result<Value, StreamError> {
        if ctx.session().streaming {
            return Err(StreamError::AlreadyStreaming);
        }
        let mut request = request.clone();
        if request.session_id.is_none() {
            request.session_id = ctx.session_id().map(str::to_string);
        }
        ctx.session_mut().status = SessionStatus::Running;

        match self.client.send(&request).await {
            Ok(answer) => {
                let entry = json!({"type": "final", "data": answer.clone()});
                match decode_stored(&entry, &DecodeOptions::default()) {
                    Ok(record) => {
                        ctx.dispatch(record);
                    }
                    Err(err) => ctx.report_parse_error(&err, Utc::now()),
                }
                ctx.session_mut().status = SessionStatus::Finished;
                Ok(answer)
            }
            Err(err) => {
                let err = err.to_stream_error();
                warn!(error = %err, "Single-shot request failed");
                ctx.flush_pending(Some(&err.to_string()), Utc::now());
                ctx.session_mut().status = SessionStatus::Error;
                Err(err)
            }
        }
    }

    /// Poll the session log while the session is active.
    ///
    /// Transient fetch failures are logged and polling goes on. A missing
    /// session ends polling with [`ReplayError::NotFound`].
    pub async fn poll(
        &mut self,
        ctx: &mut DebugContext,
        stop: &CancellationToken,
    ) -> Result<PollStop, ReplayError> {
        loop {
            if !self.scheduler.is_armed() {
                return Ok(PollStop::Disarmed);
            }
            if !ctx.session().status.is_active() {
                debug!(status = %ctx.session().status, "Polling stopped");
                return Ok(PollStop::Inactive);
            }
            if !self.scheduler.tick(stop).await {
                return Ok(PollStop::Stopped);
            }
            match self.replay.replay(ctx).await {
                Ok(_) => {}
                Err(err @ (ReplayError::NotFound { .. } | ReplayError::NoSession)) => {
                    self.scheduler.disarm();
                    return Err(err);
                }
                // Already logged by the replay manager
                Err(_) => {}
            }
        }
    }

    /// Ask the backend to cancel the active session.
    pub async fn cancel(&mut self, ctx: &mut DebugContext) -> DebugResult<()> {
        let session_id = ctx
            .session_id()
            .map(str::to_string)
            .ok_or(DebugError::Replay(ReplayError::NoSession))?;
        self.client.cancel(&session_id).await.map_err(|e| {
            DebugError::Network(e.to_network_error(&self.client.cancel_url(&session_id)))
        })?;
        info!(session_id = %session_id, "Cancel requested");
        ctx.session_mut().status = SessionStatus::Cancelling;
        Ok(())
    }

    /// Wait until a requested cancel reaches a non-active status.
    ///
    /// Returns false if the status was still active after the settle cap.
    pub async fn wait_for_cancel_settle(&self, ctx: &mut DebugContext) -> bool {
        let deadline = Instant::now() + self.settings.settle_cap;
        loop {
            if !ctx.session().status.is_active() {
                return true;
            }
            if Instant::now() >= deadline {
                warn!("Cancel did not settle in time");
                return false;
            }
            tokio::time::sleep(self.settings.settle_step).await;
            match self.replay.replay(ctx).await {
                Ok(_) => {}
                Err(ReplayError::NotFound { .. }) | Err(ReplayError::NoSession) => return true,
                Err(_) => {}
            }
        }
    }

    /// Start over: cancel an active run, then drop all session state.
    pub async fn new_session(&mut self, ctx: &mut DebugContext) {
        if ctx.session().status.is_active() && ctx.session_id().is_some() {
            if let Err(err) = self.cancel(ctx).await {
                warn!(error = %err, "Cancel before new session failed");
            }
            self.wait_for_cancel_settle(ctx).await;
        }
        self.scheduler.disarm();
        ctx.reset_session();
        ctx.clear_store();
        info!("Started new session");
    }
}

fn dispatch_frame(ctx: &mut DebugContext, frame: &SseFrame) {
    match decode_frame(frame, &DecodeOptions::default()) {
        Ok(record) => {
            ctx.dispatch(record);
        }
        Err(err) => ctx.report_parse_error(&err, Utc::now()),
    }
}
