//! Browsing Session Manager
//!
//! Each HTML preview that browses a package owns one session. A worker task
//! creates it, refreshes it on a schedule and disposes it on teardown. All
//! state lives in the worker; network calls run as spawned tasks that
//! report back tagged with the generation they were started for, and
//! results from an older generation are discarded.
//!
//! - At most one create/refresh call is outstanding per instance; a retry
//!   issued while one is in flight waits for it to land.
//! - Disposal is best effort, never awaited and never retried.
//! - Nothing is refreshed after teardown.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::core::{Action, AsyncResult, ObjectHandle, PreviewError};
use crate::error::{Error, Result};
use crate::services::{BrowsingSession, SessionApi};

/// Floor for any scheduled refresh
pub const MIN_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// When a refresh is scheduled after a successful create or refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshSchedule {
    /// Every `ttl × 0.2`
    #[default]
    Interval,
    /// At `(expires − now) × 0.8`
    Expiry,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub schedule: RefreshSchedule,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 180,
            schedule: RefreshSchedule::Interval,
        }
    }
}

impl SessionConfig {
    /// Delay before the next refresh of `session`, never below
    /// [`MIN_REFRESH_DELAY`]
    pub fn refresh_delay(&self, session: &BrowsingSession) -> Duration {
        let delay = match self.schedule {
            RefreshSchedule::Interval => Duration::from_secs_f64(self.ttl_secs as f64 * 0.2),
            RefreshSchedule::Expiry => (session.expires - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
                .mul_f64(0.8),
        };
        delay.max(MIN_REFRESH_DELAY)
    }
}

pub type SessionState = AsyncResult<BrowsingSession, PreviewError>;

/// Session state tagged with the generation that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub generation: u64,
    pub state: SessionState,
}

/// Map a failed session mutation into the preview taxonomy
pub fn classify(e: Error, handle: &ObjectHandle, retry: Action) -> PreviewError {
    let handle = handle.clone();
    match e {
        Error::Preview(e) => e,
        Error::Session { ref name, .. } if name == "SessionNotFound" => {
            PreviewError::Expired { retry }
        }
        Error::Session { ref name, .. } if name == "BucketNotBrowsable" || name == "OwnerMismatch" => {
            PreviewError::Forbidden { handle }
        }
        Error::Session { ref name, .. } if name == "BucketNotFound" => {
            PreviewError::DoesNotExist { handle }
        }
        other => {
            error!(
                bucket = handle.bucket(),
                key = handle.key(),
                error = %other,
                "browsing session failed"
            );
            PreviewError::unexpected(handle, Some(retry), other)
        }
    }
}

/// Starts one session worker per HTML preview instance
#[derive(Clone)]
pub struct SessionManager {
    api: Arc<dyn SessionApi>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(api: Arc<dyn SessionApi>, config: SessionConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Create a session for `scope` and keep it alive until the returned
    /// handle is torn down or dropped. Must be called inside a runtime.
    pub fn start(&self, scope: impl Into<String>, handle: ObjectHandle) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(Snapshot {
            generation: 0,
            state: AsyncResult::Init,
        });
        let requested = Arc::new(AtomicU64::new(1));

        let worker = Worker {
            api: self.api.clone(),
            config: self.config.clone(),
            scope: scope.into(),
            handle,
            generation: 0,
            session: None,
            in_flight: false,
            create_queued: false,
            refresh_at: None,
            retry: retry_action(&commands_tx, &requested),
            outcomes: outcomes_tx,
            state: state_tx,
        };
        tokio::spawn(worker.run(commands_rx, outcomes_rx));

        SessionHandle {
            commands: commands_tx,
            state: state_rx,
            requested,
            torn_down: AtomicBool::new(false),
        }
    }
}

enum Command {
    Retry,
    Teardown,
}

enum Outcome {
    Created {
        generation: u64,
        result: Result<BrowsingSession>,
    },
    Refreshed {
        generation: u64,
        result: Result<BrowsingSession>,
    },
}

fn retry_action(commands: &mpsc::UnboundedSender<Command>, requested: &Arc<AtomicU64>) -> Action {
    let commands = commands.clone();
    let requested = requested.clone();
    Action::new(move || {
        requested.fetch_add(1, Ordering::SeqCst);
        let _ = commands.send(Command::Retry);
    })
}

fn spawn_dispose(api: Arc<dyn SessionApi>, id: String) {
    tokio::spawn(async move {
        match api.dispose(&id).await {
            Ok(()) => debug!(session_id = %id, "session disposed"),
            Err(e) => debug!(session_id = %id, error = %e, "session dispose failed"),
        }
    });
}

struct Worker {
    api: Arc<dyn SessionApi>,
    config: SessionConfig,
    scope: String,
    handle: ObjectHandle,
    generation: u64,
    /// Last session obtained in the current generation
    session: Option<BrowsingSession>,
    in_flight: bool,
    create_queued: bool,
    refresh_at: Option<Instant>,
    retry: Action,
    outcomes: mpsc::UnboundedSender<Outcome>,
    state: watch::Sender<Snapshot>,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut outcomes: mpsc::UnboundedReceiver<Outcome>,
    ) {
        self.next_generation();

        loop {
            let refresh_at = self.refresh_at;
            let can_refresh = refresh_at.is_some() && !self.in_flight;
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Retry) => self.next_generation(),
                    Some(Command::Teardown) | None => break,
                },
                Some(outcome) = outcomes.recv() => self.apply(outcome),
                _ = async move {
                    if let Some(at) = refresh_at {
                        sleep_until(at).await
                    }
                }, if can_refresh => self.start_refresh(),
            }
        }

        if let Some(session) = self.session.take() {
            spawn_dispose(self.api.clone(), session.id);
        }
        // Creates landing from here on dispose their own session
        outcomes.close();
        while let Ok(outcome) = outcomes.try_recv() {
            if let Outcome::Created {
                result: Ok(session),
                ..
            } = outcome
            {
                spawn_dispose(self.api.clone(), session.id);
            }
        }
        debug!(scope = %self.scope, generation = self.generation, "session worker stopped");
    }

    fn publish(&self, state: SessionState) {
        let next = Snapshot {
            generation: self.generation,
            state,
        };
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    /// Reset and re-enter creation
    fn next_generation(&mut self) {
        self.generation += 1;
        self.refresh_at = None;
        if let Some(old) = self.session.take() {
            spawn_dispose(self.api.clone(), old.id);
        }
        self.publish(AsyncResult::Pending);
        self.start_create();
    }

    fn start_create(&mut self) {
        if self.in_flight {
            self.create_queued = true;
            return;
        }
        self.in_flight = true;
        debug!(scope = %self.scope, generation = self.generation, "creating session");

        let api = self.api.clone();
        let scope = self.scope.clone();
        let ttl = self.config.ttl_secs;
        let generation = self.generation;
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = api.create(&scope, ttl).await;
            let undelivered = outcomes.send(Outcome::Created { generation, result });
            // Worker is gone: nobody else will dispose this session
            if let Err(mpsc::error::SendError(Outcome::Created {
                result: Ok(session),
                ..
            })) = undelivered
            {
                spawn_dispose(api, session.id);
            }
        });
    }

    fn start_refresh(&mut self) {
        self.refresh_at = None;
        let Some(ref session) = self.session else {
            return;
        };
        self.in_flight = true;
        debug!(session_id = %session.id, generation = self.generation, "refreshing session");

        let api = self.api.clone();
        let id = session.id.clone();
        let ttl = self.config.ttl_secs;
        let generation = self.generation;
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = api.refresh(&id, ttl).await;
            let _ = outcomes.send(Outcome::Refreshed { generation, result });
        });
    }

    fn apply(&mut self, outcome: Outcome) {
        self.in_flight = false;
        let (generation, result, created) = match outcome {
            Outcome::Created { generation, result } => (generation, result, true),
            Outcome::Refreshed { generation, result } => (generation, result, false),
        };

        if generation != self.generation {
            debug!(stale = generation, current = self.generation, "discarding stale session result");
            if let (true, Ok(session)) = (created, result) {
                spawn_dispose(self.api.clone(), session.id);
            }
        } else {
            match result {
                Ok(session) => {
                    if created {
                        info!(session_id = %session.id, generation, "browsing session created");
                    }
                    let delay = self.config.refresh_delay(&session);
                    self.refresh_at = Some(Instant::now() + delay);
                    self.session = Some(session.clone());
                    self.publish(AsyncResult::Ok(session));
                }
                Err(e) => {
                    self.refresh_at = None;
                    let error = classify(e, &self.handle, self.retry.clone());
                    self.publish(AsyncResult::Err(error));
                }
            }
        }

        if self.create_queued {
            self.create_queued = false;
            self.start_create();
        }
    }
}

/// Owner's side of one session worker
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<Snapshot>,
    requested: Arc<AtomicU64>,
    torn_down: AtomicBool,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        self.state.borrow().state.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Restart with a fresh create in a new generation
    pub fn retry(&self) {
        self.retry_action().invoke();
    }

    pub fn retry_action(&self) -> Action {
        retry_action(&self.commands, &self.requested)
    }

    /// First settled state of the latest requested generation
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.state.clone();
        let target = self.requested.load(Ordering::SeqCst);
        let settled = rx
            .wait_for(|s| s.generation >= target && s.state.is_settled())
            .await
            .map(|s| s.state.clone());
        settled.unwrap_or_else(|_| rx.borrow().state.clone())
    }

    /// Observer of changes after the current state; does not keep the
    /// session alive
    pub fn watch(&self) -> SessionWatch {
        let mut rx = self.state.clone();
        rx.borrow_and_update();
        SessionWatch(rx)
    }

    /// Stop refreshing and dispose the session, if one was obtained
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            let _ = self.commands.send(Command::Teardown);
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Change feed of a session's state
pub struct SessionWatch(watch::Receiver<Snapshot>);

impl SessionWatch {
    /// Next state, or `None` once the worker stopped
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.0.changed().await.ok()?;
        Some(self.0.borrow_and_update().clone())
    }
}
