//! Preview orchestrator
//!
//! [`Preview::load`] resolves a loader through the registry and drives it
//! from a per-instance worker task. Retry, unlock and load-more each start
//! a new generation; a result that lands for an older generation is
//! dropped, together with any resources its load context holds.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::core::{Action, AsyncResult, ObjectHandle, PreviewResult, S3Handle};
use crate::loaders::{self, Env, LoadContext, LoadOptions};
use crate::registry::Registry;
use crate::services::SizeTier;

/// Preview state tagged with the generation that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub generation: u64,
    pub result: PreviewResult,
}

/// Entry point: one shared environment and registry, many previews
#[derive(Clone)]
pub struct Preview {
    env: Arc<Env>,
    registry: Arc<Registry>,
}

impl Preview {
    pub fn new(env: Arc<Env>, registry: Registry) -> Self {
        Self {
            env,
            registry: Arc::new(registry),
        }
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Start previewing `handle`. Must be called inside a runtime.
    pub fn load(&self, handle: ObjectHandle, options: LoadOptions) -> PreviewTask {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(Snapshot {
            generation: 0,
            result: AsyncResult::Init,
        });
        let requested = Arc::new(AtomicU64::new(1));

        let worker = Worker {
            env: self.env.clone(),
            registry: self.registry.clone(),
            handle,
            options,
            generation: 0,
            current: None,
            retry: command_action(&commands_tx, &requested, Command::Retry),
            unlock: command_action(&commands_tx, &requested, Command::Unlock),
            load_more: command_action(&commands_tx, &requested, Command::LoadMore),
            outcomes: outcomes_tx,
            state: state_tx,
        };
        tokio::spawn(worker.run(commands_rx, outcomes_rx));

        PreviewTask {
            commands: commands_tx,
            state: state_rx,
            requested,
            closed: AtomicBool::new(false),
        }
    }

    /// Like [`Preview::load`], invoking `callback` with the current state and
    /// then on every observed change.
    ///
    /// The callback reads the latest published state, so transitions that
    /// land before it runs are coalesced: an intermediate `Pending` may be
    /// skipped, but the last state is always delivered.
    pub fn load_with(
        &self,
        handle: ObjectHandle,
        options: LoadOptions,
        mut callback: impl FnMut(PreviewResult) + Send + 'static,
    ) -> PreviewTask {
        let task = self.load(handle, options);
        let mut rx = task.state.clone();
        tokio::spawn(async move {
            let first = rx.borrow_and_update().result.clone();
            callback(first);
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().result.clone();
                callback(next);
            }
        });
        task
    }

    /// Unsaved editor content for an object
    pub fn draft(&self, handle: &S3Handle) -> Option<String> {
        self.env.drafts.get(handle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Retry,
    Unlock,
    LoadMore,
    Close,
}

enum Outcome {
    /// The loader returned
    Loaded {
        generation: u64,
        result: PreviewResult,
        ctx: LoadContext,
    },
    /// A later result published through the load context
    Update {
        generation: u64,
        result: PreviewResult,
    },
}

fn command_action(
    commands: &mpsc::UnboundedSender<Command>,
    requested: &Arc<AtomicU64>,
    command: Command,
) -> Action {
    let commands = commands.clone();
    let requested = requested.clone();
    Action::new(move || {
        requested.fetch_add(1, Ordering::SeqCst);
        let _ = commands.send(command);
    })
}

struct Worker {
    env: Arc<Env>,
    registry: Arc<Registry>,
    handle: ObjectHandle,
    options: LoadOptions,
    generation: u64,
    /// Context of the load whose result is current
    current: Option<LoadContext>,
    retry: Action,
    unlock: Action,
    load_more: Action,
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
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Retry) => self.next_generation(),
                    Some(Command::Unlock) => {
                        self.options.force = true;
                        self.next_generation();
                    }
                    Some(Command::LoadMore) => {
                        self.options.size = Some(SizeTier::Large);
                        self.next_generation();
                    }
                    Some(Command::Close) | None => break,
                },
                Some(outcome) = outcomes.recv() => self.apply(outcome),
            }
        }

        if let Some(ctx) = self.current.take() {
            debug!(options = ?ctx.options, "releasing load context");
        }
        debug!(
            bucket = self.handle.bucket(),
            key = self.handle.key(),
            generation = self.generation,
            "preview closed"
        );
    }

    fn publish(&self, result: PreviewResult) {
        let generation = self.generation;
        self.state.send_if_modified(|snapshot| {
            snapshot.generation = generation;
            if snapshot.result == result {
                false
            } else {
                snapshot.result = result;
                true
            }
        });
    }

    fn next_generation(&mut self) {
        self.generation += 1;
        self.current = None;
        self.publish(AsyncResult::Pending);

        let generation = self.generation;
        let entry = self
            .registry
            .choose(self.handle.detection_key(), &self.options);
        debug!(
            bucket = self.handle.bucket(),
            key = self.handle.key(),
            loader = entry.name(),
            generation,
            "loading preview"
        );

        let loader = entry.loader().clone();
        let updates = self.outcomes.clone();
        let ctx = LoadContext::new(self.env.clone(), self.options.clone())
            .with_actions(self.retry.clone(), self.unlock.clone(), self.load_more.clone())
            .with_publisher(move |result| {
                let _ = updates.send(Outcome::Update { generation, result });
            });
        let handle = self.handle.clone();
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            let result = loaders::run(loader.as_ref(), &ctx, &handle).await;
            let _ = outcomes.send(Outcome::Loaded {
                generation,
                result,
                ctx,
            });
        });
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Loaded {
                generation,
                result,
                ctx,
            } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "dropping stale preview result");
                    return;
                }
                self.current = Some(ctx);
                self.publish(result);
            }
            Outcome::Update { generation, result } => {
                if generation == self.generation {
                    self.publish(result);
                }
            }
        }
    }
}

/// Handle on one running preview
pub struct PreviewTask {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<Snapshot>,
    requested: Arc<AtomicU64>,
    closed: AtomicBool,
}

impl PreviewTask {
    pub fn current(&self) -> PreviewResult {
        self.state.borrow().result.clone()
    }

    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Next state, or `None` once the preview is closed
    pub async fn changed(&mut self) -> Option<PreviewResult> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().result.clone())
    }

    /// First settled result of the latest requested generation
    pub async fn settled(&self) -> PreviewResult {
        let mut rx = self.state.clone();
        let target = self.requested.load(Ordering::SeqCst);
        let settled = rx
            .wait_for(|s| s.generation >= target && s.result.is_settled())
            .await
            .map(|s| s.result.clone());
        settled.unwrap_or_else(|_| rx.borrow().result.clone())
    }

    fn send(&self, command: Command) {
        self.requested.fetch_add(1, Ordering::SeqCst);
        let _ = self.commands.send(command);
    }

    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Reload past the size gate
    pub fn unlock(&self) {
        self.send(Command::Unlock);
    }

    /// Reload a tabular preview at the largest tier
    pub fn load_more(&self) {
        self.send(Command::LoadMore);
    }

    /// Stop the preview and release what the current load holds
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.commands.send(Command::Close);
        }
    }
}

impl Drop for PreviewTask {
    fn drop(&mut self) {
        self.close();
    }
}
