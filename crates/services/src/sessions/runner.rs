use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use prep_core::model::SessionState;

use super::engine::SessionEngine;
use crate::error::RunnerClosed;

/// Length of one timer tick.
pub const TICK: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 16;

/// Input from the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnerAction {
    SelectOption(usize),
    Skip,
    Next,
    Submit,
    Quit,
}

/// A learner action stamped with the question it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCommand {
    pub question_index: usize,
    pub action: LearnerAction,
}

impl SessionCommand {
    #[must_use]
    pub fn new(question_index: usize, action: LearnerAction) -> Self {
        Self {
            question_index,
            action,
        }
    }
}

/// Owns a started [`SessionEngine`] and feeds it ticks and learner commands
/// from one task, so no two operations ever overlap.
pub struct SessionRunner {
    engine: SessionEngine,
    tick: Duration,
}

impl SessionRunner {
    #[must_use]
    pub fn new(engine: SessionEngine) -> Self {
        Self { engine, tick: TICK }
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Run until the session completes, a `Quit` arrives or every command
    /// sender is dropped. Each resulting snapshot is published on `updates`.
    ///
    /// Returns the final snapshot.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        updates: watch::Sender<SessionState>,
    ) -> SessionState {
        updates.send_replace(self.engine.snapshot());

        let mut interval = time::interval_at(Instant::now() + self.tick, self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut question_index = self.engine.state().current_question_index();

        while !self.engine.state().is_complete() {
            let state = tokio::select! {
                biased;
                command = commands.recv() => {
                    let Some(command) = command else {
                        tracing::debug!("command channel closed");
                        break;
                    };
                    match self.handle(command).await {
                        Some(state) => state,
                        None => break,
                    }
                }
                _ = interval.tick() => self.engine.tick().await,
            };

            // A new question gets a full second before its first tick.
            if state.current_question_index() != question_index {
                question_index = state.current_question_index();
                interval.reset();
            }
            updates.send_replace(state);
        }

        self.engine.snapshot()
    }

    /// Spawn [`SessionRunner::run`] on the current runtime.
    #[must_use]
    pub fn spawn(self) -> (RunnerHandle, JoinHandle<SessionState>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (update_tx, update_rx) = watch::channel(self.engine.snapshot());
        let task = tokio::spawn(self.run(command_rx, update_tx));
        (
            RunnerHandle {
                commands: command_tx,
                updates: update_rx,
            },
            task,
        )
    }

    async fn handle(&mut self, command: SessionCommand) -> Option<SessionState> {
        let current = self.engine.state().current_question_index();
        if command.action != LearnerAction::Quit && command.question_index != current {
            tracing::debug!(
                action = ?command.action,
                issued_for = command.question_index,
                current,
                "stale command dropped"
            );
            return Some(self.engine.snapshot());
        }

        let state = match command.action {
            LearnerAction::SelectOption(index) => self.engine.select_option(index).await,
            LearnerAction::Skip => self.engine.skip().await,
            LearnerAction::Next => self.engine.next().await,
            LearnerAction::Submit => self.engine.submit().await,
            LearnerAction::Quit => {
                tracing::info!(
                    session_id = ?self.engine.state().session_id(),
                    "session left; progress stays saved"
                );
                return None;
            }
        };
        Some(state)
    }
}

/// Client side of a spawned runner.
#[derive(Clone)]
pub struct RunnerHandle {
    commands: mpsc::Sender<SessionCommand>,
    updates: watch::Receiver<SessionState>,
}

impl RunnerHandle {
    /// Latest published snapshot.
    #[must_use]
    pub fn latest(&self) -> SessionState {
        self.updates.borrow().clone()
    }

    #[must_use]
    pub fn updates(&self) -> watch::Receiver<SessionState> {
        self.updates.clone()
    }

    /// Send `action` for the question at `question_index`.
    ///
    /// # Errors
    ///
    /// Returns `RunnerClosed` once the runner has stopped.
    pub async fn send(
        &self,
        question_index: usize,
        action: LearnerAction,
    ) -> Result<(), RunnerClosed> {
        self.commands
            .send(SessionCommand::new(question_index, action))
            .await
            .map_err(|_| RunnerClosed)
    }

    /// Send `action` for the question shown in the latest snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RunnerClosed` once the runner has stopped.
    pub async fn act(&self, action: LearnerAction) -> Result<(), RunnerClosed> {
        let question_index = self.updates.borrow().current_question_index();
        self.send(question_index, action).await
    }
}
