//! Run Turn use case
//!
//! Drives one session's phase pointer through the turn cycle:
//!
//! | Phase                | Agents invoked      | Gate                     |
//! |----------------------|---------------------|--------------------------|
//! | NARRATION            | none (memory write) | unconditional            |
//! | MEMORY_RETRIEVAL     | all (memory read)   | unconditional            |
//! | OOC_DISCUSSION       | strategic           | consensus (may loop)     |
//! | STRATEGIC_INTENT     | strategic           | unconditional            |
//! | DIRECTIVE            | none                | unconditional            |
//! | ACTION               | role-play (pending) | unconditional            |
//! | VALIDATION           | evaluator on retry  | validation (may loop)    |
//! | ADJUDICATION         | human (suspends)    | human input              |
//! | RESOLUTION / OUTCOME | none                | unconditional            |
//! | REACTION             | role-play           | unconditional            |
//! | MEMORY_CONSOLIDATION | none (memory write) | continuation             |
//!
//! Every phase runs against a copy of the turn's working set and returns
//! its staged effects. They are applied together at phase exit: messages
//! are published in one batch, memory writes are issued, the edge is taken
//! and the session is persisted. Teardown in the middle of a phase drops
//! the staged effects.

mod invoke;
mod phases;
mod types;

pub use types::{RunTurnError, TurnCycleInput};

use types::PhaseExit;

use crate::config::EngineConfig;
use crate::ports::action_producer::AgentGateway;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::memory_store::{MemoryPayload, MemoryStore};
use crate::ports::progress::{NoProgress, TurnProgressNotifier};
use crate::ports::session_repository::SessionRepository;
use crate::use_cases::validate_action::ValidationPipeline;
use serde_json::json;
use std::sync::Arc;
use table_domain::{
    AdjudicationInput, ChannelRouter, DomainError, GateKind, GateResult, Message, Phase,
    ResumeReceipt, SessionState, TurnResult, TurnStatus, TurnWarning, TurnWarningKind,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Use case for running turn cycles
pub struct RunTurnUseCase<G: AgentGateway + 'static> {
    pub(super) gateway: Arc<G>,
    pub(super) memory: Arc<dyn MemoryStore>,
    pub(super) sessions: Arc<dyn SessionRepository>,
    pub(super) logger: Arc<dyn ConversationLogger>,
    pub(super) config: EngineConfig,
    pub(super) pipeline: ValidationPipeline,
    pub(super) cancellation_token: Option<CancellationToken>,
}

impl<G: AgentGateway + 'static> RunTurnUseCase<G> {
    pub fn new(
        gateway: Arc<G>,
        memory: Arc<dyn MemoryStore>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        let config = EngineConfig::default();
        Self {
            gateway,
            memory,
            sessions,
            logger: Arc::new(NoConversationLogger),
            pipeline: ValidationPipeline::new(&config),
            config,
            cancellation_token: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.pipeline = ValidationPipeline::new(&config);
        self.config = config;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Tear the session down at the next phase boundary once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ==================== Entry Points ====================

    /// Allocate the next session number and persist its empty state.
    pub async fn start_session(&self) -> Result<u64, RunTurnError> {
        let session = self.latest_session().await?.map_or(1, |latest| latest + 1);
        self.sessions.save(&SessionState::new(session)).await?;
        info!("Session {} allocated", session);
        Ok(session)
    }

    /// Run a turn from NARRATION up to the adjudication suspension point
    pub async fn execute_turn_cycle(
        &self,
        input: TurnCycleInput,
    ) -> Result<TurnResult, RunTurnError> {
        self.execute_turn_cycle_with_progress(input, &NoProgress)
            .await
    }

    /// A turn left between phases by a failed save is continued from its
    /// last committed phase; the narration given here is then ignored.
    pub async fn execute_turn_cycle_with_progress(
        &self,
        input: TurnCycleInput,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<TurnResult, RunTurnError> {
        let mut state = match self.sessions.load(input.session).await? {
            Some(state) => state,
            None => self.new_session(input.session).await?,
        };

        if state.is_ended() {
            return Err(RunTurnError::AlreadyEnded(state.session));
        }
        if input.turn != state.turn {
            return Err(RunTurnError::TurnMismatch {
                expected: state.turn,
                requested: input.turn,
            });
        }
        if state.is_interrupted() && !state.is_past_adjudication() {
            info!(
                "Session {} turn {}: continuing interrupted turn from {}; stored narration kept",
                state.session, state.turn, state.phase
            );
            let router = self.router_for(&state);
            return self.drive(&mut state, &router, None, progress).await;
        }
        if !matches!(state.phase, Phase::SessionStart | Phase::Narration) {
            return Err(RunTurnError::NotReady {
                session: state.session,
                phase: state.phase,
            });
        }

        info!(
            "Session {} turn {}: starting with {} participants",
            state.session,
            state.turn,
            input.participants.len()
        );

        state.participants = input.participants;
        if state.phase == Phase::SessionStart {
            let from = state.phase;
            state.advance(GateResult::Unconditional)?;
            self.log_transition(&state, from, GateKind::Unconditional);
        }
        state.begin_turn();
        state.working.narration = Some(input.narration);

        let router = self.router_for(&state);
        self.drive(&mut state, &router, None, progress).await
    }

    /// Resume a suspended turn with the game master's input and run it to
    /// completion.
    ///
    /// Replaying the input of the last completed resume returns the same
    /// result without applying anything again.
    pub async fn resume_turn_with_input(
        &self,
        session: u64,
        input: AdjudicationInput,
    ) -> Result<TurnResult, RunTurnError> {
        self.resume_turn_with_input_with_progress(session, input, &NoProgress)
            .await
    }

    pub async fn resume_turn_with_input_with_progress(
        &self,
        session: u64,
        input: AdjudicationInput,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<TurnResult, RunTurnError> {
        let mut state = self.load_existing(session).await?;

        if state.is_interrupted() && state.is_past_adjudication() {
            if state.working.ruling.as_ref() != Some(&input) {
                return Err(RunTurnError::NotSuspended {
                    session,
                    phase: state.phase,
                });
            }
            info!(
                "Session {} turn {}: continuing interrupted resume from {}",
                session, state.turn, state.phase
            );
            let router = self.router_for(&state);
            return self.drive(&mut state, &router, Some(&input), progress).await;
        }
        if !state.is_suspended() && state.phase != Phase::Adjudication {
            if let Some(receipt) = &state.last_resume
                && receipt.input == input
            {
                info!("Session {}: resume already applied, returning receipt", session);
                return Ok(receipt.result.clone());
            }
            if state.is_ended() {
                return Err(RunTurnError::AlreadyEnded(session));
            }
            return Err(RunTurnError::NotSuspended {
                session,
                phase: state.phase,
            });
        }
        if state.phase != Phase::Adjudication {
            return Err(DomainError::PhaseStateCorruption {
                phase: state.phase,
                gate: GateKind::HumanInput,
            }
            .into());
        }

        info!(
            "Session {} turn {}: resuming with {}",
            session,
            state.turn,
            input.kind.as_str()
        );

        let router = self.router_for(&state);
        let mut working = state.working.clone();
        working.ruling = Some(input.clone());
        state.suspension = None;
        self.commit(
            &mut state,
            &router,
            PhaseExit::new(GateResult::HumanInput, working),
            Some(&input),
            progress,
        )
        .await?;

        self.drive(&mut state, &router, Some(&input), progress).await
    }

    /// External "/quit": end the session at its last committed phase.
    ///
    /// Tearing down an ended session is a no-op.
    pub async fn teardown(&self, session: u64) -> Result<TurnResult, RunTurnError> {
        let mut state = self.load_existing(session).await?;
        if state.is_ended() {
            debug!("Session {} already ended", session);
            return Ok(state.to_result(state.turn, TurnStatus::SessionEnded));
        }
        self.tear_down(&mut state).await
    }

    /// Read-only snapshot of a persisted session
    pub async fn status(&self, session: u64) -> Result<SessionState, RunTurnError> {
        self.load_existing(session).await
    }

    // ==================== Phase Loop ====================

    /// Run phases until the session rests: suspended at adjudication,
    /// back at NARRATION after consolidation, or ended.
    async fn drive(
        &self,
        state: &mut SessionState,
        router: &ChannelRouter,
        input: Option<&AdjudicationInput>,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<TurnResult, RunTurnError> {
        let turn = state.turn;

        loop {
            match state.phase {
                Phase::SessionEnd => {
                    return Ok(state.to_result(turn, TurnStatus::SessionEnded));
                }
                Phase::Adjudication => {
                    state.suspend();
                    self.sessions.save(state).await?;
                    self.logger.log(ConversationEvent::new(
                        "turn_suspended",
                        json!({ "session": state.session, "turn": state.turn }),
                    ));
                    info!(
                        "Session {} turn {}: awaiting adjudication",
                        state.session, state.turn
                    );
                    progress.on_suspended(state.session, state.turn);
                    return Ok(state.to_result(turn, TurnStatus::Suspended));
                }
                _ => {}
            }

            if self.is_cancelled() {
                return self.tear_down(state).await;
            }

            let phase = state.phase;
            let exit = match &self.cancellation_token {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        warn!("Session {}: cancelled during {}", state.session, phase);
                        return self.tear_down(state).await;
                    }
                    exit = self.run_phase(state, router, progress) => exit?,
                },
                None => self.run_phase(state, router, progress).await?,
            };

            self.commit(state, router, exit, input, progress).await?;

            if phase == Phase::MemoryConsolidation {
                let status = if state.is_ended() {
                    TurnStatus::SessionEnded
                } else {
                    TurnStatus::Completed
                };
                return Ok(state.to_result(turn, status));
            }
        }
    }

    /// Apply a phase's staged effects and take its edge.
    async fn commit(
        &self,
        state: &mut SessionState,
        router: &ChannelRouter,
        exit: PhaseExit,
        input: Option<&AdjudicationInput>,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<(), RunTurnError> {
        let PhaseExit {
            gate,
            mut working,
            messages,
            memory,
        } = exit;
        let exited = state.phase;
        let turn = state.turn;

        // Reject a mismatched gate before anything becomes visible
        exited.next(gate)?;

        router.publish_batch(messages.clone())?;
        for message in &messages {
            self.log_message(message);
        }
        state.messages.extend(messages);

        for payload in memory {
            let kind = payload.kind().to_string();
            if let Err(e) = self.write_memory(state.session, turn, payload).await {
                warn!("Memory write ({}) failed after retries: {}", kind, e);
                working.warnings.push(TurnWarning::new(
                    TurnWarningKind::MemoryUnavailable,
                    exited,
                    format!("{} not stored: {}", kind, e),
                ));
            }
        }

        state.working = working;
        state.advance(gate)?;

        if exited == Phase::MemoryConsolidation {
            state.complete_turn();
            if let Some(input) = input {
                let status = if state.is_ended() {
                    TurnStatus::SessionEnded
                } else {
                    TurnStatus::Completed
                };
                state.last_resume = Some(ResumeReceipt {
                    turn,
                    input: input.clone(),
                    result: state.to_result(turn, status),
                });
            }
        }

        self.log_transition(state, exited, gate.kind());
        info!("Phase {} → {} ({})", exited, state.phase, gate.kind());
        progress.on_phase_complete(exited);

        self.sessions.save(state).await?;
        Ok(())
    }

    /// Take the teardown edge from the last committed phase, archive the
    /// log (best effort) and persist.
    async fn tear_down(&self, state: &mut SessionState) -> Result<TurnResult, RunTurnError> {
        let turn = state.turn;
        let from = state.phase;
        state.suspension = None;
        state.advance(GateResult::Teardown)?;

        let archive = MemoryPayload::SessionArchive {
            messages: state.messages.clone(),
        };
        if let Err(e) = self.write_memory(state.session, turn, archive).await {
            warn!("Session archive failed: {}", e);
            state.working.warnings.push(TurnWarning::new(
                TurnWarningKind::MemoryUnavailable,
                from,
                format!("session archive not stored: {}", e),
            ));
        }

        self.log_transition(state, from, GateKind::Teardown);
        info!("Session {} torn down from {}", state.session, from);
        self.sessions.save(state).await?;
        Ok(state.to_result(turn, TurnStatus::SessionEnded))
    }

    // ==================== Helpers ====================

    async fn load_existing(&self, session: u64) -> Result<SessionState, RunTurnError> {
        self.sessions
            .load(session)
            .await?
            .ok_or(RunTurnError::UnknownSession(session))
    }

    async fn latest_session(&self) -> Result<Option<u64>, RunTurnError> {
        Ok(self.sessions.list().await?.into_iter().max())
    }

    /// Fresh state for a session number never saved before.
    ///
    /// Session numbers only grow: a number below the latest stored
    /// session is refused.
    async fn new_session(&self, session: u64) -> Result<SessionState, RunTurnError> {
        if let Some(latest) = self.latest_session().await?
            && session <= latest
        {
            return Err(RunTurnError::SessionOutOfOrder {
                requested: session,
                latest,
            });
        }
        Ok(SessionState::new(session))
    }

    fn router_for(&self, state: &SessionState) -> ChannelRouter {
        let router = ChannelRouter::with_log(state.messages.clone(), self.config.summary_len);
        router.register_all(state.agents());
        router
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(|t| t.is_cancelled())
    }

    fn log_message(&self, message: &Message) {
        self.logger.log(ConversationEvent::new(
            "message_published",
            serde_json::to_value(message).unwrap_or_default(),
        ));
    }

    fn log_transition(&self, state: &SessionState, from: Phase, gate: GateKind) {
        self.logger.log(ConversationEvent::new(
            "phase_transition",
            json!({
                "session": state.session,
                "turn": state.turn,
                "from": from.as_str(),
                "to": state.phase.as_str(),
                "gate": gate.to_string(),
            }),
        ));
    }
}
