//! Per-phase behavior.
//!
//! Each handler reads the committed [`SessionState`], works on a copy of
//! the turn's working set and returns a [`PhaseExit`] with its gate and
//! staged effects. Nothing here touches the log or the repository.

use super::RunTurnUseCase;
use super::invoke::Invocation;
use super::types::{PhaseExit, RunTurnError};
use crate::ports::action_producer::{AgentGateway, ProducerContext, ProducerTask};
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::memory_store::MemoryPayload;
use crate::ports::progress::TurnProgressNotifier;
use crate::use_cases::validate_action::Evaluator;
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;
use table_domain::{
    AdjudicationKind, AgentContribution, AgentId, AgentLayer, AgentProfile, ChannelRouter,
    ConsensusClassification, ConsensusDetector, DomainError, GateKind, GateResult, Message,
    MessageKind, Phase, Position, SessionState, Stance, TurnWarning, TurnWarningKind,
    TurnWorkingSet, ValidationOutcome, parse_stance, positions_from_messages,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Router-check `message` and add it to the phase's staged messages.
fn stage(
    router: &ChannelRouter,
    staged: &mut Vec<Message>,
    message: Message,
) -> Result<(), DomainError> {
    router.check(&message)?;
    staged.push(message);
    Ok(())
}

fn strategic_agents(state: &SessionState) -> Vec<AgentProfile> {
    state
        .participants
        .iter()
        .map(|p| p.strategic.clone())
        .collect()
}

fn role_play_agents(state: &SessionState) -> Vec<AgentProfile> {
    state
        .participants
        .iter()
        .map(|p| p.character.clone())
        .collect()
}

/// Role-play agents that act in this ACTION phase instance: everyone on
/// first entry, afterwards only those whose last attempt failed.
fn acting_agents(state: &SessionState) -> Vec<AgentProfile> {
    if state.working.actions.is_empty() {
        return role_play_agents(state);
    }
    let pending = state.working.awaiting_action();
    role_play_agents(state)
        .into_iter()
        .filter(|agent| pending.contains(&agent.id))
        .collect()
}

fn next_attempt(working: &TurnWorkingSet, agent: &AgentId) -> u8 {
    working
        .validations
        .get(agent)
        .map_or(1, |outcome| outcome.attempt.saturating_add(1))
}

/// Text of a settled action: the validated (possibly fixed) text if there
/// is one, else what the agent produced. A degraded action is always its
/// placeholder.
fn settled_text(working: &TurnWorkingSet, contribution: &AgentContribution) -> String {
    if contribution.degraded {
        return contribution.intent_text.clone();
    }
    working
        .validations
        .get(&contribution.agent)
        .map(|outcome| outcome.action_text.clone())
        .unwrap_or_else(|| contribution.intent_text.clone())
}

/// The agent failed to produce a corrected action after a rejection.
/// Its rejected text is never published; the failure is kept as exhausted
/// so that it reaches the game master flagged.
fn settle_abandoned_retry(phase: Phase, working: &mut TurnWorkingSet, agent: &AgentId) {
    let Some(outcome) = working.validations.remove(agent) else {
        return;
    };
    if outcome.is_settled() {
        working.validations.insert(agent.clone(), outcome);
        return;
    }
    warn!(
        "{}: no corrected action after attempt {}, flagging for review",
        agent, outcome.attempt
    );
    working.warnings.push(
        TurnWarning::new(
            TurnWarningKind::ValidationExhausted,
            phase,
            format!(
                "no corrected action after attempt {}; rejected text withheld: {}",
                outcome.attempt, outcome.action_text
            ),
        )
        .for_agent(agent.clone()),
    );
    working.validations.insert(agent.clone(), outcome.exhausted());
}

fn degraded_warning(phase: Phase, agent: &AgentId, error: &impl std::fmt::Display) -> TurnWarning {
    TurnWarning::new(
        TurnWarningKind::DegradedContribution,
        phase,
        format!("placeholder used: {}", error),
    )
    .for_agent(agent.clone())
}

impl<G: AgentGateway + 'static> RunTurnUseCase<G> {
    /// Run the current phase and return its staged exit.
    pub(super) async fn run_phase(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<PhaseExit, RunTurnError> {
        let phase = state.phase;
        let assigned = match phase {
            Phase::MemoryRetrieval => state.agents().cloned().collect(),
            Phase::OocDiscussion | Phase::StrategicIntent => strategic_agents(state),
            Phase::Action => acting_agents(state),
            Phase::Reaction => role_play_agents(state),
            _ => Vec::new(),
        };
        info!("Phase {}: {} agents assigned", phase, assigned.len());
        progress.on_phase_start(phase, assigned.len());

        match phase {
            Phase::Narration => self.narration(state, router),
            Phase::MemoryRetrieval => Ok(self.memory_retrieval(state, &assigned).await),
            Phase::OocDiscussion => self.discussion(state, router, assigned, progress).await,
            Phase::StrategicIntent => {
                self.strategic_intent(state, router, assigned, progress)
                    .await
            }
            Phase::Directive => self.directive(state, router),
            Phase::Action => self.action(state, router, assigned, progress).await,
            Phase::Validation => self.validation(state, router).await,
            Phase::Resolution => self.resolution(state, router),
            Phase::Outcome => self.outcome(state, router),
            Phase::Reaction => self.reaction(state, router, assigned, progress).await,
            Phase::MemoryConsolidation => Ok(self.consolidation(state)),
            Phase::SessionStart | Phase::Adjudication | Phase::SessionEnd => {
                Err(DomainError::PhaseStateCorruption {
                    phase,
                    gate: GateKind::Unconditional,
                }
                .into())
            }
        }
    }

    fn context_for(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
        working: &TurnWorkingSet,
        agent: &AgentProfile,
        task: ProducerTask,
    ) -> Result<ProducerContext, RunTurnError> {
        let strategic = agent.layer == AgentLayer::Strategic;
        let directive = state
            .participant_of(&agent.id)
            .filter(|_| !strategic)
            .and_then(|p| working.intents.get(&p.strategic.id))
            .filter(|intent| !intent.degraded)
            .map(|intent| intent.intent_text.clone());

        Ok(ProducerContext {
            session: state.session,
            turn: state.turn,
            phase: state.phase,
            task,
            agent: agent.clone(),
            narration: working.narration.clone(),
            facts: working.facts.get(&agent.id).cloned().unwrap_or_default(),
            visible_messages: router.read_visible(&agent.id)?,
            round: None,
            // Discussion outcomes are out-of-character knowledge
            consensus: working.consensus.clone().filter(|_| strategic),
            directive,
            attempt: None,
            correction_hints: working.hints.get(&agent.id).cloned().unwrap_or_default(),
            ruling: working.ruling.as_ref().map(|r| r.data.clone()),
        })
    }

    // ==================== Phases ====================

    fn narration(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
    ) -> Result<PhaseExit, RunTurnError> {
        let working = state.working.clone();
        let text = working.narration.clone().unwrap_or_default();
        let mut exit = PhaseExit::new(GateResult::Unconditional, working);

        stage(
            router,
            &mut exit.messages,
            Message::in_character(
                AgentId::narrator(),
                MessageKind::Narration,
                &text,
                state.stamp(),
            ),
        )?;
        exit.memory.push(MemoryPayload::Narration { text });
        Ok(exit)
    }

    async fn memory_retrieval(&self, state: &SessionState, agents: &[AgentProfile]) -> PhaseExit {
        let mut working = state.working.clone();
        let query = working.narration.clone().unwrap_or_default();

        let lookups = agents.iter().map(|agent| {
            let query = &query;
            async move { (agent.id.clone(), self.retrieve_facts(agent, query).await) }
        });

        for (agent, result) in join_all(lookups).await {
            match result {
                Ok(facts) => {
                    debug!("Retrieved {} facts for {}", facts.len(), agent);
                    working.facts.insert(agent, facts);
                }
                Err(e) => {
                    warn!("Memory retrieval failed for {}: {}", agent, e);
                    working.warnings.push(
                        TurnWarning::new(
                            TurnWarningKind::MemoryUnavailable,
                            state.phase,
                            format!("no facts retrieved: {}", e),
                        )
                        .for_agent(agent.clone()),
                    );
                    working.facts.insert(agent, Vec::new());
                }
            }
        }

        PhaseExit::new(GateResult::Unconditional, working)
    }

    /// One discussion round followed by consensus detection.
    async fn discussion(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
        agents: Vec<AgentProfile>,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<PhaseExit, RunTurnError> {
        let mut working = state.working.clone();
        if agents.is_empty() {
            return Ok(PhaseExit::new(GateResult::Skipped, working));
        }

        let round = working.discussion_rounds + 1;
        let started = Instant::now();

        let mut requests = Vec::with_capacity(agents.len());
        for agent in &agents {
            let mut context =
                self.context_for(state, router, &working, agent, ProducerTask::Discussion)?;
            context.round = Some(round);
            requests.push(context);
        }
        let results = self.invoke_agents(state.phase, requests, progress).await;

        let stamp = state.stamp();
        let mut messages = Vec::new();
        for (agent, result) in results {
            match result {
                Ok(action) => {
                    let mut position = match action.metadata.stance {
                        Some(stance) => Position::new(stance, action.intent_text.clone()),
                        None => parse_stance(&action.intent_text),
                    };
                    if let Some(confidence) = action.metadata.confidence {
                        position = position.with_confidence(confidence);
                    }

                    let discussion = Message::out_of_character(
                        agent.clone(),
                        MessageKind::Discussion,
                        &action.intent_text,
                        stamp,
                    )
                    .with_round(round);
                    stage(router, &mut messages, discussion)?;

                    if position.stance != Stance::Silent {
                        let stance = Message::out_of_character(
                            agent.clone(),
                            MessageKind::Stance {
                                stance: position.stance,
                                confidence: position.confidence,
                            },
                            position.rationale,
                            stamp,
                        )
                        .with_round(round);
                        stage(router, &mut messages, stance)?;
                    }
                }
                Err(e) => {
                    warn!("{} degraded in discussion round {}: {}", agent, round, e);
                    working.warnings.push(degraded_warning(state.phase, &agent, &e));
                    let placeholder = AgentContribution::placeholder(
                        agent.clone(),
                        AgentLayer::Strategic,
                        state.phase,
                    );
                    let message = Message::out_of_character(
                        agent,
                        MessageKind::Discussion,
                        placeholder.intent_text,
                        stamp,
                    )
                    .with_round(round)
                    .marked_degraded();
                    stage(router, &mut messages, message)?;
                }
            }
        }

        working.discussion_rounds = round;
        working.discussion_elapsed_secs += started.elapsed().as_secs_f64();

        let expected: Vec<AgentId> = agents.iter().map(|a| a.id.clone()).collect();
        let positions = positions_from_messages(&expected, &messages, round);
        let result = ConsensusDetector::evaluate(
            &positions,
            round,
            Duration::from_secs_f64(working.discussion_elapsed_secs),
            &self.config.discussion,
        );

        info!(
            "Discussion round {}: {} {}",
            round,
            result.classification,
            result.stance_summary()
        );
        if result.classification == ConsensusClassification::Timeout {
            let dissent = result
                .dissenting
                .iter()
                .map(AgentId::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            warn!("Discussion budget spent without agreement; dissent: {}", dissent);
            let mut detail = format!(
                "proceeding without agreement after {} rounds; dissenting: {}",
                round, dissent
            );
            let feedback = result.dissent_feedback();
            if !feedback.is_empty() {
                detail.push('\n');
                detail.push_str(&feedback);
            }
            working.warnings.push(TurnWarning::new(
                TurnWarningKind::ConsensusTimeout,
                state.phase,
                detail,
            ));
        }

        self.logger.log(ConversationEvent::new(
            "consensus",
            json!({
                "session": state.session,
                "turn": state.turn,
                "round": round,
                "result": result,
            }),
        ));

        let proceed = result.proceed;
        working.consensus = Some(result);

        let mut exit = PhaseExit::new(GateResult::Consensus { proceed }, working);
        exit.messages = messages;
        Ok(exit)
    }

    async fn strategic_intent(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
        agents: Vec<AgentProfile>,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<PhaseExit, RunTurnError> {
        let mut working = state.working.clone();
        let mut requests = Vec::with_capacity(agents.len());
        for agent in &agents {
            requests.push(self.context_for(state, router, &working, agent, ProducerTask::Intent)?);
        }
        let results = self.invoke_agents(state.phase, requests, progress).await;

        let mut messages = Vec::new();
        for (agent, result) in results {
            let contribution = self.contribution_from(
                &mut working,
                state.phase,
                agent,
                AgentLayer::Strategic,
                result,
            );
            let mut message = Message::out_of_character(
                contribution.agent.clone(),
                MessageKind::Intent,
                &contribution.intent_text,
                state.stamp(),
            );
            if contribution.degraded {
                message = message.marked_degraded();
            }
            stage(router, &mut messages, message)?;
            working.intents.insert(contribution.agent.clone(), contribution);
        }

        let mut exit = PhaseExit::new(GateResult::Unconditional, working);
        exit.messages = messages;
        Ok(exit)
    }

    /// Forward each usable intent to the participant's character.
    fn directive(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
    ) -> Result<PhaseExit, RunTurnError> {
        let working = state.working.clone();
        let mut messages = Vec::new();

        for participant in &state.participants {
            if let Some(intent) = working.intents.get(&participant.strategic.id)
                && !intent.degraded
            {
                let directive = Message::directive(
                    participant.strategic.id.clone(),
                    participant.character.id.clone(),
                    &intent.intent_text,
                    state.stamp(),
                );
                stage(router, &mut messages, directive)?;
            }
        }

        let mut exit = PhaseExit::new(GateResult::Unconditional, working);
        exit.messages = messages;
        Ok(exit)
    }

    async fn action(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
        agents: Vec<AgentProfile>,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<PhaseExit, RunTurnError> {
        let mut working = state.working.clone();
        let mut requests = Vec::with_capacity(agents.len());
        for agent in &agents {
            let mut context =
                self.context_for(state, router, &working, agent, ProducerTask::Action)?;
            context.attempt = Some(next_attempt(&working, &agent.id));
            requests.push(context);
        }
        let results = self.invoke_agents(state.phase, requests, progress).await;

        for (agent, result) in results {
            let contribution = self.contribution_from(
                &mut working,
                state.phase,
                agent,
                AgentLayer::RolePlay,
                result,
            );
            if contribution.degraded {
                settle_abandoned_retry(state.phase, &mut working, &contribution.agent);
            }
            working.actions.insert(contribution.agent.clone(), contribution);
        }

        // Actions are published once validation settles
        Ok(PhaseExit::new(GateResult::Unconditional, working))
    }

    async fn validation(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
    ) -> Result<PhaseExit, RunTurnError> {
        let mut working = state.working.clone();
        if working.actions.is_empty() {
            return Ok(PhaseExit::new(GateResult::Skipped, working));
        }

        let pending = working.awaiting_action();
        let mut checks = Vec::with_capacity(pending.len());
        for agent in &pending {
            let Some(profile) = router.profile(agent) else {
                return Err(DomainError::UnknownAgent(agent.clone()).into());
            };
            let attempt = next_attempt(&working, agent);
            let text = working.actions[agent].intent_text.clone();
            let mut context =
                self.context_for(state, router, &working, &profile, ProducerTask::Action)?;
            context.attempt = Some(attempt);
            checks.push((agent.clone(), profile, attempt, text, context));
        }

        let checks = checks
            .into_iter()
            .map(|(agent, profile, attempt, text, context)| async move {
                let evaluator = if attempt > 1 && self.config.semantic_check {
                    self.evaluator_for(&profile).await
                } else {
                    None
                };
                let evaluator_ref = evaluator.as_deref().map(|producer| Evaluator {
                    producer,
                    context: &context,
                });
                let outcome = self.pipeline.validate(&text, attempt, evaluator_ref).await;
                (agent, outcome)
            });
        let outcomes = join_all(checks).await;

        for (agent, outcome) in outcomes {
            self.record_validation(state, &mut working, &agent, &outcome);
            working.validations.insert(agent, outcome);
        }

        let retry = !working.awaiting_action().is_empty();
        let mut messages = Vec::new();
        if !retry {
            for contribution in working.actions.values() {
                let text = settled_text(&working, contribution);
                let mut action = Message::in_character(
                    contribution.agent.clone(),
                    MessageKind::Action,
                    text,
                    state.stamp(),
                );
                if contribution.degraded {
                    action = action.marked_degraded();
                }
                stage(router, &mut messages, action)?;

                if let Some(dialogue) = &contribution.dialogue_text {
                    let speech = Message::in_character(
                        contribution.agent.clone(),
                        MessageKind::Dialogue,
                        dialogue,
                        state.stamp(),
                    );
                    stage(router, &mut messages, speech)?;
                }
            }
        }

        let mut exit = PhaseExit::new(GateResult::Validation { retry }, working);
        exit.messages = messages;
        Ok(exit)
    }

    fn record_validation(
        &self,
        state: &SessionState,
        working: &mut TurnWorkingSet,
        agent: &AgentId,
        outcome: &ValidationOutcome,
    ) {
        if outcome.auto_fixed
            && let Some(action) = working.actions.get_mut(agent)
        {
            action.intent_text = outcome.action_text.clone();
        }
        if outcome.requires_retry()
            && let Some(hint) = &outcome.suggestion
        {
            working.hints.entry(agent.clone()).or_default().push(hint.clone());
        }
        if outcome.warning_flag {
            warn!(
                "{}: validation exhausted after {} attempts, passing through for review",
                agent, outcome.attempt
            );
            working.warnings.push(
                TurnWarning::new(
                    TurnWarningKind::ValidationExhausted,
                    state.phase,
                    format!(
                        "action still reads as an outcome after {} attempts: {}",
                        outcome.attempt, outcome.action_text
                    ),
                )
                .for_agent(agent.clone()),
            );
        }

        debug!(
            "{} attempt {}: {}",
            agent,
            outcome.attempt,
            if outcome.valid { "valid" } else { "rejected" }
        );
        self.logger.log(ConversationEvent::new(
            "validation",
            json!({
                "session": state.session,
                "turn": state.turn,
                "agent": agent,
                "outcome": outcome,
            }),
        ));
    }

    fn resolution(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
    ) -> Result<PhaseExit, RunTurnError> {
        let working = state.working.clone();
        let ruling = working
            .ruling
            .as_ref()
            .ok_or(DomainError::PhaseStateCorruption {
                phase: state.phase,
                gate: GateKind::HumanInput,
            })?;

        let content = match ruling.kind {
            AdjudicationKind::DiceResult => format!("Dice result: {}", ruling.data),
            AdjudicationKind::Ruling | AdjudicationKind::EndSession => ruling.data.clone(),
        };
        let mut messages = Vec::new();
        stage(
            router,
            &mut messages,
            Message::in_character(AgentId::narrator(), MessageKind::Ruling, content, state.stamp()),
        )?;

        let mut exit = PhaseExit::new(GateResult::Unconditional, working);
        exit.messages = messages;
        Ok(exit)
    }

    /// Narrator summary of what was attempted and how it was ruled.
    fn outcome(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
    ) -> Result<PhaseExit, RunTurnError> {
        let working = state.working.clone();
        let mut lines = Vec::new();
        if let Some(ruling) = &working.ruling {
            lines.push(format!("Ruling: {}", ruling.data));
        }
        for contribution in working.actions.values() {
            let flagged = working
                .validations
                .get(&contribution.agent)
                .is_some_and(|o| o.warning_flag);
            lines.push(format!(
                "{}: {}{}",
                contribution.agent,
                settled_text(&working, contribution),
                if flagged { " [needs review]" } else { "" }
            ));
        }

        let mut messages = Vec::new();
        stage(
            router,
            &mut messages,
            Message::in_character(
                AgentId::narrator(),
                MessageKind::Outcome,
                lines.join("\n"),
                state.stamp(),
            ),
        )?;

        let mut exit = PhaseExit::new(GateResult::Unconditional, working);
        exit.messages = messages;
        Ok(exit)
    }

    async fn reaction(
        &self,
        state: &SessionState,
        router: &ChannelRouter,
        agents: Vec<AgentProfile>,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<PhaseExit, RunTurnError> {
        let mut working = state.working.clone();
        let mut requests = Vec::with_capacity(agents.len());
        for agent in &agents {
            requests.push(self.context_for(
                state,
                router,
                &working,
                agent,
                ProducerTask::Reaction,
            )?);
        }
        let results = self.invoke_agents(state.phase, requests, progress).await;

        let mut messages = Vec::new();
        for (agent, result) in results {
            let contribution = self.contribution_from(
                &mut working,
                state.phase,
                agent,
                AgentLayer::RolePlay,
                result,
            );

            let mut reaction = Message::in_character(
                contribution.agent.clone(),
                MessageKind::Reaction,
                &contribution.intent_text,
                state.stamp(),
            );
            if contribution.degraded {
                reaction = reaction.marked_degraded();
            }
            stage(router, &mut messages, reaction)?;

            if let Some(dialogue) = &contribution.dialogue_text {
                let speech = Message::in_character(
                    contribution.agent.clone(),
                    MessageKind::Dialogue,
                    dialogue,
                    state.stamp(),
                );
                stage(router, &mut messages, speech)?;
            }
            working.reactions.insert(contribution.agent.clone(), contribution);
        }

        let mut exit = PhaseExit::new(GateResult::Unconditional, working);
        exit.messages = messages;
        Ok(exit)
    }

    fn consolidation(&self, state: &SessionState) -> PhaseExit {
        let working = state.working.clone();
        let end_session = working
            .ruling
            .as_ref()
            .is_some_and(|ruling| ruling.ends_session());

        let turn_messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.stamp.turn == state.turn)
            .cloned()
            .collect();

        let mut exit = PhaseExit::new(GateResult::Continuation { end_session }, working);
        exit.memory.push(MemoryPayload::TurnLog {
            messages: turn_messages,
        });
        if end_session {
            info!("Session {} ends after turn {}", state.session, state.turn);
            exit.memory.push(MemoryPayload::SessionArchive {
                messages: state.messages.clone(),
            });
        }
        exit
    }

    // ==================== Helpers ====================

    /// Turn an invocation result into a contribution, degrading failures.
    fn contribution_from(
        &self,
        working: &mut TurnWorkingSet,
        phase: Phase,
        agent: AgentId,
        layer: AgentLayer,
        result: Invocation,
    ) -> AgentContribution {
        match result {
            Ok(action) => AgentContribution::new(
                agent,
                layer,
                phase,
                action.intent_text,
                action.dialogue_text,
            ),
            Err(e) => {
                warn!("{} degraded in {}: {}", agent, phase, e);
                working.warnings.push(degraded_warning(phase, &agent, &e));
                AgentContribution::placeholder(agent, layer, phase)
            }
        }
    }
}
