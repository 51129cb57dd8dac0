//! Validation Pipeline
//!
//! Runs the three validation stages over one action attempt and returns
//! the terminal [`ValidationOutcome`] for that attempt. Lexical and
//! structural rules live in the domain; this service adds the optional
//! auto-fix and the semantic stage, which calls out to a producer in its
//! evaluation role.

use crate::config::EngineConfig;
use crate::ports::action_producer::{ActionProducer, ProducerContext};
use std::time::Duration;
use table_domain::validation::{
    RuleViolation, auto_fix, check_lexical, check_structure, correction_hint,
};
use table_domain::{MAX_VALIDATION_ATTEMPTS, ValidationOutcome, ViolationKind};
use tracing::{debug, warn};

/// The collaborator asked for a semantic verdict, with the context it
/// should judge in
pub struct Evaluator<'a> {
    pub producer: &'a dyn ActionProducer,
    pub context: &'a ProducerContext,
}

/// Stateless validation service
#[derive(Debug, Clone)]
pub struct ValidationPipeline {
    max_attempts: u8,
    auto_fix: bool,
    semantic_check: bool,
    evaluation_timeout: Duration,
}

impl ValidationPipeline {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_attempts: config.max_validation_attempts,
            auto_fix: config.auto_fix,
            semantic_check: config.semantic_check,
            evaluation_timeout: config.agent_timeout,
        }
    }

    /// Validate `action_text` as attempt number `attempt` (1-based).
    ///
    /// The semantic stage runs only when stages 1-2 pass, `attempt > 1`
    /// and an evaluator is supplied. An evaluator that fails or times out
    /// does not block the action.
    pub async fn validate(
        &self,
        action_text: &str,
        attempt: u8,
        evaluator: Option<Evaluator<'_>>,
    ) -> ValidationOutcome {
        if let Err(violation) = check_lexical(action_text) {
            if self.auto_fix
                && let Some(fixed) = auto_fix(action_text)
            {
                debug!("Auto-fixed '{}' on attempt {}", violation.pattern, attempt);
                return ValidationOutcome::fixed(fixed, attempt, violation.pattern);
            }
            return self.reject(action_text, attempt, violation);
        }

        if let Err(violation) = check_structure(action_text) {
            return self.reject(action_text, attempt, violation);
        }

        if attempt > 1
            && self.semantic_check
            && let Some(evaluator) = evaluator
        {
            let verdict = tokio::time::timeout(
                self.evaluation_timeout,
                evaluator
                    .producer
                    .evaluate_attempt(action_text, evaluator.context),
            )
            .await;

            match verdict {
                Ok(Ok(verdict)) if !verdict.attempt_only => {
                    let pattern = (!verdict.reason.is_empty()).then_some(verdict.reason);
                    return self.fail(
                        action_text,
                        attempt,
                        ViolationKind::SemanticOutcome,
                        pattern,
                    );
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!("Semantic check skipped for {}: {}", evaluator.context.agent.id, e);
                }
                Err(_) => {
                    warn!("Semantic check timed out for {}", evaluator.context.agent.id);
                }
            }
        }

        ValidationOutcome::passed(action_text, attempt)
    }

    fn reject(
        &self,
        action_text: &str,
        attempt: u8,
        violation: RuleViolation,
    ) -> ValidationOutcome {
        debug!(
            "Rule '{}' rejected attempt {}: '{}'",
            violation.rule, attempt, violation.pattern
        );
        self.fail(action_text, attempt, violation.kind, Some(violation.pattern))
    }

    fn fail(
        &self,
        action_text: &str,
        attempt: u8,
        kind: ViolationKind,
        pattern: Option<String>,
    ) -> ValidationOutcome {
        let hint = correction_hint(self.hint_level(attempt), kind, pattern.as_deref());
        let outcome = ValidationOutcome::failed(action_text, attempt, kind, pattern, hint);
        if attempt >= self.max_attempts {
            outcome.exhausted()
        } else {
            outcome
        }
    }

    /// Hint strictness, shifted so a lowered attempt cap still ends on
    /// the strict template.
    fn hint_level(&self, attempt: u8) -> u8 {
        attempt.saturating_add(MAX_VALIDATION_ATTEMPTS.saturating_sub(self.max_attempts))
    }
}
