//! Collaborator calls with per-call timeouts and bounded retries.

use super::RunTurnUseCase;
use crate::ports::action_producer::{
    ActionProducer, AgentGateway, CollaboratorError, ProducedAction, ProducerContext,
};
use crate::ports::memory_store::MemoryPayload;
use crate::ports::progress::TurnProgressNotifier;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use table_domain::{AgentId, AgentProfile, Phase};
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub(super) type Invocation = Result<ProducedAction, CollaboratorError>;

/// Timeout and attempt budget for one collaborator call
#[derive(Debug, Clone, Copy)]
pub(super) struct CallPolicy {
    pub timeout: Duration,
    pub attempts: u32,
}

/// Run `call` until it succeeds or the policy is spent. Every attempt is
/// bounded by the policy's timeout; the last error is returned.
pub(super) async fn with_retry<T, F, Fut>(
    policy: CallPolicy,
    label: &str,
    mut call: F,
) -> Result<T, CollaboratorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let mut last_error = CollaboratorError::Timeout;
    for attempt in 1..=policy.attempts.max(1) {
        match tokio::time::timeout(policy.timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                debug!("{} failed (attempt {}/{}): {}", label, attempt, policy.attempts, e);
                last_error = e;
            }
            Err(_) => {
                debug!("{} timed out (attempt {}/{})", label, attempt, policy.attempts);
                last_error = CollaboratorError::Timeout;
            }
        }
    }
    Err(last_error)
}

impl<G: AgentGateway + 'static> RunTurnUseCase<G> {
    pub(super) fn call_policy(&self) -> CallPolicy {
        CallPolicy {
            timeout: self.config.agent_timeout,
            attempts: self.config.collaborator_attempts(),
        }
    }

    /// Invoke every agent's producer concurrently and wait for all of them.
    ///
    /// Each agent runs under its own timeout and retry budget, so one slow
    /// agent never holds back another's result. The map always holds one
    /// entry per requested agent.
    pub(super) async fn invoke_agents(
        &self,
        phase: Phase,
        requests: Vec<ProducerContext>,
        progress: &dyn TurnProgressNotifier,
    ) -> BTreeMap<AgentId, Invocation> {
        let expected: Vec<AgentId> = requests.iter().map(|c| c.agent.id.clone()).collect();
        let policy = self.call_policy();
        let mut join_set = JoinSet::new();

        for context in requests {
            let gateway = Arc::clone(&self.gateway);
            join_set.spawn(async move {
                let agent = context.agent.id.clone();
                debug!("Invoking {} for {}", agent, phase);
                let result = with_retry(policy, agent.as_str(), || {
                    let gateway = &gateway;
                    let context = &context;
                    async move {
                        let producer = gateway.connect(&context.agent).await?;
                        producer.produce(context).await
                    }
                })
                .await;
                (agent, result)
            });
        }

        let mut results = BTreeMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((agent, result)) => {
                    progress.on_agent_complete(phase, &agent, result.is_ok());
                    results.insert(agent, result);
                }
                Err(e) => {
                    warn!("Agent task join error: {}", e);
                }
            }
        }

        for agent in expected {
            results
                .entry(agent)
                .or_insert_with(|| Err(CollaboratorError::Failed("agent task aborted".into())));
        }
        results
    }

    /// Connect to `agent`'s producer for an evaluation call, if reachable.
    pub(super) async fn evaluator_for(
        &self,
        agent: &AgentProfile,
    ) -> Option<Arc<dyn ActionProducer>> {
        let policy = self.call_policy();
        match with_retry(policy, agent.id.as_str(), || self.gateway.connect(agent)).await {
            Ok(producer) => Some(producer),
            Err(e) => {
                warn!("No evaluator for {}: {}", agent.id, e);
                None
            }
        }
    }

    pub(super) async fn write_memory(
        &self,
        session: u64,
        turn: u64,
        payload: MemoryPayload,
    ) -> Result<(), CollaboratorError> {
        let label = format!("memory write ({})", payload.kind());
        with_retry(self.call_policy(), &label, || {
            self.memory.write_context(session, turn, payload.clone())
        })
        .await
    }

    pub(super) async fn retrieve_facts(
        &self,
        reader: &AgentProfile,
        query: &str,
    ) -> Result<Vec<String>, CollaboratorError> {
        let limit = self.config.retrieval_limit;
        with_retry(self.call_policy(), "memory retrieval", || {
            self.memory.retrieve_context(reader, query, limit)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> CallPolicy {
        CallPolicy {
            timeout: Duration::from_secs(1),
            attempts: 3,
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let calls = AtomicU32::new(0);
        let result = with_retry(policy(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(CollaboratorError::Unavailable("blip".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(policy(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(CollaboratorError::Failed("nope".into())) }
        })
        .await;
        assert_eq!(result, Err(CollaboratorError::Failed("nope".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_is_time_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(policy(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            }
        })
        .await;
        assert_eq!(result, Err(CollaboratorError::Timeout));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
