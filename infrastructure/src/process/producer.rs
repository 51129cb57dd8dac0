//! A single agent backed by a command line

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::process::Stdio;
use table_application::ports::action_producer::{
    ActionProducer, CollaboratorError, EvaluationVerdict, ProducedAction, ProducerContext,
};
use table_domain::AgentProfile;
use table_domain::core::string::truncate;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, trace};

/// Environment variable carrying the agent id to the child process
pub const AGENT_ENV: &str = "QUORUM_TABLE_AGENT";

/// How much stderr or stdout to quote in an error
const EXCERPT_LEN: usize = 200;

#[derive(Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
enum AgentRequest<'a> {
    Produce {
        context: &'a ProducerContext,
    },
    Evaluate {
        text: &'a str,
        context: &'a ProducerContext,
    },
}

/// Action producer that runs a command per call
pub struct ProcessProducer {
    agent: AgentProfile,
    command: Vec<String>,
}

impl ProcessProducer {
    pub fn new(agent: AgentProfile, command: Vec<String>) -> Self {
        Self { agent, command }
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: &AgentRequest<'_>,
    ) -> Result<T, CollaboratorError> {
        let stdout = self.run(request).await?;
        parse_answer(&stdout)
    }

    /// Spawn the command, feed it `request` and collect its stdout.
    async fn run(&self, request: &AgentRequest<'_>) -> Result<Vec<u8>, CollaboratorError> {
        let payload = serde_json::to_vec(request)
            .map_err(|e| CollaboratorError::Malformed(format!("request: {}", e)))?;
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| {
                CollaboratorError::Unavailable(format!("{}: empty command", self.agent.id))
            })?;

        debug!("Spawning {} for {}", program, self.agent.id);
        let mut child = Command::new(program)
            .args(args)
            .env(AGENT_ENV, self.agent.id.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CollaboratorError::Unavailable(format!("{}: {}", program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CollaboratorError::Failed("child stdin was not captured".to_string()))?;
        let write = async move {
            let result = stdin.write_all(&payload).await;
            // Closing stdin marks the end of the request
            drop(stdin);
            result
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(|e| CollaboratorError::Failed(format!("{}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CollaboratorError::Failed(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                truncate(stderr.trim(), EXCERPT_LEN)
            )));
        }
        // An agent may answer without reading its input
        if let Err(e) = written
            && e.kind() != std::io::ErrorKind::BrokenPipe
        {
            return Err(CollaboratorError::Failed(format!("{}: writing request: {}", program, e)));
        }

        trace!("{} answered {} bytes", self.agent.id, output.stdout.len());
        Ok(output.stdout)
    }
}

/// Parse the whole of stdout, else its last non-empty line.
fn parse_answer<T: DeserializeOwned>(stdout: &[u8]) -> Result<T, CollaboratorError> {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(CollaboratorError::Malformed("empty output".to_string()));
    }

    serde_json::from_str(trimmed).or_else(|whole| {
        trimmed
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .and_then(|last| serde_json::from_str(last).ok())
            .ok_or_else(|| {
                let excerpt = truncate(trimmed, EXCERPT_LEN);
                CollaboratorError::Malformed(format!("{} in {}", whole, excerpt))
            })
    })
}

#[async_trait]
impl ActionProducer for ProcessProducer {
    fn agent(&self) -> &AgentProfile {
        &self.agent
    }

    async fn produce(
        &self,
        context: &ProducerContext,
    ) -> Result<ProducedAction, CollaboratorError> {
        let action: ProducedAction = self.call(&AgentRequest::Produce { context }).await?;
        if action.intent_text.trim().is_empty() {
            return Err(CollaboratorError::Malformed("empty intent_text".to_string()));
        }
        Ok(action)
    }

    async fn evaluate_attempt(
        &self,
        text: &str,
        context: &ProducerContext,
    ) -> Result<EvaluationVerdict, CollaboratorError> {
        self.call(&AgentRequest::Evaluate { text, context }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_application::ports::action_producer::ProducerTask;
    use table_domain::Phase;

    fn context() -> ProducerContext {
        ProducerContext {
            session: 1,
            turn: 1,
            phase: Phase::Action,
            task: ProducerTask::Action,
            agent: AgentProfile::role_play("alice.character", "Thorin"),
            narration: Some("A troll blocks the bridge.".to_string()),
            facts: Vec::new(),
            visible_messages: Vec::new(),
            round: None,
            consensus: None,
            directive: Some("Distract the troll".to_string()),
            attempt: Some(1),
            correction_hints: Vec::new(),
            ruling: None,
        }
    }

    fn shell(script: &str) -> ProcessProducer {
        ProcessProducer::new(
            AgentProfile::role_play("alice.character", "Thorin"),
            vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        )
    }

    #[test]
    fn test_parse_answer_takes_last_line() {
        let stdout = b"thinking...\n{\"intent_text\": \"I attempt to jump\"}\n";
        let action: ProducedAction = parse_answer(stdout).unwrap();
        assert_eq!(action.intent_text, "I attempt to jump");
    }

    #[test]
    fn test_parse_answer_rejects_prose() {
        let err = parse_answer::<ProducedAction>(b"I attempt to jump").unwrap_err();
        assert!(matches!(err, CollaboratorError::Malformed(_)));
        assert!(matches!(
            parse_answer::<ProducedAction>(b"  \n").unwrap_err(),
            CollaboratorError::Malformed(_)
        ));
    }

    #[test]
    fn test_request_shape() {
        let ctx = context();
        let json = serde_json::to_value(AgentRequest::Evaluate {
            text: "I attempt to jump",
            context: &ctx,
        })
        .unwrap();
        assert_eq!(json["mode"], "evaluate");
        assert_eq!(json["text"], "I attempt to jump");
        assert_eq!(json["context"]["directive"], "Distract the troll");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_produce_reads_stdout() {
        let producer = shell(
            r#"cat > /dev/null; echo '{"intent_text": "I attempt to leap", "dialogue_text": "Hyah!"}'"#,
        );
        let action = producer.produce(&context()).await.unwrap();
        assert_eq!(action.intent_text, "I attempt to leap");
        assert_eq!(action.dialogue_text.as_deref(), Some("Hyah!"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_child_receives_request_and_agent_id() {
        let producer = shell(
            r#"if grep -q '"mode":"evaluate"'; then echo "{\"attempt_only\": false, \"reason\": \"$QUORUM_TABLE_AGENT\"}"; else echo '{"intent_text": "x"}'; fi"#,
        );
        let verdict = producer
            .evaluate_attempt("I attempt to jump", &context())
            .await
            .unwrap();
        assert!(!verdict.attempt_only);
        assert_eq!(verdict.reason, "alice.character");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_is_failed() {
        let producer = shell("echo boom >&2; exit 3");
        let err = producer.produce(&context()).await.unwrap_err();
        match err {
            CollaboratorError::Failed(message) => assert!(message.contains("boom")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_empty_intent_is_malformed() {
        let producer = shell(r#"echo '{"intent_text": "  "}'"#);
        assert!(matches!(
            producer.produce(&context()).await.unwrap_err(),
            CollaboratorError::Malformed(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let producer = ProcessProducer::new(
            AgentProfile::role_play("alice.character", "Thorin"),
            vec!["/definitely/not/a/real/agent".to_string()],
        );
        assert!(matches!(
            producer.produce(&context()).await.unwrap_err(),
            CollaboratorError::Unavailable(_)
        ));
    }
}
