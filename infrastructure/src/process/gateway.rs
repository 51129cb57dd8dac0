//! Gateway mapping agent ids to command lines

use super::producer::ProcessProducer;
use crate::config::FileParticipantConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use table_application::ports::action_producer::{ActionProducer, AgentGateway, CollaboratorError};
use table_domain::{AgentId, AgentProfile};
use tracing::info;

/// Agent gateway that runs every agent as an external command
#[derive(Debug, Default, Clone)]
pub struct ProcessAgentGateway {
    commands: HashMap<AgentId, Vec<String>>,
}

impl ProcessAgentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the command that runs `agent`
    pub fn with_agent(mut self, agent: impl Into<AgentId>, command: Vec<String>) -> Self {
        self.commands.insert(agent.into(), command);
        self
    }

    /// Build from `[[participants]]`: each seat contributes its strategic and
    /// character command. Seats without a command are left unregistered.
    pub fn from_participants(participants: &[FileParticipantConfig]) -> Self {
        let mut gateway = Self::new();
        for seat in participants {
            let participant = seat.to_participant();
            if let Some(command) = seat.strategic_command() {
                gateway = gateway.with_agent(participant.strategic.id.clone(), command.to_vec());
            }
            if let Some(command) = seat.character_command() {
                gateway = gateway.with_agent(participant.character.id.clone(), command.to_vec());
            }
        }
        info!("Process gateway: {} agents registered", gateway.commands.len());
        gateway
    }

    pub fn command_for(&self, agent: &AgentId) -> Option<&[String]> {
        self.commands.get(agent).map(Vec::as_slice)
    }
}

#[async_trait]
impl AgentGateway for ProcessAgentGateway {
    async fn connect(
        &self,
        agent: &AgentProfile,
    ) -> Result<Arc<dyn ActionProducer>, CollaboratorError> {
        let command = self
            .commands
            .get(&agent.id)
            .ok_or_else(|| CollaboratorError::Unavailable(format!("no command for {}", agent.id)))?;
        Ok(Arc::new(ProcessProducer::new(agent.clone(), command.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(name: &str, command: &[&str]) -> FileParticipantConfig {
        FileParticipantConfig {
            name: name.to_string(),
            command: Some(command.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_participants_registers_both_layers() {
        let mut bob = seat("bob", &["planner"]);
        bob.character_command = Some(vec![
            "actor".to_string(),
            "--name".to_string(),
            "Lyra".to_string(),
        ]);
        let gateway = ProcessAgentGateway::from_participants(&[seat("alice", &["agent"]), bob]);

        let agent = ["agent".to_string()];
        assert_eq!(gateway.command_for(&AgentId::new("alice.player")), Some(&agent[..]));
        assert_eq!(gateway.command_for(&AgentId::new("alice.character")), Some(&agent[..]));
        assert_eq!(
            gateway
                .command_for(&AgentId::new("bob.character"))
                .map(<[String]>::len),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_unknown_agent_is_unavailable() {
        let gateway =
            ProcessAgentGateway::new().with_agent("alice.player", vec!["agent".to_string()]);

        let result = gateway
            .connect(&AgentProfile::strategic("mallory.player", "mallory"))
            .await;
        assert!(matches!(result, Err(CollaboratorError::Unavailable(_))));

        let producer = gateway
            .connect(&AgentProfile::strategic("alice.player", "alice"))
            .await
            .unwrap();
        assert_eq!(producer.agent().id.as_str(), "alice.player");
    }
}
