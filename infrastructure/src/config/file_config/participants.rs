//! Participant configuration from TOML (`[[participants]]` tables)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use table_domain::{ConfigIssue, ConfigIssueCode, Participant};

/// One seat at the table.
///
/// Each participant runs two agents. Both may share one `command`, or
/// the strategic and character agents may each get their own.
///
/// # Example
///
/// ```toml
/// [[participants]]
/// name = "alice"
/// character = "Thorin"
/// strategic_command = ["python3", "agents/player.py"]
/// character_command = ["python3", "agents/character.py", "--name", "Thorin"]
/// facts = ["Thorin owes the ferryman three silver"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileParticipantConfig {
    pub name: String,
    /// Character name, defaults to `name`
    pub character: Option<String>,
    /// Command shared by both agents unless overridden
    pub command: Option<Vec<String>>,
    pub strategic_command: Option<Vec<String>>,
    pub character_command: Option<Vec<String>>,
    /// Standing knowledge the character agent can recall
    pub facts: Vec<String>,
}

impl FileParticipantConfig {
    pub fn to_participant(&self) -> Participant {
        let character = self.character.as_deref().unwrap_or(&self.name);
        Participant::new(self.name.trim(), character)
    }

    pub fn strategic_command(&self) -> Option<&[String]> {
        non_empty(self.strategic_command.as_deref()).or(non_empty(self.command.as_deref()))
    }

    pub fn character_command(&self) -> Option<&[String]> {
        non_empty(self.character_command.as_deref()).or(non_empty(self.command.as_deref()))
    }
}

fn non_empty(command: Option<&[String]>) -> Option<&[String]> {
    command.filter(|c| c.first().is_some_and(|program| !program.trim().is_empty()))
}

pub(super) fn validate_participants(participants: &[FileParticipantConfig]) -> Vec<ConfigIssue> {
    let mut issues = Vec::new();
    if participants.is_empty() {
        issues.push(ConfigIssue::warning(
            ConfigIssueCode::NoParticipants,
            "participants",
            "no participants configured; agent phases will be skipped",
        ));
    }

    let mut seen = HashSet::new();
    for (i, participant) in participants.iter().enumerate() {
        let key = format!("participants[{}]", i);
        let name = participant.name.trim();
        if name.is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::UnknownValue,
                format!("{}.name", key),
                "participant name must not be empty",
            ));
            continue;
        }
        if !seen.insert(name.to_string()) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::DuplicateParticipant,
                format!("{}.name", key),
                format!("'{}' is already seated; agent ids would collide", name),
            ));
        }
        if participant.strategic_command().is_none() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingCommand,
                format!("{}.strategic_command", key),
                format!("no command runs {}'s strategic agent", name),
            ));
        }
        if participant.character_command().is_none() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingCommand,
                format!("{}.character_command", key),
                format!("no command runs {}'s character agent", name),
            ));
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(name: &str, command: Option<&[&str]>) -> FileParticipantConfig {
        FileParticipantConfig {
            name: name.to_string(),
            command: command.map(|c| c.iter().map(|s| s.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_shared_command_covers_both_agents() {
        let p = seat("alice", Some(&["agent", "--seat", "alice"]));
        assert_eq!(p.strategic_command().unwrap()[0], "agent");
        assert_eq!(p.character_command().unwrap().len(), 3);
    }

    #[test]
    fn test_specific_command_overrides_shared() {
        let mut p = seat("alice", Some(&["agent"]));
        p.character_command = Some(vec!["actor".to_string()]);
        assert_eq!(p.character_command().unwrap(), &["actor".to_string()]);
        assert_eq!(p.strategic_command().unwrap(), &["agent".to_string()]);
    }

    #[test]
    fn test_facts_parse_from_toml() {
        let p: FileParticipantConfig = toml::from_str(
            r#"
            name = "alice"
            command = ["agent"]
            facts = ["Thorin owes the ferryman", "Thorin hates water"]
            "#,
        )
        .unwrap();
        assert_eq!(p.facts.len(), 2);
        assert!(seat("bob", None).facts.is_empty());
    }

    #[test]
    fn test_character_defaults_to_name() {
        let participant = seat("alice", None).to_participant();
        assert_eq!(participant.character.display_name, "alice");
        assert_eq!(participant.strategic.id.as_str(), "alice.player");
    }

    #[test]
    fn test_validation_issues() {
        let issues = validate_participants(&[
            seat("alice", Some(&["agent"])),
            seat("alice", Some(&["agent"])),
            seat("bob", Some(&[" "])),
        ]);
        let codes: Vec<ConfigIssueCode> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                ConfigIssueCode::DuplicateParticipant,
                ConfigIssueCode::MissingCommand,
                ConfigIssueCode::MissingCommand,
            ]
        );
        assert!(issues.iter().all(ConfigIssue::is_error));
    }

    #[test]
    fn test_empty_table_is_only_a_warning() {
        let issues = validate_participants(&[]);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::NoParticipants);
        assert!(!issues[0].is_error());
    }
}
