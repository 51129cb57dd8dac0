//! Publish eligibility and read visibility per agent layer.

use super::entities::{Channel, Message};
use crate::agent::{AgentId, AgentLayer, AgentProfile};
use crate::core::error::DomainError;

/// How much of a message a reader gets to see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Full,
    Summary,
    Hidden,
}

/// Check that `sender` may publish `message` on its declared channel.
///
/// `layer_of` resolves recipients to their layer; unknown recipients are
/// rejected.
pub fn check_publish(
    sender: &AgentProfile,
    message: &Message,
    layer_of: impl Fn(&AgentId) -> Option<AgentLayer>,
) -> Result<(), DomainError> {
    let reject = |reason: &str| DomainError::InvalidChannel {
        sender: sender.id.clone(),
        channel: message.channel,
        reason: reason.to_string(),
    };

    for recipient in &message.recipients {
        if layer_of(recipient).is_none() {
            return Err(DomainError::UnknownAgent(recipient.clone()));
        }
    }

    match (message.channel, sender.layer) {
        (Channel::InCharacter, AgentLayer::RolePlay | AgentLayer::Narrator) => Ok(()),
        (Channel::InCharacter, AgentLayer::Strategic) => {
            Err(reject("strategic agents cannot speak in character"))
        }
        (Channel::OutOfCharacter, AgentLayer::Strategic) => Ok(()),
        (Channel::OutOfCharacter, _) => Err(reject(
            "only strategic agents take part in out-of-character discussion",
        )),
        (Channel::Directive, AgentLayer::Strategic) => match message.recipients.as_slice() {
            [recipient] if layer_of(recipient) == Some(AgentLayer::RolePlay) => Ok(()),
            [_] => Err(reject("directives must be addressed to a role-play agent")),
            _ => Err(reject("directives need exactly one recipient")),
        },
        (Channel::Directive, _) => Err(reject("only strategic agents issue directives")),
    }
}

/// What `reader` sees of `message`.
pub fn visibility(reader: &AgentProfile, message: &Message) -> Visibility {
    if reader.layer == AgentLayer::Narrator {
        return Visibility::Full;
    }

    let addressed = message.is_broadcast() || message.involves(&reader.id);

    match (message.channel, reader.layer) {
        (Channel::InCharacter, AgentLayer::RolePlay) if addressed => Visibility::Full,
        (Channel::InCharacter, AgentLayer::Strategic) if addressed => Visibility::Summary,
        (Channel::OutOfCharacter, AgentLayer::Strategic) if addressed => Visibility::Full,
        (Channel::Directive, AgentLayer::Strategic) if message.sender == reader.id => {
            Visibility::Full
        }
        (Channel::Directive, AgentLayer::RolePlay) if message.recipients.contains(&reader.id) => {
            Visibility::Full
        }
        _ => Visibility::Hidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::entities::{MessageKind, PhaseStamp};
    use crate::turn::phase::Phase;

    fn stamp() -> PhaseStamp {
        PhaseStamp::new(1, 1, Phase::Action)
    }

    fn player(id: &str) -> AgentProfile {
        AgentProfile::strategic(id, id)
    }

    fn character(id: &str) -> AgentProfile {
        AgentProfile::role_play(id, id)
    }

    fn layers(id: &AgentId) -> Option<AgentLayer> {
        match id.as_str() {
            "p1" | "p2" => Some(AgentLayer::Strategic),
            "c1" | "c2" => Some(AgentLayer::RolePlay),
            "dm" => Some(AgentLayer::Narrator),
            _ => None,
        }
    }

    #[test]
    fn test_publish_matrix() {
        let ic = Message::in_character("c1", MessageKind::Action, "I try", stamp());
        let ooc = Message::out_of_character("p1", MessageKind::Discussion, "plan", stamp());
        let directive = Message::directive("p1", "c1", "go", stamp());

        assert!(check_publish(&character("c1"), &ic, layers).is_ok());
        assert!(check_publish(&AgentProfile::narrator(), &ic, layers).is_ok());
        assert!(check_publish(&player("p1"), &ic, layers).is_err());

        assert!(check_publish(&player("p1"), &ooc, layers).is_ok());
        assert!(check_publish(&character("c1"), &ooc, layers).is_err());
        assert!(check_publish(&AgentProfile::narrator(), &ooc, layers).is_err());

        assert!(check_publish(&player("p1"), &directive, layers).is_ok());
        assert!(check_publish(&character("c1"), &directive, layers).is_err());
    }

    #[test]
    fn test_directive_recipient_rules() {
        let to_player = Message::directive("p1", "p2", "go", stamp());
        assert!(check_publish(&player("p1"), &to_player, layers).is_err());

        let broadcast = Message::new(
            Channel::Directive,
            "p1",
            MessageKind::Directive,
            "everyone go",
            stamp(),
        );
        assert!(check_publish(&player("p1"), &broadcast, layers).is_err());

        let to_stranger = Message::directive("p1", "ghost", "go", stamp());
        assert_eq!(
            check_publish(&player("p1"), &to_stranger, layers),
            Err(DomainError::UnknownAgent(AgentId::new("ghost")))
        );
    }

    #[test]
    fn test_visibility_matrix() {
        let ic = Message::in_character("c1", MessageKind::Action, "I try", stamp());
        let ooc = Message::out_of_character("p1", MessageKind::Discussion, "plan", stamp());
        let directive = Message::directive("p1", "c1", "go", stamp());

        assert_eq!(visibility(&player("p2"), &ic), Visibility::Summary);
        assert_eq!(visibility(&character("c2"), &ic), Visibility::Full);

        assert_eq!(visibility(&player("p2"), &ooc), Visibility::Full);
        assert_eq!(visibility(&character("c1"), &ooc), Visibility::Hidden);

        assert_eq!(visibility(&player("p1"), &directive), Visibility::Full);
        assert_eq!(visibility(&player("p2"), &directive), Visibility::Hidden);
        assert_eq!(visibility(&character("c1"), &directive), Visibility::Full);
        assert_eq!(visibility(&character("c2"), &directive), Visibility::Hidden);

        for m in [&ic, &ooc, &directive] {
            assert_eq!(visibility(&AgentProfile::narrator(), m), Visibility::Full);
        }
    }

    #[test]
    fn test_addressed_ic_message_hidden_from_others() {
        let whisper = Message::in_character("c1", MessageKind::Dialogue, "psst", stamp())
            .with_recipient("c2");
        assert_eq!(visibility(&character("c2"), &whisper), Visibility::Full);
        assert_eq!(visibility(&character("c1"), &whisper), Visibility::Full);
        assert_eq!(visibility(&player("p1"), &whisper), Visibility::Hidden);
    }
}
