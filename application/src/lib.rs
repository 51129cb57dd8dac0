//! Application layer for quorum-table
//!
//! This crate contains the turn orchestration use case, port definitions
//! and engine configuration. It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::EngineConfig;
pub use ports::{
    action_producer::{
        ActionMetadata, ActionProducer, AgentGateway, CollaboratorError, EvaluationVerdict,
        ProducedAction, ProducerContext, ProducerTask,
    },
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    memory_store::{MemoryPayload, MemoryStore},
    progress::{NoProgress, TurnProgressNotifier},
    session_repository::{SessionRepository, SessionStoreError},
};
pub use use_cases::run_turn::{RunTurnError, RunTurnUseCase, TurnCycleInput};
pub use use_cases::validate_action::{Evaluator, ValidationPipeline};
