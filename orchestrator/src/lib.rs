// orchestrator/src/lib.rs

pub mod error;
pub mod experts;
pub mod graph;
pub mod llm;
pub mod locks;
pub mod prompts;
pub mod stats;
pub mod turn_executor;

pub use crate::error::TurnError;
pub use crate::graph::{GraphState, Orchestrator, OrchestratorBuilder, TurnOutcome};
pub use crate::llm::OpenAiClient;
pub use crate::prompts::InstructionSets;
pub use crate::stats::StatsSnapshot;
pub use crate::turn_executor::ModelSettings;
