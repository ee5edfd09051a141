pub mod claude_cli;
pub mod error;
pub mod interpreter;
pub mod model;
pub mod orchestrator;
pub mod prompts;
pub mod stage;
pub mod stages;
pub mod validator;

pub mod test_support;

pub use error::AgentError;
pub use interpreter::{ExtractionStrategy, Interpreter};
pub use model::{build_model, ChatCompletionsModel, LanguageModel};
pub use orchestrator::Orchestrator;
pub use stage::Stage;
pub use validator::{validate_decision, validate_value, ValidationError};
