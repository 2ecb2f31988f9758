pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod prompt;
pub mod session;

// Re-export main types for convenience
pub use client::GroqClient;
pub use config::Config;
pub use credentials::{Credential, CredentialResolver, CredentialSource, SecretStore};
pub use error::{CompletionError, CompletionResult};
pub use orchestrator::{Orchestrator, PendingTurn, Reply};
pub use prompt::{Choice, PromptRequest};
pub use session::{ChatMessage, ChatRole, Session};
