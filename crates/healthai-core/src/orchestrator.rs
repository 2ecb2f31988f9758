//! Glue for one user action: render the prompt, call the provider once,
//! record the coach turn, and hand back text to display.
//!
//! Only the newest user text goes to the model. Earlier coach turns are
//! kept in the [`Session`] for display but are not replayed.

use tracing::debug;

use crate::client::GroqClient;
use crate::credentials::{CredentialResolver, CredentialSource};
use crate::error::CompletionResult;
use crate::prompt::PromptRequest;
use crate::session::{ChatMessage, Session};

/// What the UI shows after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Answer(String),
    Error(String),
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Answer(text) | Reply::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

/// A prompt that is ready to send, with the client that will send it.
#[derive(Clone)]
pub struct PendingTurn {
    prompt: String,
    freeform: bool,
    client: GroqClient,
    credential_source: CredentialSource,
}

impl PendingTurn {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn credential_source(&self) -> CredentialSource {
        self.credential_source
    }

    /// The single provider call for this turn.
    pub async fn run(&self) -> CompletionResult {
        self.client.complete(&self.prompt).await
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    resolver: CredentialResolver,
    client: GroqClient,
}

impl Orchestrator {
    pub fn new(resolver: CredentialResolver, client: GroqClient) -> Self {
        Self { resolver, client }
    }

    pub fn client(&self) -> &GroqClient {
        &self.client
    }

    pub fn set_model(&mut self, model: &str) {
        self.client.set_model(model);
    }

    pub fn credential_source(&self, session: &Session) -> CredentialSource {
        self.resolver.source(session.api_key())
    }

    /// Record the user turn (coach only) and prepare the request.
    pub fn begin(&self, session: &mut Session, request: &PromptRequest) -> PendingTurn {
        let freeform = request.is_freeform();
        if let PromptRequest::Freeform(r) = request {
            session.append(ChatMessage::user(&r.text));
        }

        let prompt = request.render();
        let credential = self.resolver.resolve(session.api_key());
        debug!(
            freeform,
            source = credential.source.as_str(),
            history = session.len(),
            "prepared turn"
        );

        PendingTurn {
            prompt,
            freeform,
            client: self.client.with_api_key(&credential.key),
            credential_source: credential.source,
        }
    }

    /// Record the assistant turn on success and turn the result into display text.
    pub fn finish(&self, session: &mut Session, turn: PendingTurn, result: CompletionResult) -> Reply {
        match result {
            Ok(text) => {
                if turn.freeform {
                    session.append(ChatMessage::assistant(&text));
                }
                Reply::Answer(text)
            }
            Err(e) => Reply::Error(format!("Error: {}", e)),
        }
    }

    /// `begin`, one provider call, `finish`.
    pub async fn submit(&self, session: &mut Session, request: &PromptRequest) -> Reply {
        let turn = self.begin(session, request);
        let result = turn.run().await;
        self.finish(session, turn, result)
    }
}
