//! Stubs shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use outreach::campaign::{Orchestrator, OrchestratorDeps};
use outreach::config::{GenerationConfig, SenderIdentity};
use outreach::dispatch::{DispatchClient, MailRelay, OutboundEmail, RelayCredentials};
use outreach::error::{DispatchError, LlmError};
use outreach::generation::GenerationClient;
use outreach::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use outreach::store::InMemoryStore;

pub const OWNER: &str = "tester";

pub const CSV: &str = "\
Full Name,First Name,Last Name,Company Name,Email Address 1,Safe to Send (Y/N)
Sam Lee,Sam,Lee,Acme,sam@acme.io,Y
Nobody,No,Body,Ghost Co,,N
Ria Patel,Ria,Patel,Beta Labs,ria@beta.io,yes
";

/// Stub LLM provider: scripted replies, then a draft that keeps the image marker.
#[derive(Default)]
pub struct StubLlm {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    pub fn scripted(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Some(msg) = request.messages.last() {
            self.prompts.lock().unwrap().push(msg.content.clone());
        }
        let content = self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            r#"Here you go: {"subject": "Quick hello", "body": "<p>Hello!</p>!!!IMAGE HERE<p>Thanks</p>"}"#
                .to_string()
        });
        Ok(CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
        })
    }
}

/// Mail relay that records what it is given.
#[derive(Default)]
pub struct RecordingRelay {
    pub sent: Mutex<Vec<OutboundEmail>>,
    pub fail_next: Mutex<bool>,
}

#[async_trait]
impl MailRelay for RecordingRelay {
    async fn send(
        &self,
        email: OutboundEmail,
        _credentials: &RelayCredentials,
    ) -> Result<(), DispatchError> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(DispatchError::Auth("535 bad credentials".into()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

pub struct World {
    pub store: Arc<InMemoryStore>,
    pub llm: Arc<StubLlm>,
    pub relay: Arc<RecordingRelay>,
}

impl World {
    pub fn new(llm: StubLlm) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            llm: Arc::new(llm),
            relay: Arc::new(RecordingRelay::default()),
        }
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(OrchestratorDeps {
            owner_id: OWNER.to_string(),
            sender: SenderIdentity::new(Some("Al Writer".into()), Some("al@example.com".into())),
            contacts: self.store.clone(),
            templates: self.store.clone(),
            attachments: self.store.clone(),
            generator: Arc::new(GenerationClient::new(
                self.llm.clone(),
                GenerationConfig::default(),
            )),
            dispatcher: Arc::new(DispatchClient::new(self.relay.clone(), self.store.clone())),
        })
    }
}

pub fn credentials() -> RelayCredentials {
    RelayCredentials::new("al@example.com", "app-password")
}
