//! Generation client — prompt → model → validated draft with signature reattached.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::draft::Draft;
use super::extract::first_json_object;
use crate::config::{GenerationConfig, SenderIdentity};
use crate::contacts::Contact;
use crate::error::GenerationError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider};
use crate::templates::{GenerationRequest, Template, prompt};

/// Placed between the generated body and the fixed signature.
pub const SIGNATURE_SEPARATOR: &str = "<br>---<br>";

/// Produces drafts from a text-generation backend.
///
/// Every call goes to the backend; nothing is cached, so regenerating the same
/// recipient may yield a different draft.
pub struct GenerationClient {
    llm: Arc<dyn LlmProvider>,
    config: GenerationConfig,
}

impl GenerationClient {
    pub fn new(llm: Arc<dyn LlmProvider>, config: GenerationConfig) -> Self {
        Self { llm, config }
    }

    /// Build the prompt for `contact` and generate a draft addressed to them.
    pub async fn generate(
        &self,
        contact: &Contact,
        template: &Template,
        sender: &SenderIdentity,
    ) -> Result<Draft, GenerationError> {
        let request = prompt::build(contact, template, sender);
        info!(
            contact = %contact.id,
            to = %contact.primary_email(),
            model = %self.llm.model_name(),
            "Generating draft"
        );
        self.generate_from(contact.primary_email(), &request).await
    }

    /// Send a prebuilt request and turn the model's answer into a draft for `to`.
    pub async fn generate_from(
        &self,
        to: &str,
        request: &GenerationRequest,
    ) -> Result<Draft, GenerationError> {
        let completion = CompletionRequest::new(vec![ChatMessage::user(&request.prompt)])
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let response = self.llm.complete(completion).await?;
        debug!(
            to,
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Generation response received"
        );
        match response.finish_reason {
            FinishReason::Length => warn!(to, "Reply hit the token limit and may be truncated"),
            FinishReason::Unknown => debug!(to, "Backend reported no token usage"),
            FinishReason::Stop => {}
        }

        let (subject, body) = parse_reply(&response.content)?;

        if request.expects_image_marker() && !body.contains(crate::templates::IMAGE_MARKER) {
            warn!(to, "Model dropped the inline-image marker from the draft");
        }

        Ok(Draft::new(
            to,
            subject,
            attach_signature(body, &request.fixed_signature),
        ))
    }
}

/// Extract `(subject, body)` from raw model output.
pub fn parse_reply(raw: &str) -> Result<(String, String), GenerationError> {
    let object = first_json_object(raw).ok_or(GenerationError::NoJsonObject)?;
    let field = |name: &'static str| {
        object
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or(GenerationError::MissingField(name))
    };
    Ok((field("subject")?, field("body")?))
}

/// Append the fixed signature after the separator. An empty signature adds nothing.
pub fn attach_signature(mut body: String, signature: &str) -> String {
    if !signature.is_empty() {
        body.push_str(SIGNATURE_SEPARATOR);
        body.push_str(signature);
    }
    body
}
