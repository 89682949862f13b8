//! Prompt builder — turns (contact, template, sender) into a generation request.

use serde::Serialize;
use tracing::debug;

use super::model::Template;
use super::placeholder::{
    IMAGE_MARKER, SIGNATURE_DELIMITER, split_signature, substitute, unresolved_placeholders,
};
use crate::config::SenderIdentity;
use crate::contacts::{Contact, is_unknown};

/// Everything the generation client needs for one recipient.
///
/// The fixed signature travels beside the prompt, never inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub fixed_signature: String,
    /// Personalized template subject, offered to the model as a starting point.
    pub subject_hint: String,
    /// Personalized main body as it was sent to the model.
    pub personalized_body: String,
}

impl GenerationRequest {
    /// Whether the draft body must carry the inline-image marker.
    pub fn expects_image_marker(&self) -> bool {
        self.personalized_body.contains(IMAGE_MARKER)
    }
}

/// Build the generation request for one recipient.
pub fn build(contact: &Contact, template: &Template, sender: &SenderIdentity) -> GenerationRequest {
    let (main_body, fixed_signature) = split_signature(&template.body, SIGNATURE_DELIMITER);

    let subject_hint = substitute(&template.subject, contact);
    let personalized_body = substitute(main_body, contact);

    let leftovers = unresolved_placeholders(&personalized_body);
    if !leftovers.is_empty() {
        debug!(
            template = %template.name,
            contact = %contact.id,
            tokens = ?leftovers,
            "Template has placeholders with no contact mapping"
        );
    }

    let prompt = render_prompt(contact, sender, &subject_hint, &personalized_body);

    GenerationRequest {
        prompt,
        fixed_signature: fixed_signature.to_string(),
        subject_hint,
        personalized_body,
    }
}

fn known_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    if is_unknown(value) {
        fallback
    } else {
        value.map(str::trim).unwrap_or(fallback)
    }
}

fn render_prompt(
    contact: &Contact,
    sender: &SenderIdentity,
    subject_hint: &str,
    personalized_body: &str,
) -> String {
    let writer = sender.display();
    let recipient = known_or(Some(contact.display_name()), "Hiring Manager");
    let company = known_or(Some(&contact.fields.company_name), "the company");
    let greeting = known_or(contact.fields.first_name.as_deref(), "Hiring Team");

    format!(
        "**ROLE & GOAL:**\n\
         You are an expert email writer acting AS THE APPLICANT. Your goal is to polish a \
         draft email for a job application. The applicant's name is {writer}. Make them sound \
         professional, capable, and concise. Quality and clarity matter more than length.\n\n\
         **CONTEXT:**\n\
         - **WRITING AS (The Sender):** {writer}\n\
         - **RECIPIENT:** {recipient} at {company}.\n\
         - **INTENT:** Job Application / Internship Interest.\n\
         - **SUGGESTED SUBJECT:** {subject_hint}\n\n\
         **USER'S DRAFT BODY (This is the only part you should edit):**\n\
         ---\n\
         {personalized_body}\n\
         ---\n\n\
         **YOUR TASKS & CONSTRAINTS:**\n\
         1. **REWRITE AS THE APPLICANT:** Use \"I\", \"my\", etc., from the perspective of {writer}.\n\
         2. **IMPROVE THE DRAFT:** Refine grammar, tone, and flow. Do not add new information \
         or skills.\n\
         3. **CRITICAL - PRESERVE IMAGE TAG:** If you see the exact tag \"{IMAGE_MARKER}\" in \
         the draft, you MUST include that exact tag in your body in the same logical position. \
         Do not replace it or describe it.\n\
         4. **DO NOT TOUCH THE SIGNATURE:** You are not given the signature. Generate only the \
         main email body.\n\n\
         **REQUIRED OUTPUT FORMAT:**\n\
         Output exactly one valid JSON object with two string keys: \"subject\" and \"body\". \
         \"body\" is the polished main email body as HTML using only <p> and <br> tags.\n\n\
         **EXAMPLE \"body\" (if the tag was present):**\n\
         \"<p>Dear {greeting},</p><p>I am writing to express my strong interest in the \
         opportunities at {company}.</p><p>{IMAGE_MARKER}</p><p>My skills are an excellent \
         match for your requirements.</p>\""
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contacts::NewContact;
    use crate::templates::NewTemplate;

    fn contact() -> Contact {
        NewContact::new("Sam Lee", "sam@acme.io")
            .with_first_name("Sam")
            .with_company("Acme")
            .into_contact("owner")
    }

    fn template(body: &str) -> Template {
        Template::from_new("owner", NewTemplate::new("Intro", "Role at {Company Name}", body))
    }

    fn sender() -> SenderIdentity {
        SenderIdentity::new(Some("Al Smith".into()), Some("al@x.io".into()))
    }

    #[test]
    fn signature_is_extracted_and_kept_out_of_prompt() {
        let t = template("Hi {First Name}---FIXED SIGNATURE---Best, Al\nSECRET-LINE");
        let req = build(&contact(), &t, &sender());
        assert_eq!(req.fixed_signature, "Best, Al\nSECRET-LINE");
        assert!(!req.prompt.contains("SECRET-LINE"));
        assert!(!req.prompt.contains(SIGNATURE_DELIMITER));
        assert!(req.prompt.contains("Hi Sam"));
    }

    #[test]
    fn subject_is_personalized() {
        let req = build(&contact(), &template("Body"), &sender());
        assert_eq!(req.subject_hint, "Role at Acme");
        assert!(req.prompt.contains("Role at Acme"));
    }

    #[test]
    fn image_marker_survives_personalization() {
        let t = template("Hi {First Name}\n!!!IMAGE HERE\nThanks");
        let req = build(&contact(), &t, &sender());
        assert_eq!(req.personalized_body, "Hi Sam\n!!!IMAGE HERE\nThanks");
        assert!(req.expects_image_marker());
    }

    #[test]
    fn prompt_demands_json_and_names_sender() {
        let req = build(&contact(), &template("Body"), &sender());
        assert!(req.prompt.contains("\"subject\" and \"body\""));
        assert!(req.prompt.contains("WRITING AS (The Sender):** Al Smith"));
        assert!(req.prompt.contains("Sam Lee at Acme"));
    }

    #[test]
    fn recipient_falls_back_when_unknown() {
        let c = NewContact::new("N/A", "x@y.io").into_contact("owner");
        let req = build(&c, &template("Body"), &SenderIdentity::default());
        assert!(req.prompt.contains("Hiring Manager at the company"));
    }
}
