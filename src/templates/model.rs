//! Message templates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::placeholder::SIGNATURE_DELIMITER;
use crate::error::ValidationError;

/// Template fields supplied by the author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTemplate {
    pub name: String,
    /// Subject pattern, may contain placeholders.
    pub subject: String,
    /// Body pattern, may contain placeholders and one signature delimiter.
    pub body: String,
}

impl NewTemplate {
    pub fn new(
        name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Reject blank fields and bodies with more than one signature delimiter.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("subject", &self.subject),
            ("body", &self.body),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidTemplate(format!(
                    "{field} must not be blank"
                )));
            }
        }
        if self.body.matches(SIGNATURE_DELIMITER).count() > 1 {
            return Err(ValidationError::InvalidTemplate(format!(
                "body contains more than one '{SIGNATURE_DELIMITER}'"
            )));
        }
        Ok(())
    }
}

/// A stored template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Template {
    pub fn from_new(owner_id: impl Into<String>, new: NewTemplate) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: new.name,
            subject: new.subject,
            body: new.body,
            created_at: Utc::now(),
        }
    }
}
