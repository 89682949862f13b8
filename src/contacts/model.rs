//! Contact records — canonical shape shared by the importer, the stores and
//! the prompt builder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sentinel stored for required text fields whose value is unknown.
pub const NOT_AVAILABLE: &str = "N/A";

/// Whether a field value counts as "unknown" (absent, blank, or the sentinel).
pub fn is_unknown(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => {
            let v = v.trim();
            v.is_empty() || v == NOT_AVAILABLE
        }
    }
}

/// Contact fields prior to insertion (no id, owner or timestamp yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    /// Display name. `N/A` when the import row had none.
    pub full_name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub designation: Option<String>,
    /// `N/A` when the import row had none.
    pub company_name: String,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub personal_linkedin_profile: Option<String>,
    /// Primary address. Rows without one never become contacts.
    pub email_address_1: String,
    pub email_address_2: Option<String>,
    pub generic_email: Option<String>,
    pub location: Option<String>,
    pub country: Option<String>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
    pub experience: Option<String>,
    pub source_sheet: Option<String>,
    pub additional_notes: Option<String>,
    pub email_verified: Option<bool>,
    pub email_domain: Option<String>,
    pub account_type: Option<String>,
    pub role_based_email: Option<bool>,
    pub safe_to_send: Option<bool>,
    pub domain: Option<String>,
    pub niche: Option<String>,
    pub industry: Option<String>,
    pub recruitment_agency: Option<bool>,
    pub free_domain: Option<bool>,
    pub diagnosis: Option<String>,
    pub mx_domain: Option<String>,
    pub email_verification_response: Option<String>,
    pub bounce_type: Option<String>,
}

impl NewContact {
    /// A minimal contact with only the required fields set.
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            first_name: None,
            last_name: None,
            designation: None,
            company_name: NOT_AVAILABLE.to_string(),
            website: None,
            linkedin_url: None,
            personal_linkedin_profile: None,
            email_address_1: email.into(),
            email_address_2: None,
            generic_email: None,
            location: None,
            country: None,
            facebook_url: None,
            twitter_url: None,
            experience: None,
            source_sheet: None,
            additional_notes: None,
            email_verified: None,
            email_domain: None,
            account_type: None,
            role_based_email: None,
            safe_to_send: None,
            domain: None,
            niche: None,
            industry: None,
            recruitment_agency: None,
            free_domain: None,
            diagnosis: None,
            mx_domain: None,
            email_verification_response: None,
            bounce_type: None,
        }
    }

    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    pub fn with_company(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = company_name.into();
        self
    }

    /// Whether the primary email is usable (not blank and not the sentinel).
    pub fn has_primary_email(&self) -> bool {
        !is_unknown(Some(&self.email_address_1))
    }

    /// Key used for duplicate detection within an owner's contacts.
    pub fn dedup_key(&self) -> String {
        self.email_address_1.trim().to_lowercase()
    }

    /// Attach an id, owner and creation time.
    pub fn into_contact(self, owner_id: impl Into<String>) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            created_at: Utc::now(),
            fields: self,
        }
    }
}

/// A stored contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: NewContact,
}

impl Contact {
    /// The address drafts are sent to.
    pub fn primary_email(&self) -> &str {
        &self.fields.email_address_1
    }

    pub fn display_name(&self) -> &str {
        &self.fields.full_name
    }
}
