//! Contact importer — CSV payload → canonical contacts → skip-duplicate bulk insert.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::model::{NOT_AVAILABLE, NewContact};
use crate::error::{Error, ParseError};
use crate::store::ContactStore;

/// Column carrying the primary email; an import without it is rejected.
pub const PRIMARY_EMAIL_COLUMN: &str = "Email Address 1";

/// Import column headers, matched verbatim.
mod columns {
    pub const FULL_NAME: &str = "Full Name";
    pub const FIRST_NAME: &str = "First Name";
    pub const LAST_NAME: &str = "Last Name";
    pub const DESIGNATION: &str = "Designation / Job Title";
    pub const COMPANY_NAME: &str = "Company Name";
    pub const WEBSITE: &str = "Website";
    pub const LINKEDIN_URL: &str = "LinkedIn Url";
    pub const PERSONAL_LINKEDIN: &str = "Personal LinkedIn Profile";
    pub const EMAIL_2: &str = "Email Address 2";
    pub const GENERIC_EMAIL: &str = "Generic Email (careers@...)";
    pub const LOCATION: &str = "Location";
    pub const COUNTRY: &str = "Country";
    pub const FACEBOOK_URL: &str = "Facebook Url";
    pub const TWITTER_URL: &str = "Twitter URL";
    pub const EXPERIENCE: &str = "Experience (if given)";
    pub const SOURCE_SHEET: &str = "Source Sheet";
    pub const ADDITIONAL_NOTES: &str = "Additional Notes";
    pub const EMAIL_VERIFIED: &str = "Email Verified (Yes/No)";
    pub const EMAIL_DOMAIN: &str = "Email Domain";
    pub const ACCOUNT_TYPE: &str = "Account Type";
    pub const ROLE_BASED_EMAIL: &str = "Role-Based Email";
    pub const SAFE_TO_SEND: &str = "Safe to Send (Y/N)";
    pub const DOMAIN: &str = "Domain";
    pub const NICHE: &str = "Niche";
    pub const INDUSTRY: &str = "Industry";
    pub const RECRUITMENT_AGENCY: &str = "Recuritment Agency";
    pub const FREE_DOMAIN: &str = "Free Domain";
    pub const DIAGNOSIS: &str = "Diagnosis";
    pub const MX_DOMAIN: &str = "MX_Domain";
    pub const VERIFICATION_RESPONSE: &str = "Email Veirfication Response";
    pub const BOUNCE_TYPE: &str = "Bounce Type";
}

/// A row that could not be read. Other rows are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// 1-based line number in the payload.
    pub line: u64,
    pub reason: String,
}

/// Result of parsing a payload, before anything is stored.
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    pub contacts: Vec<NewContact>,
    pub rows_read: usize,
    pub dropped_without_email: usize,
    pub row_errors: Vec<RowError>,
}

/// Summary of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub rows_read: usize,
    pub dropped_without_email: usize,
    pub inserted: usize,
    pub skipped_duplicates: usize,
    pub row_errors: Vec<RowError>,
}

/// Coerce a yes/no cell. Unrecognized or blank values are absent, not false.
pub fn parse_flag(value: Option<&str>) -> Option<bool> {
    let lower = value?.trim().to_lowercase();
    match lower.as_str() {
        "yes" | "y" | "true" => Some(true),
        "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

/// Header name → column position.
struct ColumnMap(HashMap<String, usize>);

impl ColumnMap {
    fn new(headers: &csv::StringRecord) -> Self {
        let map = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();
        Self(map)
    }

    fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Trimmed, non-blank cell value for a column.
    fn text(&self, record: &csv::StringRecord, name: &str) -> Option<String> {
        let idx = *self.0.get(name)?;
        let value = record.get(idx)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn text_or_sentinel(&self, record: &csv::StringRecord, name: &str) -> String {
        self.text(record, name)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    fn flag(&self, record: &csv::StringRecord, name: &str) -> Option<bool> {
        parse_flag(self.text(record, name).as_deref())
    }

    fn contact(&self, r: &csv::StringRecord) -> NewContact {
        use columns::*;
        NewContact {
            full_name: self.text_or_sentinel(r, FULL_NAME),
            first_name: self.text(r, FIRST_NAME),
            last_name: self.text(r, LAST_NAME),
            designation: self.text(r, DESIGNATION),
            company_name: self.text_or_sentinel(r, COMPANY_NAME),
            website: self.text(r, WEBSITE),
            linkedin_url: self.text(r, LINKEDIN_URL),
            personal_linkedin_profile: self.text(r, PERSONAL_LINKEDIN),
            email_address_1: self.text_or_sentinel(r, PRIMARY_EMAIL_COLUMN),
            email_address_2: self.text(r, EMAIL_2),
            generic_email: self.text(r, GENERIC_EMAIL),
            location: self.text(r, LOCATION),
            country: self.text(r, COUNTRY),
            facebook_url: self.text(r, FACEBOOK_URL),
            twitter_url: self.text(r, TWITTER_URL),
            experience: self.text(r, EXPERIENCE),
            source_sheet: self.text(r, SOURCE_SHEET),
            additional_notes: self.text(r, ADDITIONAL_NOTES),
            email_verified: self.flag(r, EMAIL_VERIFIED),
            email_domain: self.text(r, EMAIL_DOMAIN),
            account_type: self.text(r, ACCOUNT_TYPE),
            role_based_email: self.flag(r, ROLE_BASED_EMAIL),
            safe_to_send: self.flag(r, SAFE_TO_SEND),
            domain: self.text(r, DOMAIN),
            niche: self.text(r, NICHE),
            industry: self.text(r, INDUSTRY),
            recruitment_agency: self.flag(r, RECRUITMENT_AGENCY),
            free_domain: self.flag(r, FREE_DOMAIN),
            diagnosis: self.text(r, DIAGNOSIS),
            mx_domain: self.text(r, MX_DOMAIN),
            email_verification_response: self.text(r, VERIFICATION_RESPONSE),
            bounce_type: self.text(r, BOUNCE_TYPE),
        }
    }
}

/// Parse a CSV payload into contacts. Rows without a usable primary email are
/// dropped; unreadable rows are reported and skipped.
pub fn parse(payload: &[u8]) -> Result<ParsedImport, ParseError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(payload);

    let headers = reader
        .headers()
        .map_err(|e| ParseError::Header(e.to_string()))?
        .clone();
    let columns = ColumnMap::new(&headers);
    if !columns.contains(PRIMARY_EMAIL_COLUMN) {
        return Err(ParseError::MissingColumn(PRIMARY_EMAIL_COLUMN.to_string()));
    }

    let mut parsed = ParsedImport::default();
    for result in reader.records() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                warn!(line, error = %e, "Skipping unreadable import row");
                parsed.row_errors.push(RowError {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        parsed.rows_read += 1;

        if record.len() != headers.len() {
            parsed.row_errors.push(RowError {
                line,
                reason: format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    record.len()
                ),
            });
            continue;
        }

        let contact = columns.contact(&record);
        if !contact.has_primary_email() {
            parsed.dropped_without_email += 1;
            continue;
        }
        parsed.contacts.push(contact);
    }

    Ok(parsed)
}

/// Imports contact payloads into a [`ContactStore`].
pub struct ContactImporter {
    store: Arc<dyn ContactStore>,
}

impl ContactImporter {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    /// Parse `payload` and bulk-insert its contacts for `owner_id`.
    ///
    /// Re-importing the same payload inserts nothing: rows whose primary email
    /// already exists for the owner are skipped, never overwritten.
    pub async fn import(&self, owner_id: &str, payload: &[u8]) -> Result<ImportReport, Error> {
        let parsed = parse(payload)?;

        let outcome = if parsed.contacts.is_empty() {
            Default::default()
        } else {
            self.store.bulk_insert(owner_id, parsed.contacts).await?
        };

        info!(
            owner = owner_id,
            rows = parsed.rows_read,
            inserted = outcome.inserted,
            duplicates = outcome.skipped_duplicates,
            dropped = parsed.dropped_without_email,
            errors = parsed.row_errors.len(),
            "Contact import finished"
        );

        Ok(ImportReport {
            rows_read: parsed.rows_read,
            dropped_without_email: parsed.dropped_without_email,
            inserted: outcome.inserted,
            skipped_duplicates: outcome.skipped_duplicates,
            row_errors: parsed.row_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    const HEADER: &str = "Full Name,First Name,Company Name,Email Address 1,Safe to Send (Y/N)";

    fn payload(rows: &[&str]) -> String {
        let mut s = String::from(HEADER);
        for row in rows {
            s.push('\n');
            s.push_str(row);
        }
        s
    }

    #[test]
    fn flag_coercion() {
        assert_eq!(parse_flag(Some("Yes")), Some(true));
        assert_eq!(parse_flag(Some(" y ")), Some(true));
        assert_eq!(parse_flag(Some("TRUE")), Some(true));
        assert_eq!(parse_flag(Some("No")), Some(false));
        assert_eq!(parse_flag(Some("n")), Some(false));
        assert_eq!(parse_flag(Some("false")), Some(false));
        assert_eq!(parse_flag(Some("maybe")), None);
        assert_eq!(parse_flag(Some("")), None);
        assert_eq!(parse_flag(None), None);
    }

    #[test]
    fn maps_columns_and_sentinels() {
        let parsed = parse(payload(&["Sam Lee,Sam,,sam@acme.io,Y"]).as_bytes()).unwrap();
        let c = &parsed.contacts[0];
        assert_eq!(c.full_name, "Sam Lee");
        assert_eq!(c.first_name.as_deref(), Some("Sam"));
        assert_eq!(c.company_name, NOT_AVAILABLE);
        assert_eq!(c.email_address_1, "sam@acme.io");
        assert_eq!(c.safe_to_send, Some(true));
        assert_eq!(c.email_verified, None);
    }

    #[test]
    fn drops_rows_without_primary_email() {
        let parsed = parse(
            payload(&[
                "A,A,Acme,a@acme.io,",
                "B,B,Acme,,",
                "C,C,Acme,N/A,",
            ])
            .as_bytes(),
        )
        .unwrap();
        assert_eq!(parsed.contacts.len(), 1);
        assert_eq!(parsed.dropped_without_email, 2);
    }

    #[test]
    fn reports_bad_rows_and_keeps_good_ones() {
        let parsed = parse(payload(&["A,A,Acme,a@acme.io,", "broken,row", "B,B,Beta,b@beta.io,n"]).as_bytes())
            .unwrap();
        assert_eq!(parsed.contacts.len(), 2);
        assert_eq!(parsed.row_errors.len(), 1);
        assert_eq!(parsed.row_errors[0].line, 3);
    }

    #[test]
    fn skips_blank_lines() {
        let parsed = parse(payload(&["A,A,Acme,a@acme.io,", "", ",,,,", "B,B,Beta,b@beta.io,"]).as_bytes())
            .unwrap();
        assert_eq!(parsed.rows_read, 2);
        assert_eq!(parsed.contacts.len(), 2);
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(matches!(parse(b"  \n"), Err(ParseError::Empty)));
    }

    #[test]
    fn rejects_missing_email_column() {
        let err = parse(b"Full Name,Company Name\nSam,Acme").unwrap_err();
        assert!(matches!(err, ParseError::MissingColumn(c) if c == PRIMARY_EMAIL_COLUMN));
    }

    #[test]
    fn tolerates_byte_order_mark() {
        let body = format!("\u{feff}Email Address 1,Full Name\nsam@acme.io,Sam");
        let parsed = parse(body.as_bytes()).unwrap();
        assert_eq!(parsed.contacts.len(), 1);
    }

    #[tokio::test]
    async fn three_rows_one_blank_email_inserts_two() {
        let store = Arc::new(InMemoryStore::new());
        let importer = ContactImporter::new(store);
        let body = payload(&[
            "Sam Lee,Sam,Acme,sam@acme.io,",
            "Jo Park,Jo,Beta,,",
            "Ana Ruiz,Ana,Gamma,ana@gamma.io,",
        ]);
        let report = importer.import("owner", body.as_bytes()).await.unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(report.dropped_without_email, 1);
    }

    #[tokio::test]
    async fn reimport_inserts_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let importer = ContactImporter::new(store.clone());
        let body = payload(&["Sam Lee,Sam,Acme,sam@acme.io,", "Ana Ruiz,Ana,Gamma,ana@gamma.io,"]);

        let first = importer.import("owner", body.as_bytes()).await.unwrap();
        let second = importer.import("owner", body.as_bytes()).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped_duplicates, 2);

        // Duplicates are scoped to the owner.
        let other = importer.import("someone-else", body.as_bytes()).await.unwrap();
        assert_eq!(other.inserted, 2);
    }

    #[tokio::test]
    async fn duplicates_within_one_batch_are_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let importer = ContactImporter::new(store);
        let body = payload(&["Sam,Sam,Acme,sam@acme.io,", "Sam again,Sam,Acme,SAM@acme.io,"]);
        let report = importer.import("owner", body.as_bytes()).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped_duplicates, 1);
    }
}
