//! Placeholder engine — signature splitting and contact-field substitution.
//!
//! Substitution is driven by one ordered table of `(token, resolver, default)`
//! entries and performed in a single left-to-right pass, so text produced by a
//! resolver is never scanned again.

use std::sync::LazyLock;

use regex::Regex;

use crate::contacts::{Contact, is_unknown};

/// Separates the generated part of a template body from the fixed signature.
pub const SIGNATURE_DELIMITER: &str = "---FIXED SIGNATURE---";

/// Marker the model must keep in place; replaced by the inline image at send time.
pub const IMAGE_MARKER: &str = "!!!IMAGE HERE";

type Resolver = fn(&Contact) -> Option<&str>;

/// A named placeholder and how to fill it.
pub struct Placeholder {
    pub token: &'static str,
    resolve: Resolver,
    pub default: &'static str,
}

impl Placeholder {
    /// Resolve against a contact, falling back to the default for unknown values.
    pub fn value<'a>(&self, contact: &'a Contact) -> &'a str {
        let raw = (self.resolve)(contact);
        if is_unknown(raw) {
            self.default
        } else {
            raw.map(str::trim).unwrap_or(self.default)
        }
    }
}

/// The substitution table, in match priority order.
pub static PLACEHOLDERS: [Placeholder; 4] = [
    Placeholder {
        token: "{Full Name}",
        resolve: full_name,
        default: "Hiring Team",
    },
    Placeholder {
        token: "{First Name}",
        resolve: first_name,
        default: "there",
    },
    Placeholder {
        token: "{Last Name}",
        resolve: last_name,
        default: "",
    },
    Placeholder {
        token: "{Company Name}",
        resolve: company_name,
        default: "your company",
    },
];

fn full_name(c: &Contact) -> Option<&str> {
    Some(&c.fields.full_name)
}

fn first_name(c: &Contact) -> Option<&str> {
    c.fields.first_name.as_deref()
}

fn last_name(c: &Contact) -> Option<&str> {
    c.fields.last_name.as_deref()
}

fn company_name(c: &Contact) -> Option<&str> {
    Some(&c.fields.company_name)
}

static BRACE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[A-Za-z][A-Za-z0-9 _/().-]*\}").expect("valid regex"));

/// Split a template body into `(main_body, fixed_signature)`.
///
/// Everything after the first delimiter is the signature. Without a delimiter
/// the signature is empty and the main body is the whole input.
pub fn split_signature<'a>(body: &'a str, delimiter: &str) -> (&'a str, &'a str) {
    match body.split_once(delimiter) {
        Some((main, signature)) => (main, signature),
        None => (body, ""),
    }
}

/// Replace every known placeholder in `text` with the contact's value.
/// Unknown tokens are left as they are.
pub fn substitute(text: &str, contact: &Contact) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        match PLACEHOLDERS.iter().find(|p| candidate.starts_with(p.token)) {
            Some(placeholder) => {
                out.push_str(placeholder.value(contact));
                rest = &candidate[placeholder.token.len()..];
            }
            None => {
                out.push('{');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Brace tokens still present after substitution (unknown placeholders).
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    BRACE_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}
