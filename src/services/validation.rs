use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{ContactDraft, ContactInput};

pub const NAME_REQUIRED: &str = "Name is required";
pub const EMAIL_REQUIRED: &str = "Email is required";
pub const EMAIL_INVALID: &str = "Please enter a valid email";

const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/personas/svg";

/// Per-field validation messages, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: &str, message: &str) {
        self.0.insert(field.to_string(), message.to_string());
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

/// Accepts `local@domain.tld` shapes: no whitespace, exactly one `@`, a
/// non-empty local part, and a domain holding a dot with text on both sides.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() {
        return false;
    }

    let len = domain.len();
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < len)
}

/// Trims and lowercases tag names, dropping blanks and repeats while keeping
/// first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

pub fn default_avatar(name: &str) -> String {
    format!("{}?seed={}", AVATAR_BASE_URL, urlencoding::encode(name.trim()))
}

/// Field checks shared by the server and the form state machine.
pub fn check_contact(input: &ContactInput) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if input.name.trim().is_empty() {
        errors.insert("name", NAME_REQUIRED);
    }

    let email = input.email.trim();
    if email.is_empty() {
        errors.insert("email", EMAIL_REQUIRED);
    } else if !is_valid_email(email) {
        errors.insert("email", EMAIL_INVALID);
    }

    errors
}

pub fn validate_contact(input: ContactInput) -> Result<ContactDraft, FieldErrors> {
    let errors = check_contact(&input);
    if !errors.is_empty() {
        return Err(errors);
    }

    let name = input.name.trim().to_string();
    let avatar = non_blank(input.avatar).unwrap_or_else(|| default_avatar(&name));

    Ok(ContactDraft {
        email: input.email.trim().to_string(),
        phone: non_blank(input.phone),
        company: non_blank(input.company),
        position: non_blank(input.position),
        notes: non_blank(input.notes),
        avatar: Some(avatar),
        favorite: input.favorite,
        last_contact: input.last_contact,
        tags: normalize_tags(&input.tags),
        name,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
