//! Client-side state machine for the create/edit contact form.
//!
//! The form only validates on submit. Editing a field clears that field's
//! error right away without re-checking it.

use crate::error::GENERIC_FAILURE;
use crate::models::{ContactInput, ContactWithTags};

use super::validation::{check_contact, FieldErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Pristine,
    Editing,
    Submitting,
    Success,
    ValidationError,
    SubmitError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Phone,
    Company,
    Position,
    Notes,
    Avatar,
}

impl Field {
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Company => "company",
            Field::Position => "position",
            Field::Notes => "notes",
            Field::Avatar => "avatar",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContactForm {
    data: ContactInput,
    errors: FieldErrors,
    state: FormState,
}

impl Default for ContactForm {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactForm {
    pub fn new() -> Self {
        Self {
            data: ContactInput::default(),
            errors: FieldErrors::default(),
            state: FormState::Pristine,
        }
    }

    /// Seeds the form with an existing contact for editing.
    pub fn for_contact(contact: &ContactWithTags) -> Self {
        Self {
            data: ContactInput::from(contact),
            ..Self::new()
        }
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn data(&self) -> &ContactInput {
        &self.data
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn is_submitting(&self) -> bool {
        self.state == FormState::Submitting
    }

    pub fn set_field(&mut self, field: Field, value: impl Into<String>) {
        if self.is_submitting() {
            return;
        }

        let value = value.into();
        match field {
            Field::Name => self.data.name = value,
            Field::Email => self.data.email = value,
            Field::Phone => self.data.phone = Some(value),
            Field::Company => self.data.company = Some(value),
            Field::Position => self.data.position = Some(value),
            Field::Notes => self.data.notes = Some(value),
            Field::Avatar => self.data.avatar = Some(value),
        }

        self.errors.remove(field.key());
        self.state = FormState::Editing;
    }

    pub fn set_favorite(&mut self, favorite: bool) {
        if self.is_submitting() {
            return;
        }
        self.data.favorite = favorite;
        self.state = FormState::Editing;
    }

    /// Adds a tag unless it is blank or already present. Returns whether the
    /// tag list changed.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        if self.is_submitting() || tag.is_empty() || self.data.tags.contains(&tag) {
            return false;
        }
        self.data.tags.push(tag);
        self.state = FormState::Editing;
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        if self.is_submitting() {
            return false;
        }
        let before = self.data.tags.len();
        self.data.tags.retain(|t| t != tag);
        let removed = self.data.tags.len() != before;
        if removed {
            self.state = FormState::Editing;
        }
        removed
    }

    /// Validates the form. On success the form moves to `Submitting` and the
    /// input to send is returned; otherwise it moves to `ValidationError`.
    pub fn submit(&mut self) -> Option<ContactInput> {
        if self.is_submitting() {
            return None;
        }

        self.errors = check_contact(&self.data);
        if !self.errors.is_empty() {
            self.state = FormState::ValidationError;
            return None;
        }

        self.state = FormState::Submitting;
        Some(self.data.clone())
    }

    /// Records the outcome of a submission. Ignored unless a submission is in flight.
    pub fn complete<T, E>(&mut self, result: &Result<T, E>) {
        if !self.is_submitting() {
            return;
        }
        self.state = match result {
            Ok(_) => FormState::Success,
            Err(_) => FormState::SubmitError(GENERIC_FAILURE.to_string()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::validation::{EMAIL_INVALID, NAME_REQUIRED};

    fn filled() -> ContactForm {
        let mut form = ContactForm::new();
        form.set_field(Field::Name, "Taylor Chen");
        form.set_field(Field::Email, "taylor@example.com");
        form
    }

    #[test]
    fn starts_pristine_and_moves_to_editing() {
        let mut form = ContactForm::new();
        assert_eq!(form.state(), &FormState::Pristine);
        form.set_field(Field::Company, "Design Studio");
        assert_eq!(form.state(), &FormState::Editing);
    }

    #[test]
    fn invalid_submit_blocks_and_reports_errors() {
        let mut form = ContactForm::new();
        form.set_field(Field::Email, "taylor.example.com");

        assert!(form.submit().is_none());
        assert_eq!(form.state(), &FormState::ValidationError);
        assert_eq!(form.errors().get("name"), Some(NAME_REQUIRED));
        assert_eq!(form.errors().get("email"), Some(EMAIL_INVALID));
    }

    #[test]
    fn editing_clears_only_that_error_without_revalidating() {
        let mut form = ContactForm::new();
        form.set_field(Field::Email, "bad");
        form.submit();

        form.set_field(Field::Email, "still bad");
        assert_eq!(form.errors().get("email"), None);
        assert_eq!(form.errors().get("name"), Some(NAME_REQUIRED));
        assert_eq!(form.state(), &FormState::Editing);
    }

    #[test]
    fn successful_submission_lifecycle() {
        let mut form = filled();
        assert!(form.add_tag(" Partner "));
        assert!(!form.add_tag("partner"));
        assert!(!form.add_tag("   "));

        let input = form.submit().expect("valid form");
        assert_eq!(input.tags, vec!["partner".to_string()]);
        assert!(form.is_submitting());

        // Edits are frozen while the request is in flight.
        form.set_field(Field::Name, "Someone Else");
        assert_eq!(form.data().name, "Taylor Chen");

        form.complete(&Ok::<(), ()>(()));
        assert_eq!(form.state(), &FormState::Success);
    }

    #[test]
    fn failed_submission_reports_generic_message() {
        let mut form = filled();
        form.submit();
        form.complete(&Err::<(), _>("connection refused"));
        assert_eq!(
            form.state(),
            &FormState::SubmitError(GENERIC_FAILURE.to_string())
        );

        // A stray completion outside a submission changes nothing.
        form.complete(&Ok::<(), ()>(()));
        assert!(matches!(form.state(), FormState::SubmitError(_)));
    }

    #[test]
    fn seeded_form_submits_existing_contact() {
        let now = chrono::Utc::now();
        let existing = ContactWithTags {
            contact: crate::models::Contact {
                id: uuid::Uuid::new_v4(),
                owner_id: uuid::Uuid::new_v4(),
                name: "Morgan Lee".to_string(),
                email: "morgan@example.com".to_string(),
                phone: Some("+1 555 0100".to_string()),
                company: Some("Northwind".to_string()),
                position: None,
                notes: Some("Prefers email".to_string()),
                avatar: None,
                favorite: true,
                last_contact: Some(now),
                created_at: now,
                updated_at: now,
            },
            tags: vec!["client".to_string(), "vip".to_string()],
        };

        let mut form = ContactForm::for_contact(&existing);
        assert_eq!(form.state(), &FormState::Pristine);
        assert_eq!(form.data().name, "Morgan Lee");

        form.set_field(Field::Company, "Contoso");
        let input = form.submit().expect("seeded form is valid");
        assert_eq!(input.company.as_deref(), Some("Contoso"));
        assert_eq!(input.name, "Morgan Lee");
        assert_eq!(input.email, "morgan@example.com");
        assert_eq!(input.phone.as_deref(), Some("+1 555 0100"));
        assert_eq!(input.notes.as_deref(), Some("Prefers email"));
        assert!(input.favorite);
        assert_eq!(input.last_contact, Some(now));
        assert_eq!(input.tags, existing.tags);
    }

    #[test]
    fn tags_can_be_removed() {
        let mut form = filled();
        form.add_tag("client");
        form.add_tag("vip");
        assert!(form.remove_tag("client"));
        assert!(!form.remove_tag("client"));
        assert_eq!(form.data().tags, vec!["vip".to_string()]);
    }
}
