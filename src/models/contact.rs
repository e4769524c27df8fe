use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub notes: Option<String>,
    pub avatar: Option<String>,
    pub favorite: bool,
    pub last_contact: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A contact row annotated with the names of every tag linked to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactWithTags {
    #[serde(flatten)]
    pub contact: Contact,
    pub tags: Vec<String>,
}

/// Contact data as submitted by a client, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub last_contact: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Validated and normalized contact fields, ready to be written to a store.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactDraft {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub notes: Option<String>,
    pub avatar: Option<String>,
    pub favorite: bool,
    pub last_contact: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl From<&ContactWithTags> for ContactInput {
    fn from(value: &ContactWithTags) -> Self {
        let contact = &value.contact;
        Self {
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            company: contact.company.clone(),
            position: contact.position.clone(),
            notes: contact.notes.clone(),
            avatar: contact.avatar.clone(),
            favorite: contact.favorite,
            last_contact: contact.last_contact,
            tags: value.tags.clone(),
        }
    }
}
