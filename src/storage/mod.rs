//! Storage contracts for contacts, tags and accounts.
//!
//! Every contact and tag operation is scoped by `owner_id`; a row belonging to
//! another owner behaves exactly like a missing row.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{ContactDraft, ContactWithTags, Session, TagUsage, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ContactStore: Send + Sync {
    /// All contacts of an owner with their tags, most recently updated first.
    async fn list_contacts(&self, owner_id: Uuid) -> AppResult<Vec<ContactWithTags>>;

    async fn find_contact(&self, owner_id: Uuid, id: Uuid) -> AppResult<Option<ContactWithTags>>;

    /// Inserts a contact and links its tags, creating missing tags by name.
    async fn insert_contact(&self, owner_id: Uuid, draft: &ContactDraft) -> AppResult<ContactWithTags>;

    /// Overwrites a contact and replaces its tag links with `draft.tags`.
    async fn update_contact(
        &self,
        owner_id: Uuid,
        id: Uuid,
        draft: &ContactDraft,
    ) -> AppResult<Option<ContactWithTags>>;

    async fn set_favorite(
        &self,
        owner_id: Uuid,
        id: Uuid,
        favorite: bool,
    ) -> AppResult<Option<ContactWithTags>>;

    /// Deletes a contact and its tag links. Tags themselves are kept.
    async fn delete_contact(&self, owner_id: Uuid, id: Uuid) -> AppResult<bool>;

    /// Contacts whose name, email, company, position, phone or any tag name
    /// contains `term` (already lowercased), most recently updated first.
    async fn search_contacts(&self, owner_id: Uuid, term: &str) -> AppResult<Vec<ContactWithTags>>;

    async fn list_tags(&self, owner_id: Uuid) -> AppResult<Vec<TagUsage>>;

    /// Removes the owner's tags that no contact references.
    async fn delete_unused_tags(&self, owner_id: Uuid) -> AppResult<u64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `UserAlreadyExists` when the email is taken.
    async fn insert_user(&self, email: &str, password_hash: &str) -> AppResult<User>;

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn insert_session(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<Session>;

    async fn find_session(&self, id: Uuid) -> AppResult<Option<Session>>;

    async fn extend_session(&self, id: Uuid, expires_at: DateTime<Utc>) -> AppResult<Option<Session>>;

    async fn delete_session(&self, id: Uuid) -> AppResult<bool>;

    async fn delete_user_sessions(&self, user_id: Uuid) -> AppResult<u64>;
}
