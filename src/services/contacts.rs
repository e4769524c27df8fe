use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{ContactInput, ContactWithTags, Principal, TagUsage},
    storage::ContactStore,
};

use super::{
    cache::ContactCache,
    search::{self, ListOptions},
    validation::validate_contact,
};

pub struct ContactsService {
    store: Arc<dyn ContactStore>,
    cache: Arc<ContactCache>,
}

impl ContactsService {
    pub fn new(store: Arc<dyn ContactStore>, cache: Arc<ContactCache>) -> Self {
        Self { store, cache }
    }

    /// Get all contacts for the principal, filtered and sorted per `options`
    pub async fn list_contacts(
        &self,
        principal: &Principal,
        options: ListOptions,
    ) -> AppResult<Vec<ContactWithTags>> {
        let contacts = self.all_contacts(principal.user_id).await?;
        Ok(search::apply_options(contacts, options))
    }

    /// Most recently updated contacts
    pub async fn recent_contacts(
        &self,
        principal: &Principal,
        limit: Option<usize>,
    ) -> AppResult<Vec<ContactWithTags>> {
        let mut contacts = self.all_contacts(principal.user_id).await?;
        contacts.truncate(search::clamp_recent_limit(limit));
        Ok(contacts)
    }

    /// Get a specific contact
    pub async fn get_contact(&self, principal: &Principal, id: Uuid) -> AppResult<ContactWithTags> {
        let owner_id = principal.user_id;
        if let Some(contact) = self.cache.contact(owner_id, id).await {
            return Ok(contact);
        }

        let read_at = self.cache.generation(owner_id).await;
        let contact = self
            .store
            .find_contact(owner_id, id)
            .await?
            .ok_or(AppError::ContactNotFound)?;

        self.cache.put_contact(read_at, contact.clone()).await;
        Ok(contact)
    }

    /// Add a new contact
    pub async fn create_contact(
        &self,
        principal: &Principal,
        input: ContactInput,
    ) -> AppResult<ContactWithTags> {
        let draft = validate_contact(input).map_err(AppError::Validation)?;

        let contact = self.store.insert_contact(principal.user_id, &draft).await?;
        self.cache
            .invalidate_contact(principal.user_id, contact.contact.id)
            .await;

        tracing::info!(
            "Created contact {} with {} tag(s)",
            contact.contact.id,
            contact.tags.len()
        );
        Ok(contact)
    }

    /// Update contact, replacing its tag set with the submitted one
    pub async fn update_contact(
        &self,
        principal: &Principal,
        id: Uuid,
        input: ContactInput,
    ) -> AppResult<ContactWithTags> {
        let draft = validate_contact(input).map_err(AppError::Validation)?;

        let contact = self
            .store
            .update_contact(principal.user_id, id, &draft)
            .await?
            .ok_or(AppError::ContactNotFound)?;
        self.cache.invalidate_contact(principal.user_id, id).await;

        tracing::info!("Updated contact {}", id);
        Ok(contact)
    }

    /// Flip the favorite flag
    pub async fn toggle_favorite(&self, principal: &Principal, id: Uuid) -> AppResult<ContactWithTags> {
        let current = self
            .store
            .find_contact(principal.user_id, id)
            .await?
            .ok_or(AppError::ContactNotFound)?;

        let contact = self
            .store
            .set_favorite(principal.user_id, id, !current.contact.favorite)
            .await?
            .ok_or(AppError::ContactNotFound)?;
        self.cache.invalidate_contact(principal.user_id, id).await;

        tracing::debug!("Contact {} favorite = {}", id, contact.contact.favorite);
        Ok(contact)
    }

    /// Delete contact
    pub async fn delete_contact(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        if !self.store.delete_contact(principal.user_id, id).await? {
            return Err(AppError::ContactNotFound);
        }
        self.cache.invalidate_contact(principal.user_id, id).await;

        tracing::info!("Deleted contact {}", id);
        Ok(())
    }

    /// Search contacts by fields and tag names. A blank query lists everything.
    pub async fn search_contacts(
        &self,
        principal: &Principal,
        query: &str,
    ) -> AppResult<Vec<ContactWithTags>> {
        match search::search_term(query) {
            None => self.all_contacts(principal.user_id).await,
            Some(term) => self.store.search_contacts(principal.user_id, &term).await,
        }
    }

    pub async fn list_tags(&self, principal: &Principal) -> AppResult<Vec<TagUsage>> {
        self.store.list_tags(principal.user_id).await
    }

    /// Remove tags no contact refers to anymore
    pub async fn prune_unused_tags(&self, principal: &Principal) -> AppResult<u64> {
        let removed = self.store.delete_unused_tags(principal.user_id).await?;
        if removed > 0 {
            tracing::info!("Pruned {} unused tag(s) for {}", removed, principal.user_id);
        }
        Ok(removed)
    }

    async fn all_contacts(&self, owner_id: Uuid) -> AppResult<Vec<ContactWithTags>> {
        if let Some(contacts) = self.cache.list(owner_id).await {
            return Ok(contacts);
        }

        let read_at = self.cache.generation(owner_id).await;
        let contacts = self.store.list_contacts(owner_id).await?;
        self.cache.put_list(read_at, contacts.clone()).await;
        Ok(contacts)
    }
}
