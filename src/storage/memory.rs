use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Contact, ContactDraft, ContactWithTags, Session, Tag, TagUsage, User},
    services::search,
};

use super::{ContactStore, UserStore};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    contacts: HashMap<Uuid, Contact>,
    tags: HashMap<Uuid, Tag>,
    contact_tags: HashSet<(Uuid, Uuid)>,
}

impl Tables {
    fn tag_names(&self, contact_id: Uuid) -> Vec<String> {
        let mut names: Vec<String> = self
            .contact_tags
            .iter()
            .filter(|(cid, _)| *cid == contact_id)
            .filter_map(|(_, tag_id)| self.tags.get(tag_id))
            .map(|tag| tag.name.clone())
            .collect();
        names.sort();
        names
    }

    fn with_tags(&self, contact: &Contact) -> ContactWithTags {
        ContactWithTags {
            contact: contact.clone(),
            tags: self.tag_names(contact.id),
        }
    }

    fn owned(&self, owner_id: Uuid, id: Uuid) -> Option<&Contact> {
        self.contacts.get(&id).filter(|c| c.owner_id == owner_id)
    }

    fn owned_contacts(&self, owner_id: Uuid) -> Vec<ContactWithTags> {
        let mut contacts: Vec<ContactWithTags> = self
            .contacts
            .values()
            .filter(|c| c.owner_id == owner_id)
            .map(|c| self.with_tags(c))
            .collect();
        contacts.sort_by(search::compare_recent);
        contacts
    }

    fn tag_id_for(&mut self, owner_id: Uuid, name: &str) -> Uuid {
        if let Some(tag) = self
            .tags
            .values()
            .find(|t| t.owner_id == owner_id && t.name == name)
        {
            return tag.id;
        }

        let tag = Tag {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let id = tag.id;
        self.tags.insert(id, tag);
        id
    }

    fn replace_tags(&mut self, owner_id: Uuid, contact_id: Uuid, names: &[String]) {
        self.contact_tags.retain(|(cid, _)| *cid != contact_id);
        for name in names {
            let tag_id = self.tag_id_for(owner_id, name);
            self.contact_tags.insert((contact_id, tag_id));
        }
    }
}

fn apply_draft(contact: &mut Contact, draft: &ContactDraft) {
    contact.name = draft.name.clone();
    contact.email = draft.email.clone();
    contact.phone = draft.phone.clone();
    contact.company = draft.company.clone();
    contact.position = draft.position.clone();
    contact.notes = draft.notes.clone();
    contact.avatar = draft.avatar.clone();
    contact.favorite = draft.favorite;
    contact.last_contact = draft.last_contact;
}

/// In-process store. All tables live behind one lock, so each operation is
/// atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of join rows referencing a contact.
    pub async fn link_count(&self, contact_id: Uuid) -> usize {
        let tables = self.tables.read().await;
        tables
            .contact_tags
            .iter()
            .filter(|(cid, _)| *cid == contact_id)
            .count()
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list_contacts(&self, owner_id: Uuid) -> AppResult<Vec<ContactWithTags>> {
        let tables = self.tables.read().await;
        Ok(tables.owned_contacts(owner_id))
    }

    async fn find_contact(&self, owner_id: Uuid, id: Uuid) -> AppResult<Option<ContactWithTags>> {
        let tables = self.tables.read().await;
        Ok(tables.owned(owner_id, id).map(|c| tables.with_tags(c)))
    }

    async fn insert_contact(&self, owner_id: Uuid, draft: &ContactDraft) -> AppResult<ContactWithTags> {
        let mut tables = self.tables.write().await;

        let now = Utc::now();
        let mut contact = Contact {
            id: Uuid::new_v4(),
            owner_id,
            name: String::new(),
            email: String::new(),
            phone: None,
            company: None,
            position: None,
            notes: None,
            avatar: None,
            favorite: false,
            last_contact: None,
            created_at: now,
            updated_at: now,
        };
        apply_draft(&mut contact, draft);

        let id = contact.id;
        tables.contacts.insert(id, contact);
        tables.replace_tags(owner_id, id, &draft.tags);

        let created = &tables.contacts[&id];
        Ok(tables.with_tags(created))
    }

    async fn update_contact(
        &self,
        owner_id: Uuid,
        id: Uuid,
        draft: &ContactDraft,
    ) -> AppResult<Option<ContactWithTags>> {
        let mut tables = self.tables.write().await;

        let Some(contact) = tables
            .contacts
            .get_mut(&id)
            .filter(|c| c.owner_id == owner_id)
        else {
            return Ok(None);
        };
        apply_draft(contact, draft);
        contact.updated_at = Utc::now();

        tables.replace_tags(owner_id, id, &draft.tags);
        Ok(tables.owned(owner_id, id).map(|c| tables.with_tags(c)))
    }

    async fn set_favorite(
        &self,
        owner_id: Uuid,
        id: Uuid,
        favorite: bool,
    ) -> AppResult<Option<ContactWithTags>> {
        let mut tables = self.tables.write().await;

        let Some(contact) = tables
            .contacts
            .get_mut(&id)
            .filter(|c| c.owner_id == owner_id)
        else {
            return Ok(None);
        };
        contact.favorite = favorite;
        contact.updated_at = Utc::now();

        Ok(tables.owned(owner_id, id).map(|c| tables.with_tags(c)))
    }

    async fn delete_contact(&self, owner_id: Uuid, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.owned(owner_id, id).is_none() {
            return Ok(false);
        }
        tables.contacts.remove(&id);
        tables.contact_tags.retain(|(cid, _)| *cid != id);
        Ok(true)
    }

    async fn search_contacts(&self, owner_id: Uuid, term: &str) -> AppResult<Vec<ContactWithTags>> {
        let tables = self.tables.read().await;
        Ok(tables
            .owned_contacts(owner_id)
            .into_iter()
            .filter(|c| search::matches(c, term))
            .collect())
    }

    async fn list_tags(&self, owner_id: Uuid) -> AppResult<Vec<TagUsage>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<TagUsage> = tables
            .tags
            .values()
            .filter(|t| t.owner_id == owner_id)
            .map(|t| TagUsage {
                id: t.id,
                name: t.name.clone(),
                contact_count: tables
                    .contact_tags
                    .iter()
                    .filter(|(_, tag_id)| *tag_id == t.id)
                    .count() as i64,
                created_at: t.created_at,
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn delete_unused_tags(&self, owner_id: Uuid) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let referenced: HashSet<Uuid> = tables.contact_tags.iter().map(|(_, t)| *t).collect();
        let before = tables.tags.len();
        tables
            .tags
            .retain(|id, tag| tag.owner_id != owner_id || referenced.contains(id));
        Ok((before - tables.tags.len()) as u64)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, email: &str, password_hash: &str) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(AppError::UserAlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_session(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<Session> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            expires_at,
            last_used_at: now,
            created_at: now,
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> AppResult<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.get(&id).cloned())
    }

    async fn extend_session(&self, id: Uuid, expires_at: DateTime<Utc>) -> AppResult<Option<Session>> {
        let mut tables = self.tables.write().await;
        Ok(tables.sessions.get_mut(&id).map(|session| {
            session.expires_at = expires_at;
            session.last_used_at = Utc::now();
            session.clone()
        }))
    }

    async fn delete_session(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.sessions.remove(&id).is_some())
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.sessions.len();
        tables.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - tables.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, tags: &[&str]) -> ContactDraft {
        ContactDraft {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: None,
            company: None,
            position: None,
            notes: None,
            avatar: None,
            favorite: false,
            last_contact: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn tags_are_reused_per_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        store.insert_contact(owner, &draft("Alex", &["client"])).await.unwrap();
        store.insert_contact(owner, &draft("Casey", &["client"])).await.unwrap();
        store.insert_contact(Uuid::new_v4(), &draft("Other", &["client"])).await.unwrap();

        let tags = store.list_tags(owner).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "client");
        assert_eq!(tags[0].contact_count, 2);
    }

    #[tokio::test]
    async fn delete_cascades_to_links_only() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let alex = store
            .insert_contact(owner, &draft("Alex", &["client", "tech"]))
            .await
            .unwrap();
        assert_eq!(store.link_count(alex.contact.id).await, 2);

        assert!(store.delete_contact(owner, alex.contact.id).await.unwrap());
        assert_eq!(store.link_count(alex.contact.id).await, 0);
        assert_eq!(store.list_tags(owner).await.unwrap().len(), 2);
        assert!(!store.delete_contact(owner, alex.contact.id).await.unwrap());
    }

    #[tokio::test]
    async fn unused_tags_are_pruned_for_owner_only() {
        let store = MemoryStore::new();
        let (owner, other) = (Uuid::new_v4(), Uuid::new_v4());
        let alex = store.insert_contact(owner, &draft("Alex", &["a", "b"])).await.unwrap();
        let sam = store.insert_contact(other, &draft("Sam", &["a"])).await.unwrap();
        store
            .update_contact(owner, alex.contact.id, &draft("Alex", &["b"]))
            .await
            .unwrap();
        store.delete_contact(other, sam.contact.id).await.unwrap();

        assert_eq!(store.delete_unused_tags(owner).await.unwrap(), 1);
        let names: Vec<String> = store
            .list_tags(owner)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["b".to_string()]);
        assert_eq!(store.list_tags(other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn sessions_lifecycle() {
        let store = MemoryStore::new();
        let user = store.insert_user("alex@example.com", "hash").await.unwrap();
        assert!(matches!(
            store.insert_user("alex@example.com", "hash").await,
            Err(AppError::UserAlreadyExists)
        ));

        let expires = Utc::now() + chrono::Duration::hours(1);
        let first = store.insert_session(user.id, expires).await.unwrap();
        store.insert_session(user.id, expires).await.unwrap();

        assert!(store.delete_session(first.id).await.unwrap());
        assert!(store.find_session(first.id).await.unwrap().is_none());
        assert_eq!(store.delete_user_sessions(user.id).await.unwrap(), 1);
    }
}
