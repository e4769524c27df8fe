use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::ContactWithTags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    ContactList { owner_id: Uuid },
    Contact { owner_id: Uuid, contact_id: Uuid },
}

#[derive(Debug, Clone)]
enum CachedValue {
    List(Vec<ContactWithTags>),
    One(ContactWithTags),
}

#[derive(Debug)]
struct CacheEntry {
    value: CachedValue,
    stored_at: Instant,
}

/// Read-through cache for contact lookups. Entries are keyed by owner and
/// contact id and dropped explicitly after every successful mutation.
///
/// Each owner has a generation that every invalidation bumps. Readers take a
/// [`Generation`] before going to the store and their write-back is discarded
/// if the owner was invalidated in between.
pub struct ContactCache {
    inner: RwLock<Inner>,
    ttl: Duration,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    generations: HashMap<Uuid, u64>,
}

/// Snapshot of an owner's invalidation count, taken before a store read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    owner_id: Uuid,
    value: u64,
}

impl ContactCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            ttl,
        }
    }

    pub async fn generation(&self, owner_id: Uuid) -> Generation {
        let inner = self.inner.read().await;
        Generation {
            owner_id,
            value: inner.generations.get(&owner_id).copied().unwrap_or(0),
        }
    }

    pub async fn list(&self, owner_id: Uuid) -> Option<Vec<ContactWithTags>> {
        match self.fresh(CacheKey::ContactList { owner_id }).await? {
            CachedValue::List(contacts) => Some(contacts),
            CachedValue::One(_) => None,
        }
    }

    pub async fn put_list(&self, read_at: Generation, contacts: Vec<ContactWithTags>) {
        let key = CacheKey::ContactList {
            owner_id: read_at.owner_id,
        };
        self.store(read_at, key, CachedValue::List(contacts)).await;
    }

    pub async fn contact(&self, owner_id: Uuid, contact_id: Uuid) -> Option<ContactWithTags> {
        match self.fresh(CacheKey::Contact { owner_id, contact_id }).await? {
            CachedValue::One(contact) => Some(contact),
            CachedValue::List(_) => None,
        }
    }

    pub async fn put_contact(&self, read_at: Generation, contact: ContactWithTags) {
        if contact.contact.owner_id != read_at.owner_id {
            return;
        }
        let key = CacheKey::Contact {
            owner_id: read_at.owner_id,
            contact_id: contact.contact.id,
        };
        self.store(read_at, key, CachedValue::One(contact)).await;
    }

    /// Drops the entry for one contact and the owner's list, which may contain it.
    pub async fn invalidate_contact(&self, owner_id: Uuid, contact_id: Uuid) {
        let mut inner = self.inner.write().await;
        *inner.generations.entry(owner_id).or_insert(0) += 1;
        inner.entries.remove(&CacheKey::Contact { owner_id, contact_id });
        inner.entries.remove(&CacheKey::ContactList { owner_id });
        tracing::debug!("Invalidated cache for contact {}", contact_id);
    }

    async fn fresh(&self, key: CacheKey) -> Option<CachedValue> {
        let inner = self.inner.read().await;
        let entry = inner.entries.get(&key)?;
        if entry.stored_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    async fn store(&self, read_at: Generation, key: CacheKey, value: CachedValue) {
        let mut inner = self.inner.write().await;
        let current = inner.generations.get(&read_at.owner_id).copied().unwrap_or(0);
        if current != read_at.value {
            tracing::debug!("Discarding stale cache fill for {}", read_at.owner_id);
            return;
        }

        let ttl = self.ttl;
        inner.entries.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::Contact;

    fn contact(owner_id: Uuid) -> ContactWithTags {
        let now = Utc::now();
        ContactWithTags {
            contact: Contact {
                id: Uuid::new_v4(),
                owner_id,
                name: "Sam Peterson".to_string(),
                email: "sam@example.com".to_string(),
                phone: None,
                company: None,
                position: None,
                notes: None,
                avatar: None,
                favorite: false,
                last_contact: None,
                created_at: now,
                updated_at: now,
            },
            tags: vec!["analytics".to_string()],
        }
    }

    #[tokio::test]
    async fn invalidation_drops_contact_and_list() {
        let cache = ContactCache::new(Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let sam = contact(owner);
        let id = sam.contact.id;

        let generation = cache.generation(owner).await;
        cache.put_contact(generation, sam.clone()).await;
        cache.put_list(generation, vec![sam]).await;
        assert!(cache.contact(owner, id).await.is_some());
        assert_eq!(cache.list(owner).await.map(|l| l.len()), Some(1));

        cache.invalidate_contact(owner, id).await;
        assert!(cache.contact(owner, id).await.is_none());
        assert!(cache.list(owner).await.is_none());
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let cache = ContactCache::new(Duration::from_secs(60));
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let alices = contact(alice);
        let alice_id = alices.contact.id;
        cache.put_list(cache.generation(alice).await, vec![alices]).await;
        cache.put_list(cache.generation(bob).await, vec![contact(bob)]).await;

        cache.invalidate_contact(alice, alice_id).await;
        assert!(cache.list(alice).await.is_none());
        assert!(cache.list(bob).await.is_some());
    }

    #[tokio::test]
    async fn fills_read_before_an_invalidation_are_discarded() {
        let cache = ContactCache::new(Duration::from_secs(60));
        let owner = Uuid::new_v4();
        let sam = contact(owner);
        let id = sam.contact.id;

        let before = cache.generation(owner).await;
        cache.invalidate_contact(owner, id).await;
        cache.put_contact(before, sam.clone()).await;
        cache.put_list(before, vec![sam.clone()]).await;
        assert!(cache.contact(owner, id).await.is_none());
        assert!(cache.list(owner).await.is_none());

        let after = cache.generation(owner).await;
        assert_ne!(before, after);
        cache.put_contact(after, sam).await;
        assert!(cache.contact(owner, id).await.is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = ContactCache::new(Duration::ZERO);
        let owner = Uuid::new_v4();
        cache.put_list(cache.generation(owner).await, vec![]).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(cache.list(owner).await.is_none());
    }
}
