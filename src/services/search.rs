use std::cmp::Ordering;

use serde::Deserialize;

use crate::models::ContactWithTags;

pub const DEFAULT_RECENT_LIMIT: usize = 5;
pub const MAX_RECENT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactSort {
    /// Most recently updated first.
    #[default]
    Recent,
    /// Case-insensitive by name.
    Name,
    /// Newest first.
    Created,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListOptions {
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub sort: ContactSort,
}

/// Returns the trimmed, lowercased search term, or `None` for a blank query.
pub fn search_term(query: &str) -> Option<String> {
    let term = query.trim();
    if term.is_empty() {
        None
    } else {
        Some(term.to_lowercase())
    }
}

/// Case-insensitive substring match across the searchable fields and tag names.
/// `term` must already be lowercased.
pub fn matches(entry: &ContactWithTags, term: &str) -> bool {
    let contact = &entry.contact;
    let hit = |value: &str| value.to_lowercase().contains(term);

    hit(&contact.name)
        || hit(&contact.email)
        || contact.company.as_deref().is_some_and(hit)
        || contact.position.as_deref().is_some_and(hit)
        || contact.phone.as_deref().is_some_and(hit)
        || entry.tags.iter().any(|tag| hit(tag.as_str()))
}

/// Wraps a term in `%` for a LIKE/ILIKE query, escaping the wildcard characters
/// so they match literally.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn compare_recent(a: &ContactWithTags, b: &ContactWithTags) -> Ordering {
    b.contact
        .updated_at
        .cmp(&a.contact.updated_at)
        .then_with(|| b.contact.created_at.cmp(&a.contact.created_at))
        .then_with(|| a.contact.id.cmp(&b.contact.id))
}

pub fn sort_contacts(contacts: &mut [ContactWithTags], sort: ContactSort) {
    match sort {
        ContactSort::Recent => contacts.sort_by(compare_recent),
        ContactSort::Name => contacts.sort_by(|a, b| {
            a.contact
                .name
                .to_lowercase()
                .cmp(&b.contact.name.to_lowercase())
                .then_with(|| compare_recent(a, b))
        }),
        ContactSort::Created => contacts.sort_by(|a, b| {
            b.contact
                .created_at
                .cmp(&a.contact.created_at)
                .then_with(|| compare_recent(a, b))
        }),
    }
}

pub fn apply_options(mut contacts: Vec<ContactWithTags>, options: ListOptions) -> Vec<ContactWithTags> {
    if options.favorite {
        contacts.retain(|c| c.contact.favorite);
    }
    sort_contacts(&mut contacts, options.sort);
    contacts
}

pub fn clamp_recent_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT)
}
