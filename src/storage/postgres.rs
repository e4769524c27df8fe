use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, Executor, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{Contact, ContactDraft, ContactWithTags, Session, TagUsage, User},
    services::search::like_pattern,
};

use super::{ContactStore, UserStore};

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Connects with the configured pool size and applies pending migrations.
    pub async fn connect(config: &Config) -> AppResult<Self> {
        let db = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database_url())
            .await?;
        tracing::info!("Connected to PostgreSQL");

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
        tracing::info!("Database migrations completed");

        Ok(Self::new(db))
    }
}

/// Annotates contact rows with their tag names, alphabetically.
async fn attach_tags<'e, E>(executor: E, contacts: Vec<Contact>) -> AppResult<Vec<ContactWithTags>>
where
    E: Executor<'e, Database = Postgres>,
{
    if contacts.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = contacts.iter().map(|c| c.id).collect();
    let rows: Vec<(Uuid, String)> = sqlx::query_as(
        r#"
        SELECT ct.contact_id, t.name
        FROM contact_tags ct
        JOIN tags t ON t.id = ct.tag_id
        WHERE ct.contact_id = ANY($1)
        ORDER BY t.name
        "#,
    )
    .bind(&ids)
    .fetch_all(executor)
    .await?;

    let mut by_contact: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (contact_id, name) in rows {
        by_contact.entry(contact_id).or_default().push(name);
    }

    Ok(contacts
        .into_iter()
        .map(|contact| {
            let tags = by_contact.remove(&contact.id).unwrap_or_default();
            ContactWithTags { contact, tags }
        })
        .collect())
}

async fn single_with_tags<'e, E>(executor: E, contact: Contact) -> AppResult<ContactWithTags>
where
    E: Executor<'e, Database = Postgres>,
{
    attach_tags(executor, vec![contact])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("contact row vanished while loading tags")))
}

/// Drops every tag link of a contact and relinks it to `names`, reusing the
/// owner's existing tags and creating the missing ones.
async fn replace_tags(
    conn: &mut PgConnection,
    owner_id: Uuid,
    contact_id: Uuid,
    names: &[String],
) -> AppResult<()> {
    sqlx::query("DELETE FROM contact_tags WHERE contact_id = $1")
        .bind(contact_id)
        .execute(&mut *conn)
        .await?;

    for name in names {
        let existing: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM tags WHERE owner_id = $1 AND name = $2")
                .bind(owner_id)
                .bind(name)
                .fetch_optional(&mut *conn)
                .await?;

        let tag_id = match existing {
            Some(id) => id,
            None => {
                sqlx::query_scalar(
                    r#"
                    INSERT INTO tags (id, owner_id, name)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (owner_id, name) DO UPDATE SET name = EXCLUDED.name
                    RETURNING id
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(owner_id)
                .bind(name)
                .fetch_one(&mut *conn)
                .await?
            }
        };

        sqlx::query(
            "INSERT INTO contact_tags (contact_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(contact_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl ContactStore for PgStore {
    async fn list_contacts(&self, owner_id: Uuid) -> AppResult<Vec<ContactWithTags>> {
        let contacts: Vec<Contact> = sqlx::query_as(
            "SELECT * FROM contacts WHERE owner_id = $1 ORDER BY updated_at DESC, created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        attach_tags(&self.db, contacts).await
    }

    async fn find_contact(&self, owner_id: Uuid, id: Uuid) -> AppResult<Option<ContactWithTags>> {
        let contact: Option<Contact> =
            sqlx::query_as("SELECT * FROM contacts WHERE id = $1 AND owner_id = $2")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;

        match contact {
            Some(contact) => Ok(Some(single_with_tags(&self.db, contact).await?)),
            None => Ok(None),
        }
    }

    async fn insert_contact(&self, owner_id: Uuid, draft: &ContactDraft) -> AppResult<ContactWithTags> {
        let mut tx = self.db.begin().await?;

        let contact: Contact = sqlx::query_as(
            r#"
            INSERT INTO contacts
                (id, owner_id, name, email, phone, company, position, notes, avatar, favorite, last_contact, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.company)
        .bind(&draft.position)
        .bind(&draft.notes)
        .bind(&draft.avatar)
        .bind(draft.favorite)
        .bind(draft.last_contact)
        .fetch_one(&mut *tx)
        .await?;

        replace_tags(&mut tx, owner_id, contact.id, &draft.tags).await?;
        let created = single_with_tags(&mut *tx, contact).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_contact(
        &self,
        owner_id: Uuid,
        id: Uuid,
        draft: &ContactDraft,
    ) -> AppResult<Option<ContactWithTags>> {
        let mut tx = self.db.begin().await?;

        let contact: Option<Contact> = sqlx::query_as(
            r#"
            UPDATE contacts
            SET name = $3,
                email = $4,
                phone = $5,
                company = $6,
                position = $7,
                notes = $8,
                avatar = $9,
                favorite = $10,
                last_contact = $11,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(&draft.name)
        .bind(&draft.email)
        .bind(&draft.phone)
        .bind(&draft.company)
        .bind(&draft.position)
        .bind(&draft.notes)
        .bind(&draft.avatar)
        .bind(draft.favorite)
        .bind(draft.last_contact)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(contact) = contact else {
            return Ok(None);
        };

        replace_tags(&mut tx, owner_id, contact.id, &draft.tags).await?;
        let updated = single_with_tags(&mut *tx, contact).await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn set_favorite(
        &self,
        owner_id: Uuid,
        id: Uuid,
        favorite: bool,
    ) -> AppResult<Option<ContactWithTags>> {
        let contact: Option<Contact> = sqlx::query_as(
            r#"
            UPDATE contacts
            SET favorite = $3, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(favorite)
        .fetch_optional(&self.db)
        .await?;

        match contact {
            Some(contact) => Ok(Some(single_with_tags(&self.db, contact).await?)),
            None => Ok(None),
        }
    }

    async fn delete_contact(&self, owner_id: Uuid, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_contacts(&self, owner_id: Uuid, term: &str) -> AppResult<Vec<ContactWithTags>> {
        let pattern = like_pattern(term);

        let contacts: Vec<Contact> = sqlx::query_as(
            r#"
            SELECT c.* FROM contacts c
            WHERE c.owner_id = $1
              AND (
                c.name ILIKE $2
                OR c.email ILIKE $2
                OR c.company ILIKE $2
                OR c.position ILIKE $2
                OR c.phone ILIKE $2
                OR EXISTS (
                    SELECT 1 FROM contact_tags ct
                    JOIN tags t ON t.id = ct.tag_id
                    WHERE ct.contact_id = c.id AND t.name ILIKE $2
                )
              )
            ORDER BY c.updated_at DESC, c.created_at DESC
            "#,
        )
        .bind(owner_id)
        .bind(&pattern)
        .fetch_all(&self.db)
        .await?;

        attach_tags(&self.db, contacts).await
    }

    async fn list_tags(&self, owner_id: Uuid) -> AppResult<Vec<TagUsage>> {
        let tags: Vec<TagUsage> = sqlx::query_as(
            r#"
            SELECT t.id, t.name, COUNT(ct.contact_id) AS contact_count, t.created_at
            FROM tags t
            LEFT JOIN contact_tags ct ON ct.tag_id = t.id
            WHERE t.owner_id = $1
            GROUP BY t.id
            ORDER BY t.name
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(tags)
    }

    async fn delete_unused_tags(&self, owner_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM tags t
            WHERE t.owner_id = $1
              AND NOT EXISTS (SELECT 1 FROM contact_tags ct WHERE ct.tag_id = t.id)
            "#,
        )
        .bind(owner_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, email: &str, password_hash: &str) -> AppResult<User> {
        sqlx::query_as(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UserAlreadyExists;
                }
            }
            AppError::Database(e)
        })
    }

    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;
        Ok(user)
    }

    async fn insert_session(&self, user_id: Uuid, expires_at: DateTime<Utc>) -> AppResult<Session> {
        let session = sqlx::query_as(
            r#"
            INSERT INTO sessions (id, user_id, expires_at, last_used_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.db)
        .await?;
        Ok(session)
    }

    async fn find_session(&self, id: Uuid) -> AppResult<Option<Session>> {
        let session = sqlx::query_as("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(session)
    }

    async fn extend_session(&self, id: Uuid, expires_at: DateTime<Utc>) -> AppResult<Option<Session>> {
        let session = sqlx::query_as(
            "UPDATE sessions SET expires_at = $2, last_used_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(expires_at)
        .fetch_optional(&self.db)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
