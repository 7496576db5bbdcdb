use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo_types::{User, UserProfile};

impl User {
    /// Find a user by email, hash included; sign-in needs it for
    /// password verification.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, photo, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new user row. The unique index on email backstops the
    /// orchestrator's explicit duplicate check.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        photo: Option<&str>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, photo)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, photo, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(photo)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

impl UserProfile {
    /// Point lookup by id; the projection deliberately excludes the hash.
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT id, name, email, photo
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Replace the display name; None means the row is gone.
    pub async fn update_name(
        db: &PgPool,
        id: Uuid,
        name: &str,
    ) -> anyhow::Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users SET name = $2
            WHERE id = $1
            RETURNING id, name, email, photo
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Replace the photo reference with a new filename.
    pub async fn update_photo(
        db: &PgPool,
        id: Uuid,
        photo: &str,
    ) -> anyhow::Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users SET photo = $2
            WHERE id = $1
            RETURNING id, name, email, photo
            "#,
        )
        .bind(id)
        .bind(photo)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }

    /// Drop the photo reference; the file itself is removed separately.
    pub async fn clear_photo(db: &PgPool, id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            r#"
            UPDATE users SET photo = NULL
            WHERE id = $1
            RETURNING id, name, email, photo
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(profile)
    }
}
