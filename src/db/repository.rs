//! Identity repository for mailgate.
//!
//! Insert and lookup operations for identities. Identities are never updated
//! or deleted.

use super::identity::{Identity, NewIdentity};
use super::DbPool;
use crate::{GatewayError, Result};

/// Repository for identity records.
pub struct IdentityRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> IdentityRepository<'a> {
    /// Create a new IdentityRepository with the given pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new identity.
    ///
    /// The uniqueness check and the insert are a single statement guarded by
    /// the `UNIQUE` constraint.
    /// Returns [`GatewayError::AlreadyExists`] when the key is taken.
    pub async fn create(&self, new_identity: &NewIdentity) -> Result<Identity> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO identities (identity_key, password_hash) VALUES (?, ?) RETURNING id",
        )
        .bind(&new_identity.identity_key)
        .bind(&new_identity.password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                GatewayError::AlreadyExists("identity".to_string())
            }
            other => GatewayError::Database(other.to_string()),
        })?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::Database(format!("identity {id} vanished after insert")))
    }

    /// Get an identity by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Identity>> {
        let result = sqlx::query_as::<_, Identity>(
            "SELECT id, identity_key, password_hash, created_at FROM identities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Get an identity by key (case-insensitive).
    pub async fn get_by_key(&self, identity_key: &str) -> Result<Option<Identity>> {
        let result = sqlx::query_as::<_, Identity>(
            "SELECT id, identity_key, password_hash, created_at
             FROM identities WHERE identity_key = ? COLLATE NOCASE",
        )
        .bind(identity_key)
        .fetch_optional(self.pool)
        .await?;

        Ok(result)
    }

    /// Count all identities.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM identities")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_identity() {
        let db = setup_db().await;
        let repo = IdentityRepository::new(db.pool());

        let identity = repo
            .create(&NewIdentity::new("a@x.com", "$argon2id$hash"))
            .await
            .unwrap();

        assert!(identity.id > 0);
        assert_eq!(identity.identity_key, "a@x.com");
        assert_eq!(identity.password_hash, "$argon2id$hash");
        assert!(!identity.created_at.is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_key() {
        let db = setup_db().await;
        let repo = IdentityRepository::new(db.pool());

        repo.create(&NewIdentity::new("a@x.com", "hash1"))
            .await
            .unwrap();
        let result = repo.create(&NewIdentity::new("A@X.com", "hash2")).await;

        assert!(matches!(result, Err(GatewayError::AlreadyExists(_))));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_get_by_key_case_insensitive() {
        let db = setup_db().await;
        let repo = IdentityRepository::new(db.pool());

        let created = repo
            .create(&NewIdentity::new("Mixed@Example.com", "hash"))
            .await
            .unwrap();

        let found = repo.get_by_key("mixed@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = setup_db().await;
        let repo = IdentityRepository::new(db.pool());

        assert!(repo.get_by_key("nobody@x.com").await.unwrap().is_none());
        assert!(repo.get_by_id(42).await.unwrap().is_none());
    }
}
