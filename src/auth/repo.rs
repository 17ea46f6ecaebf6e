use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, StoreError, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    /// Fails with `StoreError::Duplicate` when the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    /// Find a user by email.
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, avatar, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    /// Insert relies on the unique index over `email`.
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, avatar)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, avatar, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    /// Profiles go with the user through `ON DELETE CASCADE`.
    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}


/// Run with `cargo test -- --ignored` and `DATABASE_URL` pointing at a Postgres server;
/// each test gets a fresh migrated database.
#[cfg(test)]
mod pg_tests {
    use sqlx::PgPool;

    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "A".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
            avatar: "https://example.com/a.png".into(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn create_then_find(pool: PgPool) {
        let store = PgUserStore::new(pool);
        let created = store.create(new_user("a@x.com")).await.unwrap();

        let by_email = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.password_hash, "$argon2id$stub");
        assert!(store.find_by_id(created.id).await.unwrap().is_some());
        assert!(store.find_by_email("b@x.com").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn unique_violation_maps_to_duplicate(pool: PgPool) {
        let store = PgUserStore::new(pool);
        store.create(new_user("dup@x.com")).await.unwrap();
        let err = store.create(new_user("dup@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn concurrent_creates_admit_one(pool: PgPool) {
        let store = PgUserStore::new(pool);
        let (a, b) = tokio::join!(
            store.create(new_user("race@x.com")),
            store.create(new_user("race@x.com")),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert!(matches!(a.err().or(b.err()), Some(StoreError::Duplicate)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn delete_removes_user(pool: PgPool) {
        let store = PgUserStore::new(pool);
        let created = store.create(new_user("a@x.com")).await.unwrap();
        store.delete(created.id).await.unwrap();
        assert!(store.find_by_id(created.id).await.unwrap().is_none());
        // deleting again is a no-op
        store.delete(created.id).await.unwrap();
    }
}
