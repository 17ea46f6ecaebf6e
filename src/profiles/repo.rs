use anyhow::Context;
use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::profiles::repo_types::{Education, Experience, Profile, ProfileFields, ProfileRow};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;
    async fn list(&self) -> anyhow::Result<Vec<Profile>>;
    /// Creates the user's profile or updates it in place.
    async fn upsert(&self, user_id: Uuid, fields: ProfileFields) -> anyhow::Result<Profile>;
    async fn delete_by_user(&self, user_id: Uuid) -> anyhow::Result<()>;

    /// Entry-list operations return `None` when the user has no profile.
    async fn add_experience(&self, user_id: Uuid, entry: Experience) -> anyhow::Result<Option<Profile>>;
    async fn remove_experience(&self, user_id: Uuid, entry_id: &str) -> anyhow::Result<Option<Profile>>;
    async fn add_education(&self, user_id: Uuid, entry: Education) -> anyhow::Result<Option<Profile>>;
    async fn remove_education(&self, user_id: Uuid, entry_id: &str) -> anyhow::Result<Option<Profile>>;
}

const PROFILE_SELECT: &str = r#"
    SELECT p.id, p.user_id, u.name AS user_name, u.avatar AS user_avatar,
           p.company, p.website, p.location, p.status, p.skills, p.bio,
           p.githubusername, p.social, p.experience, p.education, p.created_at
    FROM profiles p
    JOIN users u ON u.id = p.user_id
"#;

/// JSONB list columns holding nested entries.
#[derive(Debug, Clone, Copy)]
enum Section {
    Experience,
    Education,
}

impl Section {
    fn column(self) -> &'static str {
        match self {
            Section::Experience => "experience",
            Section::Education => "education",
        }
    }
}

#[derive(Clone)]
pub struct PgProfileStore {
    db: PgPool,
}

impl PgProfileStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn prepend(
        &self,
        user_id: Uuid,
        section: Section,
        entry: serde_json::Value,
    ) -> anyhow::Result<Option<Profile>> {
        let sql = format!(
            "UPDATE profiles SET {col} = jsonb_build_array($2::jsonb) || {col} WHERE user_id = $1",
            col = section.column()
        );
        let res = sqlx::query(&sql)
            .bind(user_id)
            .bind(Json(entry))
            .execute(&self.db)
            .await
            .with_context(|| format!("prepend {}", section.column()))?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_user(user_id).await
    }

    async fn remove(
        &self,
        user_id: Uuid,
        section: Section,
        entry_id: &str,
    ) -> anyhow::Result<Option<Profile>> {
        let sql = format!(
            r#"
            UPDATE profiles SET {col} = COALESCE(
                (SELECT jsonb_agg(e.value ORDER BY e.idx)
                   FROM jsonb_array_elements({col}) WITH ORDINALITY AS e(value, idx)
                  WHERE e.value->>'id' <> $2),
                '[]'::jsonb)
            WHERE user_id = $1
            "#,
            col = section.column()
        );
        let res = sqlx::query(&sql)
            .bind(user_id)
            .bind(entry_id)
            .execute(&self.db)
            .await
            .with_context(|| format!("remove from {}", section.column()))?;
        if res.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_user(user_id).await
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_user(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!("{PROFILE_SELECT} WHERE p.user_id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("find profile by user")?;
        Ok(row.map(Profile::from))
    }

    async fn list(&self) -> anyhow::Result<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "{PROFILE_SELECT} ORDER BY p.created_at DESC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list profiles")?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    /// Single statement keyed by the unique `user_id` index, so concurrent calls cannot
    /// create two profiles for one user.
    async fn upsert(&self, user_id: Uuid, fields: ProfileFields) -> anyhow::Result<Profile> {
        sqlx::query(
            r#"
            INSERT INTO profiles
                (id, user_id, company, website, location, status, skills, bio, githubusername, social)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE SET
                company        = COALESCE(EXCLUDED.company, profiles.company),
                website        = COALESCE(EXCLUDED.website, profiles.website),
                location       = COALESCE(EXCLUDED.location, profiles.location),
                status         = EXCLUDED.status,
                skills         = EXCLUDED.skills,
                bio            = COALESCE(EXCLUDED.bio, profiles.bio),
                githubusername = COALESCE(EXCLUDED.githubusername, profiles.githubusername),
                social         = EXCLUDED.social
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&fields.company)
        .bind(&fields.website)
        .bind(&fields.location)
        .bind(&fields.status)
        .bind(&fields.skills)
        .bind(&fields.bio)
        .bind(&fields.githubusername)
        .bind(Json(&fields.social))
        .execute(&self.db)
        .await
        .context("upsert profile")?;

        self.find_by_user(user_id)
            .await?
            .context("profile missing after upsert")
    }

    async fn delete_by_user(&self, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await
            .context("delete profile")?;
        Ok(())
    }

    async fn add_experience(&self, user_id: Uuid, entry: Experience) -> anyhow::Result<Option<Profile>> {
        self.prepend(user_id, Section::Experience, serde_json::to_value(entry)?)
            .await
    }

    async fn remove_experience(&self, user_id: Uuid, entry_id: &str) -> anyhow::Result<Option<Profile>> {
        self.remove(user_id, Section::Experience, entry_id).await
    }

    async fn add_education(&self, user_id: Uuid, entry: Education) -> anyhow::Result<Option<Profile>> {
        self.prepend(user_id, Section::Education, serde_json::to_value(entry)?)
            .await
    }

    async fn remove_education(&self, user_id: Uuid, entry_id: &str) -> anyhow::Result<Option<Profile>> {
        self.remove(user_id, Section::Education, entry_id).await
    }
}


/// Run with `cargo test -- --ignored` and `DATABASE_URL` pointing at a Postgres server.
#[cfg(test)]
mod pg_tests {
    use sqlx::PgPool;

    use super::*;
    use crate::{
        auth::{
            repo::{PgUserStore, UserStore},
            repo_types::NewUser,
        },
        profiles::repo_types::Social,
    };

    async fn seed_user(pool: &PgPool, email: &str) -> Uuid {
        PgUserStore::new(pool.clone())
            .create(NewUser {
                name: "A".into(),
                email: email.into(),
                password_hash: "$argon2id$stub".into(),
                avatar: "https://example.com/a.png".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn fields(status: &str) -> ProfileFields {
        ProfileFields {
            company: Some("Acme".into()),
            status: status.into(),
            skills: vec!["rust".into(), "sql".into()],
            githubusername: Some("octocat".into()),
            social: Social {
                twitter: Some("https://twitter.com/a".into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn experience(title: &str) -> Experience {
        Experience {
            id: Uuid::new_v4(),
            title: title.into(),
            company: "Acme".into(),
            location: None,
            from: "2020-01-01".into(),
            to: None,
            current: true,
            description: None,
        }
    }

    fn education(school: &str) -> Education {
        Education {
            id: Uuid::new_v4(),
            school: school.into(),
            degree: "BSc".into(),
            fieldofstudy: "CS".into(),
            from: "2015-09-01".into(),
            to: Some("2019-06-30".into()),
            current: false,
            description: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn upsert_creates_then_updates_in_place(pool: PgPool) {
        let user_id = seed_user(&pool, "a@x.com").await;
        let store = PgProfileStore::new(pool);

        let created = store.upsert(user_id, fields("Developer")).await.unwrap();
        assert_eq!(created.user.id, user_id);
        assert_eq!(created.user.name, "A");
        assert_eq!(created.skills, ["rust", "sql"]);
        assert!(created.experience.is_empty());

        let update = ProfileFields {
            company: None,
            bio: Some("hello".into()),
            social: Social::default(),
            ..fields("Senior Developer")
        };
        let updated = store.upsert(user_id, update).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.status, "Senior Developer");
        // omitted optional fields keep their stored value
        assert_eq!(updated.company.as_deref(), Some("Acme"));
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        // social is replaced as a whole
        assert_eq!(updated.social, Social::default());

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn list_is_newest_first(pool: PgPool) {
        let first = seed_user(&pool, "a@x.com").await;
        let second = seed_user(&pool, "b@x.com").await;
        let store = PgProfileStore::new(pool);

        store.upsert(first, fields("Developer")).await.unwrap();
        store.upsert(second, fields("Developer")).await.unwrap();

        let owners: Vec<Uuid> = store.list().await.unwrap().iter().map(|p| p.user.id).collect();
        assert_eq!(owners, [second, first]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn experience_is_prepended_and_removed_by_id(pool: PgPool) {
        let user_id = seed_user(&pool, "a@x.com").await;
        let store = PgProfileStore::new(pool);
        store.upsert(user_id, fields("Developer")).await.unwrap();

        let older = experience("Junior");
        let newer = experience("Senior");
        store.add_experience(user_id, older.clone()).await.unwrap().unwrap();
        let profile = store.add_experience(user_id, newer.clone()).await.unwrap().unwrap();
        assert_eq!(profile.experience, [newer.clone(), older.clone()]);

        let unchanged = store
            .remove_experience(user_id, &Uuid::new_v4().to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.experience.len(), 2);

        let profile = store
            .remove_experience(user_id, &newer.id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.experience, [older.clone()]);

        let profile = store
            .remove_experience(user_id, &older.id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(profile.experience.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn education_is_prepended_and_removed_by_id(pool: PgPool) {
        let user_id = seed_user(&pool, "a@x.com").await;
        let store = PgProfileStore::new(pool);
        store.upsert(user_id, fields("Developer")).await.unwrap();

        let school = education("State U");
        let masters = education("Tech Institute");
        store.add_education(user_id, school.clone()).await.unwrap().unwrap();
        let profile = store.add_education(user_id, masters.clone()).await.unwrap().unwrap();
        assert_eq!(profile.education, [masters.clone(), school.clone()]);

        let profile = store
            .remove_education(user_id, &school.id.to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.education, [masters]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn entry_operations_without_profile_return_none(pool: PgPool) {
        let user_id = seed_user(&pool, "a@x.com").await;
        let store = PgProfileStore::new(pool);

        assert!(store.add_experience(user_id, experience("Dev")).await.unwrap().is_none());
        assert!(store.add_education(user_id, education("U")).await.unwrap().is_none());
        assert!(store
            .remove_experience(user_id, &Uuid::new_v4().to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn deleting_user_cascades_to_profile(pool: PgPool) {
        let user_id = seed_user(&pool, "a@x.com").await;
        let store = PgProfileStore::new(pool.clone());
        store.upsert(user_id, fields("Developer")).await.unwrap();

        PgUserStore::new(pool).delete(user_id).await.unwrap();
        assert!(store.find_by_user(user_id).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "needs Postgres"]
    async fn delete_by_user_leaves_user_in_place(pool: PgPool) {
        let user_id = seed_user(&pool, "a@x.com").await;
        let store = PgProfileStore::new(pool.clone());
        store.upsert(user_id, fields("Developer")).await.unwrap();

        store.delete_by_user(user_id).await.unwrap();
        assert!(store.find_by_user(user_id).await.unwrap().is_none());
        assert!(PgUserStore::new(pool).find_by_id(user_id).await.unwrap().is_some());
    }
}
