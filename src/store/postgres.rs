use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::models::Subscription;
use super::SubscriptionStore;
use crate::errors::StoreError;

/// Postgres-backed `push_subscriptions` table (schema in `migrations/`).
#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn upsert(
        &self,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
        topics: &[String],
    ) -> Result<bool, StoreError> {
        // `xmax = 0` is the standard Postgres tell for "this row was just
        // inserted" vs. "this row already existed and was updated" within
        // a single atomic INSERT ... ON CONFLICT statement.
        let row: (bool,) = sqlx::query_as(
            r#"
            INSERT INTO push_subscriptions (endpoint, p256dh, auth, topics, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            ON CONFLICT (endpoint) DO UPDATE SET
                p256dh = EXCLUDED.p256dh,
                auth = EXCLUDED.auth,
                topics = EXCLUDED.topics,
                updated_at = NOW()
            RETURNING (xmax = 0) AS created
            "#,
        )
        .bind(endpoint)
        .bind(p256dh)
        .bind(auth)
        .bind(topics)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
            .bind(endpoint)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_topics(&self, endpoint: &str) -> Result<Option<Vec<String>>, StoreError> {
        let row: Option<(Vec<String>,)> =
            sqlx::query_as("SELECT topics FROM push_subscriptions WHERE endpoint = $1")
                .bind(endpoint)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    async fn get_subscription(&self, endpoint: &str) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query_as::<_, Subscription>(
            "SELECT endpoint, p256dh, auth, topics, created_at, updated_at \
             FROM push_subscriptions WHERE endpoint = $1",
        )
        .bind(endpoint)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_for_topic(&self, topic: &str) -> Result<Vec<Subscription>, StoreError> {
        let rows = sqlx::query_as::<_, Subscription>(
            "SELECT endpoint, p256dh, auth, topics, created_at, updated_at \
             FROM push_subscriptions WHERE $1 = ANY(topics)",
        )
        .bind(topic)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
