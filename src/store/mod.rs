pub mod models;
pub mod postgres;

pub use models::Subscription;
pub use postgres::PgSubscriptionStore;

use crate::errors::StoreError;
use async_trait::async_trait;

/// Persistent CRUD on subscriptions with endpoint-keyed upsert semantics.
///
/// A trait (rather than a bare struct) so HTTP-surface tests can swap in
/// an in-memory double without touching a real Postgres instance.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Inserts or, on endpoint collision, replaces credentials and topics.
    /// Returns whether a new row was created.
    async fn upsert(
        &self,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
        topics: &[String],
    ) -> Result<bool, StoreError>;

    /// Idempotent: no error if the endpoint is absent.
    async fn delete_by_endpoint(&self, endpoint: &str) -> Result<(), StoreError>;

    async fn get_topics(&self, endpoint: &str) -> Result<Option<Vec<String>>, StoreError>;

    async fn get_subscription(&self, endpoint: &str) -> Result<Option<Subscription>, StoreError>;

    /// Every subscription whose topic set contains `topic`. Order is unspecified.
    async fn list_for_topic(&self, topic: &str) -> Result<Vec<Subscription>, StoreError>;
}
