use crate::modules::customer::repository::Profile;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cache backend unavailable: {0}")]
    Backend(String),
    #[error("cached payer could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Backend(err.to_string())
    }
}

pub fn key(order_id: &str) -> String {
    format!("payer:{}", order_id)
}

/// Short-lived payer details keyed by order id.
///
/// Informational only, the order row stays the source of truth.
#[async_trait]
pub trait PendingCheckoutCache: Send + Sync {
    async fn save(&self, order_id: &str, payer: &Profile) -> Result<()>;
    async fn recover(&self, order_id: &str) -> Result<Option<Profile>>;
    async fn invalidate(&self, order_id: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct RedisPendingCheckoutCache {
    client: redis::Client,
}

impl RedisPendingCheckoutCache {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PendingCheckoutCache for RedisPendingCheckoutCache {
    async fn save(&self, order_id: &str, payer: &Profile) -> Result<()> {
        let value = serde_json::to_string(payer)?;
        let mut conn = self.client.get_async_connection().await?;
        redis::cmd("SET")
            .arg(key(order_id))
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn recover(&self, order_id: &str) -> Result<Option<Profile>> {
        let mut conn = self.client.get_async_connection().await?;
        let value: Option<String> = redis::cmd("GET")
            .arg(key(order_id))
            .query_async(&mut conn)
            .await?;

        match value {
            Some(value) => Ok(Some(serde_json::from_str(&value)?)),
            None => Ok(None),
        }
    }

    async fn invalidate(&self, order_id: &str) -> Result<()> {
        let mut conn = self.client.get_async_connection().await?;
        redis::cmd("DEL")
            .arg(key(order_id))
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

/// Process-local fallback used when no `REDIS_URL` is configured.
#[derive(Clone, Default)]
pub struct InMemoryPendingCheckoutCache {
    store: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryPendingCheckoutCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingCheckoutCache for InMemoryPendingCheckoutCache {
    async fn save(&self, order_id: &str, payer: &Profile) -> Result<()> {
        let value = serde_json::to_string(payer)?;
        self.store.write().await.insert(key(order_id), value);
        Ok(())
    }

    async fn recover(&self, order_id: &str) -> Result<Option<Profile>> {
        match self.store.read().await.get(&key(order_id)) {
            Some(value) => Ok(Some(serde_json::from_str(value)?)),
            None => Ok(None),
        }
    }

    async fn invalidate(&self, order_id: &str) -> Result<()> {
        self.store.write().await.remove(&key(order_id));
        Ok(())
    }
}

/// Picks Redis when a url is configured, otherwise the in-memory store.
pub fn connect(redis_url: Option<&str>) -> Arc<dyn PendingCheckoutCache> {
    match redis_url {
        Some(url) => match RedisPendingCheckoutCache::new(url) {
            Ok(cache) => return Arc::new(cache),
            Err(err) => {
                tracing::warn!(
                    "Failed to set up redis cache, falling back to in-memory cache: {}",
                    err
                );
            }
        },
        None => tracing::info!("REDIS_URL not set, using in-memory pending checkout cache"),
    }

    Arc::new(InMemoryPendingCheckoutCache::new())
}
