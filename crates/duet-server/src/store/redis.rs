//! Redis-backed presence store.
//!
//! Set operations and publishes share one multiplexed connection. Each
//! subscription opens its own pub/sub connection, which is closed when the
//! returned stream is dropped.

use async_trait::async_trait;
use futures::StreamExt;
use redis::{
    AsyncCommands, Client, ConnectionAddr, ConnectionInfo, RedisConnectionInfo,
    aio::MultiplexedConnection,
};

use super::{PresenceStore, StoreError, Subscription};
use crate::config::RedisConfig;

/// [`PresenceStore`] on a shared Redis instance.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect and authenticate.
    ///
    /// Opening the multiplexed connection performs `AUTH` and `SELECT`, so bad
    /// credentials or an unreachable host fail here rather than on first use.
    pub async fn connect(config: &RedisConfig) -> Result<Self, StoreError> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.db,
                username: Some(config.username.clone()),
                password: Some(config.password.clone()),
                ..Default::default()
            },
        };

        let client = Client::open(info)?;
        let conn = client.get_multiplexed_async_connection().await?;
        tracing::info!(host = %config.host, port = config.port, db = config.db, "connected to redis");

        Ok(Self { client, conn })
    }
}

#[async_trait]
impl PresenceStore for RedisStore {
    async fn add(&self, set: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.sadd::<_, _, ()>(set, member).await?;
        Ok(())
    }

    async fn remove(&self, set: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.srem::<_, _, ()>(set, member).await?;
        Ok(())
    }

    async fn members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(set).await?)
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;

        let channel = channel.to_owned();
        let stream = pubsub.into_on_message().filter_map(move |msg| {
            let payload = msg.get_payload::<String>();
            let channel = channel.clone();
            async move {
                match payload {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        tracing::warn!(%channel, error = %e, "dropping non-utf8 pub/sub payload");
                        None
                    },
                }
            }
        });

        Ok(stream.boxed())
    }
}
