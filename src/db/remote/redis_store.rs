use chrono::{DateTime, Utc};
use futures::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::mpsc;

use crate::db::remote::{DocumentStore, Subscription, WatchlistDocument};
use crate::error::{AppError, AppResult};
use crate::models::{Identity, Watchlist, WatchlistEntry};

/// Creates a Redis client for watchlist documents
///
/// The client only parses the URL; connections are opened on demand.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

fn document_key(identity: &Identity) -> String {
    format!("watchlist:{}", identity)
}

fn change_channel(identity: &Identity) -> String {
    format!("watchlist:{}:changes", identity)
}

fn parse_document(json: &str) -> AppResult<WatchlistDocument> {
    serde_json::from_str(json)
        .map_err(|e| AppError::Internal(format!("Watchlist document deserialization error: {}", e)))
}

/// Watchlist documents stored as JSON strings in Redis
///
/// Each write stores the document and publishes it on the identity's
/// change channel in one MULTI block, so subscribers see every write.
#[derive(Clone)]
pub struct RedisDocumentStore {
    client: Client,
    connection: ConnectionManager,
}

impl RedisDocumentStore {
    pub async fn connect(client: Client) -> AppResult<Self> {
        let connection = ConnectionManager::new(client.clone()).await?;
        tracing::info!("Connected to Redis document store");
        Ok(Self { client, connection })
    }

    /// Timestamp from the Redis server clock
    async fn server_time(&self) -> AppResult<DateTime<Utc>> {
        let mut conn = self.connection.clone();
        let (secs, micros): (i64, u32) = redis::cmd("TIME").query_async(&mut conn).await?;
        DateTime::from_timestamp(secs, micros * 1000)
            .ok_or_else(|| AppError::Internal("Redis returned an invalid server time".to_string()))
    }
}

#[async_trait::async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn exists(&self, identity: &Identity) -> AppResult<bool> {
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(document_key(identity)).await?;
        Ok(exists)
    }

    async fn read(&self, identity: &Identity) -> AppResult<Watchlist> {
        let mut conn = self.connection.clone();
        let stored: Option<String> = conn.get(document_key(identity)).await?;

        match stored {
            Some(json) => Ok(parse_document(&json)?.items),
            None => Ok(Watchlist::new()),
        }
    }

    async fn write(&self, identity: &Identity, entries: &[WatchlistEntry]) -> AppResult<()> {
        let document = WatchlistDocument {
            items: Watchlist::from_entries(entries.to_vec()),
            updated_at: self.server_time().await?,
        };
        let json = serde_json::to_string(&document)?;

        let mut conn = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .set(document_key(identity), &json)
            .ignore()
            .publish(change_channel(identity), &json)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn subscribe(&self, identity: &Identity) -> AppResult<Subscription> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(change_channel(identity)).await?;

        // Read after subscribing so no write slips between snapshot and stream
        let current = self.read(identity).await?;

        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let _ = updates_tx.send(current);

        let identity = identity.clone();
        let listener = tokio::spawn(async move {
            let mut messages = pubsub.into_on_message();
            while let Some(msg) = messages.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!(identity = %identity, error = %e, "Unreadable change notification");
                        continue;
                    }
                };

                match parse_document(&payload) {
                    Ok(document) => {
                        if updates_tx.send(document.items).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(identity = %identity, error = %e, "Ignoring malformed change notification");
                    }
                }
            }
            tracing::debug!(identity = %identity, "Watchlist subscription closed");
        });

        Ok(Subscription::new(updates_rx, listener))
    }
}
