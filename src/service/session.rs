use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub admin_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionService: Send + Sync {
    /// Returns the opaque token handed to the client.
    async fn create(&self, admin_id: Uuid) -> Result<String, SessionError>;
    async fn get(&self, token: &str) -> Result<Option<SessionData>, SessionError>;
    async fn delete(&self, token: &str) -> Result<(), SessionError>;
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

// Only the digest is kept server-side.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct RedisSessionService {
    conn: Arc<Mutex<MultiplexedConnection>>,
    ttl_seconds: u64,
    key_prefix: String,
}

impl RedisSessionService {
    pub async fn new(
        redis_url: &str,
        ttl_seconds: u64,
        key_prefix: String,
    ) -> Result<Self, SessionError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            ttl_seconds,
            key_prefix,
        })
    }

    fn key(&self, token: &str) -> String {
        format!("{}:session:{}", self.key_prefix, hash_token(token))
    }
}

#[async_trait]
impl SessionService for RedisSessionService {
    async fn create(&self, admin_id: Uuid) -> Result<String, SessionError> {
        let token = generate_token();
        let payload = SessionData {
            admin_id,
            created_at: Utc::now(),
        };
        let value = serde_json::to_string(&payload)?;

        let mut conn = self.conn.lock().await;
        let key = self.key(&token);
        conn.set_ex::<_, _, ()>(key, value, self.ttl_seconds).await?;
        Ok(token)
    }

    async fn get(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let mut conn = self.conn.lock().await;
        let key = self.key(token);
        let value: Option<String> = conn.get(key).await?;
        let Some(value) = value else {
            return Ok(None);
        };
        let session = serde_json::from_str(&value)?;
        Ok(Some(session))
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        let mut conn = self.conn.lock().await;
        let key = self.key(token);
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

/// Process-local sessions, used when no redis is configured.
pub struct MemorySessionService {
    sessions: Mutex<HashMap<String, SessionData>>,
    ttl: Duration,
}

impl MemorySessionService {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(i64::try_from(ttl_seconds).unwrap_or(i64::MAX)),
        }
    }

    fn expired(&self, session: &SessionData, now: DateTime<Utc>) -> bool {
        session
            .created_at
            .checked_add_signed(self.ttl)
            .map_or(false, |expires_at| expires_at <= now)
    }
}

#[async_trait]
impl SessionService for MemorySessionService {
    async fn create(&self, admin_id: Uuid) -> Result<String, SessionError> {
        let token = generate_token();
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, session| !self.expired(session, now));
        sessions.insert(
            hash_token(&token),
            SessionData {
                admin_id,
                created_at: now,
            },
        );
        Ok(token)
    }

    async fn get(&self, token: &str) -> Result<Option<SessionData>, SessionError> {
        let key = hash_token(token);
        let mut sessions = self.sessions.lock().await;
        let Some(session) = sessions.get(&key).cloned() else {
            return Ok(None);
        };
        if self.expired(&session, Utc::now()) {
            sessions.remove(&key);
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn delete(&self, token: &str) -> Result<(), SessionError> {
        self.sessions.lock().await.remove(&hash_token(token));
        Ok(())
    }
}
