use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

/// Store of revoked-but-not-yet-expired token ids.
///
/// Absence of an entry means "not revoked", never "valid": signature and
/// expiry checks still run on every request.
#[async_trait]
pub trait DenyList: Send + Sync {
    /// Deny `jti` for `ttl_secs`. A zero or negative ttl means the token
    /// has already expired on its own and nothing needs to be written.
    async fn deny(&self, jti: Uuid, user_id: Uuid, ttl_secs: i64, reason: &str) -> Result<()>;

    async fn is_denied(&self, jti: Uuid) -> Result<bool>;
}

/// Metadata stored alongside a denied jti, for audits.
#[derive(Debug, Serialize)]
struct DenyEntry<'a> {
    revoked_at: i64,
    user_id: Uuid,
    reason: &'a str,
}

/// Redis-backed deny list. Entries carry a TTL equal to the remaining
/// token lifetime, so Redis expires them the moment the token itself
/// stops validating.
pub struct RedisDenyList {
    redis: ConnectionManager,
}

impl RedisDenyList {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(jti: Uuid) -> String {
        format!("denylist:{jti}")
    }
}

#[async_trait]
impl DenyList for RedisDenyList {
    async fn deny(&self, jti: Uuid, user_id: Uuid, ttl_secs: i64, reason: &str) -> Result<()> {
        if ttl_secs <= 0 {
            debug!(%jti, "token already expired, nothing to deny");
            return Ok(());
        }
        let entry = serde_json::to_string(&DenyEntry {
            revoked_at: OffsetDateTime::now_utc().unix_timestamp(),
            user_id,
            reason,
        })
        .context("serialize deny-list entry")?;

        // ConnectionManager multiplexes; a clone per call is the intended use.
        let mut conn = self.redis.clone();
        let _: () = conn
            .set_ex(Self::key(jti), entry, ttl_secs as u64)
            .await
            .context("write deny-list entry to redis")?;
        info!(%jti, ttl = ttl_secs, "token denied");
        Ok(())
    }

    async fn is_denied(&self, jti: Uuid) -> Result<bool> {
        let mut conn = self.redis.clone();
        let exists: bool = conn
            .exists(Self::key(jti))
            .await
            .context("check deny-list entry in redis")?;
        Ok(exists)
    }
}

/// In-process deny list backing `AppState::fake`.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryDenyList {
    entries: dashmap::DashMap<Uuid, std::time::Instant>,
}

#[cfg(test)]
#[async_trait]
impl DenyList for MemoryDenyList {
    async fn deny(&self, jti: Uuid, _user_id: Uuid, ttl_secs: i64, _reason: &str) -> Result<()> {
        if ttl_secs <= 0 {
            return Ok(());
        }
        let expires = std::time::Instant::now() + std::time::Duration::from_secs(ttl_secs as u64);
        self.entries.insert(jti, expires);
        Ok(())
    }

    async fn is_denied(&self, jti: Uuid) -> Result<bool> {
        if let Some(expires) = self.entries.get(&jti).map(|e| *e) {
            if std::time::Instant::now() < expires {
                return Ok(true);
            }
            self.entries.remove(&jti);
        }
        Ok(false)
    }
}
