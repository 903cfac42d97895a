//! Two-tier session store: authoritative in-memory cache with an optional
//! write-through disk mirror.

use crate::crypto::{decrypt_record, encrypt_record, MIN_SECRET_LEN};
use crate::error::SessionError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use wicket_core::Message;

/// A persisted conversation, keyed by `channel:userId`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Session {
    pub id: String,
    /// Unix millis at creation.
    pub created_at: u64,
    /// Unix millis of the last append.
    pub updated_at: u64,
    /// Monotonic read/write time, cache-eviction input. Never serialized.
    #[serde(skip, default = "Instant::now")]
    pub last_accessed: Instant,
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: impl Into<String>) -> Self {
        let now = unix_millis();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            last_accessed: Instant::now(),
            messages: Vec::new(),
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Store construction options.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory for the disk mirror; `None` keeps sessions memory-only.
    pub persist_dir: Option<PathBuf>,
    /// Symmetric secret for at-rest encryption; `None` stores plain JSON.
    pub secret: Option<String>,
    /// Idle time after which a cache entry is evicted.
    pub ttl: Duration,
    /// How often the eviction sweep runs.
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            persist_dir: None,
            secret: None,
            ttl: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// Maps session id to [`Session`].
///
/// The in-memory cache is authoritative for reads; the disk mirror exists to
/// survive restarts. Saves are last-writer-wins on disk: two concurrent
/// turns for the same session can each persist their own snapshot and the
/// later write sticks. Accepted for single-user chat; see the concurrency
/// notes in DESIGN.md.
pub struct SessionStore {
    cache: Arc<RwLock<HashMap<String, Session>>>,
    persist_dir: Option<PathBuf>,
    secret: Option<String>,
    sweeper: JoinHandle<()>,
}

impl SessionStore {
    /// Create a store and start its eviction sweep.
    ///
    /// Must be called from within a tokio runtime. Fails if the configured
    /// secret is too short to derive a key from.
    pub fn new(config: StoreConfig) -> Result<Self, SessionError> {
        if let Some(ref secret) = config.secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(SessionError::WeakSecret(MIN_SECRET_LEN));
            }
        }
        if config.persist_dir.is_some() && config.secret.is_none() {
            tracing::warn!(
                "session encryption disabled; records will be stored as plain JSON"
            );
        }

        let cache: Arc<RwLock<HashMap<String, Session>>> = Arc::new(RwLock::new(HashMap::new()));
        let sweeper = spawn_sweeper(Arc::clone(&cache), config.ttl, config.sweep_interval);

        Ok(Self {
            cache,
            persist_dir: config.persist_dir,
            secret: config.secret,
            sweeper,
        })
    }

    /// Load a session: cache first, then the disk mirror.
    ///
    /// A cache hit refreshes `last_accessed`. Unreadable disk records are
    /// logged and treated as a miss rather than failing the turn.
    pub async fn load(&self, id: &str) -> Result<Option<Session>, SessionError> {
        {
            let mut cache = self.cache.write().await;
            if let Some(session) = cache.get_mut(id) {
                session.last_accessed = Instant::now();
                return Ok(Some(session.clone()));
            }
        }

        let Some(session) = self.load_from_disk(id).await else {
            return Ok(None);
        };

        let mut cache = self.cache.write().await;
        cache.insert(id.to_string(), session.clone());
        Ok(Some(session))
    }

    /// Save a session to the cache and write it through to disk.
    ///
    /// Disk failures propagate; cache state is already updated by then
    /// (eventual consistency is preferred over blocking the reply, so
    /// callers log rather than roll back).
    pub async fn save(&self, session: &Session) -> Result<(), SessionError> {
        {
            let mut stored = session.clone();
            stored.last_accessed = Instant::now();
            let mut cache = self.cache.write().await;
            cache.insert(session.id.clone(), stored);
        }

        let Some(ref dir) = self.persist_dir else {
            return Ok(());
        };
        fs::create_dir_all(dir).await?;

        let json = serde_json::to_vec(session)?;
        match self.secret {
            Some(ref secret) => {
                let record = encrypt_record(secret, &json)?;
                let path = dir.join(encrypted_file_name(&session.id));
                fs::write(&path, record).await?;
                set_owner_only(&path).await?;
            }
            None => {
                let path = dir.join(plain_file_name(&session.id));
                fs::write(&path, json).await?;
            }
        }
        Ok(())
    }

    /// Number of sessions currently held in the cache.
    pub async fn cached_sessions(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Stop the eviction sweep.
    pub fn shutdown(&self) {
        self.sweeper.abort();
    }

    async fn load_from_disk(&self, id: &str) -> Option<Session> {
        let dir = self.persist_dir.as_ref()?;

        if let Some(ref secret) = self.secret {
            let path = dir.join(encrypted_file_name(id));
            match fs::read(&path).await {
                Ok(record) => match decrypt_record(secret, &record)
                    .and_then(|bytes| Ok(serde_json::from_slice::<Session>(&bytes)?))
                {
                    Ok(session) => return Some(session),
                    Err(e) => {
                        tracing::warn!(id, error = %e, "unreadable encrypted session record");
                    }
                },
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(id, error = %e, "failed to read session record");
                }
            }
            // Legacy fallback: a plain record from before encryption was
            // enabled. The next save re-writes it encrypted.
        }

        let path = dir.join(plain_file_name(id));
        match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => {
                    if self.secret.is_some() {
                        tracing::info!(id, "loaded legacy unencrypted session record");
                    }
                    Some(session)
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "unreadable session record");
                    None
                }
            },
            Err(_) => None,
        }
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}

fn spawn_sweeper(
    cache: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
    sweep_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let now = Instant::now();
            let mut cache = cache.write().await;
            let before = cache.len();
            // Eviction drops the cache entry only; disk copies stay and a
            // later load re-hydrates from them.
            cache.retain(|_, session| now.duration_since(session.last_accessed) < ttl);
            let evicted = before - cache.len();
            if evicted > 0 {
                tracing::debug!(evicted, remaining = cache.len(), "session cache sweep");
            }
        }
    })
}

fn encode_session_id(id: &str) -> String {
    urlencoding::encode(id).replace('%', "_")
}

fn encrypted_file_name(id: &str) -> String {
    format!("{}.enc", encode_session_id(id))
}

fn plain_file_name(id: &str) -> String {
    format!("{}.json", encode_session_id(id))
}

#[cfg(unix)]
async fn set_owner_only(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await
}

#[cfg(not(unix))]
async fn set_owner_only(_path: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wicket_core::Role;

    const SECRET: &str = "an-adequately-long-session-secret!!";

    fn session_with_message(id: &str, text: &str) -> Session {
        let mut session = Session::new(id);
        session.messages.push(Message::new(Role::User, text));
        session
    }

    fn encrypted_store(dir: &TempDir) -> SessionStore {
        SessionStore::new(StoreConfig {
            persist_dir: Some(dir.path().to_path_buf()),
            secret: Some(SECRET.to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_memory_only_roundtrip() {
        let store = SessionStore::new(StoreConfig::default()).unwrap();
        store.save(&session_with_message("cli:me", "hi")).await.unwrap();

        let loaded = store.load("cli:me").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "hi");
        assert!(store.load("cli:other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_weak_secret_rejected() {
        let result = SessionStore::new(StoreConfig {
            secret: Some("short".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(SessionError::WeakSecret(_))));
    }

    #[tokio::test]
    async fn test_plain_persistence_roundtrip() {
        let dir = TempDir::new().unwrap();
        {
            let store = SessionStore::new(StoreConfig {
                persist_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            })
            .unwrap();
            store
                .save(&session_with_message("discord:42", "hello"))
                .await
                .unwrap();
        }

        // Fresh store, empty cache: must re-hydrate from disk.
        let store = SessionStore::new(StoreConfig {
            persist_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        })
        .unwrap();
        let loaded = store.load("discord:42").await.unwrap().unwrap();
        assert_eq!(loaded.messages[0].content, "hello");
    }

    #[tokio::test]
    async fn test_encrypted_persistence_roundtrip() {
        let dir = TempDir::new().unwrap();
        {
            let store = encrypted_store(&dir);
            store
                .save(&session_with_message("slack:u1", "secret text"))
                .await
                .unwrap();
        }

        let file = dir.path().join("slack_3Au1.enc");
        let raw = std::fs::read(&file).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("secret text"));

        let store = encrypted_store(&dir);
        let loaded = store.load("slack:u1").await.unwrap().unwrap();
        assert_eq!(loaded.messages[0].content, "secret text");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_encrypted_record_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let store = encrypted_store(&dir);
        store.save(&session_with_message("a:b", "x")).await.unwrap();

        let mode = std::fs::metadata(dir.path().join("a_3Ab.enc"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_legacy_plain_fallback_and_reencrypt() {
        let dir = TempDir::new().unwrap();

        // Record written before encryption was configured.
        {
            let store = SessionStore::new(StoreConfig {
                persist_dir: Some(dir.path().to_path_buf()),
                ..Default::default()
            })
            .unwrap();
            store
                .save(&session_with_message("tg:9", "old plain"))
                .await
                .unwrap();
        }

        let store = encrypted_store(&dir);
        let mut loaded = store.load("tg:9").await.unwrap().unwrap();
        assert_eq!(loaded.messages[0].content, "old plain");

        // Next save re-writes the record encrypted.
        loaded.messages.push(Message::new(Role::Assistant, "reply"));
        store.save(&loaded).await.unwrap();
        assert!(dir.path().join("tg_3A9.enc").exists());
    }

    #[tokio::test]
    async fn test_save_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = encrypted_store(&dir);
        let session = session_with_message("cli:me", "only message");

        store.save(&session).await.unwrap();
        store.save(&session).await.unwrap();

        let loaded = store.load("cli:me").await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, session.messages[0].content);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_eviction_keeps_disk_copy() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(StoreConfig {
            persist_dir: Some(dir.path().to_path_buf()),
            secret: Some(SECRET.to_string()),
            ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(10),
        })
        .unwrap();

        store.save(&session_with_message("x:y", "kept")).await.unwrap();
        assert_eq!(store.cached_sessions().await, 1);

        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(store.cached_sessions().await, 0);

        // Disk copy survives eviction and re-hydrates.
        let loaded = store.load("x:y").await.unwrap().unwrap();
        assert_eq!(loaded.messages[0].content, "kept");
        assert_eq!(store.cached_sessions().await, 1);
    }

    #[test]
    fn test_session_id_encoding() {
        assert_eq!(encode_session_id("discord:42"), "discord_3A42");
        assert_eq!(encode_session_id("tg:user/../x"), "tg_3Auser_2F.._2Fx");
    }
}
