//! In-process wizard session store with TTL
//!
//! One session per user, keyed by Telegram user id. An expired entry is
//! evicted on read, so callers cannot observe a lapsed session; absent and
//! expired look identical.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry<T> {
    session: T,
    touched_at: Instant,
}

/// TTL-bounded map of per-user sessions
pub struct SessionStore<T> {
    sessions: Arc<Mutex<HashMap<i64, Entry<T>>>>,
    ttl: Duration,
}

impl<T: Clone + Send + 'static> SessionStore<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the live session for a user, evicting it first if expired.
    pub async fn get(&self, user_id: i64) -> Option<T> {
        let mut sessions = self.sessions.lock().await;
        if let Some(entry) = sessions.get(&user_id) {
            if Instant::now().duration_since(entry.touched_at) < self.ttl {
                return Some(entry.session.clone());
            }
            sessions.remove(&user_id);
        }
        None
    }

    /// Stores a session, replacing any previous one (last writer wins).
    pub async fn set(&self, user_id: i64, session: T) {
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            user_id,
            Entry {
                session,
                touched_at: Instant::now(),
            },
        );
    }

    /// Removes and returns the user's session, expired or not.
    pub async fn clear(&self, user_id: i64) -> Option<T> {
        let mut sessions = self.sessions.lock().await;
        sessions.remove(&user_id).map(|entry| entry.session)
    }

    /// Drops expired entries, returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| Instant::now().duration_since(entry.touched_at) < self.ttl);
        let removed = before - sessions.len();
        if removed > 0 {
            log::debug!("Cleaned up {} expired wizard session(s)", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> SessionStore<T> {
    /// Spawns a background task that sweeps expired sessions periodically.
    pub fn spawn_cleanup_task(self: &Arc<Self>, interval: Duration) {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.cleanup().await;
            }
        });
    }
}
