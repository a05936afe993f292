use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

use reforma_core::session::QuoteSession;

#[derive(Debug)]
struct StoredSession {
    session: QuoteSession,
    last_touched: Instant,
}

/// In-memory session store keyed by session id.
///
/// Each quoting session owns one `QuoteSession` entry; DashMap's per-entry
/// locking serializes mutations of a single session while unrelated sessions
/// proceed in parallel. Entries idle past the TTL are dropped lazily on
/// access and by the periodic sweep.
#[derive(Clone, Debug)]
pub struct SessionStore {
    entries: Arc<DashMap<Uuid, StoredSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: Arc::new(DashMap::new()), ttl }
    }

    /// Create and register a fresh session, returning a snapshot of it.
    pub fn create(&self) -> QuoteSession {
        let session = QuoteSession::new();
        self.entries.insert(
            session.id,
            StoredSession { session: session.clone(), last_touched: Instant::now() },
        );
        session
    }

    /// Snapshot a session, refreshing its TTL. `None` when the id is
    /// unknown or the entry has expired.
    pub fn get(&self, id: &Uuid) -> Option<QuoteSession> {
        self.with_session(id, |session| session.clone())
    }

    /// Run `apply` on a session under its entry lock, refreshing the TTL.
    /// `None` when the id is unknown or the entry has expired.
    pub fn with_session<T>(
        &self,
        id: &Uuid,
        apply: impl FnOnce(&mut QuoteSession) -> T,
    ) -> Option<T> {
        let mut entry = self.entries.get_mut(id)?;

        if entry.last_touched.elapsed() > self.ttl {
            // Guard must be released before removal or the shard deadlocks.
            drop(entry);
            self.entries.remove(id);
            return None;
        }

        entry.last_touched = Instant::now();
        Some(apply(&mut entry.session))
    }

    /// Drop every entry idle past the TTL; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, stored| stored.last_touched.elapsed() <= self.ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
