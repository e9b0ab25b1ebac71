//! Per-visitor session state.
//!
//! A session is created when the page loads, carries the one-way
//! authenticated flag and the conversation, and is discarded when the
//! visitor ends it or it sits idle past the configured timeout.

use crate::config::SessionConfig;
use crate::conversation::ConversationStore;
use crate::error::SessionError;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use std::ops::{Deref, DerefMut};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock, RwLockReadGuard};

/// Session identifier type.
pub type SessionId = uuid::Uuid;

/// One visitor's state. Shared as `Arc<Session>` between handlers.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    authenticated: AtomicBool,
    generating: Arc<AtomicBool>,
    conversation: Arc<RwLock<ConversationStore>>,
}

impl Session {
    pub fn new(max_turns: Option<usize>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            created_at: Utc::now(),
            authenticated: AtomicBool::new(false),
            generating: Arc::new(AtomicBool::new(false)),
            conversation: Arc::new(RwLock::new(ConversationStore::with_capacity(max_turns))),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    /// Flip the session to authenticated. There is no way back.
    pub fn mark_authenticated(&self) {
        self.authenticated.store(true, Ordering::Release);
    }

    /// Exclusive access for a submission. Fails instead of waiting when a
    /// reply is already being generated for this session; readers only delay
    /// it. The guard is owned so the turn can outlive the request that
    /// started it.
    pub async fn begin_turn(&self) -> Result<TurnGuard, SessionError> {
        if self.generating.swap(true, Ordering::AcqRel) {
            return Err(SessionError::Busy {
                id: self.id.to_string(),
            });
        }
        // Cleared on drop, including when this future is cancelled while
        // waiting for readers.
        let in_flight = InFlight(Arc::clone(&self.generating));
        let store = Arc::clone(&self.conversation).write_owned().await;
        Ok(TurnGuard {
            store,
            _in_flight: in_flight,
        })
    }

    /// Read access for history and export. Waits for an in-flight turn.
    pub async fn conversation(&self) -> RwLockReadGuard<'_, ConversationStore> {
        self.conversation.read().await
    }
}

#[derive(Debug)]
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Write access to a session's conversation for the duration of one turn.
#[derive(Debug)]
pub struct TurnGuard {
    store: OwnedRwLockWriteGuard<ConversationStore>,
    _in_flight: InFlight,
}

impl Deref for TurnGuard {
    type Target = ConversationStore;

    fn deref(&self) -> &ConversationStore {
        &self.store
    }
}

impl DerefMut for TurnGuard {
    fn deref_mut(&mut self) -> &mut ConversationStore {
        &mut self.store
    }
}

/// Live sessions keyed by id, evicted after the idle timeout.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Cache<SessionId, Arc<Session>>,
    max_turns: Option<usize>,
}

impl SessionManager {
    pub fn new(config: &SessionConfig) -> Self {
        let sessions = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_idle(Duration::from_secs(config.idle_timeout_secs))
            .eviction_listener(|id, _session, cause| {
                tracing::debug!(session_id = %id, ?cause, "session discarded");
            })
            .build();

        Self {
            sessions,
            max_turns: config.max_turns,
        }
    }

    pub async fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(self.max_turns));
        self.sessions.insert(session.id(), session.clone()).await;
        tracing::info!(session_id = %session.id(), "session started");
        session
    }

    pub async fn get(&self, id: &SessionId) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .get(id)
            .await
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() })
    }

    /// End a session. Its conversation is dropped with it.
    pub async fn discard(&self, id: &SessionId) -> Result<(), SessionError> {
        match self.sessions.remove(id).await {
            Some(_) => {
                tracing::info!(session_id = %id, "session ended");
                Ok(())
            }
            None => Err(SessionError::NotFound { id: id.to_string() }),
        }
    }

    pub fn len(&self) -> u64 {
        self.sessions.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Turn;

    fn manager() -> SessionManager {
        SessionManager::new(&SessionConfig::default())
    }

    #[tokio::test]
    async fn new_sessions_start_unauthenticated_and_empty() {
        let manager = manager();
        let session = manager.create().await;

        assert!(!session.is_authenticated());
        assert!(session.conversation().await.is_empty());
    }

    #[tokio::test]
    async fn authentication_is_one_way() {
        let session = Session::new(None);
        session.mark_authenticated();
        session.mark_authenticated();
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn lookup_and_discard() {
        let manager = manager();
        let session = manager.create().await;
        let id = session.id();

        let found = manager.get(&id).await.unwrap();
        assert!(Arc::ptr_eq(&found, &session));

        manager.discard(&id).await.unwrap();
        assert_eq!(
            manager.get(&id).await.unwrap_err(),
            SessionError::NotFound { id: id.to_string() }
        );
        assert!(manager.discard(&id).await.is_err());
    }

    #[tokio::test]
    async fn sessions_do_not_share_conversations() {
        let manager = manager();
        let first = manager.create().await;
        let second = manager.create().await;

        first
            .begin_turn()
            .await
            .unwrap()
            .append(Turn::user("only in first"))
            .unwrap();

        assert_eq!(first.conversation().await.len(), 1);
        assert!(second.conversation().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_turns_are_rejected() {
        let session = Session::new(None);
        let in_flight = session.begin_turn().await.unwrap();

        assert_eq!(
            session.begin_turn().await.unwrap_err(),
            SessionError::Busy {
                id: session.id().to_string()
            }
        );

        drop(in_flight);
        assert!(session.begin_turn().await.is_ok());
    }

    #[tokio::test]
    async fn readers_delay_a_turn_without_rejecting_it() {
        let session = Arc::new(Session::new(None));
        let reader = session.conversation().await;

        let turn = {
            let session = session.clone();
            tokio::spawn(async move {
                let mut turn = session.begin_turn().await.unwrap();
                turn.append(Turn::user("sent during a read")).unwrap();
            })
        };
        tokio::task::yield_now().await;
        assert!(reader.is_empty());
        drop(reader);

        turn.await.unwrap();
        assert_eq!(session.conversation().await.len(), 1);
    }

    #[tokio::test]
    async fn abandoned_turn_does_not_leave_the_session_busy() {
        let session = Session::new(None);
        let reader = session.conversation().await;

        // Gives up while still waiting for the reader.
        let attempt = tokio::time::timeout(Duration::from_millis(20), session.begin_turn()).await;
        assert!(attempt.is_err());
        drop(reader);

        assert!(session.begin_turn().await.is_ok());
    }

    #[tokio::test]
    async fn capacity_comes_from_config() {
        let manager = SessionManager::new(&SessionConfig {
            max_turns: Some(4),
            ..SessionConfig::default()
        });
        let session = manager.create().await;
        assert_eq!(session.conversation().await.capacity(), Some(4));
    }
}
