//! Conversation sessions keyed by thread id
//!
//! Each thread has its own async mutex, so turns for one thread run one at a
//! time while different threads proceed independently. Idle sessions are
//! dropped opportunistically when new threads are created.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::debug;

use crate::dialogue::DialogueState;
use crate::llm::ChatMessage;
use crate::types::Intent;

// ============================================================================
// Session
// ============================================================================

/// Per-thread conversation state
#[derive(Debug, Clone)]
pub struct Session {
    pub thread_id: String,
    pub last_intent: Option<Intent>,
    pub state: DialogueState,
    /// Alternating user/assistant messages, oldest first
    pub history: VecDeque<ChatMessage>,
    pub last_active: Instant,
}

impl Session {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            last_intent: None,
            state: DialogueState::Idle,
            history: VecDeque::new(),
            last_active: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Append one exchange, keeping at most `limit` exchanges
    pub fn record_exchange(&mut self, user: &str, assistant: &str, limit: usize) {
        self.history.push_back(ChatMessage::user(user));
        self.history.push_back(ChatMessage::assistant(assistant));
        while self.history.len() > limit * 2 {
            self.history.pop_front();
        }
    }
}

// ============================================================================
// Session Store
// ============================================================================

type Slot = Arc<Mutex<Session>>;

/// In-memory session store with single-writer-per-thread locking
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Slot>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    async fn slot(&self, thread_id: &str) -> Slot {
        let mut sessions = self.sessions.lock().await;
        if let Some(slot) = sessions.get(thread_id) {
            return slot.clone();
        }

        let evicted = evict_idle_locked(&mut sessions, self.idle_timeout);
        if evicted > 0 {
            debug!(evicted, "Evicted idle sessions");
        }

        let slot = Arc::new(Mutex::new(Session::new(thread_id)));
        sessions.insert(thread_id.to_string(), slot.clone());
        debug!(thread_id, sessions = sessions.len(), "Created session");
        slot
    }

    /// Exclusive access to a thread's session for the duration of one turn
    pub async fn lock(&self, thread_id: &str) -> OwnedMutexGuard<Session> {
        self.slot(thread_id).await.lock_owned().await
    }

    /// Snapshot of a thread's session, creating it if needed
    pub async fn get_or_create(&self, thread_id: &str) -> Session {
        self.lock(thread_id).await.clone()
    }

    /// Replace a thread's session
    pub async fn save(&self, thread_id: &str, session: Session) {
        *self.lock(thread_id).await = session;
    }

    /// Drop sessions idle longer than the timeout that nobody is using
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        evict_idle_locked(&mut sessions, self.idle_timeout)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }
}

fn evict_idle_locked(sessions: &mut HashMap<String, Slot>, idle_timeout: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, slot| {
        // Someone else holds a handle: a turn is running or about to
        if Arc::strong_count(slot) > 1 {
            return true;
        }
        match slot.try_lock() {
            Ok(session) => session.last_active.elapsed() <= idle_timeout,
            Err(_) => true,
        }
    });
    before - sessions.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 3600);

    #[tokio::test]
    async fn test_get_or_create_and_save() {
        let store = SessionStore::new(DAY);
        let mut session = store.get_or_create("t1").await;
        assert_eq!(session.thread_id, "t1");
        assert!(session.last_intent.is_none());

        session.last_intent = Some(Intent::PackageQuery);
        session.state = DialogueState::AwaitingPackageSelection {
            ids: vec!["7".to_string()],
        };
        store.save("t1", session).await;

        let reloaded = store.get_or_create("t1").await;
        assert_eq!(reloaded.last_intent, Some(Intent::PackageQuery));
        assert_eq!(reloaded.state.pending_package_ids().map(|i| i.len()), Some(1));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_lock_serializes_same_thread() {
        let store = Arc::new(SessionStore::new(DAY));
        let guard = store.lock("t1").await;

        let store2 = store.clone();
        let waiter = tokio::spawn(async move {
            let mut session = store2.lock("t1").await;
            session.last_intent = Some(Intent::Greeting);
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();

        assert_eq!(
            store.get_or_create("t1").await.last_intent,
            Some(Intent::Greeting)
        );
    }

    #[tokio::test]
    async fn test_other_threads_not_blocked() {
        let store = SessionStore::new(DAY);
        let _guard = store.lock("t1").await;
        let other = store.lock("t2").await;
        assert_eq!(other.thread_id, "t2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle() {
        let store = SessionStore::new(DAY);
        store.get_or_create("old").await;
        tokio::time::advance(DAY + Duration::from_secs(1)).await;
        store.get_or_create("fresh").await;

        // Creating "fresh" already evicted "old"
        assert_eq!(store.len().await, 1);
        assert_eq!(store.evict_idle().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_session_survives_eviction() {
        let store = SessionStore::new(DAY);
        let guard = store.lock("busy").await;
        tokio::time::advance(DAY * 2).await;
        assert_eq!(store.evict_idle().await, 0);
        drop(guard);
        assert_eq!(store.evict_idle().await, 1);
        assert!(store.is_empty().await);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = Session::new("t");
        for i in 0..5 {
            session.record_exchange(&format!("q{}", i), &format!("a{}", i), 2);
        }
        assert_eq!(session.history.len(), 4);
        assert_eq!(session.history[0].content, "q3");
        assert_eq!(session.history[3].content, "a4");
    }
}
