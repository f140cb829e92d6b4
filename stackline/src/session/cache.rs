//! Session cache keyed by process identity
//!
//! Attaching is the expensive step, so sessions are shared: the cache
//! hands out `Arc` handles keyed by pid and creates a session on first
//! request (creation is cheap - the attach itself stays lazy inside the
//! session). Releasing an entry only drops the cache's own handle;
//! callers holding clones keep using their session, and the next request
//! for that pid starts a fresh one with a fresh attach attempt.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::debug;

use super::service::DebugServiceProvider;
use super::session::{AttachOptions, DebugSession};
use crate::domain::Pid;

/// Shared registry of [`DebugSession`]s, one per process
pub struct SessionCache {
    provider: Arc<dyn DebugServiceProvider>,
    options: AttachOptions,
    sessions: Mutex<HashMap<Pid, Arc<DebugSession>>>,
}

impl SessionCache {
    /// Create an empty cache; sessions are built from `provider` with
    /// `options` on first request
    #[must_use]
    pub fn new(provider: Arc<dyn DebugServiceProvider>, options: AttachOptions) -> Self {
        SessionCache {
            provider,
            options,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Session for `pid`, created on first request
    ///
    /// Repeated calls return handles to the same session until
    /// [`release`](SessionCache::release) drops it.
    #[must_use]
    pub fn session(&self, pid: Pid) -> Arc<DebugSession> {
        if let Ok(mut sessions) = self.sessions.lock() {
            Arc::clone(sessions.entry(pid).or_insert_with(|| {
                debug!("Creating symbol session for {pid}");
                Arc::new(DebugSession::new(
                    Arc::clone(&self.provider),
                    pid,
                    self.options,
                ))
            }))
        } else {
            // Poisoned cache: hand out an uncached session rather than
            // refuse to answer.
            Arc::new(DebugSession::new(
                Arc::clone(&self.provider),
                pid,
                self.options,
            ))
        }
    }

    /// Session for the calling process
    #[must_use]
    pub fn current_process_session(&self) -> Arc<DebugSession> {
        self.session(Pid::current())
    }

    /// Drop the cache's handle to `pid`'s session
    ///
    /// Outstanding clones stay valid; the underlying service is released
    /// when the last one drops.
    pub fn release(&self, pid: Pid) {
        if let Ok(mut sessions) = self.sessions.lock() {
            if sessions.remove(&pid).is_some() {
                debug!("Released symbol session for {pid}");
            }
        }
    }

    /// Number of sessions currently cached
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }

    /// Returns true when no sessions are cached
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCache")
            .field("sessions", &self.len())
            .finish_non_exhaustive()
    }
}
