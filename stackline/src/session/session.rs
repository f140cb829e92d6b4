//! Lazy, memoized symbol sessions
//!
//! Establishing a debug service is expensive - it loads the process
//! image's debug information - so a session attempts it exactly once, on
//! the first query that needs it. The outcome is memoized either way: a
//! session that failed to attach stays absent for its whole lifetime and
//! answers every later query with sentinels instead of retrying.
//!
//! Queries never raise errors and never panic. Symbol text is
//! best-effort diagnostic output, and the paths that want it (panic
//! hooks, crash reporters, log formatters) cannot tolerate faults from a
//! prettifier. Unresolvable names and files come back as empty strings,
//! unresolvable line numbers as 0.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};

use super::service::{self, DebugService, DebugServiceProvider};
use crate::domain::{Pid, RawAddress, ServiceError};

/// How a session establishes its debug service
#[derive(Debug, Clone, Copy)]
pub struct AttachOptions {
    /// Upper bound on the wait for attach completion. An expired wait
    /// marks the session absent; it does not retry.
    pub timeout: Duration,
}

impl Default for AttachOptions {
    fn default() -> Self {
        AttachOptions {
            timeout: Duration::from_secs(5),
        }
    }
}

enum SessionState {
    /// No attach attempted yet
    Untried,
    /// Attach failed; permanently absent for this session
    Absent,
    /// Attached and answering queries
    Present(Box<dyn DebugService>),
}

/// Lazily attached connection to the debug service for one process
///
/// Cheap to create: no work happens until the first frame query. Safe to
/// share across threads; concurrent queries serialize on an internal
/// lock. Dropping the last handle releases the underlying service.
pub struct DebugSession {
    provider: Arc<dyn DebugServiceProvider>,
    pid: Pid,
    options: AttachOptions,
    state: Mutex<SessionState>,
}

impl DebugSession {
    /// Create an unattached session for `pid`
    #[must_use]
    pub fn new(provider: Arc<dyn DebugServiceProvider>, pid: Pid, options: AttachOptions) -> Self {
        DebugSession {
            provider,
            pid,
            options,
            state: Mutex::new(SessionState::Untried),
        }
    }

    /// Target process of this session
    #[must_use]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Whether a service is currently attached
    ///
    /// Purely observational: never triggers an attach attempt.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state
            .lock()
            .is_ok_and(|state| matches!(*state, SessionState::Present(_)))
    }

    /// Symbol name for `frames[frame]`, or empty text
    ///
    /// An out-of-range `frame` answers empty immediately, without
    /// touching the service or triggering an attach.
    #[must_use]
    pub fn frame_name(&self, frames: &[RawAddress], frame: usize) -> String {
        let Some(&address) = frames.get(frame) else {
            return String::new();
        };
        self.with_service(|svc| service::read_name(svc, address))
            .unwrap_or_default()
    }

    /// Source file path for `frames[frame]`, or empty text
    #[must_use]
    pub fn frame_source_file(&self, frames: &[RawAddress], frame: usize) -> String {
        let Some(&address) = frames.get(frame) else {
            return String::new();
        };
        self.with_service(|svc| service::read_source_file(svc, address))
            .unwrap_or_default()
    }

    /// Source line number for `frames[frame]`; 0 means unknown
    ///
    /// 0 doubles as the sentinel, so a frame genuinely attributed to
    /// line 0 is indistinguishable from an unresolved one.
    #[must_use]
    pub fn frame_source_line(&self, frames: &[RawAddress], frame: usize) -> u32 {
        let Some(&address) = frames.get(frame) else {
            return 0;
        };
        self.with_service(|svc| service::read_source_line(svc, address))
            .unwrap_or_default()
    }

    /// Run `query` against the attached service, attaching first if this
    /// session never tried. Absent sessions answer `None`.
    fn with_service<R>(&self, query: impl FnOnce(&mut dyn DebugService) -> Option<R>) -> Option<R> {
        // A poisoned lock counts as an absent service.
        let Ok(mut state) = self.state.lock() else {
            return None;
        };

        if matches!(*state, SessionState::Untried) {
            *state = match self.try_attach() {
                Ok(service) => SessionState::Present(service),
                Err(error) => {
                    warn!("Debug service attach failed for {}: {error}", self.pid);
                    SessionState::Absent
                }
            };
        }

        match &mut *state {
            SessionState::Present(service) => query(service.as_mut()),
            SessionState::Untried | SessionState::Absent => None,
        }
    }

    /// One attach attempt: connect, start the non-invasive attach, wait
    /// out the configured deadline. Any failure drops the partially
    /// constructed service, releasing whatever it had acquired.
    fn try_attach(&self) -> Result<Box<dyn DebugService>, ServiceError> {
        debug!(
            "Attaching debug service to {} (timeout {:?})",
            self.pid, self.options.timeout
        );
        let mut service = self.provider.connect()?;
        service.attach_noninvasive(self.pid)?;
        service.wait_for_attach(self.options.timeout)?;
        debug!("Debug service attached to {}", self.pid);
        Ok(service)
    }
}

impl fmt::Debug for DebugSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugSession")
            .field("pid", &self.pid)
            .field("attached", &self.is_attached())
            .finish_non_exhaustive()
    }
}
