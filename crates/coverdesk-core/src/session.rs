//! Session guard with inactivity-based auto-logout.
//!
//! ```text
//! SignedOut --[sign-in event]--> SignedIn (timer armed)
//!     ^                               |
//!     +--[sign-out | timeout | expiry]+
//! ```
//!
//! One background task owns the session state. It multiplexes, in priority
//! order: teardown, auth-state events from the backend, the inactivity
//! deadline, and activity signals. The deadline exists only while a user is
//! present and activity tracking is enabled; any activity pushes it back to
//! the full timeout.

use std::fmt;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::auth::{AuthEvent, AuthUser, Session};
use crate::error::AppError;
use crate::traits::AuthBackend;

pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30 * 60);

pub const INACTIVITY_LOGOUT_MESSAGE: &str = "You have been logged out due to inactivity.";

/// User interactions that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivitySignal {
    MouseDown,
    MouseMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

impl ActivitySignal {
    pub const ALL: [ActivitySignal; 6] = [
        ActivitySignal::MouseDown,
        ActivitySignal::MouseMove,
        ActivitySignal::KeyPress,
        ActivitySignal::Scroll,
        ActivitySignal::TouchStart,
        ActivitySignal::Click,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SignedIn,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::SignedOut => write!(f, "signed-out"),
            SessionState::SignedIn => write!(f, "signed-in"),
        }
    }
}

/// User-visible notices raised by the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    InactivityLogout,
}

impl SessionNotice {
    pub fn message(&self) -> &'static str {
        match self {
            SessionNotice::InactivityLogout => INACTIVITY_LOGOUT_MESSAGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle time after which the user is signed out.
    pub inactivity_timeout: Duration,

    /// Whether activity can be observed on this platform. When false the
    /// guard still tracks the user but never arms a timer.
    pub track_activity: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            track_activity: true,
        }
    }
}

impl SessionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    pub fn without_activity_tracking(mut self) -> Self {
        self.track_activity = false;
        self
    }
}

/// Cloneable handle through which an event source reports activity.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    tx: mpsc::UnboundedSender<ActivitySignal>,
}

impl ActivityHandle {
    /// Reports one activity signal. Returns false once the guard is gone.
    pub fn record(&self, signal: ActivitySignal) -> bool {
        self.tx.send(signal).is_ok()
    }

    /// False after the guard has been torn down.
    pub fn is_attached(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Keeps the signed-in user for the lifetime of a client session and signs
/// them out after a period of inactivity.
///
/// Dropping the guard tears it down; [`SessionGuard::unmount`] does the same
/// and waits for the background task to finish.
pub struct SessionGuard<B: AuthBackend> {
    backend: B,
    user: watch::Receiver<Option<AuthUser>>,
    armed: watch::Receiver<bool>,
    activity: mpsc::UnboundedSender<ActivitySignal>,
    notices: broadcast::Sender<SessionNotice>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<B: AuthBackend> SessionGuard<B> {
    /// Loads the current session, subscribes to auth-state changes, and
    /// starts the guard task.
    pub async fn mount(backend: B, config: SessionConfig) -> Self {
        // Subscribe before reading the session so no change falls in between.
        let auth_events = backend.subscribe();

        let initial = match backend.get_session().await {
            Ok(session) => session.map(|s| s.user),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load current session");
                None
            }
        };

        let (user_tx, user_rx) = watch::channel(None);
        let (armed_tx, armed_rx) = watch::channel(false);
        let (activity_tx, activity_rx) = mpsc::unbounded_channel();
        let (notice_tx, _) = broadcast::channel(16);
        let cancel = CancellationToken::new();

        let mut guard_loop = GuardLoop {
            backend: backend.clone(),
            config,
            user: user_tx,
            armed: armed_tx,
            notices: notice_tx.clone(),
            deadline: None,
            expired: false,
        };
        guard_loop.apply_user(initial);

        let task = tokio::spawn(guard_loop.run(auth_events, activity_rx, cancel.clone()));

        Self {
            backend,
            user: user_rx,
            armed: armed_rx,
            activity: activity_tx,
            notices: notice_tx,
            cancel,
            task: Some(task),
        }
    }

    /// Delegates the credential check to the backend. Local state follows
    /// through the auth-state subscription; the caller performs any role
    /// check on the returned session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AppError> {
        self.backend.sign_in_with_password(email, password).await
    }

    /// Delegates to the backend. The local user clears when the sign-out
    /// event arrives, not synchronously.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.backend.sign_out().await
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.user.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        if self.user.borrow().is_some() {
            SessionState::SignedIn
        } else {
            SessionState::SignedOut
        }
    }

    /// Watch channel that changes whenever the local user does.
    pub fn user_changes(&self) -> watch::Receiver<Option<AuthUser>> {
        self.user.clone()
    }

    /// True while the inactivity timer is running.
    pub fn is_timer_armed(&self) -> bool {
        *self.armed.borrow()
    }

    pub fn timer_changes(&self) -> watch::Receiver<bool> {
        self.armed.clone()
    }

    /// Registers an activity source.
    pub fn activity_handle(&self) -> ActivityHandle {
        ActivityHandle {
            tx: self.activity.clone(),
        }
    }

    /// Reports activity from the guard's owner.
    pub fn record_activity(&self, signal: ActivitySignal) {
        let _ = self.activity.send(signal);
    }

    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Tears the guard down and waits for its task to exit. The pending
    /// timeout is cancelled and every activity handle is detached.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Session guard task ended abnormally");
        }
    }
}

impl<B: AuthBackend> Drop for SessionGuard<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// State owned by the guard task.
struct GuardLoop<B: AuthBackend> {
    backend: B,
    config: SessionConfig,
    user: watch::Sender<Option<AuthUser>>,
    armed: watch::Sender<bool>,
    notices: broadcast::Sender<SessionNotice>,
    deadline: Option<Instant>,
    /// Set once the timer has fired, until the session changes.
    expired: bool,
}

impl<B: AuthBackend> GuardLoop<B> {
    async fn run(
        mut self,
        mut auth_events: broadcast::Receiver<AuthEvent>,
        mut activity: mpsc::UnboundedReceiver<ActivitySignal>,
        cancel: CancellationToken,
    ) {
        let mut subscribed = true;

        loop {
            let deadline = self.deadline;

            tokio::select! {
                biased;

                () = cancel.cancelled() => break,

                event = auth_events.recv(), if subscribed => match event {
                    Ok(event) => {
                        tracing::debug!(change = %event.change, "Auth state changed");
                        self.apply_user(event.session.map(|s| s.user));
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Missed auth events, reloading session");
                        match self.backend.get_session().await {
                            Ok(session) => self.apply_user(session.map(|s| s.user)),
                            Err(e) => tracing::warn!(error = %e, "Failed to reload session"),
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::warn!("Auth backend closed its event stream");
                        subscribed = false;
                    }
                },

                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if deadline.is_some() => self.expire().await,

                Some(signal) = activity.recv() => self.on_activity(signal),
            }
        }

        // Teardown: detach activity sources and drop the pending timeout.
        activity.close();
        self.disarm();
        drop(auth_events);
        tracing::debug!("Session guard stopped");
    }

    fn apply_user(&mut self, user: Option<AuthUser>) {
        let previous_id = self.user.borrow().as_ref().map(|u| u.id);
        let current_id = user.as_ref().map(|u| u.id);
        self.user.send_replace(user);

        match current_id {
            None => {
                self.expired = false;
                self.disarm();
            }
            Some(id) => {
                // A new identity starts a fresh idle period; token refreshes
                // for the same user leave the running timer alone.
                if previous_id != Some(id) {
                    self.expired = false;
                    self.disarm();
                }
                if self.deadline.is_none() && !self.expired {
                    self.arm();
                }
            }
        }
    }

    fn on_activity(&mut self, signal: ActivitySignal) {
        if self.user.borrow().is_none() || self.expired {
            return;
        }
        tracing::trace!(?signal, "Activity, resetting inactivity timer");
        self.arm();
    }

    fn arm(&mut self) {
        if !self.config.track_activity {
            return;
        }
        self.deadline = Some(deadline_after(self.config.inactivity_timeout));
        self.armed.send_if_modified(|armed| !std::mem::replace(armed, true));
    }

    fn disarm(&mut self) {
        self.deadline = None;
        self.armed.send_if_modified(|armed| std::mem::replace(armed, false));
    }

    async fn expire(&mut self) {
        self.disarm();
        self.expired = true;
        tracing::info!(
            timeout_secs = self.config.inactivity_timeout.as_secs(),
            "Auto-logout triggered due to inactivity"
        );

        match self.backend.sign_out().await {
            Ok(()) => {
                let _ = self.notices.send(SessionNotice::InactivityLogout);
            }
            Err(e) => {
                // Still signed in; the next activity re-arms the timer.
                tracing::error!(error = %e, "Auto-logout failed");
                self.expired = false;
            }
        }
    }
}

/// `now + timeout`, saturating at roughly thirty years out like tokio's own
/// far-future sleeps.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);
