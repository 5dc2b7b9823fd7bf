//! Test utilities: mock implementations of the auth traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{AuthChange, AuthEvent, AuthUser, Role, Session};
use crate::error::AppError;
use crate::traits::{AuthBackend, IdentityLookup};

// ---------------------------------------------------------------------------
// MockAuthBackend
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct Account {
    password: String,
    user: AuthUser,
}

/// Auth backend holding accounts and the current session in memory.
///
/// Like the hosted backend, it notifies subscribers before `sign_in` and
/// `sign_out` resolve.
#[derive(Clone)]
pub struct MockAuthBackend {
    accounts: Arc<Mutex<HashMap<String, Account>>>,
    session: Arc<Mutex<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
    sign_out_calls: Arc<Mutex<usize>>,
    fail_sign_out: Arc<Mutex<bool>>,
}

impl Default for MockAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAuthBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            accounts: Arc::new(Mutex::new(HashMap::new())),
            session: Arc::new(Mutex::new(None)),
            events,
            sign_out_calls: Arc::new(Mutex::new(0)),
            fail_sign_out: Arc::new(Mutex::new(false)),
        }
    }

    /// Registers an account and returns its user.
    pub fn add_account(&self, email: &str, password: &str, admin: bool) -> AuthUser {
        let role = if admin { Role::Admin } else { Role::Employee };
        let user = AuthUser::new(Uuid::new_v4(), email).with_role(role);
        self.accounts.lock().unwrap().insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Number of `sign_out` calls so far, failed ones included.
    pub fn sign_out_calls(&self) -> usize {
        *self.sign_out_calls.lock().unwrap()
    }

    /// Makes the next `sign_out` fail without ending the session.
    pub fn fail_next_sign_out(&self) {
        *self.fail_sign_out.lock().unwrap() = true;
    }

    /// Simulates the backend ending the session on its own, e.g. after a
    /// failed token refresh.
    pub fn expire_session(&self) {
        self.session.lock().unwrap().take();
        let _ = self.events.send(AuthEvent::signed_out());
    }

    /// Simulates a token refresh for the current session.
    pub fn refresh_session(&self) {
        let mut session = self.session.lock().unwrap();
        if let Some(current) = session.as_mut() {
            current.access_token = format!("access-{}", Uuid::new_v4());
            let _ = self.events.send(AuthEvent {
                change: AuthChange::TokenRefreshed,
                session: Some(current.clone()),
            });
        }
    }

    fn session_for(user: AuthUser) -> Session {
        Session {
            access_token: format!("access-{}", Uuid::new_v4()),
            refresh_token: format!("refresh-{}", Uuid::new_v4()),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            expires_at: None,
            user,
        }
    }
}

impl AuthBackend for MockAuthBackend {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let account = self.accounts.lock().unwrap().get(email).cloned();
        let account = match account {
            Some(account) if account.password == password => account,
            _ => return Err(AppError::AuthError("Invalid login credentials".to_string())),
        };

        let session = Self::session_for(account.user);
        *self.session.lock().unwrap() = Some(session.clone());
        let _ = self.events.send(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        *self.sign_out_calls.lock().unwrap() += 1;

        if std::mem::take(&mut *self.fail_sign_out.lock().unwrap()) {
            return Err(AppError::NetworkError("connection reset".to_string()));
        }

        self.session.lock().unwrap().take();
        let _ = self.events.send(AuthEvent::signed_out());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// MockIdentity
// ---------------------------------------------------------------------------

/// Token-to-user lookup with a call counter.
#[derive(Clone, Default)]
pub struct MockIdentity {
    users: Arc<Mutex<HashMap<String, AuthUser>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, token: &str, user: AuthUser) -> Self {
        self.users.lock().unwrap().insert(token.to_string(), user);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl IdentityLookup for MockIdentity {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AppError> {
        *self.calls.lock().unwrap() += 1;
        self.users
            .lock()
            .unwrap()
            .get(access_token)
            .cloned()
            .ok_or_else(|| AppError::AuthError("invalid JWT".to_string()))
    }
}
