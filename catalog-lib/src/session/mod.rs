//! Session guard
//!
//! Gates the catalog behind a placeholder login. The logged-in flag is kept
//! in a [`SessionStorage`] so it survives for the lifetime of the session
//! but not beyond it.
//!
//! ```text
//! Loading ──restore()──> Authenticated | Unauthenticated
//! Unauthenticated ──login(ok)──> Authenticated
//! Authenticated ──logout()──> Unauthenticated
//! ```

mod storage;

pub use storage::*;

use std::sync::Arc;

use log::debug;
use log::info;
use log::warn;
use tokio::sync::watch;

use crate::error::SessionError;

/// Storage key of the persisted login flag.
pub const SESSION_KEY: &str = "isLoggedIn";

const SESSION_VALUE: &str = "true";

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The persisted flag has not been read yet; nothing protected may render.
    Loading,
    Authenticated,
    Unauthenticated,
}

/// The expected login pair.
///
/// This is a placeholder check, not authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("user", "password")
    }
}

/// Tracks whether the user is logged in.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionGuard {
    storage: Arc<dyn SessionStorage>,
    credentials: Credentials,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionGuard {
    /// Creates a guard in the [`SessionState::Loading`] state.
    ///
    /// Call [`SessionGuard::restore`] to read the persisted flag.
    pub fn new(storage: impl SessionStorage + 'static, credentials: Credentials) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self {
            storage: Arc::new(storage),
            credentials,
            state: Arc::new(state),
        }
    }

    /// Creates a guard over in-memory storage with the default credentials.
    pub fn in_memory() -> Self {
        Self::new(MemorySessionStorage::new(), Credentials::default())
    }

    /// Reads the persisted flag and leaves the loading state.
    ///
    /// A storage failure is logged and treated as logged out.
    pub async fn restore(&self) -> SessionState {
        let state = match self.storage.get_item(SESSION_KEY).await {
            Ok(Some(value)) if value == SESSION_VALUE => SessionState::Authenticated,
            Ok(_) => SessionState::Unauthenticated,
            Err(err) => {
                warn!("reading session flag failed: {}", err);
                SessionState::Unauthenticated
            }
        };
        debug!("restored session: {:?}", state);
        self.state.send_replace(state);
        state
    }

    /// Logs in if the pair matches the expected credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidCredentials`] on mismatch (the state
    /// becomes, or stays, unauthenticated and nothing is persisted), or
    /// [`SessionError::Storage`] if the flag could not be written.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        if !self.credentials.matches(username, password) {
            warn!("login rejected for '{}'", username);
            self.state.send_replace(SessionState::Unauthenticated);
            return Err(SessionError::InvalidCredentials);
        }

        self.storage.set_item(SESSION_KEY, SESSION_VALUE).await?;
        self.state.send_replace(SessionState::Authenticated);
        info!("logged in as '{}'", username);
        Ok(())
    }

    /// Logs out and clears the persisted flag.
    ///
    /// The state becomes unauthenticated even if clearing the flag fails.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.state.send_replace(SessionState::Unauthenticated);
        self.storage.remove_item(SESSION_KEY).await?;
        info!("logged out");
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    /// Gate for protected views.
    pub fn require_authenticated(&self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Authenticated => Ok(()),
            SessionState::Loading => Err(SessionError::Loading),
            SessionState::Unauthenticated => Err(SessionError::NotAuthenticated),
        }
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_loading_until_restored() {
        let guard = SessionGuard::in_memory();
        assert_eq!(guard.state(), SessionState::Loading);
        assert_eq!(guard.require_authenticated(), Err(SessionError::Loading));

        assert_eq!(guard.restore().await, SessionState::Unauthenticated);
        assert_eq!(guard.require_authenticated(), Err(SessionError::NotAuthenticated));
    }

    #[tokio::test]
    async fn login_with_expected_pair_persists_flag() {
        let guard = SessionGuard::in_memory();
        guard.restore().await;

        guard.login("user", "password").await.unwrap();

        assert!(guard.is_authenticated());
        assert_eq!(
            guard.storage.get_item(SESSION_KEY).await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn wrong_credentials_leave_session_logged_out() {
        let guard = SessionGuard::in_memory();
        guard.restore().await;

        let err = guard.login("user", "wrong").await.unwrap_err();

        assert_eq!(err, SessionError::InvalidCredentials);
        assert_eq!(guard.state(), SessionState::Unauthenticated);
        assert_eq!(guard.storage.get_item(SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn logout_clears_flag() {
        let guard = SessionGuard::in_memory();
        guard.restore().await;
        guard.login("user", "password").await.unwrap();

        guard.logout().await.unwrap();

        assert_eq!(guard.state(), SessionState::Unauthenticated);
        assert_eq!(guard.storage.get_item(SESSION_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn restore_reads_persisted_flag() {
        let storage = MemorySessionStorage::new();
        storage.set_item(SESSION_KEY, "true").await.unwrap();
        let guard = SessionGuard::new(storage, Credentials::default());

        assert_eq!(guard.restore().await, SessionState::Authenticated);
    }

    #[tokio::test]
    async fn unexpected_flag_value_reads_as_logged_out() {
        let storage = MemorySessionStorage::new();
        storage.set_item(SESSION_KEY, "yes").await.unwrap();
        let guard = SessionGuard::new(storage, Credentials::default());

        assert_eq!(guard.restore().await, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let guard = SessionGuard::in_memory();
        let mut rx = guard.subscribe();
        guard.restore().await;

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Unauthenticated);

        guard.login("user", "password").await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn custom_credentials() {
        let guard = SessionGuard::new(MemorySessionStorage::new(), Credentials::new("admin", "s3cret"));
        guard.restore().await;

        assert!(guard.login("user", "password").await.is_err());
        guard.login("admin", "s3cret").await.unwrap();
        assert!(guard.is_authenticated());
    }
}
