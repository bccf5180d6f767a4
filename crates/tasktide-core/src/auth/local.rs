use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};

use super::{AuthError, AuthProvider, AuthUser, Session, SessionData};
use crate::clock::{Clock, SystemClock};

/// Known accounts, keyed by lowercased email
const ACCOUNTS_FILE: &str = "accounts.json";

const UID_LEN: usize = 28;

/// Offline identity provider.
///
/// Signing in with an email creates an account on first use and reuses its
/// uid afterwards, so a user's documents survive signing out.
pub struct LocalAuthProvider {
    dir: PathBuf,
    session: Mutex<Session>,
    clock: Arc<dyn Clock>,
}

impl LocalAuthProvider {
    /// Open the provider rooted at `dir`, restoring a live session if one
    /// was saved.
    pub fn open(dir: PathBuf) -> Self {
        Self::with_clock(dir, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: PathBuf, clock: Arc<dyn Clock>) -> Self {
        let mut session = Session::new(dir.clone());
        match session.load(clock.now()) {
            Ok(true) => debug!("Restored saved session"),
            Ok(false) => {}
            Err(e) => warn!("Ignoring unreadable session: {:#}", e),
        }
        Self {
            dir,
            session: Mutex::new(session),
            clock,
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn accounts_path(&self) -> PathBuf {
        self.dir.join(ACCOUNTS_FILE)
    }

    fn load_accounts(&self) -> anyhow::Result<HashMap<String, AuthUser>> {
        let path = self.accounts_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read accounts file")?;
        serde_json::from_str(&contents).context("Failed to parse accounts file")
    }

    fn save_accounts(&self, accounts: &HashMap<String, AuthUser>) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.accounts_path(), serde_json::to_string_pretty(accounts)?)?;
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if valid {
        Ok(email.to_lowercase())
    } else {
        Err(AuthError::InvalidEmail(email.to_string()))
    }
}

fn generate_uid() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LEN)
        .map(char::from)
        .collect()
}

#[async_trait]
impl AuthProvider for LocalAuthProvider {
    async fn current_user(&self) -> Option<AuthUser> {
        let now = self.clock.now();
        let session = self.session();
        if session.is_valid(now) {
            session.user().cloned()
        } else {
            None
        }
    }

    async fn sign_in(&self, email: &str, display_name: Option<&str>) -> Result<AuthUser, AuthError> {
        let email = validate_email(email)?;
        let mut accounts = self.load_accounts()?;

        let user = accounts
            .entry(email.clone())
            .or_insert_with(|| {
                info!("Creating local account for {}", email);
                AuthUser {
                    uid: generate_uid(),
                    email: email.clone(),
                    display_name: None,
                    email_verified: false,
                }
            });
        if let Some(name) = display_name {
            user.display_name = Some(name.to_string());
        }
        let user = user.clone();
        self.save_accounts(&accounts)?;

        let mut session = self.session();
        session.update(SessionData::new(user.clone(), self.clock.now()));
        session.save()?;
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let mut session = self.session();
        if session.data.is_none() {
            return Err(AuthError::NotSignedIn);
        }
        session.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_sign_in_persists_session() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalAuthProvider::open(dir.path().to_path_buf());
        assert!(provider.current_user().await.is_none());

        let user = provider
            .sign_in("Sam@Example.edu", Some("Sam"))
            .await
            .unwrap();
        assert_eq!(user.email, "sam@example.edu");
        assert_eq!(user.uid.len(), UID_LEN);

        let reopened = LocalAuthProvider::open(dir.path().to_path_buf());
        assert_eq!(reopened.current_user().await, Some(user));
    }

    #[tokio::test]
    async fn test_uid_is_stable_across_sign_out() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalAuthProvider::open(dir.path().to_path_buf());
        let first = provider.sign_in("sam@example.edu", None).await.unwrap();
        provider.sign_out().await.unwrap();
        assert!(provider.current_user().await.is_none());

        let second = provider.sign_in("sam@example.edu", None).await.unwrap();
        assert_eq!(first.uid, second.uid);

        let other = provider.sign_in("alex@example.edu", None).await.unwrap();
        assert_ne!(other.uid, first.uid);
    }

    #[tokio::test]
    async fn test_session_expires_after_thirty_days() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let provider = LocalAuthProvider::with_clock(dir.path().to_path_buf(), clock.clone());
        provider.sign_in("sam@example.edu", None).await.unwrap();

        clock.advance(chrono::Duration::days(29));
        assert!(provider.current_user().await.is_some());
        clock.advance(chrono::Duration::days(1));
        assert!(provider.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_rejects_invalid_email() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalAuthProvider::open(dir.path().to_path_buf());
        for bad in ["", "sam", "@example.edu", "sam@localhost"] {
            assert!(matches!(
                provider.sign_in(bad, None).await,
                Err(AuthError::InvalidEmail(_))
            ));
        }
        assert!(matches!(
            provider.sign_out().await,
            Err(AuthError::NotSignedIn)
        ));
    }
}
