use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::AuthUser;

/// Session file name in the data directory
const SESSION_FILE: &str = "session.json";

/// Days a sign-in stays valid without signing in again.
pub const SESSION_EXPIRY_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub user: AuthUser,
    pub signed_in_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(user: AuthUser, now: DateTime<Utc>) -> Self {
        Self {
            user,
            signed_in_at: now,
        }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.signed_in_at + Duration::days(SESSION_EXPIRY_DAYS)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Days remaining until expiry (for display)
    pub fn days_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at() - now).num_days().max(0)
    }
}

pub struct Session {
    dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, data: None }
    }

    /// Load the session from disk. Returns whether a live session was found;
    /// an expired one is left unloaded.
    pub fn load(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let path = self.session_path();
        if path.exists() {
            let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
            let data: SessionData =
                serde_json::from_str(&contents).context("Failed to parse session file")?;

            if !data.is_expired(now) {
                self.data = Some(data);
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.session_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.data.as_ref().map(|d| &d.user)
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_expired(now))
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            uid: "u1".into(),
            email: "sam@example.edu".into(),
            display_name: None,
            email_verified: false,
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();

        let mut session = Session::new(dir.path().to_path_buf());
        session.update(SessionData::new(user(), now));
        session.save().unwrap();

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(reloaded.load(now + Duration::days(29)).unwrap());
        assert_eq!(reloaded.user().map(|u| u.uid.as_str()), Some("u1"));
    }

    #[test]
    fn test_expired_session_is_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();

        let mut session = Session::new(dir.path().to_path_buf());
        session.update(SessionData::new(user(), now));
        session.save().unwrap();
        assert!(!session.is_valid(now + Duration::days(30)));

        let mut reloaded = Session::new(dir.path().to_path_buf());
        assert!(!reloaded.load(now + Duration::days(31)).unwrap());
        assert!(reloaded.data.is_none());
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path().to_path_buf());
        session.update(SessionData::new(user(), Utc::now()));
        session.save().unwrap();
        session.clear().unwrap();
        assert!(!dir.path().join(SESSION_FILE).exists());
        assert!(!Session::new(dir.path().to_path_buf()).load(Utc::now()).unwrap());
    }

    #[test]
    fn test_days_until_expiry() {
        let now = Utc::now();
        let data = SessionData::new(user(), now);
        assert_eq!(data.days_until_expiry(now + Duration::days(10)), 20);
        assert_eq!(data.days_until_expiry(now + Duration::days(45)), 0);
    }
}
