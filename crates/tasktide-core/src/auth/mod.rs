//! Authentication.
//!
//! The identity provider is an external collaborator reached through
//! [`AuthProvider`]. A signed-in user is persisted as a [`Session`] that
//! expires after 30 days; [`LocalAuthProvider`] is the offline provider the
//! TUI uses.

pub mod local;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use local::LocalAuthProvider;
pub use session::{Session, SessionData, SESSION_EXPIRY_DAYS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error(transparent)]
    Session(#[from] anyhow::Error),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, if the session is still valid.
    async fn current_user(&self) -> Option<AuthUser>;

    async fn sign_in(&self, email: &str, display_name: Option<&str>) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}
