//! Durable client state: who is logged in and their cached profile
//!
//! Stored as JSON next to the config file. The identity (user id + email)
//! gates every other operation; the profile is a snapshot kept for the
//! lifetime of the login.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::Config;
use crate::error::SessionError;
use crate::models::UserProfile;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredSession {
    user_id: Option<i64>,
    user_email: Option<String>,
    profile: Option<UserProfile>,
}

pub struct SessionStore {
    path: PathBuf,
    state: StoredSession,
}

impl SessionStore {
    pub fn open_default() -> Result<Self, SessionError> {
        let dir = Config::config_dir().map_err(|_| SessionError::NoConfigDir)?;
        Self::open(dir.join("session.json"))
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let state = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            StoredSession::default()
        };
        Ok(Self { path, state })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Both the user id and the email must be present.
    pub fn identity(&self) -> Result<Identity, SessionError> {
        match (self.state.user_id, &self.state.user_email) {
            (Some(user_id), Some(email)) if !email.is_empty() => Ok(Identity {
                user_id,
                email: email.clone(),
            }),
            _ => Err(SessionError::NotLoggedIn),
        }
    }

    pub fn sign_in(&mut self, identity: &Identity) -> Result<(), SessionError> {
        self.state = StoredSession {
            user_id: Some(identity.user_id),
            user_email: Some(identity.email.clone()),
            profile: None,
        };
        self.save()
    }

    pub fn sign_out(&mut self) -> Result<(), SessionError> {
        self.state = StoredSession::default();
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.state.profile.as_ref()
    }

    pub fn cache_profile(&mut self, profile: UserProfile) -> Result<(), SessionError> {
        self.state.profile = Some(profile);
        self.save()
    }

    fn save(&self) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn identity() -> Identity {
        Identity {
            user_id: 42,
            email: "asha@example.com".to_string(),
        }
    }

    #[test]
    fn test_missing_file_is_logged_out() {
        let dir = tempdir().unwrap();
        let store = SessionStore::open(dir.path().join("session.json")).unwrap();
        assert!(matches!(store.identity(), Err(SessionError::NotLoggedIn)));
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_sign_in_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let mut store = SessionStore::open(&path).unwrap();
        store.sign_in(&identity()).unwrap();

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.identity().unwrap(), identity());
    }

    #[test]
    fn test_profile_snapshot_survives_reopen_and_clears_on_sign_in() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = SessionStore::open(&path).unwrap();
        store.sign_in(&identity()).unwrap();
        store
            .cache_profile(UserProfile {
                name: Some("Asha".to_string()),
                ..Default::default()
            })
            .unwrap();

        let mut reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.profile().unwrap().name.as_deref(), Some("Asha"));

        reopened.sign_in(&identity()).unwrap();
        assert!(reopened.profile().is_none());
    }

    #[test]
    fn test_email_is_required() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"user_id": 5, "user_email": null, "profile": null}"#).unwrap();

        let store = SessionStore::open(&path).unwrap();
        assert!(matches!(store.identity(), Err(SessionError::NotLoggedIn)));
    }

    #[test]
    fn test_sign_out_removes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = SessionStore::open(&path).unwrap();
        store.sign_in(&identity()).unwrap();
        store.sign_out().unwrap();

        assert!(!path.exists());
        assert!(store.identity().is_err());
    }
}
