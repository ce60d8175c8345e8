//! User directory behind a swappable trait
//!
//! The pipeline only needs identity resolution; the backing store is a JSON
//! file (`data/users.json`) but nothing outside this module knows that.

use async_trait::async_trait;
use breathe_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

fn default_role() -> String {
    "citizen".to_string()
}

/// Registered user record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: String,
}

/// Identity resolution and registration
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Primary lookup: identity is an email address
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    /// Secondary lookup kept for compatibility with identities issued as
    /// display names; always tried explicitly after the email lookup fails.
    async fn find_by_name(&self, name: &str) -> Result<Option<UserRecord>>;
    async fn insert(&self, user: UserRecord) -> Result<()>;
}

/// JSON-file-backed user directory
pub struct JsonUserDirectory {
    path: PathBuf,
    // Serializes read-modify-write cycles on the backing file
    lock: Mutex<()>,
}

impl JsonUserDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Vec<UserRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&content) {
            Ok(users) => Ok(users),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "User directory unreadable, treating as empty"
                );
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, users: &[UserRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(users)
            .map_err(|e| Error::Internal(format!("Failed to serialize users: {}", e)))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for JsonUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let _guard = self.lock.lock().await;
        let users = self.load()?;
        Ok(users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<UserRecord>> {
        let _guard = self.lock.lock().await;
        let users = self.load()?;
        Ok(users.into_iter().find(|u| u.name == name))
    }

    async fn insert(&self, user: UserRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut users = self.load()?;

        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(Error::Validation("Email already registered".to_string()));
        }

        users.push(user);
        self.save(&users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn directory_with(users: &str) -> (TempDir, JsonUserDirectory) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, users).unwrap();
        (dir, JsonUserDirectory::new(path))
    }

    const USERS: &str = r#"[
        {"name": "alice", "email": "alice@example.com", "password": "x", "role": "citizen"},
        {"name": "bob", "email": "Bob@Example.com", "password": "y", "role": "citizen"}
    ]"#;

    #[tokio::test]
    async fn email_lookup_is_case_insensitive() {
        let (_dir, directory) = directory_with(USERS);

        let user = directory.find_by_email("BOB@example.com").await.unwrap();
        assert_eq!(user.unwrap().name, "bob");
    }

    #[tokio::test]
    async fn name_lookup_is_exact() {
        let (_dir, directory) = directory_with(USERS);

        assert!(directory.find_by_name("alice").await.unwrap().is_some());
        assert!(directory.find_by_name("Alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_resolves_nobody() {
        let dir = TempDir::new().unwrap();
        let directory = JsonUserDirectory::new(dir.path().join("absent.json"));

        assert!(directory
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() {
        let (_dir, directory) = directory_with(USERS);

        let result = directory
            .insert(UserRecord {
                name: "alice2".to_string(),
                email: "ALICE@example.com".to_string(),
                role: "citizen".to_string(),
            })
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn insert_persists_new_user() {
        let dir = TempDir::new().unwrap();
        let directory = JsonUserDirectory::new(dir.path().join("data").join("users.json"));

        directory
            .insert(UserRecord {
                name: "carol".to_string(),
                email: "carol@example.com".to_string(),
                role: "citizen".to_string(),
            })
            .await
            .unwrap();

        let found = directory.find_by_email("carol@example.com").await.unwrap();
        assert_eq!(found.unwrap().name, "carol");
    }
}
