//! Persisted authentication record.
//!
//! The session is a plain value: it is read once with [`Session::load`],
//! changed in memory, and written back with [`Session::save`]. Nothing else in
//! the crate touches the file. The feed core only ever sees a session through
//! the [`CurrentIdentity`] accessor.
use crate::api::{Credentials, UserSummary};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to write session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Accessor for "who is looking at this feed right now".
///
/// Returns the logged-in user's id, or `None` for anonymous viewers.
pub trait CurrentIdentity: Send + Sync {
    fn user_id(&self) -> Option<i64>;
}

impl<F> CurrentIdentity for F
where
    F: Fn() -> Option<i64> + Send + Sync,
{
    fn user_id(&self) -> Option<i64> {
        self()
    }
}

/// The logged-in user plus the password needed for Basic auth.
///
/// Custom `Debug` comes from `SecretString`, which never prints the password.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub image: Option<String>,
    pub password: SecretString,
    pub is_logged_in: bool,
}

/// On-disk shape, kept separate so the in-memory type can hold a `SecretString`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    username: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    password: String,
    #[serde(default)]
    is_logged_in: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            id: 0,
            username: String::new(),
            display_name: String::new(),
            image: None,
            password: SecretString::from(String::new()),
            is_logged_in: false,
        }
    }

    /// Session after a successful login: the server's view of the user plus
    /// the password that was used.
    pub fn logged_in(user: UserSummary, password: SecretString) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            image: user.image,
            password,
            is_logged_in: true,
        }
    }

    /// Load the session file.
    ///
    /// - Missing file → anonymous
    /// - Unreadable or malformed file → anonymous, logged as a warning
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No session file, starting anonymous");
                return Self::anonymous();
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read session file");
                return Self::anonymous();
            }
        };

        match serde_json::from_str::<StoredSession>(&content) {
            Ok(stored) => Self {
                id: stored.id,
                username: stored.username,
                display_name: stored.display_name,
                image: stored.image,
                password: SecretString::from(stored.password),
                is_logged_in: stored.is_logged_in,
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed session file");
                Self::anonymous()
            }
        }
    }

    /// Write the session file atomically (temp file + rename), user-only
    /// permissions on Unix.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let stored = StoredSession {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            image: self.image.clone(),
            password: self.password.expose_secret().to_string(),
            is_logged_in: self.is_logged_in,
        };
        let bytes = serde_json::to_vec_pretty(&stored)?;
        atomic_write(path, &bytes)?;
        tracing::debug!(path = %path.display(), logged_in = self.is_logged_in, "Session saved");
        Ok(())
    }

    /// Basic-auth credentials, only while logged in.
    pub fn credentials(&self) -> Option<Credentials> {
        self.is_logged_in.then(|| Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }

    /// Adopt an updated profile returned by the server, keeping the password.
    pub fn apply_profile(&mut self, user: &UserSummary) {
        self.display_name = user.display_name.clone();
        self.image = user.image.clone();
    }

    pub fn as_user(&self) -> Option<UserSummary> {
        self.is_logged_in.then(|| UserSummary {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            image: self.image.clone(),
        })
    }
}

impl CurrentIdentity for Session {
    fn user_id(&self) -> Option<i64> {
        self.is_logged_in.then_some(self.id)
    }
}

/// Write `bytes` to `dst` via a uniquely named temp file and a rename, so a
/// crash never leaves a half-written session behind.
fn atomic_write(dst: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let result = (|| {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(bytes)?;
        temp_file.sync_all()?;
        drop(temp_file);

        // On Windows, rename fails if destination exists, so remove it first
        #[cfg(windows)]
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }

        std::fs::rename(&temp_path, dst)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}
