use std::path::{Path, PathBuf};

use log::{debug, trace};
use matrix_sdk::authentication::matrix;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// File holding the login session and the sync token.
const SESSION_FILE: &str = "session";
/// Directory of the Matrix SDK state store.
const SQLITE_DIR: &str = "sqlite";

/// Persisted login data.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Session {
    /// The Matrix user session containing authentication credentials.
    user_session: matrix::MatrixSession,

    /// The latest sync token for resuming sync operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

/// Matrix session manager.
///
/// The session directory contains:
/// - `session`: JSON file with the login session and the last sync token
/// - `sqlite`: SQLite store of the Matrix SDK
///
/// # Examples
///
/// ```no_run
/// use tazdingo::matrix::session::MatrixSession;
///
/// # async fn example() -> Result<(), anyhow::Error> {
/// let matrix_session = MatrixSession::new("data/session").await?;
/// if !matrix_session.has_session() {
///     println!("first start, logging in with the password");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MatrixSession {
    /// The user session if it exists.
    session: Option<Session>,
    sqlite_path: PathBuf,
    session_path: PathBuf,
}

impl MatrixSession {
    /// Opens the session directory `dir_path`, creating it if needed.
    ///
    /// A missing or unreadable session file means the bot has to log in again.
    pub async fn new(dir_path: impl AsRef<Path>) -> Result<MatrixSession, anyhow::Error> {
        let dir_path = dir_path.as_ref();
        debug!("read session at {}", dir_path.display());
        fs::create_dir_all(dir_path).await?;

        let sqlite_path = dir_path.join(SQLITE_DIR);
        let session_path = dir_path.join(SESSION_FILE);

        let session = match MatrixSession::get_session(&session_path).await {
            Ok(session) => Some(session),
            Err(err) => {
                debug!("no usable session at {}: {}", session_path.display(), err);
                None
            }
        };

        Ok(MatrixSession {
            session,
            sqlite_path,
            session_path,
        })
    }

    async fn get_session(session_path: &Path) -> Result<Session, anyhow::Error> {
        let session_data = fs::read_to_string(session_path).await?;
        let session: Session = serde_json::from_str(&session_data)?;
        Ok(session)
    }

    /// Whether a session was loaded when the manager was created.
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn user_session(&self) -> Option<&matrix::MatrixSession> {
        self.session.as_ref().map(|s| &s.user_session)
    }

    pub fn sync_token(&self) -> Option<String> {
        self.session.as_ref().and_then(|s| s.sync_token.clone())
    }

    /// Persists the sync token, keeping the stored user session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session file cannot be read, parsed, or written.
    pub async fn persist_sync_token(&self, sync_token: String) -> anyhow::Result<()> {
        trace!("persist sync token {}", sync_token);

        let mut session = MatrixSession::get_session(&self.session_path).await?;
        session.sync_token = Some(sync_token);
        fs::write(&self.session_path, serde_json::to_string(&session)?).await?;

        trace!("sync token persisted");
        Ok(())
    }

    /// Persists a fresh user session, dropping any previous sync token.
    pub async fn persist_user_session(&self, user_session: &matrix::MatrixSession) -> anyhow::Result<()> {
        trace!("persist user session");

        let session = Session {
            user_session: user_session.clone(),
            sync_token: None,
        };
        fs::write(&self.session_path, serde_json::to_string(&session)?).await?;

        trace!("user session persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use matrix_sdk::{SessionMeta, SessionTokens, authentication::matrix::MatrixSession as SdkMatrixSession};
    use tempfile::TempDir;

    use super::*;

    fn create_mock_matrix_session() -> SdkMatrixSession {
        let session_meta = SessionMeta {
            user_id: "@tazdingo:example.com".try_into().unwrap(),
            device_id: "DEVICEID".into(),
        };

        let tokens = SessionTokens {
            access_token: "access_token".to_string(),
            refresh_token: None,
        };

        SdkMatrixSession {
            meta: session_meta,
            tokens,
        }
    }

    #[tokio::test]
    async fn test_new_without_session() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().join("session");

        let matrix_session = MatrixSession::new(&dir_path).await.unwrap();

        assert!(dir_path.is_dir());
        assert!(!matrix_session.has_session());
        assert_eq!(matrix_session.sqlite_path(), dir_path.join("sqlite"));
        assert!(matrix_session.user_session().is_none());
        assert!(matrix_session.sync_token().is_none());
    }

    #[tokio::test]
    async fn test_invalid_session_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("session"), "invalid json")
            .await
            .unwrap();

        let matrix_session = MatrixSession::new(temp_dir.path()).await.unwrap();

        assert!(!matrix_session.has_session());
    }

    #[tokio::test]
    async fn test_persist_then_reload() {
        let temp_dir = TempDir::new().unwrap();
        let matrix_session = MatrixSession::new(temp_dir.path()).await.unwrap();

        matrix_session
            .persist_user_session(&create_mock_matrix_session())
            .await
            .unwrap();
        matrix_session
            .persist_sync_token("sync_token_123".to_string())
            .await
            .unwrap();

        let reloaded = MatrixSession::new(temp_dir.path()).await.unwrap();
        assert!(reloaded.has_session());
        assert_eq!(
            reloaded.user_session().unwrap().meta.user_id.to_string(),
            "@tazdingo:example.com"
        );
        assert_eq!(reloaded.sync_token(), Some("sync_token_123".to_string()));
    }

    #[tokio::test]
    async fn test_persist_sync_token_without_session_fails() {
        let temp_dir = TempDir::new().unwrap();
        let matrix_session = MatrixSession::new(temp_dir.path()).await.unwrap();

        assert!(
            matrix_session
                .persist_sync_token("token".to_string())
                .await
                .is_err()
        );
    }

    #[test]
    fn test_session_serialization_without_sync_token() {
        let session = Session {
            user_session: create_mock_matrix_session(),
            sync_token: None,
        };

        let serialized = serde_json::to_string(&session).unwrap();

        assert!(!serialized.contains("sync_token"));
        assert!(serialized.contains("@tazdingo:example.com"));
    }
}
