//! Matrix protocol integration for the bot.
//!
//! - [`client::MatrixClient`]: messaging, reactions and member lookups
//! - `login`: password login and session restore
//! - [`session::MatrixSession`]: session and sync token persistence
//! - [`sync::MatrixSync`]: real-time event handling and auto-join
//! - [`notifier::RoomNotifier`]: expiry announcements in the alerts room
//!
//! # Examples
//!
//! ```no_run
//! use tazdingo::matrix::{UserCredentials, MatrixClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let credentials = UserCredentials {
//!     user_id: "@tazdingo:example.com".to_string(),
//!     password: "password".to_string(),
//! };
//!
//! let client = MatrixClient::new(&credentials, "./data/session").await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod login;
mod notifier;
pub mod session;
pub mod sync;

pub use crate::matrix::{client::MatrixClient, notifier::RoomNotifier, sync::IncomingMessage};

/// User credentials for a Matrix account
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// User ID of the matrix account
    pub user_id: String,
    /// Password of the matrix account
    pub password: String,
}
