//! Matrix client wrapper for bot messaging and synchronization.
//!
//! This module provides a high-level [`MatrixClient`] interface that wraps the
//! Matrix SDK client and handles message sending, reactions, synchronization,
//! and session management.

use std::path::Path;

use anyhow::{Context, anyhow};
use log::{debug, error, info, warn};
use matrix_sdk::{
    Client,
    ruma::{
        EventId, RoomId, UserId,
        events::{
            Mentions,
            reaction::ReactionEventContent,
            relation::Annotation,
            room::message::{AddMentions, ForwardThread, ReplyMetadata, RoomMessageEventContent},
        },
    },
};

use crate::matrix::{
    UserCredentials,
    login::setup_client,
    session::MatrixSession,
    sync::{IncomingMessage, MatrixSync},
};

/// Display name set on the bot account at startup.
const DISPLAY_NAME: &str = "Tazdingo";

/// High-level Matrix client for bot messaging operations.
pub struct MatrixClient {
    /// Synchronization service for handling real-time events
    matrix_sync: MatrixSync,
    /// Underlying Matrix SDK client
    client: Client,
}

impl MatrixClient {
    /// Creates and initializes a new Matrix client.
    ///
    /// Restores the session stored in `session_path` or logs in with the
    /// password, then sets the bot display name.
    ///
    /// # Errors
    ///
    /// Returns an error if the session directory cannot be opened or the
    /// login fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tazdingo::matrix::{UserCredentials, MatrixClient};
    ///
    /// # async fn example() -> Result<(), anyhow::Error> {
    /// let credentials = UserCredentials {
    ///     user_id: "@tazdingo:example.com".to_string(),
    ///     password: "secure_password".to_string(),
    /// };
    ///
    /// let client = MatrixClient::new(&credentials, "./data/session").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn new(
        user_credentials: &UserCredentials,
        session_path: impl AsRef<Path>,
    ) -> Result<Self, anyhow::Error> {
        let matrix_session = MatrixSession::new(session_path)
            .await
            .context("failed to create matrix session")?;

        let client = setup_client(user_credentials, &matrix_session)
            .await
            .context("failed to setup matrix client")?;

        if let Err(err) = client.account().set_display_name(Some(DISPLAY_NAME)).await {
            warn!("failed to set display name: {:?}", err);
        }

        let matrix_sync = MatrixSync::new(&client, &matrix_session);

        Ok(MatrixClient {
            matrix_sync,
            client,
        })
    }

    /// Starts the Matrix synchronization loop.
    ///
    /// `on_message` is invoked for each incoming text message. The sync loop
    /// runs until a fatal error.
    pub async fn sync<F>(&self, on_message: F) -> Result<(), anyhow::Error>
    where
        F: Fn(IncomingMessage) + Send + Sync + 'static,
    {
        match self.matrix_sync.sync(on_message).await {
            Ok(_) => info!("matrix sync ended successfully"),
            Err(e) => error!("matrix sync ended with error: {:?}", e),
        }

        Ok(())
    }

    /// Sends a Markdown message mentioning every user in `user_ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if a user ID is malformed or the message cannot be
    /// sent.
    pub async fn send_mention(&self, room_id: &str, body: &str, user_ids: &[String]) -> anyhow::Result<()> {
        let users = user_ids
            .iter()
            .map(|user_id| UserId::parse(user_id.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        let content = RoomMessageEventContent::text_markdown(body).add_mentions(Mentions::with_user_ids(users));

        self.send(room_id, content).await
    }

    /// Sends a Markdown reply to the message `event_id` of `sender_id`.
    pub async fn send_reply(&self, room_id: &str, sender_id: &str, event_id: &str, body: &str) -> anyhow::Result<()> {
        let sender = UserId::parse(sender_id)?;
        let event = EventId::parse(event_id)?;

        let content = RoomMessageEventContent::text_markdown(body).make_reply_to(
            ReplyMetadata::new(&event, &sender, None),
            ForwardThread::No,
            AddMentions::No,
        );

        self.send(room_id, content).await
    }

    /// Reacts to the message `event_id` with `key`.
    pub async fn react(&self, room_id: &str, event_id: &str, key: &str) -> anyhow::Result<()> {
        let event = EventId::parse(event_id)?;
        let room = self.room(room_id)?;

        let content = ReactionEventContent::new(Annotation::new(event, key.to_string()));
        room.send(content).await?;

        debug!("reacted {} to {}", key, event_id);
        Ok(())
    }

    /// Display name of `user_id` in `room_id`, or the user ID when unknown.
    pub async fn display_name(&self, room_id: &str, user_id: &str) -> String {
        let member = match (self.room(room_id), UserId::parse(user_id)) {
            (Ok(room), Ok(user)) => room.get_member_no_sync(&user).await,
            _ => return user_id.to_string(),
        };

        match member {
            Ok(Some(member)) => member.display_name().unwrap_or(user_id).to_string(),
            Ok(None) => user_id.to_string(),
            Err(err) => {
                warn!("failed to get member {} of {}: {:?}", user_id, room_id, err);
                user_id.to_string()
            }
        }
    }

    fn room(&self, room_id: &str) -> anyhow::Result<matrix_sdk::Room> {
        let room_id = RoomId::parse(room_id)?;
        self.client
            .get_room(&room_id)
            .ok_or_else(|| anyhow!("room {} is not joined", room_id))
    }

    async fn send(&self, room_id: &str, content: RoomMessageEventContent) -> anyhow::Result<()> {
        let room = self.room(room_id)?;
        room.send(content).await?;
        Ok(())
    }
}
