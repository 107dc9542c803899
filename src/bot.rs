//! Bot module wiring the tracker to Matrix.
//!
//! # Architecture
//!
//! The bot runs two concurrent tasks sharing one [`Tracker`] behind a mutex:
//!
//! 1. **Tick Task**: every `bot.tick_interval` seconds, evaluates the expiry
//!    transitions, releases the lock, then announces the resulting
//!    notifications in the alerts room.
//! 2. **Matrix Sync Task**: listens for messages in the commands room, parses
//!    `!taz` commands, executes them and acknowledges with a reaction or a
//!    reply.
//!
//! # Command Processing Flow
//!
//! ```text
//! Matrix Message → Parse Command → Execute → React (🤖 / ❌) and Reply
//! ```

use std::{path::Path, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::{debug, error, info};
use tokio::{fs, sync::Mutex, time};

use crate::{
    commands::{CommandContext, CommandParseError, CommandResult, Commander, Outcome},
    config::{BotSettings, Config},
    matrix::{IncomingMessage, MatrixClient, RoomNotifier, UserCredentials},
    notifier::{announce, compose},
    registry::JsonStore,
    tracker::Tracker,
};

/// Reaction acknowledging a successful command.
const SUCCESS_REACTION: &str = "🤖";
/// Reaction acknowledging a failed command.
const FAILURE_REACTION: &str = "❌";

/// Everything a message handler needs, shared across handler invocations.
struct Shared {
    matrix_client: Arc<MatrixClient>,
    tracker: Arc<Mutex<Tracker<JsonStore>>>,
    commander: Commander,
    settings: BotSettings,
    commands_room: String,
    started_at: DateTime<Utc>,
}

/// Main bot structure.
pub struct Bot {
    /// Matrix client for sending and receiving messages.
    matrix_client: Arc<MatrixClient>,

    /// Registry and persistence, shared by the tick task and the command handlers.
    tracker: Arc<Mutex<Tracker<JsonStore>>>,

    settings: BotSettings,
    commands_room: String,
    alerts_room: String,
}

impl Bot {
    /// Creates a new Bot from the configuration and the data directory.
    ///
    /// The data directory holds the Matrix session (`session/`) and the
    /// records store (`records.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be loaded or the Matrix login
    /// fails.
    pub async fn new(config: Config, data_path: &Path) -> Result<Self, anyhow::Error> {
        fs::create_dir_all(data_path).await?;

        let store = JsonStore::open(data_path).await?;
        let tracker = Tracker::load(store, config.bot.prey_tracking).await?;

        let matrix_client = Arc::new(
            MatrixClient::new(
                &UserCredentials {
                    user_id: config.matrix.user_id,
                    password: config.matrix.password,
                },
                data_path.join("session"),
            )
            .await?,
        );

        Ok(Bot {
            matrix_client,
            tracker: Arc::new(Mutex::new(tracker)),
            settings: config.bot,
            commands_room: config.matrix.commands_room,
            alerts_room: config.matrix.alerts_room,
        })
    }

    /// Starts the tick task and the Matrix sync loop. Runs until the sync
    /// loop ends.
    pub async fn start(self) -> anyhow::Result<()> {
        self.start_tick_task();

        let shared = Arc::new(Shared {
            matrix_client: Arc::clone(&self.matrix_client),
            tracker: Arc::clone(&self.tracker),
            commander: Commander::new(),
            settings: self.settings,
            commands_room: self.commands_room,
            started_at: Utc::now(),
        });

        let on_message = move |message: IncomingMessage| {
            Self::handle_matrix_message(Arc::clone(&shared), message);
        };

        self.matrix_client.sync(on_message).await
    }

    /// Spawns the periodic expiry check.
    ///
    /// The tracker lock is held only while planning and applying transitions;
    /// announcements are sent after it is released.
    fn start_tick_task(&self) {
        let tracker = Arc::clone(&self.tracker);
        let notifier = RoomNotifier::new(Arc::clone(&self.matrix_client), &self.alerts_room);
        let tick_interval = self.settings.tick_interval;

        tokio::spawn(async move {
            info!("checking expiries every {} seconds", tick_interval);
            let mut interval = time::interval(Duration::from_secs(tick_interval));

            loop {
                interval.tick().await;

                let notifications = tracker.lock().await.tick(Utc::now()).await;
                if notifications.is_empty() {
                    continue;
                }

                let announcements = compose(&notifications);
                let delivered = announce(&notifier, &announcements).await;
                debug!("delivered {}/{} announcements", delivered, announcements.len());
            }
        });
    }

    /// Handles a message in its own task so the sync loop is never blocked.
    fn handle_matrix_message(shared: Arc<Shared>, message: IncomingMessage) {
        if message.room_id != shared.commands_room {
            return;
        }

        tokio::spawn(async move {
            let command = match shared.commander.parse(&message.body) {
                Ok(command) => command,
                Err(CommandParseError::NotForBot) => return,
                Err(CommandParseError::InvalidCommand(usage)) => {
                    let result = CommandResult::failure(usage);
                    Self::respond(&shared, &message, &result).await;
                    return;
                }
            };

            let context = CommandContext {
                display_name: shared
                    .matrix_client
                    .display_name(&message.room_id, &message.sender_id)
                    .await,
                is_owner: shared.settings.is_owner(&message.sender_id),
                user_id: message.sender_id.clone(),
                now: Utc::now(),
                started_at: shared.started_at,
            };

            let result = {
                let mut tracker = shared.tracker.lock().await;
                shared.commander.execute(&command, &context, &mut *tracker).await
            };

            Self::respond(&shared, &message, &result).await;
        });
    }

    /// Sends the reaction and the text of `result` back to the sender.
    async fn respond(shared: &Shared, message: &IncomingMessage, result: &CommandResult) {
        let client = &shared.matrix_client;

        if let Some(key) = reaction_for(result.outcome)
            && let Err(err) = client.react(&message.room_id, &message.event_id, key).await
        {
            error!("failed to react to {}: {:?}", message.event_id, err);
        }

        let Some(response) = &result.response else {
            return;
        };

        let sent = if result.mentions.is_empty() {
            client
                .send_reply(&message.room_id, &message.sender_id, &message.event_id, response)
                .await
        } else {
            client
                .send_mention(&message.room_id, response, &result.mentions)
                .await
        };

        if let Err(err) = sent {
            error!("failed to answer {}: {:?}", message.event_id, err);
        }
    }
}

/// Reaction acknowledging a command, none for neutral outcomes.
fn reaction_for(outcome: Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::Success => Some(SUCCESS_REACTION),
        Outcome::Failure => Some(FAILURE_REACTION),
        Outcome::Neutral => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_for_outcomes() {
        assert_eq!(reaction_for(Outcome::Success), Some("🤖"));
        assert_eq!(reaction_for(Outcome::Failure), Some("❌"));
        assert_eq!(reaction_for(Outcome::Neutral), None);
    }
}
