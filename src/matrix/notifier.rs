use std::sync::Arc;

use crate::{
    matrix::MatrixClient,
    notifier::{Announcement, Notifier},
};

/// Posts announcements in a single room, mentioning their recipients.
pub struct RoomNotifier {
    client: Arc<MatrixClient>,
    room_id: String,
}

impl RoomNotifier {
    pub fn new(client: Arc<MatrixClient>, room_id: &str) -> Self {
        RoomNotifier {
            client,
            room_id: room_id.to_string(),
        }
    }
}

impl Notifier for RoomNotifier {
    async fn notify(&self, announcement: &Announcement) -> anyhow::Result<()> {
        self.client
            .send_mention(&self.room_id, &announcement.message, &announcement.recipients)
            .await
    }
}
