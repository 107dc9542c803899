//! Delivery of expiry notifications.
//!
//! The tracker decides what happened. This module turns those
//! [`Notification`]s into chat [`Announcement`]s and hands them to a
//! [`Notifier`], which knows how to reach the users.

use futures::future::join_all;
use log::{error, info};
use mockall::automock;

use crate::expiry::Notification;

/// A message to deliver, mentioning every recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    /// Matrix user IDs to mention.
    pub recipients: Vec<String>,
    /// Markdown body, already containing the mentions.
    pub message: String,
}

/// Sink for announcements.
#[automock]
pub trait Notifier {
    async fn notify(&self, announcement: &Announcement) -> anyhow::Result<()>;
}

/// Builds the announcements for one tick.
///
/// Expired shields are batched into a single announcement, and so are
/// expiring ones. Each prey tier gets its own announcement to the tracker.
///
/// # Examples
///
/// ```no_run
/// # use tazdingo::{expiry::Notification, notifier::compose};
/// let announcements = compose(&[
///     Notification::ShieldExpired { owner_id: "@a:x.org".to_string() },
///     Notification::ShieldExpired { owner_id: "@b:x.org".to_string() },
/// ]);
/// assert_eq!(announcements.len(), 1);
/// assert_eq!(announcements[0].message, "@a:x.org @b:x.org Hey! Your shield has expired!");
/// ```
pub fn compose(notifications: &[Notification]) -> Vec<Announcement> {
    let mut expired = Vec::new();
    let mut expiring = Vec::new();
    let mut preys = Vec::new();

    for notification in notifications {
        match notification {
            Notification::ShieldExpired { owner_id } => expired.push(owner_id.clone()),
            Notification::ShieldExpiring { owner_id } => expiring.push(owner_id.clone()),
            Notification::PreyTier {
                owner_id,
                tracking_key,
                tier,
            } => preys.push(Announcement {
                recipients: vec![owner_id.clone()],
                message: format!(
                    "{} {}'s {} hour shield may have expired!",
                    owner_id, tracking_key, tier
                ),
            }),
        }
    }

    let mut announcements = Vec::with_capacity(preys.len() + 2);
    for (recipients, text) in [
        (expired, "Hey! Your shield has expired!"),
        (expiring, "Hey! Your shield has almost expired!"),
    ] {
        if !recipients.is_empty() {
            announcements.push(Announcement {
                message: format!("{} {}", recipients.join(" "), text),
                recipients,
            });
        }
    }
    announcements.extend(preys);

    announcements
}

/// Delivers every announcement, concurrently.
///
/// A failed delivery is logged and does not prevent the others.
///
/// # Returns
///
/// The number of announcements delivered.
pub async fn announce<N: Notifier>(notifier: &N, announcements: &[Announcement]) -> usize {
    let results = join_all(announcements.iter().map(|a| notifier.notify(a))).await;

    let mut delivered = 0;
    for (announcement, result) in announcements.iter().zip(results) {
        match result {
            Ok(()) => delivered += 1,
            Err(err) => error!(
                "failed to notify {}: {:#}",
                announcement.recipients.join(", "),
                err
            ),
        }
    }

    if delivered > 0 {
        info!("delivered {} announcements", delivered);
    }
    delivered
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;
    use crate::registry::Tier;

    fn expired(owner: &str) -> Notification {
        Notification::ShieldExpired {
            owner_id: owner.to_string(),
        }
    }

    #[test]
    fn test_compose_empty() {
        assert!(compose(&[]).is_empty());
    }

    #[test]
    fn test_compose_batches_shields() {
        let announcements = compose(&[
            expired("@a:x.org"),
            Notification::ShieldExpiring {
                owner_id: "@c:x.org".to_string(),
            },
            expired("@b:x.org"),
        ]);

        assert_eq!(
            announcements,
            vec![
                Announcement {
                    recipients: vec!["@a:x.org".to_string(), "@b:x.org".to_string()],
                    message: "@a:x.org @b:x.org Hey! Your shield has expired!".to_string(),
                },
                Announcement {
                    recipients: vec!["@c:x.org".to_string()],
                    message: "@c:x.org Hey! Your shield has almost expired!".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_compose_prey_tier() {
        let announcements = compose(&[Notification::PreyTier {
            owner_id: "@a:x.org".to_string(),
            tracking_key: "bob".to_string(),
            tier: Tier::Eight,
        }]);

        assert_eq!(announcements.len(), 1);
        assert_eq!(announcements[0].recipients, vec!["@a:x.org".to_string()]);
        assert_eq!(
            announcements[0].message,
            "@a:x.org bob's 8 hour shield may have expired!"
        );
    }

    #[tokio::test]
    async fn test_announce_continues_after_failure() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|a| a.recipients == vec!["@a:x.org".to_string()])
            .times(1)
            .returning(|_| Err(anyhow!("room not found")));
        notifier
            .expect_notify()
            .withf(|a| a.recipients == vec!["@b:x.org".to_string()])
            .times(1)
            .returning(|_| Ok(()));

        let announcements = compose(&[
            Notification::ShieldExpiring {
                owner_id: "@b:x.org".to_string(),
            },
            expired("@a:x.org"),
        ]);

        assert_eq!(announce(&notifier, &announcements).await, 1);
    }
}
