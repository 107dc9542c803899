use chrono::{DateTime, TimeDelta, Utc};

use crate::registry::ShieldRecord;

/// Remaining time under which a shield is announced as expiring.
pub const EXPIRING_WINDOW: TimeDelta = TimeDelta::hours(1);

/// One-shot edges of the shield state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShieldEdge {
    /// Less than an hour left.
    Expiring,
    /// The shield ran out.
    Expired,
}

/// Returns the edge `shield` crosses at `now`, if any.
///
/// The expired edge wins over the expiring one, so a shield that ran out
/// without ever being seen as expiring jumps straight to expired.
pub fn evaluate_shield(shield: &ShieldRecord, now: DateTime<Utc>) -> Option<ShieldEdge> {
    let remaining = shield.remaining(now);

    if !shield.expired_notified && remaining < TimeDelta::zero() {
        Some(ShieldEdge::Expired)
    } else if !shield.expiring_notified && remaining < EXPIRING_WINDOW {
        Some(ShieldEdge::Expiring)
    } else {
        None
    }
}

/// Marks `edge` as notified on `shield`.
///
/// Expiring implies nothing else, expired also covers expiring.
pub fn apply_shield_edge(shield: &mut ShieldRecord, edge: ShieldEdge) {
    match edge {
        ShieldEdge::Expiring => shield.expiring_notified = true,
        ShieldEdge::Expired => {
            shield.expiring_notified = true;
            shield.expired_notified = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn shield_expiring_in(delta: TimeDelta) -> ShieldRecord {
        let entered_at = now() - TimeDelta::hours(10);
        ShieldRecord {
            owner_id: "@a:x.org".to_string(),
            display_label: "Alice".to_string(),
            entered_at,
            expires_at: now() + delta,
            expired_notified: false,
            expiring_notified: false,
        }
    }

    #[test]
    fn test_fresh_shield_has_no_edge() {
        let shield = shield_expiring_in(TimeDelta::hours(2));
        assert_eq!(evaluate_shield(&shield, now()), None);
    }

    #[test]
    fn test_expiring_edge_under_one_hour() {
        let shield = shield_expiring_in(TimeDelta::minutes(59));
        assert_eq!(evaluate_shield(&shield, now()), Some(ShieldEdge::Expiring));

        let shield = shield_expiring_in(TimeDelta::hours(1));
        assert_eq!(evaluate_shield(&shield, now()), None);
    }

    #[test]
    fn test_expired_edge_skips_expiring() {
        let mut shield = shield_expiring_in(TimeDelta::seconds(-1));
        assert_eq!(evaluate_shield(&shield, now()), Some(ShieldEdge::Expired));

        apply_shield_edge(&mut shield, ShieldEdge::Expired);
        assert!(shield.expired_notified);
        assert!(shield.expiring_notified);
        assert_eq!(evaluate_shield(&shield, now()), None);
    }

    #[test]
    fn test_exact_expiry_is_still_expiring() {
        let shield = shield_expiring_in(TimeDelta::zero());
        assert_eq!(evaluate_shield(&shield, now()), Some(ShieldEdge::Expiring));
    }

    #[test]
    fn test_expiring_then_expired() {
        let mut shield = shield_expiring_in(TimeDelta::minutes(30));

        let edge = evaluate_shield(&shield, now()).unwrap();
        apply_shield_edge(&mut shield, edge);
        assert_eq!(evaluate_shield(&shield, now()), None);

        let later = now() + TimeDelta::minutes(31);
        assert_eq!(evaluate_shield(&shield, later), Some(ShieldEdge::Expired));
    }
}
