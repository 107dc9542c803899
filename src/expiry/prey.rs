use chrono::{DateTime, Utc};

use crate::registry::{PreyRecord, Tier};

/// Returns the tier `prey` fires at `now`, if any.
///
/// Tiers are checked longest first and the first unnotified tier whose
/// threshold is reached wins, so a prey that went unseen for 13 hours fires
/// its 12 hour tier once instead of three tiers in a row.
pub fn evaluate_prey(prey: &PreyRecord, now: DateTime<Utc>) -> Option<Tier> {
    let elapsed = prey.elapsed(now);

    Tier::ALL
        .into_iter()
        .rev()
        .find(|tier| !prey.is_notified(*tier) && elapsed >= tier.threshold())
}

/// Returns the next tier still to fire for `prey` and when it will.
///
/// Tiers are checked shortest first. A tier whose deadline already passed is
/// skipped, so `None` means nothing is left to wait for at `now`.
pub fn next_deadline(prey: &PreyRecord, now: DateTime<Utc>) -> Option<(Tier, DateTime<Utc>)> {
    Tier::ALL.into_iter().find_map(|tier| {
        let deadline = prey.entered_at.checked_add_signed(tier.threshold())?;
        (!prey.is_notified(tier) && deadline >= now).then_some((tier, deadline))
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;
    use crate::registry::TierSet;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn prey_entered_ago(hours: i64, opted_out: &[Tier]) -> PreyRecord {
        let opted_out: TierSet = opted_out.iter().copied().collect();
        PreyRecord::new(
            "@a:x.org",
            "bob",
            None,
            &opted_out,
            now() - TimeDelta::hours(hours),
        )
    }

    #[test]
    fn test_nothing_reached() {
        let prey = prey_entered_ago(3, &[]);
        assert_eq!(evaluate_prey(&prey, now()), None);
    }

    #[test]
    fn test_highest_reached_tier_wins() {
        let prey = prey_entered_ago(13, &[]);
        assert_eq!(evaluate_prey(&prey, now()), Some(Tier::Twelve));

        let prey = prey_entered_ago(30, &[]);
        assert_eq!(evaluate_prey(&prey, now()), Some(Tier::TwentyFour));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let prey = prey_entered_ago(4, &[]);
        assert_eq!(evaluate_prey(&prey, now()), Some(Tier::Four));
    }

    #[test]
    fn test_opted_out_tier_falls_back_to_lower() {
        let prey = prey_entered_ago(13, &[Tier::Twelve]);
        assert_eq!(evaluate_prey(&prey, now()), Some(Tier::Eight));
    }

    #[test]
    fn test_next_deadline_is_shortest_pending() {
        let prey = prey_entered_ago(5, &[]);
        let entered_at = now() - TimeDelta::hours(5);

        assert_eq!(
            next_deadline(&prey, now()),
            Some((Tier::Eight, entered_at + TimeDelta::hours(8)))
        );
    }

    #[test]
    fn test_next_deadline_skips_notified() {
        let prey = prey_entered_ago(1, &[Tier::Four, Tier::Eight]);
        let entered_at = now() - TimeDelta::hours(1);

        assert_eq!(
            next_deadline(&prey, now()),
            Some((Tier::Twelve, entered_at + TimeDelta::hours(12)))
        );
    }

    #[test]
    fn test_next_deadline_none_when_all_passed() {
        let prey = prey_entered_ago(25, &[]);
        assert_eq!(next_deadline(&prey, now()), None);
    }
}
