//! Markdown response formatters for bot commands.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{
    time::format_remaining,
    tracker::{Hive, UpcomingTier},
};

/// Formats the help message showing available bot commands.
///
/// # Examples
///
/// ```
/// # use tazdingo::commands::responses::format_help;
/// assert!(format_help(true).contains("track"));
/// assert!(!format_help(false).contains("track"));
/// ```
pub fn format_help(prey_tracking: bool) -> String {
    let mut body = "General commands:\n\
        - `help`: show this help message\n\
        - `status`: show the bot status\n\
        - `hive`: list all shields and reinforcements\n\n\
        Shield commands:\n\
        - `shield <duration>`: set a shield, e.g. `8`, `1d 2h` or `30 minutes`\n\
        - `unshield`: break your shield\n\
        - `notify`: mention everyone whose shield expired\n\n\
        Reinforcement commands:\n\
        - `rein`: reinforce\n\
        - `recall`: recall your reinforcement\n\n\
        Moderator commands:\n\
        - `prune`: remove expired shields\n"
        .to_owned();

    if prey_tracking {
        body.push_str(
            "\nTrack commands:\n\
            - `tracks`: list upcoming tracked shields\n\
            - `track <who> [<x>,<y>] [<hours>...]`: track the 4, 8, 12 and 24 hour shields of a prey, or only the given ones\n\
            - `lose <who>`: stop tracking\n",
        );
    }

    body
}

pub fn format_unknown_command() -> String {
    "Unknown command. Type `!taz help` for more information.".to_owned()
}

pub fn format_invalid_shield() -> String {
    "Invalid shield command. Usage: `!taz shield <duration>`, e.g. `!taz shield 1d 2h`.".to_owned()
}

pub fn format_invalid_track() -> String {
    "Invalid track command. Usage: `!taz track <who> [<x>,<y>] [<hours>...]` with hours among 4, 8, 12 and 24."
        .to_owned()
}

pub fn format_invalid_lose() -> String {
    "Invalid lose command. Usage: `!taz lose <who>`.".to_owned()
}

pub fn format_owner_only() -> String {
    "Only bot owners can do that.".to_owned()
}

/// Formats the bot status.
///
/// # Examples
///
/// ```
/// # use chrono::{TimeDelta, Utc};
/// # use tazdingo::commands::responses::format_status;
/// let now = Utc::now();
/// let status = format_status(now, now - TimeDelta::hours(2));
/// assert!(status.ends_with("up 2h"));
/// ```
pub fn format_status(now: DateTime<Utc>, started_at: DateTime<Utc>) -> String {
    format!(
        "Taz'dingo! Ye-e-es!\n{} up {}",
        now.format("%Y-%m-%d %H:%M:%S UTC"),
        format_remaining(now - started_at)
    )
}

/// Formats shields, soonest first, then reinforcements.
pub fn format_hive(hive: &Hive) -> String {
    let mut sections = Vec::new();

    if !hive.shields.is_empty() {
        let lines: Vec<String> = hive
            .shields
            .iter()
            .map(|status| {
                let remaining = if status.remaining < TimeDelta::zero() {
                    "expired".to_owned()
                } else {
                    format_remaining(status.remaining)
                };
                format!("{} {}", remaining, status.shield.display_label)
            })
            .collect();
        sections.push(format!("Shields:\n```\n{}\n```", lines.join("\n")));
    }

    if !hive.reinforcements.is_empty() {
        let lines: Vec<&str> = hive
            .reinforcements
            .iter()
            .map(|rein| rein.display_label.as_str())
            .collect();
        sections.push(format!("Reins:\n```\n{}\n```", lines.join("\n")));
    }

    sections.join("\n")
}

/// Formats the upcoming prey tiers, soonest first.
pub fn format_tracks(upcoming: &[UpcomingTier]) -> String {
    if upcoming.is_empty() {
        return "No tracked shield left to wait for.".to_owned();
    }

    let lines: Vec<String> = upcoming
        .iter()
        .map(|track| {
            let remaining = match format_remaining(track.remaining) {
                text if text.is_empty() => "now".to_owned(),
                text => text,
            };
            match track.coordinates {
                Some(coordinates) => format!(
                    "{} {} ({}h) at {}",
                    remaining, track.tracking_key, track.tier, coordinates
                ),
                None => format!("{} {} ({}h)", remaining, track.tracking_key, track.tier),
            }
        })
        .collect();

    format!("Tracks:\n```\n{}\n```", lines.join("\n"))
}

/// Formats the mention of every owner whose shield expired.
pub fn format_notify(owners: &[String]) -> String {
    format!("{} Hey! Your shield has expired!", owners.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::{Coordinates, ReinforcementRecord, ShieldRecord, Tier},
        tracker::ShieldStatus,
    };

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn status(label: &str, remaining: TimeDelta) -> ShieldStatus {
        let shield = ShieldRecord::new(label, label, now() - TimeDelta::hours(8), TimeDelta::hours(8) + remaining)
            .unwrap();
        ShieldStatus { shield, remaining }
    }

    #[test]
    fn test_format_help() {
        assert!(format_help(true).contains("`shield <duration>`"));
        assert!(format_help(true).contains("`lose <who>`"));
        assert!(!format_help(false).contains("Track commands"));
    }

    #[test]
    fn test_format_status() {
        assert_eq!(
            format_status(now(), now() - TimeDelta::seconds(3_661)),
            "Taz'dingo! Ye-e-es!\n2024-05-01 12:00:00 UTC up 1h 1m 1s"
        );
    }

    #[test]
    fn test_format_hive() {
        let hive = Hive {
            shields: vec![
                status("Alice", TimeDelta::seconds(-30)),
                status("Bea", TimeDelta::minutes(90)),
            ],
            reinforcements: vec![ReinforcementRecord::new("@c:x.org", "Cid", now())],
        };

        assert_eq!(
            format_hive(&hive),
            "Shields:\n```\nexpired Alice\n1h 30m Bea\n```\nReins:\n```\nCid\n```"
        );
    }

    #[test]
    fn test_format_hive_reinforcements_only() {
        let hive = Hive {
            shields: vec![],
            reinforcements: vec![ReinforcementRecord::new("@c:x.org", "Cid", now())],
        };

        assert_eq!(format_hive(&hive), "Reins:\n```\nCid\n```");
    }

    #[test]
    fn test_format_tracks() {
        let upcoming = vec![
            UpcomingTier {
                tracking_key: "amy".to_string(),
                owner_id: "@a:x.org".to_string(),
                coordinates: None,
                tier: Tier::Four,
                remaining: TimeDelta::zero(),
            },
            UpcomingTier {
                tracking_key: "bob".to_string(),
                owner_id: "@a:x.org".to_string(),
                coordinates: Some(Coordinates { x: 12, y: 7 }),
                tier: Tier::Eight,
                remaining: TimeDelta::minutes(75),
            },
        ];

        assert_eq!(
            format_tracks(&upcoming),
            "Tracks:\n```\nnow amy (4h)\n1h 15m bob (8h) at 12,7\n```"
        );
        assert_eq!(format_tracks(&[]), "No tracked shield left to wait for.");
    }

    #[test]
    fn test_format_notify() {
        assert_eq!(
            format_notify(&["@a:x.org".to_string(), "@b:x.org".to_string()]),
            "@a:x.org @b:x.org Hey! Your shield has expired!"
        );
    }
}
