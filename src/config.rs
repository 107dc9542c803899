//! Configuration file structures for the Tazdingo bot.
//!
//! The configuration is read from a YAML file and can be overridden with
//! environment variables prefixed by `TAZDINGO_`, nested keys being separated
//! by `__` (e.g. `TAZDINGO_MATRIX__PASSWORD`).
//!
//! # Configuration File Format
//!
//! ```yaml
//! matrix:
//!   # Fully qualified Matrix user ID for the bot account
//!   user_id: "@tazdingo:matrix.org"
//!   # Matrix account password
//!   password: "secret-password"
//!   # Room where commands are accepted
//!   commands_room: "!abc:matrix.org"
//!   # Room where expiry notifications are sent
//!   alerts_room: "!def:matrix.org"
//!
//! bot:
//!   # Users allowed to run moderator commands
//!   owners: ["@admin:matrix.org"]
//!   # Seconds between two expiry checks
//!   tick_interval: 60
//!   # Enables the track, lose and tracks commands
//!   prey_tracking: true
//! ```
//!
//! The `bot` section and each of its keys are optional.

use anyhow::{Context, ensure};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

/// Prefix of the environment variables overriding the configuration file.
const ENV_PREFIX: &str = "TAZDINGO_";

/// Root configuration structure for the Tazdingo bot.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Matrix account configuration
    pub matrix: Matrix,
    /// Bot behaviour
    #[serde(default)]
    pub bot: BotSettings,
}

/// Matrix account configuration.
#[derive(Debug, Deserialize)]
pub struct Matrix {
    /// Fully qualified Matrix user ID, e.g. `@tazdingo:matrix.org`.
    pub user_id: String,

    /// Matrix account password.
    ///
    /// Used for initial login. After successful authentication, the session
    /// is persisted and the bot can restore without re-authenticating.
    pub password: String,

    /// Room ID where commands are read. Messages elsewhere are ignored.
    pub commands_room: String,

    /// Room ID where expiry notifications are posted.
    pub alerts_room: String,
}

/// Bot behaviour settings.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct BotSettings {
    /// Matrix user IDs allowed to run the `prune` command.
    #[serde(default)]
    pub owners: Vec<String>,

    /// Seconds between two expiry checks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval: u64,

    /// Whether prey tracking commands and notifications are enabled.
    #[serde(default = "default_prey_tracking")]
    pub prey_tracking: bool,
}

fn default_tick_interval() -> u64 {
    60
}

fn default_prey_tracking() -> bool {
    true
}

impl Default for BotSettings {
    fn default() -> Self {
        BotSettings {
            owners: Vec::new(),
            tick_interval: default_tick_interval(),
            prey_tracking: default_prey_tracking(),
        }
    }
}

impl BotSettings {
    /// Whether `user_id` may run privileged commands.
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owners.iter().any(|owner| owner == user_id)
    }
}

impl Config {
    /// Loads the configuration from the YAML file at `path`, then applies the
    /// `TAZDINGO_` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing, a value has the wrong
    /// type, or the tick interval is zero.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("invalid configuration in {}", path))?;

        ensure!(config.bot.tick_interval > 0, "bot.tick_interval must be positive");

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serial_test::serial;
    use tempfile::NamedTempFile;

    use super::*;

    const MINIMAL_CONFIG: &str = r#"
matrix:
  user_id: "@tazdingo:example.com"
  password: "secret"
  commands_room: "!commands:example.com"
  alerts_room: "!alerts:example.com"
"#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_load_minimal_config_uses_defaults() {
        let file = write_config(MINIMAL_CONFIG);

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.matrix.user_id, "@tazdingo:example.com");
        assert_eq!(config.matrix.commands_room, "!commands:example.com");
        assert_eq!(config.bot, BotSettings::default());
        assert_eq!(config.bot.tick_interval, 60);
        assert!(config.bot.prey_tracking);
    }

    #[test]
    #[serial]
    fn test_load_full_config() {
        let content = format!(
            "{}\nbot:\n  owners: [\"@admin:example.com\"]\n  tick_interval: 30\n  prey_tracking: false\n",
            MINIMAL_CONFIG
        );
        let file = write_config(&content);

        let config = Config::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.bot.owners, vec!["@admin:example.com".to_string()]);
        assert_eq!(config.bot.tick_interval, 30);
        assert!(!config.bot.prey_tracking);
        assert!(config.bot.is_owner("@admin:example.com"));
        assert!(!config.bot.is_owner("@user:example.com"));
    }

    #[test]
    #[serial]
    fn test_load_missing_key_fails() {
        let file = write_config("matrix:\n  user_id: \"@tazdingo:example.com\"\n");

        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    #[serial]
    fn test_load_zero_tick_interval_fails() {
        let content = format!("{}\nbot:\n  tick_interval: 0\n", MINIMAL_CONFIG);
        let file = write_config(&content);

        assert!(Config::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        let file = write_config(MINIMAL_CONFIG);

        // SAFETY: serialized with every other test reading the environment
        unsafe {
            std::env::set_var("TAZDINGO_MATRIX__PASSWORD", "from-env");
            std::env::set_var("TAZDINGO_BOT__TICK_INTERVAL", "15");
        }
        let config = Config::load(file.path().to_str().unwrap());
        unsafe {
            std::env::remove_var("TAZDINGO_MATRIX__PASSWORD");
            std::env::remove_var("TAZDINGO_BOT__TICK_INTERVAL");
        }

        let config = config.unwrap();
        assert_eq!(config.matrix.password, "from-env");
        assert_eq!(config.bot.tick_interval, 15);
    }
}
