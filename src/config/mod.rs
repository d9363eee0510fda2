//! # Configuration Management Module
//!
//! Loads and validates the server's TOML configuration and turns it into the
//! runtime values the engine and scheduler read.
//!
//! ## Configuration Structure
//!
//! - [`StorageConfig`] - Where the sled store lives
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`GameConfig`] - Combat, quest and mail rules plus an optional faction file
//! - [`SchedulerConfig`] - Maintenance job intervals
//!
//! ## Usage
//!
//! ```rust,no_run
//! use warbound::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Config::create_default("warbound.toml").await?;
//!     let config = Config::load("warbound.toml").await?;
//!     println!("Data dir: {}", config.storage.data_dir);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [storage]
//! data_dir = "./data"
//!
//! [logging]
//! level = "info"
//! file = "warbound.log"
//!
//! [game]
//! rematch_cooldown_secs = 300
//! quest_window_hours = 21
//!
//! [scheduler]
//! daily_refresh_hours = 21
//! jail_sweep_minutes = 5
//! ```
//!
//! Every key except `[storage] data_dir` has a default, so sections may be
//! partial or missing.

use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::game::{FactionCatalog, GameSettings};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Game rules. Defaults match the live server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// JSON faction stats (`{"factions": {"veylan": {"stats": {...}}}}`).
    /// Built-in defaults apply when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factions_file: Option<String>,
    #[serde(default = "default_rematch_cooldown_secs")]
    pub rematch_cooldown_secs: i64,
    #[serde(default = "default_quest_window_hours")]
    pub quest_window_hours: i64,
    #[serde(default = "default_quest_penalty")]
    pub quest_penalty: i32,
    #[serde(default = "default_quest_completion_bonus")]
    pub quest_completion_bonus: i32,
    #[serde(default = "default_mail_expiry_days")]
    pub mail_expiry_days: i64,
    #[serde(default = "default_max_combat_rounds")]
    pub max_combat_rounds: u32,
    #[serde(default = "default_quest_offer_count")]
    pub quest_offer_count: usize,
}

fn default_rematch_cooldown_secs() -> i64 {
    300
}

fn default_quest_window_hours() -> i64 {
    21
}

fn default_quest_penalty() -> i32 {
    2
}

fn default_quest_completion_bonus() -> i32 {
    2
}

fn default_mail_expiry_days() -> i64 {
    30
}

fn default_max_combat_rounds() -> u32 {
    crate::game::combat::DEFAULT_MAX_ROUNDS
}

fn default_quest_offer_count() -> usize {
    4
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            factions_file: None,
            rematch_cooldown_secs: default_rematch_cooldown_secs(),
            quest_window_hours: default_quest_window_hours(),
            quest_penalty: default_quest_penalty(),
            quest_completion_bonus: default_quest_completion_bonus(),
            mail_expiry_days: default_mail_expiry_days(),
            max_combat_rounds: default_max_combat_rounds(),
            quest_offer_count: default_quest_offer_count(),
        }
    }
}

impl GameConfig {
    pub fn to_settings(&self) -> GameSettings {
        GameSettings {
            rematch_cooldown_secs: self.rematch_cooldown_secs,
            quest_window_hours: self.quest_window_hours,
            quest_penalty: self.quest_penalty,
            quest_completion_bonus: self.quest_completion_bonus,
            mail_expiry_days: self.mail_expiry_days,
            max_combat_rounds: self.max_combat_rounds,
            quest_offer_count: self.quest_offer_count,
        }
    }

    /// Faction table from `factions_file`, or the built-in defaults.
    pub fn load_factions(&self) -> Result<FactionCatalog> {
        match &self.factions_file {
            Some(path) => FactionCatalog::load(path)
                .map_err(|e| anyhow!("Failed to load faction config {}: {}", path, e)),
            None => Ok(FactionCatalog::default()),
        }
    }
}

/// Maintenance intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_daily_refresh_hours")]
    pub daily_refresh_hours: u64,
    #[serde(default = "default_revive_hours")]
    pub revive_hours: u64,
    #[serde(default = "default_mail_cleanup_hours")]
    pub mail_cleanup_hours: u64,
    #[serde(default = "default_jail_sweep_minutes")]
    pub jail_sweep_minutes: u64,
}

fn default_daily_refresh_hours() -> u64 {
    21
}

fn default_revive_hours() -> u64 {
    3
}

fn default_mail_cleanup_hours() -> u64 {
    24
}

fn default_jail_sweep_minutes() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_refresh_hours: default_daily_refresh_hours(),
            revive_hours: default_revive_hours(),
            mail_cleanup_hours: default_mail_cleanup_hours(),
            jail_sweep_minutes: default_jail_sweep_minutes(),
        }
    }
}

impl SchedulerConfig {
    pub fn daily_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.daily_refresh_hours * 3600)
    }

    pub fn revive_interval(&self) -> Duration {
        Duration::from_secs(self.revive_hours * 3600)
    }

    pub fn mail_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.mail_cleanup_hours * 3600)
    }

    pub fn jail_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.jail_sweep_minutes * 60)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        let intervals = [
            ("scheduler.daily_refresh_hours", self.scheduler.daily_refresh_hours),
            ("scheduler.revive_hours", self.scheduler.revive_hours),
            ("scheduler.mail_cleanup_hours", self.scheduler.mail_cleanup_hours),
            ("scheduler.jail_sweep_minutes", self.scheduler.jail_sweep_minutes),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(anyhow!("{} must be greater than zero", name));
            }
        }
        if self.game.max_combat_rounds == 0 {
            return Err(anyhow!("game.max_combat_rounds must be greater than zero"));
        }
        if self.game.quest_window_hours <= 0 || self.game.mail_expiry_days <= 0 {
            return Err(anyhow!("game quest window and mail expiry must be positive"));
        }
        if self.game.rematch_cooldown_secs < 0 {
            return Err(anyhow!("game.rematch_cooldown_secs must not be negative"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            storage: StorageConfig {
                data_dir: "./data".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("warbound.log".to_string()),
            },
            game: GameConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}
