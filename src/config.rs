use crate::db::Database;
use crate::logging;
use crate::metrics::DEXSCREENER_PAIR_URL;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local-storage key the config record lives under
pub const CONFIG_KEY: &str = "sewerKingConfig";
/// Upper bound for the market-comment and joke cooldowns
pub const MAX_COOLDOWN_SECS: i64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub session_key: String,
    pub max_response_chars: Option<usize>, // None = never truncate
    pub typing_base_delay_ms: u64,
    pub typing_jitter_ms: u64,
    pub network_delay_min_ms: u64,
    pub network_delay_max_ms: u64,
    pub market_comment_cooldown_secs: i64,
    pub joke_cooldown_secs: i64,
    pub catchphrase_chance: f64,
    pub market_comment_chance: f64,
    pub bonus_joke_chance: f64,
    pub metrics_endpoint: String,
    pub metrics_poll_secs: u64,
    pub request_timeout_secs: u64,
    pub trade_interval_min_secs: u64,
    pub trade_interval_max_secs: u64,
    pub rng_seed: Option<u64>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            session_key: "degenRugRatsChat".to_string(),
            max_response_chars: None,
            typing_base_delay_ms: 15,
            typing_jitter_ms: 10,
            network_delay_min_ms: 300,
            network_delay_max_ms: 1000,
            market_comment_cooldown_secs: 60,
            joke_cooldown_secs: 120,
            catchphrase_chance: 0.3,
            market_comment_chance: 0.2,
            bonus_joke_chance: 0.25,
            metrics_endpoint: DEXSCREENER_PAIR_URL.to_string(),
            metrics_poll_secs: 60,
            request_timeout_secs: 8,
            trade_interval_min_secs: 15,
            trade_interval_max_secs: 30,
            rng_seed: None,
        }
    }
}

impl ChatConfig {
    /// Read the stored config; missing or unreadable records give defaults
    pub fn load(db: &Database) -> Self {
        match db.get_item(CONFIG_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<ChatConfig>(&json) {
                Ok(config) => config.sanitized(),
                Err(e) => {
                    logging::log_error(None, &format!("Stored config is corrupt, using defaults: {}", e));
                    Self::default()
                }
            },
            Ok(None) => Self::default(),
            Err(e) => {
                logging::log_error(None, &format!("Failed to read config, using defaults: {}", e));
                Self::default()
            }
        }
    }

    pub fn save(&self, db: &Database) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let json = serde_json::to_string(self)?;
        db.set_item(CONFIG_KEY, &json)?;
        Ok(())
    }

    /// Swap inverted ranges, clamp cooldowns into [0, 1 day] and probabilities into [0, 1]
    pub fn sanitized(mut self) -> Self {
        if self.network_delay_min_ms > self.network_delay_max_ms {
            std::mem::swap(&mut self.network_delay_min_ms, &mut self.network_delay_max_ms);
        }
        if self.trade_interval_min_secs > self.trade_interval_max_secs {
            std::mem::swap(&mut self.trade_interval_min_secs, &mut self.trade_interval_max_secs);
        }
        self.market_comment_cooldown_secs = self.market_comment_cooldown_secs.clamp(0, MAX_COOLDOWN_SECS);
        self.joke_cooldown_secs = self.joke_cooldown_secs.clamp(0, MAX_COOLDOWN_SECS);
        self.catchphrase_chance = clamp_chance(self.catchphrase_chance);
        self.market_comment_chance = clamp_chance(self.market_comment_chance);
        self.bonus_joke_chance = clamp_chance(self.bonus_joke_chance);
        self
    }

    pub fn typing_base_delay(&self) -> Duration {
        Duration::from_millis(self.typing_base_delay_ms)
    }

    pub fn typing_jitter(&self) -> Duration {
        Duration::from_millis(self.typing_jitter_ms)
    }

    pub fn metrics_poll_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_poll_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn clamp_chance(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults_when_missing() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(ChatConfig::load(&db), ChatConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let db = Database::open_in_memory().unwrap();
        let config = ChatConfig {
            max_response_chars: Some(300),
            rng_seed: Some(99),
            ..ChatConfig::default()
        };
        config.save(&db).unwrap();

        assert_eq!(ChatConfig::load(&db), config);
    }

    #[test]
    fn test_partial_record_fills_defaults() {
        let db = Database::open_in_memory().unwrap();
        db.set_item(CONFIG_KEY, r#"{"typing_base_delay_ms": 40}"#).unwrap();

        let config = ChatConfig::load(&db);
        assert_eq!(config.typing_base_delay_ms, 40);
        assert_eq!(config.session_key, "degenRugRatsChat");
        assert_eq!(config.max_response_chars, None);
    }

    #[test]
    fn test_corrupt_record_falls_back() {
        let db = Database::open_in_memory().unwrap();
        db.set_item(CONFIG_KEY, "{not json").unwrap();

        assert_eq!(ChatConfig::load(&db), ChatConfig::default());
    }

    #[test]
    fn test_sanitized_fixes_ranges() {
        let config = ChatConfig {
            network_delay_min_ms: 900,
            network_delay_max_ms: 100,
            catchphrase_chance: 3.0,
            bonus_joke_chance: f64::NAN,
            ..ChatConfig::default()
        }
        .sanitized();

        assert_eq!((config.network_delay_min_ms, config.network_delay_max_ms), (100, 900));
        assert_eq!(config.catchphrase_chance, 1.0);
        assert_eq!(config.bonus_joke_chance, 0.0);
    }

    #[test]
    fn test_stored_cooldowns_are_clamped() {
        let db = Database::open_in_memory().unwrap();
        db.set_item(
            CONFIG_KEY,
            r#"{"market_comment_cooldown_secs": 9223372036854775807, "joke_cooldown_secs": -5}"#,
        )
        .unwrap();

        let config = ChatConfig::load(&db);
        assert_eq!(config.market_comment_cooldown_secs, MAX_COOLDOWN_SECS);
        assert_eq!(config.joke_cooldown_secs, 0);
    }
}
