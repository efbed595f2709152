use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::history::DEFAULT_HISTORY_LIMIT;

/// Rules of the game being scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    /// Points needed to win when the match carries no override (default: 11)
    pub winning_score: u32,
    /// Lead required to close a game (default: 2)
    pub win_by_margin: u32,
    /// Highest score a manual correction may enter (default: 30)
    pub max_adjust_score: u32,
    /// Undo depth (default: 20)
    pub history_limit: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            winning_score: 11,
            win_by_margin: 2,
            max_adjust_score: 30,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Tournament backend endpoints and submission policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiConfig {
    pub matches_endpoint: String,
    pub scores_endpoint: String,
    /// Per-request timeout in milliseconds (default: 10000)
    pub timeout_ms: u64,
    /// Attempts per submission before giving up (default: 3)
    pub retry_attempts: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            matches_endpoint: "https://api.tournament-system.com/matches".to_string(),
            scores_endpoint: "https://api.tournament-system.com/scores".to_string(),
            timeout_ms: 10_000,
            retry_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub game: GameConfig,
    pub api: ApiConfig,
}

impl ScorerConfig {
    /// Parses a JSON config. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.winning_score == 0 {
            return Err(ConfigError::Invalid(
                "game.winningScore must be positive".to_string(),
            ));
        }
        if self.game.win_by_margin == 0 {
            return Err(ConfigError::Invalid(
                "game.winByMargin must be positive".to_string(),
            ));
        }
        if self.game.max_adjust_score < self.game.winning_score {
            return Err(ConfigError::Invalid(format!(
                "game.maxAdjustScore ({}) must be at least game.winningScore ({})",
                self.game.max_adjust_score, self.game.winning_score
            )));
        }
        if self.game.history_limit == 0 {
            return Err(ConfigError::Invalid(
                "game.historyLimit must be positive".to_string(),
            ));
        }
        if self.api.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "api.retryAttempts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
