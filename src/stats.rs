//! Per-mode win/loss counters and the lifetime profile aggregate.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::constants::{DISPLAY_NAME_MAX_CHARS, DISPLAY_NAME_TRUNCATED_CHARS, TIMESTAMP_FORMAT};
use crate::types::{GameMode, PlayerResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameModeStats {
    #[serde(rename = "gamesPlayed")]
    games_played: u32,
    wins: u32,
}

impl GameModeStats {
    pub fn add_game(&mut self, won: bool) {
        self.games_played += 1;
        if won {
            self.wins += 1;
        }
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.games_played.saturating_sub(self.wins)
    }

    /// Percentage in 0..=100; 0.0 before any game.
    pub fn win_ratio(&self) -> f64 {
        if self.games_played == 0 {
            return 0.0;
        }
        self.wins as f64 / self.games_played as f64 * 100.0
    }

    /// Restores `wins <= games_played` on counters read from disk.
    pub(crate) fn sanitized(self) -> Self {
        Self {
            games_played: self.games_played,
            wins: self.wins.min(self.games_played),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlayerProfile {
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    pub total_games_played: u32,
    pub total_wins: u32,
    pub total_eliminations: u32,
    pub total_deaths: u32,
    pub total_play_time_seconds: u64,
    pub created_at_ms: u64,
    pub last_played_at_ms: Option<u64>,
    pub classic: GameModeStats,
    pub battle_royale: GameModeStats,
    pub bot_game: GameModeStats,
    pub capture_the_flag: GameModeStats,
}

impl PlayerProfile {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, now_ms: u64) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            created_at_ms: now_ms,
            ..Self::default()
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Real-time and turn-based rounds share the classic counters.
    pub fn stats_for_mode(&self, mode: GameMode) -> &GameModeStats {
        match mode {
            GameMode::RealTime | GameMode::TurnBased => &self.classic,
            GameMode::BattleRoyale => &self.battle_royale,
            GameMode::BotGame => &self.bot_game,
            GameMode::CaptureTheFlag => &self.capture_the_flag,
        }
    }

    pub fn stats_for_mode_mut(&mut self, mode: GameMode) -> &mut GameModeStats {
        match mode {
            GameMode::RealTime | GameMode::TurnBased => &mut self.classic,
            GameMode::BattleRoyale => &mut self.battle_royale,
            GameMode::BotGame => &mut self.bot_game,
            GameMode::CaptureTheFlag => &mut self.capture_the_flag,
        }
    }

    pub fn win_ratio(&self) -> f64 {
        if self.total_games_played == 0 {
            return 0.0;
        }
        self.total_wins as f64 / self.total_games_played as f64 * 100.0
    }

    pub fn kill_death_ratio(&self) -> f64 {
        if self.total_deaths == 0 {
            return 0.0;
        }
        self.total_eliminations as f64 / self.total_deaths as f64
    }

    pub fn record_round(&mut self, mode: GameMode, result: &PlayerResult, play_seconds: u64, now_ms: u64) {
        self.total_games_played += 1;
        if result.won {
            self.total_wins += 1;
        }
        if result.eliminated {
            self.total_deaths += 1;
        }
        self.total_eliminations += result.eliminations;
        self.total_play_time_seconds += play_seconds;
        self.stats_for_mode_mut(mode).add_game(result.won);
        self.last_played_at_ms = Some(now_ms);
    }

    pub fn formatted_play_time(&self) -> String {
        format_play_time(self.total_play_time_seconds)
    }
}

pub fn format_play_time(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = total_seconds % 3600 / 60;
    format!("{hours}h {minutes}m")
}

pub fn format_display_name(name: &str) -> String {
    if name.chars().count() <= DISPLAY_NAME_MAX_CHARS {
        return name.to_string();
    }
    let head: String = name.chars().take(DISPLAY_NAME_TRUNCATED_CHARS).collect();
    format!("{head}...")
}

/// `DD/MM/YYYY HH:MM` in UTC.
pub fn format_timestamp(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|stamp| stamp.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}
