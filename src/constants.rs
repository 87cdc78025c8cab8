use crate::types::Difficulty;

pub const TICK_RATE: u32 = 10;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

/// Chance that an auto-filled empty cell becomes a destructible brick.
pub const BRICK_FILL_PROBABILITY: f32 = 0.30;

pub const BOMB_COOLDOWN_MS: u64 = 3_000;
pub const BOMB_FUSE_MS: u64 = 2_500;
pub const BOMB_BLAST_RADIUS: i32 = 2;
pub const ROUND_TIME_LIMIT_MS: u64 = 3 * 60 * 1000;

/// Cells a hard bot searches for an escape before committing to a bomb.
pub const ESCAPE_SEARCH_DEPTH: usize = 4;

pub const DISPLAY_NAME_MAX_CHARS: usize = 15;
pub const DISPLAY_NAME_TRUNCATED_CHARS: usize = 12;
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M";

pub const DEFAULT_RANKING_LIMIT: usize = 10;
pub const MAX_RANKING_LIMIT: usize = 100;

/// Per-tier decision parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierStrategy {
    pub avoid_danger: bool,
    /// Bombs further than this from detonation are not treated as threats.
    pub danger_window_ms: u64,
    pub pursue_opponents: bool,
    /// Tie-break noise added to scored moves.
    pub jitter: f32,
}

pub fn get_tier_strategy(difficulty: Difficulty) -> TierStrategy {
    match difficulty {
        Difficulty::Easy => TierStrategy {
            avoid_danger: false,
            danger_window_ms: 0,
            pursue_opponents: false,
            jitter: 1.0,
        },
        Difficulty::Medium => TierStrategy {
            avoid_danger: true,
            danger_window_ms: 1_500,
            pursue_opponents: false,
            jitter: 1.0,
        },
        Difficulty::Hard => TierStrategy {
            avoid_danger: true,
            danger_window_ms: u64::MAX,
            pursue_opponents: true,
            jitter: 0.1,
        },
    }
}
