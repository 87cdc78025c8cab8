use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RANKING_LIMIT, MAX_RANKING_LIMIT};
use crate::error::{GameError, GameResult};
use crate::stats::{format_display_name, format_timestamp, GameModeStats, PlayerProfile};
use crate::types::RoundOutcome;

/// On-disk profile. The first five fields are the portable core; the rest are
/// extensions. Any field may be absent and defaults; a present field of the
/// wrong type is rejected.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ProfileDocument {
    #[serde(rename = "firstName", default)]
    first_name: String,
    #[serde(rename = "lastName", default)]
    last_name: String,
    #[serde(default)]
    avatar: String,
    #[serde(rename = "gamesPlayed", default)]
    games_played: u32,
    #[serde(rename = "gamesWon", default)]
    games_won: u32,
    #[serde(rename = "totalEliminations", default)]
    total_eliminations: u32,
    #[serde(rename = "totalDeaths", default)]
    total_deaths: u32,
    #[serde(rename = "totalPlayTimeSeconds", default)]
    total_play_time_seconds: u64,
    #[serde(rename = "createdAtMs", default)]
    created_at_ms: u64,
    #[serde(rename = "lastPlayedAtMs", default, skip_serializing_if = "Option::is_none")]
    last_played_at_ms: Option<u64>,
    #[serde(default)]
    classic: GameModeStats,
    #[serde(rename = "battleRoyale", default)]
    battle_royale: GameModeStats,
    #[serde(rename = "botGame", default)]
    bot_game: GameModeStats,
    #[serde(rename = "captureTheFlag", default)]
    capture_the_flag: GameModeStats,
}

impl From<ProfileDocument> for PlayerProfile {
    fn from(doc: ProfileDocument) -> Self {
        Self {
            first_name: doc.first_name,
            last_name: doc.last_name,
            avatar: doc.avatar,
            total_games_played: doc.games_played,
            total_wins: doc.games_won.min(doc.games_played),
            total_eliminations: doc.total_eliminations,
            total_deaths: doc.total_deaths,
            total_play_time_seconds: doc.total_play_time_seconds,
            created_at_ms: doc.created_at_ms,
            last_played_at_ms: doc.last_played_at_ms,
            classic: doc.classic.sanitized(),
            battle_royale: doc.battle_royale.sanitized(),
            bot_game: doc.bot_game.sanitized(),
            capture_the_flag: doc.capture_the_flag.sanitized(),
        }
    }
}

impl From<&PlayerProfile> for ProfileDocument {
    fn from(profile: &PlayerProfile) -> Self {
        Self {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            avatar: profile.avatar.clone(),
            games_played: profile.total_games_played,
            games_won: profile.total_wins,
            total_eliminations: profile.total_eliminations,
            total_deaths: profile.total_deaths,
            total_play_time_seconds: profile.total_play_time_seconds,
            created_at_ms: profile.created_at_ms,
            last_played_at_ms: profile.last_played_at_ms,
            classic: profile.classic,
            battle_royale: profile.battle_royale,
            bot_game: profile.bot_game,
            capture_the_flag: profile.capture_the_flag,
        }
    }
}

/// A missing file yields a fresh default profile.
pub fn load_profile(path: &Path) -> GameResult<PlayerProfile> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!("no profile at {}, starting fresh", path.display());
            return Ok(PlayerProfile::default());
        }
        Err(error) => return Err(error.into()),
    };
    let value: serde_json::Value = serde_json::from_str(&text).map_err(|error| {
        GameError::Serialization(format!("failed to parse {}: {error}", path.display()))
    })?;
    if !value.is_object() {
        return Err(GameError::Serialization(format!(
            "profile {} is not an object",
            path.display()
        )));
    }
    let doc: ProfileDocument = serde_json::from_value(value).map_err(|error| {
        GameError::Serialization(format!("invalid profile {}: {error}", path.display()))
    })?;
    Ok(doc.into())
}

pub fn save_profile(path: &Path, profile: &PlayerProfile) -> GameResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(&ProfileDocument::from(profile))
        .map_err(|error| GameError::Serialization(error.to_string()))?;
    fs::write(path, text)?;
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankBy {
    Wins,
    WinRatio,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedProfile {
    pub rank: usize,
    pub name: String,
    pub wins: u32,
    #[serde(rename = "gamesPlayed")]
    pub games_played: u32,
    #[serde(rename = "winRatio")]
    pub win_ratio: f64,
    #[serde(rename = "killDeathRatio")]
    pub kill_death_ratio: f64,
    #[serde(rename = "playTime")]
    pub play_time: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "lastPlayedAt")]
    pub last_played_at: Option<String>,
}

/// Directory of `<key>.json` profiles, one per human player.
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", profile_key(name)))
    }

    pub fn load(&self, name: &str) -> GameResult<PlayerProfile> {
        load_profile(&self.profile_path(name))
    }

    pub fn save(&self, name: &str, profile: &PlayerProfile) -> GameResult<()> {
        save_profile(&self.profile_path(name), profile)
    }

    /// Unreadable or malformed files are logged and skipped.
    pub fn load_all(&self) -> GameResult<Vec<PlayerProfile>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut profiles = Vec::with_capacity(paths.len());
        for path in paths {
            match load_profile(&path) {
                Ok(profile) => profiles.push(profile),
                Err(error) => warn!("skipping profile {}: {error}", path.display()),
            }
        }
        Ok(profiles)
    }

    /// Applies one finished round to every human participant's profile.
    /// Every profile is loaded before any is written, so a bad profile leaves
    /// the whole store untouched. Returns how many profiles were written.
    pub fn record_outcome(&self, outcome: &RoundOutcome, now_ms: u64) -> GameResult<usize> {
        let play_seconds = outcome.duration_ms / 1000;
        let mut pending = Vec::new();
        for result in &outcome.results {
            if result.bot || profile_key(&result.name).is_empty() {
                continue;
            }
            pending.push((result, self.load(&result.name)?));
        }

        for (result, profile) in pending.iter_mut() {
            if profile.first_name.trim().is_empty() && profile.last_name.trim().is_empty() {
                profile.first_name = result.name.trim().to_string();
            }
            if profile.created_at_ms == 0 {
                profile.created_at_ms = now_ms;
            }
            profile.record_round(outcome.mode, *result, play_seconds, now_ms);
        }
        for (result, profile) in &pending {
            self.save(&result.name, profile)?;
        }
        debug!("recorded round for {} profiles", pending.len());
        Ok(pending.len())
    }

    pub fn ranking(&self, by: RankBy, requested_limit: Option<usize>) -> GameResult<Vec<RankedProfile>> {
        let limit = requested_limit
            .unwrap_or(DEFAULT_RANKING_LIMIT)
            .clamp(1, MAX_RANKING_LIMIT);
        let mut profiles = self.load_all()?;
        profiles.sort_by(|a, b| {
            let primary = match by {
                RankBy::Wins => b.total_wins.cmp(&a.total_wins),
                RankBy::WinRatio => cmp_desc_f64(a.win_ratio(), b.win_ratio()),
            };
            primary.then_with(|| {
                a.display_name()
                    .to_lowercase()
                    .cmp(&b.display_name().to_lowercase())
            })
        });
        profiles.truncate(limit);

        Ok(profiles
            .iter()
            .enumerate()
            .map(|(idx, profile)| RankedProfile {
                rank: idx + 1,
                name: format_display_name(&profile.display_name()),
                wins: profile.total_wins,
                games_played: profile.total_games_played,
                win_ratio: profile.win_ratio(),
                kill_death_ratio: profile.kill_death_ratio(),
                play_time: profile.formatted_play_time(),
                created_at: format_timestamp(profile.created_at_ms),
                last_played_at: profile.last_played_at_ms.map(format_timestamp),
            })
            .collect())
    }
}

fn cmp_desc_f64(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn profile_key(name: &str) -> String {
    name.trim().to_lowercase()
}
