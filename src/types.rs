use serde::{Deserialize, Serialize};

use crate::level::Grid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellType {
    Empty,
    DestructibleBrick,
    IndestructibleWall,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub position: Position,
    #[serde(rename = "type")]
    pub cell_type: CellType,
    /// Authored as a "void" tile. Behaves as empty terrain; kept for renderers.
    #[serde(rename = "void")]
    pub void_marker: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Maps a numeric tier to a difficulty, clamping into 1..=3.
    pub fn from_level(level: i64) -> Self {
        match level.clamp(1, 3) {
            1 => Self::Easy,
            2 => Self::Medium,
            _ => Self::Hard,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Easy => "Wanders and drops bombs at random",
            Self::Medium => "Random play, but steps out of blast zones",
            Self::Hard => "Hunts the nearest opponent and dodges every blast",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    RealTime,
    TurnBased,
    BattleRoyale,
    BotGame,
    CaptureTheFlag,
}

impl GameMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "real_time" | "realtime" => Some(Self::RealTime),
            "turn_based" | "turnbased" => Some(Self::TurnBased),
            "battle_royale" | "battleroyale" => Some(Self::BattleRoyale),
            "bot_game" | "botgame" => Some(Self::BotGame),
            "capture_the_flag" | "ctf" => Some(Self::CaptureTheFlag),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "direction", rename_all = "snake_case")]
pub enum BotAction {
    None,
    Move(Direction),
    PlaceBomb,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub position: Position,
    pub eliminated: bool,
    pub bot: bool,
    #[serde(rename = "capturedFlags")]
    pub captured_flags: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct BombView {
    pub owner: String,
    pub position: Position,
    #[serde(rename = "detonatesAtMs")]
    pub detonates_at_ms: u64,
    pub radius: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct FlagView {
    pub id: String,
    pub position: Position,
    #[serde(rename = "heldBy")]
    pub held_by: Option<String>,
}

/// Read-only view of a round at a tick boundary.
#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "nowMs")]
    pub now_ms: u64,
    pub grid: Grid,
    #[serde(rename = "blastRadius")]
    pub blast_radius: i32,
    pub players: Vec<PlayerView>,
    pub bombs: Vec<BombView>,
    pub flags: Vec<FlagView>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    BombPlaced {
        by: String,
        position: Position,
    },
    BombExploded {
        owner: String,
        position: Position,
    },
    BrickDestroyed {
        position: Position,
    },
    PlayerEliminated {
        name: String,
        by: String,
    },
    FlagCaptured {
        #[serde(rename = "flagId")]
        flag_id: String,
        by: String,
    },
    FlagDropped {
        #[serde(rename = "flagId")]
        flag_id: String,
        by: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEndReason {
    LastStanding,
    AllFlagsCaptured,
    Timeout,
    AllEliminated,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerResult {
    pub name: String,
    pub bot: bool,
    pub won: bool,
    pub eliminated: bool,
    pub eliminations: u32,
    #[serde(rename = "capturedFlags")]
    pub captured_flags: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoundOutcome {
    pub mode: GameMode,
    pub reason: RoundEndReason,
    pub winner: Option<String>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub results: Vec<PlayerResult>,
}
