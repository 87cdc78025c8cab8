//! Round simulation.
//!
//! A [`Round`] owns its grid and every player state; `&mut Round` is the only
//! way to change them. Each [`Round::step`] builds one snapshot, computes every
//! player's action from that same snapshot, then applies the actions as a
//! batch in player order. No player observes another's move from the same
//! tick when deciding.

use log::{debug, info};

use crate::constants::{
    BOMB_BLAST_RADIUS, BOMB_COOLDOWN_MS, BOMB_FUSE_MS, ROUND_TIME_LIMIT_MS,
};
use crate::error::{GameError, GameResult};
use crate::level::{spawn_positions, Grid};
use crate::player::PlayerState;
use crate::rng::Rng;
use crate::types::{
    BotAction, CellType, Difficulty, Direction, GameMode, PlayerResult, PlayerView, Position,
    RoundEndReason, RoundOutcome, RuntimeEvent, Snapshot,
};

mod bomb_system;
mod bot_policy;
mod flag_system;
pub(crate) mod utils;

pub use self::bot_policy::decide_action;

use self::bomb_system::Bomb;
use self::flag_system::Flag;

#[derive(Clone, Debug)]
pub struct RoundOptions {
    pub bomb_fuse_ms: u64,
    pub blast_radius: i32,
    pub bomb_cooldown_ms: u64,
    pub time_limit_ms: u64,
    /// Flags placed in capture-the-flag rounds.
    pub flag_count: usize,
    pub can_place_bomb_when_eliminated: bool,
}

impl Default for RoundOptions {
    fn default() -> Self {
        Self {
            bomb_fuse_ms: BOMB_FUSE_MS,
            blast_radius: BOMB_BLAST_RADIUS,
            bomb_cooldown_ms: BOMB_COOLDOWN_MS,
            time_limit_ms: ROUND_TIME_LIMIT_MS,
            flag_count: 2,
            can_place_bomb_when_eliminated: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Controller {
    Human,
    Bot(Difficulty),
}

#[derive(Clone, Debug)]
pub struct Participant {
    pub name: String,
    pub controller: Controller,
}

impl Participant {
    pub fn human(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            controller: Controller::Human,
        }
    }

    pub fn bot(name: impl Into<String>, level: i64) -> Self {
        Self {
            name: name.into(),
            controller: Controller::Bot(Difficulty::from_level(level)),
        }
    }
}

#[derive(Clone, Debug)]
struct RoundPlayer {
    state: PlayerState,
    controller: Controller,
    queued: BotAction,
    eliminations: u32,
}

impl RoundPlayer {
    fn is_bot(&self) -> bool {
        matches!(self.controller, Controller::Bot(_))
    }
}

#[derive(Clone, Debug)]
pub struct Round {
    pub mode: GameMode,
    pub options: RoundOptions,
    pub started_at_ms: u64,

    grid: Grid,
    rng: Rng,
    players: Vec<RoundPlayer>,
    bombs: Vec<Bomb>,
    flags: Vec<Flag>,
    events: Vec<RuntimeEvent>,

    tick: u64,
    turn_cursor: usize,
    last_step_ms: u64,
    ended: bool,
    end_reason: Option<RoundEndReason>,
    winner: Option<usize>,
}

impl Round {
    pub fn new(
        grid: Grid,
        participants: Vec<Participant>,
        mode: GameMode,
        options: RoundOptions,
        rng: Rng,
        started_at_ms: u64,
    ) -> GameResult<Self> {
        if participants.is_empty() {
            return Err(GameError::Configuration(
                "a round needs at least one participant".to_string(),
            ));
        }
        let flag_count = if mode == GameMode::CaptureTheFlag {
            options.flag_count
        } else {
            0
        };
        let cells = spawn_positions(&grid, participants.len() + flag_count);
        if cells.is_empty() {
            return Err(GameError::Configuration(
                "level has no open cell to spawn on".to_string(),
            ));
        }

        let mut names = Vec::with_capacity(participants.len());
        let players = participants
            .into_iter()
            .enumerate()
            .map(|(idx, participant)| {
                let name = unique_name(&names, &participant.name);
                names.push(name.clone());
                let position = cells[idx % cells.len()];
                let mut state = PlayerState::with_cooldown(name, position, options.bomb_cooldown_ms);
                state.set_can_place_bomb_when_eliminated(options.can_place_bomb_when_eliminated);
                RoundPlayer {
                    state,
                    controller: participant.controller,
                    queued: BotAction::None,
                    eliminations: 0,
                }
            })
            .collect::<Vec<_>>();

        let flag_cells: Vec<Position> = cells.iter().skip(players.len()).copied().collect();

        let mut round = Self {
            mode,
            options,
            started_at_ms,
            grid,
            rng,
            players,
            bombs: Vec::new(),
            flags: Vec::new(),
            events: Vec::new(),
            tick: 0,
            turn_cursor: 0,
            last_step_ms: started_at_ms,
            ended: false,
            end_reason: None,
            winner: None,
        };
        round.clear_spawn_areas();
        round.place_flags(&flag_cells);
        Ok(round)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn player(&self, idx: usize) -> Option<&PlayerState> {
        self.players.get(idx).map(|player| &player.state)
    }

    /// Input for a human player, consumed by the next `step`.
    pub fn queue_action(&mut self, idx: usize, action: BotAction) {
        if let Some(player) = self.players.get_mut(idx) {
            if player.controller == Controller::Human {
                player.queued = action;
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<RuntimeEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn step(&mut self, now_ms: u64) {
        if self.ended {
            return;
        }
        self.tick += 1;
        self.last_step_ms = now_ms;

        let snapshot = self.build_snapshot(now_ms);
        let acting = self.acting_player();
        let mut actions = Vec::with_capacity(self.players.len());
        for (idx, player) in self.players.iter_mut().enumerate() {
            let queued = std::mem::replace(&mut player.queued, BotAction::None);
            if acting.is_some_and(|turn| turn != idx) {
                actions.push(BotAction::None);
                continue;
            }
            let action = match player.controller {
                Controller::Bot(difficulty) => {
                    decide_action(&player.state, difficulty, Some(&snapshot), &mut self.rng)
                }
                Controller::Human => queued,
            };
            actions.push(action);
        }

        for (idx, action) in actions.into_iter().enumerate() {
            self.apply_action(idx, action, now_ms);
        }
        if let Some(turn) = acting {
            self.turn_cursor = turn;
            self.advance_turn();
        }

        self.collect_flags();
        self.detonate_due_bombs(now_ms);
        self.check_round_end(now_ms);
    }

    pub fn build_snapshot(&self, now_ms: u64) -> Snapshot {
        Snapshot {
            tick: self.tick,
            now_ms,
            grid: self.grid.clone(),
            blast_radius: self.options.blast_radius,
            players: self
                .players
                .iter()
                .map(|player| PlayerView {
                    name: player.state.name.clone(),
                    position: player.state.position,
                    eliminated: player.state.is_eliminated(),
                    bot: player.is_bot(),
                    captured_flags: player.state.captured_flags_count(),
                })
                .collect(),
            bombs: self.bomb_views(),
            flags: self.flag_views(),
        }
    }

    /// `None` until the round has ended.
    pub fn outcome(&self) -> Option<RoundOutcome> {
        let reason = self.end_reason?;
        Some(RoundOutcome {
            mode: self.mode,
            reason,
            winner: self
                .winner
                .and_then(|idx| self.players.get(idx))
                .map(|player| player.state.name.clone()),
            duration_ms: self.last_step_ms.saturating_sub(self.started_at_ms),
            results: self
                .players
                .iter()
                .enumerate()
                .map(|(idx, player)| PlayerResult {
                    name: player.state.name.clone(),
                    bot: player.is_bot(),
                    won: self.winner == Some(idx),
                    eliminated: player.state.is_eliminated(),
                    eliminations: player.eliminations,
                    captured_flags: player.state.captured_flags_count(),
                })
                .collect(),
        })
    }

    /// Turn-based rounds let one live player act per tick.
    fn acting_player(&self) -> Option<usize> {
        if self.mode != GameMode::TurnBased {
            return None;
        }
        let count = self.players.len();
        let live = (0..count)
            .map(|offset| (self.turn_cursor + offset) % count)
            .find(|idx| !self.players[*idx].state.is_eliminated());
        Some(live.unwrap_or(self.turn_cursor % count))
    }

    fn advance_turn(&mut self) {
        let count = self.players.len();
        for offset in 1..=count {
            let next = (self.turn_cursor + offset) % count;
            if !self.players[next].state.is_eliminated() {
                self.turn_cursor = next;
                return;
            }
        }
    }

    fn apply_action(&mut self, idx: usize, action: BotAction, now_ms: u64) {
        match action {
            BotAction::None => {}
            BotAction::Move(dir) => self.move_player(idx, dir),
            BotAction::PlaceBomb => self.place_bomb(idx, now_ms),
        }
    }

    fn move_player(&mut self, idx: usize, dir: Direction) {
        let Some(player) = self.players.get(idx) else {
            return;
        };
        if player.state.is_eliminated() {
            return;
        }
        let target = player.state.position.offset(dir);
        if !self.grid.is_walkable(target) || self.bomb_at(target) {
            return;
        }
        self.players[idx].state.position = target;
    }

    /// Spawn cells and their direct neighbours start free of bricks.
    fn clear_spawn_areas(&mut self) {
        let spawns: Vec<Position> = self.players.iter().map(|p| p.state.position).collect();
        for spawn in spawns {
            let around = std::iter::once(spawn).chain(Direction::ALL.map(|dir| spawn.offset(dir)));
            for pos in around {
                if self.grid.cell_type(pos) == Some(CellType::DestructibleBrick) {
                    self.grid.set_cell_type(pos, CellType::Empty);
                }
            }
        }
    }

    fn check_round_end(&mut self, now_ms: u64) {
        if let Some(holder) = self.holder_of_all_flags() {
            self.finish(RoundEndReason::AllFlagsCaptured, Some(holder));
            return;
        }

        let alive: Vec<usize> = (0..self.players.len())
            .filter(|idx| !self.players[*idx].state.is_eliminated())
            .collect();
        match alive.as_slice() {
            [] => {
                self.finish(RoundEndReason::AllEliminated, None);
                return;
            }
            [last] if self.players.len() > 1 => {
                self.finish(RoundEndReason::LastStanding, Some(*last));
                return;
            }
            _ => {}
        }

        if now_ms.saturating_sub(self.started_at_ms) >= self.options.time_limit_ms {
            self.finish(RoundEndReason::Timeout, None);
        }
    }

    fn finish(&mut self, reason: RoundEndReason, winner: Option<usize>) {
        self.ended = true;
        self.end_reason = Some(reason);
        self.winner = winner;
        info!(
            "round ended after {} ticks: {:?}, winner {}",
            self.tick,
            reason,
            winner
                .and_then(|idx| self.players.get(idx))
                .map(|player| player.state.name.as_str())
                .unwrap_or("none")
        );
    }

    fn eliminate_player(&mut self, victim: usize, by: usize) {
        if self.players[victim].state.is_eliminated() {
            return;
        }
        self.players[victim].state.eliminate();
        if victim != by {
            self.players[by].eliminations += 1;
        }
        let name = self.players[victim].state.name.clone();
        let by_name = self.players[by].state.name.clone();
        debug!("{name} eliminated by {by_name}");
        self.events.push(RuntimeEvent::PlayerEliminated { name, by: by_name });
        self.drop_flags(victim);
    }
}

fn unique_name(taken: &[String], wanted: &str) -> String {
    let base = match wanted.trim() {
        "" => "Player",
        trimmed => trimmed,
    };
    if !taken.iter().any(|name| name == base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base} #{n}"))
        .find(|candidate| !taken.iter().any(|name| name == candidate))
        .unwrap_or_else(|| base.to_string())
}
