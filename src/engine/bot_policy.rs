//! Tiered bot decisions.
//!
//! One function covers every tier; the differences live in the
//! [`TierStrategy`](crate::constants::TierStrategy) table so the fallback
//! order stays in one place: danger avoidance, then pursuit, then a uniform
//! pick among whatever is left (or among everything when nothing is safe).

use std::collections::HashSet;

use crate::constants::{get_tier_strategy, ESCAPE_SEARCH_DEPTH};
use crate::player::PlayerState;
use crate::rng::RandomSource;
use crate::types::{BotAction, CellType, Difficulty, Direction, PlayerView, Position, Snapshot};

use super::utils::{blast_cells, first_step_toward};

/// Picks one action for a bot from a pre-tick snapshot.
///
/// Eliminated bots return [`BotAction::None`] before the snapshot is looked
/// at, so `None` is accepted for them. A live bot without a snapshot idles.
pub fn decide_action<R: RandomSource + ?Sized>(
    bot: &PlayerState,
    difficulty: Difficulty,
    snapshot: Option<&Snapshot>,
    rng: &mut R,
) -> BotAction {
    if bot.is_eliminated() {
        return BotAction::None;
    }
    let Some(snapshot) = snapshot else {
        return BotAction::None;
    };

    let strategy = get_tier_strategy(difficulty);
    let board = Board::new(snapshot, bot.position, strategy.danger_window_ms);
    let can_bomb = bot.can_place_bomb(snapshot.now_ms) && !board.bombs.contains(&bot.position);

    if !strategy.avoid_danger {
        return pick_uniform(&board.moves, can_bomb, rng);
    }

    let here_threatened = board.threats.contains(&bot.position);
    let safe_moves: Vec<Direction> = board
        .moves
        .iter()
        .copied()
        .filter(|dir| !board.threats.contains(&bot.position.offset(*dir)))
        .collect();

    if strategy.pursue_opponents {
        if here_threatened {
            return escape(&board, &safe_moves, rng);
        }
        if let Some(action) = pursue(bot, &board, &safe_moves, can_bomb, strategy.jitter, rng) {
            return action;
        }
    }

    // Hard bots never drop a bomb they cannot get clear of.
    let bomb_is_safe = can_bomb
        && !here_threatened
        && (!strategy.pursue_opponents || board.has_escape_after_bomb());
    if safe_moves.is_empty() && !bomb_is_safe {
        let any_bomb = can_bomb && !strategy.pursue_opponents;
        return pick_uniform(&board.moves, any_bomb, rng);
    }
    pick_uniform(&safe_moves, bomb_is_safe, rng)
}

struct Board<'a> {
    snapshot: &'a Snapshot,
    origin: Position,
    bombs: HashSet<Position>,
    threats: HashSet<Position>,
    /// Directions leading onto an empty cell without a bomb.
    moves: Vec<Direction>,
}

impl<'a> Board<'a> {
    fn new(snapshot: &'a Snapshot, origin: Position, danger_window_ms: u64) -> Self {
        let bombs: HashSet<Position> = snapshot.bombs.iter().map(|bomb| bomb.position).collect();
        let moves = Direction::ALL
            .into_iter()
            .filter(|dir| {
                let next = origin.offset(*dir);
                snapshot.grid.is_walkable(next) && !bombs.contains(&next)
            })
            .collect();
        Self {
            snapshot,
            origin,
            bombs,
            threats: threatened_cells(snapshot, danger_window_ms),
            moves,
        }
    }

    fn has_escape_after_bomb(&self) -> bool {
        let mut danger = self.threats.clone();
        danger.extend(blast_cells(
            &self.snapshot.grid,
            self.origin,
            self.snapshot.blast_radius,
        ));
        first_step_toward(
            &self.snapshot.grid,
            &self.bombs,
            self.origin,
            ESCAPE_SEARCH_DEPTH,
            |pos| !danger.contains(&pos),
        )
        .is_some()
    }
}

/// Cells inside the blast of any bomb detonating within `window_ms`.
pub(crate) fn threatened_cells(snapshot: &Snapshot, window_ms: u64) -> HashSet<Position> {
    snapshot
        .bombs
        .iter()
        .filter(|bomb| bomb.detonates_at_ms.saturating_sub(snapshot.now_ms) <= window_ms)
        .flat_map(|bomb| blast_cells(&snapshot.grid, bomb.position, bomb.radius))
        .collect()
}

fn pick_uniform<R: RandomSource + ?Sized>(
    moves: &[Direction],
    can_bomb: bool,
    rng: &mut R,
) -> BotAction {
    let option_count = moves.len() + usize::from(can_bomb);
    if option_count == 0 {
        return BotAction::None;
    }
    match moves.get(rng.pick_index(option_count)) {
        Some(dir) => BotAction::Move(*dir),
        None => BotAction::PlaceBomb,
    }
}

fn escape<R: RandomSource + ?Sized>(board: &Board<'_>, safe_moves: &[Direction], rng: &mut R) -> BotAction {
    let step = first_step_toward(
        &board.snapshot.grid,
        &board.bombs,
        board.origin,
        ESCAPE_SEARCH_DEPTH,
        |pos| !board.threats.contains(&pos),
    );
    if let Some(dir) = step {
        return BotAction::Move(dir);
    }
    if !safe_moves.is_empty() {
        return BotAction::Move(safe_moves[rng.pick_index(safe_moves.len())]);
    }

    // Boxed in: put distance between us and the closest bomb.
    board
        .moves
        .iter()
        .copied()
        .max_by_key(|dir| {
            let next = board.origin.offset(*dir);
            board
                .bombs
                .iter()
                .map(|bomb| bomb.manhattan(next))
                .min()
                .unwrap_or(i32::MAX)
        })
        .map(BotAction::Move)
        .unwrap_or(BotAction::None)
}

fn pursue<R: RandomSource + ?Sized>(
    bot: &PlayerState,
    board: &Board<'_>,
    safe_moves: &[Direction],
    can_bomb: bool,
    jitter: f32,
    rng: &mut R,
) -> Option<BotAction> {
    let target = nearest_opponent(bot, board.snapshot)?.position;
    let grid = &board.snapshot.grid;
    let from = board.origin;

    if can_bomb
        && blast_cells(grid, from, board.snapshot.blast_radius).contains(&target)
        && board.has_escape_after_bomb()
    {
        return Some(BotAction::PlaceBomb);
    }

    let mut blocked = board.bombs.clone();
    blocked.extend(board.threats.iter().copied());
    if let Some(dir) = first_step_toward(grid, &blocked, from, usize::MAX, |pos| pos == target) {
        return Some(BotAction::Move(dir));
    }

    // No open route: blast through an adjacent brick when we can get clear.
    let next_to_brick = Direction::ALL
        .into_iter()
        .any(|dir| grid.cell_type(from.offset(dir)) == Some(CellType::DestructibleBrick));
    if can_bomb && next_to_brick && board.has_escape_after_bomb() {
        return Some(BotAction::PlaceBomb);
    }

    let here = from.manhattan(target);
    safe_moves
        .iter()
        .copied()
        .map(|dir| {
            let closer = (here - from.offset(dir).manhattan(target)) as f32;
            (dir, closer + rng.next_f32() * jitter)
        })
        .filter(|(_, score)| *score > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(dir, _)| BotAction::Move(dir))
}

fn nearest_opponent<'s>(bot: &PlayerState, snapshot: &'s Snapshot) -> Option<&'s PlayerView> {
    snapshot
        .players
        .iter()
        .filter(|player| !player.eliminated && player.name != bot.name)
        .min_by_key(|player| player.position.manhattan(bot.position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::utils::test_support::grid_from_rows;
    use crate::rng::Rng;
    use crate::types::BombView;

    const NOW: u64 = 10_000;
    const TIERS: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    fn view(name: &str, x: i32, y: i32, eliminated: bool) -> PlayerView {
        PlayerView {
            name: name.to_string(),
            position: Position::new(x, y),
            eliminated,
            bot: true,
            captured_flags: 0,
        }
    }

    fn bomb(x: i32, y: i32, fuse_left_ms: u64) -> BombView {
        BombView {
            owner: "someone".to_string(),
            position: Position::new(x, y),
            detonates_at_ms: NOW + fuse_left_ms,
            radius: 2,
        }
    }

    fn snapshot(rows: &[&str], players: Vec<PlayerView>, bombs: Vec<BombView>) -> Snapshot {
        Snapshot {
            tick: 1,
            now_ms: NOW,
            grid: grid_from_rows(rows),
            blast_radius: 2,
            players,
            bombs,
            flags: Vec::new(),
        }
    }

    fn bot_at(x: i32, y: i32) -> PlayerState {
        PlayerState::new("bot", Position::new(x, y))
    }

    fn on_cooldown(mut bot: PlayerState) -> PlayerState {
        bot.bomb_placed(NOW);
        bot
    }

    fn decisions(bot: &PlayerState, difficulty: Difficulty, snap: &Snapshot) -> HashSet<String> {
        (1..=200u32)
            .map(|seed| {
                let action = decide_action(bot, difficulty, Some(snap), &mut Rng::new(seed));
                format!("{action:?}")
            })
            .collect()
    }

    #[test]
    fn eliminated_bot_idles_regardless_of_snapshot() {
        let mut bot = bot_at(1, 1);
        bot.eliminate();
        let snap = snapshot(&["###", "#.#", "###"], vec![view("bot", 1, 1, true)], Vec::new());
        for tier in TIERS {
            assert_eq!(decide_action(&bot, tier, None, &mut Rng::new(1)), BotAction::None);
            assert_eq!(decide_action(&bot, tier, Some(&snap), &mut Rng::new(1)), BotAction::None);
        }

        bot.set_can_place_bomb_when_eliminated(true);
        assert_eq!(decide_action(&bot, Difficulty::Hard, None, &mut Rng::new(1)), BotAction::None);
    }

    #[test]
    fn easy_bot_picks_uniformly_among_legal_options() {
        let rows = ["#####", "#.#.#", "#...#", "#####"];
        let snap = snapshot(&rows, vec![view("bot", 1, 1, false)], Vec::new());
        let seen = decisions(&bot_at(1, 1), Difficulty::Easy, &snap);
        let expected: HashSet<String> = ["Move(Down)", "PlaceBomb"].iter().map(|s| s.to_string()).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn boxed_in_bot_on_cooldown_does_nothing() {
        let snap = snapshot(&["###", "#.#", "###"], vec![view("bot", 1, 1, false)], Vec::new());
        for tier in TIERS {
            let action = decide_action(&on_cooldown(bot_at(1, 1)), tier, Some(&snap), &mut Rng::new(3));
            assert_eq!(action, BotAction::None);
        }
    }

    #[test]
    fn medium_bot_steps_out_of_imminent_blasts() {
        let rows = ["######", "#....#", "#.####", "######"];
        let snap = snapshot(&rows, vec![view("bot", 1, 1, false)], vec![bomb(3, 1, 500)]);
        let seen = decisions(&on_cooldown(bot_at(1, 1)), Difficulty::Medium, &snap);
        assert_eq!(seen, HashSet::from(["Move(Down)".to_string()]));
    }

    #[test]
    fn medium_bot_ignores_bombs_outside_its_window() {
        let rows = ["######", "#....#", "#.####", "######"];
        let snap = snapshot(&rows, vec![view("bot", 1, 1, false)], vec![bomb(3, 1, 2_000)]);
        let seen = decisions(&on_cooldown(bot_at(1, 1)), Difficulty::Medium, &snap);
        assert!(seen.contains("Move(Down)"));
        assert!(seen.contains("Move(Right)"));
    }

    #[test]
    fn medium_bot_falls_back_to_any_legal_move_when_nothing_is_safe() {
        let rows = ["#####", "#...#", "#.###", "#.###", "#####"];
        let snap = snapshot(
            &rows,
            vec![view("bot", 1, 1, false)],
            vec![bomb(2, 1, 300), bomb(1, 3, 300)],
        );
        let seen = decisions(&on_cooldown(bot_at(1, 1)), Difficulty::Medium, &snap);
        assert_eq!(seen, HashSet::from(["Move(Down)".to_string()]));
    }

    #[test]
    fn hard_bot_escapes_before_chasing() {
        let rows = ["######", "#..###", "#.####", "#.####", "#.####", "######"];
        let snap = snapshot(
            &rows,
            vec![view("bot", 1, 1, false), view("rival", 2, 1, false)],
            vec![bomb(1, 1, 2_000)],
        );
        let seen = decisions(&on_cooldown(bot_at(1, 1)), Difficulty::Hard, &snap);
        assert_eq!(seen, HashSet::from(["Move(Down)".to_string()]));
    }

    #[test]
    fn hard_bot_moves_toward_nearest_live_opponent() {
        let rows = ["#######", "#.....#", "#.....#", "#.....#", "#######"];
        let snap = snapshot(
            &rows,
            vec![
                view("bot", 1, 1, false),
                view("ghost", 1, 3, true),
                view("near", 4, 1, false),
                view("far", 5, 3, false),
            ],
            Vec::new(),
        );
        let seen = decisions(&bot_at(1, 1), Difficulty::Hard, &snap);
        assert_eq!(seen, HashSet::from(["Move(Right)".to_string()]));
    }

    #[test]
    fn hard_bot_bombs_opponent_in_blast_line_when_it_can_get_clear() {
        let rows = ["#######", "#.....#", "#.....#", "#.....#", "#######"];
        let snap = snapshot(
            &rows,
            vec![view("bot", 1, 1, false), view("rival", 3, 1, false)],
            Vec::new(),
        );
        let seen = decisions(&bot_at(1, 1), Difficulty::Hard, &snap);
        assert_eq!(seen, HashSet::from(["PlaceBomb".to_string()]));
    }

    #[test]
    fn hard_bot_holds_its_bomb_in_a_dead_end() {
        let rows = ["#####", "#...#", "#####"];
        let snap = snapshot(
            &rows,
            vec![view("bot", 1, 1, false), view("rival", 3, 1, false)],
            Vec::new(),
        );
        let seen = decisions(&bot_at(1, 1), Difficulty::Hard, &snap);
        assert_eq!(seen, HashSet::from(["Move(Right)".to_string()]));
    }

    #[test]
    fn lone_hard_bot_never_bombs_itself_in_a_dead_end() {
        let rows = ["#####", "#...#", "#####"];
        let snap = snapshot(&rows, vec![view("bot", 1, 1, false)], Vec::new());
        let seen = decisions(&bot_at(1, 1), Difficulty::Hard, &snap);
        assert_eq!(seen, HashSet::from(["Move(Right)".to_string()]));

        let open = ["#######", "#.....#", "#.....#", "#.....#", "#######"];
        let snap = snapshot(&open, vec![view("bot", 1, 1, false)], Vec::new());
        let seen = decisions(&bot_at(1, 1), Difficulty::Hard, &snap);
        assert!(seen.contains("PlaceBomb"), "{seen:?}");
    }

    #[test]
    fn hard_bot_breaks_bricks_when_walled_off() {
        let rows = ["#######", "#..+..#", "#.#####", "#######"];
        let snap = snapshot(
            &rows,
            vec![view("bot", 2, 1, false), view("rival", 5, 1, false)],
            Vec::new(),
        );
        let seen = decisions(&bot_at(2, 1), Difficulty::Hard, &snap);
        assert_eq!(seen, HashSet::from(["PlaceBomb".to_string()]));
    }
}
