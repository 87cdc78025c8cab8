//! Per-entity mutable state for human and bot players.
//!
//! Times are caller-supplied milliseconds from a monotonic clock, so every
//! query here is replayable without real time passing.

use std::collections::BTreeSet;

use crate::constants::BOMB_COOLDOWN_MS;
use crate::rng::RandomSource;
use crate::types::{BotAction, Difficulty, Position, Snapshot};

#[derive(Clone, Debug, PartialEq)]
pub struct PlayerState {
    pub name: String,
    pub position: Position,
    eliminated: bool,
    last_bomb_at_ms: Option<u64>,
    bomb_cooldown_ms: u64,
    can_place_bomb_when_eliminated: bool,
    captured_flags: BTreeSet<String>,
}

impl PlayerState {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self::with_cooldown(name, position, BOMB_COOLDOWN_MS)
    }

    pub fn with_cooldown(name: impl Into<String>, position: Position, bomb_cooldown_ms: u64) -> Self {
        Self {
            name: name.into(),
            position,
            eliminated: false,
            last_bomb_at_ms: None,
            bomb_cooldown_ms,
            can_place_bomb_when_eliminated: false,
            captured_flags: BTreeSet::new(),
        }
    }

    pub fn is_eliminated(&self) -> bool {
        self.eliminated
    }

    pub fn eliminate(&mut self) {
        self.eliminated = true;
    }

    pub fn bomb_cooldown_ms(&self) -> u64 {
        self.bomb_cooldown_ms
    }

    pub fn last_bomb_at_ms(&self) -> Option<u64> {
        self.last_bomb_at_ms
    }

    pub fn can_place_bomb_when_eliminated(&self) -> bool {
        self.can_place_bomb_when_eliminated
    }

    pub fn set_can_place_bomb_when_eliminated(&mut self, allowed: bool) {
        self.can_place_bomb_when_eliminated = allowed;
    }

    /// Records a placement at `now_ms`. Callers check `can_place_bomb` first.
    pub fn bomb_placed(&mut self, now_ms: u64) {
        self.last_bomb_at_ms = Some(now_ms);
    }

    fn elapsed_since_bomb(&self, now_ms: u64) -> Option<u64> {
        self.last_bomb_at_ms.map(|placed_at| now_ms.saturating_sub(placed_at))
    }

    pub fn is_on_bomb_cooldown(&self, now_ms: u64) -> bool {
        self.elapsed_since_bomb(now_ms)
            .is_some_and(|elapsed| elapsed < self.bomb_cooldown_ms)
    }

    pub fn remaining_cooldown_ms(&self, now_ms: u64) -> u64 {
        self.elapsed_since_bomb(now_ms)
            .map(|elapsed| self.bomb_cooldown_ms.saturating_sub(elapsed))
            .unwrap_or(0)
    }

    pub fn cooldown_percentage(&self, now_ms: u64) -> f32 {
        if self.bomb_cooldown_ms == 0 || !self.is_on_bomb_cooldown(now_ms) {
            return 0.0;
        }
        let remaining = self.remaining_cooldown_ms(now_ms) as f32;
        (remaining / self.bomb_cooldown_ms as f32 * 100.0).clamp(0.0, 100.0)
    }

    pub fn reset_bomb_cooldown(&mut self) {
        self.last_bomb_at_ms = None;
    }

    pub fn can_place_bomb(&self, now_ms: u64) -> bool {
        !self.is_on_bomb_cooldown(now_ms)
            && (!self.eliminated || self.can_place_bomb_when_eliminated)
    }

    pub fn add_captured_flag(&mut self, flag_id: impl Into<String>) {
        self.captured_flags.insert(flag_id.into());
    }

    pub fn remove_captured_flag(&mut self, flag_id: &str) {
        self.captured_flags.remove(flag_id);
    }

    pub fn clear_captured_flags(&mut self) {
        self.captured_flags.clear();
    }

    pub fn has_captured_flag(&self, flag_id: &str) -> bool {
        self.captured_flags.contains(flag_id)
    }

    pub fn captured_flags(&self) -> impl Iterator<Item = &str> {
        self.captured_flags.iter().map(String::as_str)
    }

    pub fn captured_flags_count(&self) -> usize {
        self.captured_flags.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BotPlayer {
    pub state: PlayerState,
    difficulty: Difficulty,
}

impl BotPlayer {
    /// `level` outside 1..=3 is clamped to the nearest tier.
    pub fn new(name: impl Into<String>, position: Position, level: i64) -> Self {
        Self::with_difficulty(PlayerState::new(name, position), Difficulty::from_level(level))
    }

    pub fn with_difficulty(state: PlayerState, difficulty: Difficulty) -> Self {
        Self { state, difficulty }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn description(&self) -> String {
        format!(
            "{} [{} bot] {}",
            self.state.name,
            self.difficulty.label(),
            self.difficulty.description()
        )
    }

    pub fn decide_action<R: RandomSource + ?Sized>(
        &self,
        snapshot: Option<&Snapshot>,
        rng: &mut R,
    ) -> BotAction {
        crate::engine::decide_action(&self.state, self.difficulty, snapshot, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerState {
        PlayerState::with_cooldown("alice", Position::new(1, 1), 1_000)
    }

    #[test]
    fn fresh_player_can_place_without_cooldown() {
        let p = player();
        assert!(p.can_place_bomb(0));
        assert!(p.can_place_bomb(50_000));
        assert!(!p.is_on_bomb_cooldown(0));
        assert_eq!(p.remaining_cooldown_ms(0), 0);
        assert_eq!(p.cooldown_percentage(0), 0.0);
    }

    #[test]
    fn cooldown_runs_from_placement_and_expires() {
        let mut p = player();
        p.bomb_placed(10_000);
        assert!(p.is_on_bomb_cooldown(10_000));
        assert_eq!(p.remaining_cooldown_ms(10_000), 1_000);
        assert_eq!(p.cooldown_percentage(10_000), 100.0);
        assert!(!p.can_place_bomb(10_000));

        assert_eq!(p.remaining_cooldown_ms(10_250), 750);
        assert!((p.cooldown_percentage(10_250) - 75.0).abs() < 1e-4);

        assert!(!p.is_on_bomb_cooldown(11_000));
        assert_eq!(p.remaining_cooldown_ms(11_000), 0);
        assert_eq!(p.cooldown_percentage(11_000), 0.0);
        assert!(p.can_place_bomb(11_000));
    }

    #[test]
    fn reset_clears_cooldown_immediately() {
        let mut p = player();
        p.bomb_placed(500);
        assert!(p.remaining_cooldown_ms(500) > 0);
        p.reset_bomb_cooldown();
        assert!(!p.is_on_bomb_cooldown(500));
        assert_eq!(p.remaining_cooldown_ms(500), 0);
        assert!(p.can_place_bomb(500));
    }

    #[test]
    fn elimination_blocks_bombs_unless_rule_variant_is_enabled() {
        let mut p = player();
        p.eliminate();
        assert!(!p.can_place_bomb(0));

        p.set_can_place_bomb_when_eliminated(true);
        assert!(p.can_place_bomb(0));

        p.bomb_placed(0);
        assert!(!p.can_place_bomb(10));
    }

    #[test]
    fn zero_cooldown_never_blocks() {
        let mut p = PlayerState::with_cooldown("zero", Position::new(0, 0), 0);
        p.bomb_placed(5);
        assert!(!p.is_on_bomb_cooldown(5));
        assert_eq!(p.cooldown_percentage(5), 0.0);
    }

    #[test]
    fn captured_flags_behave_as_a_set() {
        let mut p = player();
        p.add_captured_flag("red");
        p.add_captured_flag("red");
        assert_eq!(p.captured_flags_count(), 1);

        p.remove_captured_flag("blue");
        assert_eq!(p.captured_flags_count(), 1);

        p.add_captured_flag("blue");
        assert!(p.has_captured_flag("blue"));
        assert_eq!(p.captured_flags().collect::<Vec<_>>(), vec!["blue", "red"]);

        p.remove_captured_flag("red");
        assert_eq!(p.captured_flags_count(), 1);
        p.clear_captured_flags();
        assert_eq!(p.captured_flags_count(), 0);
    }

    #[test]
    fn bot_difficulty_is_clamped() {
        for (input, expected) in [(-5, 1), (0, 1), (1, 1), (2, 2), (3, 3), (4, 3), (99, 3)] {
            let bot = BotPlayer::new("bot", Position::new(0, 0), input);
            assert_eq!(bot.difficulty().level(), expected);
            assert_eq!(expected as i64, input.clamp(1, 3));
        }
    }

    #[test]
    fn bot_description_names_tier() {
        let bot = BotPlayer::new("Bot-01", Position::new(0, 0), 3);
        assert_eq!(
            bot.description(),
            "Bot-01 [Hard bot] Hunts the nearest opponent and dodges every blast"
        );
    }
}
