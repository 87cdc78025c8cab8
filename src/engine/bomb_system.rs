use std::collections::{HashSet, VecDeque};

use super::utils::blast_cells;
use super::*;
use crate::types::BombView;

#[derive(Clone, Debug)]
pub(super) struct Bomb {
    pub(super) owner: usize,
    pub(super) position: Position,
    pub(super) detonates_at_ms: u64,
    pub(super) radius: i32,
}

impl Round {
    pub(super) fn bomb_at(&self, pos: Position) -> bool {
        self.bombs.iter().any(|bomb| bomb.position == pos)
    }

    pub(super) fn place_bomb(&mut self, idx: usize, now_ms: u64) {
        let Some(player) = self.players.get_mut(idx) else {
            return;
        };
        let position = player.state.position;
        if !player.state.can_place_bomb(now_ms) || self.bombs.iter().any(|b| b.position == position) {
            return;
        }
        player.state.bomb_placed(now_ms);
        let by = player.state.name.clone();

        self.bombs.push(Bomb {
            owner: idx,
            position,
            detonates_at_ms: now_ms + self.options.bomb_fuse_ms,
            radius: self.options.blast_radius,
        });
        debug!("{by} placed a bomb at ({}, {})", position.x, position.y);
        self.events.push(RuntimeEvent::BombPlaced { by, position });
    }

    /// Explodes every bomb whose fuse ran out. A blast reaching another bomb
    /// sets it off in the same tick.
    pub(super) fn detonate_due_bombs(&mut self, now_ms: u64) {
        let mut queue: VecDeque<Bomb> = VecDeque::new();
        let mut idx = 0;
        while idx < self.bombs.len() {
            if self.bombs[idx].detonates_at_ms <= now_ms {
                queue.push_back(self.bombs.remove(idx));
            } else {
                idx += 1;
            }
        }

        while let Some(bomb) = queue.pop_front() {
            let cells = blast_cells(&self.grid, bomb.position, bomb.radius);
            let owner_name = self.players[bomb.owner].state.name.clone();
            self.events.push(RuntimeEvent::BombExploded {
                owner: owner_name,
                position: bomb.position,
            });

            let hit: HashSet<Position> = cells.iter().copied().collect();
            let mut idx = 0;
            while idx < self.bombs.len() {
                if hit.contains(&self.bombs[idx].position) {
                    queue.push_back(self.bombs.remove(idx));
                } else {
                    idx += 1;
                }
            }

            for pos in &cells {
                if self.grid.cell_type(*pos) == Some(CellType::DestructibleBrick) {
                    self.grid.set_cell_type(*pos, CellType::Empty);
                    self.events.push(RuntimeEvent::BrickDestroyed { position: *pos });
                }
            }

            let victims: Vec<usize> = (0..self.players.len())
                .filter(|victim| {
                    let state = &self.players[*victim].state;
                    !state.is_eliminated() && hit.contains(&state.position)
                })
                .collect();
            for victim in victims {
                self.eliminate_player(victim, bomb.owner);
            }
        }
    }

    pub(super) fn bomb_views(&self) -> Vec<BombView> {
        self.bombs
            .iter()
            .map(|bomb| BombView {
                owner: self.players[bomb.owner].state.name.clone(),
                position: bomb.position,
                detonates_at_ms: bomb.detonates_at_ms,
                radius: bomb.radius,
            })
            .collect()
    }
}
