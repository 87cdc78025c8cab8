use super::*;
use crate::types::FlagView;

#[derive(Clone, Debug)]
pub(super) struct Flag {
    pub(super) id: String,
    pub(super) home: Position,
    pub(super) holder: Option<usize>,
}

impl Round {
    pub(super) fn place_flags(&mut self, cells: &[Position]) {
        for (idx, home) in cells.iter().enumerate() {
            if self.grid.cell_type(*home) == Some(CellType::DestructibleBrick) {
                self.grid.set_cell_type(*home, CellType::Empty);
            }
            self.flags.push(Flag {
                id: format!("flag-{}", idx + 1),
                home: *home,
                holder: None,
            });
        }
    }

    /// A live player standing on a loose flag picks it up.
    pub(super) fn collect_flags(&mut self) {
        for flag_idx in 0..self.flags.len() {
            if self.flags[flag_idx].holder.is_some() {
                continue;
            }
            let home = self.flags[flag_idx].home;
            let Some(player_idx) = self
                .players
                .iter()
                .position(|player| !player.state.is_eliminated() && player.state.position == home)
            else {
                continue;
            };

            let flag_id = self.flags[flag_idx].id.clone();
            self.flags[flag_idx].holder = Some(player_idx);
            let player = &mut self.players[player_idx].state;
            player.add_captured_flag(flag_id.clone());
            debug!("{} captured {flag_id}", player.name);
            self.events.push(RuntimeEvent::FlagCaptured {
                flag_id,
                by: player.name.clone(),
            });
        }
    }

    /// Held flags go back to their home cell.
    pub(super) fn drop_flags(&mut self, player_idx: usize) {
        let by = self.players[player_idx].state.name.clone();
        for flag in self.flags.iter_mut().filter(|flag| flag.holder == Some(player_idx)) {
            flag.holder = None;
            self.players[player_idx].state.remove_captured_flag(&flag.id);
            self.events.push(RuntimeEvent::FlagDropped {
                flag_id: flag.id.clone(),
                by: by.clone(),
            });
        }
    }

    pub(super) fn holder_of_all_flags(&self) -> Option<usize> {
        let first = self.flags.first()?.holder?;
        self.flags
            .iter()
            .all(|flag| flag.holder == Some(first))
            .then_some(first)
    }

    pub(super) fn flag_views(&self) -> Vec<FlagView> {
        self.flags
            .iter()
            .map(|flag| {
                let holder = flag.holder.and_then(|idx| self.players.get(idx));
                FlagView {
                    id: flag.id.clone(),
                    position: holder.map(|player| player.state.position).unwrap_or(flag.home),
                    held_by: holder.map(|player| player.state.name.clone()),
                }
            })
            .collect()
    }
}
