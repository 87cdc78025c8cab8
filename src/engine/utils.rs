use std::collections::{HashSet, VecDeque};

use crate::level::Grid;
use crate::types::{CellType, Direction, Position};

/// Cells covered by a blast: a cross of `radius` cells that stops at walls and
/// at (and including) the first brick.
pub(crate) fn blast_cells(grid: &Grid, origin: Position, radius: i32) -> Vec<Position> {
    let mut cells = vec![origin];
    for dir in Direction::ALL {
        let mut pos = origin;
        for _ in 0..radius.max(0) {
            pos = pos.offset(dir);
            match grid.cell_type(pos) {
                None | Some(CellType::IndestructibleWall) => break,
                Some(CellType::DestructibleBrick) => {
                    cells.push(pos);
                    break;
                }
                Some(CellType::Empty) => cells.push(pos),
            }
        }
    }
    cells
}

/// Breadth-first walk over empty cells not in `blocked`, starting at `from`.
/// Returns the first direction taken toward the nearest cell accepted by
/// `goal`, or `None` when nothing within `max_depth` steps qualifies.
pub(crate) fn first_step_toward(
    grid: &Grid,
    blocked: &HashSet<Position>,
    from: Position,
    max_depth: usize,
    goal: impl Fn(Position) -> bool,
) -> Option<Direction> {
    let mut visited = HashSet::from([from]);
    let mut queue = VecDeque::new();
    for dir in Direction::ALL {
        let next = from.offset(dir);
        if grid.is_walkable(next) && !blocked.contains(&next) && visited.insert(next) {
            queue.push_back((next, dir, 1usize));
        }
    }

    while let Some((pos, first, depth)) = queue.pop_front() {
        if goal(pos) {
            return Some(first);
        }
        if depth >= max_depth {
            continue;
        }
        for dir in Direction::ALL {
            let next = pos.offset(dir);
            if grid.is_walkable(next) && !blocked.contains(&next) && visited.insert(next) {
                queue.push_back((next, first, depth + 1));
            }
        }
    }
    None
}


#[cfg(test)]
mod tests {
    use super::test_support::grid_from_rows;
    use super::*;

    #[test]
    fn blast_stops_at_walls_and_first_brick() {
        let grid = grid_from_rows(&[
            "#######",
            "#..+..#",
            "#.....#",
            "#######",
        ]);
        let mut cells = blast_cells(&grid, Position::new(1, 1), 3);
        cells.sort();
        assert_eq!(
            cells,
            vec![
                Position::new(1, 1),
                Position::new(1, 2),
                Position::new(2, 1),
                Position::new(3, 1),
            ]
        );
    }

    #[test]
    fn first_step_finds_shortest_route_around_blocks() {
        let grid = grid_from_rows(&[
            "#####",
            "#...#",
            "#.#.#",
            "#...#",
            "#####",
        ]);
        let blocked = HashSet::from([Position::new(2, 1)]);
        let target = Position::new(3, 1);
        let step = first_step_toward(&grid, &blocked, Position::new(1, 1), 8, |pos| pos == target);
        assert_eq!(step, Some(Direction::Down));

        let unreachable = first_step_toward(&grid, &blocked, Position::new(1, 1), 2, |pos| pos == target);
        assert_eq!(unreachable, None);
    }
}
