use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::BRICK_FILL_PROBABILITY;
use crate::error::{GameError, GameResult};
use crate::rng::RandomSource;
use crate::types::{Cell, CellType, Position};

const RAW_EMPTY: i64 = 0;
const RAW_WALL: i64 = 1;
const RAW_BRICK: i64 = 2;
const RAW_VOID: i64 = 3;

/// Declarative level description as stored in level documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub width: i32,
    pub height: i32,
    #[serde(rename = "autoFill")]
    pub auto_fill: bool,
    pub grid: Vec<Vec<i64>>,
}

impl LevelSpec {
    pub fn from_json(text: &str) -> GameResult<Self> {
        serde_json::from_str(text)
            .map_err(|error| GameError::Configuration(format!("invalid level document: {error}")))
    }

    /// Border walls with the usual pillar on every even interior cell.
    pub fn classic(width: i32, height: i32, auto_fill: bool) -> Self {
        let grid = (0..height.max(0))
            .map(|y| {
                (0..width.max(0))
                    .map(|x| {
                        let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                        if border || (x % 2 == 0 && y % 2 == 0) {
                            RAW_WALL
                        } else {
                            RAW_EMPTY
                        }
                    })
                    .collect()
            })
            .collect();
        Self {
            width,
            height,
            auto_fill,
            grid,
        }
    }

    pub fn validate(&self) -> GameResult<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(GameError::Configuration(format!(
                "level dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.grid.len() != self.height as usize {
            return Err(GameError::Configuration(format!(
                "level declares {} rows but grid has {}",
                self.height,
                self.grid.len()
            )));
        }
        if let Some((row, cols)) = self
            .grid
            .iter()
            .enumerate()
            .find(|(_, cols)| cols.len() != self.width as usize)
        {
            return Err(GameError::Configuration(format!(
                "level row {row} has {} columns, expected {}",
                cols.len(),
                self.width
            )));
        }
        Ok(())
    }
}

pub fn load_level(path: &Path) -> GameResult<LevelSpec> {
    let text = fs::read_to_string(path)?;
    LevelSpec::from_json(&text)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Grid {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    pub fn get(&self, pos: Position) -> Option<&Cell> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.cells.get((pos.y * self.width + pos.x) as usize)
    }

    pub fn cell_type(&self, pos: Position) -> Option<CellType> {
        self.get(pos).map(|cell| cell.cell_type)
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        self.cell_type(pos) == Some(CellType::Empty)
    }

    pub fn is_void(&self, pos: Position) -> bool {
        self.get(pos).is_some_and(|cell| cell.void_marker)
    }

    /// Returns false when `pos` is outside the grid.
    pub fn set_cell_type(&mut self, pos: Position, cell_type: CellType) -> bool {
        if !self.in_bounds(pos) {
            return false;
        }
        let idx = (pos.y * self.width + pos.x) as usize;
        match self.cells.get_mut(idx) {
            Some(cell) => {
                cell.cell_type = cell_type;
                true
            }
            None => false,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn count(&self, cell_type: CellType) -> usize {
        self.cells
            .iter()
            .filter(|cell| cell.cell_type == cell_type)
            .count()
    }

    pub fn render_rows(&self) -> Vec<String> {
        self.cells
            .chunks(self.width as usize)
            .map(|row| {
                row.iter()
                    .map(|cell| match cell.cell_type {
                        CellType::IndestructibleWall => '#',
                        CellType::DestructibleBrick => '+',
                        CellType::Empty if cell.void_marker => '~',
                        CellType::Empty => '.',
                    })
                    .collect()
            })
            .collect()
    }
}

/// Terrain for one raw value from the fixed mapping table, plus the void marker.
fn raw_cell_type(raw: i64) -> (CellType, bool) {
    match raw {
        RAW_EMPTY => (CellType::Empty, false),
        RAW_WALL => (CellType::IndestructibleWall, false),
        RAW_BRICK => (CellType::DestructibleBrick, false),
        RAW_VOID => (CellType::Empty, true),
        _ => (CellType::Empty, false),
    }
}

pub fn generate_grid<R: RandomSource + ?Sized>(spec: &LevelSpec, rng: &mut R) -> GameResult<Grid> {
    spec.validate()?;

    let mut cells = Vec::with_capacity((spec.width * spec.height) as usize);
    for (y, row) in spec.grid.iter().enumerate() {
        for (x, raw) in row.iter().enumerate() {
            let position = Position::new(x as i32, y as i32);
            let (cell_type, void_marker) = if spec.auto_fill && *raw == RAW_EMPTY {
                if rng.bool(BRICK_FILL_PROBABILITY) {
                    (CellType::DestructibleBrick, false)
                } else {
                    (CellType::Empty, false)
                }
            } else {
                raw_cell_type(*raw)
            };
            cells.push(Cell {
                position,
                cell_type,
                void_marker,
            });
        }
    }

    Ok(Grid {
        width: spec.width,
        height: spec.height,
        cells,
    })
}

/// Non-wall cells nearest to each corner, then the centre, without duplicates.
pub fn spawn_positions(grid: &Grid, count: usize) -> Vec<Position> {
    let w = grid.width() - 1;
    let h = grid.height() - 1;
    let anchors = [
        Position::new(0, 0),
        Position::new(w, h),
        Position::new(w, 0),
        Position::new(0, h),
        Position::new(w / 2, h / 2),
        Position::new(w / 2, 0),
        Position::new(w / 2, h),
        Position::new(0, h / 2),
        Position::new(w, h / 2),
    ];

    let mut taken = HashSet::new();
    let mut spawns = Vec::new();
    for anchor in anchors.iter().cycle().take(anchors.len().max(count)) {
        if spawns.len() >= count {
            break;
        }
        if let Some(pos) = find_nearest_open(grid, *anchor, &taken) {
            taken.insert(pos);
            spawns.push(pos);
        }
    }
    spawns
}

fn find_nearest_open(grid: &Grid, anchor: Position, taken: &HashSet<Position>) -> Option<Position> {
    grid.cells()
        .iter()
        .filter(|cell| cell.cell_type != CellType::IndestructibleWall)
        .filter(|cell| !taken.contains(&cell.position))
        .min_by_key(|cell| (cell.position.manhattan(anchor), cell.position.y, cell.position.x))
        .map(|cell| cell.position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Rng;

    struct FixedSource(f32);

    impl RandomSource for FixedSource {
        fn next_f32(&mut self) -> f32 {
            self.0
        }
    }

    fn spec(width: i32, height: i32, auto_fill: bool, grid: Vec<Vec<i64>>) -> LevelSpec {
        LevelSpec {
            width,
            height,
            auto_fill,
            grid,
        }
    }

    #[test]
    fn raw_values_map_through_fixed_table() {
        let level = spec(6, 1, false, vec![vec![0, 1, 2, 3, 7, -4]]);
        let grid = generate_grid(&level, &mut Rng::new(1)).expect("valid level");
        let types: Vec<CellType> = grid.cells().iter().map(|cell| cell.cell_type).collect();
        assert_eq!(
            types,
            vec![
                CellType::Empty,
                CellType::IndestructibleWall,
                CellType::DestructibleBrick,
                CellType::Empty,
                CellType::Empty,
                CellType::Empty,
            ]
        );
        assert!(grid.is_void(Position::new(3, 0)));
        assert!(!grid.is_void(Position::new(4, 0)));
        assert_eq!(grid.render_rows(), vec![".#+~..".to_string()]);
    }

    #[test]
    fn auto_fill_only_touches_zero_cells() {
        let level = spec(4, 1, true, vec![vec![0, 1, 2, 3]]);
        let grid = generate_grid(&level, &mut FixedSource(0.0)).expect("valid level");
        assert_eq!(grid.cell_type(Position::new(0, 0)), Some(CellType::DestructibleBrick));
        assert_eq!(grid.cell_type(Position::new(1, 0)), Some(CellType::IndestructibleWall));
        assert_eq!(grid.cell_type(Position::new(2, 0)), Some(CellType::DestructibleBrick));
        assert_eq!(grid.cell_type(Position::new(3, 0)), Some(CellType::Empty));

        let grid = generate_grid(&level, &mut FixedSource(0.3)).expect("valid level");
        assert_eq!(grid.cell_type(Position::new(0, 0)), Some(CellType::Empty));
    }

    #[test]
    fn auto_fill_brick_fraction_is_close_to_thirty_percent() {
        let size = 200;
        let level = spec(size, size, true, vec![vec![0; size as usize]; size as usize]);
        let grid = generate_grid(&level, &mut Rng::new(2024)).expect("valid level");
        let fraction = grid.count(CellType::DestructibleBrick) as f64 / (size * size) as f64;
        assert!((fraction - 0.30).abs() < 0.02, "fraction was {fraction}");
    }

    #[test]
    fn mismatched_geometry_is_rejected() {
        let short_rows = spec(3, 3, false, vec![vec![0; 3]; 2]);
        assert!(matches!(
            generate_grid(&short_rows, &mut Rng::new(1)),
            Err(GameError::Configuration(_))
        ));

        let ragged = spec(3, 2, false, vec![vec![0; 3], vec![0; 4]]);
        assert!(matches!(
            generate_grid(&ragged, &mut Rng::new(1)),
            Err(GameError::Configuration(_))
        ));

        let zero = spec(0, 2, false, vec![vec![], vec![]]);
        assert!(matches!(
            generate_grid(&zero, &mut Rng::new(1)),
            Err(GameError::Configuration(_))
        ));
    }

    #[test]
    fn rejected_geometry_draws_no_samples() {
        struct CountingSource(usize);
        impl RandomSource for CountingSource {
            fn next_f32(&mut self) -> f32 {
                self.0 += 1;
                0.5
            }
        }
        let mut source = CountingSource(0);
        let level = spec(2, 2, true, vec![vec![0, 0], vec![0]]);
        assert!(generate_grid(&level, &mut source).is_err());
        assert_eq!(source.0, 0);
    }

    #[test]
    fn from_json_reports_missing_fields_as_configuration_errors() {
        let ok = LevelSpec::from_json(r#"{"width":2,"height":1,"autoFill":false,"grid":[[0,1]]}"#)
            .expect("valid document");
        assert_eq!(ok.width, 2);
        assert!(!ok.auto_fill);

        let missing = LevelSpec::from_json(r#"{"width":2,"height":1,"grid":[[0,1]]}"#);
        assert!(matches!(missing, Err(GameError::Configuration(_))));

        let wrong_type = LevelSpec::from_json(r#"{"width":"2","height":1,"autoFill":true,"grid":[]}"#);
        assert!(matches!(wrong_type, Err(GameError::Configuration(_))));
    }

    #[test]
    fn load_level_surfaces_missing_file_as_io() {
        let path = std::env::temp_dir().join(format!("bomber-missing-level-{}.json", std::process::id()));
        assert!(matches!(load_level(&path), Err(GameError::Io(_))));
    }

    #[test]
    fn classic_level_has_border_and_pillars() {
        let grid = generate_grid(&LevelSpec::classic(7, 5, false), &mut Rng::new(1))
            .expect("valid level");
        assert_eq!(
            grid.render_rows(),
            vec!["#######", "#.....#", "#.#.#.#", "#.....#", "#######"]
        );
    }

    #[test]
    fn spawn_positions_pick_distinct_corner_cells() {
        let grid = generate_grid(&LevelSpec::classic(7, 5, false), &mut Rng::new(1))
            .expect("valid level");
        let spawns = spawn_positions(&grid, 4);
        assert_eq!(
            spawns,
            vec![
                Position::new(1, 1),
                Position::new(5, 3),
                Position::new(5, 1),
                Position::new(1, 3),
            ]
        );
        assert_eq!(spawn_positions(&grid, 12).len(), 12);
    }
}
