//! A fixed-size toroidal lattice holding at most one occupant per cell.
//!
//! The grid is the only shared mutable structure in a simulation. It keeps both
//! directions of the occupancy relation (cell -> occupant and occupant -> cell) so
//! that `move_occupant` and `remove` can be called with just the occupant.
use std::fmt::{self, Display};

use serde_derive::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::SimError;
use crate::occupant::Occupant;
use crate::{define_data_plugin, HashMap};

/// A cell coordinate. `x` runs along the width and `y` along the height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    #[must_use]
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Offsets of the Moore neighborhood, center excluded.
const MOORE_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

#[derive(Debug, Clone, Default)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Option<Occupant>>,
    locations: HashMap<Occupant, Position>,
}

impl Grid {
    #[must_use]
    pub fn new(width: usize, height: usize) -> Grid {
        Grid {
            width,
            height,
            cells: vec![None; width * height],
            locations: HashMap::default(),
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.locations.len()
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    fn index(&self, position: Position) -> usize {
        position.y * self.width + position.x
    }

    fn check_bounds(&self, position: Position) -> Result<(), SimError> {
        if self.contains(position) {
            Ok(())
        } else {
            Err(SimError::SimError(format!(
                "cell {position} is outside the {}x{} grid",
                self.width, self.height
            )))
        }
    }

    /// Returns the occupant of `position`, if any. Cells outside the grid are
    /// reported as unoccupied.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<Occupant> {
        if self.contains(position) {
            self.cells[self.index(position)]
        } else {
            None
        }
    }

    /// True if `position` lies on the grid and holds no occupant.
    #[must_use]
    pub fn is_empty(&self, position: Position) -> bool {
        self.contains(position) && self.cells[self.index(position)].is_none()
    }

    #[must_use]
    pub fn position_of(&self, occupant: Occupant) -> Option<Position> {
        self.locations.get(&occupant).copied()
    }

    /// Puts `occupant` on the grid at `position`.
    ///
    /// # Errors
    ///
    /// `SimError::OccupancyError` if the cell is taken; `SimError::SimError` if
    /// the cell is off the grid or the occupant is already placed elsewhere.
    pub fn place(&mut self, occupant: Occupant, position: Position) -> Result<(), SimError> {
        self.check_bounds(position)?;
        if !self.is_empty(position) {
            return Err(SimError::OccupancyError(position));
        }
        if let Some(current) = self.position_of(occupant) {
            return Err(SimError::SimError(format!(
                "{occupant:?} is already placed at {current}"
            )));
        }
        let index = self.index(position);
        self.cells[index] = Some(occupant);
        self.locations.insert(occupant, position);
        Ok(())
    }

    /// Relocates `occupant` to `new_position` and returns the cell it left.
    ///
    /// # Errors
    ///
    /// `SimError::OccupancyError` if `new_position` holds another occupant;
    /// `SimError::SimError` if the occupant is not on the grid or the cell is
    /// off the grid.
    pub fn move_occupant(
        &mut self,
        occupant: Occupant,
        new_position: Position,
    ) -> Result<Position, SimError> {
        self.check_bounds(new_position)?;
        let old_position = self
            .position_of(occupant)
            .ok_or_else(|| SimError::SimError(format!("{occupant:?} is not on the grid")))?;
        if old_position == new_position {
            return Ok(old_position);
        }
        if !self.is_empty(new_position) {
            return Err(SimError::OccupancyError(new_position));
        }
        let old_index = self.index(old_position);
        let new_index = self.index(new_position);
        self.cells[old_index] = None;
        self.cells[new_index] = Some(occupant);
        self.locations.insert(occupant, new_position);
        Ok(old_position)
    }

    /// Frees the cell held by `occupant` and returns it.
    ///
    /// # Errors
    ///
    /// `SimError::SimError` if the occupant is not on the grid.
    pub fn remove(&mut self, occupant: Occupant) -> Result<Position, SimError> {
        let position = self
            .locations
            .remove(&occupant)
            .ok_or_else(|| SimError::SimError(format!("{occupant:?} is not on the grid")))?;
        let index = self.index(position);
        self.cells[index] = None;
        Ok(position)
    }

    /// The distinct cells of the Moore neighborhood of `position`, wrapping at the
    /// edges. On grids narrower or shorter than three cells the wrapped offsets can
    /// land on the same cell or on `position` itself; such cells are listed once and
    /// the center is never listed.
    #[must_use]
    pub fn neighbor_cells(&self, position: Position) -> Vec<Position> {
        let mut cells = Vec::with_capacity(MOORE_OFFSETS.len());
        if !self.contains(position) {
            return cells;
        }
        for (dx, dy) in MOORE_OFFSETS {
            let neighbor = self.wrap(position, dx, dy);
            if neighbor != position && !cells.contains(&neighbor) {
                cells.push(neighbor);
            }
        }
        cells
    }

    /// The occupants of the Moore neighborhood of `position`, center excluded.
    #[must_use]
    pub fn neighbors(&self, position: Position) -> Vec<Occupant> {
        self.neighbor_cells(position)
            .into_iter()
            .filter_map(|cell| self.get(cell))
            .collect()
    }

    /// The unoccupied cells of the Moore neighborhood of `position`.
    #[must_use]
    pub fn empty_neighbor_cells(&self, position: Position) -> Vec<Position> {
        self.neighbor_cells(position)
            .into_iter()
            .filter(|cell| self.is_empty(*cell))
            .collect()
    }

    fn wrap(&self, position: Position, dx: isize, dy: isize) -> Position {
        let wrap_axis = |value: usize, delta: isize, size: usize| -> usize {
            // Sizes are bounded by the cell vector's length, so they fit in isize.
            (value as isize + delta).rem_euclid(size as isize) as usize
        };
        Position {
            x: wrap_axis(position.x, dx, self.width),
            y: wrap_axis(position.y, dy, self.height),
        }
    }

    /// All occupied cells in row-major order.
    pub fn occupants(&self) -> impl Iterator<Item = (Position, Occupant)> + '_ {
        self.cells.iter().enumerate().filter_map(|(index, cell)| {
            cell.map(|occupant| {
                (
                    Position {
                        x: index % self.width,
                        y: index / self.width,
                    },
                    occupant,
                )
            })
        })
    }
}

define_data_plugin!(GridPlugin, Option<Grid>, None);

pub trait ContextGridExt {
    /// The grid of the running simulation.
    ///
    /// # Errors
    ///
    /// Fails if the simulation has not been initialized.
    fn get_grid(&self) -> Result<&Grid, SimError>;
}

impl ContextGridExt for Context {
    fn get_grid(&self) -> Result<&Grid, SimError> {
        self.get_data_container(GridPlugin)
            .and_then(Option::as_ref)
            .ok_or_else(|| SimError::from("grid has not been initialized"))
    }
}

pub(crate) fn set_grid(context: &mut Context, grid: Grid) {
    *context.get_data_container_mut(GridPlugin) = Some(grid);
}

pub(crate) fn grid_mut(context: &mut Context) -> Result<&mut Grid, SimError> {
    context
        .get_data_container_mut(GridPlugin)
        .as_mut()
        .ok_or_else(|| SimError::from("grid has not been initialized"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentId;
    use crate::obstacle::ObstacleId;

    fn agent(id: usize) -> Occupant {
        Occupant::Agent(AgentId(id))
    }

    #[test]
    fn place_and_query() {
        let mut grid = Grid::new(5, 4);
        assert_eq!(grid.cell_count(), 20);
        assert!(grid.is_empty(Position::new(2, 3)));

        grid.place(agent(0), Position::new(2, 3)).unwrap();
        assert!(!grid.is_empty(Position::new(2, 3)));
        assert_eq!(grid.get(Position::new(2, 3)), Some(agent(0)));
        assert_eq!(grid.position_of(agent(0)), Some(Position::new(2, 3)));
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn place_on_occupied_cell_fails() {
        let mut grid = Grid::new(3, 3);
        grid.place(agent(0), Position::new(1, 1)).unwrap();
        let result = grid.place(agent(1), Position::new(1, 1));
        assert!(matches!(result, Err(SimError::OccupancyError(p)) if p == Position::new(1, 1)));
        assert_eq!(grid.get(Position::new(1, 1)), Some(agent(0)));
    }

    #[test]
    fn place_twice_or_off_grid_fails() {
        let mut grid = Grid::new(3, 3);
        grid.place(agent(0), Position::new(0, 0)).unwrap();
        assert!(grid.place(agent(0), Position::new(1, 0)).is_err());
        assert!(grid.place(agent(1), Position::new(3, 0)).is_err());
        assert!(!grid.is_empty(Position::new(3, 0)));
    }

    #[test]
    fn moore_neighborhood_wraps() {
        let grid = Grid::new(10, 10);
        let mut cells = grid.neighbor_cells(Position::new(0, 0));
        cells.sort();
        let mut expected = vec![
            Position::new(9, 9),
            Position::new(0, 9),
            Position::new(1, 9),
            Position::new(9, 0),
            Position::new(1, 0),
            Position::new(9, 1),
            Position::new(0, 1),
            Position::new(1, 1),
        ];
        expected.sort();
        assert_eq!(cells, expected);
    }

    #[test]
    fn neighborhood_on_tiny_grids() {
        // A 1x1 grid wraps every offset onto the center.
        let grid = Grid::new(1, 1);
        assert!(grid.neighbor_cells(Position::new(0, 0)).is_empty());

        // A 2x1 grid has exactly one distinct neighbor.
        let grid = Grid::new(2, 1);
        assert_eq!(
            grid.neighbor_cells(Position::new(0, 0)),
            vec![Position::new(1, 0)]
        );

        // A 2x2 grid: every other cell is a neighbor, each listed once.
        let grid = Grid::new(2, 2);
        assert_eq!(grid.neighbor_cells(Position::new(1, 1)).len(), 3);
    }

    #[test]
    fn neighbors_excludes_center_and_empty_cells() {
        let mut grid = Grid::new(5, 5);
        grid.place(agent(0), Position::new(2, 2)).unwrap();
        grid.place(agent(1), Position::new(3, 3)).unwrap();
        grid.place(Occupant::Obstacle(ObstacleId(0)), Position::new(1, 2))
            .unwrap();
        grid.place(agent(2), Position::new(4, 4)).unwrap();

        let mut neighbors = grid.neighbors(Position::new(2, 2));
        neighbors.sort();
        let mut expected = vec![agent(1), Occupant::Obstacle(ObstacleId(0))];
        expected.sort();
        assert_eq!(neighbors, expected);

        assert_eq!(grid.empty_neighbor_cells(Position::new(2, 2)).len(), 6);
    }

    #[test]
    fn move_occupant() {
        let mut grid = Grid::new(4, 4);
        grid.place(agent(0), Position::new(0, 0)).unwrap();
        grid.place(agent(1), Position::new(1, 0)).unwrap();

        let result = grid.move_occupant(agent(0), Position::new(1, 0));
        assert!(matches!(result, Err(SimError::OccupancyError(_))));

        let old = grid.move_occupant(agent(0), Position::new(3, 3)).unwrap();
        assert_eq!(old, Position::new(0, 0));
        assert!(grid.is_empty(Position::new(0, 0)));
        assert_eq!(grid.get(Position::new(3, 3)), Some(agent(0)));
        assert_eq!(grid.position_of(agent(0)), Some(Position::new(3, 3)));
        assert_eq!(grid.occupied_count(), 2);
    }

    #[test]
    fn remove_frees_cell() {
        let mut grid = Grid::new(4, 4);
        grid.place(agent(0), Position::new(2, 1)).unwrap();
        assert_eq!(grid.remove(agent(0)).unwrap(), Position::new(2, 1));
        assert!(grid.is_empty(Position::new(2, 1)));
        assert!(grid.position_of(agent(0)).is_none());
        assert!(grid.remove(agent(0)).is_err());
        assert!(grid.move_occupant(agent(0), Position::new(0, 0)).is_err());
    }

    #[test]
    fn grid_plugin() {
        let mut context = Context::new();
        assert!(context.get_grid().is_err());
        assert!(grid_mut(&mut context).is_err());

        set_grid(&mut context, Grid::new(3, 3));
        grid_mut(&mut context)
            .unwrap()
            .place(agent(0), Position::new(1, 1))
            .unwrap();
        assert_eq!(
            context.get_grid().unwrap().position_of(agent(0)),
            Some(Position::new(1, 1))
        );
    }

    #[test]
    fn occupants_in_row_major_order() {
        let mut grid = Grid::new(3, 2);
        grid.place(agent(1), Position::new(0, 1)).unwrap();
        grid.place(agent(0), Position::new(2, 0)).unwrap();
        let occupants: Vec<_> = grid.occupants().collect();
        assert_eq!(
            occupants,
            vec![
                (Position::new(2, 0), agent(0)),
                (Position::new(0, 1), agent(1)),
            ]
        );
    }
}
