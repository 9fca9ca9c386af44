use serde_derive::Serialize;

use crate::grid::Position;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub struct ObstacleId(pub usize);

/// A wall segment. It holds its cell for the whole run and its activation does nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstacle {
    pub(crate) id: ObstacleId,
    pub(crate) position: Position,
}

impl Obstacle {
    #[must_use]
    pub fn id(&self) -> ObstacleId {
        self.id
    }

    #[must_use]
    pub fn position(&self) -> Position {
        self.position
    }
}

/// The grocery-store layout: eight aisles, four columns each split by a cross aisle.
#[must_use]
pub fn grocery_store_aisles() -> Vec<Position> {
    [10, 20, 30, 40]
        .into_iter()
        .flat_map(|x| (10..23).chain(28..41).map(move |y| Position::new(x, y)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aisle_layout() {
        let aisles = grocery_store_aisles();
        assert_eq!(aisles.len(), 4 * (13 + 13));
        assert!(aisles.contains(&Position::new(10, 10)));
        assert!(aisles.contains(&Position::new(40, 40)));
        assert!(!aisles.contains(&Position::new(10, 25)));
    }
}
