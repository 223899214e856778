use std::collections::{BTreeSet, HashSet, VecDeque};

use rand::Rng;

use crate::error::SolverError;

/// Lifecycle of one game instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BoardState {
    NotStarted,
    Ongoing,
    Won,
    Lost,
}

/// What the player (and therefore the solver) can see of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CellStatus {
    Unknown,
    Flagged,
    /// Opened and mine-free; carries the mine-adjacency count.
    Opened(u8),
}

/// The full board, mines included. The solver never sees this type; it only
/// receives the [`Snapshot`] view, which carries no hidden information.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    total_mines: usize,
    mined: Vec<bool>,
    opened: Vec<bool>,
    flagged: Vec<bool>,
    state: BoardState,
}

impl Board {
    /// Generates a board with `mines` mines placed uniformly at random.
    pub fn generate(
        width: usize,
        height: usize,
        mines: usize,
        rng: &mut impl Rng,
    ) -> Result<Self, SolverError> {
        Self::generate_with_exclusion(width, height, mines, &[], rng)
    }

    /// Generates a board guaranteeing that `first_click` and its neighbors
    /// are mine-free, so the opening move always cascades. Falls back to
    /// excluding only the clicked cell when the board is too dense.
    pub fn generate_safe(
        width: usize,
        height: usize,
        mines: usize,
        first_click: usize,
        rng: &mut impl Rng,
    ) -> Result<Self, SolverError> {
        let mut exclude: Vec<usize> = neighbor_ids(width, height, first_click);
        exclude.push(first_click);
        if width * height - exclude.len() < mines {
            exclude = vec![first_click];
        }
        Self::generate_with_exclusion(width, height, mines, &exclude, rng)
    }

    fn generate_with_exclusion(
        width: usize,
        height: usize,
        mines: usize,
        exclude: &[usize],
        rng: &mut impl Rng,
    ) -> Result<Self, SolverError> {
        let cells = width * height;
        let excluded: HashSet<usize> = exclude.iter().copied().collect();
        if width == 0 || height == 0 || mines == 0 || mines >= cells || mines > cells - excluded.len() {
            return Err(SolverError::InvalidBoard {
                width,
                height,
                mines,
            });
        }

        let mut mined = vec![false; cells];
        let mut remaining = mines;
        while remaining > 0 {
            let id = rng.random_range(0..cells);
            if !mined[id] && !excluded.contains(&id) {
                mined[id] = true;
                remaining -= 1;
            }
        }

        Ok(Board {
            width,
            height,
            total_mines: mines,
            mined,
            opened: vec![false; cells],
            flagged: vec![false; cells],
            state: BoardState::NotStarted,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn total_mines(&self) -> usize {
        self.total_mines
    }

    pub fn state(&self) -> BoardState {
        self.state
    }

    pub fn status(&self, id: usize) -> CellStatus {
        if self.opened[id] {
            CellStatus::Opened(self.adjacent_mines(id))
        } else if self.flagged[id] {
            CellStatus::Flagged
        } else {
            CellStatus::Unknown
        }
    }

    pub fn neighbors(&self, id: usize) -> Vec<usize> {
        neighbor_ids(self.width, self.height, id)
    }

    fn adjacent_mines(&self, id: usize) -> u8 {
        self.neighbors(id)
            .into_iter()
            .filter(|&n| self.mined[n])
            .count() as u8
    }

    /// Opens a cell. Opening a mine loses the game; opening a zero-count
    /// cell flood fills its neighborhood, matching classic rules.
    pub fn open(&mut self, id: usize) -> BoardState {
        if matches!(self.state, BoardState::Won | BoardState::Lost) {
            return self.state;
        }
        if self.opened[id] || self.flagged[id] {
            return self.state;
        }
        self.state = BoardState::Ongoing;

        if self.mined[id] {
            self.opened[id] = true;
            self.state = BoardState::Lost;
            return self.state;
        }

        // Flood fill outward from zero-count cells.
        let mut queue = VecDeque::from([id]);
        let mut visited = HashSet::from([id]);
        while let Some(cell) = queue.pop_front() {
            self.opened[cell] = true;
            self.flagged[cell] = false;
            if self.adjacent_mines(cell) == 0 {
                for neighbor in self.neighbors(cell) {
                    if !visited.contains(&neighbor) && !self.opened[neighbor] && !self.mined[neighbor] {
                        visited.insert(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        if self.is_cleared() {
            self.state = BoardState::Won;
        }
        self.state
    }

    /// Flags a cell as mined. No-op on opened cells.
    pub fn flag(&mut self, id: usize) {
        if !self.opened[id] {
            self.flagged[id] = true;
            self.state = BoardState::Ongoing;
        }
    }

    pub fn unflag(&mut self, id: usize) {
        self.flagged[id] = false;
    }

    fn is_cleared(&self) -> bool {
        self.mined
            .iter()
            .zip(&self.opened)
            .all(|(&mined, &opened)| mined || opened)
    }

    /// The immutable per-cycle view handed to the solver.
    pub fn snapshot(&self) -> Snapshot {
        let cells = (0..self.width * self.height)
            .map(|id| SnapshotCell {
                status: self.status(id),
                neighbors: self.neighbors(id),
            })
            .collect();
        Snapshot {
            cells,
            total_mines: self.total_mines,
            state: self.state,
        }
    }
}

/// One cell as seen by the solver: visible status plus adjacency.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SnapshotCell {
    pub status: CellStatus,
    pub neighbors: Vec<usize>,
}

/// An immutable view of the visible board state, taken once per decision
/// cycle. The solver is a pure function of this snapshot; all board mutation
/// happens between cycles.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    cells: Vec<SnapshotCell>,
    total_mines: usize,
    state: BoardState,
}

impl Snapshot {
    /// Builds a snapshot directly from cell views. Tests and non-rectangular
    /// board collaborators construct these by hand.
    pub fn new(cells: Vec<SnapshotCell>, total_mines: usize, state: BoardState) -> Self {
        Snapshot {
            cells,
            total_mines,
            state,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn state(&self) -> BoardState {
        self.state
    }

    pub fn total_mines(&self) -> usize {
        self.total_mines
    }

    pub fn status(&self, id: usize) -> CellStatus {
        self.cells[id].status
    }

    pub fn neighbors(&self, id: usize) -> &[usize] {
        &self.cells[id].neighbors
    }

    pub fn unknown_cells(&self) -> Vec<usize> {
        self.ids_with(|status| matches!(status, CellStatus::Unknown))
    }

    pub fn flagged_count(&self) -> usize {
        self.ids_with(|status| matches!(status, CellStatus::Flagged))
            .len()
    }

    /// Mines not yet accounted for by flags.
    pub fn mines_left(&self) -> i64 {
        self.total_mines as i64 - self.flagged_count() as i64
    }

    /// Opened cells adjacent to at least one unknown cell. Each contributes
    /// one local constraint.
    pub fn boundary_cells(&self) -> Vec<usize> {
        self.ids_with(|status| matches!(status, CellStatus::Opened(_)))
            .into_iter()
            .filter(|&id| {
                self.neighbors(id)
                    .iter()
                    .any(|&n| matches!(self.status(n), CellStatus::Unknown))
            })
            .collect()
    }

    /// Unknown cells adjacent to at least one opened cell; the variables
    /// local constraints can say something about.
    pub fn exposed_cells(&self) -> BTreeSet<usize> {
        self.unknown_cells()
            .into_iter()
            .filter(|&id| {
                self.neighbors(id)
                    .iter()
                    .any(|&n| matches!(self.status(n), CellStatus::Opened(_)))
            })
            .collect()
    }

    /// Unknown cells with no opened neighbor; local deduction cannot tell
    /// them apart, only the global mine budget constrains them.
    pub fn floating_cells(&self) -> Vec<usize> {
        let exposed = self.exposed_cells();
        self.unknown_cells()
            .into_iter()
            .filter(|id| !exposed.contains(id))
            .collect()
    }

    pub fn opened_neighbor_count(&self, id: usize) -> usize {
        self.neighbors(id)
            .iter()
            .filter(|&&n| matches!(self.status(n), CellStatus::Opened(_)))
            .count()
    }

    fn ids_with(&self, predicate: impl Fn(CellStatus) -> bool) -> Vec<usize> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| predicate(cell.status))
            .map(|(id, _)| id)
            .collect()
    }
}

/// Valid neighbor IDs for a cell on a `width` x `height` grid, diagonals
/// included, edges and corners handled.
pub fn neighbor_ids(width: usize, height: usize, id: usize) -> Vec<usize> {
    let x = (id % width) as isize;
    let y = (id / width) as isize;
    let mut out = Vec::with_capacity(8);
    for dy in -1..=1 {
        for dx in -1..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x + dx;
            let ny = y + dy;
            if nx >= 0 && nx < width as isize && ny >= 0 && ny < height as isize {
                out.push(ny as usize * width + nx as usize);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn neighbor_counts_match_position() {
        // Corner, edge, center of a 3x3 grid.
        assert_eq!(neighbor_ids(3, 3, 0).len(), 3);
        assert_eq!(neighbor_ids(3, 3, 1).len(), 5);
        assert_eq!(neighbor_ids(3, 3, 4).len(), 8);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(matches!(
            Board::generate(0, 3, 1, &mut rng),
            Err(SolverError::InvalidBoard { .. })
        ));
        assert!(matches!(
            Board::generate(3, 3, 0, &mut rng),
            Err(SolverError::InvalidBoard { .. })
        ));
        // A board must keep at least one mine-free cell.
        assert!(matches!(
            Board::generate(3, 3, 9, &mut rng),
            Err(SolverError::InvalidBoard { .. })
        ));
        assert!(Board::generate(3, 3, 8, &mut rng).is_ok());
    }

    #[test]
    fn generate_places_exact_mine_count() {
        let mut rng = SmallRng::seed_from_u64(7);
        let board = Board::generate(8, 8, 10, &mut rng).unwrap();
        assert_eq!(board.mined.iter().filter(|&&m| m).count(), 10);
        assert_eq!(board.state(), BoardState::NotStarted);
    }

    #[test]
    fn first_click_zone_is_mine_free() {
        let mut rng = SmallRng::seed_from_u64(11);
        for _ in 0..20 {
            let board = Board::generate_safe(5, 5, 10, 12, &mut rng).unwrap();
            assert!(!board.mined[12]);
            for n in board.neighbors(12) {
                assert!(!board.mined[n]);
            }
        }
    }

    #[test]
    fn opening_a_mine_loses() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut board = Board::generate(4, 4, 4, &mut rng).unwrap();
        let mine = board.mined.iter().position(|&m| m).unwrap();
        assert_eq!(board.open(mine), BoardState::Lost);
    }

    #[test]
    fn zero_count_cells_flood_fill() {
        // One mine in the corner of a 4x4 board; opening the far corner
        // must cascade across everything not adjacent to the mine.
        let mut board = Board {
            width: 4,
            height: 4,
            total_mines: 1,
            mined: {
                let mut m = vec![false; 16];
                m[0] = true;
                m
            },
            opened: vec![false; 16],
            flagged: vec![false; 16],
            state: BoardState::NotStarted,
        };
        assert_eq!(board.open(15), BoardState::Won);
        assert!(!board.opened[0]);
        assert!(board.opened[15]);
        assert!(board.opened[2]);
    }

    #[test]
    fn snapshot_classifies_cells() {
        let mut board = Board {
            width: 3,
            height: 3,
            total_mines: 1,
            mined: {
                let mut m = vec![false; 9];
                m[8] = true;
                m
            },
            opened: vec![false; 9],
            flagged: vec![false; 9],
            state: BoardState::NotStarted,
        };
        board.open(0);
        let snap = board.snapshot();
        // Opening the zero corner cascades until cells adjacent to the mine.
        assert!(snap.boundary_cells().contains(&4));
        assert_eq!(snap.unknown_cells(), vec![8]);
        assert!(snap.exposed_cells().contains(&8));
        assert!(snap.floating_cells().is_empty());
        assert_eq!(snap.mines_left(), 1);
    }

    #[test]
    fn snapshot_round_trips_through_serde() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut board = Board::generate_safe(5, 5, 4, 12, &mut rng).unwrap();
        board.open(12);
        let snap = board.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
