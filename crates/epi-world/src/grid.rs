//! 2D grid for the epidemic.

use epi_core::{Cell, CellState, Error, InfectionRate, Result, SirCounts, RECOVERY_TIME};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A bounded square grid of cells (no wrapping at the edges)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

/// Unchecked wire form; validated through [`Grid::from_cells`]
#[derive(Deserialize)]
struct RawGrid {
    size: usize,
    cells: Vec<Cell>,
}

impl TryFrom<RawGrid> for Grid {
    type Error = Error;

    fn try_from(raw: RawGrid) -> Result<Self> {
        Grid::from_cells(raw.size, raw.cells)
    }
}

impl Grid {
    /// Create a `size × size` grid with a single infected cell at the center
    pub fn new(size: usize) -> Self {
        let mut cells = vec![Cell::Susceptible; size * size];
        if let Some(center) = cells.get_mut(size * size / 2) {
            *center = Cell::infected();
        }
        Self { size, cells }
    }

    /// Build a grid from explicit cells; `cells.len()` must equal `size * size`
    pub fn from_cells(size: usize, cells: Vec<Cell>) -> Result<Self> {
        if cells.len() != size * size {
            return Err(Error::Validation(format!(
                "grid of size {} needs {} cells, got {}",
                size,
                size * size,
                cells.len()
            )));
        }
        Ok(Self { size, cells })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index of the initially infected cell
    pub fn center_index(&self) -> usize {
        self.cells.len() / 2
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    pub fn get_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.index_of(row, col).and_then(|i| self.cells.get(i))
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn index_of(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.size && col < self.size).then(|| row * self.size + col)
    }

    /// Get (row, col) from index
    pub fn position_of(&self, index: usize) -> Option<(usize, usize)> {
        (index < self.cells.len()).then(|| (index / self.size, index % self.size))
    }

    /// Orthogonal in-bounds neighbors, ordered up, down, left, right
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        let Some((row, col)) = self.position_of(index) else {
            return Vec::new();
        };

        let mut neighbors = Vec::with_capacity(4);
        if row > 0 {
            neighbors.push(index - self.size);
        }
        if row + 1 < self.size {
            neighbors.push(index + self.size);
        }
        if col > 0 {
            neighbors.push(index - 1);
        }
        if col + 1 < self.size {
            neighbors.push(index + 1);
        }
        neighbors
    }

    fn has_infected_neighbor(&self, index: usize) -> bool {
        self.neighbors(index)
            .into_iter()
            .any(|n| self.cells[n].is_infected())
    }

    /// Compute the next generation.
    ///
    /// Every transition reads from `self` only, so an infection spreads at
    /// most one cell per step regardless of iteration order.
    pub fn step<R: Rng + ?Sized>(&self, rate: InfectionRate, rng: &mut R) -> Grid {
        let cells = self
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| match *cell {
                Cell::Susceptible => {
                    if self.has_infected_neighbor(i) && rng.gen::<f64>() < rate.value() {
                        Cell::infected()
                    } else {
                        Cell::Susceptible
                    }
                }
                Cell::Infected { age } => {
                    let age = age + 1;
                    if age >= RECOVERY_TIME {
                        Cell::Recovered
                    } else {
                        Cell::Infected { age }
                    }
                }
                Cell::Recovered => Cell::Recovered,
            })
            .collect();

        Grid {
            size: self.size,
            cells,
        }
    }

    /// True when no cell is infected
    pub fn is_extinct(&self) -> bool {
        !self.cells.iter().any(Cell::is_infected)
    }

    pub fn counts(&self) -> SirCounts {
        SirCounts::from_states(self.cells.iter().map(Cell::state))
    }

    /// Per-cell labels, indexed like the grid
    pub fn labels(&self) -> Vec<CellState> {
        self.cells.iter().map(Cell::state).collect()
    }

    /// Iterator over all cells with their index
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Cell)> + '_ {
        self.cells.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(20);
        assert_eq!(grid.size(), 20);
        assert_eq!(grid.len(), 400);
        assert_eq!(grid.center_index(), 200);
        assert_eq!(grid.get(200), Some(&Cell::Infected { age: 1 }));
        assert_eq!(grid.get_at(10, 0), Some(&Cell::Infected { age: 1 }));

        let counts = grid.counts();
        assert_eq!(counts.susceptible, 399);
        assert_eq!(counts.infected, 1);
        assert_eq!(counts.recovered, 0);
    }

    #[test]
    fn test_odd_grid_center() {
        let grid = Grid::new(5);
        assert_eq!(grid.center_index(), 12);
        assert_eq!(grid.get_at(2, 2), Some(&Cell::infected()));
    }

    #[test]
    fn test_empty_grid_is_extinct() {
        let grid = Grid::new(0);
        assert!(grid.is_empty());
        assert!(grid.is_extinct());
        assert!(grid.neighbors(0).is_empty());
    }

    #[test]
    fn test_addressing() {
        let grid = Grid::new(20);
        assert_eq!(grid.index_of(10, 10), Some(210));
        assert_eq!(grid.position_of(210), Some((10, 10)));
        assert_eq!(grid.index_of(20, 0), None);
        assert_eq!(grid.position_of(400), None);
    }

    #[test]
    fn test_neighbors() {
        let grid = Grid::new(20);
        assert_eq!(grid.neighbors(210), vec![190, 230, 209, 211]);
        assert_eq!(grid.neighbors(200), vec![180, 220, 201]);
        assert_eq!(grid.neighbors(0), vec![20, 1]);
        assert_eq!(grid.neighbors(399), vec![379, 398]);
        assert_eq!(grid.neighbors(5).len(), 3);
        assert_eq!(grid.neighbors(40).len(), 3);
    }

    #[test]
    fn test_certain_infection_reaches_seed_neighbors() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let grid = Grid::new(20);
        let next = grid.step(InfectionRate::CERTAIN, &mut rng);

        // The seed sits on the left edge, so it has three neighbors.
        for i in [180, 201, 220] {
            assert_eq!(next.get(i), Some(&Cell::Infected { age: 1 }), "cell {}", i);
        }
        assert_eq!(next.get(200), Some(&Cell::Infected { age: 2 }));
        assert_eq!(next.get(199), Some(&Cell::Susceptible));
        assert_eq!(next.counts().infected, 4);
    }

    #[test]
    fn test_spread_reads_previous_snapshot() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut grid = Grid::new(20);
        for _ in 0..3 {
            grid = grid.step(InfectionRate::CERTAIN, &mut rng);
        }

        // After k certain steps the infection covers exactly the diamond of
        // radius k around the seed, clipped at the grid edge.
        let (cr, cc) = (10i64, 0i64);
        for (i, cell) in grid.iter() {
            let (r, c) = grid.position_of(i).unwrap();
            let dist = (r as i64 - cr).abs() + (c as i64 - cc).abs();
            assert_eq!(cell.is_infected(), dist <= 3, "cell ({}, {})", r, c);
        }
    }

    #[test]
    fn test_zero_rate_never_spreads() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut grid = Grid::new(20);
        let mut steps = 0;
        while !grid.is_extinct() {
            grid = grid.step(InfectionRate::ZERO, &mut rng);
            steps += 1;
            assert!(steps <= RECOVERY_TIME);
            assert!(grid.counts().infected <= 1);
        }

        assert_eq!(steps, RECOVERY_TIME - 1);
        assert_eq!(grid.get(200), Some(&Cell::Recovered));
        assert_eq!(grid.counts().recovered, 1);
        assert_eq!(grid.counts().susceptible, 399);
    }

    #[test]
    fn test_infection_lifetime() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut grid = Grid::new(3);
        let center = grid.center_index();

        for expected_age in 2..RECOVERY_TIME {
            grid = grid.step(InfectionRate::ZERO, &mut rng);
            assert_eq!(grid.get(center).map(Cell::infection_age), Some(expected_age));
        }

        grid = grid.step(InfectionRate::ZERO, &mut rng);
        assert_eq!(grid.get(center), Some(&Cell::Recovered));
        assert_eq!(grid.get(center).map(Cell::infection_age), Some(0));
    }

    #[test]
    fn test_recovered_is_terminal() {
        let mut cells = vec![Cell::Infected { age: 3 }; 9];
        cells[4] = Cell::Recovered;
        let grid = Grid::from_cells(3, cells).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let next = grid.step(InfectionRate::CERTAIN, &mut rng);
        assert_eq!(next.get(4), Some(&Cell::Recovered));
    }

    #[test]
    fn test_from_cells_rejects_bad_length() {
        assert!(matches!(
            Grid::from_cells(3, vec![Cell::Susceptible; 8]),
            Err(Error::Validation(_))
        ));
        assert!(Grid::from_cells(2, vec![Cell::Susceptible; 4]).is_ok());
    }

    #[test]
    fn test_deserialize_checks_cell_count() {
        let json = serde_json::to_string(&Grid::new(3)).unwrap();
        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Grid::new(3));

        let short = r#"{"size":3,"cells":["Susceptible","Susceptible","Susceptible","Susceptible"]}"#;
        assert!(serde_json::from_str::<Grid>(short).is_err());
    }

    #[test]
    fn test_labels_follow_index() {
        let grid = Grid::new(4);
        let labels = grid.labels();
        assert_eq!(labels.len(), 16);
        assert_eq!(labels[8], CellState::Infected);
        assert_eq!(labels.iter().filter(|s| **s == CellState::Infected).count(), 1);
    }

    proptest! {
        #[test]
        fn prop_initial_grid_has_single_infected(size in 1usize..40) {
            let grid = Grid::new(size);
            let counts = grid.counts();
            prop_assert_eq!(counts.infected, 1);
            prop_assert_eq!(counts.susceptible, size * size - 1);
            prop_assert_eq!(counts.recovered, 0);
            prop_assert!(grid.get(size * size / 2).unwrap().is_infected());
        }

        #[test]
        fn prop_neighbor_counts(size in 2usize..30, row in 0usize..30, col in 0usize..30) {
            prop_assume!(row < size && col < size);
            let grid = Grid::new(size);
            let index = grid.index_of(row, col).unwrap();
            let on_row_edge = row == 0 || row == size - 1;
            let on_col_edge = col == 0 || col == size - 1;
            let expected = match (on_row_edge, on_col_edge) {
                (true, true) => 2,
                (true, false) | (false, true) => 3,
                (false, false) => 4,
            };
            prop_assert_eq!(grid.neighbors(index).len(), expected);
        }

        #[test]
        fn prop_conservation_and_monotone_recovery(
            size in 1usize..25,
            rate in 0.0f64..=1.0,
            seed in any::<u64>(),
            steps in 1usize..30,
        ) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let rate = InfectionRate::new(rate).unwrap();
            let mut grid = Grid::new(size);

            for _ in 0..steps {
                let next = grid.step(rate, &mut rng);
                prop_assert_eq!(next.counts().total(), size * size);
                for (i, cell) in grid.iter() {
                    if *cell == Cell::Recovered {
                        prop_assert_eq!(next.get(i), Some(&Cell::Recovered));
                    }
                }
                grid = next;
            }
        }
    }
}
