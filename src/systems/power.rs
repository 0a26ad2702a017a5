use std::{any::Any, collections::VecDeque};

use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    grid::Grid,
};

/// Marks every cell reachable from a power plant through conductive cells.
///
/// Breadth-first search seeded from all plants at once; each cell is enqueued at
/// most once. Non-conductive cells are never marked, even when adjacent to the
/// network.
pub fn flood_fill(grid: &Grid) -> Vec<bool> {
    let mut powered = vec![false; grid.len()];
    let mut queue = VecDeque::new();

    for plant in grid.power_plants() {
        if let Some(idx) = grid.index(plant) {
            powered[idx] = true;
            queue.push_back(plant);
        }
    }

    while let Some(current) = queue.pop_front() {
        for next in grid.neighbors(current) {
            let Some(idx) = grid.index(next) else {
                continue;
            };
            if powered[idx] {
                continue;
            }
            if grid.cell(next).is_some_and(|cell| cell.is_conductive()) {
                powered[idx] = true;
                queue.push_back(next);
            }
        }
    }

    powered
}

#[derive(Debug, Default)]
pub struct PowerSystem {
    powered_cells: usize,
}

impl PowerSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells powered by the most recent run.
    pub fn powered_cells(&self) -> usize {
        self.powered_cells
    }
}

impl System for PowerSystem {
    fn name(&self) -> &'static str {
        "power"
    }

    fn run(&mut self, ctx: &SystemContext, grid: &mut Grid) -> Result<()> {
        let map = flood_fill(grid);
        for (cell, powered) in grid.cells_mut().zip(map) {
            cell.set_powered(powered);
        }
        self.powered_cells = grid.powered_count();
        debug!(tick = ctx.tick, powered = self.powered_cells, "power propagated");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::Coord, layout::Layout};

    fn grid(text: &str) -> Grid {
        Grid::new(&text.parse::<Layout>().unwrap())
    }

    fn powered_at(grid: &Grid, map: &[bool], x: usize, y: usize) -> bool {
        map[grid.index(Coord::new(x, y)).unwrap()]
    }

    #[test]
    fn power_follows_lines_but_not_roads() {
        let grid = grid("P,T,T,-,T\n-,-,-,-,-");
        let map = flood_fill(&grid);
        assert!(powered_at(&grid, &map, 0, 0));
        assert!(powered_at(&grid, &map, 2, 0));
        assert!(!powered_at(&grid, &map, 3, 0));
        assert!(!powered_at(&grid, &map, 4, 0));
        assert!(!powered_at(&grid, &map, 1, 1));
    }

    #[test]
    fn diagonal_links_conduct() {
        let grid = grid("P,-,-\n-,#,-\n-,-,T");
        let map = flood_fill(&grid);
        assert!(powered_at(&grid, &map, 2, 2));
    }

    #[test]
    fn empty_zones_block_and_populated_zones_relay() {
        let mut grid = grid("P,R,T");
        assert!(!powered_at(&grid, &flood_fill(&grid), 2, 0));

        grid.cell_mut(Coord::new(1, 0))
            .and_then(|cell| cell.zone_mut())
            .unwrap()
            .seed(1);
        let map = flood_fill(&grid);
        assert!(powered_at(&grid, &map, 1, 0));
        assert!(powered_at(&grid, &map, 2, 0));
    }

    #[test]
    fn system_writes_flags_onto_grid() {
        let mut grid = grid("P,T\nR,-");
        let mut system = PowerSystem::new();
        system.run(&SystemContext { tick: 1 }, &mut grid).unwrap();
        assert_eq!(system.powered_cells(), 2);
        assert!(grid.cell(Coord::new(1, 0)).unwrap().is_powered());
        assert!(!grid.cell(Coord::new(0, 1)).unwrap().is_powered());
    }
}
