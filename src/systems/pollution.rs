use std::any::Any;

use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    grid::{Cell, CellType, Coord, Grid},
};

/// How far pollution spreads from its source, in Chebyshev rings.
pub const DIFFUSION_RADIUS: usize = 3;
pub const POWER_PLANT_EMISSION: u32 = 4;

/// Pollution a cell puts out at its own position.
pub fn emission(cell: &Cell) -> u32 {
    match cell.cell_type() {
        CellType::Industrial => cell.population(),
        CellType::PowerPlant => POWER_PLANT_EMISSION,
        _ => 0,
    }
}

/// Recomputes the pollution map from scratch.
///
/// Each source adds `emission - distance` to every cell within
/// [`DIFFUSION_RADIUS`], and contributions from different sources stack.
pub fn diffuse(grid: &Grid) -> Vec<u32> {
    let (width, height) = (grid.width(), grid.height());
    let mut levels = vec![0u32; grid.len()];

    for source in grid.cells() {
        let strength = emission(source);
        if strength == 0 {
            continue;
        }
        let origin = source.coord();
        let reach = DIFFUSION_RADIUS.min(strength as usize);
        let x_range = origin.x.saturating_sub(reach)..=(origin.x + reach).min(width - 1);
        for y in origin.y.saturating_sub(reach)..=(origin.y + reach).min(height - 1) {
            for x in x_range.clone() {
                let distance = origin.chebyshev(Coord::new(x, y)) as u32;
                levels[y * width + x] += strength.saturating_sub(distance);
            }
        }
    }

    levels
}

#[derive(Debug, Default)]
pub struct PollutionSystem {
    total: u64,
}

impl PollutionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}

impl System for PollutionSystem {
    fn name(&self) -> &'static str {
        "pollution"
    }

    fn run(&mut self, ctx: &SystemContext, grid: &mut Grid) -> Result<()> {
        let levels = diffuse(grid);
        for (cell, level) in grid.cells_mut().zip(levels) {
            cell.set_pollution(level);
        }
        self.total = grid.total_pollution();
        debug!(tick = ctx.tick, total = self.total, "pollution diffused");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
