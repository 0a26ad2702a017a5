//! Plain-text views of a grid for terminal output.

use std::fmt::Write;

use crate::grid::{Cell, Grid};

fn render_rows(grid: &Grid, glyph: impl Fn(&Cell) -> String) -> String {
    let mut out = String::new();
    let border = "-".repeat(grid.width() * 2 + 1);
    let _ = writeln!(out, "{border}");
    for y in 0..grid.height() {
        let Some(row) = grid.row(y) else {
            continue;
        };
        let line: Vec<String> = row.iter().map(&glyph).collect();
        let _ = writeln!(out, "|{}|", line.join(" "));
    }
    let _ = writeln!(out, "{border}");
    out
}

/// Layout symbols, with populated zones shown as their population.
pub fn render_grid(grid: &Grid) -> String {
    render_rows(grid, |cell| match cell.population() {
        0 => cell.cell_type().symbol().to_string(),
        population => population.to_string(),
    })
}

/// Pollution levels; levels above 9 are shown as `+`.
pub fn render_pollution(grid: &Grid) -> String {
    render_rows(grid, |cell| match cell.pollution() {
        0 => ".".to_string(),
        level @ 1..=9 => level.to_string(),
        _ => "+".to_string(),
    })
}

/// `*` for powered cells, `.` otherwise.
pub fn render_power(grid: &Grid) -> String {
    render_rows(grid, |cell| {
        let glyph = if cell.is_powered() { "*" } else { "." };
        glyph.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::Coord, layout::Layout};

    #[test]
    fn grid_shows_symbols_and_population() {
        let mut grid = Grid::new(&"R,T,P\n-,#,C".parse::<Layout>().unwrap());
        grid.cell_mut(Coord::new(0, 0))
            .and_then(|cell| cell.zone_mut())
            .unwrap()
            .seed(3);
        assert_eq!(render_grid(&grid), "-------\n|3 T P|\n|- # C|\n-------\n");
    }

    #[test]
    fn pollution_map_caps_wide_values() {
        let mut grid = Grid::new(&"P,-".parse::<Layout>().unwrap());
        grid.cell_mut(Coord::new(0, 0)).unwrap().set_pollution(12);
        assert_eq!(render_pollution(&grid), "-----\n|+ .|\n-----\n");
    }

    #[test]
    fn power_map_marks_powered_cells() {
        let mut grid = Grid::new(&"P,-".parse::<Layout>().unwrap());
        grid.cell_mut(Coord::new(0, 0)).unwrap().set_powered(true);
        assert_eq!(render_power(&grid), "-----\n|* .|\n-----\n");
    }
}
