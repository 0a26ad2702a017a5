use std::{fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::grid::CellType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout contains no cells")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    IrregularRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("layout has no power plant")]
    MissingPowerPlant,
    #[error("invalid cell symbol {token:?} at row {row}, column {column}")]
    InvalidSymbol {
        row: usize,
        column: usize,
        token: String,
    },
}

/// A validated rectangular table of cell types with at least one power plant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    width: usize,
    cells: Vec<CellType>,
}

impl Layout {
    pub fn from_rows(rows: Vec<Vec<CellType>>) -> Result<Self, LayoutError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(LayoutError::Empty);
        }
        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != width {
                return Err(LayoutError::IrregularRow {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
        }
        let cells: Vec<CellType> = rows.into_iter().flatten().collect();
        if !cells.contains(&CellType::PowerPlant) {
            return Err(LayoutError::MissingPowerPlant);
        }
        Ok(Self { width, cells })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read region layout {}", path.display()))?;
        let layout = data
            .parse()
            .with_context(|| format!("Invalid region layout in {}", path.display()))?;
        Ok(layout)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.cells.len() / self.width
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellType]> {
        self.cells.chunks(self.width)
    }
}

impl FromStr for Layout {
    type Err = LayoutError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let rows = text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(row, line)| parse_row(row, line))
            .collect::<Result<Vec<_>, _>>()?;
        Layout::from_rows(rows)
    }
}

fn parse_row(row: usize, line: &str) -> Result<Vec<CellType>, LayoutError> {
    if !line.contains(',') {
        return Ok(line.chars().map(CellType::from_symbol).collect());
    }
    line.split(',')
        .enumerate()
        .map(|(column, raw)| {
            // A blank-but-present token is an empty lot.
            if !raw.is_empty() && raw.trim().is_empty() {
                return Ok(CellType::Empty);
            }
            let token = raw.trim();
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(symbol), None) => Ok(CellType::from_symbol(symbol)),
                _ => Err(LayoutError::InvalidSymbol {
                    row,
                    column,
                    token: token.to_string(),
                }),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_rows() {
        let layout: Layout = "R,T,P\n-,-,-\nC,#,I\n".parse().unwrap();
        assert_eq!(layout.width(), 3);
        assert_eq!(layout.height(), 3);
        let last: Vec<_> = layout.rows().nth(2).unwrap().to_vec();
        assert_eq!(
            last,
            vec![CellType::Commercial, CellType::PowerlineRoad, CellType::Industrial]
        );
    }

    #[test]
    fn parses_compact_rows_and_skips_blank_lines() {
        let layout: Layout = "RTP\n\n---\r\n".parse().unwrap();
        assert_eq!((layout.width(), layout.height()), (3, 2));
    }

    #[test]
    fn compact_rows_keep_spaces_as_empty_cells() {
        let layout: Layout = "R P\nR P".parse().unwrap();
        assert_eq!((layout.width(), layout.height()), (3, 2));
        let row = layout.rows().next().unwrap();
        assert_eq!(
            row,
            &[CellType::Residential, CellType::Empty, CellType::PowerPlant][..]
        );
    }

    #[test]
    fn unknown_symbols_become_empty() {
        let layout: Layout = "x, ,P".parse().unwrap();
        let row = layout.rows().next().unwrap();
        assert_eq!(row[0], CellType::Empty);
        assert_eq!(row[1], CellType::Empty);
    }

    #[test]
    fn rejects_bad_layouts() {
        assert_eq!("".parse::<Layout>(), Err(LayoutError::Empty));
        assert_eq!("\n  \n".parse::<Layout>(), Err(LayoutError::Empty));
        assert_eq!(
            "R,R,P\nR,P".parse::<Layout>(),
            Err(LayoutError::IrregularRow {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!("R,-,C".parse::<Layout>(), Err(LayoutError::MissingPowerPlant));
        assert_eq!(
            "R,RR,P".parse::<Layout>(),
            Err(LayoutError::InvalidSymbol {
                row: 0,
                column: 1,
                token: "RR".into()
            })
        );
        assert!(matches!(
            "R,,P".parse::<Layout>(),
            Err(LayoutError::InvalidSymbol { column: 1, .. })
        ));
    }
}
