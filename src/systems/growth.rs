//! Zone growth eligibility.
//!
//! Each zone kind carries a table of rules indexed by its current population.
//! A rule is satisfied when enough same-kind neighbors reach a population
//! threshold, or, for the first level only, when the zone sits next to power
//! infrastructure. Evaluation reads the grid and never mutates it.

use serde::Serialize;

use crate::grid::{Coord, Grid, ZoneKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrowthRule {
    pub min_neighbor_population: u32,
    pub min_neighbors: u32,
    pub adjacent_power_suffices: bool,
}

impl GrowthRule {
    const fn new(min_neighbor_population: u32, min_neighbors: u32) -> Self {
        Self {
            min_neighbor_population,
            min_neighbors,
            adjacent_power_suffices: false,
        }
    }

    const fn founding() -> Self {
        Self {
            min_neighbor_population: 1,
            min_neighbors: 1,
            adjacent_power_suffices: true,
        }
    }

    pub fn is_satisfied(&self, neighborhood: &Neighborhood) -> bool {
        (self.adjacent_power_suffices && neighborhood.adjacent_power)
            || neighborhood.at_least(self.min_neighbor_population) >= self.min_neighbors
    }
}

static RESIDENTIAL_RULES: [GrowthRule; 5] = [
    GrowthRule::founding(),
    GrowthRule::new(1, 2),
    GrowthRule::new(2, 4),
    GrowthRule::new(3, 6),
    GrowthRule::new(4, 8),
];

static BUSINESS_RULES: [GrowthRule; 3] = [
    GrowthRule::founding(),
    GrowthRule::new(1, 2),
    GrowthRule::new(2, 4),
];

/// The rule governing growth from `population` to `population + 1`, if any.
pub fn rule_for(kind: ZoneKind, population: u32) -> Option<&'static GrowthRule> {
    let table: &'static [GrowthRule] = match kind {
        ZoneKind::Residential => &RESIDENTIAL_RULES,
        ZoneKind::Commercial | ZoneKind::Industrial => &BUSINESS_RULES,
    };
    table.get(population as usize)
}

/// Same-kind neighbor populations around a zone, plus the adjacent-power flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    populations: Vec<u32>,
    adjacent_power: bool,
}

impl Neighborhood {
    pub fn survey(grid: &Grid, coord: Coord, kind: ZoneKind) -> Self {
        let populations = grid
            .neighbors(coord)
            .filter_map(|n| grid.cell(n))
            .filter(|cell| cell.zone_kind() == Some(kind))
            .map(|cell| cell.population())
            .collect();
        Self {
            populations,
            adjacent_power: grid.has_adjacent_power(coord),
        }
    }

    /// Same-kind neighbors whose population is at least `threshold`.
    pub fn at_least(&self, threshold: u32) -> u32 {
        self.populations.iter().filter(|&&p| p >= threshold).count() as u32
    }

    pub fn populated(&self) -> u32 {
        self.at_least(1)
    }

    pub fn has_adjacent_power(&self) -> bool {
        self.adjacent_power
    }
}

/// Whether a zone of `kind` at `population` may advance one level.
pub fn is_eligible(kind: ZoneKind, population: u32, neighborhood: &Neighborhood) -> bool {
    if population >= kind.cap() {
        return false;
    }
    // Residential zones stay dormant until power or neighbors reach them.
    if kind == ZoneKind::Residential
        && !neighborhood.has_adjacent_power()
        && neighborhood.populated() == 0
    {
        return false;
    }
    rule_for(kind, population).is_some_and(|rule| rule.is_satisfied(neighborhood))
}

/// A zone eligible to advance one level, pending resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub coord: Coord,
    pub kind: ZoneKind,
    pub population: u32,
    pub populated_neighbors: u32,
}

/// Eligible zones of `kind`, in row-major scan order.
pub fn collect_candidates(grid: &Grid, kind: ZoneKind) -> Vec<Candidate> {
    grid.zones(kind)
        .filter_map(|cell| {
            let coord = cell.coord();
            let population = cell.population();
            let neighborhood = Neighborhood::survey(grid, coord, kind);
            is_eligible(kind, population, &neighborhood).then(|| Candidate {
                coord,
                kind,
                population,
                populated_neighbors: neighborhood.populated(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;

    fn neighborhood(populations: &[u32], adjacent_power: bool) -> Neighborhood {
        Neighborhood {
            populations: populations.to_vec(),
            adjacent_power,
        }
    }

    #[test]
    fn first_level_needs_power_or_a_populated_neighbor() {
        for kind in ZoneKind::ALL {
            assert!(is_eligible(kind, 0, &neighborhood(&[], true)));
            assert!(is_eligible(kind, 0, &neighborhood(&[1], false)));
            assert!(!is_eligible(kind, 0, &neighborhood(&[0, 0], false)));
        }
    }

    #[test]
    fn higher_levels_ignore_power() {
        let powered = neighborhood(&[1], true);
        assert!(!is_eligible(ZoneKind::Commercial, 1, &powered));
        assert!(is_eligible(ZoneKind::Commercial, 1, &neighborhood(&[1, 3], false)));
        assert!(!is_eligible(ZoneKind::Industrial, 2, &neighborhood(&[2, 2, 2, 1], true)));
        assert!(is_eligible(ZoneKind::Industrial, 2, &neighborhood(&[2, 2, 2, 3], false)));
    }

    #[test]
    fn residential_ladder_runs_to_five() {
        let full = neighborhood(&[5; 8], false);
        for population in 0..5 {
            assert!(is_eligible(ZoneKind::Residential, population, &full));
        }
        assert!(!is_eligible(ZoneKind::Residential, 5, &full));
        assert!(!is_eligible(ZoneKind::Residential, 3, &neighborhood(&[3; 5], true)));
        assert!(!is_eligible(ZoneKind::Residential, 4, &neighborhood(&[4; 7], true)));
    }

    #[test]
    fn business_zones_stop_at_three() {
        let full = neighborhood(&[3; 8], true);
        assert!(!is_eligible(ZoneKind::Commercial, 3, &full));
        assert!(!is_eligible(ZoneKind::Industrial, 3, &full));
        assert!(rule_for(ZoneKind::Industrial, 3).is_none());
    }

    #[test]
    fn survey_counts_only_same_kind() {
        let mut grid = Grid::new(&"R,C,P\nR,R,I".parse::<Layout>().unwrap());
        for (x, y) in [(1, 0), (0, 1), (2, 1)] {
            grid.cell_mut(Coord::new(x, y))
                .and_then(|cell| cell.zone_mut())
                .unwrap()
                .seed(2);
        }
        let survey = Neighborhood::survey(&grid, Coord::new(1, 1), ZoneKind::Residential);
        assert_eq!(survey.populated(), 1);
        assert_eq!(survey.at_least(0), 2);
        assert!(survey.has_adjacent_power());
    }

    #[test]
    fn candidates_come_out_in_scan_order() {
        let grid = Grid::new(&"R,T,R\nR,P,R\nC,-,-\n-,-,I".parse::<Layout>().unwrap());
        let coords: Vec<_> = collect_candidates(&grid, ZoneKind::Residential)
            .into_iter()
            .map(|c| (c.coord.x, c.coord.y))
            .collect();
        assert_eq!(coords, vec![(0, 0), (2, 0), (0, 1), (2, 1)]);
        assert_eq!(collect_candidates(&grid, ZoneKind::Commercial).len(), 1);
        assert!(collect_candidates(&grid, ZoneKind::Industrial).is_empty());
    }
}
