use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    grid::{Grid, ZoneKind},
    systems::ResourceLedger,
};

/// Region totals recorded at a tick boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub tick: u64,
    pub residential: u64,
    pub commercial: u64,
    pub industrial: u64,
    pub pollution: u64,
    pub worker_utilization: f64,
    pub goods_utilization: f64,
    pub changed: bool,
}

impl StateSnapshot {
    pub fn capture(tick: u64, grid: &Grid, changed: bool) -> Self {
        let ledger = ResourceLedger::open(grid);
        Self {
            tick,
            residential: grid.total_population(ZoneKind::Residential),
            commercial: grid.total_population(ZoneKind::Commercial),
            industrial: grid.total_population(ZoneKind::Industrial),
            pollution: grid.total_pollution(),
            worker_utilization: ledger.worker_utilization(),
            goods_utilization: ledger.goods_utilization(),
            changed,
        }
    }

    pub fn population(&self, kind: ZoneKind) -> u64 {
        match kind {
            ZoneKind::Residential => self.residential,
            ZoneKind::Commercial => self.commercial,
            ZoneKind::Industrial => self.industrial,
        }
    }

    pub fn total_population(&self) -> u64 {
        self.residential + self.commercial + self.industrial
    }
}

/// Snapshots keyed by tick number. Tick 0 holds the state before the first tick.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: BTreeMap<u64, StateSnapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, snapshot: StateSnapshot) {
        self.entries.insert(snapshot.tick, snapshot);
    }

    pub fn get(&self, tick: u64) -> Option<&StateSnapshot> {
        self.entries.get(&tick)
    }

    pub fn latest(&self) -> Option<&StateSnapshot> {
        self.entries.values().next_back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateSnapshot> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Per-cell population and pollution, used to detect whether a tick changed anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFrame {
    population: Vec<u32>,
    pollution: Vec<u32>,
}

impl GridFrame {
    pub fn capture(grid: &Grid) -> Self {
        Self {
            population: grid.cells().map(|cell| cell.population()).collect(),
            pollution: grid.cells().map(|cell| cell.pollution()).collect(),
        }
    }

    pub fn matches(&self, grid: &Grid) -> bool {
        *self == Self::capture(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::Coord, layout::Layout};

    #[test]
    fn history_orders_by_tick() {
        let grid = Grid::new(&"R,P".parse::<Layout>().unwrap());
        let mut history = History::new();
        history.record(StateSnapshot::capture(2, &grid, true));
        history.record(StateSnapshot::capture(0, &grid, false));
        history.record(StateSnapshot::capture(1, &grid, true));
        let ticks: Vec<_> = history.iter().map(|s| s.tick).collect();
        assert_eq!(ticks, vec![0, 1, 2]);
        assert_eq!(history.latest().map(|s| s.tick), Some(2));
        assert!(history.get(5).is_none());
    }

    #[test]
    fn frame_notices_population_changes() {
        let mut grid = Grid::new(&"R,P".parse::<Layout>().unwrap());
        let frame = GridFrame::capture(&grid);
        assert!(frame.matches(&grid));
        grid.cell_mut(Coord::new(0, 0))
            .and_then(|cell| cell.zone_mut())
            .unwrap()
            .seed(1);
        assert!(!frame.matches(&grid));
    }
}
