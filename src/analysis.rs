//! Read-only queries over a region between ticks.

use serde::Serialize;

use crate::{
    engine::{Region, RunState},
    grid::{Coord, ZoneKind},
    snapshot::StateSnapshot,
    systems::{flood_fill, ResourceLedger},
};

/// Pollution at or above this level counts as harmful to residents.
pub const RESIDENTIAL_EXPOSURE_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaReport {
    pub top_left: Coord,
    pub bottom_right: Coord,
    pub cells: usize,
    pub residential: u64,
    pub commercial: u64,
    pub industrial: u64,
    pub total_pollution: u64,
    pub average_pollution: f64,
    pub zone_cells: usize,
    pub powered_zone_cells: usize,
    pub power_coverage: f64,
}

impl AreaReport {
    pub fn total_population(&self) -> u64 {
        self.residential + self.commercial + self.industrial
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutionImpact {
    pub peak: Option<(Coord, u32)>,
    pub affected_cells: usize,
    pub affected_share: f64,
    pub exposed_residential: Vec<Coord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StateViolation {
    WorkersOverCommitted { committed: u64, available: u64 },
    GoodsOverConsumed { consumed: u64, produced: u64 },
    PopulationAboveCap { coord: Coord, population: u32 },
    UnpoweredZone { coord: Coord },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub name: String,
    pub tick: u64,
    pub state: RunState,
    pub residential: u64,
    pub commercial: u64,
    pub industrial: u64,
    pub total_population: u64,
    pub total_pollution: u64,
    pub average_pollution: f64,
    pub powered_cells: usize,
    pub power_coverage: f64,
    pub ledger: ResourceLedger,
    pub worker_utilization: f64,
    pub goods_utilization: f64,
    pub area: Option<AreaReport>,
}

fn share(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn clamp_axis(a: i64, b: i64, len: usize) -> (usize, usize) {
    let max = len.saturating_sub(1) as i64;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (lo.clamp(0, max) as usize, hi.clamp(0, max) as usize)
}

impl Region {
    pub fn total_population(&self, kind: ZoneKind) -> u64 {
        self.grid().total_population(kind)
    }

    pub fn overall_population(&self) -> u64 {
        ZoneKind::ALL
            .iter()
            .map(|&kind| self.total_population(kind))
            .sum()
    }

    pub fn total_pollution(&self) -> u64 {
        self.grid().total_pollution()
    }

    pub fn average_pollution(&self) -> f64 {
        self.total_pollution() as f64 / self.grid().len() as f64
    }

    pub fn pollution_at(&self, x: usize, y: usize) -> Option<u32> {
        self.grid().cell(Coord::new(x, y)).map(|cell| cell.pollution())
    }

    /// Most polluted cell; ties go to the first in row-major order.
    pub fn highest_pollution(&self) -> Option<(Coord, u32)> {
        self.grid()
            .cells()
            .filter(|cell| cell.pollution() > 0)
            .fold(None, |best: Option<(Coord, u32)>, cell| match best {
                Some((_, level)) if level >= cell.pollution() => best,
                _ => Some((cell.coord(), cell.pollution())),
            })
    }

    pub fn has_power_at(&self, x: usize, y: usize) -> bool {
        self.grid()
            .cell(Coord::new(x, y))
            .is_some_and(|cell| cell.is_powered())
    }

    pub fn powered_cell_count(&self) -> usize {
        self.grid().powered_count()
    }

    /// Powered zone cells over all zone cells.
    pub fn power_coverage(&self) -> f64 {
        let zones: Vec<_> = self.grid().cells().filter(|c| c.zone().is_some()).collect();
        share(zones.iter().filter(|c| c.is_powered()).count(), zones.len())
    }

    /// Average population per zone cell of `kind`.
    pub fn density(&self, kind: ZoneKind) -> f64 {
        let zones = self.grid().zone_count(kind);
        if zones == 0 {
            0.0
        } else {
            self.total_population(kind) as f64 / zones as f64
        }
    }

    /// Share of zone cells that are of `kind`.
    pub fn zone_ratio(&self, kind: ZoneKind) -> f64 {
        let all: usize = ZoneKind::ALL.iter().map(|&k| self.grid().zone_count(k)).sum();
        share(self.grid().zone_count(kind), all)
    }

    pub fn ledger(&self) -> ResourceLedger {
        ResourceLedger::open(self.grid())
    }

    pub fn worker_utilization(&self) -> f64 {
        self.ledger().worker_utilization()
    }

    pub fn goods_utilization(&self) -> f64 {
        self.ledger().goods_utilization()
    }

    pub fn available_workers(&self) -> u64 {
        self.ledger().available_workers()
    }

    pub fn available_goods(&self) -> u64 {
        self.ledger().available_goods()
    }

    /// Percent change in `kind` population over the last `ticks` ticks.
    ///
    /// `None` when the window reaches before the first recorded tick.
    pub fn growth_rate(&self, kind: ZoneKind, ticks: u64) -> Option<f64> {
        self.growth_between(ticks, |snapshot| snapshot.population(kind))
    }

    pub fn overall_growth_rate(&self, ticks: u64) -> Option<f64> {
        self.growth_between(ticks, |snapshot| snapshot.total_population())
    }

    fn growth_between(
        &self,
        ticks: u64,
        value: impl Fn(&StateSnapshot) -> u64,
    ) -> Option<f64> {
        if ticks == 0 || ticks > self.current_tick() {
            return None;
        }
        let now = self.history().get(self.current_tick())?;
        let past = self.history().get(self.current_tick() - ticks)?;
        let (now, past) = (value(now), value(past));
        if past == 0 {
            return Some(0.0);
        }
        Some((now as f64 - past as f64) / past as f64 * 100.0)
    }

    /// Aggregates over the rectangle spanned by two corners. Corners may be
    /// given in either order and are clamped to the grid.
    pub fn analyze_area(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> AreaReport {
        let grid = self.grid();
        let (left, right) = clamp_axis(x1, x2, grid.width());
        let (top, bottom) = clamp_axis(y1, y2, grid.height());

        let mut report = AreaReport {
            top_left: Coord::new(left, top),
            bottom_right: Coord::new(right, bottom),
            cells: 0,
            residential: 0,
            commercial: 0,
            industrial: 0,
            total_pollution: 0,
            average_pollution: 0.0,
            zone_cells: 0,
            powered_zone_cells: 0,
            power_coverage: 0.0,
        };
        for y in top..=bottom {
            for x in left..=right {
                let Some(cell) = grid.cell(Coord::new(x, y)) else {
                    continue;
                };
                report.cells += 1;
                report.total_pollution += u64::from(cell.pollution());
                let Some(kind) = cell.zone_kind() else {
                    continue;
                };
                report.zone_cells += 1;
                if cell.is_powered() {
                    report.powered_zone_cells += 1;
                }
                let population = u64::from(cell.population());
                match kind {
                    ZoneKind::Residential => report.residential += population,
                    ZoneKind::Commercial => report.commercial += population,
                    ZoneKind::Industrial => report.industrial += population,
                }
            }
        }
        if report.cells > 0 {
            report.average_pollution = report.total_pollution as f64 / report.cells as f64;
        }
        report.power_coverage = share(report.powered_zone_cells, report.zone_cells);
        report
    }

    pub fn pollution_impact(&self) -> PollutionImpact {
        let grid = self.grid();
        let affected_cells = grid.cells().filter(|cell| cell.pollution() > 0).count();
        let exposed_residential = grid
            .zones(ZoneKind::Residential)
            .filter(|cell| cell.pollution() >= RESIDENTIAL_EXPOSURE_THRESHOLD)
            .map(|cell| cell.coord())
            .collect();
        PollutionImpact {
            peak: self.highest_pollution(),
            affected_cells,
            affected_share: share(affected_cells, grid.len()),
            exposed_residential,
        }
    }

    /// Checks resource balance, caps and power reach. Empty means consistent.
    ///
    /// Reach is recomputed from the current populations, so zones founded
    /// during the last tick are judged by whether they connect now.
    pub fn validate_state(&self) -> Vec<StateViolation> {
        let mut violations = Vec::new();
        let reachable = flood_fill(self.grid());
        let ledger = self.ledger();
        if ledger.committed_workers > ledger.total_workers {
            violations.push(StateViolation::WorkersOverCommitted {
                committed: ledger.committed_workers,
                available: ledger.total_workers,
            });
        }
        if ledger.consumed_goods > ledger.total_goods {
            violations.push(StateViolation::GoodsOverConsumed {
                consumed: ledger.consumed_goods,
                produced: ledger.total_goods,
            });
        }
        for (cell, powered) in self.grid().cells().zip(reachable) {
            let Some(kind) = cell.zone_kind() else {
                continue;
            };
            if cell.population() > kind.cap() {
                violations.push(StateViolation::PopulationAboveCap {
                    coord: cell.coord(),
                    population: cell.population(),
                });
            }
            if cell.population() > 0 && !powered {
                violations.push(StateViolation::UnpoweredZone { coord: cell.coord() });
            }
        }
        violations
    }

    pub fn summary(&self, area: Option<AreaReport>) -> RegionSummary {
        let ledger = self.ledger();
        RegionSummary {
            name: self.name().to_string(),
            tick: self.current_tick(),
            state: self.state(),
            residential: self.total_population(ZoneKind::Residential),
            commercial: self.total_population(ZoneKind::Commercial),
            industrial: self.total_population(ZoneKind::Industrial),
            total_population: self.overall_population(),
            total_pollution: self.total_pollution(),
            average_pollution: self.average_pollution(),
            powered_cells: self.powered_cell_count(),
            power_coverage: self.power_coverage(),
            worker_utilization: ledger.worker_utilization(),
            goods_utilization: ledger.goods_utilization(),
            ledger,
            area,
        }
    }
}
