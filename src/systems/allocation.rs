use std::cmp::Ordering;

use serde::Serialize;
use thiserror::Error;

use crate::{
    grid::{Grid, ZoneEconomy, ZoneKind},
    systems::growth::Candidate,
};

/// What one level of growth costs a zone of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCost {
    pub workers: u32,
    pub goods: u32,
}

impl ResourceCost {
    pub fn for_kind(kind: ZoneKind) -> Self {
        match kind {
            ZoneKind::Residential => Self { workers: 0, goods: 0 },
            ZoneKind::Commercial => Self { workers: 1, goods: 1 },
            ZoneKind::Industrial => Self { workers: 2, goods: 0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum Shortfall {
    #[error("not enough workers")]
    Workers,
    #[error("not enough goods")]
    Goods,
}

/// Region-wide worker and goods balance.
///
/// Workers come from residential population and goods from industrial output.
/// Both stay committed to the zone that claimed them, so the ledger is rebuilt
/// from the grid rather than carried between ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceLedger {
    pub total_workers: u64,
    pub committed_workers: u64,
    pub total_goods: u64,
    pub consumed_goods: u64,
}

impl ResourceLedger {
    pub fn open(grid: &Grid) -> Self {
        let mut ledger = Self {
            total_workers: grid.total_population(ZoneKind::Residential),
            ..Self::default()
        };
        for zone in grid.cells().filter_map(|cell| cell.zone()) {
            ledger.committed_workers += u64::from(zone.assigned_workers());
            match zone.economy() {
                ZoneEconomy::Residential => {}
                ZoneEconomy::Commercial { consumed_goods } => {
                    ledger.consumed_goods += u64::from(consumed_goods);
                }
                ZoneEconomy::Industrial { goods_produced } => {
                    ledger.total_goods += u64::from(goods_produced);
                }
            }
        }
        ledger
    }

    pub fn available_workers(&self) -> u64 {
        self.total_workers.saturating_sub(self.committed_workers)
    }

    pub fn available_goods(&self) -> u64 {
        self.total_goods.saturating_sub(self.consumed_goods)
    }

    pub fn check(&self, cost: ResourceCost) -> Result<(), Shortfall> {
        if u64::from(cost.workers) > self.available_workers() {
            return Err(Shortfall::Workers);
        }
        if u64::from(cost.goods) > self.available_goods() {
            return Err(Shortfall::Goods);
        }
        Ok(())
    }

    pub fn commit(&mut self, cost: ResourceCost) -> Result<(), Shortfall> {
        self.check(cost)?;
        self.committed_workers += u64::from(cost.workers);
        self.consumed_goods += u64::from(cost.goods);
        Ok(())
    }

    pub fn produce_goods(&mut self, goods: u64) {
        self.total_goods += goods;
    }

    pub fn is_balanced(&self) -> bool {
        self.committed_workers <= self.total_workers && self.consumed_goods <= self.total_goods
    }

    pub fn worker_utilization(&self) -> f64 {
        ratio(self.committed_workers, self.total_workers)
    }

    pub fn goods_utilization(&self) -> f64 {
        ratio(self.consumed_goods, self.total_goods)
    }
}

fn ratio(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        used as f64 / total as f64
    }
}

/// Total order for candidates of one kind: larger zones first, then busier
/// neighborhoods, then row-major position.
pub fn priority_order(a: &Candidate, b: &Candidate) -> Ordering {
    b.population
        .cmp(&a.population)
        .then_with(|| b.populated_neighbors.cmp(&a.populated_neighbors))
        .then_with(|| a.coord.y.cmp(&b.coord.y))
        .then_with(|| a.coord.x.cmp(&b.coord.x))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocation {
    pub granted: Vec<Candidate>,
    pub deferred: Vec<(Candidate, Shortfall)>,
}

/// Commits resources to candidates in priority order.
///
/// A candidate that cannot be paid in full is deferred and the next one is
/// tried. Industrial grants add their new output to the ledger immediately.
pub fn allocate(mut candidates: Vec<Candidate>, ledger: &mut ResourceLedger) -> Allocation {
    candidates.sort_by(priority_order);
    let mut allocation = Allocation::default();
    for candidate in candidates {
        let cost = ResourceCost::for_kind(candidate.kind);
        match ledger.commit(cost) {
            Ok(()) => {
                if candidate.kind == ZoneKind::Industrial {
                    ledger.produce_goods(1);
                }
                allocation.granted.push(candidate);
            }
            Err(shortfall) => allocation.deferred.push((candidate, shortfall)),
        }
    }
    allocation
}
