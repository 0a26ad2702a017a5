use std::{any::Any, collections::HashSet};

use anyhow::{ensure, Result};
use serde::Serialize;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    grid::{Coord, Grid, ZoneKind, ZoneState},
    systems::{
        allocation::{allocate, ResourceCost, ResourceLedger, Shortfall},
        growth::{collect_candidates, Candidate},
    },
};

/// Outcome of the latest zone phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub ledger: ResourceLedger,
    pub granted: Vec<Candidate>,
    pub deferred: Vec<(Candidate, Shortfall)>,
}

/// Growth and resource settlement for all zone kinds.
///
/// Candidates for every kind are taken from the grid as it stands when the
/// phase starts, then settled kind by kind in [`ZoneKind::PRIORITY`] order
/// against one shared ledger.
#[derive(Debug, Default)]
pub struct ZoneSystem {
    last: Option<ZoneSummary>,
}

impl ZoneSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_summary(&self) -> Option<&ZoneSummary> {
        self.last.as_ref()
    }
}

impl System for ZoneSystem {
    fn name(&self) -> &'static str {
        "zones"
    }

    fn run(&mut self, ctx: &SystemContext, grid: &mut Grid) -> Result<()> {
        for zone in grid.cells_mut().filter_map(|cell| cell.zone_mut()) {
            zone.begin_turn();
        }

        let mut ledger = ResourceLedger::open(grid);
        let candidates: Vec<(ZoneKind, Vec<Candidate>)> = ZoneKind::PRIORITY
            .iter()
            .map(|&kind| (kind, collect_candidates(grid, kind)))
            .collect();

        let mut summary = ZoneSummary::default();
        let mut settled: HashSet<Coord> = HashSet::new();
        for (kind, pending) in candidates {
            let cost = ResourceCost::for_kind(kind);
            let allocation = allocate(pending, &mut ledger);
            debug!(
                tick = ctx.tick,
                kind = kind.name(),
                granted = allocation.granted.len(),
                deferred = allocation.deferred.len(),
                "zone allocation"
            );
            for candidate in &allocation.granted {
                if let Some(zone) = grid.cell_mut(candidate.coord).and_then(|c| c.zone_mut()) {
                    zone.grow(cost.workers, cost.goods);
                }
                settled.insert(candidate.coord);
            }
            for (candidate, shortfall) in &allocation.deferred {
                let state = match shortfall {
                    Shortfall::Workers => ZoneState::Understaffed,
                    Shortfall::Goods => ZoneState::NoGoods,
                };
                if let Some(zone) = grid.cell_mut(candidate.coord).and_then(|c| c.zone_mut()) {
                    zone.set_state(state);
                }
                settled.insert(candidate.coord);
            }
            summary.granted.extend(allocation.granted);
            summary.deferred.extend(allocation.deferred);
        }

        for cell in grid.cells_mut() {
            if settled.contains(&cell.coord()) {
                continue;
            }
            let powered = cell.is_powered();
            if let Some(zone) = cell.zone_mut() {
                zone.settle_idle_state(powered);
            }
        }

        let settled_ledger = ResourceLedger::open(grid);
        ensure!(
            settled_ledger.committed_workers <= settled_ledger.total_workers,
            "workers over-committed: {} assigned, {} available",
            settled_ledger.committed_workers,
            settled_ledger.total_workers
        );
        ensure!(
            settled_ledger.consumed_goods <= settled_ledger.total_goods,
            "goods over-consumed: {} consumed, {} produced",
            settled_ledger.consumed_goods,
            settled_ledger.total_goods
        );
        summary.ledger = settled_ledger;
        self.last = Some(summary);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
