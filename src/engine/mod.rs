use std::{any::Any, time::Instant};

use anyhow::{Context, Result};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, info_span};

use crate::{
    grid::{Coord, Grid, ZoneKind},
    layout::Layout,
    scenario::ConfigError,
    snapshot::{GridFrame, History, StateSnapshot},
    systems::{PollutionSystem, PowerSystem, ResourceLedger, ZoneSystem},
};

pub struct SystemContext {
    pub tick: u64,
}

/// One phase of a tick. Phases run in registration order and own no grid state.
pub trait System {
    fn name(&self) -> &'static str;
    fn run(&mut self, ctx: &SystemContext, grid: &mut Grid) -> Result<()>;
    fn as_any(&self) -> &dyn Any;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSettings {
    max_ticks: u64,
    refresh_interval: u64,
}

impl RunSettings {
    pub fn new(max_ticks: u64, refresh_interval: u64) -> Result<Self, ConfigError> {
        if max_ticks == 0 {
            return Err(ConfigError::ZeroMaxTicks);
        }
        if refresh_interval == 0 {
            return Err(ConfigError::ZeroRefreshInterval);
        }
        if refresh_interval > max_ticks {
            return Err(ConfigError::RefreshExceedsMaxTicks {
                refresh_interval,
                max_ticks,
            });
        }
        Ok(Self {
            max_ticks,
            refresh_interval,
        })
    }

    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    pub fn refresh_interval(&self) -> u64 {
        self.refresh_interval
    }

    pub fn is_refresh_tick(&self, tick: u64) -> bool {
        tick % self.refresh_interval == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Ready,
    Running,
    Quiescent,
    StepLimitReached,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Quiescent | RunState::StepLimitReached)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTiming {
    pub name: &'static str,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub changed: bool,
    pub state: RunState,
    pub phases: Vec<PhaseTiming>,
    pub ledger: Option<ResourceLedger>,
    pub granted: usize,
    pub deferred: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegionError {
    #[error("coordinate ({x}, {y}) is outside the region")]
    OutOfBounds { x: usize, y: usize },
    #[error("cell ({x}, {y}) is not a zone")]
    NotAZone { x: usize, y: usize },
    #[error("population can only be seeded before the first tick")]
    AlreadyStarted,
}

pub struct RegionBuilder {
    name: String,
    grid: Grid,
    settings: RunSettings,
    systems: Vec<Box<dyn System>>,
}

impl RegionBuilder {
    pub fn new(layout: &Layout, settings: RunSettings) -> Self {
        Self {
            name: "region".to_string(),
            grid: Grid::new(layout),
            settings,
            systems: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    /// Power, then zones, then pollution.
    pub fn with_standard_systems(self) -> Self {
        self.with_system(PowerSystem::new())
            .with_system(ZoneSystem::new())
            .with_system(PollutionSystem::new())
    }

    pub fn build(self) -> Region {
        let mut history = History::new();
        history.record(StateSnapshot::capture(0, &self.grid, false));
        Region {
            name: self.name,
            grid: self.grid,
            settings: self.settings,
            systems: self.systems,
            history,
            tick: 0,
            state: RunState::Ready,
        }
    }
}

/// A single simulated region: the grid, its phase pipeline and its history.
pub struct Region {
    name: String,
    grid: Grid,
    settings: RunSettings,
    systems: Vec<Box<dyn System>>,
    history: History,
    tick: u64,
    state: RunState,
}

impl Region {
    /// A region running the standard power, zone and pollution phases.
    pub fn new(layout: &Layout, settings: RunSettings) -> Self {
        RegionBuilder::new(layout, settings)
            .with_standard_systems()
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn settings(&self) -> RunSettings {
        self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn get_system<T: 'static>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|system| system.as_any().downcast_ref::<T>())
    }

    /// Sets a zone's starting population, clamped to its cap.
    pub fn seed_population(&mut self, x: usize, y: usize, population: u32) -> Result<(), RegionError> {
        if self.state != RunState::Ready {
            return Err(RegionError::AlreadyStarted);
        }
        let cell = self
            .grid
            .cell_mut(Coord::new(x, y))
            .ok_or(RegionError::OutOfBounds { x, y })?;
        let zone = cell.zone_mut().ok_or(RegionError::NotAZone { x, y })?;
        zone.seed(population);
        self.history
            .record(StateSnapshot::capture(0, &self.grid, false));
        Ok(())
    }

    /// Runs every phase once and records the outcome.
    ///
    /// Still callable after the run has ended; the state is re-derived from the
    /// new tick.
    pub fn tick(&mut self) -> Result<TickReport> {
        let next = self.tick + 1;
        let span = info_span!("tick", region = %self.name, tick = next);
        let _guard = span.enter();

        if self.state == RunState::Ready {
            self.state = RunState::Running;
        }

        let before = GridFrame::capture(&self.grid);
        let ctx = SystemContext { tick: next };
        let mut phases = Vec::with_capacity(self.systems.len());
        for system in self.systems.iter_mut() {
            let start = Instant::now();
            system
                .run(&ctx, &mut self.grid)
                .with_context(|| format!("{} phase failed on tick {next}", system.name()))?;
            phases.push(PhaseTiming {
                name: system.name(),
                duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            });
        }

        let changed = !before.matches(&self.grid);
        self.history
            .record(StateSnapshot::capture(next, &self.grid, changed));
        self.tick = next;
        self.state = if !changed {
            RunState::Quiescent
        } else if self.tick >= self.settings.max_ticks() {
            RunState::StepLimitReached
        } else {
            RunState::Running
        };

        let zones = self.get_system::<ZoneSystem>().and_then(ZoneSystem::last_summary);
        let report = TickReport {
            tick: next,
            changed,
            state: self.state,
            phases,
            ledger: zones.map(|summary| summary.ledger),
            granted: zones.map_or(0, |summary| summary.granted.len()),
            deferred: zones.map_or(0, |summary| summary.deferred.len()),
        };
        debug!(
            changed,
            granted = report.granted,
            deferred = report.deferred,
            "tick complete"
        );
        if self.state.is_terminal() {
            info!(
                state = ?self.state,
                population = self.grid_population(),
                pollution = self.grid.total_pollution(),
                "run finished"
            );
        }
        Ok(report)
    }

    /// Ticks until the grid settles or the tick limit is reached.
    pub fn run(&mut self) -> Result<RunState> {
        self.run_with_hook(|_, _| {})
    }

    pub fn run_with_hook<F>(&mut self, mut hook: F) -> Result<RunState>
    where
        F: FnMut(&TickReport, &Grid),
    {
        while !self.state.is_terminal() {
            let report = self.tick()?;
            hook(&report, &self.grid);
        }
        Ok(self.state)
    }

    /// Back to an unpopulated grid at tick 0.
    pub fn reset(&mut self) {
        self.grid.reset();
        self.history.clear();
        self.history
            .record(StateSnapshot::capture(0, &self.grid, false));
        self.tick = 0;
        self.state = RunState::Ready;
        debug!(region = %self.name, "region reset");
    }

    fn grid_population(&self) -> u64 {
        ZoneKind::ALL
            .iter()
            .map(|&kind| self.grid.total_population(kind))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(text: &str) -> Layout {
        text.parse().unwrap()
    }

    #[test]
    fn settings_validation() {
        assert!(RunSettings::new(10, 2).is_ok());
        assert_eq!(RunSettings::new(0, 1), Err(ConfigError::ZeroMaxTicks));
        assert_eq!(RunSettings::new(5, 0), Err(ConfigError::ZeroRefreshInterval));
        assert!(matches!(
            RunSettings::new(3, 4),
            Err(ConfigError::RefreshExceedsMaxTicks { .. })
        ));
    }

    #[test]
    fn first_tick_moves_out_of_ready() {
        let mut region = Region::new(&layout("R,T,P\n-,-,-\nR,R,R"), RunSettings::new(10, 1).unwrap());
        assert_eq!(region.state(), RunState::Ready);
        let report = region.tick().unwrap();
        assert_eq!(report.tick, 1);
        assert!(report.changed);
        assert_eq!(region.state(), RunState::Running);
        let names: Vec<_> = report.phases.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["power", "zones", "pollution"]);
    }

    #[test]
    fn step_limit_ends_a_changing_run() {
        let mut region = Region::new(&layout("R,T,P"), RunSettings::new(1, 1).unwrap());
        assert_eq!(region.run().unwrap(), RunState::StepLimitReached);
        assert_eq!(region.current_tick(), 1);
    }

    #[test]
    fn seeding_is_validated() {
        let mut region = Region::new(&layout("R,-,P"), RunSettings::new(5, 1).unwrap());
        assert_eq!(
            region.seed_population(1, 0, 1),
            Err(RegionError::NotAZone { x: 1, y: 0 })
        );
        assert_eq!(
            region.seed_population(0, 3, 1),
            Err(RegionError::OutOfBounds { x: 0, y: 3 })
        );
        region.seed_population(0, 0, 9).unwrap();
        assert_eq!(region.history().get(0).unwrap().residential, 5);
        region.tick().unwrap();
        assert_eq!(region.seed_population(0, 0, 1), Err(RegionError::AlreadyStarted));
    }

    #[test]
    fn custom_pipeline_runs_only_registered_phases() {
        let mut region = RegionBuilder::new(&layout("P,T,R"), RunSettings::new(3, 1).unwrap())
            .name("grid-only")
            .with_system(PowerSystem::new())
            .build();
        let report = region.tick().unwrap();
        assert_eq!(report.phases.len(), 1);
        assert!(report.ledger.is_none());
        assert_eq!(region.get_system::<PowerSystem>().unwrap().powered_cells(), 2);
        assert!(region.get_system::<ZoneSystem>().is_none());
        // Power flags alone do not count as a change.
        assert_eq!(region.state(), RunState::Quiescent);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut region = Region::new(&layout("R,T,P"), RunSettings::new(5, 1).unwrap());
        region.run().unwrap();
        region.reset();
        assert_eq!(region.current_tick(), 0);
        assert_eq!(region.state(), RunState::Ready);
        assert_eq!(region.history().len(), 1);
        assert_eq!(region.grid().total_pollution(), 0);
        assert!(region.grid().cells().all(|cell| cell.population() == 0));
    }
}
