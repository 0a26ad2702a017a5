pub mod analysis;
pub mod engine;
pub mod grid;
pub mod layout;
pub mod render;
pub mod scenario;
pub mod snapshot;
pub mod systems;

pub use engine::{Region, RegionBuilder, RunSettings, RunState, TickReport};
pub use grid::{Cell, CellType, Coord, Grid, ZoneKind, ZoneState};
pub use layout::{Layout, LayoutError};
pub use scenario::{ConfigError, Scenario, ScenarioLoader};
