pub mod allocation;
pub mod growth;
mod pollution;
mod power;
mod zones;

pub use allocation::{allocate, priority_order, Allocation, ResourceCost, ResourceLedger, Shortfall};
pub use growth::{collect_candidates, is_eligible, Candidate, Neighborhood};
pub use pollution::{diffuse, emission, PollutionSystem, DIFFUSION_RADIUS, POWER_PLANT_EMISSION};
pub use power::{flood_fill, PowerSystem};
pub use zones::{ZoneSummary, ZoneSystem};
