use serde::{Deserialize, Serialize};

use crate::layout::Layout;

/// Moore neighborhood offsets in scan order (row above, same row, row below).
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Grid coordinate: `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance, the ring index in an 8-connected grid.
    pub fn chebyshev(self, other: Coord) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellType {
    Road,
    Powerline,
    PowerlineRoad,
    PowerPlant,
    Empty,
    Residential,
    Commercial,
    Industrial,
}

impl CellType {
    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            'R' => CellType::Residential,
            'C' => CellType::Commercial,
            'I' => CellType::Industrial,
            '-' => CellType::Road,
            'T' => CellType::Powerline,
            '#' => CellType::PowerlineRoad,
            'P' => CellType::PowerPlant,
            _ => CellType::Empty,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            CellType::Residential => 'R',
            CellType::Commercial => 'C',
            CellType::Industrial => 'I',
            CellType::Road => '-',
            CellType::Powerline => 'T',
            CellType::PowerlineRoad => '#',
            CellType::PowerPlant => 'P',
            CellType::Empty => ' ',
        }
    }

    pub fn zone_kind(self) -> Option<ZoneKind> {
        match self {
            CellType::Residential => Some(ZoneKind::Residential),
            CellType::Commercial => Some(ZoneKind::Commercial),
            CellType::Industrial => Some(ZoneKind::Industrial),
            _ => None,
        }
    }

    /// Power infrastructure: the cell types a zone counts as "adjacent power".
    pub fn is_power_infrastructure(self) -> bool {
        matches!(
            self,
            CellType::Powerline | CellType::PowerlineRoad | CellType::PowerPlant
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Residential,
    Commercial,
    Industrial,
}

impl ZoneKind {
    pub const ALL: [ZoneKind; 3] = [
        ZoneKind::Residential,
        ZoneKind::Commercial,
        ZoneKind::Industrial,
    ];

    /// Settlement order within a tick: resource-gated kinds before residential.
    pub const PRIORITY: [ZoneKind; 3] = [
        ZoneKind::Commercial,
        ZoneKind::Industrial,
        ZoneKind::Residential,
    ];

    pub fn cap(self) -> u32 {
        match self {
            ZoneKind::Residential => 5,
            ZoneKind::Commercial | ZoneKind::Industrial => 3,
        }
    }

    pub fn cell_type(self) -> CellType {
        match self {
            ZoneKind::Residential => CellType::Residential,
            ZoneKind::Commercial => CellType::Commercial,
            ZoneKind::Industrial => CellType::Industrial,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ZoneKind::Residential => "residential",
            ZoneKind::Commercial => "commercial",
            ZoneKind::Industrial => "industrial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneState {
    Inactive,
    Active,
    PowerLost,
    Understaffed,
    /// Commercial only.
    NoGoods,
}

/// Kind-specific bookkeeping carried by a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneEconomy {
    Residential,
    Commercial { consumed_goods: u32 },
    Industrial { goods_produced: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    population: u32,
    assigned_workers: u32,
    state: ZoneState,
    was_active_last_turn: bool,
    economy: ZoneEconomy,
}

impl Zone {
    pub fn new(kind: ZoneKind) -> Self {
        let economy = match kind {
            ZoneKind::Residential => ZoneEconomy::Residential,
            ZoneKind::Commercial => ZoneEconomy::Commercial { consumed_goods: 0 },
            ZoneKind::Industrial => ZoneEconomy::Industrial { goods_produced: 0 },
        };
        Self {
            population: 0,
            assigned_workers: 0,
            state: ZoneState::Inactive,
            was_active_last_turn: false,
            economy,
        }
    }

    pub fn kind(&self) -> ZoneKind {
        match self.economy {
            ZoneEconomy::Residential => ZoneKind::Residential,
            ZoneEconomy::Commercial { .. } => ZoneKind::Commercial,
            ZoneEconomy::Industrial { .. } => ZoneKind::Industrial,
        }
    }

    pub fn population(&self) -> u32 {
        self.population
    }

    pub fn assigned_workers(&self) -> u32 {
        self.assigned_workers
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    pub fn was_active_last_turn(&self) -> bool {
        self.was_active_last_turn
    }

    pub fn economy(&self) -> ZoneEconomy {
        self.economy
    }

    pub fn consumed_goods(&self) -> Option<u32> {
        match self.economy {
            ZoneEconomy::Commercial { consumed_goods } => Some(consumed_goods),
            _ => None,
        }
    }

    pub fn goods_produced(&self) -> Option<u32> {
        match self.economy {
            ZoneEconomy::Industrial { goods_produced } => Some(goods_produced),
            _ => None,
        }
    }

    pub fn is_at_cap(&self) -> bool {
        self.population >= self.kind().cap()
    }

    /// Refreshes per-turn fields before the zone phase runs.
    pub(crate) fn begin_turn(&mut self) {
        self.was_active_last_turn = false;
        if let ZoneEconomy::Industrial { goods_produced } = &mut self.economy {
            *goods_produced = self.population;
        }
    }

    /// Advances one level and records what was paid for it.
    pub(crate) fn grow(&mut self, workers: u32, goods: u32) {
        if self.is_at_cap() {
            return;
        }
        self.population += 1;
        self.assigned_workers += workers;
        match &mut self.economy {
            ZoneEconomy::Residential => {}
            ZoneEconomy::Commercial { consumed_goods } => *consumed_goods += goods,
            ZoneEconomy::Industrial { goods_produced } => *goods_produced = self.population,
        }
        self.state = ZoneState::Active;
        self.was_active_last_turn = true;
    }

    pub(crate) fn set_state(&mut self, state: ZoneState) {
        self.state = state;
    }

    /// Derives the state of a zone that did not compete for growth this turn.
    pub(crate) fn settle_idle_state(&mut self, powered: bool) {
        self.state = if self.population == 0 {
            ZoneState::Inactive
        } else if !powered {
            ZoneState::PowerLost
        } else {
            match self.economy {
                ZoneEconomy::Residential => ZoneState::Active,
                ZoneEconomy::Commercial { consumed_goods } => {
                    if self.assigned_workers < self.population {
                        ZoneState::Understaffed
                    } else if consumed_goods < self.population {
                        ZoneState::NoGoods
                    } else {
                        ZoneState::Active
                    }
                }
                ZoneEconomy::Industrial { .. } => {
                    if self.assigned_workers < self.population * 2 {
                        ZoneState::Understaffed
                    } else {
                        ZoneState::Active
                    }
                }
            }
        };
    }

    pub(crate) fn seed(&mut self, population: u32) {
        self.population = population.min(self.kind().cap());
        if let ZoneEconomy::Industrial { goods_produced } = &mut self.economy {
            *goods_produced = self.population;
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Zone::new(self.kind());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    coord: Coord,
    cell_type: CellType,
    pollution: u32,
    powered: bool,
    zone: Option<Zone>,
}

impl Cell {
    pub fn new(coord: Coord, cell_type: CellType) -> Self {
        Self {
            coord,
            cell_type,
            pollution: 0,
            powered: false,
            zone: cell_type.zone_kind().map(Zone::new),
        }
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn population(&self) -> u32 {
        self.zone.as_ref().map_or(0, Zone::population)
    }

    pub fn pollution(&self) -> u32 {
        self.pollution
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn zone(&self) -> Option<&Zone> {
        self.zone.as_ref()
    }

    pub(crate) fn zone_mut(&mut self) -> Option<&mut Zone> {
        self.zone.as_mut()
    }

    pub fn zone_kind(&self) -> Option<ZoneKind> {
        self.cell_type.zone_kind()
    }

    /// Power flows through infrastructure always and through zones once populated.
    pub fn is_conductive(&self) -> bool {
        match self.cell_type {
            CellType::Powerline | CellType::PowerlineRoad | CellType::PowerPlant => true,
            CellType::Residential | CellType::Commercial | CellType::Industrial => {
                self.population() > 0
            }
            CellType::Road | CellType::Empty => false,
        }
    }

    pub(crate) fn set_pollution(&mut self, pollution: u32) {
        self.pollution = pollution;
    }

    pub(crate) fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }

    pub(crate) fn reset(&mut self) {
        self.pollution = 0;
        self.powered = false;
        if let Some(zone) = self.zone.as_mut() {
            zone.clear();
        }
    }
}

/// Rectangular, row-major cell storage. Dimensions never change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(layout: &Layout) -> Self {
        let (width, height) = (layout.width(), layout.height());
        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in layout.rows().enumerate() {
            for (x, cell_type) in row.iter().enumerate() {
                cells.push(Cell::new(Coord::new(x, y), *cell_type));
            }
        }
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    pub fn index(&self, coord: Coord) -> Option<usize> {
        self.contains(coord).then(|| coord.y * self.width + coord.x)
    }

    pub fn cell(&self, coord: Coord) -> Option<&Cell> {
        self.index(coord).map(|idx| &self.cells[idx])
    }

    pub(crate) fn cell_mut(&mut self, coord: Coord) -> Option<&mut Cell> {
        let idx = self.index(coord)?;
        Some(&mut self.cells[idx])
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    pub fn row(&self, y: usize) -> Option<&[Cell]> {
        (y < self.height).then(|| &self.cells[y * self.width..(y + 1) * self.width])
    }

    /// In-bounds Moore neighbors of `coord`, in scan order.
    pub fn neighbors(&self, coord: Coord) -> impl Iterator<Item = Coord> + '_ {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
            let x = coord.x.checked_add_signed(dx)?;
            let y = coord.y.checked_add_signed(dy)?;
            let next = Coord::new(x, y);
            self.contains(next).then_some(next)
        })
    }

    /// Type-based check: a neighbor is a power line, power line road or plant.
    /// Independent of the flood-filled power map.
    pub fn has_adjacent_power(&self, coord: Coord) -> bool {
        self.neighbors(coord).any(|n| {
            self.cell(n)
                .is_some_and(|cell| cell.cell_type().is_power_infrastructure())
        })
    }

    /// Neighbors of zone kind `kind` whose population is at least `min_population`.
    pub fn count_neighbors(&self, coord: Coord, kind: ZoneKind, min_population: u32) -> u32 {
        self.neighbors(coord)
            .filter_map(|n| self.cell(n))
            .filter(|cell| cell.zone_kind() == Some(kind) && cell.population() >= min_population)
            .count() as u32
    }

    pub fn zones(&self, kind: ZoneKind) -> impl Iterator<Item = &Cell> {
        self.cells
            .iter()
            .filter(move |cell| cell.zone_kind() == Some(kind))
    }

    pub fn zone_count(&self, kind: ZoneKind) -> usize {
        self.zones(kind).count()
    }

    pub fn total_population(&self, kind: ZoneKind) -> u64 {
        self.zones(kind).map(|cell| u64::from(cell.population())).sum()
    }

    pub fn total_pollution(&self) -> u64 {
        self.cells.iter().map(|cell| u64::from(cell.pollution())).sum()
    }

    pub fn powered_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_powered()).count()
    }

    pub fn power_plants(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells
            .iter()
            .filter(|cell| cell.cell_type() == CellType::PowerPlant)
            .map(Cell::coord)
    }

    pub(crate) fn reset(&mut self) {
        for cell in &mut self.cells {
            cell.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(text: &str) -> Grid {
        Grid::new(&text.parse::<Layout>().expect("layout parses"))
    }

    #[test]
    fn neighbors_respect_bounds() {
        let grid = grid("R,R,R\nR,P,R\nR,R,R");
        assert_eq!(grid.neighbors(Coord::new(0, 0)).count(), 3);
        assert_eq!(grid.neighbors(Coord::new(1, 0)).count(), 5);
        assert_eq!(grid.neighbors(Coord::new(1, 1)).count(), 8);
        assert!(!grid
            .neighbors(Coord::new(1, 1))
            .any(|n| n == Coord::new(1, 1)));
    }

    #[test]
    fn adjacent_power_is_type_based() {
        let grid = grid("R,-,R,T\n-,-,-,-\nP,-,-,-");
        assert!(!grid.has_adjacent_power(Coord::new(0, 0)));
        assert!(grid.has_adjacent_power(Coord::new(2, 0)));
        assert!(grid.has_adjacent_power(Coord::new(1, 1)));
    }

    #[test]
    fn zone_cells_carry_kind_specific_state() {
        let grid = grid("R,C,I,P");
        let kinds: Vec<_> = grid.cells().filter_map(|c| c.zone().map(Zone::kind)).collect();
        assert_eq!(
            kinds,
            vec![ZoneKind::Residential, ZoneKind::Commercial, ZoneKind::Industrial]
        );
        let commercial = grid.cell(Coord::new(1, 0)).unwrap().zone().unwrap();
        assert_eq!(commercial.consumed_goods(), Some(0));
        assert_eq!(commercial.goods_produced(), None);
        assert!(grid.cell(Coord::new(3, 0)).unwrap().zone().is_none());
    }

    #[test]
    fn zones_conduct_only_when_populated() {
        let mut grid = grid("R,T,P");
        let home = Coord::new(0, 0);
        assert!(!grid.cell(home).unwrap().is_conductive());
        grid.cell_mut(home).unwrap().zone_mut().unwrap().seed(2);
        assert!(grid.cell(home).unwrap().is_conductive());
        assert!(grid.cell(Coord::new(1, 0)).unwrap().is_conductive());
    }

    #[test]
    fn growth_never_exceeds_cap() {
        let mut zone = Zone::new(ZoneKind::Commercial);
        for _ in 0..10 {
            zone.grow(1, 1);
        }
        assert_eq!(zone.population(), 3);
        assert_eq!(zone.assigned_workers(), 3);
        assert_eq!(zone.consumed_goods(), Some(3));
    }

    #[test]
    fn idle_industrial_state_tracks_staffing() {
        let mut zone = Zone::new(ZoneKind::Industrial);
        zone.seed(2);
        zone.settle_idle_state(true);
        assert_eq!(zone.state(), ZoneState::Understaffed);
        zone.settle_idle_state(false);
        assert_eq!(zone.state(), ZoneState::PowerLost);
        zone.clear();
        zone.settle_idle_state(true);
        assert_eq!(zone.state(), ZoneState::Inactive);
    }

    #[test]
    fn chebyshev_distance() {
        assert_eq!(Coord::new(0, 0).chebyshev(Coord::new(3, 1)), 3);
        assert_eq!(Coord::new(4, 4).chebyshev(Coord::new(2, 5)), 2);
    }
}
