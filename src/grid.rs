//! Grid module.
//!
//! Tiles, area shapes and the spatial query seam targeting selectors use to
//! turn an origin into candidate targets.

use crate::action::GameAction;
use crate::encounter::Encounter;
use crate::entity::{EntityId, Target};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub z: i32,
}

impl Tile {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z,
        }
    }

    pub fn manhattan_distance(self, other: Tile) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

/// An area around a center tile.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Tile, TileShape};
///
/// let origin = Tile::new(0, 0, 0);
/// assert_eq!(TileShape::Single.tiles(origin), vec![origin]);
/// assert_eq!(TileShape::Square { half_extent: 1 }.tiles(origin).len(), 9);
/// assert_eq!(TileShape::Diamond { radius: 1 }.tiles(origin).len(), 5);
/// assert_eq!(TileShape::Radius { radius: 2 }.tiles(origin).len(), 13);
///
/// let line = TileShape::Line { dx: 1, dy: 0, length: 3 }.tiles(origin);
/// assert_eq!(line, vec![Tile::new(1, 0, 0), Tile::new(2, 0, 0), Tile::new(3, 0, 0)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TileShape {
    Single,
    /// Euclidean disc: `dx² + dy² <= radius²`.
    Radius { radius: i32 },
    Square { half_extent: i32 },
    /// Manhattan ball: `|dx| + |dy| <= radius`.
    Diamond { radius: i32 },
    /// `length` tiles stepping from the center along `(dx, dy)`, center
    /// excluded.
    Line { dx: i32, dy: i32, length: i32 },
}

impl TileShape {
    /// Tiles covered when centered on `center`, in row-major order (lines in
    /// stepping order).
    pub fn tiles(&self, center: Tile) -> Vec<Tile> {
        let square = |reach: i32, keep: &dyn Fn(i32, i32) -> bool| {
            let mut tiles = Vec::new();
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    if keep(dx, dy) {
                        tiles.push(center.offset(dx, dy));
                    }
                }
            }
            tiles
        };
        match *self {
            TileShape::Single => vec![center],
            TileShape::Radius { radius } => {
                square(radius, &|dx, dy| dx * dx + dy * dy <= radius * radius)
            }
            TileShape::Square { half_extent } => square(half_extent, &|_, _| true),
            TileShape::Diamond { radius } => square(radius, &|dx, dy| dx.abs() + dy.abs() <= radius),
            TileShape::Line { dx, dy, length } => (1..=length)
                .map(|i| center.offset(dx * i, dy * i))
                .collect(),
        }
    }
}

/// Spatial queries over the encounter's map.
///
/// The encounter is passed in so implementations can read live character
/// positions.
pub trait SpatialQuery: Send + Sync {
    /// Entities standing on `tiles`, in tile order.
    fn entities_on_tiles(&self, encounter: &Encounter, tiles: &[Tile]) -> Vec<Target>;

    /// Tiles `action` can be aimed at from `origin`.
    fn potential_tiles(&self, encounter: &Encounter, action: &GameAction, origin: Tile)
        -> Vec<Tile>;
}

/// In-memory grid: optional map bounds plus static occupants (props,
/// hazards) on top of the encounter's characters.
///
/// # Examples
///
/// ```rust
/// use zzcombat::{Character, Encounter, EncounterConfig, OccupancyGrid, SpatialQuery, Tile};
///
/// let mut encounter = Encounter::new(EncounterConfig::default());
/// encounter
///     .add_character(Character::new("hero", "Hero").with_tile(Tile::new(1, 1, 0)))
///     .unwrap();
///
/// let grid = OccupancyGrid::new().place("barrel", Tile::new(2, 1, 0));
/// let found = grid.entities_on_tiles(&encounter, &[Tile::new(1, 1, 0), Tile::new(2, 1, 0)]);
/// let ids: Vec<&str> = found.iter().map(|t| t.entity.as_str()).collect();
/// assert_eq!(ids, ["hero", "barrel"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OccupancyGrid {
    bounds: Option<(Tile, Tile)>,
    occupants: BTreeMap<Tile, EntityId>,
}

impl OccupancyGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict queries to the rectangle between `min` and `max` (inclusive,
    /// any layer).
    pub fn with_bounds(mut self, min: Tile, max: Tile) -> Self {
        self.bounds = Some((min, max));
        self
    }

    /// Put a static occupant on `tile`.
    pub fn place(mut self, entity: impl Into<EntityId>, tile: Tile) -> Self {
        self.occupants.insert(tile, entity.into());
        self
    }

    pub fn contains(&self, tile: Tile) -> bool {
        match self.bounds {
            Some((min, max)) => {
                (min.x..=max.x).contains(&tile.x) && (min.y..=max.y).contains(&tile.y)
            }
            None => true,
        }
    }
}

impl SpatialQuery for OccupancyGrid {
    fn entities_on_tiles(&self, encounter: &Encounter, tiles: &[Tile]) -> Vec<Target> {
        let mut found = Vec::new();
        for &tile in tiles.iter().filter(|t| self.contains(**t)) {
            for character in encounter.characters() {
                if character.tile() == Some(tile) {
                    found.push(Target::on_tile(character.id().clone(), tile));
                }
            }
            if let Some(entity) = self.occupants.get(&tile) {
                found.push(Target::on_tile(entity.clone(), tile));
            }
        }
        found
    }

    fn potential_tiles(
        &self,
        _encounter: &Encounter,
        action: &GameAction,
        origin: Tile,
    ) -> Vec<Tile> {
        TileShape::Diamond {
            radius: action.range() as i32,
        }
        .tiles(origin)
        .into_iter()
        .filter(|t| self.contains(*t))
        .collect()
    }
}
