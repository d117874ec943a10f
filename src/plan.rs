use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geo::BoundingBox;
use crate::tile::{lat_to_tile_y, lon_to_tile_x, Tile, MAX_ZOOM};

/// An inclusive, contiguous range of zoom levels. Always holds at least
/// one level.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ZoomRange {
    min: u8,
    max: u8,
}

impl ZoomRange {
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if max < min {
            return Err(Error::InvalidZoomRange(format!(
                "max zoom {} is below min zoom {}",
                max, min
            )));
        }
        if max > MAX_ZOOM {
            return Err(Error::InvalidZoomRange(format!(
                "max zoom {} exceeds the supported maximum of {}",
                max, MAX_ZOOM
            )));
        }

        Ok(Self { min, max })
    }

    pub fn single(zoom: u8) -> Result<Self> {
        Self::new(zoom, zoom)
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn levels(&self) -> std::ops::RangeInclusive<u8> {
        self.min..=self.max
    }
}

impl FromStr for ZoomRange {
    type Err = Error;

    /// Parses `"7"` or `"0-12"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidZoomRange(format!("cannot parse {:?}", s));

        match s.split_once('-') {
            Some((min, max)) => {
                let min = min.trim().parse().map_err(|_| invalid())?;
                let max = max.trim().parse().map_err(|_| invalid())?;
                Self::new(min, max)
            }
            None => {
                let zoom = s.trim().parse().map_err(|_| invalid())?;
                Self::single(zoom)
            }
        }
    }
}

impl fmt::Display for ZoomRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

/// The ordered tile list covering a bounding box across a zoom range.
///
/// Never mutated in place; when the zoom ceiling changes a new plan
/// replaces the old one.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePlan {
    zoom: ZoomRange,
    tiles: Vec<Tile>,
}

impl TilePlan {
    /// Enumerate all tiles covering `bbox` over `zoom`, levels in
    /// ascending order, each level row-major (north to south, west to
    /// east).
    ///
    /// A box with `west > east` crosses the antimeridian; its x-range is
    /// split into `x_min..` up to the last column and `0..=x_max`. When
    /// the two segments meet or overlap (coarse zooms map both bounds
    /// into nearby columns) they collapse into one full row, so no
    /// address is ever listed twice.
    pub fn enumerate(bbox: &BoundingBox, zoom: ZoomRange) -> Self {
        let mut tiles = Vec::new();
        for z in zoom.levels() {
            level_tiles(bbox, z, &mut tiles);
        }

        Self { zoom, tiles }
    }

    /// Enumerate with a tile budget, shrinking the zoom ceiling until the
    /// plan fits.
    ///
    /// The count strictly grows with the ceiling, so this descent loop
    /// terminates after at most `max - min + 1` enumerations. Each
    /// iteration re-enumerates; no stale counts are reused. Fails with
    /// [`Error::BudgetExceeded`] if auto-scaling is disabled or even the
    /// minimum requested zoom does not fit.
    pub fn with_budget(
        bbox: &BoundingBox,
        requested: ZoomRange,
        max_tiles: Option<u64>,
        auto_scale: bool,
    ) -> Result<Self> {
        let mut range = requested;

        loop {
            let plan = Self::enumerate(bbox, range);
            let budget = match max_tiles {
                Some(budget) => budget,
                None => return Ok(plan),
            };

            if plan.total() <= budget {
                return Ok(plan);
            }
            if !auto_scale || range.max == range.min {
                return Err(Error::BudgetExceeded {
                    tiles: plan.total(),
                    budget,
                });
            }

            range = ZoomRange {
                min: range.min,
                max: range.max - 1,
            };
            info!(tiles = plan.total(), "max zoom is now {}", range.max);
        }
    }

    pub fn zoom(&self) -> ZoomRange {
        self.zoom
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn total(&self) -> u64 {
        self.tiles.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

fn level_tiles(bbox: &BoundingBox, z: u8, out: &mut Vec<Tile>) {
    // North produces the smaller row index.
    let y_min = lat_to_tile_y(bbox.north, z);
    let y_max = lat_to_tile_y(bbox.south, z);
    let x_min = lon_to_tile_x(bbox.west, z);
    let x_max = lon_to_tile_x(bbox.east, z);
    let last_column = (1u32 << z) - 1;

    debug!(z, y_min, y_max, x_min, x_max, "enumerating level");

    for y in y_min..=y_max {
        if !bbox.crosses_antimeridian() {
            for x in x_min..=x_max {
                out.push(Tile::new(x, y, z));
            }
        } else if x_max >= x_min {
            // The two wrap segments meet or overlap in the same column,
            // so the row covers every column; emitting both segments
            // would list the shared columns twice.
            for x in 0..=last_column {
                out.push(Tile::new(x, y, z));
            }
        } else {
            for x in x_min..=last_column {
                out.push(Tile::new(x, y, z));
            }
            for x in 0..=x_max {
                out.push(Tile::new(x, y, z));
            }
        }
    }
}
