use std::f64::consts::PI;
use std::fmt;

/// Largest supported zoom level. Keeps tile indices comfortably inside
/// `u32` and the floor computation exact in `f64`.
pub const MAX_ZOOM: u8 = 30;

/// Latitude limit of the Web Mercator projection, in degrees. The
/// projection diverges at the poles; latitudes beyond this are clamped
/// before mapping.
pub const MAX_MERCATOR_LAT: f64 = 85.05112878;

/// An OSM slippy-map tile with x, y and z-coordinate.
/// ref: https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Tile {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl Tile {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        debug_assert!(z <= MAX_ZOOM);
        debug_assert!((x as u64) < 1u64 << z || z == 0 && x == 0);
        debug_assert!((y as u64) < 1u64 << z || z == 0 && y == 0);

        Self { x, y, z }
    }

    /// The tile containing the given coordinates (in degrees) at `zoom`.
    pub fn from_coords(lat_deg: f64, lon_deg: f64, zoom: u8) -> Self {
        Self::new(
            lon_to_tile_x(lon_deg, zoom),
            lat_to_tile_y(lat_deg, zoom),
            zoom,
        )
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Column index of the tile containing `lon_deg` at `zoom`.
///
/// Tile boundaries are inclusive on the west edge and exclusive on the
/// east edge; the floor here decides which tile a boundary coordinate
/// belongs to. `lon_deg = 180` maps onto the last column.
pub fn lon_to_tile_x(lon_deg: f64, zoom: u8) -> u32 {
    let n = 2f64.powi(zoom as i32);
    clamp_index(((lon_deg + 180.0) / 360.0 * n).floor(), zoom)
}

/// Row index of the tile containing `lat_deg` at `zoom`, using the Web
/// Mercator projection. Row indices increase southward.
///
/// Latitudes outside the Mercator domain (±85.05112878°) are clamped,
/// so ±90° map onto the first/last row instead of diverging.
pub fn lat_to_tile_y(lat_deg: f64, zoom: u8) -> u32 {
    let lat_rad = lat_deg
        .clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT)
        .to_radians();
    let n = 2f64.powi(zoom as i32);
    clamp_index(((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor(), zoom)
}

fn clamp_index(raw: f64, zoom: u8) -> u32 {
    let max = (1u32 << zoom) - 1;
    if raw <= 0.0 {
        0
    } else if raw >= max as f64 {
        max
    } else {
        raw as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_index() {
        let tile = Tile::from_coords(50.7929, 6.0402, 18);
        assert_eq!((tile.x, tile.y), (135470, 87999));
    }

    #[test]
    fn zoom_zero_is_a_single_tile() {
        assert_eq!(Tile::from_coords(48.85, 2.35, 0), Tile::new(0, 0, 0));
        assert_eq!(Tile::from_coords(-33.9, 151.2, 0), Tile::new(0, 0, 0));
    }

    #[test]
    fn floor_semantics_at_prime_meridian() {
        // 0° sits exactly on the boundary between columns; it belongs to
        // the eastern one.
        assert_eq!(lon_to_tile_x(0.0, 1), 1);
        assert_eq!(lon_to_tile_x(-1e-9, 1), 0);
    }

    #[test]
    fn world_edges_map_onto_the_grid() {
        for z in [1u8, 4, 12] {
            let max = (1u32 << z) - 1;
            assert_eq!(lon_to_tile_x(-180.0, z), 0);
            assert_eq!(lon_to_tile_x(180.0, z), max);
            assert_eq!(lat_to_tile_y(90.0, z), 0);
            assert_eq!(lat_to_tile_y(-90.0, z), max);
        }
    }

    #[test]
    fn mapper_is_monotonic() {
        let zoom = 10;

        let mut last_x = 0;
        for step in 0..=360 {
            let x = lon_to_tile_x(-180.0 + step as f64, zoom);
            assert!(x >= last_x, "x regressed at step {}", step);
            last_x = x;
        }

        // y grows as latitude shrinks.
        let mut last_y = 0;
        for step in 0..=180 {
            let y = lat_to_tile_y(90.0 - step as f64, zoom);
            assert!(y >= last_y, "y regressed at step {}", step);
            last_y = y;
        }
        assert_eq!(last_y, (1u32 << zoom) - 1);
    }
}
