use std::f64::consts::{FRAC_PI_2, PI};

use crate::error::{Error, Result};

/// Mean Earth radius in meters.
/// ref: https://en.wikipedia.org/wiki/Earth
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point on the geographic sphere, in degrees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidCoordinate(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidCoordinate(format!(
                "longitude {} out of range [-180, 180]",
                longitude
            )));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A bounding box consisting of north, east, south and west coordinate
/// boundaries given in degrees.
///
/// `west > east` is a valid state and means the box crosses the
/// antimeridian; the tile enumerator handles it by splitting the
/// x-range in two.
///
/// # Example
/// ```rust
/// # use dl_tiles::BoundingBox;
/// let aachen_germany = BoundingBox::new(50.811, 6.1649, 50.7492, 6.031).unwrap();
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub east: f64,
    pub south: f64,
    pub west: f64,
}

impl BoundingBox {
    /// The whole world, used for the overview download pass.
    pub const WORLD: BoundingBox = BoundingBox {
        north: 90.0,
        east: 180.0,
        south: -90.0,
        west: -180.0,
    };

    /// Create a new bounding box from coordinates in degrees, in north,
    /// east, south, west order.
    ///
    /// Fails with [`Error::InvalidBoundingBox`] if a coordinate is out of
    /// range or `south > north`. `west > east` is accepted (antimeridian
    /// crossing).
    pub fn new(north: f64, east: f64, south: f64, west: f64) -> Result<Self> {
        for lat in [north, south] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(Error::InvalidBoundingBox(format!(
                    "latitude {} out of range [-90, 90]",
                    lat
                )));
            }
        }
        for lon in [east, west] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(Error::InvalidBoundingBox(format!(
                    "longitude {} out of range [-180, 180]",
                    lon
                )));
            }
        }
        if south > north {
            return Err(Error::InvalidBoundingBox(format!(
                "south ({}) is north of north ({})",
                south, north
            )));
        }

        Ok(Self {
            north,
            east,
            south,
            west,
        })
    }

    /// Create a square box around `center` with the given radius in
    /// meters, measured along a great circle.
    ///
    /// If the circle contains a pole, the box degenerates to the full
    /// longitude range with the latitude clamped at the pole. A box whose
    /// longitude bounds wrap past ±180° comes back with `west > east`.
    ///
    /// Source: http://janmatuschek.de/LatitudeLongitudeBoundingCoordinates
    pub fn around(center: GeoPoint, radius_m: f64) -> Self {
        let lat = center.latitude.to_radians();
        let lon = center.longitude.to_radians();

        // Angular distance in radians on a great circle.
        let ang_dist = radius_m / EARTH_RADIUS_M;

        let mut south = lat - ang_dist;
        let mut north = lat + ang_dist;

        let west;
        let east;
        if -FRAC_PI_2 < south && north < FRAC_PI_2 {
            let delta = (ang_dist.sin() / lat.cos()).asin();

            let mut w = lon - delta;
            let mut e = lon + delta;
            if w < -PI {
                w += 2.0 * PI;
            }
            if e > PI {
                e -= 2.0 * PI;
            }

            west = w;
            east = e;
        } else {
            // A pole is within the distance.
            south = south.max(-FRAC_PI_2);
            north = north.min(FRAC_PI_2);
            west = -PI;
            east = PI;
        }

        Self {
            north: north.to_degrees(),
            east: east.to_degrees(),
            south: south.to_degrees(),
            west: west.to_degrees(),
        }
    }

    /// Assemble a box from the individual CLI flags. All four must be
    /// given or none at all; a partial box is a configuration error.
    pub fn from_parts(
        north: Option<f64>,
        east: Option<f64>,
        south: Option<f64>,
        west: Option<f64>,
    ) -> Result<Option<Self>> {
        match (north, east, south, west) {
            (Some(n), Some(e), Some(s), Some(w)) => Self::new(n, e, s, w).map(Some),
            (None, None, None, None) => Ok(None),
            _ => Err(Error::InvalidBoundingBox(
                "missing components for bounding box".to_owned(),
            )),
        }
    }

    /// Whether the box wraps across the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }
}
