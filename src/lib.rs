//! Compute the set of map tiles covering a geographic region and
//! download them from an OpenStreetMap tileserver into a local tile
//! store.
//!
//! **Use with absolute caution.** Downloading tiles en-masse can hog
//! down a tile server easily, which is why the tile budget defaults to
//! 1000 and concurrency to 2. I am not responsible for any damage this
//! tool may cause.
//!
//! The region is either an explicit bounding box, a box geocoded from a
//! location name via Nominatim, or a box computed around a center point
//! and radius. The requested maximum zoom is lowered automatically until
//! the tile count fits the budget.
//!
//! # CLI Example
//!
//! ```bash
//! dl-tiles --output ./paris "Paris, France"
//! dl-tiles -n 34.337 -e -118.155 -s 33.704 -w -118.668 --zoom 0-12 --output ./la
//! ```
//!
//! # Library Example
//! ```rust,no_run
//! use dl_tiles::{download_region, BoundingBox, Config, DirectoryStore, ZoomRange};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), dl_tiles::Error> {
//! let config = Config {
//!     bounding_box: BoundingBox::new(50.811, 6.1649, 50.7492, 6.031)?,
//!     zoom: ZoomRange::new(0, 12)?,
//!     max_tiles: Some(1_000),
//!     ..Config::default()
//! };
//!
//! let mut store = DirectoryStore::new("./tiles");
//! let summary = download_region(&config, &mut store, None).await?;
//! println!("downloaded {} tiles", summary.processed);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod fetch;
mod geo;
mod geocode;
mod plan;
mod store;
mod tile;
mod url;

pub use config::{Config, DEFAULT_CONCURRENCY};
pub use error::{Error, Result};
pub use fetch::{
    download, download_region, http_client, HttpTileSource, Progress, ProgressSink, Summary,
    TileSource,
};
pub use geo::{BoundingBox, GeoPoint, EARTH_RADIUS_M};
pub use geocode::{search, Address, Location, Place};
pub use plan::{TilePlan, ZoomRange};
pub use store::{DirectoryStore, StoreMetadata, TileStore};
pub use tile::{lat_to_tile_y, lon_to_tile_x, Tile, MAX_MERCATOR_LAT, MAX_ZOOM};
pub use url::{UrlFormat, DEFAULT_TILE_URL};
