use std::time::Duration;

use crate::error::Result;
use crate::geo::BoundingBox;
use crate::plan::{TilePlan, ZoomRange};
use crate::url::UrlFormat;

/// Default number of concurrently in-flight tile fetches. Deliberately
/// low; the public tile servers are a shared, rate-sensitive resource.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Tile download configuration.
#[derive(Debug, PartialEq)]
pub struct Config {
    /// The region to cover.
    pub bounding_box: BoundingBox,

    /// The zoom levels to download. The upper bound may be lowered by
    /// auto-scaling to satisfy `max_tiles`.
    pub zoom: ZoomRange,

    /// Maximum number of tiles to download; `None` means unlimited.
    pub max_tiles: Option<u64>,

    /// Whether to lower the zoom ceiling until the plan fits
    /// `max_tiles`, instead of failing outright.
    pub auto_scale: bool,

    /// Hard cap on concurrently in-flight fetches.
    pub concurrency: usize,

    /// The URL template to download individual tiles from, with the
    /// replacement specifiers `{x}`, `{y}` and `{z}`.
    pub url: UrlFormat,

    /// Timeout for fetching a single tile.
    ///
    /// Pass the zero duration to disable the timeout.
    pub timeout: Duration,
}

impl Config {
    /// Compute the tile plan for this configuration, applying the budget
    /// and auto-scaling policy.
    pub fn plan(&self) -> Result<TilePlan> {
        TilePlan::with_budget(&self.bounding_box, self.zoom, self.max_tiles, self.auto_scale)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bounding_box: BoundingBox::WORLD,
            zoom: ZoomRange::new(0, 3).expect("static zoom range is valid"),
            max_tiles: Some(1_000),
            auto_scale: true,
            concurrency: DEFAULT_CONCURRENCY,
            url: UrlFormat::default(),
            timeout: Duration::from_secs(10),
        }
    }
}
