use std::io;

use thiserror::Error;

use crate::tile::Tile;

/// Errors produced while planning or executing a tile download.
#[derive(Debug, Error)]
pub enum Error {
    /// The geocoder returned no result for the given location.
    #[error("no geocoding result for {query:?}")]
    GeocodeNotFound { query: String },

    /// The geocoding request itself failed (transport or decode).
    #[error("geocoding request failed")]
    GeocodeFailed(#[source] reqwest::Error),

    /// A standalone latitude or longitude is out of range.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("invalid zoom range: {0}")]
    InvalidZoomRange(String),

    /// The planned tile count exceeds the budget and auto-scaling
    /// could not (or was not allowed to) bring it down.
    #[error("too many tiles: {tiles} exceeds the budget of {budget}")]
    BudgetExceeded { tiles: u64, budget: u64 },

    #[error("failed formatting tile URL")]
    UrlFormat(#[source] strfmt::FmtError),

    #[error("failed creating HTTP client")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed fetching tile {tile}")]
    TileFetchFailed {
        tile: Tile,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed writing tile {tile} to the store")]
    StoreWriteFailed {
        tile: Tile,
        #[source]
        source: io::Error,
    },

    /// The store rejected a session-level operation (begin/metadata/end).
    #[error("tile store session error")]
    StoreSessionFailed(#[source] io::Error),

    /// A download session hit a fatal per-tile error and was torn down.
    #[error("download session aborted after {processed} of {total} tiles")]
    SessionAborted {
        processed: u64,
        total: u64,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
