use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{prelude::*, stream};
use reqwest::header::{self, HeaderValue};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::plan::TilePlan;
use crate::store::{StoreMetadata, TileStore};
use crate::tile::Tile;
use crate::url::UrlFormat;

const ZERO_DURATION: Duration = Duration::from_secs(0);

const USER_AGENT: &str = concat!("dl-tiles/", env!("CARGO_PKG_VERSION"));

/// Outcome of one tile fetch: the raw bytes on success, the error
/// otherwise. Never both.
type FetchResult = (Tile, Result<Bytes>);

/// A remote source of tile images.
#[async_trait]
pub trait TileSource: Send + Sync {
    async fn fetch_tile(&self, tile: Tile) -> Result<Bytes>;
}

/// Builds the HTTP client used for tile fetching and geocoding: polite
/// user agent, optional per-request timeout (zero disables it).
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if timeout > ZERO_DURATION {
        builder = builder.timeout(timeout);
    }

    let mut headers = header::HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

    builder
        .default_headers(headers)
        .build()
        .map_err(Error::HttpClient)
}

/// Fetches tiles over HTTP from a slippy-map URL template.
#[derive(Clone, Debug)]
pub struct HttpTileSource {
    client: reqwest::Client,
    url: UrlFormat,
}

impl HttpTileSource {
    pub fn new(client: reqwest::Client, url: UrlFormat) -> Self {
        Self { client, url }
    }

    pub fn with_timeout(url: UrlFormat, timeout: Duration) -> Result<Self> {
        Ok(Self::new(http_client(timeout)?, url))
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    async fn fetch_tile(&self, tile: Tile) -> Result<Bytes> {
        let url = self.url.tile_url(&tile)?;

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|source| Error::TileFetchFailed {
                tile,
                source: source.into(),
            })?;

        response.bytes().await.map_err(|source| Error::TileFetchFailed {
            tile,
            source: source.into(),
        })
    }
}

/// A progress snapshot, emitted after each tile resolves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    /// Tiles resolved so far, successes and failures combined.
    pub processed: u64,
    pub failed: u64,
    pub total: u64,
    pub remaining: u64,
    pub percentage: f64,
    /// Tiles per second since the session started.
    pub speed: f64,
    pub eta: Duration,
}

/// Receives progress snapshots. Purely observational; implementations
/// must not block the orchestrator.
pub trait ProgressSink: Send + Sync {
    fn update(&self, progress: Progress);
}

impl<F> ProgressSink for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn update(&self, progress: Progress) {
        self(progress)
    }
}

/// Mutable state for one plan execution. Owned by the coordinating task,
/// which serializes all counter updates; discarded when the session
/// settles. A retry means a fresh session.
struct DownloadSession {
    processed: u64,
    failed: u64,
    total: u64,
    started_at: Instant,
}

impl DownloadSession {
    fn new(total: u64) -> Self {
        Self {
            processed: 0,
            failed: 0,
            total,
            started_at: Instant::now(),
        }
    }

    fn resolve(&mut self, failed: bool) {
        self.processed += 1;
        if failed {
            self.failed += 1;
        }
    }

    fn snapshot(&self) -> Progress {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        let remaining = self.total - self.processed;
        let percentage = if self.total == 0 {
            100.0
        } else {
            self.processed as f64 / self.total as f64 * 100.0
        };
        let speed = if elapsed > 0.0 {
            self.processed as f64 / elapsed
        } else {
            0.0
        };
        let eta = if speed > 0.0 {
            Duration::from_secs_f64(remaining as f64 / speed)
        } else {
            ZERO_DURATION
        };

        Progress {
            processed: self.processed,
            failed: self.failed,
            total: self.total,
            remaining,
            percentage,
            speed,
            eta,
        }
    }
}

/// Result of a settled, successful download session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    pub total: u64,
    pub processed: u64,
    pub elapsed: Duration,
}

/// Download every tile in `plan` from `source` into `store`.
///
/// At most `concurrency` fetches are in flight at any time; this is a
/// hard cap, not a hint. Fetches are issued in plan order but complete
/// in any order; store writes and progress updates are serialized on the
/// calling task. The first fetch or write failure stops issuance, drops
/// in-flight work and settles the session with
/// [`Error::SessionAborted`]. The store's write session is closed on
/// every exit path.
pub async fn download(
    plan: &TilePlan,
    source: &dyn TileSource,
    store: &mut dyn TileStore,
    metadata: &StoreMetadata,
    concurrency: usize,
    progress: Option<&dyn ProgressSink>,
) -> Result<Summary> {
    assert!(concurrency > 0, "concurrency limit must be positive");

    store.begin_write().await.map_err(Error::StoreSessionFailed)?;
    let session = run_session(plan, source, store, metadata, concurrency, progress).await;
    let closed = store.end_write().await.map_err(Error::StoreSessionFailed);

    match (session, closed) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Err(err), _) => Err(err),
        (Ok(_), Err(err)) => Err(err),
    }
}

async fn run_session(
    plan: &TilePlan,
    source: &dyn TileSource,
    store: &mut dyn TileStore,
    metadata: &StoreMetadata,
    concurrency: usize,
    progress: Option<&dyn ProgressSink>,
) -> Result<Summary> {
    let mut session = DownloadSession::new(plan.total());
    info!(tiles = session.total, zoom = %plan.zoom(), "starting download session");

    store
        .put_metadata(metadata)
        .await
        .map_err(Error::StoreSessionFailed)?;

    let mut fetches = stream::iter(plan.tiles().iter().copied())
        .map(move |tile| async move { (tile, source.fetch_tile(tile).await) })
        .buffer_unordered(concurrency);

    while let Some(result) = fetches.next().await {
        let (tile, outcome): FetchResult = result;
        let resolved: Result<()> = match outcome {
            Ok(bytes) => store
                .put_tile(tile, &bytes)
                .await
                .map_err(|source| Error::StoreWriteFailed { tile, source }),
            Err(err) => Err(err),
        };

        session.resolve(resolved.is_err());
        if let Some(sink) = progress {
            sink.update(session.snapshot());
        }

        match resolved {
            Ok(()) => debug!(%tile, "stored tile"),
            Err(err) => {
                warn!(%tile, error = %err, "aborting download session");
                // Dropping the stream cancels in-flight fetches and
                // stops further issuance.
                return Err(Error::SessionAborted {
                    processed: session.processed,
                    total: session.total,
                    source: Box::new(err),
                });
            }
        }
    }

    let summary = Summary {
        total: session.total,
        processed: session.processed,
        elapsed: session.started_at.elapsed(),
    };
    info!(processed = summary.processed, "download session complete");
    Ok(summary)
}

/// Plan and download the region described by `cfg` in one call,
/// fetching over HTTP.
pub async fn download_region(
    cfg: &Config,
    store: &mut dyn TileStore,
    progress: Option<&dyn ProgressSink>,
) -> Result<Summary> {
    let plan = cfg.plan()?;
    let source = HttpTileSource::with_timeout(cfg.url.clone(), cfg.timeout)?;

    download(
        &plan,
        &source,
        store,
        &StoreMetadata::default(),
        cfg.concurrency,
        progress,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::BoundingBox;
    use crate::plan::ZoomRange;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn four_tile_plan() -> TilePlan {
        let bbox = BoundingBox::new(1.0, 1.0, -1.0, -1.0).unwrap();
        let plan = TilePlan::enumerate(&bbox, ZoomRange::single(1).unwrap());
        assert_eq!(plan.total(), 4);
        plan
    }

    struct StaticSource;

    #[async_trait]
    impl TileSource for StaticSource {
        async fn fetch_tile(&self, _tile: Tile) -> Result<Bytes> {
            Ok(Bytes::from_static(b"tile bytes"))
        }
    }

    struct FailingSource {
        poisoned: Tile,
    }

    #[async_trait]
    impl TileSource for FailingSource {
        async fn fetch_tile(&self, tile: Tile) -> Result<Bytes> {
            if tile == self.poisoned {
                Err(Error::TileFetchFailed {
                    tile,
                    source: Box::new(io::Error::new(io::ErrorKind::Other, "HTTP 503")),
                })
            } else {
                Ok(Bytes::from_static(b"tile bytes"))
            }
        }
    }

    /// Tracks how many fetches overlap.
    struct GaugedSource {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl GaugedSource {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TileSource for GaugedSource {
        async fn fetch_tile(&self, _tile: Tile) -> Result<Bytes> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(5)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Bytes::new())
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        begun: u32,
        ended: u32,
        metadata_writes: u32,
        tiles: Vec<Tile>,
        writing: bool,
    }

    #[async_trait]
    impl TileStore for RecordingStore {
        async fn begin_write(&mut self) -> io::Result<()> {
            assert!(!self.writing, "overlapping write sessions");
            self.begun += 1;
            self.writing = true;
            Ok(())
        }

        async fn put_metadata(&mut self, _metadata: &StoreMetadata) -> io::Result<()> {
            assert!(self.writing);
            self.metadata_writes += 1;
            Ok(())
        }

        async fn put_tile(&mut self, tile: Tile, _bytes: &[u8]) -> io::Result<()> {
            assert!(self.writing);
            self.tiles.push(tile);
            Ok(())
        }

        async fn end_write(&mut self) -> io::Result<()> {
            assert!(self.writing);
            self.ended += 1;
            self.writing = false;
            Ok(())
        }
    }

    #[tokio::test]
    async fn successful_session_stores_every_tile() {
        let plan = four_tile_plan();
        let mut store = RecordingStore::default();

        let summary = download(
            &plan,
            &StaticSource,
            &mut store,
            &StoreMetadata::default(),
            2,
            None,
        )
        .await
        .unwrap();

        assert_eq!(summary.total, 4);
        assert_eq!(summary.processed, 4);
        assert_eq!(store.begun, 1);
        assert_eq!(store.ended, 1);
        assert_eq!(store.metadata_writes, 1);

        let mut stored = store.tiles.clone();
        stored.sort_by_key(|t| (t.z, t.y, t.x));
        let mut planned = plan.tiles().to_vec();
        planned.sort_by_key(|t| (t.z, t.y, t.x));
        assert_eq!(stored, planned);
    }

    #[tokio::test]
    async fn progress_reaches_one_hundred_percent() {
        let plan = four_tile_plan();
        let mut store = RecordingStore::default();
        let snapshots = Mutex::new(Vec::new());
        let sink = |p: Progress| snapshots.lock().unwrap().push(p);

        download(
            &plan,
            &StaticSource,
            &mut store,
            &StoreMetadata::default(),
            2,
            Some(&sink),
        )
        .await
        .unwrap();

        let snapshots = snapshots.into_inner().unwrap();
        assert_eq!(snapshots.len(), 4);

        let last = snapshots.last().unwrap();
        assert_eq!(last.processed, 4);
        assert_eq!(last.remaining, 0);
        assert_eq!(last.failed, 0);
        assert!((last.percentage - 100.0).abs() < f64::EPSILON);

        // Counters only move forward.
        for window in snapshots.windows(2) {
            assert!(window[1].processed > window[0].processed);
        }
    }

    #[tokio::test]
    async fn first_failure_aborts_the_session() {
        let plan = four_tile_plan();
        let poisoned = plan.tiles()[1];
        let mut store = RecordingStore::default();

        let err = download(
            &plan,
            &FailingSource { poisoned },
            &mut store,
            &StoreMetadata::default(),
            1,
            None,
        )
        .await
        .unwrap_err();

        match err {
            Error::SessionAborted { total, source, .. } => {
                assert_eq!(total, 4);
                match *source {
                    Error::TileFetchFailed { tile, .. } => assert_eq!(tile, poisoned),
                    other => panic!("expected TileFetchFailed, got {:?}", other),
                }
            }
            other => panic!("expected SessionAborted, got {:?}", other),
        }

        // The write session is still bracketed exactly once, and the
        // failed tile never reached the store.
        assert_eq!(store.begun, 1);
        assert_eq!(store.ended, 1);
        assert!(!store.tiles.contains(&poisoned));
        // With concurrency 1 nothing is written past the failure.
        assert_eq!(store.tiles, vec![plan.tiles()[0]]);
    }

    #[tokio::test]
    async fn concurrency_limit_is_a_hard_cap() {
        let bbox = BoundingBox::new(5.0, 5.0, -5.0, -5.0).unwrap();
        let plan = TilePlan::enumerate(&bbox, ZoomRange::new(3, 5).unwrap());
        assert!(plan.total() >= 8);

        let source = GaugedSource::new();
        let mut store = RecordingStore::default();

        download(
            &plan,
            &source,
            &mut store,
            &StoreMetadata::default(),
            2,
            None,
        )
        .await
        .unwrap();

        assert!(source.peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn session_snapshot_math() {
        let mut session = DownloadSession::new(4);
        session.resolve(false);
        session.resolve(true);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.remaining, 2);
        assert!((snapshot.percentage - 50.0).abs() < f64::EPSILON);
    }
}
