use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tokio::fs;

use crate::tile::Tile;

/// Descriptor written into the store alongside the tiles.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoreMetadata {
    pub name: String,
    pub description: String,
    pub format: String,
    pub kind: String,
    pub version: String,
}

impl Default for StoreMetadata {
    fn default() -> Self {
        Self {
            name: "dl-tiles".to_owned(),
            description: String::new(),
            format: "png".to_owned(),
            kind: "baselayer".to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// A destination for downloaded tiles.
///
/// Writes are bracketed by a single exclusive session: `begin_write`
/// before the first write, `end_write` after the last, including on
/// error paths. Within a session single-tile writes may arrive in any
/// order.
#[async_trait]
pub trait TileStore: Send {
    async fn begin_write(&mut self) -> io::Result<()>;
    async fn put_metadata(&mut self, metadata: &StoreMetadata) -> io::Result<()>;
    async fn put_tile(&mut self, tile: Tile, bytes: &[u8]) -> io::Result<()>;
    async fn end_write(&mut self) -> io::Result<()>;
}

/// A tile store laying tiles out as `z/x/y.png` files under a root
/// folder, with the metadata descriptor in `metadata.json`.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    writing: bool,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            writing: false,
        }
    }

    fn ensure_writing(&self) -> io::Result<()> {
        if self.writing {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no write session is open",
            ))
        }
    }
}

#[async_trait]
impl TileStore for DirectoryStore {
    async fn begin_write(&mut self) -> io::Result<()> {
        if self.writing {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "a write session is already open",
            ));
        }

        fs::create_dir_all(&self.root).await?;
        self.writing = true;
        Ok(())
    }

    async fn put_metadata(&mut self, metadata: &StoreMetadata) -> io::Result<()> {
        self.ensure_writing()?;

        let json = serde_json::to_vec_pretty(metadata).map_err(io::Error::from)?;
        fs::write(self.root.join("metadata.json"), json).await
    }

    async fn put_tile(&mut self, tile: Tile, bytes: &[u8]) -> io::Result<()> {
        self.ensure_writing()?;

        let mut target = self.root.join(tile.z.to_string());
        target.push(tile.x.to_string());
        fs::create_dir_all(&target).await?;
        target.push(format!("{}.png", tile.y));

        fs::write(target, bytes).await
    }

    async fn end_write(&mut self) -> io::Result<()> {
        self.ensure_writing()?;
        self.writing = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());

        store.begin_write().await.unwrap();
        store.put_metadata(&StoreMetadata::default()).await.unwrap();
        store
            .put_tile(Tile::new(1, 2, 3), b"not actually a png")
            .await
            .unwrap();
        store.end_write().await.unwrap();

        let tile_path = dir.path().join("3").join("1").join("2.png");
        assert_eq!(std::fs::read(tile_path).unwrap(), b"not actually a png");

        let metadata = std::fs::read_to_string(dir.path().join("metadata.json")).unwrap();
        assert!(metadata.contains("\"format\": \"png\""));
        assert!(metadata.contains("\"kind\": \"baselayer\""));
    }

    #[tokio::test]
    async fn rejects_overlapping_write_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());

        store.begin_write().await.unwrap();
        assert!(store.begin_write().await.is_err());

        store.end_write().await.unwrap();
        // A fresh session is fine once the previous one is closed.
        store.begin_write().await.unwrap();
        store.end_write().await.unwrap();
    }

    #[tokio::test]
    async fn writes_outside_a_session_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DirectoryStore::new(dir.path());

        assert!(store.put_tile(Tile::new(0, 0, 0), b"x").await.is_err());
        assert!(store.end_write().await.is_err());
    }
}
