use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use maplit::hashmap;
use strfmt::strfmt;

use crate::error::{Error, Result};
use crate::tile::Tile;

const OSM_SERVERS: &[&str] = &["a", "b", "c"];

/// Default tile source.
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// A tile URL template with the replacement specifiers `{x}`, `{y}` and
/// `{z}`, plus an optional `{s}` that rotates through the `a`/`b`/`c`
/// subdomains to spread load between mirror servers.
pub struct UrlFormat {
    next_server: AtomicUsize,
    format_str: String,
}

impl UrlFormat {
    pub fn from_string(format_str: String) -> Self {
        Self {
            next_server: AtomicUsize::new(0),
            format_str,
        }
    }

    /// The canonical URL for one tile.
    pub fn tile_url(&self, tile: &Tile) -> Result<String> {
        let inc = self.next_server.fetch_add(1, Ordering::Relaxed);
        let vars = hashmap! {
            "s".to_owned() => OSM_SERVERS[inc % OSM_SERVERS.len()].to_owned(),
            "x".to_owned() => tile.x.to_string(),
            "y".to_owned() => tile.y.to_string(),
            "z".to_owned() => tile.z.to_string(),
        };

        strfmt(&self.format_str, &vars).map_err(Error::UrlFormat)
    }
}

impl Default for UrlFormat {
    fn default() -> Self {
        Self::from_string(DEFAULT_TILE_URL.to_owned())
    }
}

impl Clone for UrlFormat {
    fn clone(&self) -> Self {
        Self::from_string(self.format_str.clone())
    }
}

impl PartialEq for UrlFormat {
    fn eq(&self, other: &Self) -> bool {
        self.format_str == other.format_str
    }
}

impl fmt::Debug for UrlFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlFormat")
            .field("format_str", &self.format_str)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_tile_coordinates() {
        let fmt = UrlFormat::default();
        let url = fmt.tile_url(&Tile::new(2, 3, 4)).unwrap();
        assert_eq!(url, "https://tile.openstreetmap.org/4/2/3.png");
    }

    #[test]
    fn rotates_subdomains() {
        let fmt = UrlFormat::from_string("https://{s}.tile.example.org/{z}/{x}/{y}.png".into());
        let tile = Tile::new(0, 0, 0);

        let urls: Vec<_> = (0..3).map(|_| fmt.tile_url(&tile).unwrap()).collect();
        assert!(urls[0].starts_with("https://a."));
        assert!(urls[1].starts_with("https://b."));
        assert!(urls[2].starts_with("https://c."));
    }

    #[test]
    fn rejects_unknown_specifiers() {
        let fmt = UrlFormat::from_string("https://example.org/{nope}.png".into());
        assert!(matches!(
            fmt.tile_url(&Tile::new(0, 0, 0)),
            Err(Error::UrlFormat(_))
        ));
    }
}
