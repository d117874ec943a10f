use std::io;
use std::path::Path;

use serde_json::{json, Map, Value};
use tokio::fs;

use dl_tiles::BoundingBox;

/// Save the resolved bounding box as a viewport into a JSON collection
/// keyed by city code:
///
/// ```json
/// { "<code>": { "map": { "viewport": { "ne": {...}, "sw": {...} } } } }
/// ```
///
/// The file is read-modified-written so other city codes and unrelated
/// keys survive; a missing or unparseable file starts a fresh
/// collection.
pub async fn save_viewport(file: &Path, code: &str, bbox: &BoundingBox) -> io::Result<()> {
    let mut collection: Map<String, Value> = match fs::read(file).await {
        Ok(raw) => serde_json::from_slice(&raw).unwrap_or_default(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Map::new(),
        Err(err) => return Err(err),
    };

    let viewport = json!({
        "ne": { "lat": bbox.north, "lng": bbox.east },
        "sw": { "lat": bbox.south, "lng": bbox.west },
    });

    let city = ensure_object(
        collection
            .entry(code.to_owned())
            .or_insert_with(|| Value::Object(Map::new())),
    );
    let map = ensure_object(
        city.entry("map".to_owned())
            .or_insert_with(|| Value::Object(Map::new())),
    );
    map.insert("viewport".to_owned(), viewport);

    let serialized = serde_json::to_vec_pretty(&collection).map_err(io::Error::from)?;
    fs::write(file, serialized).await
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just coerced to an object"),
    }
}
