use serde::Deserialize;

use crate::error::{Error, Result};
use crate::geo::BoundingBox;

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// A structured address for geocoding. Unset fields are omitted from the
/// query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Address {
    pub street: Option<String>,
    pub postalcode: Option<String>,
    pub city: Option<String>,
    pub county: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// A location to geocode.
///
/// Might be:
/// - `Location::Query("Paris, France".into())`
/// - `Location::Address(Address { city: Some("Paris".into()), country: Some("France".into()), ..Default::default() })`
#[derive(Clone, Debug, PartialEq)]
pub enum Location {
    Query(String),
    Address(Address),
}

impl Location {
    fn describe(&self) -> String {
        match self {
            Location::Query(q) => q.clone(),
            Location::Address(addr) => {
                let fields = [
                    &addr.street,
                    &addr.postalcode,
                    &addr.city,
                    &addr.county,
                    &addr.state,
                    &addr.country,
                ];
                fields
                    .into_iter()
                    .flatten()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }
    }
}

/// A geocoded place: its bounding box and the display name reported by
/// the geocoder.
#[derive(Clone, Debug, PartialEq)]
pub struct Place {
    pub bounding_box: BoundingBox,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    // south, north, west, east as decimal strings.
    boundingbox: [String; 4],
    display_name: String,
}

/// Look up a location via the Nominatim search API.
///
/// Fails with [`Error::GeocodeNotFound`] when the search yields no
/// result.
pub async fn search(client: &reqwest::Client, location: &Location) -> Result<Place> {
    let results: Vec<SearchResult> = client
        .get(NOMINATIM_URL)
        .query(&query_pairs(location))
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(Error::GeocodeFailed)?
        .json()
        .await
        .map_err(Error::GeocodeFailed)?;

    place_from_results(results, location)
}

fn query_pairs(location: &Location) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("format", "json".to_owned()),
        // Hopefully there will be just one result.
        ("limit", "1".to_owned()),
        // Avoids duplicates if possible.
        ("dedup", "1".to_owned()),
    ];

    match location {
        Location::Query(q) => pairs.push(("q", q.clone())),
        Location::Address(addr) => {
            let fields = [
                ("street", &addr.street),
                ("postalcode", &addr.postalcode),
                ("city", &addr.city),
                ("county", &addr.county),
                ("state", &addr.state),
                ("country", &addr.country),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    pairs.push((key, value.clone()));
                }
            }
        }
    }

    pairs
}

fn place_from_results(results: Vec<SearchResult>, location: &Location) -> Result<Place> {
    let result = results
        .into_iter()
        .next()
        .ok_or_else(|| Error::GeocodeNotFound {
            query: location.describe(),
        })?;

    let mut bounds = [0f64; 4];
    for (raw, parsed) in result.boundingbox.iter().zip(bounds.iter_mut()) {
        *parsed = raw.parse().map_err(|_| {
            Error::InvalidBoundingBox(format!("bad coordinate in geocoding response: {:?}", raw))
        })?;
    }
    let [south, north, west, east] = bounds;

    Ok(Place {
        bounding_box: BoundingBox::new(north, east, south, west)?,
        display_name: result.display_name,
    })
}
