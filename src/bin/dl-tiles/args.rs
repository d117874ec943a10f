use clap::{value_parser, Arg, ArgAction, Command};

use crate::validators::{parse_geo_coord, parse_positive_usize, parse_zoom_range};

pub const LOCATION_ARG: &str = "LOCATION";
pub const BBOX_NORTH_ARG: &str = "BBOX_NORTH";
pub const BBOX_SOUTH_ARG: &str = "BBOX_SOUTH";
pub const BBOX_WEST_ARG: &str = "BBOX_WEST";
pub const BBOX_EAST_ARG: &str = "BBOX_EAST";
pub const OUTPUT_ARG: &str = "OUTPUT";
pub const ZOOM_ARG: &str = "ZOOM";
pub const GLOBAL_ZOOM_ARG: &str = "GLOBAL_ZOOM";
pub const MAX_TILES_ARG: &str = "MAX_TILES";
pub const NO_SCALE_ARG: &str = "NO_SCALE";
pub const PARALLEL_FETCHES_ARG: &str = "PARALLEL_FETCHES";
pub const URL_ARG: &str = "URL";
pub const TIMEOUT_ARG: &str = "TIMEOUT";
pub const DRY_RUN_ARG: &str = "DRY_RUN";
pub const QUIET_ARG: &str = "QUIET";
pub const VIEWPORT_FILE_ARG: &str = "VIEWPORT_FILE";
pub const CITY_CODE_ARG: &str = "CITY_CODE";

pub fn command() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .arg(
            Arg::new(LOCATION_ARG)
                .help("Location to geocode into a bounding box, e.g. \"Paris, France\" (mutually exclusive with -n/-s/-e/-w)")
                .value_name("LOCATION")
                .index(1),
        )
        .arg(
            Arg::new(BBOX_NORTH_ARG)
                .help("Latitude of north bounding box boundary (in degrees)")
                .value_parser(parse_geo_coord)
                .allow_hyphen_values(true)
                .short('n')
                .long("north"),
        )
        .arg(
            Arg::new(BBOX_SOUTH_ARG)
                .help("Latitude of south bounding box boundary (in degrees)")
                .value_parser(parse_geo_coord)
                .allow_hyphen_values(true)
                .short('s')
                .long("south"),
        )
        .arg(
            Arg::new(BBOX_EAST_ARG)
                .help("Longitude of east bounding box boundary (in degrees)")
                .value_parser(parse_geo_coord)
                .allow_hyphen_values(true)
                .short('e')
                .long("east"),
        )
        .arg(
            Arg::new(BBOX_WEST_ARG)
                .help("Longitude of west bounding box boundary (in degrees)")
                .value_parser(parse_geo_coord)
                .allow_hyphen_values(true)
                .short('w')
                .long("west"),
        )
        .arg(
            Arg::new(ZOOM_ARG)
                .help("Zoom level for the region, a single value or an inclusive range")
                .value_parser(parse_zoom_range)
                .default_value("0-12")
                .short('z')
                .long("zoom"),
        )
        .arg(
            Arg::new(GLOBAL_ZOOM_ARG)
                .help("Zoom level for the whole-world overview pass, a single value or an inclusive range")
                .value_parser(parse_zoom_range)
                .default_value("0-3")
                .short('g')
                .long("global-zoom"),
        )
        .arg(
            Arg::new(MAX_TILES_ARG)
                .help("Maximum number of tiles to download per pass; 0 means unlimited")
                .value_parser(value_parser!(u64))
                .default_value("1000")
                .short('m')
                .long("max-tiles"),
        )
        .arg(
            Arg::new(NO_SCALE_ARG)
                .help("Fail when the tile count exceeds the budget instead of lowering the max zoom")
                .action(ArgAction::SetTrue)
                .long("no-scale"),
        )
        .arg(
            Arg::new(PARALLEL_FETCHES_ARG)
                .help("The amount of tiles fetched in parallel")
                .value_parser(parse_positive_usize)
                .default_value("2")
                .short('r')
                .long("rate"),
        )
        .arg(
            Arg::new(URL_ARG)
                .help("The URL with format specifiers `{x}`, `{y}`, `{z}` to fetch the tiles from. Also supports the specifier `{s}` which rotates through `a`, `b` and `c` to spread the load between mirror servers")
                .default_value(dl_tiles::DEFAULT_TILE_URL)
                .short('u')
                .long("url"),
        )
        .arg(
            Arg::new(OUTPUT_ARG)
                .help("The folder to write the tile store to")
                .default_value("tiles")
                .short('o')
                .long("output"),
        )
        .arg(
            Arg::new(TIMEOUT_ARG)
                .help("The timeout (in seconds) for fetching a single tile. Pass 0 for no timeout")
                .value_parser(value_parser!(u64))
                .default_value("10")
                .short('t')
                .long("timeout"),
        )
        .arg(
            Arg::new(DRY_RUN_ARG)
                .help("Don't actually fetch anything, just determine how many tiles would be fetched")
                .action(ArgAction::SetTrue)
                .long("dry-run"),
        )
        .arg(
            Arg::new(QUIET_ARG)
                .help("Suppress the progress bars")
                .action(ArgAction::SetTrue)
                .short('q')
                .long("quiet"),
        )
        .arg(
            Arg::new(VIEWPORT_FILE_ARG)
                .help("JSON file in which to save the resolved viewport")
                .value_name("FILE")
                .long("viewport-file")
                .requires(CITY_CODE_ARG),
        )
        .arg(
            Arg::new(CITY_CODE_ARG)
                .help("IATA code of the current city, required to save the viewport")
                .value_name("CODE")
                .long("city-code")
                .requires(VIEWPORT_FILE_ARG),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dl_tiles::ZoomRange;

    #[test]
    fn defaults_match_the_documented_surface() {
        let matches = command().get_matches_from(["dl-tiles", "Paris, France"]);

        assert_eq!(
            matches.get_one::<ZoomRange>(ZOOM_ARG).copied().unwrap(),
            ZoomRange::new(0, 12).unwrap()
        );
        assert_eq!(
            matches.get_one::<ZoomRange>(GLOBAL_ZOOM_ARG).copied().unwrap(),
            ZoomRange::new(0, 3).unwrap()
        );
        assert_eq!(matches.get_one::<u64>(MAX_TILES_ARG).copied(), Some(1000));
        assert_eq!(matches.get_one::<usize>(PARALLEL_FETCHES_ARG).copied(), Some(2));
        assert!(!matches.get_flag(DRY_RUN_ARG));
    }

    #[test]
    fn viewport_flags_come_in_pairs() {
        assert!(command()
            .try_get_matches_from(["dl-tiles", "--viewport-file", "v.json", "Paris"])
            .is_err());

        let matches = command().get_matches_from([
            "dl-tiles",
            "--viewport-file",
            "v.json",
            "--city-code",
            "PAR",
            "Paris",
        ]);
        assert_eq!(
            matches.get_one::<String>(CITY_CODE_ARG).map(String::as_str),
            Some("PAR")
        );
    }

    #[test]
    fn bounding_box_flags_accept_negatives() {
        let matches = command().get_matches_from([
            "dl-tiles", "-n", "34.337", "-e", "-118.155", "-s", "33.704", "-w", "-118.668",
        ]);

        assert_eq!(
            matches.get_one::<f64>(BBOX_EAST_ARG).copied(),
            Some(-118.155)
        );
        assert_eq!(matches.get_one::<String>(LOCATION_ARG), None);
    }
}
