use dl_tiles::ZoomRange;

pub fn parse_geo_coord(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("{:?} is not a number", s))?;

    if (-180.0..=180.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} is out of range [-180, 180]", value))
    }
}

pub fn parse_zoom_range(s: &str) -> Result<ZoomRange, String> {
    s.parse().map_err(|err: dl_tiles::Error| err.to_string())
}

pub fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("{:?} is not a positive integer", s))?;

    if value > 0 {
        Ok(value)
    } else {
        Err("must be greater than zero".to_owned())
    }
}
