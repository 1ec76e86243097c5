/// WGS84 to Swiss national grid, by the published approximation polynomials
///
/// This is the fixed-coefficient empirical solution (accurate to about a
/// meter inside Switzerland), not the rigorous iterative transformation.
/// Latitude and longitude are converted to arc-seconds, shifted against the
/// Bern reference meridian, and fed through two cubic polynomials.
///
/// Results are rounded to the nearest whole meter. Rounding is
/// half-away-from-zero (`f64::round`), matching the reference outputs in the
/// tests below to the meter.
pub fn wgs84_to_lv03(lat: f64, lng: f64) -> (f64, f64) {
    let phi = lat * 3600.0;
    let lambda = lng * 3600.0;

    // Auxiliary variables around the Bern reference point
    let p = (phi - 169_028.66) / 10_000.0;
    let l = (lambda - 26_782.5) / 10_000.0;

    let y = 200_147.07 + 308_807.95 * p + 3_745.25 * l * l + 76.63 * p * p
        + 119.79 * p * p * p
        - 194.56 * l * l * p;
    let x = 600_072.37 + 211_455.93 * l - 10_938.51 * l * p - 0.36 * l * p * p - 44.54 * l * l * l;

    (x.round(), y.round())
}

/// Same polynomial as [`wgs84_to_lv03`], shifted into the modern frame.
///
/// The modern frame adds a false easting of 2,000,000 m and a false northing
/// of 1,000,000 m. Coefficients and rounding are identical to the local
/// frame.
pub fn wgs84_to_lv95(lat: f64, lng: f64) -> (f64, f64) {
    let (x, y) = wgs84_to_lv03(lat, lng);
    (x + 2_000_000.0, y + 1_000_000.0)
}
