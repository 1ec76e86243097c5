use crate::error::PipelineError;
use crate::grid::{ElevationGrid, GridEntry, GridMeta};

const HEADER_LINES: usize = 6;
const HEADER_KEYS: [&str; HEADER_LINES] = [
    "ncols",
    "nrows",
    "xllcorner",
    "yllcorner",
    "cellsize",
    "nodata_value",
];

/// Parse an ASCII-grid raster into a typed grid.
///
/// The header is exactly six `key value` lines (case-insensitive keys, any
/// order, no duplicates, no extras), followed by `nrows * ncols`
/// whitespace-separated heights in row-major order starting at the
/// northern-most row. Line breaks inside the data block carry no meaning.
///
/// The no-data sentinel is replaced by `f64::NAN`. A sample count that does
/// not match the header fails the parse; no partial grid is ever returned.
pub fn parse_ascii_grid(text: &str) -> Result<GridEntry, PipelineError> {
    let mut lines = text.lines();
    let mut header: [Option<f64>; HEADER_LINES] = [None; HEADER_LINES];

    for _ in 0..HEADER_LINES {
        let line = lines.next().ok_or_else(|| {
            PipelineError::CorruptSourceData("truncated header: expected 6 lines".to_string())
        })?;
        let mut tokens = line.split_whitespace();
        let (key, value) = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(k), Some(v), None) => (k.to_ascii_lowercase(), v),
            _ => {
                return Err(PipelineError::CorruptSourceData(format!(
                    "header line is not a key-value pair: {line:?}"
                )));
            }
        };
        let slot = HEADER_KEYS
            .iter()
            .position(|&k| k == key)
            .ok_or_else(|| {
                PipelineError::CorruptSourceData(format!("unknown header key {key:?}"))
            })?;
        if header[slot].is_some() {
            return Err(PipelineError::CorruptSourceData(format!(
                "duplicate header key {key:?}"
            )));
        }
        let value: f64 = value.parse().map_err(|_| {
            PipelineError::CorruptSourceData(format!("unparsable header value for {key:?}"))
        })?;
        header[slot] = Some(value);
    }

    let meta = GridMeta {
        ncols: dimension(header[0], "ncols")?,
        nrows: dimension(header[1], "nrows")?,
        xllcorner: header[2].unwrap_or_default(),
        yllcorner: header[3].unwrap_or_default(),
        cellsize: header[4].unwrap_or_default(),
        nodata_value: header[5].unwrap_or_default(),
    };
    if meta.cellsize <= 0.0 {
        return Err(PipelineError::CorruptSourceData(format!(
            "cellsize must be positive, got {}",
            meta.cellsize
        )));
    }

    let expected = meta.nrows * meta.ncols;
    let mut values = Vec::with_capacity(expected);
    for token in lines.flat_map(str::split_whitespace) {
        let v: f64 = token.parse().map_err(|_| {
            PipelineError::CorruptSourceData(format!("unparsable height sample {token:?}"))
        })?;
        values.push(if v == meta.nodata_value { f64::NAN } else { v });
    }
    if values.len() != expected {
        return Err(PipelineError::CorruptSourceData(format!(
            "expected {expected} samples ({} rows x {} cols), got {}",
            meta.nrows,
            meta.ncols,
            values.len()
        )));
    }

    // Column axis west->east; row axis built south->north, then flipped so
    // index 0 is the northern-most row, matching the file order.
    let x_axis: Vec<f64> = (0..meta.ncols)
        .map(|i| meta.xllcorner + meta.cellsize * i as f64)
        .collect();
    let mut y_axis: Vec<f64> = (0..meta.nrows)
        .map(|j| meta.yllcorner + meta.cellsize * j as f64)
        .collect();
    y_axis.reverse();

    Ok(GridEntry {
        meta,
        grid: ElevationGrid {
            x_axis,
            y_axis,
            values,
        },
    })
}

fn dimension(value: Option<f64>, key: &str) -> Result<usize, PipelineError> {
    let v = value.unwrap_or_default();
    if v.fract() == 0.0 && v >= 1.0 {
        Ok(v as usize)
    } else {
        Err(PipelineError::CorruptSourceData(format!(
            "{key} must be a positive integer, got {v}"
        )))
    }
}
