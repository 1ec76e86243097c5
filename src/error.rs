use thiserror::Error;

/// Failure kinds of the geodata-to-solid pipeline.
///
/// Each variant is a distinct, inspectable condition; none of them is ever
/// collapsed into an empty or default result. The caller decides how to
/// present them.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network fetch or archive download failed. Not retried here.
    #[error("elevation source unavailable: {0}")]
    SourceUnavailable(String),

    /// The downloaded data does not describe a usable grid: wrong number of
    /// raster files in the archive, malformed header, or a sample count that
    /// does not match rows x cols.
    #[error("corrupt source data: {0}")]
    CorruptSourceData(String),

    /// Every height sample inside the clip window is missing.
    #[error("no elevation data in the selected area")]
    NoDataInSelection,

    /// The polygon is too small or collapsed to extrude into a solid.
    #[error("degenerate polygon: {0}")]
    DegenerateGeometry(String),

    /// A cache entry could not be deserialized. The store recovers from this
    /// by re-downloading; it only surfaces when a cache file is inspected
    /// directly.
    #[error("cache entry corrupt: {0}")]
    CacheCorruption(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
