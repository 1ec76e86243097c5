use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::SourceConfig;
use crate::error::PipelineError;
use crate::grid::{GridEntry, ascii::parse_ascii_grid};

const USER_AGENT: &str = "alpenstein/0.1.0 (https://github.com/alpenstein/alpenstein)";

/// Elevation-grid resolution class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// 200 m grid, the default dataset.
    Standard,
    /// 25 m grid, the sponsor dataset.
    High,
}

impl Tier {
    /// Cache key, also the swisstopo dataset name.
    pub fn key(self) -> &'static str {
        match self {
            Tier::Standard => "dhm200",
            Tier::High => "dhm25",
        }
    }

    fn index(self) -> usize {
        match self {
            Tier::Standard => 0,
            Tier::High => 1,
        }
    }
}

/// Where archive bytes come from. The default is HTTP; tests substitute an
/// in-memory source to count fetches.
pub trait GridSource: Send + Sync {
    fn fetch(&self, tier: Tier, url: &str) -> Result<Vec<u8>, PipelineError>;
}

/// Downloads the tier archive over HTTPS.
pub struct HttpSource {
    timeout: Duration,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GridSource for HttpSource {
    fn fetch(&self, tier: Tier, url: &str) -> Result<Vec<u8>, PipelineError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(|e| PipelineError::SourceUnavailable(format!("http client: {e}")))?;

        let response = client.get(url).send().map_err(|e| {
            PipelineError::SourceUnavailable(format!("fetching {} archive: {e}", tier.key()))
        })?;

        if !response.status().is_success() {
            return Err(PipelineError::SourceUnavailable(format!(
                "{} archive request returned status {}",
                tier.key(),
                response.status()
            )));
        }

        let bytes = response.bytes().map_err(|e| {
            PipelineError::SourceUnavailable(format!("reading {} archive body: {e}", tier.key()))
        })?;
        Ok(bytes.to_vec())
    }
}

/// Cached, tier-keyed access to the swisstopo elevation grids.
///
/// Each tier is guarded by its own lock: concurrent requests for an uncached
/// tier serialize behind the in-flight download instead of fetching twice.
/// Parsed grids are memoized as `Arc`s and shared read-only across requests;
/// the disk entry is written via temp-file-then-rename so readers never see
/// a partial cache file.
pub struct GridStore {
    cache_dir: PathBuf,
    config: SourceConfig,
    source: Box<dyn GridSource>,
    slots: [Mutex<Option<Arc<GridEntry>>>; 2],
}

impl GridStore {
    pub fn new(cache_dir: PathBuf, config: SourceConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self::with_source(cache_dir, config, Box::new(HttpSource::new(timeout)))
    }

    pub fn with_source(
        cache_dir: PathBuf,
        config: SourceConfig,
        source: Box<dyn GridSource>,
    ) -> Self {
        Self {
            cache_dir,
            config,
            source,
            slots: [Mutex::new(None), Mutex::new(None)],
        }
    }

    /// Load the elevation grid for a tier, from memory, disk cache, or the
    /// remote source, in that order.
    ///
    /// A corrupt disk entry is treated as a miss: the file is removed and
    /// the archive downloaded again. If that download fails too, the error
    /// is [`PipelineError::SourceUnavailable`].
    pub fn get_elevation(&self, tier: Tier) -> Result<Arc<GridEntry>, PipelineError> {
        let mut slot = self.slots[tier.index()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = slot.as_ref() {
            return Ok(entry.clone());
        }

        let path = self.cache_path(tier);
        match read_cache_entry(&path) {
            Ok(Some(entry)) => {
                let entry = Arc::new(entry);
                *slot = Some(entry.clone());
                return Ok(entry);
            }
            Ok(None) => {}
            Err(_) => {
                // Corrupt entry: drop it and fall through to a fresh download
                let _ = std::fs::remove_file(&path);
            }
        }

        let url = match tier {
            Tier::Standard => &self.config.standard_url,
            Tier::High => &self.config.high_url,
        };
        let archive = self.source.fetch(tier, url)?;
        let text = extract_single_asc(&archive)?;
        let entry = parse_ascii_grid(&text)?;
        write_cache_entry(&path, &entry)?;

        let entry = Arc::new(entry);
        *slot = Some(entry.clone());
        Ok(entry)
    }

    pub fn cache_path(&self, tier: Tier) -> PathBuf {
        self.cache_dir.join(format!("{}.grid", tier.key()))
    }
}

/// Locate and read the single `.asc` raster inside the archive.
///
/// The tier archives each carry exactly one grid file; zero or several
/// matches mean the upstream layout changed and the load must fail.
pub fn extract_single_asc(bytes: &[u8]) -> Result<String, PipelineError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::CorruptSourceData(format!("unreadable archive: {e}")))?;

    let mut matches = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| PipelineError::CorruptSourceData(format!("archive entry {i}: {e}")))?;
        if entry.is_file() && entry.name().to_ascii_lowercase().ends_with(".asc") {
            matches.push(i);
        }
    }
    if matches.len() != 1 {
        return Err(PipelineError::CorruptSourceData(format!(
            "expected exactly one .asc file in archive, found {}",
            matches.len()
        )));
    }

    let mut file = archive
        .by_index(matches[0])
        .map_err(|e| PipelineError::CorruptSourceData(format!("archive entry: {e}")))?;
    let mut text = String::new();
    file.read_to_string(&mut text)
        .map_err(|e| PipelineError::CorruptSourceData(format!("reading raster entry: {e}")))?;
    Ok(text)
}

/// `Ok(None)` is a plain miss; a present-but-undecodable file is
/// [`PipelineError::CacheCorruption`].
fn read_cache_entry(path: &Path) -> Result<Option<GridEntry>, PipelineError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let (entry, consumed): (GridEntry, usize) =
        bincode::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(|e| PipelineError::CacheCorruption(e.to_string()))?;
    if consumed != bytes.len()
        || entry.grid.values.len() != entry.grid.x_axis.len() * entry.grid.y_axis.len()
    {
        return Err(PipelineError::CacheCorruption(
            "cache entry has inconsistent dimensions".to_string(),
        ));
    }
    Ok(Some(entry))
}

/// Atomic with respect to readers: encode to a sibling temp file, then
/// rename over the final path.
fn write_cache_entry(path: &Path, entry: &GridEntry) -> Result<(), PipelineError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let bytes = bincode::encode_to_vec(entry, bincode::config::standard())
        .map_err(std::io::Error::other)?;
    let tmp = path.with_extension("grid.tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    const ASC: &str = "\
ncols 3
nrows 2
xllcorner 600000
yllcorner 199000
cellsize 25
nodata_value -9999
401.5 402.5 -9999
404.0 405.0 406.0
";

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();
            for (name, content) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    struct CountingSource {
        archive: Vec<u8>,
        fetches: AtomicUsize,
    }

    impl CountingSource {
        fn new(archive: Vec<u8>) -> Arc<Self> {
            Arc::new(Self {
                archive,
                fetches: AtomicUsize::new(0),
            })
        }
    }

    impl GridSource for Arc<CountingSource> {
        fn fetch(&self, _tier: Tier, _url: &str) -> Result<Vec<u8>, PipelineError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.archive.clone())
        }
    }

    struct FailingSource;

    impl GridSource for FailingSource {
        fn fetch(&self, tier: Tier, _url: &str) -> Result<Vec<u8>, PipelineError> {
            Err(PipelineError::SourceUnavailable(format!(
                "no network in tests ({})",
                tier.key()
            )))
        }
    }

    fn store_with(dir: &Path, source: Arc<CountingSource>) -> GridStore {
        GridStore::with_source(dir.to_path_buf(), SourceConfig::default(), Box::new(source))
    }

    #[test]
    fn test_second_load_hits_cache() {
        let dir = tempdir().unwrap();
        let source = CountingSource::new(zip_with(&[("mm/dhm.asc", ASC)]));
        let store = store_with(dir.path(), source.clone());

        let first = store.get_elevation(Tier::Standard).unwrap();
        let second = store.get_elevation(Tier::Standard).unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));

        // A fresh store instance reads the disk entry, still no new download
        let store2 = store_with(dir.path(), source.clone());
        let third = store2.get_elevation(Tier::Standard).unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(third.meta, first.meta);
    }

    #[test]
    fn test_cache_round_trips_exactly() {
        let dir = tempdir().unwrap();
        let source = CountingSource::new(zip_with(&[("dhm.asc", ASC)]));
        let store = store_with(dir.path(), source);

        let entry = store.get_elevation(Tier::Standard).unwrap();
        let reread = read_cache_entry(&store.cache_path(Tier::Standard))
            .unwrap()
            .unwrap();

        assert_eq!(reread.meta, entry.meta);
        assert_eq!(reread.grid.x_axis, entry.grid.x_axis);
        assert_eq!(reread.grid.y_axis, entry.grid.y_axis);
        // Bit-exact, NaN markers included
        let bits = |vs: &[f64]| vs.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&reread.grid.values), bits(&entry.grid.values));
    }

    #[test]
    fn test_corrupt_cache_forces_one_redownload() {
        let dir = tempdir().unwrap();
        let source = CountingSource::new(zip_with(&[("dhm.asc", ASC)]));
        let store = store_with(dir.path(), source.clone());

        std::fs::write(store.cache_path(Tier::Standard), b"not a grid entry").unwrap();
        let entry = store.get_elevation(Tier::Standard).unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(entry.meta.ncols, 3);

        // The rewritten entry is readable again
        assert!(
            read_cache_entry(&store.cache_path(Tier::Standard))
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_sample_mismatch_writes_no_cache() {
        let dir = tempdir().unwrap();
        let truncated = ASC.replace("404.0 405.0 406.0", "404.0 405.0");
        let source = CountingSource::new(zip_with(&[("dhm.asc", truncated.as_str())]));
        let store = store_with(dir.path(), source);

        let err = store.get_elevation(Tier::Standard).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptSourceData(_)));
        assert!(!store.cache_path(Tier::Standard).exists());
    }

    #[test]
    fn test_archive_must_contain_one_asc() {
        let none = zip_with(&[("readme.txt", "hi")]);
        assert!(matches!(
            extract_single_asc(&none),
            Err(PipelineError::CorruptSourceData(_))
        ));

        let two = zip_with(&[("a.asc", ASC), ("b.ASC", ASC)]);
        assert!(matches!(
            extract_single_asc(&two),
            Err(PipelineError::CorruptSourceData(_))
        ));

        let one = zip_with(&[("folder/c.AsC", ASC), ("notes.txt", "x")]);
        assert_eq!(extract_single_asc(&one).unwrap(), ASC);
    }

    #[test]
    fn test_fetch_failure_surfaces_source_unavailable() {
        let dir = tempdir().unwrap();
        let store = GridStore::with_source(
            dir.path().to_path_buf(),
            SourceConfig::default(),
            Box::new(FailingSource),
        );
        let err = store.get_elevation(Tier::High).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    }

    #[test]
    fn test_concurrent_loads_download_once() {
        let dir = tempdir().unwrap();
        let source = CountingSource::new(zip_with(&[("dhm.asc", ASC)]));
        let store = store_with(dir.path(), source.clone());

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| store.get_elevation(Tier::Standard).unwrap());
            }
        });
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tiers_cache_independently() {
        let dir = tempdir().unwrap();
        let source = CountingSource::new(zip_with(&[("dhm.asc", ASC)]));
        let store = store_with(dir.path(), source.clone());

        store.get_elevation(Tier::Standard).unwrap();
        store.get_elevation(Tier::High).unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert!(store.cache_path(Tier::Standard).exists());
        assert!(store.cache_path(Tier::High).exists());
    }
}
