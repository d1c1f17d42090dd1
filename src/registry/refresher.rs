use std::fs;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::registry::{DatasetImporter, Downloader};

/// Marker file persisted inside the dataset directory after a successful
/// import.
const LAST_UPDATED_FILE: &str = "lastupdated.prop";
const LAST_UPDATED_KEY: &str = "lastupdated";
/// Key exposed by the remote metadata resource, epoch milliseconds.
const META_TIMESTAMP_KEY: &str = "lastModifiedDate";

/// Keeps the local naming dataset current by comparing the remote
/// "last modified" marker against a locally persisted timestamp, downloading
/// a fresh export only when the remote copy is newer.
///
/// No locking is performed: concurrent `refresh()` calls against one dataset
/// directory race, and the marker reflects whichever writer finishes last.
/// Processes sharing a dataset directory must impose external mutual
/// exclusion (e.g. an advisory lock) before calling [`refresh`](Self::refresh).
pub struct CachedDatasetRefresher<D, I> {
    settings: Settings,
    downloader: D,
    importer: I,
}

impl<D: Downloader, I: DatasetImporter> CachedDatasetRefresher<D, I> {
    pub fn new(settings: Settings, downloader: D, importer: I) -> Self {
        CachedDatasetRefresher {
            settings,
            downloader,
            importer,
        }
    }

    /// Exposes the import collaborator for inspection.
    pub fn importer(&self) -> &I {
        &self.importer
    }

    /// Exposes the transport collaborator for inspection.
    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    /// Determine whether the dataset needs a refresh.
    ///
    /// Returns the remote timestamp when a refresh is required and `0` when
    /// the local copy is current. An unreachable metadata resource, or one
    /// without a usable timestamp, is a hard error: treating it as "no
    /// update" would serve a stale dataset indefinitely.
    pub fn check_refresh_needed(&self) -> Result<i64> {
        let remote = self.remote_timestamp()?;

        let dataset_dir = &self.settings.dataset_dir;
        if !dataset_dir.exists() {
            return Ok(remote);
        }
        let marker = dataset_dir.join(LAST_UPDATED_FILE);
        if !marker.exists() {
            return Ok(remote);
        }

        let stored = read_marker(&marker);
        if remote > stored {
            Ok(remote)
        } else {
            Ok(0)
        }
    }

    /// Download and import a fresh dataset if the remote copy is newer.
    ///
    /// A failed download leaves the existing dataset and marker untouched.
    /// The marker is only written after a successful import, so a partial
    /// refresh is retried on the next call.
    pub fn refresh(&mut self) -> Result<()> {
        let timestamp = self.check_refresh_needed()?;
        if timestamp == 0 {
            debug!("dataset is current, skipping refresh");
            return Ok(());
        }

        let temp = NamedTempFile::new()?;
        if let Err(e) = self
            .downloader
            .fetch_file(&self.settings.dataset_url, temp.path(), true)
        {
            warn!("dataset download failed, keeping existing dataset: {}", e);
            close_temp(temp);
            return Ok(());
        }

        let imported = self.importer.import(temp.path());
        close_temp(temp);
        imported?;

        self.write_marker(timestamp);
        Ok(())
    }

    fn remote_timestamp(&self) -> Result<i64> {
        let temp = NamedTempFile::new()?;
        let fetched = self
            .downloader
            .fetch_file(&self.settings.dataset_meta_url, temp.path(), false)
            .and_then(|_| {
                let content = fs::read_to_string(temp.path())?;
                Ok(read_key(&content, META_TIMESTAMP_KEY).unwrap_or(0))
            });
        close_temp(temp);

        let timestamp = fetched?;
        if timestamp == 0 {
            return Err(Error::Transport(format!(
                "remote metadata did not contain a valid {}",
                META_TIMESTAMP_KEY
            )));
        }
        Ok(timestamp)
    }

    fn write_marker(&self, timestamp: i64) {
        let dir = &self.settings.dataset_dir;
        let written = fs::create_dir_all(dir).and_then(|_| {
            fs::write(
                dir.join(LAST_UPDATED_FILE),
                format!("{}={}\n", LAST_UPDATED_KEY, timestamp),
            )
        });
        if let Err(e) = written {
            // Not fatal: the next run re-imports the same export.
            warn!("could not persist dataset refresh marker: {}", e);
        }
    }
}

/// Stored marker timestamp, or 0 when the marker is unreadable or
/// unparseable ("no prior update").
fn read_marker(path: &Path) -> i64 {
    match fs::read_to_string(path) {
        Ok(content) => read_key(&content, LAST_UPDATED_KEY).unwrap_or_else(|| {
            debug!("unparseable marker file {} treated as never updated", path.display());
            0
        }),
        Err(e) => {
            debug!("unreadable marker file {}: {}", path.display(), e);
            0
        }
    }
}

/// Read `key=<int64>` from a small key/value text record.
fn read_key(content: &str, key: &str) -> Option<i64> {
    content.lines().find_map(|line| {
        let (k, v) = line.split_once('=')?;
        if k.trim() == key {
            v.trim().parse::<i64>().ok()
        } else {
            None
        }
    })
}

/// Remove a temporary download. Deletion failures are logged; the OS temp
/// cleaner is the fallback.
fn close_temp(temp: NamedTempFile) {
    if let Err(e) = temp.close() {
        warn!("could not remove temporary download file: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct FakeDownloader {
        /// `lastModifiedDate` record served for the meta URL, `None` for a
        /// transport failure.
        meta: Option<String>,
        /// Bytes served for the dataset URL, `None` for a transport failure.
        dataset: Option<Vec<u8>>,
        fetched: RefCell<Vec<String>>,
    }

    impl FakeDownloader {
        fn new(meta: Option<&str>, dataset: Option<&[u8]>) -> Self {
            FakeDownloader {
                meta: meta.map(String::from),
                dataset: dataset.map(Vec::from),
                fetched: RefCell::new(Vec::new()),
            }
        }
    }

    impl Downloader for FakeDownloader {
        fn fetch_file(&self, url: &str, destination: &Path, _use_proxy: bool) -> Result<()> {
            self.fetched.borrow_mut().push(url.to_string());
            let body: Vec<u8> = if url.ends_with(".meta") {
                self.meta
                    .as_ref()
                    .ok_or_else(|| Error::Transport("meta unreachable".into()))?
                    .clone()
                    .into_bytes()
            } else {
                self.dataset
                    .as_ref()
                    .ok_or_else(|| Error::Transport("dataset unreachable".into()))?
                    .clone()
            };
            fs::write(destination, body)?;
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingImporter {
        imported: Vec<PathBuf>,
        fail: bool,
    }

    impl DatasetImporter for RecordingImporter {
        fn import(&mut self, path: &Path) -> Result<()> {
            if self.fail {
                return Err(Error::MalformedData("bad export".into()));
            }
            assert!(path.exists(), "import must see the downloaded file");
            self.imported.push(path.to_path_buf());
            Ok(())
        }
    }

    fn settings(base: &TempDir) -> Settings {
        Settings {
            dataset_dir: base.path().join("cpe"),
            dataset_meta_url: "https://example.org/cpe.meta".to_string(),
            dataset_url: "https://example.org/cpe.xml".to_string(),
            proxy_url: None,
        }
    }

    fn refresher(
        base: &TempDir,
        meta: Option<&str>,
        dataset: Option<&[u8]>,
    ) -> CachedDatasetRefresher<FakeDownloader, RecordingImporter> {
        CachedDatasetRefresher::new(
            settings(base),
            FakeDownloader::new(meta, dataset),
            RecordingImporter::default(),
        )
    }

    fn write_marker_file(base: &TempDir, content: &str) {
        let dir = base.path().join("cpe");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(LAST_UPDATED_FILE), content).unwrap();
    }

    #[test]
    fn test_missing_dataset_dir_forces_refresh() {
        let base = TempDir::new().unwrap();
        let r = refresher(&base, Some("lastModifiedDate=1337\n"), None);
        assert_eq!(r.check_refresh_needed().unwrap(), 1337);
    }

    #[test]
    fn test_missing_marker_forces_refresh() {
        let base = TempDir::new().unwrap();
        fs::create_dir_all(base.path().join("cpe")).unwrap();
        let r = refresher(&base, Some("lastModifiedDate=1337\n"), None);
        assert_eq!(r.check_refresh_needed().unwrap(), 1337);
    }

    #[test]
    fn test_current_marker_means_no_refresh() {
        let base = TempDir::new().unwrap();
        write_marker_file(&base, "lastupdated=2000\n");
        let r = refresher(&base, Some("lastModifiedDate=1500\n"), None);
        assert_eq!(r.check_refresh_needed().unwrap(), 0);

        let r = refresher(&base, Some("lastModifiedDate=2000\n"), None);
        assert_eq!(r.check_refresh_needed().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_marker_forces_refresh_without_error() {
        let base = TempDir::new().unwrap();
        write_marker_file(&base, "lastupdated=banana\n");
        let r = refresher(&base, Some("lastModifiedDate=1500\n"), None);
        assert_eq!(r.check_refresh_needed().unwrap(), 1500);
    }

    #[test]
    fn test_unreachable_meta_is_fatal() {
        let base = TempDir::new().unwrap();
        let r = refresher(&base, None, None);
        assert!(matches!(
            r.check_refresh_needed().unwrap_err(),
            Error::Transport(_)
        ));
    }

    #[test]
    fn test_meta_without_usable_timestamp_is_fatal() {
        let base = TempDir::new().unwrap();
        for meta in ["lastModifiedDate=0\n", "nonsense\n"] {
            let r = refresher(&base, Some(meta), None);
            assert!(matches!(
                r.check_refresh_needed().unwrap_err(),
                Error::Transport(_)
            ));
        }
    }

    #[test]
    fn test_refresh_imports_and_persists_marker() {
        let base = TempDir::new().unwrap();
        let mut r = refresher(&base, Some("lastModifiedDate=1234\n"), Some(b"export"));
        r.refresh().unwrap();

        let marker = fs::read_to_string(base.path().join("cpe").join(LAST_UPDATED_FILE)).unwrap();
        assert!(marker.contains("lastupdated=1234"));

        assert_eq!(r.importer().imported.len(), 1);
        // The temporary download is gone once refresh returns.
        assert!(!r.importer().imported[0].exists());
    }

    #[test]
    fn test_refresh_is_noop_when_current() {
        let base = TempDir::new().unwrap();
        write_marker_file(&base, "lastupdated=2000\n");
        let mut r = refresher(&base, Some("lastModifiedDate=1500\n"), Some(b"export"));
        r.refresh().unwrap();
        assert!(r.importer().imported.is_empty());
        // Only the metadata resource was touched.
        assert_eq!(
            *r.downloader().fetched.borrow(),
            vec!["https://example.org/cpe.meta".to_string()]
        );
    }

    #[test]
    fn test_failed_download_leaves_prior_state() {
        let base = TempDir::new().unwrap();
        write_marker_file(&base, "lastupdated=100\n");
        let mut r = refresher(&base, Some("lastModifiedDate=200\n"), None);
        r.refresh().unwrap();

        let marker = fs::read_to_string(base.path().join("cpe").join(LAST_UPDATED_FILE)).unwrap();
        assert!(marker.contains("lastupdated=100"));
        assert!(r.importer().imported.is_empty());
    }

    #[test]
    fn test_failed_import_does_not_advance_marker() {
        let base = TempDir::new().unwrap();
        write_marker_file(&base, "lastupdated=100\n");
        let mut r = CachedDatasetRefresher::new(
            settings(&base),
            FakeDownloader::new(Some("lastModifiedDate=200\n"), Some(b"garbage")),
            RecordingImporter {
                imported: Vec::new(),
                fail: true,
            },
        );

        assert!(matches!(r.refresh().unwrap_err(), Error::MalformedData(_)));
        let marker = fs::read_to_string(base.path().join("cpe").join(LAST_UPDATED_FILE)).unwrap();
        assert!(marker.contains("lastupdated=100"));
    }
}
