use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::{CacheEngine, CacheError, Expiry, Result};

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";
const DISCARD_EXTENSION: &str = "discard";

/// Persistent engine storing one JSON record per key in a directory.
///
/// Each record is named by the BLAKE3 hash of its key, so arbitrary keys map
/// to safe file names. A record holds the full key, the absolute expiry time
/// and the value:
///
/// ```json
/// {"key":"add||PARAMS:2||1|2","expires_at_ms":1767225600000,"value":3}
/// ```
///
/// Writes go to a temporary file that is renamed into place, so readers never
/// see a partial record. Expired and unreadable records are deleted when
/// read, unless a newer record replaced them in the meantime. Records survive
/// restarts: a new engine opened on the same directory sees them.
///
/// # Examples
///
/// ```
/// use memora_core::{CacheEngine, DiskEngine};
///
/// let dir = tempfile::tempdir().unwrap();
/// let engine: DiskEngine<Vec<u32>> = DiskEngine::open(dir.path()).unwrap();
/// engine.set("primes", vec![2, 3, 5, 7], None).unwrap();
///
/// let reopened: DiskEngine<Vec<u32>> = DiskEngine::open(dir.path()).unwrap();
/// assert_eq!(reopened.get("primes").unwrap(), Some(vec![2, 3, 5, 7]));
/// ```
#[derive(Debug)]
pub struct DiskEngine<V> {
    dir: PathBuf,
    _value: PhantomData<fn() -> V>,
}

#[derive(Serialize)]
struct RecordRef<'a, V> {
    key: &'a str,
    expires_at_ms: Option<u64>,
    value: &'a V,
}

#[derive(Deserialize)]
struct Record<V> {
    key: String,
    expires_at_ms: Option<u64>,
    value: V,
}

impl<V> DiskEngine<V> {
    /// Opens an engine on `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            _value: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Number of records on disk, including expired ones not yet read.
    pub fn len(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            if is_record(&entry?.path()) {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Deletes every record in the directory, along with temporary files left
    /// by interrupted writes. Other files are left alone.
    ///
    /// A `set` running concurrently may lose its temporary file and fail.
    pub fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_record(&path) || is_scratch(&path) {
                remove_if_exists(&path)?;
            }
        }
        Ok(())
    }

    /// Deletes the record at `path` if it still holds `seen`.
    ///
    /// The record is first renamed aside, which is atomic: a record written
    /// after our read is either moved aside with it and restored, or lands
    /// after the rename and is left in place.
    fn discard_if_unchanged(&self, path: &Path, seen: &[u8]) -> Result<()> {
        let aside =
            path.with_extension(format!("{:016x}.{}", fastrand::u64(..), DISCARD_EXTENSION));
        match fs::rename(path, &aside) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        }

        if fs::read(&aside)? != seen {
            // A hard link never replaces a record written since the rename.
            match fs::hard_link(&aside, path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "could not restore replaced record")
                }
            }
        }
        remove_if_exists(&aside)
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let digest = blake3::hash(key.as_bytes());
        self.dir
            .join(format!("{}.{}", digest.to_hex(), RECORD_EXTENSION))
    }
}

impl<V> CacheEngine<V> for DiskEngine<V>
where
    V: Serialize + DeserializeOwned,
{
    fn get(&self, key: &str) -> Result<Option<V>> {
        let path = self.record_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let record: Record<V> = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "discarding unreadable record");
                self.discard_if_unchanged(&path, &bytes)?;
                return Ok(None);
            }
        };

        // Hash collision or a record written for another key.
        if record.key != key {
            return Ok(None);
        }

        if let Some(expires_at) = record.expires_at_ms {
            if now_millis() >= expires_at {
                self.discard_if_unchanged(&path, &bytes)?;
                debug!(key = %key, "removed expired record");
                return Ok(None);
            }
        }

        Ok(Some(record.value))
    }

    fn set(&self, key: &str, value: V, expiry: Expiry) -> Result<()> {
        let expires_at_ms = match expiry {
            Some(ttl) if ttl == Duration::ZERO => {
                return Err(CacheError::InvalidExpiry(
                    "expiry must be greater than zero".to_string(),
                ))
            }
            Some(ttl) => Some(now_millis().saturating_add(duration_millis(ttl))),
            None => None,
        };

        let bytes = serde_json::to_vec(&RecordRef {
            key,
            expires_at_ms,
            value: &value,
        })?;

        let path = self.record_path(key);
        let tmp = path.with_extension(format!("{:016x}.{}", fastrand::u64(..), TEMP_EXTENSION));
        fs::write(&tmp, &bytes)?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }

        debug!(key = %key, path = %path.display(), bytes = bytes.len(), "wrote record");
        Ok(())
    }
}

fn is_record(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == RECORD_EXTENSION)
}

/// Temporary files of an in-flight `set` or discard.
fn is_scratch(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext == TEMP_EXTENSION || ext == DISCARD_EXTENSION)
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_millis)
        .unwrap_or(0)
}
