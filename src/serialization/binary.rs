//! Compact bincode persistence with atomic writes and source-keyed snapshot caches.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::UNIX_EPOCH;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, WensegError};

/// Serialises `value` with bincode into a temporary file next to `path`, then renames it.
pub fn write_bincode_atomic<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|err| WensegError::io(err, Some(parent.to_path_buf())))?;
    let temp = NamedTempFile::new_in(parent)
        .map_err(|err| WensegError::io(err, Some(parent.to_path_buf())))?;
    {
        let mut writer = BufWriter::new(temp.as_file());
        bincode::serialize_into(&mut writer, value)?;
        writer
            .flush()
            .map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
    }
    temp.persist(path)
        .map_err(|err| WensegError::io(err.error, Some(path.to_path_buf())))?;
    Ok(())
}

/// Reads a bincode value written by [`write_bincode_atomic`].
pub fn read_bincode<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
    Ok(bincode::deserialize_from(BufReader::new(file))?)
}

/// Identity of a source file used to decide whether a derived cache is still fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSignature {
    /// File length in bytes.
    pub len: u64,
    /// Modification time as seconds since the Unix epoch.
    pub modified_secs: u64,
    /// Sub-second part of the modification time.
    pub modified_nanos: u32,
}

impl SourceSignature {
    /// Reads the signature of `path` from filesystem metadata.
    pub fn of<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata =
            fs::metadata(path).map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
        let modified = metadata
            .modified()
            .map_err(|err| WensegError::io(err, Some(path.to_path_buf())))?;
        let since_epoch = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        Ok(Self {
            len: metadata.len(),
            modified_secs: since_epoch.as_secs(),
            modified_nanos: since_epoch.subsec_nanos(),
        })
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot<T> {
    source: SourceSignature,
    value: T,
}

/// Loads a cached value if the cache exists, decodes, and was built from `source` as it is now.
///
/// Returns `Ok(None)` for a missing, stale, or unreadable cache; only a missing source is an error.
pub fn load_snapshot<T, P, Q>(source: P, cache: Q) -> Result<Option<T>>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let signature = SourceSignature::of(source)?;
    let cache = cache.as_ref();
    if !cache.is_file() {
        return Ok(None);
    }
    match read_bincode::<Snapshot<T>, _>(cache) {
        Ok(snapshot) if snapshot.source == signature => Ok(Some(snapshot.value)),
        Ok(_) => {
            debug!("cache {} is stale", cache.display());
            Ok(None)
        }
        Err(err) => {
            debug!("ignoring unreadable cache {}: {err}", cache.display());
            Ok(None)
        }
    }
}

/// Writes `value` to `cache`, keyed to the current signature of `source`.
pub fn save_snapshot<T, P, Q>(value: &T, source: P, cache: Q) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let snapshot = Snapshot {
        source: SourceSignature::of(source)?,
        value,
    };
    write_bincode_atomic(&snapshot, cache)
}

/// Removes a cache file; a missing file is not an error.
pub fn clear_cache<P: AsRef<Path>>(cache: P) -> Result<()> {
    let cache = cache.as_ref();
    match fs::remove_file(cache) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(WensegError::io(err, Some(cache.to_path_buf()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn bincode_round_trip_is_atomic_write() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("value.bin");
        let value = vec![("天下".to_string(), 50u64), ("天".to_string(), 30)];
        write_bincode_atomic(&value, &path).expect("write");
        let loaded: Vec<(String, u64)> = read_bincode(&path).expect("read");
        assert_eq!(loaded, value);
    }

    #[test]
    fn snapshot_is_invalidated_when_source_changes() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("dict.txt");
        let cache = dir.path().join("dict.cache");
        fs::write(&source, "天下,50\n").expect("write source");

        assert!(load_snapshot::<u64, _, _>(&source, &cache).unwrap().is_none());
        save_snapshot(&7u64, &source, &cache).expect("save");
        assert_eq!(load_snapshot::<u64, _, _>(&source, &cache).unwrap(), Some(7));

        fs::write(&source, "天下,50\n天,30\n").expect("rewrite source");
        assert!(load_snapshot::<u64, _, _>(&source, &cache).unwrap().is_none());

        clear_cache(&cache).expect("clear");
        assert!(!cache.exists());
        clear_cache(&cache).expect("clearing twice is fine");
    }

    #[test]
    fn corrupt_cache_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let source = dir.path().join("dict.txt");
        let cache = dir.path().join("dict.cache");
        fs::write(&source, "天下,50\n").expect("write source");
        fs::write(&cache, [1u8, 2, 3]).expect("write garbage");
        assert!(load_snapshot::<Vec<String>, _, _>(&source, &cache)
            .unwrap()
            .is_none());
    }
}
