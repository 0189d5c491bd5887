//! Provides the content-addressed filesystem cache store (§4.A): three independent named stores
//! (`download`, `api`, `info_json`) sharing the same storage mechanics — TTL, per-key advisory
//! locks with stale-lock recovery, eviction, and statistics — differing only in root directory
//! and TTL policy.
//!
//! The HTTP cache decorator in [`crate::http::cache`] is the primary consumer of the `download`
//! and `api` stores; the `info_json` store is populated directly by the dependency engine when
//! it extracts metadata out of a downloaded archive.

mod evict;
mod lock;
mod stats;

pub use evict::EvictSelector;
pub use stats::Stats;

use crate::error::StoreError;
use blake2::Blake2b;
use digest::Digest;
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

/// A lock file older than this is assumed abandoned by a crashed peer and is replaced rather
/// than waited on.
pub const LOCK_FILE_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Metadata about a single entry as surfaced by [`CacheStore::each`].
#[derive(Debug, Clone, Copy)]
pub struct EntryMeta {
    /// The entry body's size in bytes.
    pub size: u64,
    /// The entry body's age, from its mtime to now.
    pub age: Duration,
    /// Whether the entry is past this store's TTL.
    pub expired: bool,
}

/// One of the program's three named content-addressed caches (§4.A): a root directory plus a
/// TTL policy. `None` TTL means entries never expire (the `download` and `info_json` stores
/// hold immutable content).
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// A short name for this store, used only in log messages (`download`/`api`/`info_json`).
    name: &'static str,
    /// The root directory this store's entries live under.
    root: PathBuf,
    /// This store's TTL. `None` means entries never expire.
    ttl: Option<Duration>,
}

impl CacheStore {
    /// Opens a cache store rooted at `root` with the given name and TTL, creating `root` if it
    /// doesn't already exist.
    pub fn open<P>(name: &'static str, root: P, ttl: Option<Duration>) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(CacheStore { name, root, ttl })
    }

    /// This store's name (`download`, `api` or `info_json`), for log messages.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Derives the cache key for a given logical input: a lowercase BLAKE2b hex digest. Stable
    /// across runs and platforms, collision-resistant, and composed only of `[0-9a-f]`, so it's
    /// safe to use directly as a path component.
    ///
    /// For the `info_json` store, callers mix in a content descriptor beyond the bare URL (see
    /// the dependency engine's extraction path) to avoid aliasing between releases that happen
    /// to embed identically-named `info.json` entries; this function doesn't care which input it
    /// was given, only that it's deterministic.
    pub fn key_for(input: &str) -> String {
        let mut hasher = Blake2b::new();
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns the on-disk path a given key's body lives (or would live) at: `<root>/<k[0..2]>/<k[2..]>`.
    fn path_for(&self, key: &str) -> PathBuf {
        let (shard, rest) = key.split_at(2.min(key.len()));
        self.root.join(shard).join(rest)
    }

    /// Returns the on-disk path of a given key's advisory lock file.
    fn lock_path_for(&self, key: &str) -> PathBuf {
        let mut path = self.path_for(key).into_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// Returns whether a key's body is present and not expired. Never mutates, including never
    /// removing an expired entry — eviction is an explicit, separate operation.
    pub fn exists(&self, key: &str) -> bool {
        match fs::metadata(self.path_for(key)) {
            Ok(metadata) => !self.is_expired(&metadata),
            Err(_) => false,
        }
    }

    /// Reads a key's body, returning `None` on a miss or an expired entry.
    pub fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if !self.exists(key) {
            return Ok(None);
        }

        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Copies a key's body to `out`, returning whether it was a hit. A miss leaves `out`
    /// untouched.
    pub fn write_to(&self, key: &str, out: &Path) -> Result<bool, StoreError> {
        match self.read(key)? {
            Some(bytes) => {
                fs::write(out, bytes)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Atomically places `src`'s contents at `key`'s cache path: copy to a temp file on the same
    /// filesystem, then rename over the destination. Overwrites any existing entry.
    pub fn store(&self, key: &str, src: &Path) -> Result<(), StoreError> {
        let dest = self.path_for(key);
        let parent = dest.parent().expect("cache entry path always has a parent");
        fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        let mut source = fs::File::open(src)?;
        std::io::copy(&mut source, temp.as_file_mut())?;
        temp.as_file_mut().flush()?;
        temp.persist(&dest).map_err(|e| e.error)?;

        Ok(())
    }

    /// Atomically stores raw `bytes` at `key`'s cache path, the in-memory counterpart to
    /// [`store`](Self::store) for callers that already have the body buffered (e.g. the HTTP
    /// cache decorator after reading a response).
    pub fn store_bytes(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let dest = self.path_for(key);
        let parent = dest.parent().expect("cache entry path always has a parent");
        fs::create_dir_all(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(bytes)?;
        temp.flush()?;
        temp.persist(&dest).map_err(|e| e.error)?;

        Ok(())
    }

    /// Removes a key's body, returning whether it existed beforehand. The lock file, if any, is
    /// left untouched.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Acquires the exclusive advisory lock on `key`, runs `f`, then releases the lock. Stale
    /// lock files (mtime older than [`LOCK_FILE_LIFETIME`]) are detected and replaced before
    /// acquisition. The lock is released on every exit path out of `f`, including an early `?`
    /// return or an unwind, via the returned guard's `Drop` impl.
    pub fn with_lock<F, T, E>(&self, key: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<StoreError>,
    {
        let _guard = lock::acquire(&self.lock_path_for(key))?;
        f()
    }

    /// Enumerates every valid (non-expired, non-`.lock`) entry in this store.
    pub fn each(&self) -> Result<Vec<(String, EntryMeta)>, StoreError> {
        let mut entries = Vec::new();

        for shard_entry in read_dir_if_exists(&self.root)? {
            let shard_entry = shard_entry?;
            if !shard_entry.file_type()?.is_dir() {
                continue;
            }

            let shard = shard_entry.file_name();
            let shard = shard.to_string_lossy();

            for file_entry in read_dir_if_exists(&shard_entry.path())? {
                let file_entry = file_entry?;
                let file_name = file_entry.file_name();
                let file_name = file_name.to_string_lossy();
                if file_name.ends_with(".lock") {
                    continue;
                }

                let metadata = file_entry.metadata()?;
                let key = format!("{}{}", shard, file_name);
                let age = self.age_of(&metadata);
                entries.push((
                    key,
                    EntryMeta {
                        size: metadata.len(),
                        age,
                        expired: self.is_expired(&metadata),
                    },
                ));
            }
        }

        Ok(entries)
    }

    /// Removes entries matching `selector`, returning the count removed and total bytes freed.
    /// Lock files are always preserved.
    pub fn evict(&self, selector: EvictSelector) -> Result<(usize, u64), StoreError> {
        let mut count = 0;
        let mut bytes_freed = 0;

        for (key, meta) in self.each()? {
            let matches = match selector {
                EvictSelector::All => true,
                EvictSelector::Expired => meta.expired,
                EvictSelector::OlderThan(age) => meta.age > age,
            };

            if matches && self.delete(&key)? {
                count += 1;
                bytes_freed += meta.size;
            }
        }

        Ok((count, bytes_freed))
    }

    /// Computes aggregate statistics over this store's entries (§4.A `stats`).
    pub fn stats(&self) -> Result<Stats, StoreError> {
        let entries = self.each()?;
        let mut stats = Stats {
            min_bytes: u64::MAX,
            ..Stats::default()
        };
        let mut oldest = Duration::ZERO;
        let mut newest = Duration::MAX;

        for (_, meta) in &entries {
            stats.total_entries += 1;
            if meta.expired {
                stats.expired_entries += 1;
            } else {
                stats.valid_entries += 1;
            }

            stats.total_bytes += meta.size;
            stats.min_bytes = stats.min_bytes.min(meta.size);
            stats.max_bytes = stats.max_bytes.max(meta.size);
            stats.total_age_secs += meta.age.as_secs();
            oldest = oldest.max(meta.age);
            newest = newest.min(meta.age);
        }

        if stats.total_entries == 0 {
            stats.min_bytes = 0;
        }
        stats.oldest_age_secs = oldest.as_secs();
        stats.newest_age_secs = if entries.is_empty() { 0 } else { newest.as_secs() };
        stats.stale_locks = self.count_stale_locks()?;

        Ok(stats)
    }

    /// Counts `.lock` files across every shard directory whose mtime exceeds
    /// [`LOCK_FILE_LIFETIME`].
    fn count_stale_locks(&self) -> Result<usize, StoreError> {
        let mut count = 0;

        for shard_entry in read_dir_if_exists(&self.root)? {
            let shard_entry = shard_entry?;
            if !shard_entry.file_type()?.is_dir() {
                continue;
            }

            for file_entry in read_dir_if_exists(&shard_entry.path())? {
                let file_entry = file_entry?;
                let file_name = file_entry.file_name();
                if file_name.to_string_lossy().ends_with(".lock") && lock::is_stale_at(&file_entry.path()) {
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    /// Returns a file's age: how long ago its mtime was, relative to now.
    fn age_of(&self, metadata: &fs::Metadata) -> Duration {
        metadata
            .modified()
            .and_then(|mtime| mtime.elapsed().or(Ok(Duration::ZERO)))
            .unwrap_or_default()
    }

    /// Returns whether a file's mtime places it past this store's TTL. A store with `ttl = None`
    /// never considers anything expired. The TTL boundary is inclusive: an entry exactly
    /// `ttl` old is still valid, per §8's boundary behavior.
    fn is_expired(&self, metadata: &fs::Metadata) -> bool {
        match self.ttl {
            None => false,
            Some(ttl) => self.age_of(metadata) > ttl,
        }
    }
}

/// Reads a directory's entries, treating a missing directory as simply empty rather than an
/// error — a fresh store with nothing cached yet has no shard directories at all.
fn read_dir_if_exists(path: &Path) -> Result<Vec<std::io::Result<fs::DirEntry>>, StoreError> {
    match fs::read_dir(path) {
        Ok(read_dir) => Ok(read_dir.collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// The three named cache stores the rest of the program operates on, opened together against a
/// shared root directory (§10.A `cache_dir`).
#[derive(Debug, Clone)]
pub struct CacheStores {
    /// Downloaded mod archives, keyed by download URL. Immutable once published.
    pub download: CacheStore,
    /// Portal JSON API responses, keyed by request URL.
    pub api: CacheStore,
    /// Extracted `info.json` metadata, keyed by URL plus an internal-name descriptor.
    pub info_json: CacheStore,
}

impl CacheStores {
    /// Opens all three named stores under `root`, using the given `api` TTL (the other two are
    /// always unlimited, per §4.A).
    pub fn open<P>(root: P, api_ttl: Duration) -> Result<Self, StoreError>
    where
        P: AsRef<Path>,
    {
        let root = root.as_ref();
        Ok(CacheStores {
            download: CacheStore::open("download", root.join("download"), None)?,
            api: CacheStore::open("api", root.join("api"), Some(api_ttl))?,
            info_json: CacheStore::open("info_json", root.join("info_json"), None)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn store(ttl: Option<Duration>) -> (tempfile::TempDir, CacheStore) {
        let dir = tempdir().unwrap();
        let store = CacheStore::open("test", dir.path(), ttl).unwrap();
        (dir, store)
    }

    #[test]
    fn key_for_is_pure_and_pathname_safe() {
        let a = CacheStore::key_for("https://mods.factorio.com/file/Alien/1.0.0.zip");
        let b = CacheStore::key_for("https://mods.factorio.com/file/Alien/1.0.0.zip");
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_inputs_produce_different_keys() {
        let a = CacheStore::key_for("a");
        let b = CacheStore::key_for("b");
        assert_ne!(a, b);
    }

    #[test]
    fn store_then_read_round_trips() {
        let (dir, store) = store(None);
        let key = CacheStore::key_for("k");

        let src = dir.path().join("src");
        fs::write(&src, b"hello world").unwrap();
        store.store(&key, &src).unwrap();

        assert!(store.exists(&key));
        assert_eq!(store.read(&key).unwrap(), Some(b"hello world".to_vec()));
    }

    #[test]
    fn miss_returns_none() {
        let (_dir, store) = store(None);
        assert_eq!(store.read(&CacheStore::key_for("missing")).unwrap(), None);
        assert!(!store.exists(&CacheStore::key_for("missing")));
    }

    #[test]
    fn delete_removes_body_and_reports_prior_existence() {
        let (dir, store) = store(None);
        let key = CacheStore::key_for("k");
        let src = dir.path().join("src");
        fs::write(&src, b"x").unwrap();
        store.store(&key, &src).unwrap();

        assert!(store.delete(&key).unwrap());
        assert!(!store.delete(&key).unwrap());
        assert!(!store.exists(&key));
    }

    #[test]
    fn unlimited_ttl_never_expires() {
        let (_dir, store) = store(None);
        let key = CacheStore::key_for("k");
        store.store_bytes(&key, b"x").unwrap();
        assert!(store.exists(&key));
    }

    #[test]
    fn ttl_boundary_is_inclusive_then_expires() {
        let (_dir, store) = store(Some(Duration::from_secs(1)));
        let key = CacheStore::key_for("k");
        store.store_bytes(&key, b"x").unwrap();

        // fresh write: well inside the TTL.
        assert!(store.exists(&key));

        // simulate an entry exactly at the TTL boundary by backdating its mtime.
        let path = store.path_for(&key);
        let at_boundary = SystemTime::now() - Duration::from_secs(1);
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(at_boundary)).unwrap();
        assert!(store.exists(&key), "entry exactly at the TTL boundary should still be valid");

        let past_boundary = SystemTime::now() - Duration::from_millis(1100);
        filetime::set_file_mtime(&path, filetime::FileTime::from_system_time(past_boundary)).unwrap();
        assert!(!store.exists(&key), "entry past the TTL boundary should be expired");
    }

    #[test]
    fn with_lock_runs_closure_and_releases() {
        let (_dir, store) = store(None);
        let key = CacheStore::key_for("k");

        let result: Result<i32, StoreError> = store.with_lock(&key, || Ok(42));
        assert_eq!(result.unwrap(), 42);

        // lock must be released: a second acquisition on the same key must not block forever.
        let result: Result<i32, StoreError> = store.with_lock(&key, || Ok(43));
        assert_eq!(result.unwrap(), 43);
    }

    #[test]
    fn with_lock_releases_on_error_return() {
        let (_dir, store) = store(None);
        let key = CacheStore::key_for("k");

        let result: Result<(), StoreError> = store.with_lock(&key, || Err(StoreError::FileNotFound(PathBuf::new())));
        assert!(result.is_err());

        let result: Result<i32, StoreError> = store.with_lock(&key, || Ok(1));
        assert_eq!(result.unwrap(), 1);
    }

    #[test]
    fn stale_lock_is_replaced() {
        let (_dir, store) = store(None);
        let key = CacheStore::key_for("k");
        let lock_path = store.lock_path_for(&key);
        fs::create_dir_all(lock_path.parent().unwrap()).unwrap();
        fs::write(&lock_path, b"").unwrap();

        let ancient = SystemTime::now() - LOCK_FILE_LIFETIME - Duration::from_secs(1);
        filetime::set_file_mtime(&lock_path, filetime::FileTime::from_system_time(ancient)).unwrap();

        let result: Result<i32, StoreError> = store.with_lock(&key, || Ok(7));
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn evict_all_empties_store_and_reports_bytes() {
        let (_dir, store) = store(None);
        store.store_bytes(&CacheStore::key_for("a"), b"12345").unwrap();
        store.store_bytes(&CacheStore::key_for("b"), b"1234567890").unwrap();

        let (count, bytes) = store.evict(EvictSelector::All).unwrap();
        assert_eq!(count, 2);
        assert_eq!(bytes, 15);
        assert_eq!(store.stats().unwrap().total_entries, 0);
    }

    #[test]
    fn evict_older_than_only_removes_matching_entries() {
        let (_dir, store) = store(None);
        let old_key = CacheStore::key_for("old");
        let new_key = CacheStore::key_for("new");
        store.store_bytes(&old_key, b"old-bytes").unwrap();
        store.store_bytes(&new_key, b"new").unwrap();

        let old_path = store.path_for(&old_key);
        let two_days_ago = SystemTime::now() - Duration::from_secs(2 * 86400);
        filetime::set_file_mtime(&old_path, filetime::FileTime::from_system_time(two_days_ago)).unwrap();

        let (count, bytes) = store.evict(EvictSelector::OlderThan(Duration::from_secs(86400))).unwrap();
        assert_eq!(count, 1);
        assert_eq!(bytes, "old-bytes".len() as u64);
        assert!(!store.exists(&old_key));
        assert!(store.exists(&new_key));
    }

    #[test]
    fn evict_preserves_lock_files() {
        let (_dir, store) = store(None);
        let key = CacheStore::key_for("k");
        store.store_bytes(&key, b"x").unwrap();
        let _ = store.with_lock(&key, || Ok::<(), StoreError>(()));

        store.evict(EvictSelector::All).unwrap();
        assert!(store.lock_path_for(&key).exists());
    }

    #[test]
    fn stats_reports_totals_and_sizes() {
        let (_dir, store) = store(None);
        store.store_bytes(&CacheStore::key_for("a"), b"12").unwrap();
        store.store_bytes(&CacheStore::key_for("b"), b"1234").unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.valid_entries, 2);
        assert_eq!(stats.total_bytes, 6);
        assert_eq!(stats.min_bytes, 2);
        assert_eq!(stats.max_bytes, 4);
    }
}
