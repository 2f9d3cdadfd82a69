//! Best-effort JSON file cache for geocoder responses.
//!
//! One file per key under a caller-chosen directory. Failures degrade to a
//! cache miss; lookups never fail because the cache is unreadable.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::warn;
use serde_json::Value;

pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: &Path) -> std::io::Result<Cache> {
        fs::create_dir_all(dir)?;
        Ok(Cache {
            dir: dir.to_path_buf(),
        })
    }

    pub fn write(&self, key: &str, json: &Value) {
        let path = self.entry_path(key);
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(e) => {
                warn!("cache write skipped for {}: {e}", path.display());
                return;
            }
        };
        let mut writer = BufWriter::new(file);
        if let Err(e) = serde_json::to_writer(&mut writer, json) {
            warn!("cache write skipped for {}: {e}", path.display());
        }
    }

    pub fn read(&self, key: &str) -> Option<Value> {
        let path = self.entry_path(key);
        let contents = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&contents) {
            Ok(json) => Some(json),
            Err(e) => {
                warn!("discarding corrupt cache entry {}: {e}", path.display());
                None
            }
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(sanitize_key(key))
    }
}

/// Reduces an arbitrary key (an address, a lat/lng pair) to a safe file name.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn round_trip() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();

        let value = json!({"coordinates": [1.2, 3.4]});
        cache.write("1600 Amphitheatre Pkwy", &value);

        assert_eq!(cache.read("1600 Amphitheatre Pkwy"), Some(value));
    }

    #[test]
    fn miss_on_unknown_key() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();

        assert_eq!(cache.read("never written"), None);
    }

    #[test]
    fn keys_with_path_separators_are_sanitized() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();

        cache.write("a/b\\c:d", &json!(1));
        assert_eq!(cache.read("a/b\\c:d"), Some(json!(1)));
        // no nested directories created by the key
        assert!(dir.path().join("a_b_c_d").exists());
    }

    #[test]
    fn corrupt_entry_reads_as_miss() {
        let dir = tempdir().unwrap();
        let cache = Cache::new(dir.path()).unwrap();

        std::fs::write(dir.path().join("broken"), b"{not json").unwrap();
        assert_eq!(cache.read("broken"), None);
    }
}
