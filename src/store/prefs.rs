// Preferences
//
// Flat string-keyed storage backed by a JSON file in the app data
// directory. Each write rewrites the whole file; callers that need
// multiple keys updated together pass them in one call.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct Preferences {
    path: PathBuf,
}

impl Preferences {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[allow(dead_code)] // Used in tests
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the backing file as a string map.
    /// A missing or unparseable file reads as an empty map.
    fn read_map(&self) -> BTreeMap<String, String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
            Err(_) => BTreeMap::new(),
        }
    }

    /// Get a single value, falling back to `default` when the key is
    /// missing or the file is unreadable.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.read_map()
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    /// Write the given entries, keeping every other key intact.
    pub fn put_strings(&self, entries: &[(&str, String)]) -> io::Result<()> {
        let mut map = self.read_map();
        for (key, value) in entries {
            map.insert(key.to_string(), value.clone());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json_str = serde_json::to_string_pretty(&map)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        fs::write(&self.path, json_str)?;
        Ok(())
    }
}
