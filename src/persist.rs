use std::fs;
use std::path::PathBuf;

/// Key-value collaborator holding the persisted selections. Writes are
/// synchronous; the store treats them as best-effort.
pub trait SelectionStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<(), String>;
}

/// One JSON file per key under the platform data-local directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new() -> Self {
        let base = dirs_next::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::at(base.join("pokedex"))
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.key_path(key)).ok()
    }

    fn save(&self, key: &str, value: &str) -> Result<(), String> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))?;
        fs::write(self.key_path(key), value)
            .map_err(|e| format!("Failed to write {}: {}", key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::at(dir.path().join("pokedex"));

        assert_eq!(store.load("pokemon-team"), None);
        store
            .save("pokemon-team", "[1,4,7]")
            .expect("save succeeds");
        assert_eq!(store.load("pokemon-team").as_deref(), Some("[1,4,7]"));
    }
}
