use anyhow::Context;
use rosterspin_core::{
    CustomIconMap, History, JsonStore, KeyValueBackend, StoreError, CUSTOM_ICONS_KEY, HISTORY_KEY,
};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub type HistoryStore = JsonStore<FileBackend, History>;
pub type IconStore = JsonStore<FileBackend, CustomIconMap>;

pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("ROSTERSPIN_DATA") {
        return Some(PathBuf::from(path));
    }
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".rosterspin"))
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || ch == '-' {
                    ch
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(body) => Ok(Some(body)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

pub fn open_stores(dir: &Path) -> anyhow::Result<(HistoryStore, IconStore)> {
    let backend = FileBackend::open(dir)?;
    Ok((
        JsonStore::new(backend.clone(), HISTORY_KEY),
        JsonStore::new(backend, CUSTOM_ICONS_KEY),
    ))
}
