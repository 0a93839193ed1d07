use rosterspin_core::{validate_png, IconError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const GALLERY_FILE: &str = "gallery.json";
pub const UPLOADS_DIR: &str = "uploads";
const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordSource {
    Upload { file: String },
    Url { url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CharacterRecord {
    pub name: String,
    #[serde(flatten)]
    pub source: RecordSource,
    pub created_at: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct GalleryFile {
    #[serde(default)]
    records: Vec<CharacterRecord>,
    #[serde(default)]
    default: Option<String>,
}

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("already exists")]
    AlreadyExists(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Image(#[from] IconError),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialize error: {0}")]
    Serialize(String),
}

impl From<std::io::Error> for GalleryError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<serde_json::Error> for GalleryError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value.to_string())
    }
}

impl GalleryError {
    pub fn status(&self) -> u16 {
        match self {
            Self::InvalidName(_) | Self::InvalidUrl(_) | Self::Image(_) => 400,
            Self::NotFound(_) => 404,
            Self::AlreadyExists(_) => 409,
            Self::Io(_) | Self::Serialize(_) => 500,
        }
    }
}

/// Uploaded and linked character images plus the default marker, kept in
/// one directory.
#[derive(Debug)]
pub struct Gallery {
    dir: PathBuf,
    file: GalleryFile,
}

impl Gallery {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, GalleryError> {
        let dir = dir.into();
        fs::create_dir_all(dir.join(UPLOADS_DIR))?;
        let file = match fs::read_to_string(dir.join(GALLERY_FILE)) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "corrupt gallery index, starting empty");
                GalleryFile::default()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => GalleryFile::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { dir, file })
    }

    pub fn records(&self) -> &[CharacterRecord] {
        &self.file.records
    }

    pub fn get(&self, name: &str) -> Option<&CharacterRecord> {
        self.file.records.iter().find(|record| record.name == name)
    }

    pub fn default_name(&self) -> Option<&str> {
        self.file.default.as_deref()
    }

    pub fn upload(
        &mut self,
        name: &str,
        bytes: &[u8],
        now: i64,
    ) -> Result<CharacterRecord, GalleryError> {
        let name = self.check_new_name(name)?;
        validate_png(bytes)?;
        let file_name = self.unused_file_name(&name);
        let path = self.dir.join(UPLOADS_DIR).join(&file_name);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)?;
        if let Err(err) = file.write_all(bytes) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(err.into());
        }
        let record = CharacterRecord {
            name,
            source: RecordSource::Upload { file: file_name },
            created_at: now,
        };
        self.file.records.push(record.clone());
        if let Err(err) = self.save() {
            self.file.records.pop();
            let _ = fs::remove_file(&path);
            return Err(err);
        }
        tracing::info!(name = %record.name, size = bytes.len(), "character uploaded");
        Ok(record)
    }

    pub fn add_url(
        &mut self,
        name: &str,
        url: &str,
        now: i64,
    ) -> Result<CharacterRecord, GalleryError> {
        let name = self.check_new_name(name)?;
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) || url.contains(' ') {
            return Err(GalleryError::InvalidUrl(url.to_string()));
        }
        let record = CharacterRecord {
            name,
            source: RecordSource::Url {
                url: url.to_string(),
            },
            created_at: now,
        };
        self.file.records.push(record.clone());
        if let Err(err) = self.save() {
            self.file.records.pop();
            return Err(err);
        }
        tracing::info!(name = %record.name, "character linked");
        Ok(record)
    }

    pub fn remove(&mut self, name: &str) -> Result<CharacterRecord, GalleryError> {
        let idx = self
            .file
            .records
            .iter()
            .position(|record| record.name == name)
            .ok_or_else(|| GalleryError::NotFound(name.to_string()))?;
        let previous_default = self.file.default.clone();
        let record = self.file.records.remove(idx);
        if self.file.default.as_deref() == Some(name) {
            self.file.default = None;
        }
        if let Err(err) = self.save() {
            self.file.records.insert(idx, record);
            self.file.default = previous_default;
            return Err(err);
        }
        if let RecordSource::Upload { file } = &record.source {
            if let Err(err) = fs::remove_file(self.dir.join(UPLOADS_DIR).join(file)) {
                tracing::warn!(error = %err, file = %file, "failed to delete upload");
            }
        }
        Ok(record)
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), GalleryError> {
        if self.get(name).is_none() {
            return Err(GalleryError::NotFound(name.to_string()));
        }
        let previous = self.file.default.replace(name.to_string());
        if let Err(err) = self.save() {
            self.file.default = previous;
            return Err(err);
        }
        Ok(())
    }

    /// Path of a stored upload; `None` for names that could escape the directory.
    pub fn upload_path(&self, file: &str) -> Option<PathBuf> {
        let safe = !file.is_empty()
            && !file.starts_with('.')
            && file
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.');
        safe.then(|| self.dir.join(UPLOADS_DIR).join(file))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_new_name(&self, name: &str) -> Result<String, GalleryError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(GalleryError::InvalidName(name.to_string()));
        }
        if self.file.records.iter().any(|record| record.name.eq_ignore_ascii_case(name)) {
            return Err(GalleryError::AlreadyExists(name.to_string()));
        }
        Ok(name.to_string())
    }

    /// `<slug>.png`, or `<slug>-N.png` when a record or stray file already
    /// holds that name.
    fn unused_file_name(&self, name: &str) -> String {
        let stem = slug(name);
        let taken = |candidate: &str| {
            self.file.records.iter().any(|record| {
                matches!(&record.source, RecordSource::Upload { file } if file == candidate)
            }) || self.dir.join(UPLOADS_DIR).join(candidate).exists()
        };
        let mut candidate = format!("{stem}.png");
        let mut suffix = 2u32;
        while taken(&candidate) {
            candidate = format!("{stem}-{suffix}.png");
            suffix += 1;
        }
        candidate
    }

    fn save(&self) -> Result<(), GalleryError> {
        let body = serde_json::to_string_pretty(&self.file)?;
        let path = self.dir.join(GALLERY_FILE);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Lowercase ASCII file stem for a display name.
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        format!("character-{:08x}", fnv32(name))
    } else {
        trimmed.to_string()
    }
}

fn fnv32(text: &str) -> u32 {
    let mut hash: u32 = 0x811c9dc5;
    for byte in text.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x01000193);
    }
    hash
}
