use crate::{Roster, RosterEntry, Store, StoreError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const MAX_ICON_BYTES: usize = 10 * 1024 * 1024;
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
pub const PNG_MIME: &str = "image/png";

#[derive(Debug, Error)]
pub enum IconError {
    #[error("no roster entry named {0}")]
    UnknownEntry(String),
    #[error("image payload is empty")]
    Empty,
    #[error("image payload is not a PNG")]
    UnsupportedFormat,
    #[error("image payload is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("failed to persist icons: {0}")]
    Persist(#[from] StoreError),
}

/// Checks format and size before anything is stored or sent.
pub fn validate_png(bytes: &[u8]) -> Result<(), IconError> {
    if bytes.is_empty() {
        return Err(IconError::Empty);
    }
    if bytes.len() > MAX_ICON_BYTES {
        return Err(IconError::TooLarge {
            size: bytes.len(),
            limit: MAX_ICON_BYTES,
        });
    }
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(IconError::UnsupportedFormat);
    }
    Ok(())
}

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

pub fn png_data_uri(bytes: &[u8]) -> String {
    format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(bytes))
}

/// Up to two uppercase initials, e.g. `"dark knight"` -> `"DK"`.
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let picked: String = match words.as_slice() {
        [] => String::new(),
        [single] => single.chars().take(2).collect(),
        [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
    };
    if picked.is_empty() {
        "?".to_string()
    } else {
        picked.to_uppercase()
    }
}

/// Roster id to inline image payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CustomIconMap {
    icons: BTreeMap<String, String>,
}

impl CustomIconMap {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.icons.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.icons.contains_key(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, data_uri: impl Into<String>) -> Option<String> {
        self.icons.insert(id.into(), data_uri.into())
    }

    pub fn remove(&mut self, id: &str) -> Option<String> {
        self.icons.remove(id)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.icons
            .iter()
            .map(|(id, uri)| (id.as_str(), uri.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource<'a> {
    Remote(&'a str),
    Inline(&'a str),
    Initials(String),
}

impl<'a> ImageSource<'a> {
    /// Remote reference first, then the custom icon, then initials. A stored
    /// icon that is not a PNG data URI counts as missing.
    pub fn resolve(entry: &'a RosterEntry, icons: &'a CustomIconMap) -> Self {
        if let Some(uri) = entry.image_ref.as_deref() {
            return ImageSource::Remote(uri);
        }
        match icons.get(&entry.id) {
            Some(uri) if uri.starts_with(PNG_DATA_URI_PREFIX) => ImageSource::Inline(uri),
            _ => ImageSource::Initials(initials(&entry.id)),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ImageSource::Initials(_))
    }
}

/// Custom icons with write-through persistence.
#[derive(Debug)]
pub struct IconGallery<S> {
    icons: CustomIconMap,
    store: S,
}

impl<S: Store<CustomIconMap>> IconGallery<S> {
    pub fn open(store: S) -> Self {
        let icons = store.load();
        Self { icons, store }
    }

    pub fn icons(&self) -> &CustomIconMap {
        &self.icons
    }

    pub fn image_source<'a>(&'a self, entry: &'a RosterEntry) -> ImageSource<'a> {
        ImageSource::resolve(entry, &self.icons)
    }

    /// Stores `bytes` as the icon for `id` and returns its data URI. On a
    /// failed write the previous icon is restored.
    pub fn upload(&mut self, roster: &Roster, id: &str, bytes: &[u8]) -> Result<String, IconError> {
        if !roster.contains(id) {
            return Err(IconError::UnknownEntry(id.to_string()));
        }
        validate_png(bytes)?;
        let data_uri = png_data_uri(bytes);
        let previous = self.icons.insert(id, data_uri.clone());
        if let Err(err) = self.store.save(&self.icons) {
            match previous {
                Some(uri) => self.icons.insert(id, uri),
                None => self.icons.remove(id),
            };
            return Err(err.into());
        }
        Ok(data_uri)
    }

    /// Returns whether an icon was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, IconError> {
        let Some(previous) = self.icons.remove(id) else {
            return Ok(false);
        };
        if let Err(err) = self.store.save(&self.icons) {
            self.icons.insert(id, previous);
            return Err(err.into());
        }
        Ok(true)
    }
}
