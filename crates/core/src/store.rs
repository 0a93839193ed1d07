use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt payload under {key}: {message}")]
    Corrupt { key: String, message: String },
    #[error("serialize error: {0}")]
    Serialize(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

/// Namespaced string key-value storage.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Persisted value with an in-memory default.
pub trait Store<T> {
    /// `Ok(None)` when nothing has been stored yet.
    fn read(&self) -> Result<Option<T>, StoreError>;
    fn save(&mut self, value: &T) -> Result<(), StoreError>;

    /// Stored value, or the default when missing, unreadable or corrupt.
    fn load(&self) -> T
    where
        T: Default,
    {
        match self.read() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load stored value, using default");
                T::default()
            }
        }
    }
}

/// Serializes `T` as JSON under a fixed key.
#[derive(Debug, Clone)]
pub struct JsonStore<B, T> {
    backend: B,
    key: String,
    _value: PhantomData<fn() -> T>,
}

impl<B: KeyValueBackend, T> JsonStore<B, T> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B, T> Store<T> for JsonStore<B, T>
where
    B: KeyValueBackend,
    T: Serialize + DeserializeOwned,
{
    fn read(&self) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.backend.get(&self.key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|err| StoreError::Corrupt {
                key: self.key.clone(),
                message: err.to_string(),
            })
    }

    fn save(&mut self, value: &T) -> Result<(), StoreError> {
        let body =
            serde_json::to_string(value).map_err(|err| StoreError::Serialize(err.to_string()))?;
        self.backend.set(&self.key, &body)
    }
}

/// In-memory backend. Clones share the same map, so several stores can sit
/// on one backend the way they would on one browser storage area.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    map: Rc<RefCell<HashMap<String, String>>>,
    fail_writes: Rc<Cell<bool>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `set` fail until switched back.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.map.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        self.map.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
