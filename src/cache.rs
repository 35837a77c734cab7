//! Per-molecule persistence of the last view box.
//!
//! Entries are never evicted; the map grows with every distinct molecule
//! that has been viewed.

use crate::geometry::ViewBox;
use crate::key::MoleculeKey;
use ron::ser::PrettyConfig;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Errors that can occur when persisting cached views.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to read view cache '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write view cache '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse view cache '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: ron::de::SpannedError,
    },
    #[error("failed to serialize view cache: {0}")]
    Serialize(#[from] ron::Error),
}

/// Key-value backing store for cached views.
pub trait ViewStore {
    fn get(&self, key: &MoleculeKey) -> Option<ViewBox>;
    fn set(&mut self, key: MoleculeKey, view_box: ViewBox) -> Result<(), CacheError>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<MoleculeKey, ViewBox>,
}

impl ViewStore for MemoryStore {
    fn get(&self, key: &MoleculeKey) -> Option<ViewBox> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: MoleculeKey, view_box: ViewBox) -> Result<(), CacheError> {
        self.entries.insert(key, view_box);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Store persisted as a RON map, rewritten on every change.
#[derive(Debug)]
pub struct RonFileStore {
    path: PathBuf,
    entries: BTreeMap<MoleculeKey, ViewBox>,
}

impl RonFileStore {
    /// Opens `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => ron::from_str(&text).map_err(|source| CacheError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(CacheError::Read { path, source }),
        };
        Ok(Self { path, entries })
    }

    /// Like [`RonFileStore::open`], but a corrupt file is logged and replaced
    /// by an empty store.
    pub fn open_or_reset(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        match Self::open(path.clone()) {
            Err(err @ CacheError::Parse { .. }) => {
                log::warn!("{err}; starting with an empty view cache");
                Ok(Self {
                    path,
                    entries: BTreeMap::new(),
                })
            }
            other => other,
        }
    }

    /// `<data dir>/molview/views.ron`
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::data_dir()?.join("molview").join("views.ron"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), CacheError> {
        let text = ron::ser::to_string_pretty(&self.entries, PrettyConfig::new())?;
        let write_err = |source| CacheError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = self.path.with_extension("ron.tmp");
        std::fs::write(&tmp, text).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

impl ViewStore for RonFileStore {
    fn get(&self, key: &MoleculeKey) -> Option<ViewBox> {
        self.entries.get(key).copied()
    }

    fn set(&mut self, key: MoleculeKey, view_box: ViewBox) -> Result<(), CacheError> {
        if self.entries.get(&key) == Some(&view_box) {
            return Ok(());
        }
        self.entries.insert(key, view_box);
        self.flush()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Shared handle to the process-wide view cache.
///
/// Clones refer to the same store. Only complete, valid view boxes are
/// written.
#[derive(Clone)]
pub struct ViewCache {
    store: Rc<RefCell<Box<dyn ViewStore>>>,
}

impl fmt::Debug for ViewCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ViewCache {
    pub fn new(store: impl ViewStore + 'static) -> Self {
        Self {
            store: Rc::new(RefCell::new(Box::new(store))),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryStore::default())
    }

    pub fn get(&self, key: &MoleculeKey) -> Option<ViewBox> {
        self.store.borrow().get(key).filter(ViewBox::is_valid)
    }

    /// Records `view_box` for `key`. Invalid boxes are ignored and store
    /// failures are logged; neither interrupts the caller.
    pub fn set(&self, key: &MoleculeKey, view_box: ViewBox) {
        if !view_box.is_valid() {
            log::debug!("Not caching invalid view box {view_box:?} for {key}");
            return;
        }
        if let Err(err) = self.store.borrow_mut().set(key.clone(), view_box) {
            log::warn!("{err}");
        }
    }

    pub fn len(&self) -> usize {
        self.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
