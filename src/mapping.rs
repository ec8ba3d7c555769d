//! Button mapping table
//!
//! Mappings live in a small key/value file, TOML by default:
//!
//! ```toml
//! button_1 = "space"
//! button_2 = "cmd+shift+v"
//! jog_left = "j"          # optional override of the built-in "left"
//! ```
//!
//! JSON (`{"button_1": "space"}`) is accepted for files ending in `.json`.
//! The table is replaced wholesale on every reload and a file that fails to
//! parse yields an empty table.

use crate::error::{Result, ShuttleError};
use crate::event::{Direction, LogicalEvent};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Immutable snapshot of the action mappings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: BTreeMap<String, String>,
}

impl MappingTable {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a mapping document; `json` selects JSON instead of TOML
    pub fn parse(content: &str, json: bool) -> std::result::Result<Self, String> {
        let entries: BTreeMap<String, String> = if json {
            serde_json::from_str(content).map_err(|e| e.to_string())?
        } else {
            toml::from_str(content).map_err(|e| e.to_string())?
        };
        Ok(Self::new(entries))
    }

    /// Load a mapping file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ShuttleError::MappingLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::parse(&content, is_json(path)).map_err(|reason| ShuttleError::MappingLoad {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Action for an event. Buttons only fire when mapped; jog and shuttle
    /// fall back to the built-in arrow key for their direction.
    pub fn action_for(&self, event: &LogicalEvent) -> Option<&str> {
        match event {
            LogicalEvent::ButtonPressed(n) => self.get(&button_key(*n)),
            LogicalEvent::JogStep(dir) => Some(
                self.get(&format!("jog_{}", dir.as_str()))
                    .unwrap_or_else(|| builtin_action(*dir)),
            ),
            LogicalEvent::ShuttleTick(dir, _) => Some(
                self.get(&format!("shuttle_{}", dir.as_str()))
                    .unwrap_or_else(|| builtin_action(*dir)),
            ),
        }
    }
}

/// Mapping key for a button number, e.g. `button_3`
pub fn button_key(button: u8) -> String {
    format!("button_{}", button)
}

/// Hard-wired action for jog/shuttle movement
pub fn builtin_action(direction: Direction) -> &'static str {
    direction.as_str()
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Shared, atomically swappable handle to the current table.
/// Readers clone the inner `Arc` and never observe a half-built table.
#[derive(Debug, Clone, Default)]
pub struct MappingHandle {
    inner: Arc<RwLock<Arc<MappingTable>>>,
}

impl MappingHandle {
    pub fn new(table: MappingTable) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(table))),
        }
    }

    pub fn current(&self) -> Arc<MappingTable> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, table: Arc<MappingTable>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = table;
    }
}

/// Where the mapping table comes from
pub trait MappingSource {
    /// Latest table known to the source
    fn current(&self) -> Arc<MappingTable>;

    /// Check the backing store; returns the new table if it changed
    fn poll_for_update(&mut self) -> Option<Arc<MappingTable>>;
}

/// Fixed in-memory table (tests, `--mappings` validation)
#[derive(Debug, Clone, Default)]
pub struct StaticMappings {
    table: Arc<MappingTable>,
}

impl StaticMappings {
    pub fn new(table: MappingTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }
}

impl MappingSource for StaticMappings {
    fn current(&self) -> Arc<MappingTable> {
        self.table.clone()
    }

    fn poll_for_update(&mut self) -> Option<Arc<MappingTable>> {
        None
    }
}

/// Mapping file watched by modification time
#[derive(Debug)]
pub struct FileMappings {
    path: PathBuf,
    last_modified: Option<SystemTime>,
    table: Arc<MappingTable>,
}

impl FileMappings {
    /// Open a mapping file. A missing or broken file is not an error: the
    /// table starts empty and is picked up once the file appears.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut source = Self {
            path: path.into(),
            last_modified: None,
            table: Arc::new(MappingTable::empty()),
        };
        if source.poll_for_update().is_none() {
            info!("No mapping file at {:?} yet, starting with an empty table", source.path);
        }
        source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn reload(&mut self) -> Arc<MappingTable> {
        let table = match MappingTable::load(&self.path) {
            Ok(table) => {
                info!("Loaded {} mapping(s) from {:?}", table.len(), self.path);
                table
            }
            Err(e) => {
                warn!("{} - using an empty mapping table", e);
                MappingTable::empty()
            }
        };
        self.table = Arc::new(table);
        self.table.clone()
    }
}

impl MappingSource for FileMappings {
    fn current(&self) -> Arc<MappingTable> {
        self.table.clone()
    }

    fn poll_for_update(&mut self) -> Option<Arc<MappingTable>> {
        let modified = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                // File temporarily gone (editor save dance); keep what we have
                debug!("Mapping file {:?} not readable: {}", self.path, e);
                return None;
            }
        };

        if self.last_modified == Some(modified) {
            return None;
        }
        self.last_modified = Some(modified);
        Some(self.reload())
    }
}
