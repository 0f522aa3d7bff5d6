use std::ffi::OsString;
use std::{fs, io, path::Path, path::PathBuf};

use once_cell::sync::Lazy;

/// Points the service at an explicit state directory (tests, containers).
pub const DATA_DIR_ENV: &str = "LOCAL_PULSE_DATA_DIR";

const APP_DIR: &str = "local-pulse";
const DATABASE_FILE: &str = "local-pulse.sqlite";
const CONFIG_FILE: &str = "config.json";

static DEFAULT_LAYOUT: Lazy<DataLayout> =
    Lazy::new(|| DataLayout::resolve(|key| std::env::var_os(key)));

/// Where LocalPulse keeps its preference database and config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// An explicit override is used as given. Otherwise state lives in an
    /// app folder under the platform data dir, or the working dir without one.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|dir| !dir.is_empty()) {
            return Self::at(dir);
        }
        let base = dirs::data_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        Self::at(base.join(APP_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }
}

pub fn default_layout() -> &'static DataLayout {
    &DEFAULT_LAYOUT
}

pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
