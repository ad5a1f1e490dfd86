use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

// One registered user, keyed in the registry by the stringified Telegram id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(rename = "joinedAt")]
    pub joined_at: String,
}

// The full registry as persisted on disk: user id to record. A BTreeMap
// keeps the file contents and the broadcast order stable between runs.
pub type Registry = BTreeMap<String, UserRecord>;

// JSON-file-backed user registry. The file is the source of truth: every
// operation reads it fresh and every mutation rewrites it in full, with one
// mutex serializing access so read-modify-write cycles cannot interleave.
pub struct UserStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    // Never fails outward: a missing or unreadable file reads as empty.
    pub async fn load(&self) -> Registry {
        let _guard = self.lock.lock().await;
        read_registry(&self.path)
    }

    // Insert-or-overwrite: re-registration refreshes both the username and
    // the join timestamp.
    pub async fn register(&self, user_id: &str, username: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut registry = read_registry(&self.path);
        registry.insert(
            user_id.to_string(),
            UserRecord {
                username: username.to_string(),
                joined_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        );
        write_registry(&self.path, &registry)
    }

    pub async fn count(&self) -> usize {
        self.load().await.len()
    }
}

fn read_registry(path: &Path) -> Registry {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("No user registry at {}, starting empty", path.display());
            return Registry::new();
        }
        Err(e) => {
            log::error!("Error loading users from {}: {}", path.display(), e);
            return Registry::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(registry) => registry,
        Err(e) => {
            log::error!("Error loading users from {}: {}", path.display(), e);
            Registry::new()
        }
    }
}

// Pretty-printed JSON through a temp file in the same directory, then an
// atomic rename over the target. Readers never observe a partial write.
fn write_registry(path: &Path, registry: &Registry) -> Result<()> {
    let json = serde_json::to_string_pretty(registry).context("serializing user registry")?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())
        .with_context(|| format!("writing user registry to {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("replacing {}", path.display()))?;

    Ok(())
}
