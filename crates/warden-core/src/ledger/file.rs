//! Flat-file ledger store: one `<name>.count` file per actor

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use super::{LedgerEntry, LedgerStore, is_key_char};
use crate::error::LedgerError;

/// Ledger store backed by a state directory
///
/// Entries are written to a temporary file and renamed into place, so an
/// interrupted write leaves either the previous entry or a stray temp file,
/// never a half-written entry under the real name.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    dir: PathBuf,
}

impl FileLedgerStore {
    /// Create a store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding the entry for `name`
    #[must_use]
    pub fn entry_path(&self, name: &str) -> PathBuf {
        let file_name: String = name
            .chars()
            .map(|c| if is_key_char(c) { c } else { '_' })
            .collect();
        self.dir.join(format!("{file_name}.count"))
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn get(&self, name: &str) -> Option<LedgerEntry> {
        let path = self.entry_path(name);

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(actor = %name, path = %path.display(), error = %e, "unreadable ledger entry, treating as empty");
                return None;
            }
        };

        match content.parse::<LedgerEntry>() {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(actor = %name, path = %path.display(), error = %e, "resetting ledger entry");
                None
            }
        }
    }

    async fn put(&self, name: &str, entry: LedgerEntry) -> Result<(), LedgerError> {
        let path = self.entry_path(name);
        let persistence = |e: std::io::Error| LedgerError::Persistence {
            target: path.display().to_string(),
            reason: e.to_string(),
        };

        fs::create_dir_all(&self.dir).await.map_err(persistence)?;

        let tmp = path.with_extension("count.tmp");
        fs::write(&tmp, entry.to_string()).await.map_err(persistence)?;
        fs::rename(&tmp, &path).await.map_err(persistence)?;

        debug!(actor = %name, entry = %entry, "ledger entry persisted");

        Ok(())
    }
}
