//! Single-file JSON persistence for index snapshots

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

use super::snapshot::IndexSnapshot;

/// Location of a persisted snapshot: `<dir>/<collection>.json`.
///
/// Both stores are written together, to a temporary file in the same
/// directory that is then renamed over the previous snapshot, so a reader
/// sees either the old index or the new one.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(dir: &Path, collection: &str) -> Self {
        Self {
            path: dir.join(format!("{}.json", collection)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Load and verify the snapshot, if one exists
    pub fn load(&self) -> Result<Option<IndexSnapshot>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: IndexSnapshot = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::store(format!("unreadable snapshot {}: {}", self.path.display(), e)))?;
        snapshot.verify()?;

        Ok(Some(snapshot))
    }

    /// Replace the persisted snapshot
    pub fn save(&self, snapshot: &IndexSnapshot) -> Result<()> {
        let dir = self.dir();
        std::fs::create_dir_all(dir)?;

        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, snapshot)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!(
            "Persisted {} records to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }
}
