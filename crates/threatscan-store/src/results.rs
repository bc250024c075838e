//! Filesystem result store.
//!
//! Source documents are read from `<data_root>/<source_id>`. Result sets are
//! written once to `<processed_dir>/<cache_key>_processed.json` and served
//! from there on every later request for the same source id, even if the
//! source document changes in the meantime.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use threatscan_core::key::RESULT_SUFFIX;
use threatscan_core::{ResultSet, StoreLayout, result_file_name, validate_source_id};
use tracing::{debug, info, warn};

use crate::StoreError;

/// Outcome of [`ResultStore::save`].
#[derive(Debug, Clone, PartialEq)]
pub enum Saved {
    Written(PathBuf),
    /// Another writer got there first. Carries the result set already on disk.
    AlreadyPresent(ResultSet),
}

/// Result store rooted at a [`StoreLayout`].
#[derive(Debug, Clone)]
pub struct ResultStore {
    data_root: PathBuf,
    processed_dir: PathBuf,
    raw_dir: PathBuf,
}

impl ResultStore {
    pub fn new(layout: &StoreLayout) -> Self {
        Self {
            data_root: layout.data_root.clone(),
            processed_dir: layout.processed_dir(),
            raw_dir: layout.raw_dir(),
        }
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// Path of the source document for `source_id`.
    pub fn source_path(&self, source_id: &str) -> Result<PathBuf, StoreError> {
        validate_source_id(source_id)?;
        Ok(self.data_root.join(source_id))
    }

    /// Path of the result file for `source_id`, whether or not it exists.
    pub fn result_path(&self, source_id: &str) -> PathBuf {
        self.processed_dir.join(result_file_name(source_id))
    }

    /// Load the cached result set for `source_id`, if one was written.
    pub fn load(&self, source_id: &str) -> Result<Option<ResultSet>, StoreError> {
        let path = self.result_path(source_id);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let set = parse_result_set(&path, &text)?;
                debug!(path = %path.display(), verdicts = set.len(), "loaded cached result set");
                Ok(Some(set))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist `results` for `source_id` unless a result file already exists.
    ///
    /// The file is written to a temporary name in the processed directory and
    /// moved into place without clobbering, so a reader never sees a partial
    /// file and an existing result is never replaced.
    pub fn save(&self, source_id: &str, results: &ResultSet) -> Result<Saved, StoreError> {
        let path = self.result_path(source_id);
        if let Some(existing) = self.load(source_id)? {
            warn!(path = %path.display(), "result set already present, keeping existing file");
            return Ok(Saved::AlreadyPresent(existing));
        }

        fs::create_dir_all(&self.processed_dir)?;
        let mut tmp = NamedTempFile::new_in(&self.processed_dir)?;
        serde_json::to_writer(&mut tmp, results)?;
        tmp.flush()?;

        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                info!(path = %path.display(), verdicts = results.len(), "result set written");
                Ok(Saved::Written(path))
            }
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                warn!(path = %path.display(), "lost write race, keeping existing file");
                let text = fs::read_to_string(&path)?;
                Ok(Saved::AlreadyPresent(parse_result_set(&path, &text)?))
            }
            Err(e) => Err(e.error.into()),
        }
    }

    /// Names of all result files, sorted.
    pub fn list_processed(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.processed_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && name.ends_with(RESULT_SUFFIX)
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read a result file by its file name, as returned by [`list_processed`](Self::list_processed).
    pub fn get_processed(&self, file_name: &str) -> Result<ResultSet, StoreError> {
        check_bare_name(file_name)?;
        let path = self.processed_dir.join(file_name);
        match fs::read_to_string(&path) {
            Ok(text) => parse_result_set(&path, &text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(file_name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store an uploaded document under `<data_root>/raw/`. Never overwrites.
    ///
    /// Returns the source id to classify the upload with.
    pub fn save_upload(&self, file_name: &str, contents: &[u8]) -> Result<String, StoreError> {
        check_bare_name(file_name)?;
        let path = self.raw_dir.join(file_name);
        if path.exists() {
            return Err(StoreError::UploadExists(path));
        }

        fs::create_dir_all(&self.raw_dir)?;
        let mut tmp = NamedTempFile::new_in(&self.raw_dir)?;
        tmp.write_all(contents)?;
        tmp.flush()?;
        tmp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StoreError::UploadExists(path.clone())
            } else {
                StoreError::Io(e.error)
            }
        })?;

        info!(path = %path.display(), bytes = contents.len(), "upload stored");
        Ok(format!("raw/{file_name}"))
    }
}

fn parse_result_set(path: &Path, text: &str) -> Result<ResultSet, StoreError> {
    serde_json::from_str(text).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn check_bare_name(file_name: &str) -> Result<(), StoreError> {
    let bare = !file_name.is_empty()
        && file_name != "."
        && file_name != ".."
        && !file_name.contains(['/', '\\']);
    if bare {
        Ok(())
    } else {
        Err(StoreError::InvalidFileName(file_name.to_string()))
    }
}
