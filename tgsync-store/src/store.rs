//! Interval store backend
//!
//! Reads and writes TextGrid files for `(corpus, session, unit id)` keys.
//! Every load re-parses the backing file; nothing is cached.
//!
//! Files live in `<project>/__res/plugin_data/textgrid/data/` and are always
//! written as UTF-16 through a temporary file in the same folder followed by
//! a rename, so a concurrent reader (including the folder watcher) never
//! sees a partially written TextGrid.

use std::collections::BTreeSet;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tgsync_common::textgrid::{decode_text, parse_textgrid, write_textgrid};
use tgsync_common::{AnnotationUnit, Error, Result, TextGrid};
use tracing::{debug, warn};

/// Location of TextGrid files relative to the project folder
pub const TEXTGRID_FOLDER: &str = "__res/plugin_data/textgrid/data";

/// File-backed TextGrid storage for one project
#[derive(Debug, Clone)]
pub struct TextGridStore {
    project_root: PathBuf,
    folder: PathBuf,
}

impl TextGridStore {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let folder = TEXTGRID_FOLDER
            .split('/')
            .fold(project_root.clone(), |path, part| path.join(part));
        Self {
            project_root,
            folder,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Folder holding every stored TextGrid of the project
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Backing file path for `unit`. Never touches the file system.
    pub fn path(&self, unit: &AnnotationUnit) -> PathBuf {
        self.folder.join(unit.file_name())
    }

    /// Unit holding the session-wide TextGrid
    pub fn default_unit(&self, corpus: &str, session: &str) -> Result<AnnotationUnit> {
        AnnotationUnit::default_for(corpus, session)
    }

    pub fn exists(&self, unit: &AnnotationUnit) -> bool {
        self.path(unit).is_file()
    }

    /// Load and parse the TextGrid for `unit`
    pub fn load(&self, unit: &AnnotationUnit) -> Result<TextGrid> {
        load_textgrid_file(&self.path(unit))
    }

    /// Store `textgrid` as the content of `unit`, replacing any previous file
    pub fn save(&self, textgrid: &TextGrid, unit: &AnnotationUnit) -> Result<()> {
        let path = self.path(unit);
        save_textgrid_file(textgrid, &path)?;
        debug!("Saved TextGrid {} to {}", unit, path.display());
        Ok(())
    }

    /// Remove the backing file of `unit`
    pub fn delete(&self, unit: &AnnotationUnit) -> Result<()> {
        let path = self.path(unit);
        std::fs::remove_file(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
            _ => Error::Io(e),
        })
    }

    /// Unit ids stored for one session. File names that do not follow the
    /// naming convention are skipped.
    pub fn units_for_session(&self, corpus: &str, session: &str) -> Result<BTreeSet<String>> {
        let entries = match std::fs::read_dir(&self.folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Error reading entry in {}: {}", self.folder.display(), e);
                    continue;
                }
            };
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some(unit) = AnnotationUnit::from_file_name(name) {
                if unit.same_session(corpus, session) {
                    ids.insert(unit.unit_id);
                }
            }
        }
        Ok(ids)
    }

    /// Copy an existing TextGrid file into the store. The file stem becomes
    /// the unit id. The file is parsed first, so malformed input is rejected
    /// before anything is written.
    pub fn import_file(&self, source: &Path, corpus: &str, session: &str) -> Result<AnnotationUnit> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::InvalidInput(format!("cannot derive a name from {}", source.display()))
            })?;
        let unit = AnnotationUnit::new(corpus, session, stem)?;
        let textgrid = load_textgrid_file(source)?;
        self.save(&textgrid, &unit)?;
        Ok(unit)
    }
}

/// Load a TextGrid from any file path
pub fn load_textgrid_file(path: &Path) -> Result<TextGrid> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::NotFound(path.display().to_string()),
        _ => Error::Io(e),
    })?;
    let text = decode_text(&bytes)?;
    parse_textgrid(&text).map_err(|e| match e {
        Error::Parse(msg) => Error::Parse(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Write a TextGrid atomically: temporary file in the target folder, then
/// rename over the destination.
pub fn save_textgrid_file(textgrid: &TextGrid, path: &Path) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::InvalidInput(format!("{} has no parent folder", path.display())))?;
    std::fs::create_dir_all(parent)?;

    let bytes = write_textgrid(textgrid);
    let mut temp = tempfile::Builder::new()
        .prefix(".tgsync-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(&bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
