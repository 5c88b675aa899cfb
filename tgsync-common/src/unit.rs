//! Annotation unit keys and the backing file-name convention
//!
//! One TextGrid file backs exactly one `(corpus, session, unit id)` triple.
//! Files are named `<corpus>_<session>_<unit id>.TextGrid`, so corpus and
//! session names may not contain underscores.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// File extension for stored TextGrids (including the dot)
pub const TEXTGRID_EXT: &str = ".TextGrid";

/// Unit id used for the session-wide TextGrid
pub const DEFAULT_UNIT_ID: &str = "default";

static FILE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^_]+)_([^_]+)_(.+)\.TextGrid$").expect("valid file name pattern")
});

static RECORD_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^u[0-9]+$").expect("valid record id pattern"));

/// Key for one stored TextGrid
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnnotationUnit {
    pub corpus: String,
    pub session: String,
    pub unit_id: String,
}

impl AnnotationUnit {
    /// Create a validated unit key
    pub fn new(
        corpus: impl Into<String>,
        session: impl Into<String>,
        unit_id: impl Into<String>,
    ) -> Result<Self> {
        let unit = Self {
            corpus: corpus.into(),
            session: session.into(),
            unit_id: unit_id.into(),
        };
        unit.validate()?;
        Ok(unit)
    }

    /// The session-wide unit for `(corpus, session)`
    pub fn default_for(corpus: impl Into<String>, session: impl Into<String>) -> Result<Self> {
        Self::new(corpus, session, DEFAULT_UNIT_ID)
    }

    fn validate(&self) -> Result<()> {
        for (label, value) in [("corpus", &self.corpus), ("session", &self.session)] {
            if value.is_empty() {
                return Err(Error::InvalidInput(format!("{} name is empty", label)));
            }
            if value.contains('_') {
                return Err(Error::InvalidInput(format!(
                    "{} name '{}' may not contain '_'",
                    label, value
                )));
            }
            if has_path_separator(value) {
                return Err(Error::InvalidInput(format!(
                    "{} name '{}' may not contain path separators",
                    label, value
                )));
            }
        }
        if self.unit_id.is_empty() {
            return Err(Error::InvalidInput("unit id is empty".to_string()));
        }
        if has_path_separator(&self.unit_id) {
            return Err(Error::InvalidInput(format!(
                "unit id '{}' may not contain path separators",
                self.unit_id
            )));
        }
        Ok(())
    }

    /// Bare file name of the backing file
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}{}",
            self.corpus, self.session, self.unit_id, TEXTGRID_EXT
        )
    }

    /// Recover a unit key from a bare file name.
    ///
    /// Returns `None` for names that do not follow the convention; those are
    /// expected noise in a shared folder, not errors.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let caps = FILE_NAME_PATTERN.captures(file_name)?;
        let unit = Self {
            corpus: caps[1].to_string(),
            session: caps[2].to_string(),
            unit_id: caps[3].to_string(),
        };
        unit.validate().ok()?;
        Some(unit)
    }

    /// True when this unit is the session-wide default TextGrid
    pub fn is_default(&self) -> bool {
        self.unit_id == DEFAULT_UNIT_ID
    }

    /// True when the unit id is a record identifier (`u<digits>`)
    pub fn is_record_unit(&self) -> bool {
        is_record_id(&self.unit_id)
    }

    /// True when both units belong to the same session
    pub fn same_session(&self, corpus: &str, session: &str) -> bool {
        self.corpus == corpus && self.session == session
    }
}

impl fmt::Display for AnnotationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.corpus, self.session, self.unit_id)
    }
}

/// True when `id` has the shape of a record identifier
pub fn is_record_id(id: &str) -> bool {
    RECORD_ID_PATTERN.is_match(id)
}

fn has_path_separator(value: &str) -> bool {
    value.contains('/') || value.contains('\\')
}
