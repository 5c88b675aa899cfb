//! Hand-off script generation
//!
//! The coordinator fills a [`ScriptContext`] (callback port, audio path,
//! TextGrid path, name, segment, audio flag) and a [`ScriptGenerator`]
//! turns it into the script sent to the external tool. The built-in
//! generator substitutes `{{key}}` placeholders in a Praat script template.

use std::collections::BTreeMap;
use std::path::Path;

use tgsync_common::{Error, Result};

/// Context keys every hand-off script receives
pub mod keys {
    pub const REPLY_TO_CALLER: &str = "replyToCaller";
    pub const SOCKET: &str = "socket";
    pub const AUDIO_PATH: &str = "audioPath";
    pub const TEXTGRID_PATH: &str = "textGridPath";
    pub const TEXTGRID_NAME: &str = "textGridName";
    pub const SEGMENT_START: &str = "segmentStart";
    pub const SEGMENT_END: &str = "segmentEnd";
    pub const USE_FULL_AUDIO: &str = "useFullAudio";
}

const OPEN_TEXTGRID_TEMPLATE: &str = include_str!("../templates/open_textgrid.praat");

/// Key/value map handed to a script generator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptContext {
    values: BTreeMap<String, String>,
}

impl ScriptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    /// Insert a value used inside a double-quoted Praat string
    pub fn insert_text(&mut self, key: impl Into<String>, value: &str) -> &mut Self {
        self.insert(key, value.replace('"', "\"\""))
    }

    /// Insert a path as a Praat string
    pub fn insert_path(&mut self, key: impl Into<String>, path: &Path) -> &mut Self {
        self.insert_text(key, &path.to_string_lossy())
    }

    /// Insert a flag as Praat's 1/0
    pub fn insert_flag(&mut self, key: impl Into<String>, flag: bool) -> &mut Self {
        self.insert(key, if flag { 1 } else { 0 })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Produces the script the external tool runs
pub trait ScriptGenerator: Send + Sync {
    fn generate(&self, context: &ScriptContext) -> Result<String>;
}

/// `{{key}}` placeholder template
#[derive(Debug, Clone)]
pub struct TemplateScript {
    template: String,
}

impl TemplateScript {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Built-in template opening a TextGrid and its audio in the editor
    pub fn open_textgrid() -> Self {
        Self::new(OPEN_TEXTGRID_TEMPLATE)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl ScriptGenerator for TemplateScript {
    /// Fails on placeholders missing from the context and on unclosed `{{`
    fn generate(&self, context: &ScriptContext) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| {
                Error::InvalidInput("unclosed '{{' in script template".to_string())
            })?;
            let key = after[..close].trim();
            let value = context.get(key).ok_or_else(|| {
                Error::InvalidInput(format!("script template uses unknown key '{}'", key))
            })?;
            out.push_str(value);
            rest = &after[close + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
