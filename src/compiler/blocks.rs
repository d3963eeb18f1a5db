//! The named-block registry.
//!
//! A registry lives for one compilation: it is populated as includes and the
//! main file are lexed, read back on every substitution, and discarded at the
//! end. The driver clones the registry produced by the prepended include
//! files before each main-file compile so that files do not leak definitions
//! to each other.

use std::path::Path;

use rustc_hash::FxHashMap;

use super::error::Frame;

/// A user-defined fragment registered under a name.
#[derive(Debug, Clone)]
pub struct BlockEntry {
    /// The verbatim body, with `$1`..`$9` placeholders intact.
    pub text: String,
    /// Declared number of positional parameters.
    pub param_count: usize,
    /// Where the definition appeared.
    pub defined_at: Frame,
}

/// Per-compilation store of named fragments.
#[derive(Debug, Clone, Default)]
pub struct BlockRegistry {
    blocks: FxHashMap<String, BlockEntry>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user definition. Duplicate names are rejected; the error
    /// carries the site of the earlier definition.
    pub fn add(
        &mut self,
        name: &str,
        text: String,
        param_count: usize,
        defined_at: Frame,
    ) -> Result<(), Frame> {
        if let Some(prev) = self.blocks.get(name) {
            return Err(prev.defined_at.clone());
        }
        self.blocks.insert(
            name.to_string(),
            BlockEntry {
                text,
                param_count,
                defined_at,
            },
        );
        Ok(())
    }

    /// Inserts or replaces a predefined block, bypassing the duplicate check.
    fn set(&mut self, name: &str, text: String, defined_at: Frame) {
        self.blocks.insert(
            name.to_string(),
            BlockEntry {
                text,
                param_count: 0,
                defined_at,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&BlockEntry> {
        self.blocks.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// Registers the positional blocks derived from the input and output
    /// paths: `templatePath`, `templateName`, `templateRoot`,
    /// `templateParent`, and the `out` counterparts. `Root` strips all file
    /// extensions; `Parent` is the name of the containing directory.
    pub fn predefine(&mut self, template: &Path, out: &Path) {
        self.predefine_one("template", template);
        self.predefine_one("out", out);
    }

    fn predefine_one(&mut self, prefix: &str, path: &Path) {
        let at = Frame::file(path.to_path_buf(), 0, 0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let root = match name.find('.') {
            Some(offset) => name[..offset].to_string(),
            None => name.clone(),
        };
        let parent = path
            .parent()
            .and_then(|d| d.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.set(
            &format!("{prefix}Path"),
            path.display().to_string(),
            at.clone(),
        );
        self.set(&format!("{prefix}Name"), name, at.clone());
        self.set(&format!("{prefix}Root"), root, at.clone());
        self.set(&format!("{prefix}Parent"), parent, at);
    }
}
