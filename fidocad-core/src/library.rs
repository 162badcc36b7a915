//! Macro libraries: lookup from lower-case keys to macro bodies.
//!
//! A library file has an optional `[FIDOLIB name]` first line, `{category}`
//! lines, and `[key description]` headers each followed by the primitive
//! lines of one macro. Keys read from a file are prefixed with the file
//! stem, except for the original standard library.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ModelError, ModelResult};

/// File stem of the original FidoCAD standard library, whose keys carry no
/// prefix.
pub const STANDARD_LIBRARY_STEM: &str = "fcdstdlib";

/// Prefixes of the FidoCadJ libraries treated as standard.
pub const STANDARD_PREFIXES: &[&str] = &["pcb", "ihram", "elettrotecnica"];

#[derive(Debug, Clone, PartialEq)]
pub struct MacroDesc {
    pub key: String,
    /// Human-readable name from the header line.
    pub name: String,
    /// Primitive lines, newline separated.
    pub body: String,
    pub category: String,
    pub library: String,
}

impl MacroDesc {
    pub fn new(key: &str, name: &str, body: &str, category: &str, library: &str) -> Self {
        Self {
            key: key.to_lowercase(),
            name: name.to_string(),
            body: body.to_string(),
            category: category.to_string(),
            library: library.to_string(),
        }
    }
}

/// True for keys of the original standard library (no prefix) and of the
/// FidoCadJ standard libraries.
pub fn is_standard_key(key: &str) -> bool {
    match key.split_once('.') {
        None => true,
        Some((prefix, _)) => STANDARD_PREFIXES.contains(&prefix.to_lowercase().as_str()),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacroLibrary {
    macros: BTreeMap<String, MacroDesc>,
}

impl MacroLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, desc: MacroDesc) {
        self.macros.insert(desc.key.to_lowercase(), desc);
    }

    pub fn get(&self, key: &str) -> Option<&MacroDesc> {
        self.macros.get(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacroDesc> {
        self.macros.values()
    }

    /// Adds every macro in `text`, keys prefixed with `prefix` when it is not
    /// empty. Returns how many macros were read.
    pub fn parse_str(&mut self, text: &str, prefix: &str, source: &str) -> ModelResult<usize> {
        let err = |message: &str| ModelError::Library { file: source.to_string(), message: message.to_string() };
        let mut library_name = String::new();
        let mut category = String::new();
        let mut current: Option<MacroDesc> = None;
        let mut count = 0;

        for raw in text.lines() {
            let line = raw.trim();
            if line.len() <= 1 {
                continue;
            }
            if let Some(rest) = line.strip_prefix('{') {
                let end = rest.find('}').ok_or_else(|| err("category not terminated with }"))?;
                category = rest[..end].trim().to_string();
                continue;
            }
            if let Some(rest) = line.strip_prefix('[') {
                let end = rest.find(']').ok_or_else(|| err("macro name not terminated with ]"))?;
                let header = &rest[..end];
                let (key, long_name) = header.split_once(' ').unwrap_or((header, ""));
                if key == "FIDOLIB" {
                    library_name = long_name.trim().to_string();
                    continue;
                }
                if let Some(done) = current.take() {
                    self.insert(done);
                    count += 1;
                }
                let key = if prefix.is_empty() { key.to_string() } else { format!("{}.{}", prefix, key) };
                current = Some(MacroDesc::new(&key, long_name.trim(), "", &category, &library_name));
                continue;
            }
            if let Some(desc) = current.as_mut() {
                if !desc.body.is_empty() {
                    desc.body.push('\n');
                }
                desc.body.push_str(line);
            }
        }
        if let Some(done) = current.take() {
            self.insert(done);
            count += 1;
        }
        Ok(count)
    }

    /// Reads a library file; its stem becomes the key prefix.
    pub fn load_file(&mut self, path: &Path) -> ModelResult<usize> {
        let text = std::fs::read_to_string(path)?;
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("").to_lowercase();
        let prefix = if stem == STANDARD_LIBRARY_STEM { "" } else { stem.as_str() };
        let count = self.parse_str(&text, prefix, &path.display().to_string())?;
        log::info!("Loaded {} macros from {}", count, path.display());
        Ok(count)
    }
}
