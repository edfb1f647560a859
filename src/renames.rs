use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::{KconfigError, Result};

/// One `OLD NEW` pair.  `inverted` marks the explicit new-to-old
/// declaration form (`!NEW OLD`), used when a rename is rolled back but
/// the alias must keep working.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub old: String,
    pub new: String,
    pub inverted: bool,
}

/// Validated rename map.  Chains are collapsed so every old name resolves
/// to its latest canonical name in one lookup.
#[derive(Debug, Clone, Default)]
pub struct RenameMap {
    entries: Vec<RenameEntry>,
    /// old name -> canonical (latest) name, chains collapsed.
    canonical: HashMap<String, String>,
    /// canonical name -> all old names that reach it.
    aliases: HashMap<String, Vec<String>>,
}

impl RenameMap {
    pub fn load(path: &Path) -> Result<RenameMap> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_str(&text)
    }

    /// Parse and validate a rename list.  Lines are `OLD NEW` or
    /// `!NEW OLD`; `#` starts a comment.  Self-renames and cycles are
    /// rejected.
    pub fn parse_str(text: &str) -> Result<RenameMap> {
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(first), Some(second), None) = (parts.next(), parts.next(), parts.next())
            else {
                return Err(KconfigError::Rename(format!(
                    "line {}: expected two names, got `{line}`",
                    lineno + 1
                )));
            };
            let entry = match first.strip_prefix('!') {
                Some(new) => RenameEntry {
                    old: second.to_string(),
                    new: new.to_string(),
                    inverted: true,
                },
                None => RenameEntry {
                    old: first.to_string(),
                    new: second.to_string(),
                    inverted: false,
                },
            };
            if entry.old == entry.new {
                return Err(KconfigError::Rename(format!(
                    "line {}: {} is renamed to itself",
                    lineno + 1,
                    entry.old
                )));
            }
            entries.push(entry);
        }
        Self::build(entries)
    }

    fn build(entries: Vec<RenameEntry>) -> Result<RenameMap> {
        // Inverted declarations are aliases only; they do not extend the
        // rename chain (otherwise a rolled-back rename would read as a
        // cycle).
        let mut step: HashMap<&str, &str> = HashMap::new();
        for e in entries.iter().filter(|e| !e.inverted) {
            if step.insert(&e.old, &e.new).is_some() {
                return Err(KconfigError::Rename(format!(
                    "{} is renamed more than once",
                    e.old
                )));
            }
        }

        // Collapse chains to the latest name, rejecting cycles.
        let mut canonical = HashMap::new();
        let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
        for e in &entries {
            let mut seen = HashSet::new();
            let mut current = if e.inverted {
                e.new.as_str()
            } else {
                e.old.as_str()
            };
            while let Some(&next) = step.get(current) {
                if !seen.insert(current) {
                    return Err(KconfigError::Rename(format!(
                        "rename cycle involving {}",
                        e.old
                    )));
                }
                current = next;
            }
            canonical.insert(e.old.clone(), current.to_string());
            aliases
                .entry(current.to_string())
                .or_default()
                .push(e.old.clone());
        }

        Ok(RenameMap {
            entries,
            canonical,
            aliases,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    /// Latest canonical name for `name`, if it appears as an old name.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.canonical.get(name).map(String::as_str)
    }

    /// All names that a stored record may use for `name`: the name itself
    /// first, then its canonical target, then every alias reaching the
    /// same canonical name.  Lookup works in both directions so a config
    /// written against either generation of names loads.
    pub fn candidates(&self, name: &str) -> Vec<String> {
        let mut out = vec![name.to_string()];
        let canonical = self
            .canonical_name(name)
            .map(str::to_string)
            .unwrap_or_else(|| name.to_string());
        if canonical != name {
            out.push(canonical.clone());
        }
        if let Some(olds) = self.aliases.get(&canonical) {
            for o in olds {
                if o != name {
                    out.push(o.clone());
                }
            }
        }
        out
    }

    /// `(old, canonical)` pairs for the deprecated compatibility section,
    /// in declaration order.
    pub fn deprecated_pairs(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|e| {
                let canonical = self
                    .canonical_name(&e.old)
                    .unwrap_or(e.new.as_str())
                    .to_string();
                (e.old.clone(), canonical)
            })
            .collect()
    }
}
