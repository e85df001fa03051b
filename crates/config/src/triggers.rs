//! Keyword trigger definitions
//!
//! The trigger file is a JSON object keyed by keyword. Object order is the
//! precedence order, so the set is decoded into a `Vec` rather than a map.

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;

use crate::ConfigError;

/// One keyword and the files it serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerDefinition {
    pub name: String,
    pub active: bool,
    pub files: Vec<String>,
}

impl TriggerDefinition {
    pub fn new(name: impl Into<String>, active: bool, files: Vec<String>) -> Self {
        Self {
            name: name.into(),
            active,
            files,
        }
    }
}

/// Body of a trigger entry as it appears in the file
#[derive(Debug, Deserialize)]
struct TriggerEntry {
    /// Entries without a flag are treated as disabled
    #[serde(default, alias = "ativo")]
    active: bool,

    #[serde(default, alias = "arquivos")]
    files: Vec<String>,
}

/// Ordered trigger configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TriggerSet {
    triggers: Vec<TriggerDefinition>,
}

impl TriggerSet {
    pub fn new(triggers: Vec<TriggerDefinition>) -> Self {
        Self { triggers }
    }

    /// Parse the trigger file contents
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load the trigger file; a missing file yields an empty set
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Trigger file not found, no triggers loaded");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let set = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            total = set.len(),
            active = set.active().count(),
            "Loaded triggers"
        );
        Ok(set)
    }

    /// All triggers, in precedence order
    pub fn iter(&self) -> impl Iterator<Item = &TriggerDefinition> {
        self.triggers.iter()
    }

    /// Active triggers, in precedence order
    pub fn active(&self) -> impl Iterator<Item = &TriggerDefinition> {
        self.triggers.iter().filter(|t| t.active)
    }

    pub fn get(&self, name: &str) -> Option<&TriggerDefinition> {
        self.triggers.iter().find(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

impl<'a> IntoIterator for &'a TriggerSet {
    type Item = &'a TriggerDefinition;
    type IntoIter = std::slice::Iter<'a, TriggerDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.triggers.iter()
    }
}

impl<'de> Deserialize<'de> for TriggerSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TriggerSetVisitor;

        impl<'de> Visitor<'de> for TriggerSetVisitor {
            type Value = TriggerSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping trigger keywords to entries")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut triggers = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, entry)) = map.next_entry::<String, TriggerEntry>()? {
                    // Duplicate keys: the last body wins, first position is kept
                    if let Some(existing) = triggers
                        .iter_mut()
                        .find(|t: &&mut TriggerDefinition| t.name == name)
                    {
                        existing.active = entry.active;
                        existing.files = entry.files;
                        continue;
                    }
                    triggers.push(TriggerDefinition {
                        name,
                        active: entry.active,
                        files: entry.files,
                    });
                }
                Ok(TriggerSet { triggers })
            }
        }

        deserializer.deserialize_map(TriggerSetVisitor)
    }
}
