use std::collections::HashMap;

use crate::error::{TreeError, TreeResult};
use crate::source::{NodeSource, SourceEntry};

#[derive(Debug, Clone)]
enum MemEntry {
    Leaf(u64),
    Internal(Vec<String>),
}

/// In-memory hierarchy keyed by separator-joined identities.
///
/// ```
/// use spacemap::memory_source::MemorySource;
/// use spacemap::source::NodeSource;
///
/// let source = MemorySource::builder("/")
///     .leaf("root/a", 30)
///     .leaf("root/b", 70)
///     .build();
/// assert!(source.load("root").is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    separator: String,
    entries: HashMap<String, MemEntry>,
}

impl MemorySource {
    pub fn builder(separator: &str) -> MemorySourceBuilder {
        MemorySourceBuilder {
            source: MemorySource {
                separator: separator.to_string(),
                entries: HashMap::new(),
            },
        }
    }

    fn name_of<'a>(&self, identity: &'a str) -> &'a str {
        identity
            .rsplit(self.separator.as_str())
            .next()
            .unwrap_or(identity)
    }

    fn parent_of<'a>(&self, identity: &'a str) -> Option<&'a str> {
        identity
            .rsplit_once(self.separator.as_str())
            .map(|(parent, _)| parent)
            .filter(|parent| !parent.is_empty())
    }

    /// Register `identity` under its parent, creating missing ancestors.
    fn link(&mut self, identity: &str) {
        let Some(parent) = self.parent_of(identity).map(str::to_string) else {
            return;
        };
        let is_new = !self.entries.contains_key(&parent);
        let entry = self
            .entries
            .entry(parent.clone())
            .or_insert_with(|| MemEntry::Internal(Vec::new()));
        if let MemEntry::Leaf(_) = entry {
            *entry = MemEntry::Internal(Vec::new());
        }
        if let MemEntry::Internal(children) = entry {
            if !children.iter().any(|c| c == identity) {
                children.push(identity.to_string());
            }
        }
        if is_new {
            self.link(&parent);
        }
    }

    /// Change the stored size of a leaf; later loads see the new value.
    pub fn set_size(&mut self, identity: &str, size: u64) -> TreeResult<()> {
        match self.entries.get_mut(identity) {
            Some(MemEntry::Leaf(stored)) => {
                *stored = size;
                Ok(())
            }
            Some(MemEntry::Internal(_)) => Err(TreeError::NotALeaf(identity.to_string())),
            None => Err(TreeError::MissingEntry(identity.to_string())),
        }
    }
}

impl NodeSource for MemorySource {
    fn load(&self, identity: &str) -> TreeResult<SourceEntry> {
        let name = self.name_of(identity).to_string();
        match self.entries.get(identity) {
            Some(MemEntry::Leaf(size)) => Ok(SourceEntry::Leaf { name, size: *size }),
            Some(MemEntry::Internal(children)) => Ok(SourceEntry::Internal {
                name,
                children: children.clone(),
            }),
            None => Err(TreeError::MissingEntry(identity.to_string())),
        }
    }

    fn separator(&self) -> &str {
        &self.separator
    }
}

pub struct MemorySourceBuilder {
    source: MemorySource,
}

impl MemorySourceBuilder {
    /// Add a leaf; children keep the order in which they were added.
    pub fn leaf(mut self, identity: &str, size: u64) -> Self {
        self.source
            .entries
            .insert(identity.to_string(), MemEntry::Leaf(size));
        self.source.link(identity);
        self
    }

    /// Add a composite entry that may stay empty.
    pub fn dir(mut self, identity: &str) -> Self {
        self.source
            .entries
            .entry(identity.to_string())
            .or_insert_with(|| MemEntry::Internal(Vec::new()));
        self.source.link(identity);
        self
    }

    pub fn build(self) -> MemorySource {
        self.source
    }
}
