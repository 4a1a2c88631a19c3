//! Key registry and template arena.
//!
//! The registry is the single owned home of a loaded configuration: every
//! [`TemplateKey`] and every [`Template`], built once and read for the rest of
//! the process's life. Templates live in an arena indexed by [`TemplateId`];
//! a template stores its parent's index, never a back-reference, so the
//! parent tree is strictly top-down and cycle-free. Parents are derived by
//! truncating a definition one path segment at a time and interned as
//! anonymous templates, de-duplicated by definition string.
//!
//! Structurally identical *named* templates are intentionally accepted here:
//! overlap is a configuration defect that surfaces as
//! [`AmbiguousTemplate`](crate::Error::AmbiguousTemplate) at match time with
//! every conflicting name, where an operator can see it — not silently
//! resolved at load time.

use crate::error::{Error, Result};
use crate::key::{KeyKind, TemplateKey};
use crate::template::Template;
use std::collections::{BTreeMap, HashMap};

/// Arena index of a [`Template`]. Only meaningful for the registry that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub(crate) usize);

/// Owned registry of keys and templates; immutable once loading is done.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    keys: BTreeMap<String, TemplateKey>,
    arena: Vec<Template>,
    by_name: BTreeMap<String, TemplateId>,
    by_definition: HashMap<String, TemplateId>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key definition. Names are unique within a registry.
    pub fn add_key(&mut self, key: TemplateKey) -> Result<()> {
        if !regex!(r"^[A-Za-z_][A-Za-z0-9_]*$").is_match(&key.name) {
            return Err(Error::Configuration(format!("invalid key name '{}'", key.name)));
        }
        if let KeyKind::Choice { values } = &key.kind {
            if values.is_empty() {
                return Err(Error::Configuration(format!(
                    "enumerated key '{}' has no legal values",
                    key.name
                )));
            }
        }
        if self.keys.contains_key(&key.name) {
            return Err(Error::Configuration(format!("duplicate key '{}'", key.name)));
        }
        self.keys.insert(key.name.clone(), key);
        Ok(())
    }

    pub fn key(&self, name: &str) -> Option<&TemplateKey> {
        self.keys.get(name)
    }

    /// Registered keys in name order.
    pub fn keys(&self) -> impl Iterator<Item = &TemplateKey> {
        self.keys.values()
    }

    /// Register a named template. Its parent chain is derived and interned
    /// along the way; every key the definition references must already be
    /// registered.
    pub fn add_template(&mut self, name: impl Into<String>, definition: &str) -> Result<TemplateId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(Error::Configuration(format!("duplicate template '{name}'")));
        }

        let def = definition.trim_end_matches('/');
        if let Some(&id) = self.by_definition.get(def) {
            // An anonymous parent interned earlier gets promoted when its
            // definition is registered under a name.
            if self.arena[id.0].name().is_none() {
                self.arena[id.0].set_name(name.clone());
                self.by_name.insert(name, id);
                return Ok(id);
            }
        }

        let id = self.build(Some(name.clone()), def)?;
        self.by_name.insert(name, id);
        self.by_definition.entry(def.to_string()).or_insert(id);
        Ok(id)
    }

    fn build(&mut self, name: Option<String>, definition: &str) -> Result<TemplateId> {
        let parent = self.intern_parent(definition)?;
        let id = TemplateId(self.arena.len());
        let template = Template::new(id, name, definition, &self.keys, parent)?;
        self.arena.push(template);
        Ok(id)
    }

    fn intern_parent(&mut self, definition: &str) -> Result<Option<TemplateId>> {
        let Some(parent_def) = parent_definition(definition) else {
            return Ok(None);
        };
        if let Some(&id) = self.by_definition.get(parent_def) {
            return Ok(Some(id));
        }
        let parent_def = parent_def.to_string();
        let id = self.build(None, &parent_def)?;
        self.by_definition.insert(parent_def, id);
        Ok(Some(id))
    }

    /// Resolve an id issued by this registry.
    ///
    /// # Panics
    /// Panics if `id` came from a different registry.
    pub fn get(&self, id: TemplateId) -> &Template {
        &self.arena[id.0]
    }

    pub fn template(&self, name: &str) -> Option<&Template> {
        self.by_name.get(name).map(|id| &self.arena[id.0])
    }

    /// Named templates in name order. Derived anonymous parents are not
    /// included; they are reachable through [`parent`](Self::parent).
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.by_name.values().map(|id| &self.arena[id.0])
    }

    pub fn parent(&self, template: &Template) -> Option<&Template> {
        template.parent.map(|id| self.get(id))
    }
}

/// Truncate a definition at its last top-level `/` (one outside optional
/// brackets). `None` when the definition is already root-level.
fn parent_definition(definition: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut last = None;
    for (i, c) in definition.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => last = Some(i),
            _ => {}
        }
    }
    match last {
        None | Some(0) => None,
        Some(i) => Some(&definition[..i]),
    }
}
