//! Public entry point.
//!
//! A [`Resolver`] pairs a loaded [`TemplateRegistry`] with a
//! [`FileSystem`] collaborator and exposes the resolution operations.
//! Everything it holds is immutable after construction, so one resolver can
//! be shared read-only across threads.

use crate::Fields;
use crate::engine;
use crate::error::{Error, Result};
use crate::fs::{DiskFileSystem, FileSystem};
use crate::registry::TemplateRegistry;
use crate::template::Template;
use std::collections::BTreeSet;
use tracing::debug;

/// Resolves structured fields to file-system paths and back.
///
/// # Example
/// ```
/// use pathweave::{fields, KeyKind, Resolver, TemplateKey, TemplateRegistry};
///
/// let mut registry = TemplateRegistry::new();
/// registry.add_key(TemplateKey::new("Shot", KeyKind::string()))?;
/// registry.add_key(TemplateKey::new("version", KeyKind::Int))?;
/// let id = registry.add_template("comp", "/proj/{Shot}/comp/v{version}.nk")?;
///
/// let resolver = Resolver::new(registry);
/// let comp = resolver.registry().get(id);
/// let path = comp.apply_fields(&fields! { "Shot" => "shot010", "version" => 3 })?;
/// assert_eq!(path, "/proj/shot010/comp/v3.nk");
/// assert_eq!(resolver.template_from_path(&path)?.unwrap().name(), Some("comp"));
/// # Ok::<(), pathweave::Error>(())
/// ```
pub struct Resolver {
    registry: TemplateRegistry,
    fs: Box<dyn FileSystem>,
}

impl Resolver {
    /// Wrap a loaded registry, searching the real disk.
    pub fn new(registry: TemplateRegistry) -> Self {
        Self::with_filesystem(registry, Box::new(DiskFileSystem))
    }

    /// Wrap a loaded registry with a custom file-system collaborator.
    pub fn with_filesystem(registry: TemplateRegistry, fs: Box<dyn FileSystem>) -> Self {
        Resolver { registry, fs }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Find the template matching `path`.
    ///
    /// Zero matches is a normal `None`. Two or more matches mean the loaded
    /// templates overlap — a configuration defect — and surface as
    /// [`Error::AmbiguousTemplate`] naming every candidate; the engine never
    /// ranks or breaks the tie itself.
    pub fn template_from_path(&self, path: &str) -> Result<Option<&Template>> {
        let matched: Vec<&Template> =
            self.registry.templates().filter(|t| t.validate(path)).collect();
        debug!(%path, candidates = matched.len(), "template scan");
        match matched.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(Error::AmbiguousTemplate {
                path: path.to_string(),
                templates: many.iter().map(|t| t.display_name().to_string()).collect(),
            }),
        }
    }

    /// Enumerate concrete paths on disk satisfying `fields`.
    ///
    /// Absent required keys are automatically wildcarded, so a partial field
    /// set widens the search instead of failing. No matches is an empty set,
    /// not an error.
    pub fn paths_from_template(
        &self,
        template: &Template,
        fields: &Fields,
    ) -> Result<BTreeSet<String>> {
        self.paths_from_template_with(template, fields, &[], false)
    }

    /// Full search form: keys named in `skip_keys` are forced to wildcards
    /// even when `fields` pins them, and `skip_missing_optional_keys`
    /// decides whether key-sets with unfilled optional keys wildcard those
    /// keys (`true`) or drop out of the search (`false`).
    pub fn paths_from_template_with(
        &self,
        template: &Template,
        fields: &Fields,
        skip_keys: &[&str],
        skip_missing_optional_keys: bool,
    ) -> Result<BTreeSet<String>> {
        engine::paths_from_template(
            self.fs.as_ref(),
            template,
            fields,
            skip_keys,
            skip_missing_optional_keys,
        )
    }

    /// Like [`paths_from_template`](Self::paths_from_template), but abstract
    /// keys collapse to their symbolic token: one result per distinct
    /// combination of non-abstract field values found on disk, rather than
    /// one per frame.
    pub fn abstract_paths_from_template(
        &self,
        template: &Template,
        fields: &Fields,
    ) -> Result<BTreeSet<String>> {
        engine::abstract_paths_from_template(self.fs.as_ref(), &self.registry, template, fields)
    }
}
