//! Abstraction collapsing.
//!
//! A template with abstract keys describes a *family* of concrete files —
//! every frame of an image sequence, both stereo eyes. Collapsing folds the
//! per-file differences in those keys into one symbolic representative path
//! per family:
//!
//! ```text
//! shot010.0001.exr ┐
//! shot010.0002.exr ├─▶ shot010.%04d.exr
//! shot010.0003.exr ┘
//! ```
//!
//! When every leaf-level key (present in the template but not its parent)
//! is abstract or concretely pinned by the caller, the search runs one
//! level up the parent tree instead — the leaf files never need to be
//! enumerated just to be folded back down. A consequence worth knowing:
//! in that mode an existing directory yields its abstract leaf path even
//! before any concrete file has been written into it, exactly like the
//! directory-level search implies.

use crate::Fields;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::registry::TemplateRegistry;
use crate::template::Template;
use std::collections::BTreeSet;
use tracing::debug;

pub(crate) fn abstract_paths_from_template(
    fs: &dyn FileSystem,
    registry: &TemplateRegistry,
    template: &Template,
    fields: &Fields,
) -> Result<BTreeSet<String>> {
    let parent = template.parent_id().map(|id| registry.get(id));

    // leaf-level keys: in the template, absent from its parent
    let leaf_collapses = template
        .keys()
        .filter(|k| parent.is_none_or(|p| p.key(&k.name).is_none()))
        .all(|k| k.is_abstract() || fields.contains(&k.name));

    let search_template = match (leaf_collapses, parent) {
        (true, Some(p)) => p,
        _ => template,
    };
    debug!(template = %template, search = %search_template, "abstract search level");

    let found = super::search::paths_from_template(fs, search_template, fields, &[], false)?;

    let abstract_names: Vec<&str> =
        search_template.keys().filter(|k| k.is_abstract()).map(|k| k.name.as_str()).collect();

    let mut out = BTreeSet::new();
    for path in &found {
        let mut cur = search_template.get_fields(path)?;

        // pass 1: zero out abstract values so the re-render below picks up
        // abstract tokens instead (left/right both vanish, %V comes back)
        for name in &abstract_names {
            cur.remove(name);
        }

        // pass 2: put back caller-supplied fields the search level dropped;
        // these are always concrete values, never abstract tokens
        for (name, value) in fields.iter() {
            if !cur.contains(name) {
                cur.insert(name.to_string(), value.clone());
            }
        }

        out.insert(template.apply_fields_abstract(&cur)?);
    }
    Ok(out)
}
