//! Glob-based multi-match search.
//!
//! `paths_from_template` enumerates the concrete paths satisfying a partial
//! field set. Omitted required keys cannot constrain the search, so they
//! always widen to `*` wildcards; keys explicitly named in `skip_keys`
//! wildcard even when a concrete value is known. One glob is built per
//! feasible key-set, identical globs are searched once, and every raw
//! file-system hit is re-validated against the *full* template — a `*` can
//! absorb text an adjacent literal should have rejected, so the glob alone
//! is never trusted.

use crate::Fields;
use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::template::Template;
use std::collections::BTreeSet;
use tracing::debug;

pub(crate) fn paths_from_template(
    fs: &dyn FileSystem,
    template: &Template,
    fields: &Fields,
    skip_keys: &[&str],
    skip_missing_optional_keys: bool,
) -> Result<BTreeSet<String>> {
    for name in skip_keys {
        if template.key(name).is_none() {
            return Err(Error::Configuration(format!(
                "skip key '{name}' is not a key of template '{}'",
                template.display_name()
            )));
        }
    }

    let mut skip: BTreeSet<String> = skip_keys.iter().map(|s| s.to_string()).collect();

    // working field set: skip keys contribute wildcards, never values
    let mut local_fields = fields.clone();
    for name in &skip {
        local_fields.remove(name);
    }

    // absent required keys cannot constrain the search either
    for name in template.missing_keys(&local_fields) {
        skip.insert(name);
    }

    let mut found = BTreeSet::new();
    let mut searched: BTreeSet<String> = BTreeSet::new();
    for ks in template.key_sets() {
        // project the global skip set onto this key-set
        let mut ks_skip: BTreeSet<String> = skip.iter().filter(|n| ks.contains(n)).cloned().collect();

        // whatever is still unaccounted for must be optional keys
        let missing_optional: Vec<String> = template
            .missing_keys_for(ks, &local_fields, true)
            .into_iter()
            .filter(|n| !ks_skip.contains(n))
            .collect();
        if !missing_optional.is_empty() {
            if skip_missing_optional_keys {
                ks_skip.extend(missing_optional);
            } else {
                // cannot form a glob for this key-set at all
                continue;
            }
        }

        if ks_skip.is_empty() {
            // fully constrained: the search degenerates to an existence check
            let path = template.render_key_set_path(ks, &local_fields)?;
            if !searched.insert(path.clone()) {
                continue;
            }
            debug!(template = %template, %path, "checking literal path");
            if fs.exists(&path) && template.validate(&path) {
                found.insert(path);
            }
            continue;
        }

        let glob_str = template.render_key_set_glob(ks, &local_fields, &ks_skip)?;
        if !searched.insert(glob_str.clone()) {
            // several key-sets can collapse to one search string
            continue;
        }

        let raw = fs.glob(&glob_str)?;
        let mut kept = 0usize;
        for path in raw {
            if template.validate(&path) {
                found.insert(path);
                kept += 1;
            }
        }
        debug!(template = %template, glob = %glob_str, kept, "glob searched");
    }

    Ok(found)
}
