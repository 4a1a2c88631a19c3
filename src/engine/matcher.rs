//! Reverse parsing: literal path → fields.
//!
//! A template matches a path when one of its key-sets does. Key-sets are
//! tried most-specific first; the first one whose anchored pattern matches
//! *and* whose every captured token survives its key's `parse` wins. A
//! pattern-level match can still be rejected here — the regex fragments are
//! deliberately permissive and the key format has the final word (timestamp
//! tokens are the obvious case).
//!
//! Repeated occurrences of one key must carry the same token; conflicting
//! occurrences reject the key-set rather than picking a winner.

use crate::Fields;
use crate::error::{Error, Result};
use crate::template::{KeySet, Template};
use std::collections::BTreeMap;
use tracing::trace;

pub(crate) fn fields_from_path(template: &Template, path: &str) -> Result<Fields> {
    for ks in template.key_sets() {
        if let Some(fields) = try_key_set(template, ks, path) {
            return Ok(fields);
        }
    }
    Err(Error::NoMatch { template: template.display_name().to_string(), path: path.to_string() })
}

fn try_key_set(template: &Template, ks: &KeySet, path: &str) -> Option<Fields> {
    let caps = ks.compiled.regex.captures(path)?;

    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    let mut fields = Fields::new();
    for (i, name) in ks.compiled.slots.iter().enumerate() {
        let token = caps.name(&format!("k{i}"))?.as_str();
        if let Some(prev) = seen.get(name.as_str()) {
            if *prev != token {
                trace!(template = %template, key = %name, "repeated key captured conflicting tokens");
                return None;
            }
            continue;
        }
        match template.key(name)?.parse(token) {
            Ok(value) => {
                seen.insert(name, token);
                fields.insert(name.clone(), value);
            }
            Err(_) => {
                trace!(template = %template, key = %name, token, "token rejected by key format");
                return None;
            }
        }
    }
    Some(fields)
}
