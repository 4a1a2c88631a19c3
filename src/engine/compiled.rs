//! Per-key-set pattern compilation.
//!
//! Each key-set's token list compiles into one anchored regex: literal text
//! is escaped verbatim, every key occurrence becomes a named capture group
//! filled with the key's format fragment. Group names cannot repeat, so
//! occurrences are numbered `k0..kN` and `slots` maps them back to key
//! names; the matcher enforces that repeated keys captured equal tokens.
//!
//! Compilation happens once, at registry load — templates are immutable
//! afterwards, so the compiled form is shared read-only across threads.

use crate::DefToken;
use crate::error::{Error, Result};
use crate::key::TemplateKey;
use regex::Regex;
use std::collections::BTreeMap;

/// A key-set's literal+key structure as an anchored matching pattern.
#[derive(Debug, Clone)]
pub(crate) struct CompiledKeySet {
    pub(crate) regex: Regex,
    /// Key name per capture slot `k0..kN`, in definition order.
    pub(crate) slots: Vec<String>,
}

pub(crate) fn compile_key_set(
    tokens: &[DefToken],
    keys: &BTreeMap<String, TemplateKey>,
) -> Result<CompiledKeySet> {
    let mut pattern = String::from("^");
    let mut slots = Vec::new();
    for token in tokens {
        match token {
            DefToken::Literal(text) => pattern.push_str(&regex::escape(text)),
            DefToken::Key(name) => {
                let key = keys.get(name).ok_or_else(|| {
                    Error::Configuration(format!("pattern references unknown key '{name}'"))
                })?;
                pattern.push_str(&format!("(?P<k{}>{})", slots.len(), key.pattern_fragment()));
                slots.push(name.clone());
            }
        }
    }
    pattern.push('$');

    let regex = Regex::new(&pattern)
        .map_err(|e| Error::Configuration(format!("cannot compile pattern '{pattern}': {e}")))?;
    Ok(CompiledKeySet { regex, slots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyKind;

    fn keys() -> BTreeMap<String, TemplateKey> {
        let mut m = BTreeMap::new();
        m.insert("Shot".to_string(), TemplateKey::new("Shot", KeyKind::string()));
        m.insert("frame".to_string(), TemplateKey::new("frame", KeyKind::sequence(4)));
        m
    }

    #[test]
    fn literals_are_escaped_and_keys_become_slots() {
        let tokens = vec![
            DefToken::Literal("/proj/".to_string()),
            DefToken::Key("Shot".to_string()),
            DefToken::Literal(".".to_string()),
            DefToken::Key("frame".to_string()),
            DefToken::Literal(".exr".to_string()),
        ];
        let compiled = compile_key_set(&tokens, &keys()).unwrap();
        assert_eq!(compiled.slots, ["Shot", "frame"]);
        assert!(compiled.regex.is_match("/proj/shot010.0001.exr"));
        // the '.' separators are literal dots, not wildcards
        assert!(!compiled.regex.is_match("/proj/shot010x0001xexr"));
        // anchored: no leftover text is tolerated
        assert!(!compiled.regex.is_match("/proj/shot010.0001.exr.bak"));
    }

    #[test]
    fn adjacent_key_boundaries_stay_with_the_literal() {
        let tokens = vec![
            DefToken::Key("Shot".to_string()),
            DefToken::Literal(".".to_string()),
            DefToken::Key("frame".to_string()),
        ];
        let compiled = compile_key_set(&tokens, &keys()).unwrap();
        let caps = compiled.regex.captures("shot.010.1001").unwrap();
        // the lazy shot fragment grows only until the digit run can anchor
        // at the end of input
        assert_eq!(caps.name("k0").unwrap().as_str(), "shot.010");
        assert_eq!(caps.name("k1").unwrap().as_str(), "1001");
    }

    #[test]
    fn unknown_keys_fail_compilation() {
        let tokens = vec![DefToken::Key("Nope".to_string())];
        assert!(matches!(compile_key_set(&tokens, &keys()), Err(Error::Configuration(_))));
    }
}
