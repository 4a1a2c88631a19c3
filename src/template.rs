//! Path templates.
//!
//! A [`Template`] is an ordered path pattern mixing literal text with named
//! key placeholders, used in both directions: fields are rendered *into* a
//! concrete path ([`Template::apply_fields`]) and a literal path is parsed
//! *back* into fields ([`Template::get_fields`]).
//!
//! ```text
//! definition:  /proj/{Sequence}/{Shot}/render/{Shot}[_{pass}].{frame}.exr
//!                                               └────┬────┘
//!                                     optional section: in or out
//!
//! key-sets:    [Sequence, Shot, pass, frame]   (all sections in)
//!              [Sequence, Shot, frame]         (optional section out)
//! ```
//!
//! Every combination of optional sections yields one *key-set*: the flat
//! token list for that variation, its ordered key occurrences, and a
//! compiled anchored pattern (see `engine/compiled.rs`). Key-sets are
//! ordered most-specific first — descending key count, then descending
//! required-key count, then expansion order — and both rendering and
//! matching try them in that order. The first key-set (all optional
//! sections present) is the *default* key-set.
//!
//! Templates form a parent tree one path segment at a time; the tree lives
//! in an arena owned by [`TemplateRegistry`](crate::TemplateRegistry), and a
//! template only stores its parent's index.

use crate::engine::{CompiledKeySet, compile_key_set};
use crate::error::{Error, Result};
use crate::key::TemplateKey;
use crate::registry::TemplateId;
use crate::{DefToken, Fields};
use std::collections::{BTreeMap, BTreeSet};

/// How [`Template::render`] treats keys missing from the field set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderMode {
    /// Missing keys fall back to their default or fail.
    Strict,
    /// Missing *abstract* keys render their abstract token; everything else
    /// behaves as in `Strict`. Used when collapsing search results.
    AbstractDefaults,
}

/// One legal combination of keys a template's literal structure can express.
#[derive(Debug, Clone)]
pub struct KeySet {
    /// Flat token list for this variation, adjacent literals merged.
    pub(crate) tokens: Vec<DefToken>,
    /// Key occurrences in definition order, duplicates preserved.
    pub(crate) key_order: Vec<String>,
    /// Unique key names.
    pub(crate) names: BTreeSet<String>,
    pub(crate) required: BTreeSet<String>,
    pub(crate) optional: BTreeSet<String>,
    pub(crate) compiled: CompiledKeySet,
}

impl KeySet {
    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Key occurrences in definition order; a key referenced twice appears
    /// twice.
    pub fn key_order(&self) -> impl Iterator<Item = &str> {
        self.key_order.iter().map(String::as_str)
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str)
    }

    pub fn optional_keys(&self) -> impl Iterator<Item = &str> {
        self.optional.iter().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// A declarative path pattern with one or more key-sets.
///
/// Immutable after registry load; concurrent callers share templates
/// read-only. Construction happens through
/// [`TemplateRegistry::add_template`](crate::TemplateRegistry::add_template).
#[derive(Debug, Clone)]
pub struct Template {
    pub(crate) id: TemplateId,
    name: Option<String>,
    definition: String,
    /// Keys referenced by this template, by name.
    keys: BTreeMap<String, TemplateKey>,
    /// Most-specific first; `key_sets[0]` is the default key-set.
    key_sets: Vec<KeySet>,
    pub(crate) parent: Option<TemplateId>,
}

impl Template {
    pub(crate) fn new(
        id: TemplateId,
        name: Option<String>,
        definition: &str,
        registry_keys: &BTreeMap<String, TemplateKey>,
        parent: Option<TemplateId>,
    ) -> Result<Self> {
        let definition = definition.trim_end_matches('/');
        if definition.is_empty() {
            return Err(Error::Configuration("empty template definition".to_string()));
        }

        let pieces = tokenize(definition)?;
        let optionals = pieces.iter().filter(|p| matches!(p, Piece::Optional(_))).count();
        if optionals > 10 {
            return Err(Error::Configuration(format!(
                "template '{definition}' has {optionals} optional sections; at most 10 are supported"
            )));
        }
        let mut key_sets = Vec::new();
        for tokens in expand_variations(&pieces) {
            if key_sets.iter().any(|ks: &KeySet| ks.tokens == tokens) {
                continue;
            }
            key_sets.push(build_key_set(definition, tokens, registry_keys)?);
        }

        // Most-specific first: key count, then required count, then the
        // expansion order produced above.
        key_sets.sort_by(|a, b| {
            (b.names.len(), b.required.len()).cmp(&(a.names.len(), a.required.len()))
        });

        let mut keys = BTreeMap::new();
        for ks in &key_sets {
            for n in &ks.names {
                if !keys.contains_key(n) {
                    keys.insert(n.clone(), registry_keys[n].clone());
                }
            }
        }

        Ok(Template { id, name, definition: definition.to_string(), keys, key_sets, parent })
    }

    pub fn id(&self) -> TemplateId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn parent_id(&self) -> Option<TemplateId> {
        self.parent
    }

    /// Keys referenced by this template, in name order.
    pub fn keys(&self) -> impl Iterator<Item = &TemplateKey> {
        self.keys.values()
    }

    pub fn key_names(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn key(&self, name: &str) -> Option<&TemplateKey> {
        self.keys.get(name)
    }

    /// Whether `name` is a key of this template marked optional.
    pub fn is_optional(&self, name: &str) -> bool {
        self.keys.get(name).is_some_and(|k| k.optional)
    }

    /// Key-sets, most-specific first.
    pub fn key_sets(&self) -> &[KeySet] {
        &self.key_sets
    }

    pub(crate) fn default_key_set(&self) -> &KeySet {
        &self.key_sets[0]
    }

    /// Render `fields` into a concrete path.
    ///
    /// Selects the first key-set whose every key has a concrete value or a
    /// default; fails with [`Error::MissingRequiredKey`] when none qualifies
    /// and [`Error::InvalidValue`] when a value violates its key's format.
    pub fn apply_fields(&self, fields: &Fields) -> Result<String> {
        self.render(fields, RenderMode::Strict)
    }

    /// Like [`apply_fields`](Self::apply_fields), but missing abstract keys
    /// render their abstract token instead of failing.
    pub(crate) fn apply_fields_abstract(&self, fields: &Fields) -> Result<String> {
        self.render(fields, RenderMode::AbstractDefaults)
    }

    fn render(&self, fields: &Fields, mode: RenderMode) -> Result<String> {
        let ks = self
            .select_key_set(fields, mode)
            .ok_or_else(|| self.missing_required(fields))?;
        let mut out = String::new();
        for token in &ks.tokens {
            match token {
                DefToken::Literal(text) => out.push_str(text),
                DefToken::Key(name) => out.push_str(&self.render_key(name, fields, mode)?),
            }
        }
        Ok(out)
    }

    fn select_key_set(&self, fields: &Fields, mode: RenderMode) -> Option<&KeySet> {
        self.key_sets.iter().find(|ks| {
            ks.names.iter().all(|name| {
                let key = &self.keys[name];
                fields.contains(name)
                    || key.default.is_some()
                    || (mode == RenderMode::AbstractDefaults && key.is_abstract())
            })
        })
    }

    fn render_key(&self, name: &str, fields: &Fields, mode: RenderMode) -> Result<String> {
        let key = &self.keys[name];
        if let Some(value) = fields.get(name) {
            return key.render(value);
        }
        if mode == RenderMode::AbstractDefaults {
            if let Some(token) = key.abstract_token() {
                return Ok(token.to_string());
            }
        }
        if let Some(default) = &key.default {
            return key.render(default);
        }
        Err(self.missing_required(fields))
    }

    /// Render one specific key-set into a concrete path, without key-set
    /// selection. Used by search when a key-set is fully constrained.
    pub(crate) fn render_key_set_path(&self, ks: &KeySet, fields: &Fields) -> Result<String> {
        let mut out = String::new();
        for token in &ks.tokens {
            match token {
                DefToken::Literal(text) => out.push_str(text),
                DefToken::Key(name) => {
                    out.push_str(&self.render_key(name, fields, RenderMode::Strict)?)
                }
            }
        }
        Ok(out)
    }

    /// Render one key-set into a glob search string: literal text and
    /// rendered values are glob-escaped, keys in `skip` become `*`. Never a
    /// finished path — only ever fed to the file-system collaborator.
    pub(crate) fn render_key_set_glob(
        &self,
        ks: &KeySet,
        fields: &Fields,
        skip: &BTreeSet<String>,
    ) -> Result<String> {
        let mut out = String::new();
        for token in &ks.tokens {
            match token {
                DefToken::Literal(text) => out.push_str(&glob::Pattern::escape(text)),
                DefToken::Key(name) if skip.contains(name) => out.push('*'),
                DefToken::Key(name) => {
                    let rendered = self.render_key(name, fields, RenderMode::Strict)?;
                    out.push_str(&glob::Pattern::escape(&rendered));
                }
            }
        }
        Ok(out)
    }

    /// Required keys of the default key-set absent from `fields`.
    /// A key with a default is never missing.
    pub fn missing_keys(&self, fields: &Fields) -> Vec<String> {
        self.missing_keys_for(self.default_key_set(), fields, false)
    }

    /// Keys of `ks` absent from `fields`; optional keys are only reported
    /// when `include_optional` is set.
    pub fn missing_keys_for(
        &self,
        ks: &KeySet,
        fields: &Fields,
        include_optional: bool,
    ) -> Vec<String> {
        ks.names
            .iter()
            .filter(|name| {
                let key = &self.keys[*name];
                if fields.contains(name) || key.default.is_some() {
                    return false;
                }
                include_optional || !key.optional
            })
            .cloned()
            .collect()
    }

    /// Whether `path` matches one of this template's key-sets.
    pub fn validate(&self, path: &str) -> bool {
        crate::engine::fields_from_path(self, path).is_ok()
    }

    /// Parse a literal path back into fields. Fails with [`Error::NoMatch`]
    /// when no key-set accepts the path.
    pub fn get_fields(&self, path: &str) -> Result<Fields> {
        crate::engine::fields_from_path(self, path)
    }

    /// Name for diagnostics: the configured name, or the definition for
    /// anonymous (derived) templates.
    pub(crate) fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.definition)
    }

    fn missing_required(&self, fields: &Fields) -> Error {
        Error::MissingRequiredKey {
            template: self.display_name().to_string(),
            keys: self.missing_keys(fields),
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

// --- Definition parsing -----------------------------------------------------

/// A definition piece before variation expansion: a fixed token, or an
/// optional bracketed run of tokens.
#[derive(Debug, Clone)]
enum Piece {
    One(DefToken),
    Optional(Vec<DefToken>),
}

fn tokenize(definition: &str) -> Result<Vec<Piece>> {
    let conf = |msg: &str| Error::Configuration(format!("template '{definition}': {msg}"));

    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut it = definition.chars();
    while let Some(c) = it.next() {
        match c {
            '{' => {
                if !literal.is_empty() {
                    pieces.push(Piece::One(DefToken::Literal(std::mem::take(&mut literal))));
                }
                pieces.push(Piece::One(DefToken::Key(read_key_name(&mut it, definition)?)));
            }
            '[' => {
                if !literal.is_empty() {
                    pieces.push(Piece::One(DefToken::Literal(std::mem::take(&mut literal))));
                }
                pieces.push(Piece::Optional(read_optional(&mut it, definition)?));
            }
            '}' => return Err(conf("unbalanced '}'")),
            ']' => return Err(conf("unbalanced ']'")),
            _ => literal.push(c),
        }
    }
    if !literal.is_empty() {
        pieces.push(Piece::One(DefToken::Literal(literal)));
    }
    Ok(pieces)
}

fn read_key_name(it: &mut std::str::Chars<'_>, definition: &str) -> Result<String> {
    let mut name = String::new();
    for c in it.by_ref() {
        if c == '}' {
            if !regex!(r"^[A-Za-z_][A-Za-z0-9_]*$").is_match(&name) {
                return Err(Error::Configuration(format!(
                    "template '{definition}': invalid key name '{name}'"
                )));
            }
            return Ok(name);
        }
        name.push(c);
    }
    Err(Error::Configuration(format!("template '{definition}': unclosed '{{'")))
}

fn read_optional(it: &mut std::str::Chars<'_>, definition: &str) -> Result<Vec<DefToken>> {
    let conf = |msg: &str| Error::Configuration(format!("template '{definition}': {msg}"));

    let mut tokens = Vec::new();
    let mut literal = String::new();
    while let Some(c) = it.next() {
        match c {
            '{' => {
                if !literal.is_empty() {
                    tokens.push(DefToken::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(DefToken::Key(read_key_name(it, definition)?));
            }
            ']' => {
                if !literal.is_empty() {
                    tokens.push(DefToken::Literal(literal));
                }
                if !tokens.iter().any(|t| matches!(t, DefToken::Key(_))) {
                    return Err(conf("optional section contains no key"));
                }
                return Ok(tokens);
            }
            '[' => return Err(conf("nested optional sections are not supported")),
            '}' => return Err(conf("unbalanced '}'")),
            _ => literal.push(c),
        }
    }
    Err(conf("unclosed optional section"))
}

/// Expand optional sections into every in/out combination, all-included
/// first. Each variation is a flat token list with adjacent literals merged.
fn expand_variations(pieces: &[Piece]) -> Vec<Vec<DefToken>> {
    let optionals = pieces.iter().filter(|p| matches!(p, Piece::Optional(_))).count();
    let mut variations = Vec::with_capacity(1 << optionals);
    for mask in (0..1u32 << optionals).rev() {
        let mut tokens: Vec<DefToken> = Vec::new();
        let mut opt_idx = 0;
        for piece in pieces {
            match piece {
                Piece::One(tok) => push_merged(&mut tokens, tok.clone()),
                Piece::Optional(inner) => {
                    if mask & (1 << (optionals - 1 - opt_idx)) != 0 {
                        for tok in inner {
                            push_merged(&mut tokens, tok.clone());
                        }
                    }
                    opt_idx += 1;
                }
            }
        }
        variations.push(tokens);
    }
    variations
}

fn push_merged(tokens: &mut Vec<DefToken>, tok: DefToken) {
    if let (Some(DefToken::Literal(prev)), DefToken::Literal(text)) = (tokens.last_mut(), &tok) {
        prev.push_str(text);
        return;
    }
    tokens.push(tok);
}

fn build_key_set(
    definition: &str,
    tokens: Vec<DefToken>,
    registry_keys: &BTreeMap<String, TemplateKey>,
) -> Result<KeySet> {
    let mut key_order = Vec::new();
    let mut names = BTreeSet::new();
    let mut required = BTreeSet::new();
    let mut optional = BTreeSet::new();
    for token in &tokens {
        if let DefToken::Key(name) = token {
            let key = registry_keys.get(name).ok_or_else(|| {
                Error::Configuration(format!("template '{definition}' references unknown key '{name}'"))
            })?;
            key_order.push(name.clone());
            names.insert(name.clone());
            if key.optional {
                optional.insert(name.clone());
            } else {
                required.insert(name.clone());
            }
        }
    }
    let compiled = compile_key_set(&tokens, registry_keys)?;
    Ok(KeySet { tokens, key_order, names, required, optional, compiled })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyKind, TemplateKey, Value};
    use crate::registry::TemplateRegistry;

    fn registry() -> TemplateRegistry {
        let mut reg = TemplateRegistry::new();
        reg.add_key(TemplateKey::new("Sequence", KeyKind::string())).unwrap();
        reg.add_key(TemplateKey::new("Shot", KeyKind::string())).unwrap();
        reg.add_key(TemplateKey::new("pass", KeyKind::string()).optional()).unwrap();
        reg.add_key(TemplateKey::new("version", KeyKind::Int)).unwrap();
        reg.add_key(TemplateKey::new("frame", KeyKind::sequence(4)).abstract_as("%04d")).unwrap();
        reg
    }

    fn template<'a>(reg: &'a mut TemplateRegistry, name: &str, definition: &str) -> &'a Template {
        let id = reg.add_template(name, definition).unwrap();
        reg.get(id)
    }

    #[test]
    fn plain_definition_has_one_key_set() {
        let mut reg = registry();
        let t = template(&mut reg, "shot_render", "/proj/{Sequence}/{Shot}/render/{Shot}.{frame}.exr");
        assert_eq!(t.key_sets().len(), 1);
        let ks = t.default_key_set();
        assert_eq!(ks.key_order, ["Sequence", "Shot", "Shot", "frame"]);
        assert_eq!(ks.names.len(), 3);
    }

    #[test]
    fn optional_sections_expand_into_key_sets() {
        let mut reg = registry();
        let t = template(&mut reg, "comp", "/proj/{Shot}[_{pass}]/v{version}[_{pass}].exr");
        // two sections referencing the same key: in/in, in/out, out/in, out/out,
        // all structurally distinct
        assert_eq!(t.key_sets().len(), 4);
        // default key-set carries every key
        assert_eq!(t.default_key_set().names.len(), 3);
        // most-specific ordering by unique key count
        let counts: Vec<usize> = t.key_sets().iter().map(|ks| ks.names.len()).collect();
        assert_eq!(counts, [3, 3, 3, 2]);
    }

    #[test]
    fn apply_fields_renders_and_round_trips() {
        let mut reg = registry();
        let t = template(&mut reg, "shot_render", "/proj/{Sequence}/{Shot}/render/{Shot}.{frame}.exr");
        let fields = fields! { "Sequence" => "seq01", "Shot" => "shot010", "frame" => 1 };
        let path = t.apply_fields(&fields).unwrap();
        assert_eq!(path, "/proj/seq01/shot010/render/shot010.0001.exr");
        assert_eq!(t.get_fields(&path).unwrap(), fields);
    }

    #[test]
    fn apply_fields_requires_concrete_values_for_abstract_keys() {
        let mut reg = registry();
        let t = template(&mut reg, "shot_render", "/proj/{Sequence}/{Shot}/render/{Shot}.{frame}.exr");
        let err = t.apply_fields(&fields! { "Sequence" => "seq01", "Shot" => "shot010" }).unwrap_err();
        match err {
            Error::MissingRequiredKey { keys, .. } => assert_eq!(keys, ["frame"]),
            other => panic!("expected MissingRequiredKey, got {other:?}"),
        }
    }

    #[test]
    fn apply_fields_drops_unsatisfied_optional_sections() {
        let mut reg = registry();
        let t = template(&mut reg, "comp", "/proj/{Shot}[_{pass}]_v{version}.exr");
        let without = t.apply_fields(&fields! { "Shot" => "shot010", "version" => 2 }).unwrap();
        assert_eq!(without, "/proj/shot010_v2.exr");
        let with = t
            .apply_fields(&fields! { "Shot" => "shot010", "pass" => "diffuse", "version" => 2 })
            .unwrap();
        assert_eq!(with, "/proj/shot010_diffuse_v2.exr");
    }

    #[test]
    fn key_set_preference_order() {
        // When several key-sets are satisfiable, the one with the most keys
        // wins; required count breaks ties; expansion order breaks the rest.
        let mut reg = registry();
        let t = template(&mut reg, "comp", "/proj/{Shot}[_{pass}].exr");
        let fields = fields! { "Shot" => "shot010", "pass" => "beauty" };
        assert_eq!(t.apply_fields(&fields).unwrap(), "/proj/shot010_beauty.exr");
    }

    #[test]
    fn default_values_fill_missing_fields() {
        let mut reg = registry();
        reg.add_key(TemplateKey::new("ext", KeyKind::string()).with_default(Value::from("exr")))
            .unwrap();
        let t = template(&mut reg, "out", "/proj/{Shot}.{ext}");
        assert_eq!(t.apply_fields(&fields! { "Shot" => "shot010" }).unwrap(), "/proj/shot010.exr");
        assert!(t.missing_keys(&fields! { "Shot" => "shot010" }).is_empty());
    }

    #[test]
    fn missing_keys_reports_required_only() {
        let mut reg = registry();
        let t = template(&mut reg, "comp", "/proj/{Sequence}/{Shot}[_{pass}]_v{version}.exr");
        let missing = t.missing_keys(&fields! { "Shot" => "shot010" });
        assert_eq!(missing, ["Sequence", "version"]);
        let all = t.missing_keys_for(t.default_key_set(), &fields! { "Shot" => "shot010" }, true);
        assert_eq!(all, ["Sequence", "pass", "version"]);
    }

    #[test]
    fn unknown_key_is_a_configuration_error() {
        let mut reg = registry();
        let err = reg.add_template("bad", "/proj/{Nope}").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn malformed_definitions_are_rejected() {
        let mut reg = registry();
        for bad in [
            "/proj/{Shot",
            "/proj/Shot}",
            "/proj/[_version]",
            "/proj/[{Shot}[_{pass}]]",
            "/proj/[_{pass}",
            "/proj/{bad name}",
        ] {
            let err = reg.add_template("bad", bad).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "definition {bad:?}");
        }
    }

    #[test]
    fn skip_keys_render_as_glob_wildcards() {
        let mut reg = registry();
        let t = template(&mut reg, "shot_render", "/proj/{Sequence}/{Shot}/render/{Shot}.{frame}.exr");
        let skip: std::collections::BTreeSet<String> =
            ["Shot", "frame"].into_iter().map(String::from).collect();
        let glob = t
            .render_key_set_glob(t.default_key_set(), &fields! { "Sequence" => "seq01" }, &skip)
            .unwrap();
        assert_eq!(glob, "/proj/seq01/*/render/*.*.exr");
    }
}
