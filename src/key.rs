//! Typed field definitions.
//!
//! A [`TemplateKey`] names one field of a path template and carries the rules
//! for moving between the field's typed [`Value`] and its literal path token:
//!
//! ```text
//! Value ── render() ──▶ token          "0001"
//! token ── parse()  ──▶ Value          Int(1)
//!          abstract_token() ──▶ "%04d" (abstract keys only)
//! ```
//!
//! The format rules are a closed tagged variant per kind ([`KeyKind`]) rather
//! than anything dynamic: each variant knows how to render, how to parse, and
//! which regex fragment it contributes to a compiled template pattern (see
//! `engine/compiled.rs`).

use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use regex::Regex;

/// Default strftime format for [`KeyKind::Timestamp`] keys.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// A concrete typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Time(NaiveDateTime),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<NaiveDateTime> for Value {
    fn from(t: NaiveDateTime) -> Self {
        Value::Time(t)
    }
}

/// Rendering/parsing rule per key kind.
#[derive(Debug, Clone)]
pub enum KeyKind {
    /// Free string, optionally constrained by a full-match pattern.
    /// Values never contain path separators.
    Str { pattern: Option<Regex> },
    /// Base-10 integer.
    Int,
    /// Zero-padded sequence number (frame counters and friends). `width` is
    /// the minimum rendered digit count.
    Sequence { width: usize },
    /// Timestamp rendered and parsed through a chrono strftime format.
    Timestamp { format: String },
    /// Closed set of legal string values.
    Choice { values: Vec<String> },
}

impl KeyKind {
    /// Unconstrained string kind.
    pub fn string() -> Self {
        KeyKind::Str { pattern: None }
    }

    /// String kind constrained to `pattern` (matched against the whole token).
    pub fn string_matching(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| Error::Configuration(format!("invalid key pattern '{pattern}': {e}")))?;
        Ok(KeyKind::Str { pattern: Some(re) })
    }

    pub fn sequence(width: usize) -> Self {
        KeyKind::Sequence { width }
    }

    /// Timestamp kind using [`DEFAULT_TIMESTAMP_FORMAT`].
    pub fn timestamp() -> Self {
        KeyKind::Timestamp { format: DEFAULT_TIMESTAMP_FORMAT.to_string() }
    }

    pub fn timestamp_format(format: impl Into<String>) -> Self {
        KeyKind::Timestamp { format: format.into() }
    }

    pub fn choice<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyKind::Choice { values: values.into_iter().map(Into::into).collect() }
    }
}

/// A named, typed field definition referenced by templates.
///
/// Immutable after registry load; shared read-only across threads.
#[derive(Debug, Clone)]
pub struct TemplateKey {
    pub name: String,
    pub kind: KeyKind,
    /// The key may be absent from a field set when rendering/matching.
    pub optional: bool,
    /// `Some` marks the key abstract: its many concrete values collapse to
    /// this one symbolic token (`%04d`, `%V`, ...).
    pub abstract_value: Option<String>,
    /// Fallback value used when rendering if the field set has none.
    pub default: Option<Value>,
}

impl TemplateKey {
    pub fn new(name: impl Into<String>, kind: KeyKind) -> Self {
        TemplateKey { name: name.into(), kind, optional: false, abstract_value: None, default: None }
    }

    /// Mark the key optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Mark the key abstract, collapsing to `token`.
    pub fn abstract_as(mut self, token: impl Into<String>) -> Self {
        self.abstract_value = Some(token.into());
        self
    }

    /// Set a fallback value used when a field set has none.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn is_abstract(&self) -> bool {
        self.abstract_value.is_some()
    }

    /// The symbolic token abstract keys collapse to; `None` for concrete keys.
    pub fn abstract_token(&self) -> Option<&str> {
        self.abstract_value.as_deref()
    }

    /// Produce the literal path token for `value`.
    pub fn render(&self, value: &Value) -> Result<String> {
        match (&self.kind, value) {
            (KeyKind::Str { pattern }, Value::Str(s)) => {
                if s.is_empty() {
                    return Err(self.invalid(value, "empty string"));
                }
                if s.contains('/') {
                    return Err(self.invalid(value, "contains a path separator"));
                }
                if let Some(re) = pattern {
                    if !full_match(re, s) {
                        return Err(self.invalid(value, &format!("does not match '{}'", re.as_str())));
                    }
                }
                Ok(s.clone())
            }
            (KeyKind::Int, Value::Int(i)) => Ok(i.to_string()),
            (KeyKind::Sequence { width }, Value::Int(i)) => {
                if *i < 0 {
                    return Err(self.invalid(value, "sequence numbers cannot be negative"));
                }
                Ok(format!("{i:0width$}", width = *width))
            }
            (KeyKind::Timestamp { format }, Value::Time(t)) => Ok(t.format(format).to_string()),
            (KeyKind::Choice { values }, Value::Str(s)) => {
                if values.iter().any(|v| v == s) {
                    Ok(s.clone())
                } else {
                    Err(self.invalid(value, &format!("not one of [{}]", values.join(", "))))
                }
            }
            _ => Err(self.invalid(value, "wrong value type for this key")),
        }
    }

    /// Inverse of [`render`](Self::render): recover the typed value from a
    /// path token.
    pub fn parse(&self, token: &str) -> Result<Value> {
        match &self.kind {
            KeyKind::Str { pattern } => {
                if token.is_empty() || token.contains('/') {
                    return Err(self.mismatch(token));
                }
                if let Some(re) = pattern {
                    if !full_match(re, token) {
                        return Err(self.mismatch(token));
                    }
                }
                Ok(Value::Str(token.to_string()))
            }
            KeyKind::Int => {
                if !regex!(r"^-?\d+$").is_match(token) {
                    return Err(self.mismatch(token));
                }
                token.parse::<i64>().map(Value::Int).map_err(|_| self.mismatch(token))
            }
            KeyKind::Sequence { width } => {
                if !regex!(r"^\d+$").is_match(token) || token.len() < *width {
                    return Err(self.mismatch(token));
                }
                // A run longer than the pad width cannot carry a leading zero:
                // width 4 renders 1 as "0001" and 12345 as "12345", never "012345".
                if token.len() > *width && token.starts_with('0') {
                    return Err(self.mismatch(token));
                }
                token.parse::<i64>().map(Value::Int).map_err(|_| self.mismatch(token))
            }
            KeyKind::Timestamp { format } => NaiveDateTime::parse_from_str(token, format)
                .map(Value::Time)
                .map_err(|_| self.mismatch(token)),
            KeyKind::Choice { values } => {
                if values.iter().any(|v| v == token) {
                    Ok(Value::Str(token.to_string()))
                } else {
                    Err(self.mismatch(token))
                }
            }
        }
    }

    /// Regex fragment this key contributes to a compiled template pattern.
    ///
    /// Fragments are lazy where the token shape is open-ended so adjacent
    /// literal text stays in charge of the boundary; `parse` has the final
    /// word on candidates the regex lets through.
    pub(crate) fn pattern_fragment(&self) -> String {
        match &self.kind {
            KeyKind::Str { pattern: Some(re) } => format!("(?:{})", re.as_str()),
            KeyKind::Str { pattern: None } => "[^/]+?".to_string(),
            KeyKind::Int => r"-?\d+".to_string(),
            KeyKind::Sequence { width } => format!(r"\d{{{width},}}"),
            KeyKind::Timestamp { format } => timestamp_fragment(format),
            KeyKind::Choice { values } => {
                let alts: Vec<String> = values.iter().map(|v| regex::escape(v)).collect();
                format!("(?:{})", alts.join("|"))
            }
        }
    }

    fn invalid(&self, value: &Value, reason: &str) -> Error {
        Error::InvalidValue { key: self.name.clone(), value: value.to_string(), reason: reason.to_string() }
    }

    fn mismatch(&self, token: &str) -> Error {
        Error::ParseMismatch { key: self.name.clone(), token: token.to_string() }
    }
}

fn full_match(re: &Regex, s: &str) -> bool {
    re.find(s).is_some_and(|m| m.start() == 0 && m.end() == s.len())
}

/// Derive a match fragment from a strftime format: fixed-width directives map
/// to digit runs, everything else is escaped. Unknown directives give up and
/// fall back to a lazy any-token fragment; `NaiveDateTime::parse_from_str`
/// still validates whatever the regex lets through.
fn timestamp_fragment(format: &str) -> String {
    let mut out = String::new();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push_str(&regex::escape(&c.to_string()));
            continue;
        }
        match chars.next() {
            Some('Y') => out.push_str(r"\d{4}"),
            Some('m') | Some('d') | Some('H') | Some('M') | Some('S') => out.push_str(r"\d{2}"),
            Some('j') => out.push_str(r"\d{3}"),
            Some('%') => out.push_str("%"),
            _ => return "[^/]+?".to_string(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn seq4() -> TemplateKey {
        TemplateKey::new("frame", KeyKind::sequence(4)).abstract_as("%04d")
    }

    #[test]
    fn sequence_render_pads_to_width() {
        let cases: Vec<(i64, &str)> = vec![(1, "0001"), (24, "0024"), (1001, "1001"), (12345, "12345")];
        for (value, expected) in cases {
            assert_eq!(seq4().render(&Value::Int(value)).unwrap(), expected);
        }
    }

    #[test]
    fn sequence_parse_enforces_padding() {
        let key = seq4();
        assert_eq!(key.parse("0001").unwrap(), Value::Int(1));
        assert_eq!(key.parse("12345").unwrap(), Value::Int(12345));
        for bad in ["001", "01234", "1a01", "%04d"] {
            assert!(matches!(key.parse(bad), Err(Error::ParseMismatch { .. })), "token {bad:?}");
        }
    }

    #[test]
    fn sequence_rejects_negative_values() {
        assert!(matches!(seq4().render(&Value::Int(-1)), Err(Error::InvalidValue { .. })));
    }

    #[test]
    fn string_key_rejects_separators_and_wrong_type() {
        let key = TemplateKey::new("Shot", KeyKind::string());
        assert_eq!(key.render(&Value::from("shot010")).unwrap(), "shot010");
        assert!(key.render(&Value::from("a/b")).is_err());
        assert!(key.render(&Value::Int(3)).is_err());
    }

    #[test]
    fn string_pattern_is_a_full_match() {
        let key = TemplateKey::new("Shot", KeyKind::string_matching("[a-z]+[0-9]{3}").unwrap());
        assert!(key.render(&Value::from("shot010")).is_ok());
        // a bare substring match would accept both of these
        assert!(key.render(&Value::from("shot010_extra")).is_err());
        assert!(key.parse("Xshot010").is_err());
    }

    #[test]
    fn choice_key_is_a_closed_set() {
        let key = TemplateKey::new("eye", KeyKind::choice(["left", "right"])).abstract_as("%V");
        assert_eq!(key.render(&Value::from("left")).unwrap(), "left");
        assert!(key.render(&Value::from("center")).is_err());
        assert!(key.parse("center").is_err());
        assert_eq!(key.abstract_token(), Some("%V"));
    }

    #[test]
    fn timestamp_round_trips_through_format() {
        let key = TemplateKey::new("at", KeyKind::timestamp());
        let t = NaiveDate::from_ymd_opt(2021, 3, 9).unwrap().and_hms_opt(14, 30, 0).unwrap();
        let token = key.render(&Value::Time(t)).unwrap();
        assert_eq!(token, "2021-03-09-14-30-00");
        assert_eq!(key.parse(&token).unwrap(), Value::Time(t));
        assert!(key.parse("2021-03-09").is_err());
    }

    #[test]
    fn int_parse_accepts_signed_tokens() {
        let key = TemplateKey::new("version", KeyKind::Int);
        assert_eq!(key.parse("12").unwrap(), Value::Int(12));
        assert_eq!(key.parse("-4").unwrap(), Value::Int(-4));
        assert!(key.parse("v12").is_err());
    }

    #[test]
    fn abstract_token_is_independent_of_values() {
        let key = seq4();
        assert!(key.is_abstract());
        assert_eq!(key.abstract_token(), Some("%04d"));
        let plain = TemplateKey::new("Shot", KeyKind::string());
        assert!(!plain.is_abstract());
        assert_eq!(plain.abstract_token(), None);
    }

    #[test]
    fn timestamp_fragment_tracks_format() {
        assert_eq!(timestamp_fragment("%Y-%m-%d"), r"\d{4}\-\d{2}\-\d{2}");
        assert_eq!(timestamp_fragment("%Y%q"), "[^/]+?");
    }
}
