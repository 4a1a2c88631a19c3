#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// Build a [`Fields`](crate::Fields) map from `name => value` pairs.
///
/// Values go through [`Value::from`](crate::Value), so string and integer
/// literals work directly:
///
/// ```
/// let f = pathweave::fields! { "Shot" => "shot010", "version" => 12 };
/// assert_eq!(f.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::Fields::new() };
    ( $($name:expr => $value:expr),+ $(,)? ) => {{
        let mut f = $crate::Fields::new();
        $( f.insert($name, $crate::Value::from($value)); )+
        f
    }};
}
