//! Query string dictionary for GET and POST parameters.
//!
//! [`QueryDict`] is a multi-valued, insertion-ordered dictionary. Instances
//! parsed from a request are immutable; [`QueryDict::copy`] returns a
//! mutable clone.

use django_async_core::{DjangoError, DjangoResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters `quote()` never escapes.
const ALWAYS_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Percent-encodes `value`, leaving [`ALWAYS_SAFE`] and the ASCII
/// characters of `safe` as-is.
fn quote(value: &str, safe: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut buf = [0u8; 4];
    for c in value.chars() {
        if c.is_ascii() && safe.contains(c) {
            out.push(c);
        } else {
            out.extend(utf8_percent_encode(c.encode_utf8(&mut buf), ALWAYS_SAFE));
        }
    }
    out
}

/// A multi-valued dictionary for query string and form data.
///
/// # Examples
///
/// ```
/// use django_async_http::QueryDict;
///
/// let qd = QueryDict::parse("color=red&color=blue&size=large");
/// assert_eq!(qd.get("color"), Some("blue"));
/// assert_eq!(qd.get_list("color"), Some(&vec!["red".to_string(), "blue".to_string()]));
///
/// let mut mutable = qd.copy();
/// mutable.set("color", "green").unwrap();
/// assert_eq!(mutable.get("color"), Some("green"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    entries: Vec<(String, Vec<String>)>,
    mutable: bool,
}

impl QueryDict {
    /// Creates an empty, immutable `QueryDict`.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            mutable: false,
        }
    }

    /// Creates an empty, mutable `QueryDict`.
    pub const fn new_mutable() -> Self {
        Self {
            entries: Vec::new(),
            mutable: true,
        }
    }

    /// Parses a URL-encoded string (`"a=1&b=2"`) into an immutable `QueryDict`.
    ///
    /// `+` decodes to a space; empty pairs are skipped.
    pub fn parse(query_string: &str) -> Self {
        let mut qd = Self::new_mutable();
        for pair in query_string.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .map_or((pair, ""), |(k, v)| (k, v));
            qd.push(percent_decode(key), percent_decode(value));
        }
        qd.mutable = false;
        qd
    }

    /// Builds a mutable `QueryDict` from key/value pairs, preserving order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut qd = Self::new_mutable();
        for (k, v) in pairs {
            qd.push(k.into(), v.into());
        }
        qd
    }

    fn push(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key, vec![value])),
        }
    }

    fn ensure_mutable(&self) -> DjangoResult<()> {
        if self.mutable {
            Ok(())
        } else {
            Err(DjangoError::ValueError(
                "This QueryDict instance is immutable".to_string(),
            ))
        }
    }

    /// Returns the last value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.get_list(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns every value for `key`.
    pub fn get_list(&self, key: &str) -> Option<&Vec<String>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values)
    }

    /// Replaces all values for `key` with `value`.
    pub fn set(&mut self, key: &str, value: &str) -> DjangoResult<()> {
        self.ensure_mutable()?;
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => *values = vec![value.to_string()],
            None => self.entries.push((key.to_string(), vec![value.to_string()])),
        }
        Ok(())
    }

    /// Appends `value` to the values for `key`.
    pub fn append(&mut self, key: &str, value: &str) -> DjangoResult<()> {
        self.ensure_mutable()?;
        self.push(key.to_string(), value.to_string());
        Ok(())
    }

    /// Removes `key`, returning its values.
    pub fn pop(&mut self, key: &str) -> DjangoResult<Option<Vec<String>>> {
        self.ensure_mutable()?;
        let index = self.entries.iter().position(|(k, _)| k == key);
        Ok(index.map(|i| self.entries.remove(i).1))
    }

    /// Returns a mutable copy.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            mutable: true,
        }
    }

    /// Encodes as a query string with every non-alphanumeric byte escaped.
    ///
    /// Pairs are sorted so the output is stable for comparisons.
    pub fn urlencode(&self) -> String {
        let mut parts: Vec<String> = self
            .iter_pairs()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    percent_encoding::utf8_percent_encode(k, NON_ALPHANUMERIC),
                    percent_encoding::utf8_percent_encode(v, NON_ALPHANUMERIC)
                )
            })
            .collect();
        parts.sort();
        parts.join("&")
    }

    /// Encodes as a query string, leaving the characters in `safe` as-is.
    ///
    /// Keys keep their insertion order.
    ///
    /// ```
    /// use django_async_http::QueryDict;
    ///
    /// let qd = QueryDict::from_pairs([("next", "http://testserver/rand")]);
    /// assert_eq!(qd.urlencode_safe("/"), "next=http%3A//testserver/rand");
    /// ```
    pub fn urlencode_safe(&self, safe: &str) -> String {
        self.iter_pairs()
            .map(|(k, v)| format!("{}={}", quote(k, safe), quote(v, safe)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn iter_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }

    pub const fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Returns the keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Returns `(key, values)` entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

fn percent_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}
