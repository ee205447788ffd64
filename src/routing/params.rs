//! Captured path parameters.

use std::slice;

/// Ordered list of `(key, value)` pairs captured while matching a path.
///
/// Keys are the rule keys from registration (`id`, `slug`, `*`, `static*`).
/// A fresh list is produced for every lookup; a pooled context clears its
/// list before reuse, so values never leak between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of the first parameter registered under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.pairs.iter(),
        }
    }

    pub(crate) fn push(&mut self, key: &str, value: &str) {
        self.pairs.push((key.to_string(), value.to_string()));
    }

    /// Empties the list, keeping its allocation.
    pub(crate) fn clear(&mut self) {
        self.pairs.clear();
    }

    /// Replaces the contents with `other`, keeping this list's allocation.
    pub(crate) fn replace_with(&mut self, other: Params) {
        self.pairs.clear();
        self.pairs.extend(other.pairs);
    }
}

/// Iterator over `(key, value)` pairs in capture order.
pub struct Iter<'a> {
    inner: slice::Iter<'a, (String, String)>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_key_wins() {
        let mut params = Params::new();
        params.push("id", "1");
        params.push("id", "2");
        assert_eq!(params.get("id"), Some("1"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_iteration_keeps_capture_order() {
        let mut params = Params::new();
        params.push("user", "ana");
        params.push("*", "a/b");
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("user", "ana"), ("*", "a/b")]);
    }

    #[test]
    fn test_clear_and_replace() {
        let mut params = Params::new();
        params.push("id", "1");
        params.clear();
        assert!(params.is_empty());

        let mut other = Params::new();
        other.push("slug", "x");
        params.replace_with(other);
        assert_eq!(params.get("slug"), Some("x"));
        assert_eq!(params.get("id"), None);
    }
}
