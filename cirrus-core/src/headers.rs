//! Ordered, multi-valued response header storage.
//!
//! Names keep the spelling they were first added with, lookups ignore
//! ASCII case. Most responses carry only a handful of headers, so entries
//! are stored inline in a `SmallVec`.

use smallvec::SmallVec;
use std::fmt;

/// Number of header entries stored inline.
pub const INLINE_HEADERS: usize = 8;

type Entry = (String, Vec<String>);

/// Response headers, each name mapping to one or more values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: SmallVec<[Entry; INLINE_HEADERS]>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Add a value, keeping any values already present for this name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1.push(value.into()),
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// Set a single value, replacing any existing ones.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = vec![value.into()],
            None => self.entries.push((name, vec![value.into()])),
        }
    }

    /// First value for a name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values for a name, empty if absent.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].1,
            None => &[],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over names and their values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(n, v)| (n, v)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_values() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get_all("Set-Cookie"), ["a=1", "b=2"]);
        assert_eq!(headers.get("SET-COOKIE"), Some("a=1"));
    }

    #[test]
    fn test_set_replaces() {
        let mut headers = Headers::new();
        headers.append("Content-Type", "text/html");
        headers.set("content-type", "text/plain");

        assert_eq!(headers.get_all("Content-Type"), ["text/plain"]);
        assert_eq!(headers.iter().next().map(|(n, _)| n), Some("Content-Type"));
    }

    #[test]
    fn test_insertion_order() {
        let headers: Headers = [("B", "2"), ("A", "1"), ("C", "3")].into_iter().collect();
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["B", "A", "C"]);
    }

    #[test]
    fn test_remove_and_missing() {
        let mut headers: Headers = [("Location", "/")].into_iter().collect();
        assert_eq!(headers.remove("location"), Some(vec!["/".to_string()]));
        assert!(headers.is_empty());
        assert!(headers.get_all("Location").is_empty());
        assert_eq!(headers.get("Location"), None);
    }
}
