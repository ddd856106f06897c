//! HTTP headers abstraction for [`HttpRequest`](crate::http::request::HttpRequest) and
//! [`HttpResponse`](crate::http::response::HttpResponse)
//!
//! Headers are stored in an ordered map to preserve insertion order.
//! Lookups are case-insensitive: setting `content-type` replaces an existing
//! `Content-Type`. The first spelling of a name is the one written on the wire.
//!
//! This abstraction does not enforce any HTTP semantics or constraints.
//! Higher-level types are responsible for applying their own rules by
//! wrapping or constraining access to this structure.

use indexmap::IndexMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpHeaders {
    // lowercased name -> (name as first set, value)
    headers: IndexMap<String, (String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self {
            headers: IndexMap::new(),
        }
    }

    pub fn set_raw(&mut self, name: &str, value: &str) {
        let key = name.to_ascii_lowercase();
        match self.headers.get_mut(&key) {
            Some(entry) => entry.1 = value.to_string(),
            None => {
                self.headers
                    .insert(key, (name.to_string(), value.to_string()));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&String> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    /// Removes a header, keeping the relative order of the others.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.headers
            .shift_remove(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.headers.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn stringify(&self) -> String {
        let mut result = String::new();
        for (name, value) in self.iter() {
            result.push_str(&format!("{}: {}\r\n", name, value));
        }
        result
    }
}

/// True when `name: value` can be written as a single header line: the name
/// is a token and the value holds no CR, LF or other control bytes.
pub fn is_valid_header(name: &str, value: &str) -> bool {
    http::HeaderName::from_bytes(name.as_bytes()).is_ok()
        && http::HeaderValue::from_bytes(value.as_bytes()).is_ok()
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for HttpHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = HttpHeaders::new();
        for (name, value) in iter {
            headers.set_raw(name.as_ref(), value.as_ref());
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_case_insensitive_and_keeps_first_spelling() {
        let mut headers = HttpHeaders::new();
        headers.set_raw("Content-Type", "text/plain");
        headers.set_raw("content-type", "text/html");

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("CONTENT-TYPE").map(String::as_str), Some("text/html"));
        assert_eq!(headers.stringify(), "Content-Type: text/html\r\n");
    }

    #[test]
    fn remove_preserves_order() {
        let mut headers: HttpHeaders =
            [("A", "1"), ("B", "2"), ("C", "3")].into_iter().collect();

        assert_eq!(headers.remove("b").as_deref(), Some("2"));
        assert!(!headers.contains("B"));
        assert_eq!(headers.stringify(), "A: 1\r\nC: 3\r\n");
    }

    #[test]
    fn header_validity() {
        assert!(is_valid_header("Retry-After", "60"));
        assert!(is_valid_header("X-Note", "tab\tand caf\u{e9}"));
        assert!(!is_valid_header("X-Note", "a\r\nSet-Cookie: x=1"));
        assert!(!is_valid_header("X-Note", "a\nb"));
        assert!(!is_valid_header("Bad Name", "1"));
        assert!(!is_valid_header("X-Split\r\nSet-Cookie", "1"));
        assert!(!is_valid_header("", "1"));
    }
}
