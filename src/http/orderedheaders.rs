/// Custom request headers, kept in insertion order as literal header lines.
///
/// Names are canonicalised on the way in, so `HTTP_ACCEPT_CHARSET`,
/// `accept_charset` and `Accept-Charset` all address the same entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    /// (canonical name, formatted `Name: value` line)
    headers: Vec<(String, String)>,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Set a header, or remove it when `value` is `None`.
    ///
    /// Updating an existing header keeps its original position.
    pub fn set_header(&mut self, name: &str, value: Option<&str>) -> &mut Self {
        let name = canonical_header_name(name);
        match value {
            Some(value) => {
                let line = format!("{}: {}", name, value);
                if let Some((_, l)) = self.headers.iter_mut().find(|(n, _)| *n == name) {
                    *l = line;
                } else {
                    self.headers.push((name, line));
                }
            }
            None => self.headers.retain(|(n, _)| *n != name),
        }
        self
    }

    /// Set several headers at once.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in headers {
            self.set_header(name.as_ref(), value.as_ref().map(|v| v.as_ref()));
        }
        self
    }

    pub fn insert(&mut self, name: &str, value: &str) -> &mut Self {
        self.set_header(name, Some(value))
    }

    pub fn remove(&mut self, name: &str) {
        self.set_header(name, None);
    }

    /// The value part of a header line (case-insensitive lookup).
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = canonical_header_name(name);
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, line)| &line[n.len() + 2..])
    }

    /// The formatted header lines, in insertion order.
    pub fn as_list(&self) -> Vec<String> {
        self.headers.iter().map(|(_, line)| line.clone()).collect()
    }

    /// Layer `other` on top of `self`: its headers replace same-named ones.
    pub fn merge(&mut self, other: &HeaderTable) -> &mut Self {
        for (name, line) in &other.headers {
            if let Some((_, l)) = self.headers.iter_mut().find(|(n, _)| n == name) {
                *l = line.clone();
            } else {
                self.headers.push((name.clone(), line.clone()));
            }
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(n, line)| (n.as_str(), &line[n.len() + 2..]))
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

/// Convert a header name to its canonical form
/// (e.g., "HTTP_ACCEPT_CHARSET" -> "Accept-Charset").
///
/// Each run of ASCII letters is title-cased; everything else is kept as is.
/// `Et` becomes `ET`.
pub fn canonical_header_name(name: &str) -> String {
    let stripped = match name.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("HTTP_") => &name[5..],
        _ => name,
    };

    let mut out = String::with_capacity(stripped.len());
    let mut in_word = false;
    for c in stripped.chars() {
        let c = if c == '_' { '-' } else { c };
        if c.is_ascii_alphabetic() {
            if in_word {
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c.to_ascii_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }

    if out == "Et" {
        out = "ET".to_string();
    }
    out
}
