//! Raw header block parsing.
//!
//! Turns the header text a transfer produced (status line plus
//! `Name: value` lines) into a [`HeaderBlock`].

/// Synthetic key holding the protocol version from the status line.
pub const HTTP_VERSION: &str = "Http-Version";
/// Synthetic key holding the numeric status code.
pub const STATUS_CODE: &str = "Status-Code";
/// Synthetic key holding the code plus reason phrase.
pub const STATUS: &str = "Status";

const SYNTHETIC_KEYS: [&str; 3] = [HTTP_VERSION, STATUS_CODE, STATUS];

/// A header value; repeated headers collect into `Multiple`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderValue {
    /// First value.
    pub fn first(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::Multiple(vs) => vs.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Last value (the effective one for headers like `Location`).
    pub fn last(&self) -> &str {
        match self {
            HeaderValue::Single(v) => v,
            HeaderValue::Multiple(vs) => vs.last().map(String::as_str).unwrap_or(""),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderValue::Single(v) => vec![v.as_str()],
            HeaderValue::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, HeaderValue::Multiple(_))
    }

    fn push(&mut self, value: String) {
        match self {
            HeaderValue::Single(prev) if prev.is_empty() => *prev = value,
            HeaderValue::Single(prev) => {
                let prev = std::mem::take(prev);
                *self = HeaderValue::Multiple(vec![prev, value]);
            }
            HeaderValue::Multiple(vs) => vs.push(value),
        }
    }
}

impl PartialEq<&str> for HeaderValue {
    fn eq(&self, other: &&str) -> bool {
        matches!(self, HeaderValue::Single(v) if v == other)
    }
}

/// Parsed headers in the order they first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    entries: Vec<(String, HeaderValue)>,
}

impl HeaderBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a header up by exact name, falling back to a case-insensitive match.
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .or_else(|| self.entries.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)))
            .map(|(_, v)| v)
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name).map(HeaderValue::first)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn http_version(&self) -> Option<&str> {
        self.first(HTTP_VERSION)
    }

    pub fn status_code(&self) -> Option<u16> {
        self.first(STATUS_CODE).and_then(|c| c.parse().ok())
    }

    pub fn status(&self) -> Option<&str> {
        self.first(STATUS)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set(&mut self, name: &str, value: String) {
        if let Some((_, v)) = self.entries.iter_mut().find(|(n, _)| n == name) {
            *v = HeaderValue::Single(value);
        } else {
            self.entries
                .push((name.to_string(), HeaderValue::Single(value)));
        }
    }

    fn append(&mut self, name: &str, value: String) {
        if let Some((_, v)) = self.entries.iter_mut().find(|(n, _)| n == name) {
            v.push(value);
        } else {
            self.entries
                .push((name.to_string(), HeaderValue::Single(value)));
        }
    }
}

/// Parser for header text in the format libcurl emits.
pub struct HeaderParser;

impl HeaderParser {
    /// Split a raw block on line breaks, dropping empty lines, and parse it.
    pub fn parse_block(raw: &str) -> HeaderBlock {
        let lines: Vec<&str> = raw
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .collect();
        Self::parse(&lines)
    }

    /// Parse only the last response in `raw`.
    ///
    /// libcurl hands over every header block it saw: proxy `CONNECT`
    /// replies, interim responses and each hop of `followLocation`.
    pub fn parse_final(raw: &str) -> HeaderBlock {
        let lines: Vec<&str> = raw
            .split(['\r', '\n'])
            .filter(|line| !line.is_empty())
            .collect();
        let start = lines
            .iter()
            .rposition(|line| parse_status_line(line).is_some())
            .unwrap_or(0);
        Self::parse(&lines[start..])
    }

    /// Parse pre-split lines.
    ///
    /// Leading status lines are consumed one after another so that the last
    /// one wins (proxy `CONNECT` or `100 Continue` responses come first).
    /// Lines that are neither status lines nor `Name: value` pairs are ignored.
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> HeaderBlock {
        let mut block = HeaderBlock::new();
        let mut rest = lines;

        while let Some((first, tail)) = rest.split_first() {
            let Some((version, code, text)) = parse_status_line(first.as_ref()) else {
                break;
            };
            let status = match text {
                Some(text) => format!("{} {}", code, text),
                None => code.to_string(),
            };
            block.set(HTTP_VERSION, version.to_string());
            block.set(STATUS_CODE, code.to_string());
            block.set(STATUS, status);
            rest = tail;
        }

        for line in rest {
            let Some((name, value)) = parse_header_line(line.as_ref()) else {
                continue;
            };
            if SYNTHETIC_KEYS.contains(&name) {
                continue;
            }
            block.append(name, value.to_string());
        }

        block
    }
}

/// `HTTP/<version> <code>[ <text>]` -> (version, code, text)
fn parse_status_line(line: &str) -> Option<(&str, &str, Option<&str>)> {
    let rest = line.strip_prefix("HTTP/")?;
    let (version, rest) = rest.split_once(|c: char| c.is_ascii_whitespace())?;
    if !is_version(version) {
        return None;
    }

    let code_len = rest
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if code_len == 0 {
        return None;
    }
    let (code, tail) = rest.split_at(code_len);

    let text = tail
        .strip_prefix(|c: char| c.is_ascii_whitespace())
        .map(str::trim_end)
        .filter(|t| !t.is_empty());
    Some((version, code, text))
}

/// "1.1", "1.0", "2", "3"
fn is_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    match bytes {
        [major] => major.is_ascii_digit(),
        [major, b'.', minor] => major.is_ascii_digit() && minor.is_ascii_digit(),
        _ => false,
    }
}

/// `<name>: <value>`, split at the first colon followed by whitespace.
fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let bytes = line.as_bytes();
    let idx = (0..bytes.len().saturating_sub(1))
        .find(|&i| bytes[i] == b':' && bytes[i + 1].is_ascii_whitespace())?;
    Some((&line[..idx], &line[idx + 2..]))
}
